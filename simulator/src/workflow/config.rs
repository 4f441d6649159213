use anyhow::Context;
use pwstackcore::geometry::RectangularSlownessGrid;
use pwstackcore::policy::{DepthDependentAperture, TaperKind, TopMute};
use pwstackcore::prelude::StackConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::generator::profile::GeneratorConfig;

/// How the stacking aperture is defined in a workflow file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ApertureConfig {
    Constant {
        aperture: f64,
        cutoff: f64,
    },
    Table {
        t: Vec<f64>,
        aperture: Vec<f64>,
        cutoff: Vec<f64>,
    },
    Fresnel {
        vs: f64,
        vp: f64,
        period: f64,
        dtau: f64,
        ntau: usize,
        cutoff_multiplier: f64,
    },
}

impl ApertureConfig {
    pub fn build(&self) -> anyhow::Result<DepthDependentAperture> {
        let aperture = match self {
            ApertureConfig::Constant { aperture, cutoff } => {
                DepthDependentAperture::constant(*aperture, *cutoff)
            }
            ApertureConfig::Table {
                t,
                aperture,
                cutoff,
            } => DepthDependentAperture::from_tables(t.clone(), aperture.clone(), cutoff.clone())
                .context("building tabulated aperture")?,
            ApertureConfig::Fresnel {
                vs,
                vp,
                period,
                dtau,
                ntau,
                cutoff_multiplier,
            } => DepthDependentAperture::fresnel(*vs, *vp, *period, *dtau, *ntau, *cutoff_multiplier)
                .context("building Fresnel-zone aperture")?,
        };
        Ok(aperture)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub stack: StackConfig,
    pub grid: RectangularSlownessGrid,
    pub mute: TopMute,
    pub stackmute: TopMute,
    pub aperture: ApertureConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Square grid of `grid_n × grid_n` nodes over `[-umax, umax]` and a
    /// constant aperture.
    pub fn from_args(
        umax: f64,
        grid_n: usize,
        aperture: f64,
        cutoff: f64,
        workers: usize,
        generator: GeneratorConfig,
    ) -> anyhow::Result<Self> {
        let grid = RectangularSlownessGrid::centered("synthetic", umax, grid_n)
            .context("slowness grid needs at least one node per axis")?;
        let tend = generator.dt * generator.ns.saturating_sub(1) as f64;
        let stack = StackConfig {
            tstart: 0.0,
            tend,
            workers: workers.max(1),
            copy_keys: vec!["evid".into(), "gridname".into()],
            ..Default::default()
        };
        Ok(Self {
            stack,
            grid,
            mute: TopMute::new(0.0, 0.5, TaperKind::Linear),
            stackmute: TopMute::new(0.0, 0.5, TaperKind::Cosine),
            aperture: ApertureConfig::Constant { aperture, cutoff },
            generator,
        })
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.grid.nux > 0 && self.grid.nuy > 0,
            "slowness grid {} has no nodes",
            self.grid.name
        );
        anyhow::ensure!(
            self.stack.tend >= self.stack.tstart,
            "stack window ends before it starts"
        );
        anyhow::ensure!(self.stack.dtcoh > 0.0, "coherence interval must be positive");
        Ok(())
    }
}
