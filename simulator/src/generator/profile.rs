use anyhow::Context;
use pwstackcore::geometry::offsets::EARTH_RADIUS;
use pwstackcore::seismic::{Metadata, ThreeComponentEnsemble, ThreeComponentSeismogram};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::generator::template::ricker;

/// Configuration for a synthetic plane-wave ensemble on a rectangular array.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    pub nx: usize,
    pub ny: usize,
    /// Station spacing, km.
    pub spacing: f64,
    pub dt: f64,
    pub ns: usize,
    pub t0: f64,
    /// Arrival time of the plane wave at the array center.
    pub arrival: f64,
    pub fpeak: f64,
    /// Slowness of the plane wave relative to `(ux0, uy0)`.
    pub true_dux: f64,
    pub true_duy: f64,
    pub amplitudes: [f64; 3],
    pub noise: f64,
    pub seed: u64,
    pub lat0: f64,
    pub lon0: f64,
    pub elev0: f64,
    pub ux0: f64,
    pub uy0: f64,
    pub evid: i64,
    pub ix1: i64,
    pub ix2: i64,
    pub gridname: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            nx: 5,
            ny: 5,
            spacing: 10.0,
            dt: 0.05,
            ns: 600,
            t0: 0.0,
            arrival: 10.0,
            fpeak: 1.0,
            true_dux: 0.02,
            true_duy: -0.01,
            amplitudes: [0.3, 0.2, 1.0],
            noise: 0.02,
            seed: 0,
            lat0: 40.0,
            lon0: -110.0,
            elev0: 1.5,
            ux0: 0.06,
            uy0: 0.0,
            evid: 1,
            ix1: 0,
            ix2: 0,
            gridname: "synthetic".into(),
        }
    }
}

impl GeneratorConfig {
    fn center_offset(index: usize, count: usize, spacing: f64) -> f64 {
        (index as f64 - (count.max(1) - 1) as f64 / 2.0) * spacing
    }
}

fn ensemble_metadata(config: &GeneratorConfig) -> Metadata {
    let mut md = Metadata::new();
    md.put("lat0", config.lat0);
    md.put("lon0", config.lon0);
    md.put("elev0", config.elev0);
    md.put("ux0", config.ux0);
    md.put("uy0", config.uy0);
    md.put("ix1", config.ix1);
    md.put("ix2", config.ix2);
    md.put("evid", config.evid);
    md.put("gridname", config.gridname.as_str());
    md
}

pub fn build_ensemble(config: &GeneratorConfig) -> anyhow::Result<ThreeComponentEnsemble> {
    anyhow::ensure!(config.dt > 0.0, "generator sample interval must be positive");
    let nsta = config
        .nx
        .checked_mul(config.ny)
        .context("overflow computing station count for generator")?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut ensemble = ThreeComponentEnsemble::new(ensemble_metadata(config));
    ensemble.members.reserve(nsta);

    for iy in 0..config.ny {
        for ix in 0..config.nx {
            let deast = GeneratorConfig::center_offset(ix, config.nx, config.spacing);
            let dnorth = GeneratorConfig::center_offset(iy, config.ny, config.spacing);
            let moveout = config.true_dux * deast + config.true_duy * dnorth;

            let mut trace = ThreeComponentSeismogram::zeros(config.ns, config.dt, config.t0);
            for i in 0..config.ns {
                let t = trace.time(i) - config.arrival - moveout;
                let pulse = ricker(t, config.fpeak);
                for (c, amplitude) in config.amplitudes.iter().enumerate() {
                    let jitter = if config.noise > 0.0 {
                        rng.gen_range(-config.noise..config.noise)
                    } else {
                        0.0
                    };
                    trace.u[[c, i]] = amplitude * pulse + jitter;
                }
            }

            let lat = config.lat0 + (dnorth / EARTH_RADIUS).to_degrees();
            let lon =
                config.lon0 + (deast / (EARTH_RADIUS * config.lat0.to_radians().cos())).to_degrees();
            let md = &mut trace.metadata;
            md.put("sta", format!("S{:02}{:02}", ix, iy));
            md.put("dnorth", dnorth);
            md.put("deast", deast);
            md.put("site.lat", lat);
            md.put("site.lon", lon);
            md.put("site.elev", config.elev0 + 0.01 * ix as f64);
            ensemble.members.push(trace);
        }
    }

    Ok(ensemble)
}
