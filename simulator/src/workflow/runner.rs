use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use pwstackcore::output::{CoherenceStore, StoreError, TraceStore};
use pwstackcore::processing::{Coharray, PwStackEngine, StackRequest};
use pwstackcore::seismic::{ThreeComponentEnsemble, ThreeComponentSeismogram};
use pwstackcore::telemetry::StackMetrics;
use pwstackcore::StackOutcome;

/// Grid node with the highest mean total coherence seen so far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakNode {
    pub gridid: i64,
    pub dux: f64,
    pub duy: f64,
    pub coherence: f64,
}

/// Forwards coherence records and remembers the most coherent node.
struct PeakTracker<'a> {
    inner: &'a mut dyn CoherenceStore,
    peak: Option<PeakNode>,
}

impl CoherenceStore for PeakTracker<'_> {
    fn save(&mut self, coh: &Coharray, trace: &ThreeComponentSeismogram) -> Result<(), StoreError> {
        self.inner.save(coh, trace)?;
        let md = &trace.metadata;
        let candidate = PeakNode {
            gridid: md.get_int("gridid").unwrap_or(0),
            dux: md.get_double("dux").unwrap_or(0.0),
            duy: md.get_double("duy").unwrap_or(0.0),
            coherence: coh.mean_total(),
        };
        if self
            .peak
            .map_or(true, |best| candidate.coherence > best.coherence)
        {
            self.peak = Some(candidate);
        }
        Ok(())
    }
}

pub struct WorkflowResult {
    pub outcome: StackOutcome,
    pub peak: Option<PeakNode>,
    pub metrics: StackMetrics,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute(
        &self,
        ensemble: &ThreeComponentEnsemble,
        traces: &mut dyn TraceStore,
        coherence: &mut dyn CoherenceStore,
    ) -> anyhow::Result<WorkflowResult> {
        let aperture = self
            .config
            .aperture
            .build()
            .context("building stacking aperture")?;
        let engine = PwStackEngine::new(self.config.stack.clone());
        let request = StackRequest {
            ensemble,
            grid: &self.config.grid,
            mute: &self.config.mute,
            stackmute: &self.config.stackmute,
            aperture: &aperture,
        };

        let mut tracker = PeakTracker {
            inner: coherence,
            peak: None,
        };
        let outcome = engine
            .process(&request, traces, &mut tracker)
            .context("stacking ensemble")?;
        match outcome {
            StackOutcome::InsufficientFold { fold, required } => {
                log::info!("ensemble skipped: fold {} below required {}", fold, required)
            }
            StackOutcome::Stacked { committed, .. } => {
                log::info!("committed {} stacks over grid {}", committed, self.config.grid.name)
            }
        }

        Ok(WorkflowResult {
            outcome,
            peak: tracker.peak,
            metrics: engine.metrics(),
        })
    }
}
