use std::sync::Arc;

use crate::geometry::{compute_pwmoveout, GridNode, RectangularSlownessGrid, StationGeometry};
use crate::math::StatsHelper;
use crate::output::{CoherenceStore, TraceStore};
use crate::policy::{DepthDependentAperture, TopMute};
use crate::prelude::{
    NodeOutcome, StackConfig, StackError, StackOutcome, StackResult, WEIGHT_MINIMUM,
};
use crate::processing::accumulator::{accumulate_node, NodeStack};
use crate::processing::coherence::{
    Coharray, CoherenceEstimator, CoherenceInput, WeightedSemblance,
};
use crate::processing::weights::EnsembleWeights;
use crate::seismic::{
    virtual_station_name, Metadata, MetadataError, ThreeComponentEnsemble,
    ThreeComponentSeismogram,
};
use crate::telemetry::{LogManager, MetricsRecorder, StackMetrics};

/// Relative tolerance when checking that live members share one `dt`.
const DT_TOLERANCE: f64 = 1.0e-6;

/// Pseudostation attributes every input ensemble must carry.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudostationFrame {
    /// Reference point, degrees.
    pub lat0: f64,
    pub lon0: f64,
    /// Datum elevation, used when no station weight reaches the floor at t=tstart.
    pub elev0: f64,
    /// Incident slowness the ensemble is prealigned to.
    pub ux0: f64,
    pub uy0: f64,
    pub ix1: i64,
    pub ix2: i64,
    pub evid: i64,
    pub gridname: String,
}

impl PseudostationFrame {
    pub fn from_metadata(md: &Metadata) -> Result<Self, MetadataError> {
        Ok(Self {
            lat0: md.get_double("lat0")?,
            lon0: md.get_double("lon0")?,
            elev0: md.get_double("elev0")?,
            ux0: md.get_double("ux0")?,
            uy0: md.get_double("uy0")?,
            ix1: md.get_int("ix1")?,
            ix2: md.get_int("ix2")?,
            evid: md.get_int("evid")?,
            gridname: md.get_string("gridname")?,
        })
    }
}

/// Inputs to one ensemble-processing call.
#[derive(Debug, Clone, Copy)]
pub struct StackRequest<'a> {
    pub ensemble: &'a ThreeComponentEnsemble,
    pub grid: &'a RectangularSlownessGrid,
    /// Applied to every member before stacking.
    pub mute: &'a TopMute,
    /// Applied to each stack, shifted to its first populated sample.
    pub stackmute: &'a TopMute,
    pub aperture: &'a DepthDependentAperture,
}

/// A stacked trace and the coherence record describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct StackedPair {
    pub trace: ThreeComponentSeismogram,
    pub coherence: Coharray,
}

/// Outcome of a grid sweep before anything is committed.
#[derive(Debug, Clone, PartialEq)]
pub enum Sweep {
    /// One entry per grid node, in `gridid` order.
    Nodes {
        fold: usize,
        results: Vec<NodeOutcome<StackedPair>>,
    },
    InsufficientFold { fold: usize, required: usize },
}

enum Prepared {
    Ready(EnsembleSetup),
    LowFold { fold: usize },
}

/// Ensemble-level state, read-only while the grid is swept.
struct EnsembleSetup {
    frame: PseudostationFrame,
    members: Vec<ThreeComponentSeismogram>,
    geometry: StationGeometry,
    weights: EnsembleWeights,
    tstart: f64,
    dt: f64,
    elev: f64,
    stackmute: TopMute,
    template: Metadata,
    dtcoh: f64,
    cohwinlen: f64,
    logger: LogManager,
}

impl EnsembleSetup {
    fn stack_node(&self, node: &GridNode, estimator: &dyn CoherenceEstimator) -> NodeOutcome<StackedPair> {
        let mut moveout = vec![0.0; self.members.len()];
        compute_pwmoveout(
            &self.geometry.deast,
            &self.geometry.dnorth,
            node.dux,
            node.duy,
            &mut moveout,
        );

        let NodeStack {
            stack,
            gather,
            gathwgt,
            stack_start,
            ..
        } = match accumulate_node(&self.members, &self.weights, &moveout, self.tstart, self.dt) {
            NodeOutcome::Stacked(node_stack) => node_stack,
            NodeOutcome::NoCoverage => {
                self.logger.detail(&format!(
                    "gridid {} (dux={:.4}, duy={:.4}) has no coverage",
                    node.gridid, node.dux, node.duy
                ));
                return NodeOutcome::NoCoverage;
            }
        };

        let smuteused = self.stackmute.shifted(self.dt * stack_start as f64);
        let mut trace = ThreeComponentSeismogram {
            dt: self.dt,
            t0: self.tstart,
            ns: stack.ncols(),
            live: true,
            u: stack,
            metadata: self.template.clone(),
        };
        self.annotate(&mut trace.metadata, node);
        smuteused.apply(&mut trace);

        let coherence = estimator.estimate(&CoherenceInput {
            gather: &gather,
            gathwgt: &gathwgt,
            stack: &trace,
            dtcoh: self.dtcoh,
            cohwinlen: self.cohwinlen,
            mute: &smuteused,
        });
        self.logger.detail(&format!(
            "gridid {} stacked from sample {} (vertical rms {:.3e}, mean coherence {:.3})",
            node.gridid,
            stack_start,
            trace.u.row(2).as_slice().map_or(0.0, StatsHelper::rms),
            coherence.mean_total()
        ));
        NodeOutcome::Stacked(StackedPair { trace, coherence })
    }

    fn annotate(&self, md: &mut Metadata, node: &GridNode) {
        let frame = &self.frame;
        md.put("sta", virtual_station_name(frame.ix1, frame.ix2));
        md.put("ix1", frame.ix1);
        md.put("ix2", frame.ix2);
        md.put("ux", frame.ux0 + node.dux);
        md.put("uy", frame.uy0 + node.duy);
        md.put("gridid", node.gridid);
        md.put("dux", node.dux);
        md.put("duy", node.duy);
        md.put("ux0", frame.ux0);
        md.put("uy0", frame.uy0);
        md.put("elev", self.elev);
    }
}

/// Plane-wave stacking engine for one pseudostation ensemble at a time.
pub struct PwStackEngine {
    config: StackConfig,
    estimator: Arc<dyn CoherenceEstimator>,
    logger: LogManager,
    metrics: MetricsRecorder,
}

impl PwStackEngine {
    pub fn new(config: StackConfig) -> Self {
        Self::with_estimator(config, Arc::new(WeightedSemblance))
    }

    pub fn with_estimator(config: StackConfig, estimator: Arc<dyn CoherenceEstimator>) -> Self {
        let logger = LogManager::new(config.verbose);
        Self {
            config,
            estimator,
            logger,
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn metrics(&self) -> StackMetrics {
        self.metrics.snapshot()
    }

    /// Stack `request` over its whole grid and commit every result in grid order.
    ///
    /// Low fold is reported through [`StackOutcome::InsufficientFold`] with nothing
    /// committed. A failed save aborts the call.
    pub fn process(
        &self,
        request: &StackRequest<'_>,
        traces: &mut dyn TraceStore,
        coherence: &mut dyn CoherenceStore,
    ) -> StackResult<StackOutcome> {
        match self.sweep(request)? {
            Sweep::InsufficientFold { fold, required } => {
                Ok(StackOutcome::InsufficientFold { fold, required })
            }
            Sweep::Nodes { fold, results } => self.commit(fold, results, traces, coherence),
        }
    }

    /// Run the grid sweep without committing anything.
    pub fn sweep(&self, request: &StackRequest<'_>) -> StackResult<Sweep> {
        self.metrics.record_ensemble();
        let setup = match self.prepare(request)? {
            Prepared::Ready(setup) => setup,
            Prepared::LowFold { fold } => {
                self.metrics.record_low_fold();
                self.logger.warning(&format!(
                    "skipping ensemble: fold {} below minimum {}",
                    fold, self.config.min_fold
                ));
                return Ok(Sweep::InsufficientFold {
                    fold,
                    required: self.config.min_fold,
                });
            }
        };

        let fold = setup.weights.fold();
        self.logger.record(&format!(
            "Processing data for node ({}, {}) with fold={}",
            setup.frame.ix1, setup.frame.ix2, fold
        ));

        let nodes: Vec<GridNode> = request.grid.nodes().collect();
        let results = if self.config.workers > 1 && nodes.len() > 1 {
            self.sweep_parallel(Arc::new(setup), nodes)?
        } else {
            nodes
                .iter()
                .map(|node| setup.stack_node(node, self.estimator.as_ref()))
                .collect()
        };
        Ok(Sweep::Nodes { fold, results })
    }

    fn prepare(&self, request: &StackRequest<'_>) -> StackResult<Prepared> {
        let frame = PseudostationFrame::from_metadata(&request.ensemble.metadata)
            .map_err(|err| self.fatal_metadata(err))?;

        let mut members: Vec<ThreeComponentSeismogram> =
            request.ensemble.live_members().cloned().collect();
        let (dt, ns_first) = match members.first() {
            Some(first) => (first.dt, first.ns),
            None => {
                return Err(StackError::InvalidInput(
                    "ensemble has no live members".into(),
                ))
            }
        };
        if dt <= 0.0 || !dt.is_finite() {
            return Err(StackError::InvalidInput(format!(
                "sample interval {} is not positive",
                dt
            )));
        }
        if members
            .iter()
            .any(|m| (m.dt - dt).abs() > dt * DT_TOLERANCE)
        {
            return Err(StackError::InvalidInput(
                "live members do not share a common sample interval".into(),
            ));
        }
        if let Some(bad) = members
            .iter()
            .find(|m| m.u.nrows() != 3 || m.u.ncols() != m.ns)
        {
            return Err(StackError::InvalidInput(format!(
                "member sample matrix is {}x{} but ns is {}",
                bad.u.nrows(),
                bad.u.ncols(),
                bad.ns
            )));
        }

        let tstart = self.config.tstart;
        let tend = self.config.tend;
        if !tstart.is_finite() || !tend.is_finite() {
            return Err(StackError::InvalidWindow(format!(
                "stack time window {} to {} is not finite",
                tstart, tend
            )));
        }
        let istart = (tstart / dt).round() as i64;
        let iend = (tend / dt).round() as i64;
        let nsout = iend - istart + 1;
        if nsout <= 0 || istart >= ns_first as i64 {
            return Err(StackError::InvalidWindow(format!(
                "requested stack time window = {} to {} is outside range of input data",
                tstart, tend
            )));
        }
        let nsout = nsout as usize;

        for member in members.iter_mut() {
            request.mute.apply(member);
        }

        let geometry = StationGeometry::from_members(&members, frame.lat0, frame.lon0)
            .map_err(|err| self.fatal_metadata(err))?;
        let weights = EnsembleWeights::compute(&geometry, request.aperture, tstart, dt, nsout);
        let fold = weights.fold();
        if fold < self.config.min_fold {
            return Ok(Prepared::LowFold { fold });
        }

        let w0 = weights.weights.column(0).to_vec();
        let elev = StatsHelper::weighted_mean(&geometry.elev, &w0, WEIGHT_MINIMUM)
            .unwrap_or(frame.elev0);

        let mut template = Metadata::new();
        request
            .ensemble
            .metadata
            .copy_selected(&mut template, &self.config.copy_keys)
            .map_err(|err| self.fatal_metadata(err))?;

        Ok(Prepared::Ready(EnsembleSetup {
            frame,
            members,
            geometry,
            weights,
            tstart,
            dt,
            elev,
            stackmute: *request.stackmute,
            template,
            dtcoh: self.config.dtcoh,
            cohwinlen: self.config.cohwinlen,
            logger: self.logger,
        }))
    }

    fn sweep_parallel(
        &self,
        setup: Arc<EnsembleSetup>,
        nodes: Vec<GridNode>,
    ) -> StackResult<Vec<NodeOutcome<StackedPair>>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(self.config.workers)
            .thread_name("pwstack-grid")
            .build()
            .map_err(|err| StackError::Internal(format!("building grid worker pool: {}", err)))?;

        runtime.block_on(async {
            let handles: Vec<_> = nodes
                .into_iter()
                .map(|node| {
                    let setup = Arc::clone(&setup);
                    let estimator = Arc::clone(&self.estimator);
                    tokio::task::spawn_blocking(move || setup.stack_node(&node, estimator.as_ref()))
                })
                .collect();

            // awaited in spawn order so results stay in gridid order
            let mut results = Vec::with_capacity(handles.len());
            for handle in handles {
                let outcome = handle
                    .await
                    .map_err(|err| StackError::Internal(format!("grid worker failed: {}", err)))?;
                results.push(outcome);
            }
            Ok(results)
        })
    }

    fn commit(
        &self,
        fold: usize,
        results: Vec<NodeOutcome<StackedPair>>,
        traces: &mut dyn TraceStore,
        coherence: &mut dyn CoherenceStore,
    ) -> StackResult<StackOutcome> {
        let mut committed = 0;
        let mut no_coverage = 0;
        for result in results {
            match result {
                NodeOutcome::Stacked(pair) => {
                    let saved = traces
                        .save(&pair.trace)
                        .and_then(|_| coherence.save(&pair.coherence, &pair.trace));
                    if let Err(err) = saved {
                        self.logger
                            .failure(&format!("Write failure abort: cannot continue: {}", err));
                        return Err(err.into());
                    }
                    committed += 1;
                }
                NodeOutcome::NoCoverage => no_coverage += 1,
            }
        }
        self.metrics.record_nodes(committed, no_coverage);
        Ok(StackOutcome::Stacked {
            fold,
            committed,
            no_coverage,
        })
    }

    fn fatal_metadata(&self, err: MetadataError) -> StackError {
        self.logger
            .failure(&format!("ensemble is missing required metadata: {}", err));
        StackError::MissingMetadata(err)
    }
}
