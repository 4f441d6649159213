use super::*;
use crate::geometry::RectangularSlownessGrid;
use crate::output::{CoherenceStore, MemoryStore, StoreError, TraceStore};
use crate::policy::{DepthDependentAperture, TaperKind, TopMute};
use crate::prelude::{StackConfig, StackError, StackOutcome};
use crate::seismic::{virtual_station_name, Metadata, ThreeComponentEnsemble, ThreeComponentSeismogram};

const DT: f64 = 0.5;
const NS: usize = 20;

fn ensemble_metadata() -> Metadata {
    let mut md = Metadata::new();
    md.put("lat0", 45.0);
    md.put("lon0", -120.0);
    md.put("elev0", 0.25);
    md.put("ux0", 0.02);
    md.put("uy0", -0.01);
    md.put("ix1", 3);
    md.put("ix2", 12);
    md.put("evid", 501);
    md.put("gridname", "testgrid");
    md
}

fn station(
    dnorth: f64,
    deast: f64,
    ns: usize,
    t0: f64,
    sample: impl Fn(usize, usize) -> f64,
) -> ThreeComponentSeismogram {
    let mut trace = ThreeComponentSeismogram::zeros(ns, DT, t0);
    for c in 0..3 {
        for i in 0..ns {
            trace.u[[c, i]] = sample(c, i);
        }
    }
    trace.metadata.put("dnorth", dnorth);
    trace.metadata.put("deast", deast);
    trace.metadata.put("site.elev", 1.0);
    trace
}

fn wiggle(scale: f64) -> impl Fn(usize, usize) -> f64 {
    move |c, i| scale * ((i as f64 * 0.7 + c as f64).sin() + 0.1 * i as f64)
}

fn ensemble_of(members: Vec<ThreeComponentSeismogram>) -> ThreeComponentEnsemble {
    ThreeComponentEnsemble {
        metadata: ensemble_metadata(),
        members,
    }
}

fn open_mute() -> TopMute {
    TopMute::new(-1.0e6, -1.0e6, TaperKind::Linear)
}

fn config() -> StackConfig {
    StackConfig {
        tstart: 0.0,
        tend: DT * (NS - 1) as f64,
        min_fold: 1,
        dtcoh: 1.0,
        cohwinlen: 2.0,
        ..Default::default()
    }
}

fn single_node_grid() -> RectangularSlownessGrid {
    RectangularSlownessGrid::new("zero", 0.0, 0.0, 0.1, 0.1, 1, 1).unwrap()
}

struct Fixture {
    ensemble: ThreeComponentEnsemble,
    grid: RectangularSlownessGrid,
    mute: TopMute,
    stackmute: TopMute,
    aperture: DepthDependentAperture,
}

impl Fixture {
    fn new(members: Vec<ThreeComponentSeismogram>) -> Self {
        Self {
            ensemble: ensemble_of(members),
            grid: single_node_grid(),
            mute: open_mute(),
            stackmute: open_mute(),
            aperture: DepthDependentAperture::constant(10.0, 50.0),
        }
    }

    fn request(&self) -> StackRequest<'_> {
        StackRequest {
            ensemble: &self.ensemble,
            grid: &self.grid,
            mute: &self.mute,
            stackmute: &self.stackmute,
            aperture: &self.aperture,
        }
    }

    fn run(&self, engine: &PwStackEngine) -> (Result<StackOutcome, StackError>, MemoryStore, MemoryStore) {
        let mut traces = MemoryStore::new();
        let mut coherence = MemoryStore::new();
        let outcome = engine.process(&self.request(), &mut traces, &mut coherence);
        (outcome, traces, coherence)
    }
}

fn gridid(trace: &ThreeComponentSeismogram) -> i64 {
    trace.metadata.get_int("gridid").unwrap()
}

#[test]
fn single_station_at_reference_is_unchanged() {
    let input = station(0.0, 0.0, NS, 0.0, wiggle(1.0));
    let fixture = Fixture::new(vec![input.clone()]);
    let (outcome, traces, coherence) = fixture.run(&PwStackEngine::new(config()));

    assert_eq!(
        outcome.unwrap(),
        StackOutcome::Stacked {
            fold: 1,
            committed: 1,
            no_coverage: 0
        }
    );
    let stack = &traces.traces[0];
    assert_eq!(stack.u, input.u);
    assert_eq!(stack.t0, 0.0);
    assert_eq!(stack.dt, DT);
    assert!(stack.live);
    assert_eq!(coherence.coherence.len(), 1);
}

#[test]
fn stacked_trace_carries_node_metadata() {
    let fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0))]);
    let (_, traces, _) = fixture.run(&PwStackEngine::new(config()));
    let md = &traces.traces[0].metadata;

    assert_eq!(md.get_int("ix1").unwrap(), 3);
    assert_eq!(md.get_int("ix2").unwrap(), 12);
    assert_eq!(md.get_string("sta").unwrap(), virtual_station_name(3, 12));
    assert_eq!(md.get_int("gridid").unwrap(), 1);
    assert_eq!(md.get_double("dux").unwrap(), 0.0);
    assert_eq!(md.get_double("ux").unwrap(), 0.02);
    assert_eq!(md.get_double("uy").unwrap(), -0.01);
    assert_eq!(md.get_double("ux0").unwrap(), 0.02);
    assert_eq!(md.get_double("elev").unwrap(), 1.0);
}

#[test]
fn symmetric_pair_stacks_to_their_mean() {
    let a = station(0.0, 5.0, NS, 0.0, wiggle(1.0));
    let b = station(0.0, -5.0, NS, 0.0, wiggle(-3.0));
    let fixture = Fixture::new(vec![a.clone(), b.clone()]);
    let (outcome, traces, _) = fixture.run(&PwStackEngine::new(config()));

    assert_eq!(outcome.unwrap().fold(), 2);
    let mean = (&a.u + &b.u) / 2.0;
    for (s, m) in traces.traces[0].u.iter().zip(mean.iter()) {
        assert!((s - m).abs() < 1e-12);
    }
}

#[test]
fn unequal_aperture_weights_give_weighted_mean() {
    let near = station(0.0, 0.0, NS, 0.0, wiggle(1.0));
    let far = station(0.0, 10.0, NS, 0.0, wiggle(-2.0));
    let fixture = Fixture::new(vec![near.clone(), far.clone()]);
    let (outcome, traces, _) = fixture.run(&PwStackEngine::new(config()));

    assert_eq!(outcome.unwrap().fold(), 2);
    // aperture 10 km: the station 10 km out weighs exp(-1/2)
    let (w_near, w_far) = (1.0, (-0.5f64).exp());
    let expected = (&near.u * w_near + &far.u * w_far) / (w_near + w_far);
    let plain = (&near.u + &far.u) / 2.0;
    let stack = &traces.traces[0].u;
    for (s, e) in stack.iter().zip(expected.iter()) {
        assert!((s - e).abs() < 1e-12);
    }
    assert!(stack
        .iter()
        .zip(plain.iter())
        .any(|(s, m)| (s - m).abs() > 1e-3));
}

#[test]
fn grid_ids_commit_in_row_major_order() {
    let mut fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0))]);
    fixture.grid = RectangularSlownessGrid::new("g", -0.1, -0.05, 0.1, 0.05, 3, 2).unwrap();
    let (outcome, traces, coherence) = fixture.run(&PwStackEngine::new(config()));

    assert_eq!(outcome.unwrap().committed(), 6);
    let ids: Vec<i64> = traces.traces.iter().map(gridid).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    let expected: Vec<(f64, f64)> = fixture.grid.nodes().map(|n| (n.dux, n.duy)).collect();
    for (trace, (dux, duy)) in traces.traces.iter().zip(expected) {
        assert_eq!(trace.metadata.get_double("dux").unwrap(), dux);
        assert_eq!(trace.metadata.get_double("duy").unwrap(), duy);
    }
    assert_eq!(coherence.coherence.len(), traces.traces.len());
}

#[test]
fn low_fold_commits_nothing() {
    let mut fixture = Fixture::new(vec![
        station(0.0, 0.0, NS, 0.0, wiggle(1.0)),
        station(3.0, 0.0, NS, 0.0, wiggle(1.0)),
    ]);
    fixture.grid = RectangularSlownessGrid::centered("g", 0.1, 3).unwrap();
    let engine = PwStackEngine::new(StackConfig {
        min_fold: 3,
        ..config()
    });
    let (outcome, traces, coherence) = fixture.run(&engine);

    assert_eq!(
        outcome.unwrap(),
        StackOutcome::InsufficientFold {
            fold: 2,
            required: 3
        }
    );
    assert!(traces.traces.is_empty());
    assert!(coherence.coherence.is_empty());
    assert_eq!(engine.metrics().low_fold, 1);
}

#[test]
fn station_beyond_cutoff_never_contributes() {
    let near = station(0.0, 0.0, NS, 0.0, wiggle(1.0));
    let far = station(0.0, 1000.0, NS, 0.0, wiggle(50.0));
    let fixture = Fixture::new(vec![near.clone(), far]);
    let (outcome, traces, _) = fixture.run(&PwStackEngine::new(config()));

    assert_eq!(outcome.unwrap().fold(), 1);
    assert_eq!(traces.traces[0].u, near.u);
}

#[test]
fn node_without_coverage_is_skipped_and_sweep_continues() {
    let mut fixture = Fixture::new(vec![station(0.0, 100.0, NS, 0.0, wiggle(1.0))]);
    fixture.aperture = DepthDependentAperture::constant(100.0, 500.0);
    // second node moves the station out by 1000 s
    fixture.grid = RectangularSlownessGrid::new("g", 0.0, 0.0, 10.0, 0.1, 2, 1).unwrap();
    let engine = PwStackEngine::new(config());
    let (outcome, traces, coherence) = fixture.run(&engine);

    assert_eq!(
        outcome.unwrap(),
        StackOutcome::Stacked {
            fold: 1,
            committed: 1,
            no_coverage: 1
        }
    );
    assert_eq!(gridid(&traces.traces[0]), 1);
    assert_eq!(coherence.coherence.len(), 1);
    assert_eq!(engine.metrics().nodes_empty, 1);
}

#[test]
fn samples_before_stack_start_are_muted() {
    // data begins 2 s into the window
    let late = station(0.0, 0.0, NS, 2.0, |_, _| 1.0);
    let mut fixture = Fixture::new(vec![late]);
    fixture.stackmute = TopMute::new(0.0, 1.0, TaperKind::Linear);
    let (_, traces, _) = fixture.run(&PwStackEngine::new(config()));

    let stack = &traces.traces[0];
    for c in 0..3 {
        for i in 0..=4 {
            assert_eq!(stack.u[[c, i]], 0.0);
        }
        assert_eq!(stack.u[[c, 5]], 0.5);
        assert_eq!(stack.u[[c, 6]], 1.0);
    }
}

#[test]
fn front_end_mute_is_applied_to_members() {
    let fixture = Fixture {
        mute: TopMute::new(1.0, 1.0, TaperKind::Linear),
        ..Fixture::new(vec![station(0.0, 0.0, NS, 0.0, |_, _| 2.0)])
    };
    let (_, traces, _) = fixture.run(&PwStackEngine::new(config()));

    let stack = &traces.traces[0];
    assert_eq!(stack.u[[0, 0]], 0.0);
    assert_eq!(stack.u[[1, 1]], 0.0);
    assert_eq!(stack.u[[2, 2]], 2.0);
    // the caller's ensemble is left untouched
    assert_eq!(fixture.ensemble.members[0].u[[0, 0]], 2.0);
}

#[test]
fn repeated_runs_are_identical() {
    let mut fixture = Fixture::new(vec![
        station(1.0, 2.0, NS, 0.0, wiggle(1.0)),
        station(-4.0, 3.0, NS, -0.5, wiggle(0.5)),
        station(2.5, -6.0, NS + 4, 0.0, wiggle(2.0)),
    ]);
    fixture.grid = RectangularSlownessGrid::centered("g", 0.2, 4).unwrap();
    let engine = PwStackEngine::new(config());

    let (first, traces_a, coh_a) = fixture.run(&engine);
    let (second, traces_b, coh_b) = fixture.run(&engine);
    assert_eq!(first.unwrap(), second.unwrap());
    assert_eq!(traces_a.traces, traces_b.traces);
    assert_eq!(coh_a.coherence, coh_b.coherence);
}

#[test]
fn parallel_sweep_matches_sequential() {
    let mut fixture = Fixture::new(vec![
        station(1.0, 2.0, NS, 0.0, wiggle(1.0)),
        station(-4.0, 3.0, NS, -0.5, wiggle(0.5)),
        station(2.5, -6.0, NS, 0.5, wiggle(2.0)),
        station(7.0, 7.0, NS, 0.0, wiggle(-1.0)),
    ]);
    fixture.grid = RectangularSlownessGrid::centered("g", 0.3, 5).unwrap();

    let (seq, traces_seq, coh_seq) = fixture.run(&PwStackEngine::new(config()));
    let (par, traces_par, coh_par) = fixture.run(&PwStackEngine::new(StackConfig {
        workers: 4,
        ..config()
    }));

    assert_eq!(seq.unwrap(), par.unwrap());
    assert_eq!(traces_seq.traces, traces_par.traces);
    assert_eq!(coh_seq.coherence, coh_par.coherence);
}

#[test]
fn missing_incident_slowness_is_fatal() {
    let mut fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0))]);
    let mut md = Metadata::new();
    for key in ["lat0", "lon0", "elev0", "uy0", "ix1", "ix2", "evid", "gridname"] {
        if let Some(value) = fixture.ensemble.metadata.get(key) {
            md.put(key, value.clone());
        }
    }
    fixture.ensemble.metadata = md;
    let (outcome, traces, _) = fixture.run(&PwStackEngine::new(config()));

    assert!(matches!(outcome, Err(StackError::MissingMetadata(_))));
    assert!(traces.traces.is_empty());
}

#[test]
fn missing_station_offsets_are_fatal() {
    let mut bare = ThreeComponentSeismogram::zeros(NS, DT, 0.0);
    bare.metadata.put("site.elev", 0.0);
    let fixture = Fixture::new(vec![bare]);
    let (outcome, _, _) = fixture.run(&PwStackEngine::new(config()));
    assert!(matches!(outcome, Err(StackError::MissingMetadata(_))));
}

#[test]
fn window_past_end_of_data_is_rejected() {
    let fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0))]);
    let engine = PwStackEngine::new(StackConfig {
        tstart: 100.0,
        tend: 120.0,
        ..config()
    });
    let (outcome, _, _) = fixture.run(&engine);
    assert!(matches!(outcome, Err(StackError::InvalidWindow(_))));
}

#[test]
fn mixed_sample_intervals_are_rejected() {
    let mut odd = station(0.0, 1.0, NS, 0.0, wiggle(1.0));
    odd.dt = 0.25;
    let fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0)), odd]);
    let (outcome, _, _) = fixture.run(&PwStackEngine::new(config()));
    assert!(matches!(outcome, Err(StackError::InvalidInput(_))));
}

#[test]
fn non_finite_window_is_rejected() {
    let fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0))]);
    let engine = PwStackEngine::new(StackConfig {
        tstart: f64::NAN,
        ..config()
    });
    let (outcome, traces, _) = fixture.run(&engine);
    assert!(matches!(outcome, Err(StackError::InvalidWindow(_))));
    assert!(traces.traces.is_empty());
}

#[test]
fn member_with_inconsistent_sample_count_is_rejected() {
    let mut long = station(0.0, 1.0, NS, 0.0, wiggle(1.0));
    long.ns = NS + 5;
    let mut fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0)), long]);
    fixture.mute = TopMute::new(100.0, 200.0, TaperKind::Linear);
    let (outcome, _, _) = fixture.run(&PwStackEngine::new(config()));
    assert!(matches!(outcome, Err(StackError::InvalidInput(_))));
}

#[test]
fn member_missing_a_component_is_rejected() {
    let mut short = station(0.0, 1.0, NS, 0.0, wiggle(1.0));
    short.u = ndarray::Array2::zeros((2, NS));
    let fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0)), short]);
    let (outcome, _, _) = fixture.run(&PwStackEngine::new(config()));
    assert!(matches!(outcome, Err(StackError::InvalidInput(_))));
}

#[test]
fn dead_members_are_ignored() {
    let live = station(0.0, 0.0, NS, 0.0, wiggle(1.0));
    let mut dead = station(0.0, 1.0, NS, 0.0, wiggle(40.0));
    dead.live = false;
    let fixture = Fixture::new(vec![live.clone(), dead]);
    let (outcome, traces, _) = fixture.run(&PwStackEngine::new(config()));

    assert_eq!(outcome.unwrap().fold(), 1);
    assert_eq!(traces.traces[0].u, live.u);
}

#[test]
fn selected_ensemble_metadata_is_copied() {
    let fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0))]);
    let engine = PwStackEngine::new(StackConfig {
        copy_keys: vec!["evid".into(), "gridname".into()],
        ..config()
    });
    let (_, traces, _) = fixture.run(&engine);
    let md = &traces.traces[0].metadata;
    assert_eq!(md.get_int("evid").unwrap(), 501);
    assert_eq!(md.get_string("gridname").unwrap(), "testgrid");

    let strict = PwStackEngine::new(StackConfig {
        copy_keys: vec!["origin.time".into()],
        ..config()
    });
    let (outcome, _, _) = fixture.run(&strict);
    assert!(matches!(outcome, Err(StackError::MissingMetadata(_))));
}

/// Accepts a fixed number of traces, then rejects.
struct FailingStore {
    remaining: usize,
    saved: usize,
}

impl TraceStore for FailingStore {
    fn save(&mut self, _trace: &ThreeComponentSeismogram) -> Result<(), StoreError> {
        if self.remaining == 0 {
            return Err(StoreError::Rejected("disk full".into()));
        }
        self.remaining -= 1;
        self.saved += 1;
        Ok(())
    }
}

#[test]
fn write_failure_aborts_the_call() {
    let mut fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0))]);
    fixture.grid = RectangularSlownessGrid::centered("g", 0.1, 3).unwrap();
    let engine = PwStackEngine::new(config());
    let mut traces = FailingStore {
        remaining: 2,
        saved: 0,
    };
    let mut coherence = MemoryStore::new();

    let outcome = engine.process(&fixture.request(), &mut traces, &mut coherence);
    assert!(matches!(outcome, Err(StackError::Persistence(_))));
    assert_eq!(traces.saved, 2);
    assert_eq!(coherence.coherence.len(), 2);
}

#[test]
fn sweep_reports_every_node_without_committing() {
    let mut fixture = Fixture::new(vec![station(0.0, 100.0, NS, 0.0, wiggle(1.0))]);
    fixture.aperture = DepthDependentAperture::constant(100.0, 500.0);
    fixture.grid = RectangularSlownessGrid::new("g", 0.0, 0.0, 10.0, 0.1, 2, 1).unwrap();
    let engine = PwStackEngine::new(config());

    match engine.sweep(&fixture.request()).unwrap() {
        Sweep::Nodes { fold, results } => {
            assert_eq!(fold, 1);
            assert_eq!(results.len(), 2);
            assert!(matches!(results[0], crate::prelude::NodeOutcome::Stacked(_)));
            assert_eq!(results[1], crate::prelude::NodeOutcome::NoCoverage);
        }
        other => panic!("unexpected sweep {:?}", other),
    }
}

#[test]
fn coherence_store_sees_the_matching_trace() {
    struct Pairing(Vec<(i64, usize)>);
    impl CoherenceStore for Pairing {
        fn save(&mut self, coh: &Coharray, trace: &ThreeComponentSeismogram) -> Result<(), StoreError> {
            self.0.push((trace.metadata.get_int("gridid").unwrap_or(-1), coh.len()));
            Ok(())
        }
    }

    let mut fixture = Fixture::new(vec![station(0.0, 0.0, NS, 0.0, wiggle(1.0))]);
    fixture.grid = RectangularSlownessGrid::centered("g", 0.1, 2).unwrap();
    let mut traces = MemoryStore::new();
    let mut pairing = Pairing(Vec::new());
    PwStackEngine::new(config())
        .process(&fixture.request(), &mut traces, &mut pairing)
        .unwrap();

    // 20 samples at 0.5 s give coherence at 0..=9 s
    assert_eq!(pairing.0, vec![(1, 10), (2, 10), (3, 10), (4, 10)]);
}
