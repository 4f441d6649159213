use anyhow::Context;
use clap::Parser;
use generator::profile::{build_ensemble, GeneratorConfig};
use pwstackcore::seismic::naming::make_dfile_name;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;
use workflow::store::JsonLinesStore;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Plane-wave stacking of a synthetic array ensemble")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Directory receiving stacked traces, coherence and the run summary
    #[arg(long, default_value = "pwstack_out")]
    output: PathBuf,
    /// Stations along each side of the synthetic array
    #[arg(long, default_value_t = 5)]
    stations: usize,
    /// Station spacing in km
    #[arg(long, default_value_t = 10.0)]
    spacing: f64,
    #[arg(long, default_value_t = 0.02, allow_hyphen_values = true)]
    true_dux: f64,
    #[arg(long, default_value_t = -0.01, allow_hyphen_values = true)]
    true_duy: f64,
    #[arg(long, default_value_t = 0.04)]
    grid_umax: f64,
    #[arg(long, default_value_t = 9)]
    grid_n: usize,
    /// Gaussian aperture width in km
    #[arg(long, default_value_t = 30.0)]
    aperture: f64,
    /// Distance beyond which stations get zero weight, km
    #[arg(long, default_value_t = 100.0)]
    cutoff: f64,
    #[arg(long, default_value_t = 1)]
    workers: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Log per-node progress at info level
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        let generator = GeneratorConfig {
            nx: args.stations,
            ny: args.stations,
            spacing: args.spacing,
            true_dux: args.true_dux,
            true_duy: args.true_duy,
            seed: args.seed,
            ..Default::default()
        };
        WorkflowConfig::from_args(
            args.grid_umax,
            args.grid_n,
            args.aperture,
            args.cutoff,
            args.workers,
            generator,
        )?
    };
    if args.verbose {
        workflow_config.stack.verbose = true;
    }

    let ensemble = build_ensemble(&workflow_config.generator)?;
    let gen = &workflow_config.generator;
    let dfile = make_dfile_name(gen.evid, gen.ix1, gen.ix2);

    fs::create_dir_all(&args.output)
        .with_context(|| format!("creating output directory {}", args.output.display()))?;
    let mut traces = JsonLinesStore::create(args.output.join(format!("{dfile}.stack.jsonl")))
        .context("opening stack output")?;
    let mut coherence = JsonLinesStore::create(args.output.join(format!("{dfile}.coh.jsonl")))
        .context("opening coherence output")?;
    let trace_path = traces.path().to_path_buf();

    let runner = Runner::new(workflow_config);
    let result = runner.execute(&ensemble, &mut traces, &mut coherence)?;
    let trace_records = traces.finish().context("flushing stack output")?;
    let coherence_records = coherence.finish().context("flushing coherence output")?;

    println!(
        "Stacked {} -> outcome {:?}, fold {}, committed {}",
        dfile,
        result.outcome,
        result.outcome.fold(),
        result.outcome.committed()
    );
    if let Some(peak) = result.peak {
        println!(
            "Peak coherence {:.3} at gridid {} (dux {:.4}, duy {:.4})",
            peak.coherence, peak.gridid, peak.dux, peak.duy
        );
    }
    println!(
        "Wrote {} stacks to {} and {} coherence records",
        trace_records,
        trace_path.display(),
        coherence_records
    );

    let report = format!(
        "dfile={} outcome={:?} fold={} committed={} peak={:?} nodes_empty={}\n",
        dfile,
        result.outcome,
        result.outcome.fold(),
        result.outcome.committed(),
        result.peak,
        result.metrics.nodes_empty
    );
    let report_path = args.output.join("pwstack_summary.log");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&report_path)
        .with_context(|| format!("opening run summary {}", report_path.display()))?;
    file.write_all(report.as_bytes())?;

    Ok(())
}
