use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use ldk_approval::{ApprovalSource, FixedApprovals, SimulatedDesk};
use ldk_demand::{load_demand, DEFAULT_LOT_SIZE};
use ldk_engine::{Distributor, DistributorOptions, ReallocationTrigger};
use ldk_report::{
    file_digest, summarize_run, verify_run_log, write_allocations_csv, RunLogWriter, RunRecord,
};

#[derive(Parser)]
#[command(name = "ldk")]
#[command(about = "LocateDesk allocation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Distribute approved locates using an approvals file
    Allocate {
        /// Request CSV (client_name,symbol,number_of_locates_requested[,round_lot_size])
        #[arg(long)]
        requests: PathBuf,

        /// Approvals JSON object file, e.g. {"ABC": 400, "QQQ": 80}
        #[arg(long)]
        approvals: PathBuf,

        /// Results CSV destination
        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        opts: EngineOpts,
    },

    /// Distribute using the simulated approval desk
    Simulate {
        /// Request CSV (client_name,symbol,number_of_locates_requested[,round_lot_size])
        #[arg(long)]
        requests: PathBuf,

        /// Results CSV destination
        #[arg(long)]
        out: PathBuf,

        /// RNG seed; omit for entropy-seeded decisions
        #[arg(long)]
        seed: Option<u64>,

        /// Per-symbol approval probability
        #[arg(long, default_value_t = 0.7)]
        probability: f64,

        /// Upper bound on any single symbol's approved quantity
        #[arg(long, default_value_t = 1000)]
        max_per_symbol: u64,

        #[command(flatten)]
        opts: EngineOpts,
    },

    /// Verify a run log's hash chain
    VerifyLog {
        /// Run log (JSON Lines) to check
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Args)]
struct EngineOpts {
    /// Lot size applied when the request file has no round_lot_size column
    #[arg(long, default_value_t = DEFAULT_LOT_SIZE)]
    lot_size: u64,

    /// When to run lot realignment
    #[arg(long, value_enum, default_value_t = TriggerArg::AnyUnsatisfied)]
    trigger: TriggerArg,

    /// Re-apply the per-client request cap after realignment
    #[arg(long, default_value_t = false)]
    recap: bool,

    /// Append a run record to this JSONL log
    #[arg(long)]
    run_log: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TriggerArg {
    /// Realign whenever any client is not fully satisfied (historical)
    AnyUnsatisfied,
    /// Realign only when the request cap clipped a rounded entitlement
    CapClipped,
}

impl From<TriggerArg> for ReallocationTrigger {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::AnyUnsatisfied => ReallocationTrigger::AnyUnsatisfied,
            TriggerArg::CapClipped => ReallocationTrigger::CapClipped,
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Allocate {
            requests,
            approvals,
            out,
            opts,
        } => {
            let source = FixedApprovals::from_json_path(&approvals)
                .with_context(|| format!("load approvals from '{}'", approvals.display()))?;
            run_distribution(&requests, &out, &source, &opts)
        }

        Commands::Simulate {
            requests,
            out,
            seed,
            probability,
            max_per_symbol,
            opts,
        } => {
            let desk = SimulatedDesk {
                approve_probability: probability,
                max_per_symbol,
                seed,
            };
            run_distribution(&requests, &out, &desk, &opts)
        }

        Commands::VerifyLog { path } => {
            let records = verify_run_log(&path)?;
            println!("run_log_ok=true records={records}");
            Ok(())
        }
    }
}

/// Shared pipeline: ingest demand, obtain approvals, distribute, emit.
fn run_distribution(
    requests: &Path,
    out: &Path,
    source: &dyn ApprovalSource,
    opts: &EngineOpts,
) -> Result<()> {
    let (book, report) = load_demand(requests, opts.lot_size)
        .with_context(|| format!("load requests from '{}'", requests.display()))?;

    if !report.is_clean() {
        warn!(
            "dropped {} of {} request rows during ingest",
            report.rows_dropped(),
            report.rows_seen
        );
        for d in &report.dropped {
            warn!("line {}: {}", d.line, d.reason.as_str());
        }
    }
    info!(
        "demand book loaded: {} rows across {} symbols",
        report.rows_accepted,
        book.symbols.len()
    );

    let totals = book.totals_by_symbol();
    let approved = source.approve(&totals).context("obtain approvals")?;
    info!(
        "'{}' approved {} of {} symbols",
        source.name(),
        approved.len(),
        totals.len()
    );

    let distributor = Distributor::new(DistributorOptions {
        trigger: opts.trigger.into(),
        recap_after_realign: opts.recap,
    });
    let allocations = distributor
        .distribute(&book, &approved)
        .context("distribute locates")?;

    write_allocations_csv(out, &allocations)
        .with_context(|| format!("write results to '{}'", out.display()))?;

    if let Some(log_path) = &opts.run_log {
        let digest = file_digest(requests)?;
        let mut log = RunLogWriter::new(log_path)?;
        let record = RunRecord::new(
            source.name(),
            digest,
            summarize_run(&book, &approved, &allocations),
        );
        let hash = log.append(record)?;
        info!("run recorded in '{}' ({hash})", log_path.display());
    }

    let served = allocations.values().filter(|s| !s.is_empty()).count();
    println!(
        "clients_served={served} symbols_approved={} out={}",
        approved.len(),
        out.display()
    );
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
