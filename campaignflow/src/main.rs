use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing::{error, info, warn};

use campaignflow::classify::JsonMarkerClassifier;
use campaignflow::core::InputDescriptor;
use campaignflow::graph::StageGraphBuilder;
use campaignflow::observability::{init_logging, LogFormat};
use campaignflow::planner::CampaignPlanner;
use campaignflow::profiles::{EngineDescriptor, ExecutorProfileRegistry, GlobalConfig, ABACUS, LAMMPS, VASP};
use campaignflow::CampaignflowError;

#[derive(Parser)]
#[command(
    name = "campaignflow",
    version,
    about = "Assemble relaxation and property campaigns into one stage graph"
)]
#[command(group(ArgGroup::new("engine").required(true).args(["lammps", "vasp", "abacus"])))]
struct Cli {
    /// Campaign descriptor files (one or two)
    #[arg(required = true, num_args = 1..=2)]
    files: Vec<PathBuf>,

    /// Compute with LAMMPS
    #[arg(long)]
    lammps: bool,

    /// Compute with VASP
    #[arg(long)]
    vasp: bool,

    /// Compute with ABACUS
    #[arg(long)]
    abacus: bool,

    /// Run relaxation before properties (implied by passing two files)
    #[arg(long)]
    relax: bool,

    /// Path to the global configuration
    #[arg(short, long, default_value = "global.json", env = "CAMPAIGNFLOW_CONFIG")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn engine(&self) -> EngineDescriptor {
        if self.vasp {
            VASP
        } else if self.abacus {
            ABACUS
        } else {
            LAMMPS
        }
    }
}

fn manifest(cli: &Cli) -> anyhow::Result<serde_json::Value> {
    let config = GlobalConfig::load(&cli.config)
        .map_err(CampaignflowError::from)
        .with_context(|| format!("loading {}", cli.config.display()))?;

    if cli.relax && cli.files.len() == 1 {
        warn!("--relax has no effect with a single descriptor");
    }

    let descriptors: Vec<InputDescriptor> = cli.files.iter().map(InputDescriptor::new).collect();
    let planner = CampaignPlanner::new(Arc::new(JsonMarkerClassifier::new()));
    let plan = planner
        .plan(&descriptors)
        .map_err(CampaignflowError::from)?;
    info!(kind = ?plan.kind(), "Planned campaigns");

    let work_dir = match &config.work_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("resolving working directory")?,
    };
    let registry = ExecutorProfileRegistry::from_config(&config, EngineDescriptor::builtin());
    let graph = StageGraphBuilder::new(cli.engine(), work_dir).build(&plan, &registry)?;

    Ok(serde_json::json!({
        "graph": graph,
        "fingerprint": graph.fingerprint(),
    }))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    if let Err(err) = init_logging(format) {
        eprintln!("failed to initialize logging: {err}");
    }

    match manifest(&cli).and_then(|manifest| Ok(serde_json::to_string_pretty(&manifest)?)) {
        Ok(rendered) => {
            println!("{rendered}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.downcast_ref::<CampaignflowError>() {
                Some(inner) => error!(code = inner.code(), retryable = inner.is_retryable(), "{err:#}"),
                None => error!("{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
