use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use wave_core::{EngineConfig, ReconstructionContext, SystemState, WaveOrchestrator, WaveType};
use wave_store::Store;
use wave_store::paths::CONFIG_FILE;

#[derive(Parser)]
#[command(name = "wave", about = "Wave-interference memory engine CLI")]
struct Cli {
    /// Config file (default: <data dir>/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Propagate a wave from a region and store it as a fragment
    Propagate {
        /// Content carried by the wave
        text: String,

        /// Source region
        #[arg(long)]
        region: String,

        /// Wave type
        #[arg(long = "type", default_value = "context")]
        wave_type: WaveType,

        /// Initial amplitude in [0, 1]
        #[arg(long, default_value_t = 1.0)]
        amplitude: f64,

        /// Target region (repeatable; default is every region)
        #[arg(long = "target")]
        targets: Vec<String>,
    },

    /// Reconstruct stored information relevant to a context
    Reconstruct {
        /// Context text
        text: String,

        /// Prefer fragments of this wave type
        #[arg(long = "type")]
        wave_type: Option<WaveType>,

        /// Required coherence in [0, 1]
        #[arg(long, default_value_t = 0.3)]
        coherence: f64,
    },

    /// Run the graceful degradation path for a context
    Degrade {
        /// Context text
        text: String,
    },

    /// Show a system state snapshot
    State,

    /// Forget every stored fragment
    Flush,

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Serialize)]
struct PropagateOutput {
    signal_id: String,
    #[serde(flatten)]
    state: SystemState,
}

fn data_dir() -> PathBuf {
    wave_store::resolve_data_dir()
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| data_dir().join(CONFIG_FILE));
    wave_store::load_config(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

fn open_store() -> Result<Store> {
    wave_store::open_data_dir(&data_dir()).context("failed to open blob store")
}

fn build_orchestrator(cli: &Cli, store: Store) -> Result<WaveOrchestrator> {
    let config = load_config(cli)?;
    WaveOrchestrator::new(config, Some(Box::new(store))).context("failed to build orchestrator")
}

fn open_orchestrator(cli: &Cli) -> Result<WaveOrchestrator> {
    build_orchestrator(cli, open_store()?)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Propagate {
            text,
            region,
            wave_type,
            amplitude,
            targets,
        } => cmd_propagate(&cli, text, region, *wave_type, *amplitude, targets),
        Commands::Reconstruct {
            text,
            wave_type,
            coherence,
        } => cmd_reconstruct(&cli, text, *wave_type, *coherence),
        Commands::Degrade { text } => cmd_degrade(&cli, text),
        Commands::State => cmd_state(&cli),
        Commands::Flush => cmd_flush(&cli),
        Commands::Config => cmd_config(&cli),
    }
}

fn print_state(state: &SystemState) {
    println!("signals:    {}", state.active_signals);
    println!("fragments:  {}", state.total_fragments);
    println!("coherence:  {:.3}", state.system_coherence);
    println!("patterns:   {}", state.active_patterns);
    println!("emergent:   {}", state.emergent_behaviors);
}

fn cmd_propagate(
    cli: &Cli,
    text: &str,
    region: &str,
    wave_type: WaveType,
    amplitude: f64,
    targets: &[String],
) -> Result<()> {
    let mut orchestrator = open_orchestrator(cli)?;
    let targets = (!targets.is_empty()).then(|| targets.to_vec());
    let signal_id = orchestrator.propagate_wave(region, text, wave_type, amplitude, targets);
    let state = orchestrator.get_system_state();

    if cli.json {
        let out = PropagateOutput {
            signal_id: signal_id.to_string(),
            state,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("signal:     {signal_id}");
        print_state(&state);
    }
    Ok(())
}

fn cmd_reconstruct(
    cli: &Cli,
    text: &str,
    wave_type: Option<WaveType>,
    coherence: f64,
) -> Result<()> {
    let mut orchestrator = open_orchestrator(cli)?;
    let mut context = ReconstructionContext::new(text);
    if let Some(t) = wave_type {
        context = context.with_type(t);
    }

    match orchestrator.enhance_with_holographic_reconstruction(&context, coherence) {
        Some(text) => println!("{text}"),
        None => println!("(no reconstruction)"),
    }

    if cli.verbose {
        eprintln!(
            "--- fragments={}, regions={} ---",
            orchestrator.fragment_store().fragment_count(),
            orchestrator.fragment_store().regions().count()
        );
    }
    Ok(())
}

fn cmd_degrade(cli: &Cli, text: &str) -> Result<()> {
    let mut orchestrator = open_orchestrator(cli)?;
    let result = orchestrator.graceful_degradation(&ReconstructionContext::new(text));
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn cmd_state(cli: &Cli) -> Result<()> {
    let store = open_store()?;
    if cli.verbose {
        let version = store.schema_version()?.unwrap_or(0);
        let keys = store.blob_keys()?;
        eprintln!("--- schema=v{version}, blobs={} ---", keys.len());
    }

    let mut orchestrator = build_orchestrator(cli, store)?;
    let state = orchestrator.get_system_state();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_state(&state);
    }
    Ok(())
}

fn cmd_flush(cli: &Cli) -> Result<()> {
    let mut orchestrator = open_orchestrator(cli)?;
    let count = orchestrator.fragment_store().fragment_count();
    orchestrator.flush_all_memory();
    println!("flushed {count} fragments");
    Ok(())
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    print!("{}", wave_store::to_toml(&config)?);
    Ok(())
}
