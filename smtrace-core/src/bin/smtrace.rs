//! smtrace CLI - Generate trace and state scripts from an object graph
//!
//! Usage:
//!     smtrace state --model session.json
//!     smtrace state --model session.json --properties all --include-hidden
//!     smtrace replay --model session.json --events events.jsonl --log

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use smtrace_core::{
    InMemoryObjectModel, PropertiesToTrace, TraceConfig, TraceContext, TraceEvent, TracingSink,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "smtrace")]
#[command(about = "Generate Python trace and state scripts")]
#[command(version)]
struct Args {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dump the state of an object graph as a script
    State {
        /// Object graph JSON
        #[arg(short, long)]
        model: PathBuf,

        /// Which properties to write (default: from config)
        #[arg(short, long, value_enum)]
        properties: Option<PropertiesArg>,

        /// Include hidden representations (shown, then hidden)
        #[arg(long)]
        include_hidden: bool,
    },

    /// Record a JSONL event log and print the resulting trace
    Replay {
        /// Object graph JSON
        #[arg(short, long)]
        model: PathBuf,

        /// One trace event per line
        #[arg(short, long)]
        events: PathBuf,

        /// Echo statements to the log as they are generated
        #[arg(long)]
        log: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PropertiesArg {
    All,
    Modified,
    UserModified,
}

impl From<PropertiesArg> for PropertiesToTrace {
    fn from(arg: PropertiesArg) -> Self {
        match arg {
            PropertiesArg::All => PropertiesToTrace::All,
            PropertiesArg::Modified => PropertiesToTrace::Modified,
            PropertiesArg::UserModified => PropertiesToTrace::UserModified,
        }
    }
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the script
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smtrace=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(script) => {
            print!("{}", script);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(code = e.error_code(), "{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> smtrace_core::Result<String> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::State {
            model,
            properties,
            include_hidden,
        } => {
            let ctx = context(&model, config.clone())?;
            let properties = properties
                .map(PropertiesToTrace::from)
                .unwrap_or(config.state.properties_to_trace_on_create);
            let skip_hidden = !include_hidden && config.state.skip_hidden_representations;
            tracing::info!(%properties, skip_hidden, "saving state");
            smtrace_core::get_state(&ctx, properties, skip_hidden)
        }
        Command::Replay { model, events, log } => {
            let ctx = context(&model, config)?;
            let content = std::fs::read_to_string(&events)?;
            let events = TraceEvent::parse_jsonl(&content)?;

            let tracer = ctx.start_trace();
            if log {
                tracer.set_log_to_stdout(true);
            }
            tracing::info!(tracer = %tracer.id(), events = events.len(), "replaying event log");
            for event in &events {
                ctx.record(event);
            }
            ctx.stop_trace()
        }
    }
}

fn load_config(path: Option<&Path>) -> smtrace_core::Result<TraceConfig> {
    let config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            TraceConfig::from_file(path)?
        }
        None => TraceConfig::default(),
    };
    config.with_env_overrides()
}

fn context(model_path: &Path, config: TraceConfig) -> smtrace_core::Result<TraceContext> {
    let model = InMemoryObjectModel::from_file(model_path)?;
    tracing::debug!(path = %model_path.display(), objects = model.len(), "loaded object model");
    // stdout is reserved for the script, so live output goes through tracing
    Ok(TraceContext::new(Arc::new(model))
        .with_sink(Arc::new(TracingSink))
        .with_config(config))
}
