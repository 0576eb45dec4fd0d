//! Interaction recorder CLI
//!
//! Drives the capture pipeline outside a browser:
//!   interaction-recorder replay --dom page.json --script events.json
//!   interaction-recorder locate --dom page.json --target submit
//!   interaction-recorder decode --marker <marker> console.log

mod config;
mod script;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interaction_recorder::{
    fragment_for, path_for, DomSnapshot, InteractionRecorder, LogDecoder, Marker, RecorderError,
    WriterSink,
};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "interaction-recorder")]
#[command(about = "Capture page interactions as selector paths and marker-prefixed JSON lines")]
struct Cli {
    /// Recorder configuration file (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay scripted interactions against a DOM snapshot and print the log lines
    Replay {
        /// DOM snapshot (JSON)
        #[arg(long)]
        dom: PathBuf,

        /// Scripted interactions (JSON array)
        #[arg(long)]
        script: PathBuf,

        /// Marker prefix, overrides the configuration file
        #[arg(long)]
        marker: Option<String>,

        /// Write log lines here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the finished session as JSON
        #[arg(long)]
        save: Option<PathBuf>,

        /// Session name
        #[arg(long, default_value = "replay")]
        name: String,
    },

    /// Print the selector path of a snapshot element
    Locate {
        #[arg(long)]
        dom: PathBuf,

        /// The element's `ref` label
        #[arg(long)]
        target: String,

        /// Print only the element's own fragment
        #[arg(long)]
        fragment: bool,
    },

    /// Extract recorder records from a mixed console log
    Decode {
        #[arg(long)]
        marker: String,

        /// Log file, stdin when omitted
        input: Option<PathBuf>,

        /// Stop at the first undecodable marked line
        #[arg(long)]
        strict: bool,
    },
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    // stdout carries the record lines, so logs go to stderr
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Replay {
            dom,
            script,
            marker,
            output,
            save,
            name,
        } => {
            if marker.is_some() {
                config.marker = marker;
            }
            let mut built = DomSnapshot::load_from_file(&dom)
                .with_context(|| format!("Failed to load DOM snapshot {}", dom.display()))?
                .build()?;
            let steps = script::load_script(&script)?;

            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(
                    File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                ),
                None => Box::new(io::stdout().lock()),
            };
            let mut recorder = InteractionRecorder::new(name, config, WriterSink::new(writer))?;
            info!("Recording with marker {}", recorder.marker());

            for step in &steps {
                let raw = step.prepare(&mut built)?;
                recorder.dispatch(&raw)?;
            }

            let ignored = steps
                .iter()
                .filter(|step| !recorder.config().records(step.kind))
                .count();
            if ignored > 0 {
                info!("{ignored} steps ignored, their kind is not recorded");
            }

            recorder.stop(&|message: &str| info!("record toggle signalled {message:?}"));
            if let Some(path) = save {
                recorder.save(&path)?;
            }
            info!("Replayed {} interactions", steps.len());
        }

        Commands::Locate {
            dom,
            target,
            fragment,
        } => {
            let built = DomSnapshot::load_from_file(&dom)
                .with_context(|| format!("Failed to load DOM snapshot {}", dom.display()))?
                .build()?;
            let id = built.resolve(&target).with_context(|| {
                let mut known: Vec<&str> = built.refs().map(|(name, _)| name).collect();
                known.sort_unstable();
                format!("Known refs: {}", known.join(", "))
            })?;
            let node = built
                .tree
                .node(id)
                .with_context(|| format!("Ref '{target}' points outside the tree"))?;

            if fragment {
                println!("{}", fragment_for(&node));
            } else {
                println!("{}", path_for(&node));
            }
        }

        Commands::Decode {
            marker,
            input,
            strict,
        } => {
            let marker = Marker::new(marker)?;
            let reader: Box<dyn io::BufRead> = match &input {
                Some(path) => Box::new(BufReader::new(
                    File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
                )),
                None => Box::new(io::stdin().lock()),
            };

            let mut stdout = io::stdout().lock();
            let mut failed = 0usize;
            for record in LogDecoder::new(reader, marker) {
                match record {
                    Ok(record) => writeln!(stdout, "{}", serde_json::to_string(&record)?)?,
                    Err(e @ RecorderError::Io(_)) => {
                        return Err(e).context("Failed to read the log");
                    }
                    Err(e) if !strict => {
                        warn!("Skipping undecodable line: {e}");
                        failed += 1;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            if failed > 0 {
                warn!("{failed} marked lines could not be decoded");
            }
        }
    }

    Ok(())
}
