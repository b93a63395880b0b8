//! # Overtones - Harmonic Analysis Host
//!
//! Command-line host for one harmonic analyzer. It reads the message stream
//! of a partial tracker (track updates, transform rules and frame triggers),
//! feeds it to `overtones-core` and writes each processed frame to stdout.
//!
//! ## Architecture
//! - **Reader Thread**: Reads input lines and parses them into messages
//! - **Main Thread**: Owns the analyzer and renders frames in arrival order
//! - **Communication**: A bounded crossbeam channel carries messages between them
//! - **Logging**: `tracing` to stderr, so stdout only carries frame output

mod protocol;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{Receiver, Sender};
use overtones_core::config::{self, OvertonesConfig};
use overtones_core::pivot::DEFAULT_MAX_HARMONIC;
use overtones_core::Overtones;
use protocol::Message;
use render::{FrameRenderer, OutputFormat};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use tracing_subscriber::EnvFilter;

// Messages buffered between the reader and the analyzer
const CHANNEL_CAPACITY: usize = 1024;

/// Command-line options.
#[derive(Debug, Parser)]
#[command(name = "overtones", version, about = "Classify partial tracks into harmonics and transform them")]
struct Args {
    /// Message file to read; stdin when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// JSON config file; command-line values override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of track slots
    #[arg(long)]
    capacity: Option<usize>,

    /// Minimum fundamental amplitude, as a fraction of the loudest partial
    #[arg(long)]
    min_fundamental_ratio: Option<f64>,

    /// Harmonic tolerance in semitones
    #[arg(long)]
    close_enough: Option<f64>,

    /// Frames a new fundamental must win before it is adopted
    #[arg(long)]
    history: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Harmonics with their own column in pivot output
    #[arg(long, default_value_t = DEFAULT_MAX_HARMONIC)]
    max_harmonic: u32,

    /// Log filter, e.g. "debug" or "overtones_core=trace"; overrides RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let config = resolve_config(&args)?;
    if args.dump_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    tracing::info!(?config, "[MAIN] Starting overtones host");
    let (message_tx, message_rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
    let reader = spawn_reader(args.input.clone(), message_tx)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut renderer = FrameRenderer::new(args.format, args.max_harmonic);
    let frames = run(Overtones::new(config), &message_rx, &mut renderer, &mut out)?;
    out.flush().context("flushing output")?;

    match reader.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("input reader thread panicked"),
    }
    tracing::info!(frames, "[MAIN] Input finished");
    Ok(())
}

/// Installs the stderr subscriber. `--log-level` wins over `RUST_LOG`.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Defaults, then the config file, then command-line values.
fn resolve_config(args: &Args) -> Result<OvertonesConfig> {
    let mut config = match &args.config {
        Some(path) => config::load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => OvertonesConfig::default(),
    };
    if let Some(capacity) = args.capacity {
        config.capacity = capacity;
    }
    if let Some(ratio) = args.min_fundamental_ratio {
        config.min_fundamental_amp_ratio = ratio;
    }
    if let Some(semitones) = args.close_enough {
        config.close_enough_semitones = semitones;
    }
    if let Some(history) = args.history {
        config.history_length = history;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Starts the thread that turns input lines into messages.
///
/// Malformed lines are logged with their line number and skipped. The
/// thread ends, closing the channel, at end of input.
fn spawn_reader(input: Option<PathBuf>, sender: Sender<Message>) -> Result<JoinHandle<Result<()>>> {
    let source: Box<dyn BufRead + Send> = match &input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("opening input {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let handle = thread::Builder::new()
        .name("overtones-reader".to_string())
        .spawn(move || {
            tracing::debug!("[READER] Starting input reader");
            for (number, line) in source.lines().enumerate() {
                let line = line.context("reading input")?;
                match protocol::parse_line(&line) {
                    Ok(Some(message)) => {
                        if sender.send(message).is_err() {
                            tracing::debug!("[READER] Analyzer stopped listening");
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(line = number + 1, "[READER] skipping line: {e:#}"),
                }
            }
            tracing::debug!("[READER] Input reader finished");
            Ok(())
        })
        .context("spawning input reader")?;
    Ok(handle)
}

/// Feeds messages to the analyzer until the channel closes.
///
/// # Returns
/// * Number of frames written
fn run(
    mut overtones: Overtones,
    messages: &Receiver<Message>,
    renderer: &mut FrameRenderer,
    out: &mut impl Write,
) -> Result<u64> {
    let mut frames = 0;
    for message in messages.iter() {
        match message {
            Message::Track(update) => {
                overtones.update_track(update);
            }
            Message::Transform { target, operator, operand, selector, selector_argument } => {
                if let Err(e) = overtones.add_rule(&target, &operator, operand, &selector, selector_argument) {
                    tracing::warn!("[MAIN] rejected transform rule: {e}");
                }
            }
            Message::Clear => overtones.clear_rules(),
            Message::Print => overtones.request_print(),
            Message::Bang => {
                let frame = overtones.process_frame();
                if let Some(dump) = &frame.dump {
                    for line in dump {
                        eprintln!("{line}");
                    }
                }
                renderer.write_frame(out, &frame).context("writing frame")?;
                frames += 1;
            }
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use overtones_core::TrackUpdate;
    use pretty_assertions::assert_eq;

    #[test]
    fn run_processes_messages_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let script = [
            Message::Track(TrackUpdate::new(0, 100.0, 1.0, 0)),
            Message::Track(TrackUpdate::new(1, 200.0, 0.5, 0)),
            Message::Transform {
                target: "freq".to_string(),
                operator: "*".to_string(),
                operand: 2.0,
                selector: "even".to_string(),
                selector_argument: None,
            },
            Message::Bang,
            Message::Clear,
            Message::Bang,
        ];
        for message in script {
            tx.send(message).unwrap();
        }
        drop(tx);

        let mut out = Vec::new();
        let mut renderer = FrameRenderer::new(OutputFormat::Text, DEFAULT_MAX_HARMONIC);
        let frames = run(Overtones::with_capacity(2), &rx, &mut renderer, &mut out).unwrap();
        assert_eq!(frames, 2);

        let text = String::from_utf8(out).unwrap();
        let tracks: Vec<&str> = text.lines().filter(|l| l.starts_with("track 1 ")).collect();
        assert_eq!(tracks, vec!["track 1 400 0.5 0;", "track 1 200 0.5 0;"]);
    }

    #[test]
    fn command_line_overrides_defaults() {
        let args = Args::parse_from(["overtones", "--capacity", "8", "--close-enough", "0.25"]);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.capacity, 8);
        assert_eq!(config.close_enough_semitones, 0.25);
        assert_eq!(config.history_length, 3);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = Args::parse_from(["overtones", "--history", "0"]);
        assert!(resolve_config(&args).is_err());
    }
}
