//! # Frame Rendering
//!
//! Writes processed frames to stdout in one of three formats:
//! - `text`: the two legacy lists per slot, `track …;` and `analysis …;`
//! - `json`: one JSON object per frame
//! - `pivot`: one CSV row of per-harmonic levels per frame

use std::io::{self, Write};

use clap::ValueEnum;
use overtones_core::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Pivot,
}

/// Stateful writer for a stream of frames.
#[derive(Debug)]
pub struct FrameRenderer {
    format: OutputFormat,
    max_harmonic: u32,
    header_written: bool,
}

impl FrameRenderer {
    pub fn new(format: OutputFormat, max_harmonic: u32) -> Self {
        Self { format, max_harmonic, header_written: false }
    }

    pub fn write_frame(&mut self, out: &mut impl Write, frame: &Frame) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => write_text(out, frame),
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, frame).map_err(io::Error::other)?;
                writeln!(out)
            }
            OutputFormat::Pivot => {
                if !self.header_written {
                    write_pivot_header(out, self.max_harmonic)?;
                    self.header_written = true;
                }
                write_pivot_row(out, frame, self.max_harmonic)
            }
        }
    }
}

fn join(values: &[f64]) -> String {
    values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
}

fn write_text(out: &mut impl Write, frame: &Frame) -> io::Result<()> {
    for record in &frame.records {
        writeln!(out, "track {};", join(&record.track_list()))?;
        writeln!(out, "analysis {};", join(&record.analysis_list()))?;
    }
    Ok(())
}

fn write_pivot_header(out: &mut impl Write, max_harmonic: u32) -> io::Result<()> {
    let mut columns = vec!["pitch".to_string(), "note".to_string(), "dB".to_string()];
    columns.extend((1..=max_harmonic).map(|n| n.to_string()));
    columns.push("tweeters".to_string());
    columns.push("outliers".to_string());
    writeln!(out, "{}", columns.join(","))
}

fn write_pivot_row(out: &mut impl Write, frame: &Frame, max_harmonic: u32) -> io::Result<()> {
    let pivot = frame.pivot(max_harmonic);
    let pitch = pivot.fundamental.map(|f| f.to_string()).unwrap_or_default();
    let note = pivot
        .fundamental
        .and_then(overtones_core::notes::nearest_note)
        .map(|n| n.name)
        .unwrap_or_default();
    let mut cells = vec![pitch, note, format!("{:.3}", pivot.level_db)];
    cells.extend(pivot.relative_db().into_iter().map(|db| format!("{db:.3}")));
    writeln!(out, "{}", cells.join(","))
}
