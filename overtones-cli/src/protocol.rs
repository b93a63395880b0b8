//! # Message Protocol
//!
//! Parses the line-oriented message stream the host reads. One message per
//! line, an optional trailing `;`, `#` starts a comment:
//!
//! ```text
//! list 0 110.2 0.83 1;          track update (the `list` word is optional)
//! transform amp = 0.5 odd;      add a transform rule
//! clear;                        remove all rules
//! print;                        dump the next frame to stderr
//! bang;                         process a frame
//! ```

use anyhow::{Context, Result, anyhow, bail};
use overtones_core::TrackUpdate;

/// A single parsed input message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Track(TrackUpdate),
    Bang,
    Transform {
        target: String,
        operator: String,
        operand: f64,
        selector: String,
        selector_argument: Option<f64>,
    },
    Clear,
    Print,
}

/// Parses one input line.
///
/// # Returns
/// * `Ok(Some(message))` - A message to forward to the analyzer
/// * `Ok(None)` - Blank line, comment, or a track update for a negative slot
/// * `Err(e)` - The line is malformed
pub fn parse_line(line: &str) -> Result<Option<Message>> {
    let line = line.split('#').next().unwrap_or("").trim();
    let line = line.strip_suffix(';').unwrap_or(line).trim();
    let words: Vec<&str> = line.split_whitespace().collect();

    let Some((&head, rest)) = words.split_first() else {
        return Ok(None);
    };

    match head {
        "bang" => expect_no_arguments(head, rest).map(|_| Some(Message::Bang)),
        "clear" => expect_no_arguments(head, rest).map(|_| Some(Message::Clear)),
        "print" => expect_no_arguments(head, rest).map(|_| Some(Message::Print)),
        "transform" => parse_transform(rest).map(Some),
        "list" => parse_track(rest),
        _ if head.parse::<f64>().is_ok() => parse_track(&words),
        other => Err(anyhow!("unknown message '{other}'")),
    }
}

fn expect_no_arguments(head: &str, rest: &[&str]) -> Result<()> {
    if rest.is_empty() {
        Ok(())
    } else {
        bail!("'{head}' takes no arguments, got {}", rest.len())
    }
}

fn number(word: &str, what: &str) -> Result<f64> {
    let value = word.parse::<f64>().with_context(|| format!("{what} '{word}' is not a number"))?;
    if !value.is_finite() {
        bail!("{what} '{word}' must be finite");
    }
    Ok(value)
}

/// `i f a flag`, numbers truncated to integers where the field is integral.
fn parse_track(fields: &[&str]) -> Result<Option<Message>> {
    if fields.len() != 4 {
        bail!("track updates expect lists of 4 numbers, got {}", fields.len());
    }
    let index = number(fields[0], "track index")?.trunc();
    let frequency = number(fields[1], "frequency")?;
    let amplitude = number(fields[2], "amplitude")?;
    let flag = number(fields[3], "flag")?.trunc() as i32;

    if index < 0.0 {
        tracing::trace!(index, "[PROTOCOL] ignoring negative track index");
        return Ok(None);
    }
    Ok(Some(Message::Track(TrackUpdate::new(index as usize, frequency, amplitude, flag))))
}

/// `target operator operand selector [argument]`.
fn parse_transform(fields: &[&str]) -> Result<Message> {
    if !(4..=5).contains(&fields.len()) {
        bail!("transform expects 4 or 5 arguments, got {}", fields.len());
    }
    Ok(Message::Transform {
        target: fields[0].to_string(),
        operator: fields[1].to_string(),
        operand: number(fields[2], "transform operand")?,
        selector: fields[3].to_string(),
        selector_argument: fields.get(4).map(|w| number(w, "selector argument")).transpose()?,
    })
}
