//! # Note Naming Module
//!
//! Equal-tempered note names for annotating fundamentals in diagnostic
//! output. The table spans MIDI notes 0 to 127 with A4 = 440 Hz and is built
//! once, on first use.

use once_cell::sync::Lazy;

/// Lowest frequency in the note table (MIDI 0, C-1).
const LOWEST_NOTE_HZ: f64 = 8.175798915643707;

/// A single note of the equal-tempered table.
#[derive(Debug, Clone)]
struct Note {
    name: String,
    frequency: f64,
}

/// MIDI notes 0..=127 in ascending frequency.
static NOTES: Lazy<Vec<Note>> = Lazy::new(|| {
    const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    (0..128)
        .map(|midi: i32| {
            // f = 440 * 2^((n - 69) / 12); octave numbering puts MIDI 60 at C4.
            let frequency = 440.0 * 2.0_f64.powf((midi - 69) as f64 / 12.0);
            let name = format!("{}{}", NOTE_NAMES[(midi % 12) as usize], midi / 12 - 1);
            Note { name, frequency }
        })
        .collect()
});

/// The note nearest to a frequency and how far off it is.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteName {
    /// Note name (e.g., "A4", "C#3")
    pub name: String,
    /// Equal-tempered frequency of the note in Hz
    pub frequency: f64,
    /// Deviation of the input from the note (positive = sharp)
    pub cents: f64,
}

/// Finds the closest note to a frequency.
///
/// # Returns
/// * `Some(NoteName)` - Nearest note, clamped to the ends of the table
/// * `None` - The frequency is not positive or not finite
pub fn nearest_note(freq: f64) -> Option<NoteName> {
    if !freq.is_finite() || freq <= 0.0 {
        return None;
    }
    let position = 12.0 * (freq / LOWEST_NOTE_HZ).log2();
    let index = position.round().clamp(0.0, (NOTES.len() - 1) as f64) as usize;
    let note = &NOTES[index];
    Some(NoteName {
        name: note.name.clone(),
        frequency: note.frequency,
        cents: cents_deviation(freq, note.frequency),
    })
}

/// Calculates the deviation from a target frequency in cents.
///
/// 100 cents = 1 semitone, positive values are sharp.
pub fn cents_deviation(freq: f64, target_freq: f64) -> f64 {
    1200.0 * (freq / target_freq).log2()
}
