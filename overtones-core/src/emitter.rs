//! # Emitter Module
//!
//! Turns the classified track table into output records, one per slot in
//! slot order, and renders the frequency-sorted diagnostic dump.

use serde::Serialize;

use crate::notes;
use crate::track::{HarmonicNumber, TrackTable};
use crate::transform::{FrameReference, TransformPipeline};

/// Annotated output for one slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    pub index: usize,
    pub harmonic: HarmonicNumber,
    /// Legacy signed harmonic number (`-1` for outliers), as in the analysis list.
    pub harmonic_number: i32,
    /// Frequency as reported by the tracker.
    pub frequency: f64,
    /// Amplitude as reported by the tracker.
    pub amplitude: f64,
    /// Raw tracker flag, `-1` when inactive.
    pub flag: i32,
    pub active: bool,
    pub amplitude_ratio: f64,
    pub frequency_ratio: f64,
    pub score: f64,
    /// Frequency after the transform pipeline.
    pub transformed_frequency: f64,
    /// Amplitude after the transform pipeline.
    pub transformed_amplitude: f64,
}

impl OutputRecord {
    /// Track-shaped list: `[index, freq, amp, flag]` with transformed values.
    pub fn track_list(&self) -> [f64; 4] {
        [
            self.index as f64,
            self.transformed_frequency,
            self.transformed_amplitude,
            self.flag as f64,
        ]
    }

    /// Analysis list:
    /// `[freq ratio, harmonic, amp ratio, index, freq, amp, flag, score]`.
    pub fn analysis_list(&self) -> [f64; 8] {
        [
            self.frequency_ratio,
            self.harmonic_number as f64,
            self.amplitude_ratio,
            self.index as f64,
            self.transformed_frequency,
            self.transformed_amplitude,
            self.flag as f64,
            self.score,
        ]
    }
}

/// Builds one record per slot, in slot order.
pub fn emit(table: &TrackTable, pipeline: &TransformPipeline, reference: FrameReference) -> Vec<OutputRecord> {
    table
        .slots()
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let (transformed_frequency, transformed_amplitude) = pipeline.apply(slot, reference);
            OutputRecord {
                index,
                harmonic: slot.harmonic,
                harmonic_number: slot.harmonic.legacy(),
                frequency: slot.frequency,
                amplitude: slot.amplitude,
                flag: slot.flag,
                active: slot.is_active(),
                amplitude_ratio: reference.amplitude_ratio(slot.amplitude),
                frequency_ratio: reference.frequency_ratio(slot.frequency),
                score: slot.score,
                transformed_frequency,
                transformed_amplitude,
            }
        })
        .collect()
}

/// Amplitude as a percentage of the fundamental, rounded to two decimals.
pub fn amplitude_percent(amplitude: f64, fundamental_amplitude: f64) -> f64 {
    if fundamental_amplitude > 0.0 {
        (10000.0 * amplitude / fundamental_amplitude).round() / 100.0
    } else {
        0.0
    }
}

/// Renders the human-readable dump of a frame, sorted by frequency.
///
/// The first line describes the fundamental; each following line describes
/// one active slot.
pub fn render_dump(records: &[OutputRecord], reference: FrameReference) -> Vec<String> {
    let mut lines = Vec::with_capacity(records.len() + 1);

    let note = notes::nearest_note(reference.frequency)
        .map(|note| format!(" ({} {:+.1}c)", note.name, note.cents))
        .unwrap_or_default();
    lines.push(format!(
        "fundamental_freq {:.6} fundamental_amp {:.6}{note}",
        reference.frequency, reference.amplitude
    ));

    let mut sorted: Vec<&OutputRecord> = records.iter().filter(|r| r.active).collect();
    sorted.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));

    for record in sorted {
        let percent = amplitude_percent(record.amplitude, reference.amplitude);
        let line = if record.harmonic.is_outlier() {
            format!(
                "outlier {:.6}: f = {:.6} a = {:.2} raw_a = {:.6}",
                record.frequency_ratio, record.frequency, percent, record.amplitude
            )
        } else {
            format!(
                "harmonic {}: f = {:.6} a = {:.2} raw_a = {:.6}",
                record.harmonic_number,
                record.frequency,
                percent,
                record.amplitude
            )
        };
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::TrackUpdate;
    use pretty_assertions::assert_eq;

    fn classified_table() -> TrackTable {
        let mut table = TrackTable::new(3);
        table.apply(TrackUpdate::new(0, 300.0, 0.25, 0));
        table.apply(TrackUpdate::new(1, 100.0, 0.5, 1));
        table.slots_mut()[0].harmonic = HarmonicNumber::Harmonic(3);
        table.slots_mut()[1].harmonic = HarmonicNumber::Fundamental;
        table.slots_mut()[1].score = 1.25;
        table
    }

    #[test]
    fn records_follow_slot_order_and_carry_ratios() {
        let table = classified_table();
        let reference = FrameReference { frequency: 100.0, amplitude: 0.5 };
        let mut pipeline = TransformPipeline::new();
        pipeline.add_rule("freq", "*", 2.0, "=", Some(3.0)).unwrap();

        let records = emit(&table, &pipeline, reference);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].track_list(), [0.0, 600.0, 0.25, 0.0]);
        assert_eq!(records[1].analysis_list(), [1.0, 1.0, 1.0, 1.0, 100.0, 0.5, 1.0, 1.25]);
        assert_eq!(records[2].analysis_list(), [0.0, -1.0, 0.0, 2.0, 0.0, 0.0, -1.0, 0.0]);
        assert_eq!(records[0].frequency, 300.0);
    }

    #[test]
    fn dump_header_has_no_note_without_fundamental() {
        let lines = render_dump(&[], FrameReference::default());
        assert_eq!(lines, vec!["fundamental_freq 0.000000 fundamental_amp 0.000000".to_string()]);
    }

    #[test]
    fn records_carry_the_legacy_harmonic_number() {
        let table = classified_table();
        let records = emit(&table, &TransformPipeline::new(), FrameReference::default());
        let numbers: Vec<i32> = records.iter().map(|r| r.harmonic_number).collect();
        assert_eq!(numbers, vec![3, 1, -1]);
    }

    #[test]
    fn ratios_are_zero_without_fundamental() {
        let table = classified_table();
        let records = emit(&table, &TransformPipeline::new(), FrameReference::default());
        assert!(records.iter().all(|r| r.frequency_ratio == 0.0 && r.amplitude_ratio == 0.0));
    }

    #[test]
    fn dump_is_sorted_by_frequency_and_skips_inactive() {
        let table = classified_table();
        let reference = FrameReference { frequency: 100.0, amplitude: 0.5 };
        let records = emit(&table, &TransformPipeline::new(), reference);
        let lines = render_dump(&records, reference);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "fundamental_freq 100.000000 fundamental_amp 0.500000 (G2 +35.0c)");
        assert_eq!(lines[1], "harmonic 1: f = 100.000000 a = 100.00 raw_a = 0.500000");
        assert_eq!(lines[2], "harmonic 3: f = 300.000000 a = 50.00 raw_a = 0.250000");
    }

    #[test]
    fn percent_guards_against_silent_fundamental() {
        assert_eq!(amplitude_percent(0.3, 0.0), 0.0);
        assert_eq!(amplitude_percent(1.0, 3.0), 33.33);
    }
}
