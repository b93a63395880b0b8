//! # Analyzer Module
//!
//! [`Overtones`] owns the state of one logical analyzer: the track table,
//! the fundamental selector's history and the transform rules. Track
//! updates and rule edits may arrive at any time between frames;
//! [`Overtones::process_frame`] runs selection, classification,
//! transformation and emission to completion and returns the frame.
//!
//! The analyzer is `Send` but not internally synchronised. A host that
//! shares it between threads must hold one lock for a whole frame.

use serde::Serialize;

use crate::classifier::HarmonicClassifier;
use crate::config::OvertonesConfig;
use crate::emitter::{self, OutputRecord};
use crate::error::TransformResult;
use crate::fundamental::{Fundamental, FundamentalSelector};
use crate::inharmonicity;
use crate::pivot::HarmonicPivot;
use crate::track::{TrackTable, TrackUpdate};
use crate::transform::{FrameReference, TransformPipeline, TransformRule};

/// Output of one processed frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Frame {
    /// Running frame counter, starting at 1.
    pub sequence: u64,
    pub fundamental_index: Option<usize>,
    /// 0 when the frame has no fundamental.
    pub fundamental_frequency: f64,
    /// 0 when the frame has no fundamental.
    pub fundamental_amplitude: f64,
    /// One record per slot, in slot order.
    pub records: Vec<OutputRecord>,
    /// Frequency-sorted diagnostic dump, present only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dump: Option<Vec<String>>,
}

impl Frame {
    pub fn reference(&self) -> FrameReference {
        FrameReference { frequency: self.fundamental_frequency, amplitude: self.fundamental_amplitude }
    }

    /// Amplitude totals per harmonic number.
    pub fn pivot(&self, max_harmonic: u32) -> HarmonicPivot {
        HarmonicPivot::from_records(&self.records, max_harmonic)
    }

    /// Inharmonicity constant fitted to the frame's positive harmonics.
    pub fn inharmonicity(&self) -> Option<f64> {
        inharmonicity::estimate_b(&inharmonicity::harmonic_partials(&self.records))
    }
}

/// One harmonic analyzer instance.
#[derive(Debug, Clone)]
pub struct Overtones {
    config: OvertonesConfig,
    tracks: TrackTable,
    selector: FundamentalSelector,
    classifier: HarmonicClassifier,
    pipeline: TransformPipeline,
    fundamental: Option<Fundamental>,
    print_requested: bool,
    frames: u64,
}

impl Default for Overtones {
    fn default() -> Self {
        Self::new(OvertonesConfig::default())
    }
}

impl Overtones {
    /// Creates an analyzer with all slots inactive and no rules.
    ///
    /// A capacity of `0` is replaced by the default of 20 slots.
    pub fn new(config: OvertonesConfig) -> Self {
        let capacity = config.effective_capacity();
        tracing::debug!(
            capacity,
            min_fundamental_amp_ratio = config.min_fundamental_amp_ratio,
            close_enough_semitones = config.close_enough_semitones,
            history_length = config.history_length,
            "[ANALYZER] creating analyzer"
        );
        Self {
            tracks: TrackTable::new(capacity),
            selector: FundamentalSelector::new(
                config.min_fundamental_amp_ratio,
                config.close_enough_semitones,
                config.history_length,
            ),
            classifier: HarmonicClassifier::new(config.close_enough_semitones),
            pipeline: TransformPipeline::new(),
            fundamental: None,
            print_requested: false,
            frames: 0,
            config: OvertonesConfig { capacity, ..config },
        }
    }

    /// Analyzer with `capacity` slots and default tuning.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(OvertonesConfig::with_capacity(capacity))
    }

    pub fn config(&self) -> &OvertonesConfig {
        &self.config
    }

    pub fn capacity(&self) -> usize {
        self.tracks.capacity()
    }

    pub fn tracks(&self) -> &TrackTable {
        &self.tracks
    }

    /// Fundamental of the most recently processed frame.
    pub fn fundamental(&self) -> Option<Fundamental> {
        self.fundamental
    }

    pub fn rules(&self) -> &[TransformRule] {
        self.pipeline.rules()
    }

    /// Stores a tracker update in its slot.
    ///
    /// Updates for slots beyond capacity are dropped; the return value says
    /// whether the update was kept.
    pub fn update_track(&mut self, update: TrackUpdate) -> bool {
        let kept = self.tracks.apply(update);
        if !kept {
            tracing::trace!(index = update.index, capacity = self.capacity(), "[ANALYZER] dropping track update");
        }
        kept
    }

    /// Parses and appends a transform rule.
    ///
    /// # Returns
    /// * `Ok(())` - The rule was appended
    /// * `Err(TransformError)` - The rule was rejected and the pipeline is unchanged
    pub fn add_rule(
        &mut self,
        target: &str,
        operator: &str,
        operand: f64,
        selector: &str,
        selector_argument: Option<f64>,
    ) -> TransformResult<()> {
        match self.pipeline.add_rule(target, operator, operand, selector, selector_argument) {
            Ok(()) => {
                if let Some(rule) = self.pipeline.rules().last() {
                    tracing::debug!(rule = %rule, count = self.pipeline.len(), "[RULES] added rule");
                }
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "[RULES] rejected rule");
                Err(e)
            }
        }
    }

    /// Appends an already-built rule.
    pub fn push_rule(&mut self, rule: TransformRule) {
        tracing::debug!(rule = %rule, "[RULES] added rule");
        self.pipeline.push(rule);
    }

    /// Removes every transform rule.
    pub fn clear_rules(&mut self) {
        tracing::debug!(count = self.pipeline.len(), "[RULES] clearing rules");
        self.pipeline.clear();
    }

    /// Requests a diagnostic dump with the next frame only.
    pub fn request_print(&mut self) {
        self.print_requested = true;
    }

    /// Runs the full per-frame pipeline and returns the annotated frame.
    pub fn process_frame(&mut self) -> Frame {
        self.frames += 1;

        let previous = self.fundamental.map(|f| f.index);
        self.fundamental = self.selector.select(&mut self.tracks);
        self.classifier.classify(&mut self.tracks, self.fundamental);

        let current = self.fundamental.map(|f| f.index);
        if current != previous {
            tracing::debug!(frame = self.frames, ?previous, ?current, "[ANALYZER] fundamental changed");
        }

        let reference = self
            .fundamental
            .map(|f| FrameReference { frequency: f.frequency, amplitude: f.amplitude })
            .unwrap_or_default();
        let records = emitter::emit(&self.tracks, &self.pipeline, reference);

        let dump = if std::mem::take(&mut self.print_requested) {
            let lines = emitter::render_dump(&records, reference);
            tracing::debug!(frame = self.frames, lines = lines.len(), "[ANALYZER] rendered diagnostic dump");
            Some(lines)
        } else {
            None
        };

        Frame {
            sequence: self.frames,
            fundamental_index: current,
            fundamental_frequency: reference.frequency,
            fundamental_amplitude: reference.amplitude,
            records,
            dump,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::HarmonicNumber;
    use pretty_assertions::assert_eq;

    #[test]
    fn zero_capacity_uses_default() {
        let overtones = Overtones::with_capacity(0);
        assert_eq!(overtones.capacity(), 20);
        assert_eq!(overtones.config().capacity, 20);
    }

    #[test]
    fn empty_analyzer_still_produces_a_frame() {
        let mut overtones = Overtones::with_capacity(3);
        let frame = overtones.process_frame();
        assert_eq!(frame.records.len(), 3);
        assert_eq!(frame.fundamental_index, None);
        assert!(frame.records.iter().all(|r| r.harmonic == HarmonicNumber::Outlier));
        assert!(frame.dump.is_none());
    }

    #[test]
    fn print_request_fires_once() {
        let mut overtones = Overtones::with_capacity(2);
        overtones.update_track(TrackUpdate::new(0, 220.0, 1.0, 0));
        overtones.request_print();
        assert!(overtones.process_frame().dump.is_some());
        assert!(overtones.process_frame().dump.is_none());
    }

    #[test]
    fn rejected_rule_leaves_rules_unchanged() {
        let mut overtones = Overtones::default();
        overtones.add_rule("amp", "*", 0.5, "even", None).unwrap();
        assert!(overtones.add_rule("amp", "-", 0.5, "even", None).is_err());
        assert_eq!(overtones.rules().len(), 1);
        overtones.clear_rules();
        assert!(overtones.rules().is_empty());
    }

    #[test]
    fn frame_sequence_counts_up() {
        let mut overtones = Overtones::with_capacity(1);
        assert_eq!(overtones.process_frame().sequence, 1);
        assert_eq!(overtones.process_frame().sequence, 2);
    }
}
