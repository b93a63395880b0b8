//! # Harmonic Classification Module
//!
//! Labels every slot relative to the frame's fundamental. Labels are
//! rebuilt from scratch on every call, so classifying the same table twice
//! gives the same result.

use crate::fundamental::Fundamental;
use crate::pitch;
use crate::track::{HarmonicNumber, TrackTable};

/// Assigns harmonic numbers within a semitone tolerance.
#[derive(Debug, Clone, Copy)]
pub struct HarmonicClassifier {
    close_enough: f64,
}

impl HarmonicClassifier {
    pub fn new(close_enough: f64) -> Self {
        Self { close_enough }
    }

    /// Rewrites the `harmonic` field of every slot.
    ///
    /// The fundamental's slot becomes [`HarmonicNumber::Fundamental`]; other
    /// active slots get the nearest harmonic or sub-harmonic when it lies
    /// within tolerance. Everything else, including every inactive slot and
    /// every slot of a frame without a fundamental, is an outlier.
    pub fn classify(&self, table: &mut TrackTable, fundamental: Option<Fundamental>) {
        for (i, slot) in table.slots_mut().iter_mut().enumerate() {
            slot.harmonic = match fundamental {
                _ if !slot.is_active() => HarmonicNumber::Outlier,
                Some(f) if f.index == i => HarmonicNumber::Fundamental,
                Some(f) => self.label(slot.frequency, f.frequency),
                None => HarmonicNumber::Outlier,
            };
        }
    }

    /// Label for a single frequency against a fundamental frequency.
    pub fn label(&self, frequency: f64, fundamental: f64) -> HarmonicNumber {
        let harmonic = pitch::resolve_harmonic(frequency, fundamental, true);
        if pitch::distance_to_harmonic(frequency, fundamental, harmonic) < self.close_enough {
            HarmonicNumber::from_signed(harmonic)
        } else {
            HarmonicNumber::Outlier
        }
    }
}
