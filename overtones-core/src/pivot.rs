//! # Harmonic Pivot Module
//!
//! Summarises a processed frame as amplitude totals per harmonic number,
//! expressed in decibels relative to the fundamental. Useful for watching
//! how the balance of a tone's overtones evolves from frame to frame.

use serde::Serialize;

use crate::emitter::OutputRecord;
use crate::pitch::INFINITE_SEMITONES;
use crate::track::HarmonicNumber;

/// Harmonics tracked individually when no limit is given.
pub const DEFAULT_MAX_HARMONIC: u32 = 20;

/// Reference level in dB assigned to the fundamental bin.
pub const REFERENCE_DB: f64 = 100.0;

/// Saturated dB value standing in for ±infinity.
const INFINITE_DB: f64 = INFINITE_SEMITONES;

/// Amplitude totals of one frame, binned by harmonic number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HarmonicPivot {
    /// Output frequency of the fundamental, if the frame had one.
    pub fundamental: Option<f64>,
    /// Overall level of the summed amplitudes, `100 + 20·log10(total)`.
    pub level_db: f64,
    /// Summed amplitude of harmonics `1..=max_harmonic`, index 0 = harmonic 1.
    pub harmonics: Vec<f64>,
    /// Summed amplitude of harmonics above `max_harmonic`.
    pub tweeters: f64,
    /// Summed amplitude of outliers and sub-harmonics.
    pub outliers: f64,
}

impl HarmonicPivot {
    /// Bins the active records of a frame.
    ///
    /// Uses the values after the transform pipeline, as written to the
    /// output lists.
    pub fn from_records(records: &[OutputRecord], max_harmonic: u32) -> Self {
        let mut pivot = Self {
            fundamental: None,
            level_db: 0.0,
            harmonics: vec![0.0; max_harmonic as usize],
            tweeters: 0.0,
            outliers: 0.0,
        };
        let mut total = 0.0;

        for record in records.iter().filter(|r| r.active) {
            let amplitude = record.transformed_amplitude;
            total += amplitude;
            let number = match record.harmonic {
                HarmonicNumber::Fundamental => {
                    pivot.fundamental = Some(record.transformed_frequency);
                    1
                }
                HarmonicNumber::Harmonic(k) if k >= 1 => k,
                _ => {
                    pivot.outliers += amplitude;
                    continue;
                }
            };
            match pivot.harmonics.get_mut(number as usize - 1) {
                Some(bin) => *bin += amplitude,
                None => pivot.tweeters += amplitude,
            }
        }

        pivot.level_db = rms_to_db(total);
        pivot
    }

    /// Every bin in dB relative to the fundamental bin.
    ///
    /// Order: harmonics `1..=max`, tweeters, outliers. Harmonic 1 is always
    /// [`REFERENCE_DB`].
    pub fn relative_db(&self) -> Vec<f64> {
        let fundamental = self.harmonics.first().copied().unwrap_or(0.0);
        let mut bins: Vec<f64> = self.harmonics.iter().skip(1).copied().collect();
        bins.push(self.tweeters);
        bins.push(self.outliers);

        let mut db = Vec::with_capacity(bins.len() + 1);
        if !self.harmonics.is_empty() {
            db.push(REFERENCE_DB);
        }
        db.extend(bins.into_iter().map(|amp| REFERENCE_DB + amp_ratio_to_db(amp, fundamental)));
        db
    }
}

/// Ratio of two amplitudes in dB, saturating at ±1500.
pub fn amp_ratio_to_db(amp1: f64, amp2: f64) -> f64 {
    if amp1 <= 0.0 {
        -INFINITE_DB
    } else if amp2 <= 0.0 {
        INFINITE_DB
    } else {
        20.0 * (amp1 / amp2).log10()
    }
}

/// Level of an amplitude in dB on a scale where 1.0 is 100 dB.
pub fn rms_to_db(amp: f64) -> f64 {
    if amp <= 0.0 {
        -INFINITE_DB
    } else {
        REFERENCE_DB + 20.0 * amp.log10()
    }
}
