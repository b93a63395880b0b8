//! # Track Table Module
//!
//! Fixed-capacity storage for the partial tracks reported by an upstream
//! tracker. Each slot keeps its index for the lifetime of the table; a slot
//! whose track has ended stays in place and is simply marked inactive.

use serde::{Deserialize, Serialize};

/// Raw tracker flag meaning "this slot has no current track".
pub const INACTIVE_FLAG: i32 = -1;

/// Legacy integer used for outliers at the output boundary.
pub const OUTLIER_SENTINEL: i32 = -1;

/// Classification of one partial relative to the frame's fundamental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "k", rename_all = "snake_case")]
pub enum HarmonicNumber {
    /// Not within tolerance of any multiple or sub-multiple, or inactive.
    #[default]
    Outlier,
    /// The partial chosen as harmonic 1 this frame.
    Fundamental,
    /// `frequency ≈ k × fundamental`. Another slot sitting on the
    /// fundamental's own frequency is `Harmonic(1)`.
    Harmonic(u32),
    /// `frequency ≈ fundamental / k`, with `k ≥ 2`.
    SubHarmonic(u32),
}

impl HarmonicNumber {
    /// Builds a label from the signed result of [`crate::pitch::resolve_harmonic`].
    ///
    /// `0` and `-1` have no harmonic meaning and map to [`HarmonicNumber::Outlier`].
    pub fn from_signed(value: i32) -> Self {
        match value {
            k if k >= 1 => HarmonicNumber::Harmonic(k.unsigned_abs()),
            k if k <= -2 => HarmonicNumber::SubHarmonic(k.unsigned_abs()),
            _ => HarmonicNumber::Outlier,
        }
    }

    /// Collapses the label to the signed integer encoding used on the wire.
    pub fn legacy(self) -> i32 {
        match self {
            HarmonicNumber::Outlier => OUTLIER_SENTINEL,
            HarmonicNumber::Fundamental => 1,
            HarmonicNumber::Harmonic(k) => k as i32,
            HarmonicNumber::SubHarmonic(k) => -(k as i32),
        }
    }

    pub fn is_outlier(self) -> bool {
        self == HarmonicNumber::Outlier
    }
}

/// One slot of the track table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialSlot {
    /// Frequency in Hz as last reported.
    pub frequency: f64,
    /// Amplitude as last reported.
    pub amplitude: f64,
    /// Raw tracker flag, re-emitted unchanged. `-1` means inactive.
    pub flag: i32,
    /// Label assigned by the last classification pass.
    pub harmonic: HarmonicNumber,
    /// Candidacy score from the last selection pass, 0 if not evaluated.
    pub score: f64,
}

impl Default for PartialSlot {
    fn default() -> Self {
        Self {
            frequency: 0.0,
            amplitude: 0.0,
            flag: INACTIVE_FLAG,
            harmonic: HarmonicNumber::Outlier,
            score: 0.0,
        }
    }
}

impl PartialSlot {
    pub fn is_active(&self) -> bool {
        self.flag != INACTIVE_FLAG
    }
}

/// A single update from the upstream tracker: `(index, frequency, amplitude, flag)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackUpdate {
    pub index: usize,
    pub frequency: f64,
    pub amplitude: f64,
    pub flag: i32,
}

impl TrackUpdate {
    pub fn new(index: usize, frequency: f64, amplitude: f64, flag: i32) -> Self {
        Self { index, frequency, amplitude, flag }
    }

    /// An update that ends the track in `index`.
    pub fn inactive(index: usize) -> Self {
        Self::new(index, 0.0, 0.0, INACTIVE_FLAG)
    }
}

/// Fixed-capacity table of partial slots.
#[derive(Debug, Clone)]
pub struct TrackTable {
    slots: Vec<PartialSlot>,
}

impl TrackTable {
    /// Creates a table of `capacity` inactive slots.
    pub fn new(capacity: usize) -> Self {
        Self { slots: vec![PartialSlot::default(); capacity] }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Writes an update into its slot.
    ///
    /// # Returns
    /// * `true` - The slot was updated
    /// * `false` - The index is beyond capacity and the update was dropped
    pub fn apply(&mut self, update: TrackUpdate) -> bool {
        match self.slots.get_mut(update.index) {
            Some(slot) => {
                slot.frequency = update.frequency;
                slot.amplitude = update.amplitude;
                slot.flag = update.flag;
                true
            }
            None => false,
        }
    }

    pub fn slots(&self) -> &[PartialSlot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [PartialSlot] {
        &mut self.slots
    }

    pub fn get(&self, index: usize) -> Option<&PartialSlot> {
        self.slots.get(index)
    }

    /// Iterates over `(index, slot)` for active slots only.
    pub fn active(&self) -> impl Iterator<Item = (usize, &PartialSlot)> {
        self.slots.iter().enumerate().filter(|(_, slot)| slot.is_active())
    }

    /// Largest amplitude among active slots, 0 when none are active.
    pub fn max_active_amplitude(&self) -> f64 {
        self.active().map(|(_, slot)| slot.amplitude).fold(0.0, f64::max)
    }
}
