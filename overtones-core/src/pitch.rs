//! # Pitch Math Module
//!
//! This module implements the numeric primitives used to relate partials to a
//! fundamental. All distances are measured in semitones on a logarithmic
//! frequency scale, so "close to a harmonic" means the same thing at 80 Hz
//! and at 8 kHz.
//!
//! ## Features
//! - Saturating semitone distance between two frequencies
//! - Nearest integer multiple with a geometric-mean rounding boundary
//! - Signed harmonic-number resolution (harmonics and sub-harmonics)

/// Semitones per natural-log unit of frequency ratio (12 / ln 2).
pub const SEMITONES_PER_LN: f64 = 17.3123405046;

/// Stand-in for an infinite distance in semitones.
pub const INFINITE_SEMITONES: f64 = 1500.0;

/// Returns how many semitones `f1` is above `f2`.
///
/// Non-positive inputs saturate instead of diverging:
/// - `f1 <= 0` gives `-1500`
/// - `f1 > 0` and `f2 <= 0` gives `+1500`
///
/// Callers take the absolute value to use the result as a distance.
pub fn semitone_distance(f1: f64, f2: f64) -> f64 {
    if f1 <= 0.0 {
        -INFINITE_SEMITONES
    } else if f2 <= 0.0 {
        INFINITE_SEMITONES
    } else {
        SEMITONES_PER_LN * (f1 / f2).ln()
    }
}

/// Finds the integer `m` such that `a ≈ m·b`.
///
/// The base candidate is `floor(a / b)`. It is rounded up when `a` reaches
/// the geometric mean of the two neighbouring multiples, so the rounding
/// boundary sits halfway between them in log-frequency space rather than in
/// linear space.
///
/// # Arguments
/// * `a` - Frequency to express as a multiple
/// * `b` - Base frequency
///
/// # Returns
/// * The nearest multiple, `0` when `a < sqrt(0.5)·b` or `b` is not positive
pub fn nearest_multiple(a: f64, b: f64) -> i32 {
    if b <= 0.0 || !a.is_finite() || !b.is_finite() {
        return 0;
    }
    let quotient = (a / b).floor();
    if quotient >= i32::MAX as f64 {
        return i32::MAX;
    }
    let base = quotient.max(0.0) as i32;
    if a >= round_up_cutoff(base, b) {
        base + 1
    } else {
        base
    }
}

/// The frequency at or above which `nearest_multiple` rounds `base` up.
///
/// Exposed so boundary behaviour can be checked at the exact cutoff.
pub fn round_up_cutoff(base: i32, b: f64) -> f64 {
    if base > 0 {
        let r = base as f64;
        r * ((r + 1.0) / r).sqrt() * b
    } else {
        0.5_f64.sqrt() * b
    }
}

/// Resolves the signed harmonic number of `freq` relative to `fundamental`.
///
/// A positive result `k` means `freq ≈ k·fundamental`. When `freq` is too
/// low to be a harmonic and `allow_negative` is set, the result is `-k` with
/// `fundamental ≈ k·freq` (a sub-harmonic). Otherwise `0` is returned.
pub fn resolve_harmonic(freq: f64, fundamental: f64, allow_negative: bool) -> i32 {
    let harmonic = nearest_multiple(freq, fundamental);
    if harmonic == 0 && allow_negative {
        -nearest_multiple(fundamental, freq)
    } else {
        harmonic
    }
}

/// Distance in semitones between `freq` and the given harmonic of `fundamental`.
///
/// # Arguments
/// * `freq` - Partial frequency in Hz
/// * `fundamental` - Fundamental frequency in Hz
/// * `harmonic` - Signed harmonic number as returned by [`resolve_harmonic`]
///
/// # Returns
/// * Absolute semitone distance, `1500` for harmonic `0`
pub fn distance_to_harmonic(freq: f64, fundamental: f64, harmonic: i32) -> f64 {
    if harmonic > 0 {
        semitone_distance(freq, harmonic as f64 * fundamental).abs()
    } else if harmonic < 0 {
        semitone_distance(harmonic.unsigned_abs() as f64 * freq, fundamental).abs()
    } else {
        INFINITE_SEMITONES
    }
}
