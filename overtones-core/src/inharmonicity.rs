use linreg::linear_regression;
use serde::{Deserialize, Serialize};

use crate::emitter::OutputRecord;
use crate::track::HarmonicNumber;

/// A classified partial used for the inharmonicity fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    pub number: u32,    // The harmonic number (n=1, 2, 3...)
    pub frequency: f64, // The measured frequency in Hz
}

/// Collects the positive harmonics of a frame, fundamental included.
pub fn harmonic_partials(records: &[OutputRecord]) -> Vec<Partial> {
    records
        .iter()
        .filter(|r| r.active && r.frequency > 0.0)
        .filter_map(|r| match r.harmonic {
            HarmonicNumber::Fundamental => Some(1),
            HarmonicNumber::Harmonic(k) if k > 0 => Some(k),
            _ => None,
        }
        .map(|number| Partial { number, frequency: r.frequency }))
        .collect()
}

/// Estimates the inharmonicity constant 'B' from a set of partials.
///
/// Fits `(f_n / n)^2 = f_0^2 (1 + B n^2)`: a straight line in
/// `x = n^2`, `y = (f_n / n)^2` whose slope over intercept is `B`.
pub fn estimate_b(partials: &[Partial]) -> Option<f64> {
    let mut numbers: Vec<u32> = partials.iter().map(|p| p.number).collect();
    numbers.sort_unstable();
    numbers.dedup();
    if numbers.len() < 3 {
        return None; // Need at least 3 harmonics for a meaningful regression
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = partials
        .iter()
        .filter(|p| p.number > 0 && p.frequency > 0.0)
        .map(|p| {
            let n = p.number as f64;
            let f_n = p.frequency;
            (n * n, (f_n / n) * (f_n / n))
        })
        .unzip();

    let (slope, intercept) = linear_regression::<_, _, f64>(&xs, &ys).ok()?;
    if intercept.abs() > 1e-6 { Some(slope / intercept) } else { None }
}
