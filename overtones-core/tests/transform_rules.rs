use approx::assert_relative_eq;
use pretty_assertions::assert_eq;

use overtones_core::{HarmonicNumber, Overtones, TrackUpdate, TransformError};

/// A clean series 100..=500 Hz with falling amplitudes, fundamental settled.
fn series() -> Overtones {
    let mut overtones = Overtones::with_capacity(6);
    for (i, amplitude) in [0.8, 0.4, 0.3, 0.2, 0.1].into_iter().enumerate() {
        overtones.update_track(TrackUpdate::new(i, 100.0 * (i + 1) as f64, amplitude, 0));
    }
    overtones
}

#[test]
fn rule_order_decides_the_result() {
    let mut overtones = series();
    overtones.add_rule("freq", "*", 2.0, "=", Some(3.0)).unwrap();
    overtones.add_rule("freq", "=", 100.0, "=", Some(3.0)).unwrap();
    assert_eq!(overtones.process_frame().records[2].transformed_frequency, 100.0);

    overtones.clear_rules();
    overtones.add_rule("freq", "=", 100.0, "=", Some(3.0)).unwrap();
    overtones.add_rule("freq", "*", 2.0, "=", Some(3.0)).unwrap();
    assert_eq!(overtones.process_frame().records[2].transformed_frequency, 200.0);
}

#[test]
fn odd_replace_skips_fundamental_and_even_harmonics() {
    let mut overtones = series();
    overtones.add_rule("amp", "=", 0.5, "odd", Some(0.0)).unwrap();
    let frame = overtones.process_frame();

    let harmonics: Vec<HarmonicNumber> = frame.records.iter().map(|r| r.harmonic).collect();
    assert_eq!(
        harmonics,
        vec![
            HarmonicNumber::Fundamental,
            HarmonicNumber::Harmonic(2),
            HarmonicNumber::Harmonic(3),
            HarmonicNumber::Harmonic(4),
            HarmonicNumber::Harmonic(5),
            HarmonicNumber::Outlier,
        ]
    );
    let amps: Vec<f64> = frame.records.iter().map(|r| r.transformed_amplitude).collect();
    assert_relative_eq!(amps[0], 0.8);
    assert_relative_eq!(amps[1], 0.4);
    assert_relative_eq!(amps[2], 0.4);
    assert_relative_eq!(amps[3], 0.2);
    assert_relative_eq!(amps[4], 0.4);
    // Originals are untouched.
    assert_eq!(frame.records[2].amplitude, 0.3);
}

#[test]
fn all_rules_fire_and_compose() {
    let mut overtones = series();
    overtones.add_rule("amp", "*", 2.0, "all", None).unwrap();
    overtones.add_rule("db", "-", 20.0, "even", None).unwrap();
    overtones.add_rule("amp", "*", 0.5, ">", Some(3.0)).unwrap();
    let frame = overtones.process_frame();

    let amps: Vec<f64> = frame.records.iter().map(|r| r.transformed_amplitude).collect();
    assert_relative_eq!(amps[0], 1.6, epsilon = 1e-12);
    assert_relative_eq!(amps[1], 0.08, epsilon = 1e-12);
    assert_relative_eq!(amps[2], 0.6, epsilon = 1e-12);
    assert_relative_eq!(amps[3], 0.02, epsilon = 1e-12);
    assert_relative_eq!(amps[4], 0.1, epsilon = 1e-12);
}

#[test]
fn ratio_selectors_use_frequency_ratio() {
    let mut overtones = series();
    overtones.add_rule("freq", "*", 1.01, ">=", Some(3.5)).unwrap();
    overtones.add_rule("freq", "*", 0.5, "<=", Some(1.0)).unwrap();
    let frame = overtones.process_frame();

    let freqs: Vec<f64> = frame.records.iter().map(|r| r.transformed_frequency).collect();
    assert_relative_eq!(freqs[0], 50.0);
    assert_relative_eq!(freqs[1], 200.0);
    assert_relative_eq!(freqs[2], 300.0);
    assert_relative_eq!(freqs[3], 404.0, epsilon = 1e-9);
    assert_relative_eq!(freqs[4], 505.0, epsilon = 1e-9);
}

#[test]
fn outlier_rules_reach_inactive_slots_and_strays() {
    let mut overtones = series();
    overtones.update_track(TrackUpdate::new(5, 137.0, 0.05, 0));
    overtones.add_rule("amp", "=", 0.0, "outlier", None).unwrap();
    overtones.add_rule("amp", "*", 3.0, "all", None).unwrap();
    let frame = overtones.process_frame();

    assert_eq!(frame.records[5].harmonic, HarmonicNumber::Outlier);
    assert_eq!(frame.records[5].transformed_amplitude, 0.0);
    assert_relative_eq!(frame.records[0].transformed_amplitude, 2.4, epsilon = 1e-12);

    overtones.update_track(TrackUpdate::inactive(5));
    overtones.clear_rules();
    overtones.add_rule("freq", "=", 1.0, "outlier", None).unwrap();
    overtones.add_rule("freq", "=", 2.0, "all", None).unwrap();
    let frame = overtones.process_frame();
    assert_eq!(frame.records[5].transformed_frequency, 1.0);
}

#[test]
fn db_replace_is_relative_to_fundamental() {
    let mut overtones = series();
    overtones.add_rule("db", "=", -6.0, "=", Some(2.0)).unwrap();
    let frame = overtones.process_frame();
    assert_relative_eq!(
        frame.records[1].transformed_amplitude,
        0.8 * 10.0_f64.powf(-0.3),
        epsilon = 1e-12
    );
}

#[test]
fn malformed_rules_are_rejected() {
    let mut overtones = series();
    assert_eq!(
        overtones.add_rule("phase", "*", 2.0, "all", None),
        Err(TransformError::UnknownTarget("phase".to_string()))
    );
    assert_eq!(
        overtones.add_rule("freq", "*", 2.0, "<", None),
        Err(TransformError::MissingSelectorArgument("<".to_string()))
    );
    assert!(overtones.rules().is_empty());

    let frame = overtones.process_frame();
    assert!(frame.records.iter().all(|r| r.transformed_frequency == r.frequency));
}
