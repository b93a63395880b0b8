//! # Transform Pipeline Module
//!
//! An ordered list of conditional edits applied to the frequency and
//! amplitude of classified partials at emission time. Every matching rule
//! fires, in list order, on the value left by the previous rule. The
//! classification itself is never touched.
//!
//! Rules are normally built from the host's symbolic form:
//!
//! ```text
//! <target> <operator> <operand> <selector> [<selector argument>]
//! freq     *          2         even
//! amp      =          0.5       odd
//! db       -          6         >          4
//! ```

use std::fmt;

use crate::error::{TransformError, TransformResult};
use crate::track::{HarmonicNumber, PartialSlot};

/// Which value a rule edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Frequency,
    Amplitude,
    /// Amplitude, with the operand given in decibels.
    AmplitudeDb,
}

/// How the operand is applied to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Scale,
    Replace,
}

/// Which partials a rule applies to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selector {
    /// Harmonic number equal to the argument.
    Equal(f64),
    /// Odd harmonic numbers other than the fundamental.
    Odd,
    Even,
    /// Harmonic number greater than the argument.
    Greater(f64),
    /// Frequency ratio to the fundamental at least the argument.
    RatioAtLeast(f64),
    /// Harmonic number less than the argument.
    Less(f64),
    /// Frequency ratio to the fundamental at most the argument.
    RatioAtMost(f64),
    All,
    Outlier,
}

impl Selector {
    /// Parses a selector symbol and its optional argument.
    pub fn parse(symbol: &str, argument: Option<f64>) -> TransformResult<Self> {
        let numeric = |build: fn(f64) -> Selector| match argument {
            Some(value) if !value.is_finite() => {
                Err(TransformError::NonFinite { name: "selector argument", value })
            }
            Some(value) => Ok(build(value)),
            None => Err(TransformError::MissingSelectorArgument(symbol.to_string())),
        };
        match symbol {
            "=" => numeric(Selector::Equal),
            "odd" => Ok(Selector::Odd),
            "even" => Ok(Selector::Even),
            ">" => numeric(Selector::Greater),
            ">=" => numeric(Selector::RatioAtLeast),
            "<" => numeric(Selector::Less),
            "<=" => numeric(Selector::RatioAtMost),
            "all" => Ok(Selector::All),
            "outlier" => Ok(Selector::Outlier),
            other => Err(TransformError::UnknownSelector(other.to_string())),
        }
    }

    /// Whether a slot with this label and frequency ratio is selected.
    ///
    /// Inactive slots are only ever selected by [`Selector::Outlier`].
    pub fn matches(&self, harmonic: HarmonicNumber, active: bool, ratio: f64) -> bool {
        if !active {
            return *self == Selector::Outlier;
        }
        let number = harmonic.legacy();
        match *self {
            Selector::All => true,
            Selector::Outlier => harmonic.is_outlier(),
            Selector::RatioAtLeast(arg) => ratio >= arg,
            Selector::RatioAtMost(arg) => ratio <= arg,
            _ if harmonic.is_outlier() => false,
            Selector::Equal(arg) => number as f64 == arg,
            // Truncating remainder: odd sub-harmonics (-3, -5, ...) are not odd here.
            Selector::Odd => number != 1 && number % 2 == 1,
            Selector::Even => number % 2 == 0,
            Selector::Greater(arg) => number as f64 > arg,
            Selector::Less(arg) => (number as f64) < arg,
        }
    }
}

/// One conditional edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformRule {
    pub target: Target,
    pub operation: Operation,
    /// Multiplier, replacement value or decibels, depending on target and operation.
    pub operand: f64,
    pub selector: Selector,
}

impl TransformRule {
    /// Builds a rule from the symbolic form used by the host.
    ///
    /// # Arguments
    /// * `target` - `freq`, `amp` or `db`
    /// * `operator` - `*` or `=` for freq/amp; `=`, `+` or `-` for db
    /// * `operand` - Number the operator applies; negated for db `-`
    /// * `selector` - One of `= odd even > >= < <= all outlier`
    /// * `selector_argument` - Required by `= > >= < <=`, ignored otherwise
    ///
    /// # Returns
    /// * `Ok(TransformRule)` - A valid rule
    /// * `Err(TransformError)` - The first token that was not recognized
    pub fn parse(
        target: &str,
        operator: &str,
        operand: f64,
        selector: &str,
        selector_argument: Option<f64>,
    ) -> TransformResult<Self> {
        let target = match target {
            "freq" => Target::Frequency,
            "amp" => Target::Amplitude,
            "db" => Target::AmplitudeDb,
            other => return Err(TransformError::UnknownTarget(other.to_string())),
        };

        let (operation, sign) = match (target, operator) {
            (Target::Frequency | Target::Amplitude, "*") => (Operation::Scale, 1.0),
            (Target::AmplitudeDb, "+") => (Operation::Scale, 1.0),
            (Target::AmplitudeDb, "-") => (Operation::Scale, -1.0),
            (_, "=") => (Operation::Replace, 1.0),
            (target, other) => {
                return Err(TransformError::UnknownOperator {
                    target: target.to_string(),
                    operator: other.to_string(),
                });
            }
        };

        if !operand.is_finite() {
            return Err(TransformError::NonFinite { name: "operand", value: operand });
        }

        Ok(Self {
            target,
            operation,
            operand: sign * operand,
            selector: Selector::parse(selector, selector_argument)?,
        })
    }

    /// Applies the rule to a running `(frequency, amplitude)` pair.
    pub fn apply(&self, frequency: &mut f64, amplitude: &mut f64, fundamental_amplitude: f64) {
        match (self.target, self.operation) {
            (Target::Frequency, Operation::Scale) => *frequency *= self.operand,
            (Target::Frequency, Operation::Replace) => *frequency = self.operand,
            (Target::Amplitude, Operation::Scale) => *amplitude *= self.operand,
            (Target::Amplitude, Operation::Replace) => *amplitude = self.operand * fundamental_amplitude,
            (Target::AmplitudeDb, Operation::Scale) => *amplitude *= db_to_gain(self.operand),
            (Target::AmplitudeDb, Operation::Replace) => {
                *amplitude = db_to_gain(self.operand) * fundamental_amplitude
            }
        }
    }
}

/// Converts decibels to a linear amplitude factor.
pub fn db_to_gain(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Frequency => write!(f, "freq"),
            Target::Amplitude => write!(f, "amp"),
            Target::AmplitudeDb => write!(f, "db"),
        }
    }
}

impl fmt::Display for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operator = match (self.target, self.operation) {
            (_, Operation::Replace) => "=",
            (Target::AmplitudeDb, Operation::Scale) => "+",
            (_, Operation::Scale) => "*",
        };
        write!(f, "{} {} {} ", self.target, operator, self.operand)?;
        match self.selector {
            Selector::Equal(arg) => write!(f, "= {arg}"),
            Selector::Odd => write!(f, "odd"),
            Selector::Even => write!(f, "even"),
            Selector::Greater(arg) => write!(f, "> {arg}"),
            Selector::RatioAtLeast(arg) => write!(f, ">= {arg}"),
            Selector::Less(arg) => write!(f, "< {arg}"),
            Selector::RatioAtMost(arg) => write!(f, "<= {arg}"),
            Selector::All => write!(f, "all"),
            Selector::Outlier => write!(f, "outlier"),
        }
    }
}

/// Context the pipeline needs about the frame's fundamental.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReference {
    pub frequency: f64,
    pub amplitude: f64,
}

impl FrameReference {
    /// Frequency ratio of `frequency` to the fundamental, 0 without one.
    pub fn frequency_ratio(&self, frequency: f64) -> f64 {
        if self.frequency > 0.0 { frequency / self.frequency } else { 0.0 }
    }

    /// Amplitude ratio of `amplitude` to the fundamental, 0 without one.
    pub fn amplitude_ratio(&self, amplitude: f64) -> f64 {
        if self.amplitude > 0.0 { amplitude / self.amplitude } else { 0.0 }
    }
}

/// Ordered list of transform rules.
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    rules: Vec<TransformRule>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a rule and appends it. On error the pipeline is unchanged.
    pub fn add_rule(
        &mut self,
        target: &str,
        operator: &str,
        operand: f64,
        selector: &str,
        selector_argument: Option<f64>,
    ) -> TransformResult<()> {
        let rule = TransformRule::parse(target, operator, operand, selector, selector_argument)?;
        self.push(rule);
        Ok(())
    }

    /// Appends an already-built rule.
    pub fn push(&mut self, rule: TransformRule) {
        self.rules.push(rule);
    }

    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn rules(&self) -> &[TransformRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Effective `(frequency, amplitude)` of a slot after every matching rule.
    pub fn apply(&self, slot: &PartialSlot, reference: FrameReference) -> (f64, f64) {
        let mut frequency = slot.frequency;
        let mut amplitude = slot.amplitude;
        let ratio = reference.frequency_ratio(slot.frequency);
        for rule in &self.rules {
            if rule.selector.matches(slot.harmonic, slot.is_active(), ratio) {
                rule.apply(&mut frequency, &mut amplitude, reference.amplitude);
            }
        }
        (frequency, amplitude)
    }
}
