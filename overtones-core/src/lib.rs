// overtones-core/src/lib.rs

//! The core logic for harmonic analysis of partial tracks.
//! This crate classifies each frame of tracked partials into a fundamental
//! and its harmonics, then applies user-defined transform rules to the
//! classified partials. It is completely headless and contains no host
//! or I/O code beyond config files.

pub mod analyzer;
pub mod classifier;
pub mod config;
pub mod emitter;
pub mod error;
pub mod fundamental;
pub mod inharmonicity;
pub mod notes;
pub mod pitch;
pub mod pivot;
pub mod track;
pub mod transform;

pub use analyzer::{Frame, Overtones};
pub use config::OvertonesConfig;
pub use emitter::OutputRecord;
pub use error::{ConfigError, TransformError};
pub use track::{HarmonicNumber, TrackUpdate};
