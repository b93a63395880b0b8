//! # Fundamental Selection Module
//!
//! Picks which partial is "the" fundamental this frame. Each loud enough
//! partial is scored by how much of the remaining energy its overtone series
//! explains, and a short history of winners gates switching so a strong
//! second harmonic cannot steal the fundamental for a single frame.

use std::collections::VecDeque;

use crate::pitch;
use crate::track::TrackTable;

/// Partials below `0.471937156 × candidate` (an octave and a semitone down)
/// are not counted as evidence for the candidate.
pub const LOW_EVIDENCE_RATIO: f64 = 0.471937156;

/// The partial acting as harmonic 1 for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fundamental {
    pub index: usize,
    pub frequency: f64,
    pub amplitude: f64,
}

/// Scores candidates and applies hysteresis across frames.
#[derive(Debug, Clone)]
pub struct FundamentalSelector {
    min_amp_ratio: f64,
    close_enough: f64,
    history_length: usize,
    /// Winners of the most recent frames, oldest first. `None` = no candidate.
    history: VecDeque<Option<usize>>,
    /// Hysteresis-gated index, kept even while its slot is inactive.
    held: Option<usize>,
}

impl FundamentalSelector {
    pub fn new(min_amp_ratio: f64, close_enough: f64, history_length: usize) -> Self {
        Self {
            min_amp_ratio,
            close_enough,
            history_length,
            history: VecDeque::with_capacity(history_length),
            held: None,
        }
    }

    /// The hysteresis-gated index, whether or not its slot is active.
    pub fn held_index(&self) -> Option<usize> {
        self.held
    }

    /// Recent top scorers, oldest first. Only frames seen so far are listed.
    pub fn history(&self) -> impl Iterator<Item = Option<usize>> + '_ {
        self.history.iter().copied()
    }

    /// Runs one selection pass.
    ///
    /// Writes each slot's candidacy score, updates the hysteresis state and
    /// returns the frame's fundamental, if the gated index is an active slot.
    pub fn select(&mut self, table: &mut TrackTable) -> Option<Fundamental> {
        let best = self.score_candidates(table);

        if best != self.held && self.history_agrees_on(best) {
            tracing::debug!(from = ?self.held, to = ?best, "[FUNDAMENTAL] switching fundamental");
            self.held = best;
        }

        if self.history_length > 0 {
            if self.history.len() == self.history_length {
                self.history.pop_front();
            }
            self.history.push_back(best);
        }

        let index = self.held?;
        let slot = table.get(index).filter(|slot| slot.is_active())?;
        Some(Fundamental { index, frequency: slot.frequency, amplitude: slot.amplitude })
    }

    /// Every remembered winner that is set must equal `candidate`.
    fn history_agrees_on(&self, candidate: Option<usize>) -> bool {
        self.history.iter().all(|entry| entry.is_none() || *entry == candidate)
    }

    /// Scores every slot and returns the best candidate.
    ///
    /// Ties go to the lower frequency.
    fn score_candidates(&self, table: &mut TrackTable) -> Option<usize> {
        let min_amplitude = self.min_amp_ratio * table.max_active_amplitude();
        let scores: Vec<Option<f64>> = (0..table.capacity())
            .map(|i| self.candidate_score(table, i, min_amplitude))
            .collect();

        let mut best: Option<(usize, f64, f64)> = None;
        for (i, (slot, score)) in table.slots_mut().iter_mut().zip(&scores).enumerate() {
            slot.score = score.unwrap_or(0.0);
            let Some(score) = *score else { continue };
            let frequency = slot.frequency;
            let better = match best {
                None => true,
                Some((_, best_score, best_frequency)) => {
                    score > best_score || (score == best_score && frequency < best_frequency)
                }
            };
            if better {
                best = Some((i, score, frequency));
            }
        }
        best.map(|(index, _, _)| index)
    }

    /// Score of slot `i` as a fundamental, `None` if it is not a candidate.
    fn candidate_score(&self, table: &TrackTable, i: usize, min_amplitude: f64) -> Option<f64> {
        let candidate = table.get(i).filter(|slot| slot.is_active())?;
        // NaN amplitudes would never compare below the threshold.
        if !candidate.amplitude.is_finite() || !candidate.frequency.is_finite() {
            return None;
        }
        if candidate.amplitude < min_amplitude {
            return None;
        }

        let mut score = 2.0 * candidate.amplitude;
        for (j, other) in table.active() {
            if j == i || !other.amplitude.is_finite() {
                continue;
            }
            if other.frequency < LOW_EVIDENCE_RATIO * candidate.frequency {
                continue;
            }
            let harmonic = pitch::resolve_harmonic(other.frequency, candidate.frequency, false);
            if pitch::distance_to_harmonic(other.frequency, candidate.frequency, harmonic) < self.close_enough {
                score += other.amplitude;
            }
        }
        Some(score)
    }
}
