//! Plurality vote over an [`ObservationWindow`].

use std::collections::HashMap;

use super::window::ObservationWindow;

/// The value holding the largest share of the window.
#[derive(Clone, Debug, PartialEq)]
pub struct Consensus {
    /// The leading observation.
    pub value: String,
    /// How many window entries equal `value`.
    pub count: usize,
    /// Window length at the time of the vote.
    pub window_len: usize,
}

impl Consensus {
    /// Fraction of the window occupied by `value`, in `(0, 1]`.
    pub fn confidence(&self) -> f64 {
        self.count as f64 / self.window_len as f64
    }
}

/// Outcome of a single vote.
#[derive(Clone, Debug, PartialEq)]
pub enum VoteResult {
    /// The leader met the confidence threshold.
    Winner(Consensus),
    /// Nothing met the threshold. Carries the leader, if the window was
    /// non-empty, for diagnostics.
    NoWinner(Option<Consensus>),
}

impl VoteResult {
    /// The winning value, if the vote was confident.
    pub fn winner(&self) -> Option<&str> {
        match self {
            Self::Winner(c) => Some(&c.value),
            Self::NoWinner(_) => None,
        }
    }

    /// Confidence of the leader, winning or not. `None` for an empty window.
    pub fn confidence(&self) -> Option<f64> {
        match self {
            Self::Winner(c) | Self::NoWinner(Some(c)) => Some(c.confidence()),
            Self::NoWinner(None) => None,
        }
    }
}

/// Find the value with the strictly highest count.
///
/// Ties go to the value whose first occurrence in the window is earliest,
/// so the result depends only on the window contents.
pub fn leader(window: &ObservationWindow) -> Option<Consensus> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in window.iter() {
        *counts.entry(value).or_insert(0) += 1;
    }

    // Walking the window in order visits each value at its first occurrence
    // before any later one, and only a strictly larger count displaces the
    // current best.
    let mut best: Option<(&str, usize)> = None;
    for value in window.iter() {
        let count = counts[value];
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((value, count));
        }
    }

    best.map(|(value, count)| Consensus {
        value: value.to_owned(),
        count,
        window_len: window.len(),
    })
}

/// Vote over `window`, requiring the leader to hold at least `threshold`
/// of it.
pub fn vote(window: &ObservationWindow, threshold: f64) -> VoteResult {
    match leader(window) {
        Some(consensus) if consensus.confidence() >= threshold => VoteResult::Winner(consensus),
        other => VoteResult::NoWinner(other),
    }
}
