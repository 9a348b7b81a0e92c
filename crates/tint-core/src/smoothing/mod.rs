//! Debounced consensus over a sliding window of observations.
//!
//! Every observation is appended to an [`ObservationWindow`] and the window
//! is re-tallied from scratch. A value wins only when it holds at least
//! `confidence_threshold` of the window, which suppresses rapid flips from
//! noisy clients. With [`SmoothingConfig::passthrough`] every observation
//! wins immediately.

pub mod vote;
pub mod window;

use thiserror::Error;

use crate::constants::{DEFAULT_BUFFER_SIZE, DEFAULT_CONFIDENCE_THRESHOLD};

pub use vote::{Consensus, VoteResult};
pub use window::ObservationWindow;

/// Invalid smoothing parameters.
#[derive(Debug, Error, PartialEq)]
pub enum SmoothingError {
    /// The window must hold at least one observation.
    #[error("buffer size must be at least 1")]
    ZeroBufferSize,
    /// The threshold is a fraction of the window.
    #[error("confidence threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),
}

/// Tunables for [`SmoothingEngine`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothingConfig {
    buffer_size: usize,
    confidence_threshold: f64,
}

impl SmoothingConfig {
    /// Validate and build a config.
    pub fn new(buffer_size: usize, confidence_threshold: f64) -> Result<Self, SmoothingError> {
        if buffer_size == 0 {
            return Err(SmoothingError::ZeroBufferSize);
        }
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(SmoothingError::ThresholdOutOfRange(confidence_threshold));
        }
        Ok(Self {
            buffer_size,
            confidence_threshold,
        })
    }

    /// No smoothing: the latest observation always wins.
    pub fn passthrough() -> Self {
        Self {
            buffer_size: 1,
            confidence_threshold: 0.0,
        }
    }

    /// Window capacity.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Minimum share of the window the leader must hold.
    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Sliding-window vote. Pure state, no I/O.
#[derive(Clone, Debug)]
pub struct SmoothingEngine {
    window: ObservationWindow,
    threshold: f64,
}

impl SmoothingEngine {
    /// Create an engine with an empty window.
    pub fn new(config: SmoothingConfig) -> Self {
        Self {
            window: ObservationWindow::new(config.buffer_size),
            threshold: config.confidence_threshold,
        }
    }

    /// Record an observation and vote over the updated window.
    pub fn observe(&mut self, value: impl Into<String>) -> VoteResult {
        let _ = self.window.push(value.into());
        self.current()
    }

    /// Vote over the window as it stands, without recording anything.
    pub fn current(&self) -> VoteResult {
        vote::vote(&self.window, self.threshold)
    }

    /// The underlying window.
    pub fn window(&self) -> &ObservationWindow {
        &self.window
    }
}

impl Default for SmoothingEngine {
    fn default() -> Self {
        Self::new(SmoothingConfig::default())
    }
}
