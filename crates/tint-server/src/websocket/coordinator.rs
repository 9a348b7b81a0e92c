//! Observation intake, state commit, and color fan-out.

use std::sync::Arc;

use metrics::counter;
use parking_lot::Mutex;
use tint_core::constants::INITIAL_COLOR;
use tint_core::messages::ColorUpdate;
use tint_core::smoothing::{SmoothingConfig, SmoothingEngine, VoteResult};
use tracing::{debug, info};

use super::connection::{ClientConnection, SendStatus};
use super::registry::{BroadcastReport, ConnectionRegistry};
use crate::metrics::{COLOR_CHANGES_TOTAL, OBSERVATIONS_TOTAL};

/// Errors raised while processing one inbound message.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// The outbound update could not be encoded.
    #[error("failed to serialize color update: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What an observation did to the shared color.
#[derive(Clone, Debug, PartialEq)]
pub enum ObservationOutcome {
    /// No value met the confidence threshold.
    Undecided {
        /// Best candidate in the window.
        leader: Option<String>,
        /// Its share of the window.
        confidence: Option<f64>,
    },
    /// The winner is already the shared color.
    Confirmed {
        /// The unchanged color.
        color: String,
    },
    /// The shared color moved and the update was fanned out.
    Changed {
        /// Color before this observation.
        previous: String,
        /// Color after it.
        color: String,
        /// Delivery tally.
        report: BroadcastReport,
    },
}

struct SharedState {
    engine: SmoothingEngine,
    color: String,
}

/// Owns the smoothing engine and the shared color, and fans changes out
/// over the registry.
///
/// Observe, compare, commit, and fan-out run under one lock, so two
/// observations never interleave and a joiner's initial message is
/// ordered before any later broadcast.
pub struct BroadcastCoordinator {
    state: Mutex<SharedState>,
    registry: Arc<ConnectionRegistry>,
}

impl BroadcastCoordinator {
    /// Start at [`INITIAL_COLOR`] with an empty window.
    pub fn new(config: SmoothingConfig, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            state: Mutex::new(SharedState {
                engine: SmoothingEngine::new(config),
                color: INITIAL_COLOR.to_owned(),
            }),
            registry,
        }
    }

    /// Feed one inbound payload through the engine.
    ///
    /// Surrounding whitespace and byte order marks are stripped; anything
    /// else, including the empty string, is an observation.
    pub fn handle_observation(&self, raw: &str) -> Result<ObservationOutcome, CoordinatorError> {
        let value = trim_observation(raw);
        counter!(OBSERVATIONS_TOTAL).increment(1);

        let mut state = self.state.lock();
        let winner = match state.engine.observe(value) {
            VoteResult::Winner(consensus) => consensus,
            VoteResult::NoWinner(leader) => {
                let confidence = leader.as_ref().map(|c| c.confidence());
                debug!(
                    observed = value,
                    leader = leader.as_ref().map(|c| c.value.as_str()),
                    confidence,
                    "no confident winner"
                );
                return Ok(ObservationOutcome::Undecided {
                    leader: leader.map(|c| c.value),
                    confidence,
                });
            }
        };

        if winner.value == state.color {
            return Ok(ObservationOutcome::Confirmed { color: winner.value });
        }

        let payload: Arc<str> = ColorUpdate::new(winner.value.as_str()).to_json()?.into();
        let confidence = winner.confidence();
        let color = winner.value;
        let previous = std::mem::replace(&mut state.color, color.clone());
        let report = self.registry.broadcast(&payload);
        drop(state);

        counter!(COLOR_CHANGES_TOTAL).increment(1);
        info!(
            previous = %previous,
            color = %color,
            confidence,
            recipients = report.recipients,
            dropped = report.dropped,
            "color changed"
        );
        Ok(ObservationOutcome::Changed {
            previous,
            color,
            report,
        })
    }

    /// Open `connection`, send it the current color, then register it.
    ///
    /// Returns [`SendStatus::NotReady`] without registering if the
    /// connection closed before it could join.
    pub fn join(&self, connection: Arc<ClientConnection>) -> Result<SendStatus, CoordinatorError> {
        let state = self.state.lock();
        let payload: Arc<str> = ColorUpdate::new(state.color.as_str()).to_json()?.into();
        if !connection.mark_open() {
            return Ok(SendStatus::NotReady);
        }
        let status = connection.send_text(payload);
        self.registry.add(connection);
        Ok(status)
    }

    /// Deregister a connection. Returns `false` if it was not registered.
    pub fn leave(&self, connection_id: &str) -> bool {
        self.registry.remove(connection_id).is_some()
    }

    /// The shared color.
    pub fn current_color(&self) -> String {
        self.state.lock().color.clone()
    }

    /// The connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    #[cfg(test)]
    fn window_len(&self) -> usize {
        self.state.lock().engine.window().len()
    }
}

fn trim_observation(raw: &str) -> &str {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}
