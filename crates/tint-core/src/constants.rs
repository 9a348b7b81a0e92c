//! Defaults shared across the workspace.

/// Color reported before any observation has won a vote.
pub const INITIAL_COLOR: &str = "none";

/// Default observation window capacity.
pub const DEFAULT_BUFFER_SIZE: usize = 20;

/// Default fraction of the window a value must hold to win.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.6;

/// Default seconds between liveness sweeps.
pub const DEFAULT_LIVENESS_INTERVAL_SECS: u64 = 30;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default largest inbound WebSocket message, in bytes (100 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Default per-connection outbound queue depth.
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 64;

/// Wire `type` tag of a color update.
pub const COLOR_MESSAGE_TYPE: &str = "color";
