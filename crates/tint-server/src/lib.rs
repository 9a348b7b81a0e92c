//! # tint-server
//!
//! Axum HTTP + `WebSocket` relay for a smoothed shared color.
//!
//! - `WebSocket` gateway: every inbound message is an observation; the
//!   smoothed consensus is fanned out to all clients on change and sent to
//!   each client on join
//! - Liveness: one ping sweep for all connections, silent clients dropped
//! - HTTP endpoints: `/health`, `/metrics`, static assets
//! - Graceful shutdown via `tokio::signal` + `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, TintServer};
