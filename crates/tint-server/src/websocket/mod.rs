//! WebSocket connection management, liveness, and color broadcasting.
//!
//! | Module | Role |
//! |--------|------|
//! | `connection` | Per-client state, outbound queue, liveness flag |
//! | `registry` | Live connection set and fan-out |
//! | `coordinator` | Smoothing engine, shared color, join handshake |
//! | `heartbeat` | Periodic ping sweep |
//! | `session` | Socket read/write loops |

pub mod connection;
pub mod coordinator;
pub mod heartbeat;
pub mod registry;
pub mod session;
