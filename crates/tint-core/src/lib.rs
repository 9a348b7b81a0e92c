//! # tint-core
//!
//! Foundation types for the tint color relay.
//!
//! - **Smoothing**: [`smoothing::SmoothingEngine`] keeps a bounded FIFO window of
//!   observations and votes a debounced consensus out of it
//! - **Messages**: [`messages::ColorUpdate`], the only outbound wire message
//! - **Logging**: `tracing` subscriber setup and log capture for tests
//! - **Constants**: defaults shared by settings, server, and tests

#![deny(unsafe_code)]

pub mod constants;
pub mod logging;
pub mod messages;
pub mod smoothing;
