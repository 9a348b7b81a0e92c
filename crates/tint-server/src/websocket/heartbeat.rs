//! Ping/pong liveness sweep over the registry.
//!
//! One task serves every connection. Each tick, a connection that has not
//! answered the previous probe is terminated; every other connection has
//! its flag cleared and receives a fresh ping. A client that stops
//! answering is therefore dropped between one and two intervals after its
//! last pong.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::connection::SendStatus;
use super::registry::ConnectionRegistry;
use crate::metrics::LIVENESS_TERMINATIONS_TOTAL;

/// Tally of one sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections sent a fresh probe.
    pub probed: usize,
    /// Connections terminated for missing the previous probe.
    pub terminated: usize,
}

/// Run one liveness pass over a snapshot of the registry.
pub fn sweep(registry: &ConnectionRegistry) -> SweepReport {
    let mut report = SweepReport::default();
    for conn in registry.snapshot() {
        if conn.check_alive() {
            if conn.ping() == SendStatus::Queued {
                report.probed += 1;
            }
            continue;
        }
        if registry.terminate(&conn.id) {
            counter!(LIVENESS_TERMINATIONS_TOTAL).increment(1);
            info!(
                conn_id = %conn.id,
                silent_ms = conn.last_pong_elapsed().as_millis() as u64,
                "terminating unresponsive connection"
            );
            report.terminated += 1;
        }
    }
    report
}

/// Sweep every `interval` until `cancel` fires. The first sweep runs one
/// interval after start.
pub async fn run_liveness_monitor(
    registry: Arc<ConnectionRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = sweep(&registry);
                debug!(probed = report.probed, terminated = report.terminated, "liveness sweep");
            }
            () = cancel.cancelled() => {
                debug!("liveness monitor stopped");
                return;
            }
        }
    }
}

/// Spawns the liveness task.
pub struct LivenessMonitor;

impl LivenessMonitor {
    /// Start sweeping `registry` on a background task.
    pub fn spawn(
        registry: Arc<ConnectionRegistry>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> MonitorHandle {
        let handle = tokio::spawn(run_liveness_monitor(registry, interval, cancel.clone()));
        MonitorHandle { cancel, handle }
    }
}

/// Retained handle to a running liveness task.
pub struct MonitorHandle {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl MonitorHandle {
    /// Cancel the task and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }

    /// Cancel the task without waiting for it.
    pub fn stop_detached(self) {
        self.cancel.cancel();
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
