//! Diagnostics sender: ships per-frame scheduler counters to a local
//! telemetry listener over UDP.
//!
//! Enabled by the `diagnostics` feature flag. Call [`DiagSender::send`] once
//! per frame, before [`FrameContext::frame_reset`](crate::render2d::FrameContext::frame_reset),
//! with the context's [`FrameStats`]. Datagrams are throttled to 10 Hz and
//! carry one JSON object per snapshot, sent to `127.0.0.1:9100`.

use std::net::UdpSocket;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::render2d::FrameStats;

/// Telemetry listener address.
pub const TELEMETRY_ADDR: &str = "127.0.0.1:9100";

const SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Owns the outbound UDP socket and the throttling state.
pub struct DiagSender {
    socket: UdpSocket,
    last_send: Instant,
    sent: u64,
}

impl DiagSender {
    /// Bind an ephemeral local port aimed at [`TELEMETRY_ADDR`].
    ///
    /// `None` when the socket cannot be set up; diagnostics are best-effort.
    pub fn new() -> Option<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").ok()?;
        socket.connect(TELEMETRY_ADDR).ok()?;
        socket.set_nonblocking(true).ok()?;

        Some(Self {
            socket,
            // Send on the first frame.
            last_send: Instant::now() - Duration::from_secs(1),
            sent: 0,
        })
    }

    /// Send a snapshot unless one went out less than 100 ms ago.
    ///
    /// Returns whether a datagram was handed to the socket. Send failures
    /// (nobody listening, full buffer) are logged at trace level and dropped.
    pub fn send(&mut self, stats: &FrameStats) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_send) < SEND_INTERVAL {
            return false;
        }
        self.last_send = now;

        let payload = snapshot_json(stats);
        match self.socket.send(payload.as_bytes()) {
            Ok(_) => {
                self.sent += 1;
                true
            }
            Err(e) => {
                log::trace!("diagnostics datagram dropped: {e}");
                false
            }
        }
    }

    /// Snapshots successfully sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

// ── Wire format ─────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DiagSnapshot<'a> {
    frame: u64,
    submitted: u32,
    culled: u32,
    rejected: u32,
    batched: u32,
    active_jobs_total: usize,
    layers: Vec<LayerSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

#[derive(Serialize)]
struct LayerSnapshot {
    index: usize,
    active_jobs: usize,
}

/// Serialize one snapshot the way [`DiagSender::send`] puts it on the wire.
pub fn snapshot_json(stats: &FrameStats) -> String {
    let snapshot = DiagSnapshot {
        frame: stats.frame,
        submitted: stats.submitted,
        culled: stats.culled,
        rejected: stats.rejected,
        batched: stats.batched,
        active_jobs_total: stats.active_jobs.iter().sum(),
        layers: stats
            .active_jobs
            .iter()
            .enumerate()
            .map(|(index, &active_jobs)| LayerSnapshot { index, active_jobs })
            .collect(),
        note: stats.active_jobs.is_empty().then_some("no layers"),
    };
    // Plain structs of numbers and strings always serialize.
    serde_json::to_string(&snapshot).unwrap_or_default()
}
