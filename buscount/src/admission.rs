//! Admission gate bounding the number of frames in flight
//!
//! The gate is a token channel of fixed capacity. The source takes a token
//! before pulling a frame and the caller thread hands it back once the sink
//! has seen that frame. When every token is out the source blocks.

use crossbeam::channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct GateStats {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Acquire side, owned by the source stage
pub(crate) struct GatePermits {
    tokens: Sender<()>,
    stats: Arc<GateStats>,
}

/// Release side, owned by the caller thread
pub(crate) struct GateReturns {
    tokens: Receiver<()>,
    stats: Arc<GateStats>,
}

/// Read-only view of the gate counters
#[derive(Debug, Clone)]
pub(crate) struct GateMonitor {
    stats: Arc<GateStats>,
}

pub(crate) fn admission_gate(capacity: usize) -> (GatePermits, GateReturns, GateMonitor) {
    let (tx, rx) = bounded(capacity.max(1));
    let stats = Arc::new(GateStats::default());
    (
        GatePermits {
            tokens: tx,
            stats: stats.clone(),
        },
        GateReturns {
            tokens: rx,
            stats: stats.clone(),
        },
        GateMonitor { stats },
    )
}

impl GatePermits {
    /// Block until a token is free. Returns false once the release side is
    /// gone, which means the pipeline is shutting down.
    pub(crate) fn acquire(&self) -> bool {
        self.tokens.send(()).is_ok()
    }

    /// Record that a frame left the source under the token just acquired
    pub(crate) fn admitted(&self) {
        let now = self.stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now, Ordering::SeqCst);
    }
}

impl GateReturns {
    /// Hand back the token of a frame that reached the end of the pipeline
    pub(crate) fn release(&self) {
        // Decrement before freeing the slot so the counter never overshoots
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.tokens.try_recv();
    }
}

impl GateMonitor {
    pub(crate) fn peak(&self) -> usize {
        self.stats.peak.load(Ordering::SeqCst)
    }
}
