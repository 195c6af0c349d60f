//! Fixed-interval monitoring loop.
//!
//! A timer fires every `interval`; each firing runs one tick on a worker
//! thread. A tick that fires while the previous one is still running is
//! skipped and reported, never queued.

use crate::exec::CancelToken;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Admits at most one tick at a time.
#[derive(Debug, Clone, Default)]
pub struct TickGate {
    busy: Arc<AtomicBool>,
}

impl TickGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate, or `None` while a tick is in flight.
    pub fn try_begin(&self) -> Option<TickGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TickGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped.
#[derive(Debug)]
pub struct TickGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for TickGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Counts of ticks run and skipped over a monitoring run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub ran: u64,
    pub skipped: u64,
}

pub struct Monitor {
    interval: Duration,
    gate: TickGate,
    cancel: CancelToken,
}

impl Monitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            gate: TickGate::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Tick until canceled.
    ///
    /// `tick` receives the tick number (starting at 1); `on_skip` is told
    /// about ticks dropped because the previous one had not finished. Waits
    /// for the in-flight tick before returning.
    pub fn run<T, S>(&self, tick: T, on_skip: S) -> MonitorSummary
    where
        T: Fn(u64) + Sync,
        S: Fn(u64),
    {
        let mut summary = MonitorSummary::default();
        let mut number = 0u64;

        thread::scope(|scope| {
            while !self.cancel.is_canceled() {
                number += 1;
                match self.gate.try_begin() {
                    Some(guard) => {
                        summary.ran += 1;
                        let tick = &tick;
                        scope.spawn(move || {
                            let _guard = guard;
                            tick(number);
                        });
                    }
                    None => {
                        summary.skipped += 1;
                        tracing::debug!(tick = number, "previous tick still running, skipping");
                        on_skip(number);
                    }
                }
                self.wait_interval();
            }
        });

        summary
    }

    /// Run a single tick on the calling thread.
    pub fn run_once<T: FnOnce()>(&self, tick: T) -> MonitorSummary {
        match self.gate.try_begin() {
            Some(_guard) => {
                tick();
                MonitorSummary { ran: 1, skipped: 0 }
            }
            None => MonitorSummary { ran: 0, skipped: 1 },
        }
    }

    fn wait_interval(&self) {
        let deadline = Instant::now() + self.interval;
        while !self.cancel.is_canceled() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}
