use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::Error;

/// Bounded pool of conversion slots with a FIFO wait queue.
#[derive(Clone)]
pub struct AdmissionController {
    inner: Arc<Inner>,
}

struct Inner {
    max: usize,
    timeout: Duration,
    state: Mutex<State>,
    available_changed: Condvar,
}

struct State {
    available: usize,
    next_ticket: u64,
    waiting: VecDeque<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionStats {
    pub available: usize,
    pub max: usize,
    pub waiting: usize,
}

impl AdmissionController {
    pub fn new(max: usize, timeout: Duration) -> Self {
        let max = max.max(1);
        Self {
            inner: Arc::new(Inner {
                max,
                timeout,
                state: Mutex::new(State {
                    available: max,
                    next_ticket: 0,
                    waiting: VecDeque::new(),
                }),
                available_changed: Condvar::new(),
            }),
        }
    }

    /// Waits up to the configured timeout for a slot.
    pub fn acquire(&self) -> Result<AdmissionPermit, Error> {
        self.acquire_within(self.inner.timeout)
    }

    pub fn acquire_within(&self, timeout: Duration) -> Result<AdmissionPermit, Error> {
        // Timeouts too large to represent behave as waiting forever.
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.inner.state.lock();

        if state.waiting.is_empty() && state.available > 0 {
            state.available -= 1;
            return Ok(self.permit());
        }

        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.waiting.push_back(ticket);
        debug!(ticket, queued = state.waiting.len(), "waiting for a conversion slot");

        loop {
            if state.waiting.front() == Some(&ticket) && state.available > 0 {
                state.waiting.pop_front();
                state.available -= 1;
                // The next waiter may also be able to proceed.
                self.inner.available_changed.notify_all();
                return Ok(self.permit());
            }

            let timed_out = match deadline {
                Some(deadline) => self
                    .inner
                    .available_changed
                    .wait_until(&mut state, deadline)
                    .timed_out(),
                None => {
                    self.inner.available_changed.wait(&mut state);
                    false
                }
            };
            if timed_out {
                if state.waiting.front() == Some(&ticket) && state.available > 0 {
                    continue;
                }
                state.waiting.retain(|t| *t != ticket);
                self.inner.available_changed.notify_all();
                warn!(ticket, ?timeout, "admission timed out");
                return Err(Error::AdmissionTimeout(timeout));
            }
        }
    }

    /// Takes a slot only if one is free and nobody is queued ahead.
    pub fn try_acquire(&self) -> Option<AdmissionPermit> {
        let mut state = self.inner.state.lock();
        if state.waiting.is_empty() && state.available > 0 {
            state.available -= 1;
            Some(self.permit())
        } else {
            None
        }
    }

    pub fn available_permits(&self) -> usize {
        self.inner.state.lock().available
    }

    pub fn max_permits(&self) -> usize {
        self.inner.max
    }

    pub fn in_use(&self) -> usize {
        self.inner.max - self.available_permits()
    }

    pub fn stats(&self) -> AdmissionStats {
        let state = self.inner.state.lock();
        AdmissionStats {
            available: state.available,
            max: self.inner.max,
            waiting: state.waiting.len(),
        }
    }

    fn permit(&self) -> AdmissionPermit {
        AdmissionPermit {
            inner: Some(Arc::clone(&self.inner)),
        }
    }
}

/// One held slot. Returned to the pool exactly once, on drop or `release`.
#[must_use = "dropping the permit releases the slot immediately"]
pub struct AdmissionPermit {
    inner: Option<Arc<Inner>>,
}

impl AdmissionPermit {
    pub fn release(mut self) {
        self.give_back();
    }

    fn give_back(&mut self) {
        if let Some(inner) = self.inner.take() {
            let mut state = inner.state.lock();
            state.available += 1;
            debug_assert!(state.available <= inner.max);
            drop(state);
            inner.available_changed.notify_all();
        }
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.give_back();
    }
}
