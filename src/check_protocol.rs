//! On-demand "check for objects" request state.
//!
//! At most one request is active. Cancellation cannot stop an engine pass
//! that is already running; it only marks the request so that
//! [`CheckForObjects::finish`] reports `Preempted` instead of the result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use crate::common::BoundingBoxes;
use crate::data::CheckOutcome;

#[derive(Debug, Clone, Copy, PartialEq)]
enum CheckState {
    Idle,
    Active { id: u64, preempt_requested: bool },
}

/// Proof that the holder owns the active request. Consumed by `finish`.
#[derive(Debug)]
pub struct CheckTicket {
    id: u64,
}

impl CheckTicket {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug)]
pub struct CheckForObjects {
    state: Mutex<CheckState>,
    next_id: AtomicU64,
}

impl Default for CheckForObjects {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckForObjects {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CheckState::Idle),
            next_id: AtomicU64::new(1),
        }
    }

    /// Idle -> Active. `None` means another request is active (busy).
    pub fn try_begin(&self) -> Option<CheckTicket> {
        let mut state = self.state.lock();
        match *state {
            CheckState::Active { .. } => None,
            CheckState::Idle => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                *state = CheckState::Active { id, preempt_requested: false };
                Some(CheckTicket { id })
            }
        }
    }

    /// Marks whichever request is active as preempted.
    pub fn preempt(&self) -> bool {
        self.preempt_if(|_| true)
    }

    /// Marks request `id` as preempted, if it is still the active one.
    pub fn preempt_request(&self, id: u64) -> bool {
        self.preempt_if(|active| active == id)
    }

    fn preempt_if(&self, matches: impl Fn(u64) -> bool) -> bool {
        let mut state = self.state.lock();
        match &mut *state {
            CheckState::Active { id, preempt_requested } if matches(*id) => {
                *preempt_requested = true;
                true
            }
            _ => false,
        }
    }

    /// Active -> Idle, deciding what the requester gets. A preemption that
    /// arrived at any point before this call wins over the result.
    pub fn finish(&self, ticket: CheckTicket, result: Result<BoundingBoxes>) -> CheckOutcome {
        let mut state = self.state.lock();
        let preempted = match *state {
            CheckState::Active { id, preempt_requested } if id == ticket.id => preempt_requested,
            _ => {
                log::error!("bvr_perception: check request {} finished while not active", ticket.id);
                false
            }
        };
        *state = CheckState::Idle;
        drop(state);

        if preempted {
            return CheckOutcome::Preempted;
        }
        match result {
            Ok(boxes) => CheckOutcome::Succeeded(boxes),
            Err(e) => CheckOutcome::Aborted(e.to_string()),
        }
    }

    /// Returns request `id` to Idle without an outcome, for a request whose
    /// worker never started.
    pub(crate) fn abandon(&self, id: u64) {
        let mut state = self.state.lock();
        if matches!(*state, CheckState::Active { id: active, .. } if active == id) {
            *state = CheckState::Idle;
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.state.lock(), CheckState::Active { .. })
    }
}

/// Caller side of a request running on its own thread.
#[derive(Debug)]
pub struct CheckHandle {
    id: Option<u64>,
    check: Arc<CheckForObjects>,
    outcome_rx: Receiver<CheckOutcome>,
}

impl CheckHandle {
    pub(crate) fn new(id: Option<u64>, check: Arc<CheckForObjects>, outcome_rx: Receiver<CheckOutcome>) -> Self {
        Self { id, check, outcome_rx }
    }

    /// Requests preemption of this request. Returns false when it already
    /// finished or never started.
    pub fn cancel(&self) -> bool {
        match self.id {
            Some(id) => self.check.preempt_request(id),
            None => false,
        }
    }

    pub fn wait(self) -> CheckOutcome {
        self.outcome_rx
            .recv()
            .unwrap_or_else(|_| CheckOutcome::Aborted("check worker exited without a result".to_string()))
    }

    /// `None` when the request is still running after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<CheckOutcome> {
        match self.outcome_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                Some(CheckOutcome::Aborted("check worker exited without a result".to_string()))
            }
        }
    }
}
