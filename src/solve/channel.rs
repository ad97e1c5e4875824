//! Task-to-orchestrator messages and the one-shot session decision.

use crate::solve::task::{TaskOutcome, TaskState};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Message sent from a solve task to the orchestrator.
#[derive(Debug, Clone)]
pub enum TaskMessage {
    /// The task moved to a new non-terminal state.
    Transition { index: usize, state: TaskState },
    /// The task reached a terminal state.
    Finished {
        index: usize,
        outcome: TaskOutcome,
        elapsed: Duration,
    },
}

/// Terminal decision for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Undecided,
    /// The partition with this index won.
    Won(usize),
    Exhausted,
    Aborted,
}

const UNDECIDED: usize = usize::MAX;
const EXHAUSTED: usize = usize::MAX - 1;
const ABORTED: usize = usize::MAX - 2;

/// Compare-and-commit guard for the session outcome.
///
/// Exactly one of winner, exhaustion or abort is ever committed; every later
/// attempt fails and learns what was decided instead.
#[derive(Debug)]
pub struct DecisionGuard {
    state: AtomicUsize,
}

impl Default for DecisionGuard {
    fn default() -> Self {
        Self {
            state: AtomicUsize::new(UNDECIDED),
        }
    }
}

impl DecisionGuard {
    pub fn current(&self) -> Decision {
        decode(self.state.load(Ordering::SeqCst))
    }

    pub fn is_decided(&self) -> bool {
        self.current() != Decision::Undecided
    }

    /// Commit `index` as the winner. Returns the existing decision on failure.
    pub fn try_commit_winner(&self, index: usize) -> Result<(), Decision> {
        debug_assert!(index < ABORTED, "partition index out of range");
        self.commit(index)
    }

    pub fn try_commit_exhausted(&self) -> Result<(), Decision> {
        self.commit(EXHAUSTED)
    }

    pub fn try_abort(&self) -> Result<(), Decision> {
        self.commit(ABORTED)
    }

    fn commit(&self, code: usize) -> Result<(), Decision> {
        self.state
            .compare_exchange(UNDECIDED, code, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(decode)
    }
}

fn decode(code: usize) -> Decision {
    match code {
        UNDECIDED => Decision::Undecided,
        EXHAUSTED => Decision::Exhausted,
        ABORTED => Decision::Aborted,
        index => Decision::Won(index),
    }
}

/// Create the many-to-one channel tasks report on.
///
/// Unbounded so a finishing task never blocks on a busy orchestrator.
pub fn create_channels() -> (Sender<TaskMessage>, Receiver<TaskMessage>) {
    unbounded()
}
