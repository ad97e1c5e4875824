//! Structured progress events emitted during a solve session.

use crate::solve::partition::{Partition, Strategy};
use crate::solve::result::SessionState;
use crate::solve::task::{TaskOutcome, TaskState};
use crossbeam_channel::Sender;
use serde::Serialize;

/// A progress event for logging or UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SolveEvent {
    SessionStateChanged {
        state: SessionState,
    },
    PlanReady {
        strategy: Strategy,
        degree: usize,
        partitions: Vec<Partition>,
    },
    PartitionStarted {
        index: usize,
        partition: Partition,
    },
    PartitionStateChanged {
        index: usize,
        state: TaskState,
    },
    PartitionFinished {
        index: usize,
        state: TaskState,
        /// Human-readable outcome.
        detail: String,
        elapsed_ms: u64,
    },
    /// A match scored in the tuning band.
    NearMiss {
        index: usize,
        log_odds: f64,
    },
    WinnerSelected {
        index: usize,
        log_odds: f64,
    },
    Exhausted {
        partitions: usize,
    },
    Aborted {
        running: usize,
    },
}

impl SolveEvent {
    pub(crate) fn finished(index: usize, outcome: &TaskOutcome, elapsed_ms: u64) -> Self {
        let detail = match outcome {
            TaskOutcome::Solved { log_odds, .. } => format!("solved (log-odds {:.2})", log_odds),
            TaskOutcome::NotSolved(reason) => reason.to_string(),
            TaskOutcome::Aborted => "aborted".to_string(),
            TaskOutcome::Failed(err) => err.to_string(),
        };
        SolveEvent::PartitionFinished {
            index,
            state: outcome.state(),
            detail,
            elapsed_ms,
        }
    }
}

/// Receiver of progress events. Must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SolveEvent);
}

impl EventSink for Sender<SolveEvent> {
    fn emit(&self, event: SolveEvent) {
        let _ = self.send(event);
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SolveEvent) {}
}
