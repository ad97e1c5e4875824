//! Session outcome types and per-partition records.

use crate::engine::Extraction;
use crate::error::SolveExecutionError;
use crate::image::Star;
use crate::solve::partition::{Partition, Plan};
use crate::solve::task::{NotSolvedReason, TaskOutcome, TaskState};
use crate::wcs::Solution;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Orchestrator session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Planning,
    Running,
    Succeeded,
    ExhaustedAllPartitions,
    AbortedByCaller,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Succeeded
                | SessionState::ExhaustedAllPartitions
                | SessionState::AbortedByCaller
        )
    }

    pub(crate) fn to_code(self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::Planning => 1,
            SessionState::Running => 2,
            SessionState::Succeeded => 3,
            SessionState::ExhaustedAllPartitions => 4,
            SessionState::AbortedByCaller => 5,
        }
    }

    pub(crate) fn from_code(code: u8) -> Self {
        match code {
            1 => SessionState::Planning,
            2 => SessionState::Running,
            3 => SessionState::Succeeded,
            4 => SessionState::ExhaustedAllPartitions,
            5 => SessionState::AbortedByCaller,
            _ => SessionState::Idle,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Planning => write!(f, "planning"),
            SessionState::Running => write!(f, "running"),
            SessionState::Succeeded => write!(f, "succeeded"),
            SessionState::ExhaustedAllPartitions => write!(f, "exhausted"),
            SessionState::AbortedByCaller => write!(f, "aborted"),
        }
    }
}

/// Why one partition did not contribute the winning solution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PartitionError {
    #[error(transparent)]
    NotSolved(NotSolvedReason),
    #[error(transparent)]
    Failed(SolveExecutionError),
    #[error("aborted")]
    Aborted,
    /// Cancelled before a worker picked it up.
    #[error("cancelled before starting")]
    NotStarted,
    /// Did not acknowledge cancellation within the teardown grace period.
    #[error("did not stop within the teardown grace period")]
    Detached,
}

/// Diagnosis for a single partition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("partition {index}: {error}")]
pub struct PartitionFailure {
    pub index: usize,
    pub partition: Partition,
    pub error: PartitionError,
}

/// Failure surfaced to the caller of a solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolveFailure {
    #[error("no partition produced an accepted solution ({} tried)", reasons.len())]
    Exhausted { reasons: Vec<PartitionFailure> },
    #[error("solve aborted by caller")]
    Aborted,
}

impl SolveFailure {
    pub fn is_aborted(&self) -> bool {
        matches!(self, SolveFailure::Aborted)
    }

    /// Per-partition reasons for an exhausted session.
    pub fn reasons(&self) -> &[PartitionFailure] {
        match self {
            SolveFailure::Exhausted { reasons } => reasons,
            SolveFailure::Aborted => &[],
        }
    }
}

/// The committed solution and where it came from.
#[derive(Debug, Clone)]
pub struct Winner {
    pub index: usize,
    pub partition: Partition,
    pub solution: Solution,
    pub log_odds: f64,
}

/// Everything known about one partition at the end of a session.
#[derive(Debug, Clone)]
pub struct PartitionRecord {
    pub partition: Partition,
    /// Last state the task reported.
    pub state: TaskState,
    pub started: bool,
    pub outcome: Option<TaskOutcome>,
    pub elapsed: Option<Duration>,
    /// Finished after the session was already decided.
    pub late: bool,
}

impl PartitionRecord {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            state: TaskState::Created,
            started: false,
            outcome: None,
            elapsed: None,
            late: false,
        }
    }

    pub fn index(&self) -> usize {
        self.partition.index
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Failure diagnosis, or `None` for a solved partition.
    pub fn failure(&self) -> Option<PartitionFailure> {
        let error = match &self.outcome {
            Some(TaskOutcome::Solved { .. }) => return None,
            Some(TaskOutcome::NotSolved(reason)) => PartitionError::NotSolved(reason.clone()),
            Some(TaskOutcome::Failed(err)) => PartitionError::Failed(err.clone()),
            Some(TaskOutcome::Aborted) => PartitionError::Aborted,
            None if self.started => PartitionError::Detached,
            None => PartitionError::NotStarted,
        };
        Some(PartitionFailure {
            index: self.partition.index,
            partition: self.partition,
            error,
        })
    }
}

/// Full account of a solve session.
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub state: SessionState,
    pub outcome: Result<Winner, SolveFailure>,
    /// `None` if the session was aborted before planning finished.
    pub plan: Option<Plan>,
    pub records: Vec<PartitionRecord>,
    pub extraction: Option<Arc<Extraction>>,
    /// Extracted stars with sky coordinates, when requested and solved.
    pub annotated_stars: Option<Vec<Star>>,
    /// Partitions whose score fell in the tuning band.
    pub tuning_candidates: Vec<(usize, f64)>,
    pub elapsed: Duration,
}

impl SolveReport {
    pub fn is_solved(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.outcome.as_ref().ok().map(|w| &w.solution)
    }

    pub fn winner(&self) -> Option<&Winner> {
        self.outcome.as_ref().ok()
    }

    /// Number of partitions that never acknowledged teardown.
    pub fn detached(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.started && !r.is_finished())
            .count()
    }

    pub fn into_result(self) -> Result<Solution, SolveFailure> {
        self.outcome.map(|w| w.solution)
    }
}
