//! A single solve attempt over one partition.
//!
//! Lifecycle: `Created → Extracting → Solving → {Solved, NotSolved, Aborted, Failed}`.
//! The task reports each transition and its terminal outcome to the
//! orchestrator and holds no reference back to it or to sibling tasks.

use crate::engine::{Extractor, PlateSolver, SharedExtraction, SolveRequest, SolverOutcome};
use crate::error::{ExtractionError, SolveExecutionError};
use crate::hints::PositionHint;
use crate::image::Image;
use crate::config::Parameters;
use crate::solve::cancel::{CancelToken, MarkerFiles};
use crate::solve::channel::TaskMessage;
use crate::solve::partition::Partition;
use crate::wcs::Solution;
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

/// Lifecycle state of a solve task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Created,
    Extracting,
    Solving,
    Solved,
    NotSolved,
    Aborted,
    Failed,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Solved | TaskState::NotSolved | TaskState::Aborted | TaskState::Failed
        )
    }
}

/// Why a partition finished without a solution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NotSolvedReason {
    #[error("no match in partition")]
    NoMatch,
    #[error("time limit reached")]
    Timeout,
    #[error("match below acceptance threshold (log-odds {log_odds:.2})")]
    BelowThreshold {
        log_odds: f64,
        /// Score fell in the tuning band.
        tuning_candidate: bool,
        /// Score cleared the keep threshold.
        kept: bool,
    },
    #[error(transparent)]
    Extraction(ExtractionError),
}

/// Terminal outcome of a solve task.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// The solver matched the field. Not yet arbitrated.
    Solved { solution: Solution, log_odds: f64 },
    NotSolved(NotSolvedReason),
    Aborted,
    Failed(SolveExecutionError),
}

impl TaskOutcome {
    pub fn state(&self) -> TaskState {
        match self {
            TaskOutcome::Solved { .. } => TaskState::Solved,
            TaskOutcome::NotSolved(_) => TaskState::NotSolved,
            TaskOutcome::Aborted => TaskState::Aborted,
            TaskOutcome::Failed(_) => TaskState::Failed,
        }
    }
}

/// Read-only state shared by every task of a session.
pub struct TaskContext {
    pub image: Arc<Image>,
    pub params: Arc<Parameters>,
    pub position: Option<PositionHint>,
    pub extraction: Arc<SharedExtraction>,
    pub extractor: Arc<dyn Extractor>,
    pub solver: Arc<dyn PlateSolver>,
    /// Session scratch directory tasks create their own subdirectory in.
    pub scratch_root: Option<PathBuf>,
    pub base_name: String,
    pub markers: Option<MarkerFiles>,
}

impl std::fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskContext")
            .field("params", &self.params.name)
            .field("position", &self.position)
            .field("scratch_root", &self.scratch_root)
            .field("base_name", &self.base_name)
            .finish_non_exhaustive()
    }
}

/// Per-task scratch directory, removed when dropped.
#[derive(Debug)]
pub struct TaskScratch {
    dir: PathBuf,
}

impl TaskScratch {
    pub fn create(root: &Path, base_name: &str, index: usize) -> std::io::Result<Self> {
        let dir = root.join(format!("{}_{}", base_name, index));
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }
}

impl Drop for TaskScratch {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_dir_all(&self.dir)
            && err.kind() != std::io::ErrorKind::NotFound
        {
            warn!(dir = %self.dir.display(), %err, "could not remove task scratch directory");
        }
    }
}

/// One solve attempt restricted to a partition.
pub struct SolveTask {
    partition: Partition,
    context: Arc<TaskContext>,
    token: CancelToken,
    reporter: Sender<TaskMessage>,
    state: TaskState,
    scratch: Option<TaskScratch>,
}

impl SolveTask {
    pub fn new(
        partition: Partition,
        context: Arc<TaskContext>,
        token: CancelToken,
        reporter: Sender<TaskMessage>,
    ) -> Self {
        Self {
            partition,
            context,
            token,
            reporter,
            state: TaskState::Created,
            scratch: None,
        }
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Run the task to a terminal state and report the outcome.
    ///
    /// Scratch files are released before the outcome is sent.
    pub fn run(mut self) -> TaskOutcome {
        let start = Instant::now();
        let outcome = self.execute();
        self.state = outcome.state();
        self.scratch = None;

        debug!(
            partition = self.partition.index,
            state = ?self.state,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "solve task finished"
        );
        let _ = self.reporter.send(TaskMessage::Finished {
            index: self.partition.index,
            outcome: outcome.clone(),
            elapsed: start.elapsed(),
        });
        outcome
    }

    fn execute(&mut self) -> TaskOutcome {
        if self.token.is_cancelled() {
            return TaskOutcome::Aborted;
        }

        self.transition(TaskState::Extracting);
        let context = Arc::clone(&self.context);
        let extraction = match context.extraction.get_or_extract(
            context.extractor.as_ref(),
            &context.image,
            &context.params,
        ) {
            Ok(extraction) => extraction,
            Err(err) => return TaskOutcome::NotSolved(NotSolvedReason::Extraction(err)),
        };
        if self.token.is_cancelled() {
            return TaskOutcome::Aborted;
        }

        self.transition(TaskState::Solving);
        if let Some(root) = &context.scratch_root {
            match TaskScratch::create(root, &context.base_name, self.partition.index) {
                Ok(scratch) => self.scratch = Some(scratch),
                Err(err) => return TaskOutcome::Failed(err.into()),
            }
        }

        let request = self.request();
        let token = self.token.with_time_limit(context.params.solve.time_limit);
        let result = context.solver.solve(&extraction.stars, &request, &token);
        interpret(result, &token)
    }

    fn request(&self) -> SolveRequest {
        let params = &self.context.params.solve;
        let position = self.context.position.map(|hint| {
            if hint.radius_deg > 0.0 {
                hint
            } else {
                PositionHint {
                    radius_deg: params.search_radius,
                    ..hint
                }
            }
        });
        let markers = self.context.markers.as_ref();

        SolveRequest {
            partition: self.partition.index,
            scale: self.partition.scale,
            depth: self.partition.depth,
            position,
            time_limit: params.time_limit,
            log_odds: params.log_odds,
            parity: params.search_parity,
            in_parallel: params.in_parallel,
            image_width: self.context.image.width(),
            image_height: self.context.image.height(),
            scratch_dir: self.scratch.as_ref().map(|s| s.path().to_path_buf()),
            cancel_marker: markers.map(|m| m.cancel.clone()),
            solved_marker: markers.map(|m| m.solved.clone()),
        }
    }

    fn transition(&mut self, state: TaskState) {
        self.state = state;
        let _ = self.reporter.send(TaskMessage::Transition {
            index: self.partition.index,
            state,
        });
    }
}

/// Map a raw solver result onto a task outcome.
///
/// Anything but a solution that comes back after cancellation counts as an
/// abort; a deadline hit without cancellation is a timeout.
fn interpret(
    result: Result<SolverOutcome, SolveExecutionError>,
    token: &CancelToken,
) -> TaskOutcome {
    match result {
        Ok(SolverOutcome::Solved { solution, log_odds }) => {
            TaskOutcome::Solved { solution, log_odds }
        }
        Ok(SolverOutcome::NotSolved) | Ok(SolverOutcome::Interrupted)
            if token.is_cancelled() =>
        {
            TaskOutcome::Aborted
        }
        Ok(_) if token.is_expired() => TaskOutcome::NotSolved(NotSolvedReason::Timeout),
        Ok(SolverOutcome::Interrupted) => TaskOutcome::Aborted,
        Ok(SolverOutcome::NotSolved) => TaskOutcome::NotSolved(NotSolvedReason::NoMatch),
        Err(_) if token.is_cancelled() => TaskOutcome::Aborted,
        Err(err) => TaskOutcome::Failed(err),
    }
}
