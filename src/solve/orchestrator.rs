//! Solve session driver.
//!
//! The orchestrator plans partitions, runs one [`SolveTask`] per partition on
//! its own worker thread (at most `max_workers` at a time), and reacts to the
//! tasks' completion messages. It is the only place a winner is committed:
//! the first accepted solution goes through the session's
//! [`DecisionGuard`], cancellation is broadcast to the remaining tasks, and
//! every later result is discarded.

use crate::config::Parameters;
use crate::engine::{Extraction, Extractor, PlateSolver, SharedExtraction};
use crate::error::{ExtractionError, InvariantViolation, SolveExecutionError};
use crate::hints::{PositionHint, ScaleHint};
use crate::image::{Background, Image, Star};
use crate::solve::arbiter::{ResultArbiter, Verdict};
use crate::solve::cancel::{CancelReason, CancelSource, MarkerFiles};
use crate::solve::channel::{Decision, DecisionGuard, TaskMessage, create_channels};
use crate::solve::config::OrchestratorConfig;
use crate::solve::events::{EventSink, NullSink, SolveEvent};
use crate::solve::partition::{DepthRange, Partition, Partitioner, Plan, ScaleRange};
use crate::solve::result::{PartitionRecord, SessionState, SolveFailure, SolveReport, Winner};
use crate::solve::task::{NotSolvedReason, SolveTask, TaskContext, TaskOutcome};
use crate::wcs::Solution;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::collections::{HashMap, VecDeque};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct SessionShared {
    state: AtomicU8,
    decision: DecisionGuard,
    cancel: CancelSource,
    running: AtomicUsize,
}

/// Handle for aborting a session from another thread.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    shared: Arc<SessionShared>,
}

impl SessionHandle {
    /// Abort the session.
    ///
    /// Only the first call on an undecided session has an effect; calls after
    /// the session succeeded or exhausted its partitions are ignored.
    pub fn abort(&self) -> bool {
        if let Err(decision) = self.shared.decision.try_abort() {
            debug!(?decision, "abort ignored, session already decided");
            return false;
        }
        self.shared.cancel.cancel(CancelReason::CallerAbort);
        info!(
            running = self.shared.running.load(Ordering::SeqCst),
            "solve aborted by caller"
        );
        true
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_code(self.shared.state.load(Ordering::SeqCst))
    }

    pub fn is_aborted(&self) -> bool {
        self.shared.decision.current() == Decision::Aborted
    }
}

/// Runs one solve session for one image.
///
/// ```ignore
/// let orchestrator = Orchestrator::new(Arc::new(extractor), Arc::new(solver))
///     .with_config(OrchestratorConfig::default().with_workers(4));
/// let handle = orchestrator.abort_handle();
/// let solution = orchestrator.solve(image, &params, Some(scale_hint), None)?;
/// ```
pub struct Orchestrator {
    extractor: Arc<dyn Extractor>,
    solver: Arc<dyn PlateSolver>,
    config: OrchestratorConfig,
    events: Arc<dyn EventSink>,
    extraction: Arc<SharedExtraction>,
    shared: Arc<SessionShared>,
}

impl Orchestrator {
    pub fn new(extractor: Arc<dyn Extractor>, solver: Arc<dyn PlateSolver>) -> Self {
        Self {
            extractor,
            solver,
            config: OrchestratorConfig::default(),
            events: Arc::new(NullSink),
            extraction: Arc::new(SharedExtraction::new()),
            shared: Arc::new(SessionShared::default()),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.events = Arc::new(sink);
        self
    }

    /// Solve a star list supplied by the caller instead of extracting one.
    pub fn with_star_list(mut self, stars: Vec<Star>, background: Background) -> Self {
        self.extraction = Arc::new(SharedExtraction::preloaded(Extraction::new(
            stars, background,
        )));
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn abort_handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn abort(&self) -> bool {
        self.abort_handle().abort()
    }

    pub fn state(&self) -> SessionState {
        self.abort_handle().state()
    }

    /// Run extraction only. The result is cached and reused by a later solve.
    pub fn extract(
        &self,
        image: &Image,
        params: &Parameters,
    ) -> Result<Arc<Extraction>, ExtractionError> {
        self.extraction
            .get_or_extract(self.extractor.as_ref(), image, params)
    }

    /// Solve an image, returning the committed solution or why there is none.
    pub fn solve(
        self,
        image: impl Into<Arc<Image>>,
        params: &Parameters,
        scale_hint: Option<ScaleHint>,
        position: Option<PositionHint>,
    ) -> Result<Solution, SolveFailure> {
        self.run(image, params, scale_hint, position).into_result()
    }

    /// Solve an image and return the full session report.
    pub fn run(
        self,
        image: impl Into<Arc<Image>>,
        params: &Parameters,
        scale_hint: Option<ScaleHint>,
        position: Option<PositionHint>,
    ) -> SolveReport {
        let start = Instant::now();
        let image = image.into();

        if self.shared.decision.current() == Decision::Aborted {
            self.set_state(SessionState::AbortedByCaller);
            self.events.emit(SolveEvent::Aborted { running: 0 });
            return SolveReport {
                state: SessionState::AbortedByCaller,
                outcome: Err(SolveFailure::Aborted),
                plan: None,
                records: Vec::new(),
                extraction: self.extraction.get(),
                annotated_stars: None,
                tuning_candidates: Vec::new(),
                elapsed: start.elapsed(),
            };
        }

        self.set_state(SessionState::Planning);
        let thresholds = params.solve.log_odds;
        if !thresholds.is_ordered() {
            warn!(
                to_solve = thresholds.to_solve,
                to_keep = thresholds.to_keep,
                to_tune = thresholds.to_tune,
                "log-odds thresholds are not ordered solve >= keep >= tune"
            );
        }

        let plan = self.plan(&image, params, scale_hint);
        info!(
            strategy = %plan.strategy,
            degree = plan.degree,
            low = plan.scale.low,
            high = plan.scale.high,
            "solve plan ready"
        );
        self.events.emit(SolveEvent::PlanReady {
            strategy: plan.strategy,
            degree: plan.degree,
            partitions: plan.partitions.clone(),
        });

        // The scratch directory lives until the end of this function
        let base_name = self.config.session_base_name();
        let scratch = self.create_scratch(&base_name);
        let markers = scratch
            .as_ref()
            .filter(|_| self.config.marker_files)
            .map(|dir| MarkerFiles::in_dir(dir.path(), &base_name));
        if let Some(markers) = &markers {
            self.shared.cancel.attach_markers(markers.clone());
        }

        let context = Arc::new(TaskContext {
            image,
            params: Arc::new(params.clone()),
            position,
            extraction: Arc::clone(&self.extraction),
            extractor: Arc::clone(&self.extractor),
            solver: Arc::clone(&self.solver),
            scratch_root: scratch.as_ref().map(|dir| dir.path().to_path_buf()),
            base_name,
            markers,
        });

        self.set_state(SessionState::Running);
        let mut session = SessionRun::new(
            &plan,
            ResultArbiter::new(thresholds),
            &self.shared,
            self.events.as_ref(),
        );
        if plan.is_parallel() {
            self.run_parallel(&plan, &context, &mut session);
        } else {
            self.run_inline(&plan, &context, &mut session);
        }

        let report = self.finish(plan, &context, session, start);
        drop(scratch);
        report
    }

    fn plan(&self, image: &Image, params: &Parameters, scale_hint: Option<ScaleHint>) -> Plan {
        let solve = &params.solve;
        let global_scale = ScaleRange::new(solve.min_width, solve.max_width);
        let hint = scale_hint.map(|h| {
            let (low, high) = h.to_degree_width(image.height());
            ScaleRange::new(low, high)
        });

        let keep_num = params.extraction.filter.keep_num;
        let max_depth = if keep_num > 0 {
            u32::try_from(keep_num).unwrap_or(u32::MAX)
        } else {
            self.config.partition.default_depth
        };
        let global_depth = DepthRange::new(1, max_depth);

        Partitioner::new(self.config.partition.clone()).plan(
            global_scale,
            global_depth,
            hint,
            solve.multi_algorithm,
            self.config.max_workers,
        )
    }

    fn create_scratch(&self, base_name: &str) -> Option<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(base_name);
        let created = match &self.config.temp_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        };
        match created {
            Ok(dir) => {
                debug!(dir = %dir.path().display(), "created session scratch directory");
                Some(dir)
            }
            Err(err) => {
                warn!(%err, "could not create session scratch directory, running without one");
                None
            }
        }
    }

    /// Single partition: run on the calling thread without worker bookkeeping.
    fn run_inline(&self, plan: &Plan, context: &Arc<TaskContext>, session: &mut SessionRun<'_>) {
        let Some(partition) = plan.partitions.first().copied() else {
            return;
        };
        let (tx, rx) = create_channels();
        session.started(&partition);
        self.shared.running.store(1, Ordering::SeqCst);

        let task = SolveTask::new(
            partition,
            Arc::clone(context),
            self.shared.cancel.token(),
            tx,
        );
        let start = Instant::now();
        if catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
            error!(partition = partition.index, "solve task panicked");
            session.finished(
                partition.index,
                TaskOutcome::Failed(SolveExecutionError::TaskPanicked),
                start.elapsed(),
            );
        }
        self.shared.running.store(0, Ordering::SeqCst);

        for message in rx.try_iter() {
            session.handle(message);
        }
        self.check_markers();
    }

    fn run_parallel(&self, plan: &Plan, context: &Arc<TaskContext>, session: &mut SessionRun<'_>) {
        let (tx, rx) = create_channels();
        let mut pending: VecDeque<Partition> = plan.partitions.iter().copied().collect();
        let mut workers: HashMap<usize, JoinHandle<()>> = HashMap::new();
        let cap = plan.degree.min(self.config.max_workers).max(1);

        loop {
            while workers.len() < cap && !self.shared.decision.is_decided() {
                let Some(partition) = pending.pop_front() else {
                    break;
                };
                match self.spawn(partition, context, &tx) {
                    Ok(handle) => {
                        session.started(&partition);
                        workers.insert(partition.index, handle);
                    }
                    Err(err) => {
                        error!(partition = partition.index, %err, "could not spawn solve task");
                        session.finished(
                            partition.index,
                            TaskOutcome::Failed(err.into()),
                            Duration::ZERO,
                        );
                    }
                }
            }
            self.shared.running.store(workers.len(), Ordering::SeqCst);

            if workers.is_empty() || self.shared.decision.is_decided() {
                break;
            }

            match rx.recv_timeout(self.config.poll_interval) {
                Ok(message) => {
                    if let TaskMessage::Finished { index, .. } = &message
                        && let Some(handle) = workers.remove(index)
                    {
                        let _ = handle.join();
                    }
                    session.handle(message);
                }
                Err(RecvTimeoutError::Timeout) => self.check_markers(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if !self.shared.decision.is_decided() {
            self.check_markers();
        }
        session.running_at_decision = workers.len();
        self.teardown(workers, &rx, session);
    }

    fn spawn(
        &self,
        partition: Partition,
        context: &Arc<TaskContext>,
        tx: &Sender<TaskMessage>,
    ) -> std::io::Result<JoinHandle<()>> {
        let task = SolveTask::new(
            partition,
            Arc::clone(context),
            self.shared.cancel.token(),
            tx.clone(),
        );
        let panic_tx = tx.clone();

        std::thread::Builder::new()
            .name(format!("solve-{}", partition.index))
            .spawn(move || {
                let start = Instant::now();
                if catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
                    error!(partition = partition.index, "solve task panicked");
                    let _ = panic_tx.send(TaskMessage::Finished {
                        index: partition.index,
                        outcome: TaskOutcome::Failed(SolveExecutionError::TaskPanicked),
                        elapsed: start.elapsed(),
                    });
                }
            })
    }

    /// Wait up to the grace period for cancelled tasks to report back, then
    /// detach whatever is still running.
    fn teardown(
        &self,
        mut workers: HashMap<usize, JoinHandle<()>>,
        rx: &Receiver<TaskMessage>,
        session: &mut SessionRun<'_>,
    ) {
        let deadline = Instant::now() + self.config.teardown_grace;
        while !workers.is_empty() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match rx.recv_timeout(deadline - now) {
                Ok(message) => {
                    if let TaskMessage::Finished { index, .. } = &message
                        && let Some(handle) = workers.remove(index)
                    {
                        let _ = handle.join();
                    }
                    session.handle(message);
                }
                Err(_) => break,
            }
        }

        for index in workers.keys() {
            warn!(
                partition = index,
                grace_ms = self.config.teardown_grace.as_millis() as u64,
                "solve task did not stop in time, detaching"
            );
        }
        self.shared.running.store(0, Ordering::SeqCst);
    }

    /// Treat an externally created cancel marker as a caller abort.
    ///
    /// The solved marker only stops tasks through their tokens; the session
    /// keeps waiting for the solving task's own result.
    fn check_markers(&self) {
        match self.shared.cancel.token().reason() {
            Some(CancelReason::Marker) => {
                info!("cancel marker found");
                self.abort_handle().abort();
            }
            Some(CancelReason::SolvedMarker) => {
                debug!("solved marker found, waiting for running tasks to report");
            }
            _ => {}
        }
    }

    fn finish(
        &self,
        plan: Plan,
        context: &TaskContext,
        session: SessionRun<'_>,
        start: Instant,
    ) -> SolveReport {
        if !self.shared.decision.is_decided()
            && let Err(decision) = self.shared.decision.try_commit_exhausted()
        {
            debug!(?decision, "session decided while finishing");
        }

        let SessionRun {
            records,
            winner,
            tuning_candidates,
            running_at_decision,
            ..
        } = session;

        let (state, outcome) = match (self.shared.decision.current(), winner) {
            (Decision::Won(_), Some(winner)) => (SessionState::Succeeded, Ok(winner)),
            (Decision::Aborted, _) => {
                self.events.emit(SolveEvent::Aborted {
                    running: running_at_decision,
                });
                (SessionState::AbortedByCaller, Err(SolveFailure::Aborted))
            }
            _ => {
                let reasons: Vec<_> = records.iter().filter_map(PartitionRecord::failure).collect();
                info!(partitions = reasons.len(), "no partition produced an accepted solution");
                self.events.emit(SolveEvent::Exhausted {
                    partitions: reasons.len(),
                });
                (
                    SessionState::ExhaustedAllPartitions,
                    Err(SolveFailure::Exhausted { reasons }),
                )
            }
        };
        self.set_state(state);

        let extraction = context.extraction.get();
        let annotated_stars = match (&outcome, &extraction) {
            (Ok(winner), Some(extraction)) if self.config.compute_wcs_for_stars => {
                Some(winner.solution.annotate_stars(&extraction.stars))
            }
            _ => None,
        };

        SolveReport {
            state,
            outcome,
            plan: Some(plan),
            records,
            extraction,
            annotated_stars,
            tuning_candidates,
            elapsed: start.elapsed(),
        }
    }

    fn set_state(&self, state: SessionState) {
        self.shared.state.store(state.to_code(), Ordering::SeqCst);
        debug!(%state, "session state changed");
        self.events.emit(SolveEvent::SessionStateChanged { state });
    }
}

/// Per-session bookkeeping owned by the orchestrator thread.
struct SessionRun<'a> {
    records: Vec<PartitionRecord>,
    winner: Option<Winner>,
    tuning_candidates: Vec<(usize, f64)>,
    running_at_decision: usize,
    arbiter: ResultArbiter,
    shared: &'a SessionShared,
    events: &'a dyn EventSink,
}

impl<'a> SessionRun<'a> {
    fn new(
        plan: &Plan,
        arbiter: ResultArbiter,
        shared: &'a SessionShared,
        events: &'a dyn EventSink,
    ) -> Self {
        Self {
            records: plan
                .partitions
                .iter()
                .copied()
                .map(PartitionRecord::new)
                .collect(),
            winner: None,
            tuning_candidates: Vec::new(),
            running_at_decision: 0,
            arbiter,
            shared,
            events,
        }
    }

    fn started(&mut self, partition: &Partition) {
        if let Some(record) = self.records.get_mut(partition.index) {
            record.started = true;
        }
        debug!(
            partition = partition.index,
            low = partition.scale.low,
            high = partition.scale.high,
            depth_low = partition.depth.low,
            depth_high = partition.depth.high,
            "starting solve task"
        );
        self.events.emit(SolveEvent::PartitionStarted {
            index: partition.index,
            partition: *partition,
        });
    }

    fn handle(&mut self, message: TaskMessage) {
        match message {
            TaskMessage::Transition { index, state } => {
                if let Some(record) = self.records.get_mut(index) {
                    record.state = state;
                }
                self.events
                    .emit(SolveEvent::PartitionStateChanged { index, state });
            }
            TaskMessage::Finished {
                index,
                outcome,
                elapsed,
            } => self.finished(index, outcome, elapsed),
        }
    }

    fn finished(&mut self, index: usize, outcome: TaskOutcome, elapsed: Duration) {
        let Some(partition) = self.records.get(index).map(|r| r.partition) else {
            warn!(partition = index, "result for unknown partition ignored");
            return;
        };
        let late = self.shared.decision.is_decided();
        debug!(partition = index, state = ?outcome.state(), late, "solve task finished");

        let outcome = match outcome {
            TaskOutcome::Solved { solution, log_odds } if !late => {
                self.arbitrate(partition, solution, log_odds)
            }
            TaskOutcome::Solved { solution, log_odds } => {
                debug!(partition = index, log_odds, "discarding solution after session was decided");
                TaskOutcome::Solved { solution, log_odds }
            }
            other => other,
        };
        self.events.emit(SolveEvent::finished(
            index,
            &outcome,
            elapsed.as_millis() as u64,
        ));

        if let Some(record) = self.records.get_mut(index) {
            record.state = outcome.state();
            record.elapsed = Some(elapsed);
            record.late = late;
            record.outcome = Some(outcome);
        }
    }

    fn arbitrate(&mut self, partition: Partition, solution: Solution, log_odds: f64) -> TaskOutcome {
        let index = partition.index;
        match self.arbiter.judge(log_odds) {
            Verdict::Accepted => match self.shared.decision.try_commit_winner(index) {
                Ok(()) => {
                    self.shared.cancel.cancel(CancelReason::SiblingSolved);
                    info!(
                        partition = index,
                        log_odds,
                        ra = solution.ra,
                        dec = solution.dec,
                        "winner committed"
                    );
                    self.events
                        .emit(SolveEvent::WinnerSelected { index, log_odds });
                    self.winner = Some(Winner {
                        index,
                        partition,
                        solution: solution.clone(),
                        log_odds,
                    });
                    TaskOutcome::Solved { solution, log_odds }
                }
                Err(Decision::Won(committed)) => {
                    let violation = InvariantViolation {
                        committed,
                        attempted: index,
                    };
                    error!(%violation, "second winner rejected");
                    TaskOutcome::Solved { solution, log_odds }
                }
                Err(decision) => {
                    debug!(partition = index, ?decision, "discarding solution, session already decided");
                    TaskOutcome::Solved { solution, log_odds }
                }
            },
            verdict => {
                let tuning_candidate = verdict == Verdict::TuningCandidate;
                if tuning_candidate {
                    info!(partition = index, log_odds, "near miss, tuning candidate");
                    self.tuning_candidates.push((index, log_odds));
                    self.events.emit(SolveEvent::NearMiss { index, log_odds });
                } else {
                    debug!(partition = index, log_odds, "match below acceptance threshold");
                }
                TaskOutcome::NotSolved(NotSolvedReason::BelowThreshold {
                    log_odds,
                    tuning_candidate,
                    kept: self.arbiter.is_kept(log_odds),
                })
            }
        }
    }
}
