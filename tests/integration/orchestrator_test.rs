mod support;

use skysolve::solve::{
    PartitionError, SessionState, SolveEvent, Strategy, TaskOutcome, TaskState,
};
use skysolve::solve::{CancelReason, NotSolvedReason};
use skysolve::{
    ExtractionError, MultiAlgo, Orchestrator, OrchestratorConfig, Parameters, ScaleHint,
    ScaleUnits, SolveExecutionError, SolveFailure,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use support::{FixedExtractor, ScriptedSolver, Step, image, solution};

const ACCEPTED: f64 = 25.0;

fn params(algo: MultiAlgo) -> Parameters {
    Parameters::default().with_multi_algorithm(algo)
}

fn config(workers: usize, temp_dir: &Path) -> OrchestratorConfig {
    OrchestratorConfig::default()
        .with_workers(workers)
        .with_temp_dir(temp_dir)
        .with_base_name("field")
        .with_poll_interval(Duration::from_millis(10))
}

fn orchestrator(
    extractor: &Arc<FixedExtractor>,
    solver: &Arc<ScriptedSolver>,
    config: OrchestratorConfig,
) -> Orchestrator {
    Orchestrator::new(extractor.clone(), solver.clone()).with_config(config)
}

fn solve_after(ms: u64) -> Step {
    Step::Solve {
        after: Duration::from_millis(ms),
        log_odds: ACCEPTED,
    }
}

fn not_solve_after(ms: u64) -> Step {
    Step::NotSolve {
        after: Duration::from_millis(ms),
    }
}

#[test]
fn test_single_partition_succeeds() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));

    let report = orchestrator(&extractor, &solver, config(4, tmp.path())).run(
        image(),
        &params(MultiAlgo::None),
        None,
        None,
    );

    assert_eq!(report.state, SessionState::Succeeded);
    assert_eq!(report.plan.as_ref().unwrap().strategy, Strategy::Single);
    let winner = report.winner().unwrap();
    assert_eq!(winner.index, 0);
    assert_eq!(winner.log_odds, ACCEPTED);
    assert_eq!(winner.solution, solution());
    assert_eq!(solver.calls().len(), 1);
    assert_eq!(solver.calls()[0].stars, 40);
}

#[test]
fn test_solve_returns_solution() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));

    let result = orchestrator(&extractor, &solver, config(1, tmp.path())).solve(
        image(),
        &params(MultiAlgo::Auto),
        None,
        None,
    );

    let found = result.unwrap();
    assert!((found.ra - 83.82).abs() < 0.05);
    assert!((found.dec + 5.39).abs() < 0.05);
}

#[test]
fn test_by_scale_winner_cancels_siblings() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(
        ScriptedSolver::new(Step::WaitForStop)
            .with(0, not_solve_after(10))
            .with(1, solve_after(60)),
    );

    let report = orchestrator(&extractor, &solver, config(3, tmp.path())).run(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );

    assert_eq!(report.state, SessionState::Succeeded);
    assert_eq!(report.plan.as_ref().unwrap().strategy, Strategy::ByScale);
    assert_eq!(report.records.len(), 3);
    assert_eq!(report.winner().unwrap().index, 1);

    assert!(matches!(
        report.records[0].outcome,
        Some(TaskOutcome::NotSolved(NotSolvedReason::NoMatch))
    ));
    assert!(matches!(report.records[2].outcome, Some(TaskOutcome::Aborted)));

    let loser = solver.call(2).unwrap();
    assert_eq!(loser.stopped_by, Some(CancelReason::SiblingSolved));
    assert!(loser.saw_solved_marker);
}

#[test]
fn test_partitions_search_their_own_scale_range() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(not_solve_after(0)));

    let report = orchestrator(&extractor, &solver, config(3, tmp.path())).run(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );

    let plan = report.plan.unwrap();
    let calls = solver.calls();
    assert_eq!(calls.len(), 3);
    for (call, partition) in calls.iter().zip(&plan.partitions) {
        assert_eq!(call.request.scale, partition.scale);
        assert_eq!(call.request.depth, partition.depth);
    }
    assert_eq!(calls[0].request.scale.low, 0.1);
    assert_eq!(calls[2].request.scale.high, 180.0);
}

#[test]
fn test_all_not_solved_exhausts_with_reasons() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(not_solve_after(10)));

    let result = orchestrator(&extractor, &solver, config(3, tmp.path())).solve(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );

    match result {
        Err(SolveFailure::Exhausted { reasons }) => {
            assert_eq!(reasons.len(), 3);
            for (i, failure) in reasons.iter().enumerate() {
                assert_eq!(failure.index, i);
                assert_eq!(
                    failure.error,
                    PartitionError::NotSolved(NotSolvedReason::NoMatch)
                );
            }
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[test]
fn test_abort_while_running_discards_late_solution() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(
        ScriptedSolver::new(Step::WaitForStop)
            .with(0, not_solve_after(0))
            .with(1, not_solve_after(0))
            .with(
                3,
                Step::SolveIgnoringCancel {
                    after: Duration::from_millis(300),
                    log_odds: ACCEPTED,
                },
            ),
    );

    let orchestrator = orchestrator(&extractor, &solver, config(4, tmp.path()));
    let handle = orchestrator.abort_handle();
    let aborter = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(120));
        let first = handle.abort();
        let second = handle.abort();
        (first, second, handle)
    });

    let report = orchestrator.run(image(), &params(MultiAlgo::ByScale), None, None);
    let (first, second, handle) = aborter.join().unwrap();

    assert!(first);
    assert!(!second);
    assert_eq!(report.state, SessionState::AbortedByCaller);
    assert_eq!(handle.state(), SessionState::AbortedByCaller);
    assert!(matches!(report.outcome, Err(SolveFailure::Aborted)));
    assert!(report.winner().is_none());

    // Partition 3 reported a solution during teardown; it was recorded and ignored
    let late = &report.records[3];
    assert!(late.late);
    assert!(matches!(late.outcome, Some(TaskOutcome::Solved { .. })));

    assert_eq!(
        solver.call(2).unwrap().stopped_by,
        Some(CancelReason::CallerAbort)
    );
}

#[test]
fn test_racing_solutions_commit_exactly_one_winner() {
    for _ in 0..10 {
        let tmp = tempfile::tempdir().unwrap();
        let extractor = Arc::new(FixedExtractor::new(40));
        let solver = Arc::new(ScriptedSolver::new(solve_after(20)));
        let (tx, rx) = crossbeam_channel::unbounded::<SolveEvent>();

        let report = orchestrator(&extractor, &solver, config(4, tmp.path()))
            .with_event_sink(tx)
            .run(image(), &params(MultiAlgo::ByScale), None, None);

        assert_eq!(report.state, SessionState::Succeeded);
        let winner = report.winner().unwrap().index;
        assert!(winner < 4);

        let winners: Vec<usize> = rx
            .try_iter()
            .filter_map(|event| match event {
                SolveEvent::WinnerSelected { index, .. } => Some(index),
                _ => None,
            })
            .collect();
        assert_eq!(winners, vec![winner]);

        // Every other partition either lost the race or was cancelled
        for record in report.records.iter().filter(|r| r.index() != winner) {
            match &record.outcome {
                Some(TaskOutcome::Solved { .. }) => assert!(record.late),
                Some(TaskOutcome::Aborted) => {}
                other => panic!("unexpected outcome {:?}", other),
            }
        }
    }
}

#[test]
fn test_abort_before_solve_never_runs_solver() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));

    let orchestrator = orchestrator(&extractor, &solver, config(2, tmp.path()));
    assert!(orchestrator.abort());
    assert!(!orchestrator.abort());

    let result = orchestrator.solve(image(), &params(MultiAlgo::ByScale), None, None);
    assert!(matches!(result, Err(SolveFailure::Aborted)));
    assert!(solver.calls().is_empty());
    assert_eq!(extractor.calls(), 0);
}

#[test]
fn test_abort_after_completion_has_no_effect() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));

    let orchestrator = orchestrator(&extractor, &solver, config(1, tmp.path()));
    let handle = orchestrator.abort_handle();
    let report = orchestrator.run(image(), &params(MultiAlgo::None), None, None);

    assert_eq!(report.state, SessionState::Succeeded);
    assert!(!handle.abort());
    assert!(!handle.abort());
    assert!(!handle.is_aborted());
    assert_eq!(handle.state(), SessionState::Succeeded);
}

#[test]
fn test_timeout_does_not_cancel_siblings() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(
        ScriptedSolver::new(not_solve_after(120)).with(0, Step::WaitForStop),
    );
    let params = params(MultiAlgo::ByScale).with_time_limit(Duration::from_millis(150));

    let report =
        orchestrator(&extractor, &solver, config(3, tmp.path())).run(image(), &params, None, None);

    assert_eq!(report.state, SessionState::ExhaustedAllPartitions);
    assert!(matches!(
        report.records[0].outcome,
        Some(TaskOutcome::NotSolved(NotSolvedReason::Timeout))
    ));
    assert!(solver.call(0).unwrap().expired);

    for index in [1, 2] {
        assert!(matches!(
            report.records[index].outcome,
            Some(TaskOutcome::NotSolved(NotSolvedReason::NoMatch))
        ));
        let call = solver.call(index).unwrap();
        assert_eq!(call.stopped_by, None);
    }
}

#[test]
fn test_solver_failure_is_isolated() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(
        ScriptedSolver::new(not_solve_after(0))
            .with(0, Step::Fail)
            .with(1, Step::Panic)
            .with(2, solve_after(80)),
    );

    let report = orchestrator(&extractor, &solver, config(3, tmp.path())).run(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );

    assert_eq!(report.state, SessionState::Succeeded);
    assert_eq!(report.winner().unwrap().index, 2);
    assert!(matches!(
        report.records[0].outcome,
        Some(TaskOutcome::Failed(SolveExecutionError::MissingIndex(_)))
    ));
    assert!(matches!(
        report.records[1].outcome,
        Some(TaskOutcome::Failed(SolveExecutionError::TaskPanicked))
    ));
}

#[test]
fn test_near_miss_is_tuning_candidate() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(Step::Solve {
        after: Duration::ZERO,
        log_odds: 18.0,
    }));
    let (tx, rx) = crossbeam_channel::unbounded::<SolveEvent>();

    let report = orchestrator(&extractor, &solver, config(1, tmp.path()))
        .with_event_sink(tx)
        .run(image(), &params(MultiAlgo::None), None, None);

    assert_eq!(report.state, SessionState::ExhaustedAllPartitions);
    assert_eq!(report.tuning_candidates, vec![(0, 18.0)]);
    assert!(matches!(
        report.records[0].outcome,
        Some(TaskOutcome::NotSolved(NotSolvedReason::BelowThreshold {
            tuning_candidate: true,
            kept: false,
            ..
        }))
    ));
    let events: Vec<SolveEvent> = rx.try_iter().collect();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SolveEvent::NearMiss { index: 0, .. }))
    );
    let finished: Vec<&SolveEvent> = events
        .iter()
        .filter(|e| matches!(e, SolveEvent::PartitionFinished { .. }))
        .collect();
    assert_eq!(finished.len(), 1);
    assert!(matches!(
        finished[0],
        SolveEvent::PartitionFinished {
            index: 0,
            state: TaskState::NotSolved,
            ..
        }
    ));
}

#[test]
fn test_extraction_runs_once_per_image() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(not_solve_after(5)));

    let report = orchestrator(&extractor, &solver, config(4, tmp.path())).run(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );

    assert_eq!(solver.calls().len(), 4);
    assert_eq!(extractor.calls(), 1);
    assert_eq!(report.extraction.unwrap().stars.len(), 40);
}

#[test]
fn test_extraction_failure_exhausts_every_partition() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(0));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));

    let result = orchestrator(&extractor, &solver, config(3, tmp.path())).solve(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );

    let failure = result.unwrap_err();
    assert_eq!(failure.reasons().len(), 3);
    for reason in failure.reasons() {
        assert_eq!(
            reason.error,
            PartitionError::NotSolved(NotSolvedReason::Extraction(ExtractionError::NoStars))
        );
    }
    assert_eq!(extractor.calls(), 1);
    assert!(solver.calls().is_empty());
}

#[test]
fn test_preloaded_star_list_skips_extraction() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));
    let stars = (0..12)
        .map(|i| skysolve::Star::at(i as f64, i as f64, i as f64))
        .collect();

    let report = orchestrator(&extractor, &solver, config(1, tmp.path()))
        .with_star_list(stars, skysolve::Background::default())
        .run(image(), &params(MultiAlgo::None), None, None);

    assert!(report.is_solved());
    assert_eq!(extractor.calls(), 0);
    assert_eq!(solver.calls()[0].stars, 12);
}

#[test]
fn test_extract_only_is_reused_by_solve() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));
    let params = params(MultiAlgo::None);

    let orchestrator = orchestrator(&extractor, &solver, config(1, tmp.path()));
    let extraction = orchestrator.extract(&image(), &params).unwrap();
    assert_eq!(extraction.stars.len(), 40);
    assert_eq!(extraction.background.num_stars_detected, 40);

    let report = orchestrator.run(image(), &params, None, None);
    assert!(report.is_solved());
    assert_eq!(extractor.calls(), 1);
}

#[test]
fn test_compute_wcs_for_stars_after_success() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));

    let report = orchestrator(
        &extractor,
        &solver,
        config(1, tmp.path()).with_compute_wcs_for_stars(true),
    )
    .run(image(), &params(MultiAlgo::None), None, None);

    let annotated = report.annotated_stars.as_ref().unwrap();
    assert_eq!(annotated.len(), 40);
    assert!(annotated.iter().all(|s| s.ra.is_some() && s.dec.is_some()));

    // The shared extraction is left untouched
    let extraction = report.extraction.as_ref().unwrap();
    assert!(extraction.stars.iter().all(|s| s.ra.is_none()));
}

#[test]
fn test_no_star_coordinates_without_request() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));

    let report = orchestrator(&extractor, &solver, config(1, tmp.path())).run(
        image(),
        &params(MultiAlgo::None),
        None,
        None,
    );
    assert!(report.annotated_stars.is_none());
}

#[test]
fn test_narrow_scale_hint_splits_by_depth() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(not_solve_after(0)));
    let hint = ScaleHint::new(1.0, 1.2, ScaleUnits::DegWidth);

    let report = orchestrator(&extractor, &solver, config(4, tmp.path())).run(
        image(),
        &params(MultiAlgo::Auto),
        Some(hint),
        None,
    );

    assert_eq!(report.plan.unwrap().strategy, Strategy::ByDepth);
    let calls = solver.calls();
    assert_eq!(calls.len(), 4);
    for pair in calls.windows(2) {
        assert_eq!(pair[1].request.depth.low, pair[0].request.depth.high + 1);
    }
    for call in &calls {
        assert_eq!(call.request.scale.low, 1.0);
        assert_eq!(call.request.scale.high, 1.2);
    }
}

#[test]
fn test_external_cancel_marker_aborts_session() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(Step::WaitForStop).with(
        0,
        Step::TouchCancelMarker {
            after: Duration::from_millis(30),
        },
    ));

    let report = orchestrator(&extractor, &solver, config(3, tmp.path())).run(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );

    assert_eq!(report.state, SessionState::AbortedByCaller);
    for index in [1, 2] {
        assert!(solver.call(index).unwrap().stopped_by.is_some());
    }
}

#[test]
fn test_solver_writing_solved_marker_still_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(Step::WaitForStop).with(
        0,
        Step::SolveAfterSolvedMarker {
            after: Duration::from_millis(60),
            log_odds: ACCEPTED,
        },
    ));

    let report = orchestrator(&extractor, &solver, config(2, tmp.path())).run(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );

    assert_eq!(report.state, SessionState::Succeeded);
    assert_eq!(report.winner().unwrap().index, 0);
    assert!(matches!(
        report.records[0].outcome,
        Some(TaskOutcome::Solved { .. })
    ));
    assert!(!report.records[0].late);
    assert!(matches!(report.records[1].outcome, Some(TaskOutcome::Aborted)));
    if let Some(call) = solver.call(1) {
        assert_eq!(call.stopped_by, Some(CancelReason::SolvedMarker));
    }
}

#[test]
fn test_solved_marker_from_outside_stops_tasks_without_abort() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(Step::WaitForStop));

    let root = tmp.path().to_path_buf();
    let writer = std::thread::spawn(move || {
        let start = std::time::Instant::now();
        while start.elapsed() < Duration::from_secs(5) {
            let session_dir = std::fs::read_dir(&root)
                .unwrap()
                .filter_map(Result::ok)
                .map(|entry| entry.path())
                .find(|path| path.is_dir());
            if let Some(dir) = session_dir {
                std::thread::sleep(Duration::from_millis(40));
                std::fs::write(dir.join("field.solved"), b"").unwrap();
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    });

    let report = orchestrator(&extractor, &solver, config(3, tmp.path())).run(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );
    assert!(writer.join().unwrap());

    assert_eq!(report.state, SessionState::ExhaustedAllPartitions);
    assert!(report.records.iter().all(|r| matches!(r.outcome, Some(TaskOutcome::Aborted))));
    for call in solver.calls() {
        assert_eq!(call.stopped_by, Some(CancelReason::SolvedMarker));
    }
}

#[test]
fn test_scratch_space_removed_after_session() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(not_solve_after(0)).with(1, solve_after(20)));

    let report = orchestrator(&extractor, &solver, config(3, tmp.path())).run(
        image(),
        &params(MultiAlgo::ByScale),
        None,
        None,
    );
    assert!(report.is_solved());

    for call in solver.calls() {
        let scratch = call.request.scratch_dir.unwrap();
        assert!(scratch.starts_with(tmp.path()));
        assert!(
            scratch
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("field_")
        );
        assert!(!scratch.exists());
    }
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn test_unresponsive_task_is_detached_after_grace() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(
        ScriptedSolver::new(solve_after(10)).with(
            1,
            Step::SolveIgnoringCancel {
                after: Duration::from_millis(800),
                log_odds: ACCEPTED,
            },
        ),
    );

    let report = orchestrator(
        &extractor,
        &solver,
        config(2, tmp.path()).with_teardown_grace(Duration::from_millis(50)),
    )
    .run(image(), &params(MultiAlgo::ByScale), None, None);

    assert_eq!(report.state, SessionState::Succeeded);
    assert_eq!(report.winner().unwrap().index, 0);
    assert_eq!(report.detached(), 1);
    assert_eq!(
        report.records[1].failure().unwrap().error,
        PartitionError::Detached
    );
    assert!(report.elapsed < Duration::from_millis(700));
}

#[test]
fn test_event_stream_shape() {
    let tmp = tempfile::tempdir().unwrap();
    let extractor = Arc::new(FixedExtractor::new(40));
    let solver = Arc::new(ScriptedSolver::new(solve_after(0)));
    let (tx, rx) = crossbeam_channel::unbounded::<SolveEvent>();

    orchestrator(&extractor, &solver, config(1, tmp.path()))
        .with_event_sink(tx)
        .run(image(), &params(MultiAlgo::None), None, None);

    let events: Vec<SolveEvent> = rx.try_iter().collect();
    assert!(matches!(
        events.first(),
        Some(SolveEvent::SessionStateChanged {
            state: SessionState::Planning
        })
    ));
    assert!(events.iter().any(|e| matches!(e, SolveEvent::PlanReady { degree: 1, .. })));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SolveEvent::PartitionStarted { index: 0, .. }))
    );
    assert!(events.iter().any(|e| matches!(
        e,
        SolveEvent::PartitionStateChanged {
            index: 0,
            state: TaskState::Solving
        }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        SolveEvent::PartitionFinished {
            index: 0,
            state: TaskState::Solved,
            ..
        }
    )));
    assert!(matches!(
        events.last(),
        Some(SolveEvent::SessionStateChanged {
            state: SessionState::Succeeded
        })
    ));
}
