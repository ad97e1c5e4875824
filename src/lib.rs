//! skysolve - parallel plate-solve orchestration.
//!
//! Splits a plate-solve attempt across scale or depth partitions, runs the
//! partitions concurrently against pluggable extraction and solve
//! operations, and commits the first solution that clears the log-odds
//! acceptance threshold.
//!
//! Star extraction and astrometric matching are supplied by the caller
//! through the [`Extractor`] and [`PlateSolver`] traits.

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod hints;
pub mod image;
pub mod logging;
pub mod solve;
pub mod wcs;

pub use config::{
    ExtractionParameters, LogOddsThresholds, MultiAlgo, Parameters, SearchParity, Shape,
    SolveParameters,
};
pub use engine::{Extraction, Extractor, PlateSolver, SharedExtraction, SolveRequest, SolverOutcome};
pub use error::{ExtractionError, InvariantViolation, LoggingError, SolveExecutionError};
pub use filter::StarFilter;
pub use hints::{PositionHint, ScaleHint, ScaleUnits};
pub use image::{Background, Image, ImageStatistics, PixelPoint, SkyPoint, Star};
pub use logging::{LogLevel, init_logging};
pub use solve::{
    CancelToken, Orchestrator, OrchestratorConfig, SessionHandle, SessionState, SolveEvent,
    SolveFailure, SolveReport,
};
pub use wcs::{Parity, Solution, TanWcs};
