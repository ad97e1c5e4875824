//! Seams to the external extraction and solve operations.
//!
//! The orchestrator never looks inside these operations. An [`Extractor`]
//! turns an image into a star list once per image; a [`PlateSolver`] runs one
//! long solve attempt restricted to a partition of the search space and must
//! poll its [`CancelToken`] while it works.

use crate::config::{ExtractionParameters, LogOddsThresholds, Parameters, SearchParity};
use crate::error::ExtractionError;
use crate::error::SolveExecutionError;
use crate::hints::PositionHint;
use crate::image::{Background, Image, Star};
use crate::solve::cancel::CancelToken;
use crate::solve::partition::{DepthRange, ScaleRange};
use crate::wcs::Solution;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

/// Source extraction collaborator.
pub trait Extractor: Send + Sync {
    /// Detect stars and estimate the background of an image.
    ///
    /// Must be deterministic and free of side effects beyond its result.
    fn extract(
        &self,
        image: &Image,
        params: &ExtractionParameters,
    ) -> Result<Extraction, ExtractionError>;
}

/// Astrometric solve collaborator.
pub trait PlateSolver: Send + Sync {
    /// Attempt to solve a star list within the request's scale/depth range.
    ///
    /// Implementations should check `cancel.should_stop()` at short intervals
    /// and return [`SolverOutcome::Interrupted`] once it is set.
    fn solve(
        &self,
        stars: &[Star],
        request: &SolveRequest,
        cancel: &CancelToken,
    ) -> Result<SolverOutcome, SolveExecutionError>;
}

/// What a solver was asked to do for one partition.
#[derive(Debug, Clone)]
pub struct SolveRequest {
    /// Ordinal of the partition issuing the request.
    pub partition: usize,
    pub scale: ScaleRange,
    pub depth: DepthRange,
    pub position: Option<PositionHint>,
    pub time_limit: Duration,
    pub log_odds: LogOddsThresholds,
    pub parity: SearchParity,
    pub in_parallel: bool,
    pub image_width: u32,
    pub image_height: u32,
    /// Private scratch directory for temporary files.
    pub scratch_dir: Option<PathBuf>,
    /// Marker whose creation means the solve must stop.
    pub cancel_marker: Option<PathBuf>,
    /// Marker whose creation means another partition already solved the field.
    pub solved_marker: Option<PathBuf>,
}

/// Raw result from a solver, before arbitration.
#[derive(Debug, Clone)]
pub enum SolverOutcome {
    /// A match was found with the given log-odds score.
    Solved { solution: Solution, log_odds: f64 },
    /// The search space was exhausted without a match.
    NotSolved,
    /// The solver stopped early because its token asked it to.
    Interrupted,
}

/// Output of source extraction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Extraction {
    pub stars: Vec<Star>,
    pub background: Background,
}

impl Extraction {
    pub fn new(stars: Vec<Star>, background: Background) -> Self {
        Self { stars, background }
    }
}

/// Extraction result computed at most once per image and shared read-only
/// by every partition of a session.
///
/// Concurrent callers of [`SharedExtraction::get_or_extract`] block until
/// the first one finishes; the extractor runs exactly once.
#[derive(Debug, Default)]
pub struct SharedExtraction {
    cell: OnceLock<Result<Arc<Extraction>, ExtractionError>>,
}

impl SharedExtraction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a star list supplied by the caller instead of running extraction.
    pub fn preloaded(extraction: Extraction) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(Ok(Arc::new(extraction)));
        Self { cell }
    }

    pub fn get_or_extract(
        &self,
        extractor: &dyn Extractor,
        image: &Image,
        params: &Parameters,
    ) -> Result<Arc<Extraction>, ExtractionError> {
        self.cell
            .get_or_init(|| run_extraction(extractor, image, params).map(Arc::new))
            .clone()
    }

    /// The extraction result, if it has been computed.
    pub fn get(&self) -> Option<Arc<Extraction>> {
        match self.cell.get() {
            Some(Ok(extraction)) => Some(Arc::clone(extraction)),
            _ => None,
        }
    }
}

/// Extract and filter stars for an image.
pub fn run_extraction(
    extractor: &dyn Extractor,
    image: &Image,
    params: &Parameters,
) -> Result<Extraction, ExtractionError> {
    if !image.is_consistent() {
        return Err(ExtractionError::InvalidImage(format!(
            "buffer holds {} samples, statistics describe {}",
            image.pixels.len(),
            image.statistics.sample_count()
        )));
    }

    let raw = extractor.extract(image, &params.extraction)?;
    let detected = raw.stars.len();
    let stars = params
        .extraction
        .filter
        .apply(raw.stars, &image.statistics, params.solve.resort);
    debug!(detected, kept = stars.len(), "extraction finished");

    if stars.is_empty() {
        return Err(ExtractionError::NoStars);
    }
    Ok(Extraction {
        stars,
        background: raw.background,
    })
}
