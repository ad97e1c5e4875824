//! Extraction and solve parameters.

use crate::filter::StarFilter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parallel solving strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MultiAlgo {
    /// Single solve attempt over the full search space.
    #[default]
    None,
    /// One attempt per sub-range of field width.
    ByScale,
    /// One attempt per range of star-count depth.
    ByDepth,
    /// Pick a strategy from the hints that are available.
    Auto,
}

impl std::fmt::Display for MultiAlgo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultiAlgo::None => write!(f, "none"),
            MultiAlgo::ByScale => write!(f, "by-scale"),
            MultiAlgo::ByDepth => write!(f, "by-depth"),
            MultiAlgo::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for MultiAlgo {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "none" | "not-multi" | "single" => Ok(MultiAlgo::None),
            "by-scale" | "scales" | "multi-scales" => Ok(MultiAlgo::ByScale),
            "by-depth" | "depths" | "multi-depths" => Ok(MultiAlgo::ByDepth),
            "auto" | "multi-auto" => Ok(MultiAlgo::Auto),
            _ => Err(format!(
                "Unknown multi algorithm: '{}'. Valid options: none, by-scale, by-depth, auto",
                s
            )),
        }
    }
}

/// Aperture shape used for flux measurement during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Shape {
    Auto,
    #[default]
    Circle,
    Ellipse,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Shape::Auto => write!(f, "auto"),
            Shape::Circle => write!(f, "circle"),
            Shape::Ellipse => write!(f, "ellipse"),
        }
    }
}

impl std::str::FromStr for Shape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Shape::Auto),
            "circle" => Ok(Shape::Circle),
            "ellipse" => Ok(Shape::Ellipse),
            _ => Err(format!(
                "Unknown aperture shape: '{}'. Valid options: auto, circle, ellipse",
                s
            )),
        }
    }
}

/// Which image parities the solver should try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchParity {
    #[default]
    Both,
    Positive,
    Negative,
}

impl std::fmt::Display for SearchParity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchParity::Both => write!(f, "both"),
            SearchParity::Positive => write!(f, "positive"),
            SearchParity::Negative => write!(f, "negative"),
        }
    }
}

impl std::str::FromStr for SearchParity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" | "any" => Ok(SearchParity::Both),
            "positive" | "pos" => Ok(SearchParity::Positive),
            "negative" | "neg" => Ok(SearchParity::Negative),
            _ => Err(format!(
                "Unknown search parity: '{}'. Valid options: both, positive, negative",
                s
            )),
        }
    }
}

/// Log-odds thresholds (natural log) applied to solver matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogOddsThresholds {
    /// Score at or above which a match counts as solved.
    pub to_solve: f64,
    /// Score at or above which the solver keeps a match as a candidate.
    pub to_keep: f64,
    /// Score at or above which a rejected match is worth re-tuning.
    pub to_tune: f64,
}

impl Default for LogOddsThresholds {
    fn default() -> Self {
        Self::from_odds(1e9, 1e9, 1e6)
    }
}

impl LogOddsThresholds {
    /// Build thresholds from plain odds ratios.
    pub fn from_odds(solve: f64, keep: f64, tune: f64) -> Self {
        Self {
            to_solve: solve.ln(),
            to_keep: keep.ln(),
            to_tune: tune.ln(),
        }
    }

    /// Whether `to_solve >= to_keep >= to_tune` holds. Not enforced.
    pub fn is_ordered(&self) -> bool {
        self.to_solve >= self.to_keep && self.to_keep >= self.to_tune
    }
}

/// Source extraction tuning, handed to the extractor untouched apart from
/// the star filter which is applied after extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionParameters {
    pub aperture_shape: Shape,
    /// Kron factor used with the kron radius for flux.
    pub kron_fact: f64,
    pub subpix: u32,
    /// Minimum radius for flux calculation.
    pub r_min: f64,
    /// Zero point of the magnitude scale.
    pub magzero: f64,
    /// Minimum detection area in pixels.
    pub minarea: f64,
    pub deblend_thresh: u32,
    pub deblend_contrast: f64,
    pub clean: bool,
    pub clean_param: f64,
    /// FWHM the convolution filter was generated for.
    pub fwhm: f64,
    pub conv_filter: Vec<f32>,
    pub auto_downsample: bool,
    pub downsample: u32,
    pub filter: StarFilter,
}

impl Default for ExtractionParameters {
    fn default() -> Self {
        Self {
            aperture_shape: Shape::Circle,
            kron_fact: 2.5,
            subpix: 5,
            r_min: 3.5,
            magzero: 20.0,
            minarea: 5.0,
            deblend_thresh: 32,
            deblend_contrast: 0.005,
            clean: true,
            clean_param: 1.0,
            fwhm: 2.0,
            conv_filter: vec![
                0.260856, 0.483068, 0.260856, 0.483068, 0.894573, 0.483068, 0.260856, 0.483068,
                0.260856,
            ],
            auto_downsample: true,
            downsample: 1,
            filter: StarFilter::default(),
        }
    }
}

impl ExtractionParameters {
    pub fn with_filter(mut self, filter: StarFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_aperture_shape(mut self, shape: Shape) -> Self {
        self.aperture_shape = shape;
        self
    }

    pub fn with_minarea(mut self, minarea: f64) -> Self {
        self.minarea = minarea;
        self
    }

    pub fn with_downsample(mut self, downsample: u32) -> Self {
        self.auto_downsample = false;
        self.downsample = downsample.max(1);
        self
    }
}

/// Solve tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveParameters {
    pub multi_algorithm: MultiAlgo,
    /// Let the solver check its indices in parallel.
    pub in_parallel: bool,
    /// Per-partition time limit.
    pub time_limit: Duration,
    /// Smallest field width in degrees searched without a scale hint.
    pub min_width: f64,
    /// Largest field width in degrees searched without a scale hint.
    pub max_width: f64,
    /// Sort stars by magnitude before filtering and solving.
    pub resort: bool,
    pub search_parity: SearchParity,
    /// Default search radius in degrees around a position hint.
    pub search_radius: f64,
    pub log_odds: LogOddsThresholds,
}

impl Default for SolveParameters {
    fn default() -> Self {
        Self {
            multi_algorithm: MultiAlgo::None,
            in_parallel: true,
            time_limit: Duration::from_secs(600),
            min_width: 0.1,
            max_width: 180.0,
            resort: true,
            search_parity: SearchParity::Both,
            search_radius: 15.0,
            log_odds: LogOddsThresholds::default(),
        }
    }
}

impl SolveParameters {
    pub fn with_multi_algorithm(mut self, algo: MultiAlgo) -> Self {
        self.multi_algorithm = algo;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn with_width_bounds(mut self, min_width: f64, max_width: f64) -> Self {
        self.min_width = min_width;
        self.max_width = max_width;
        self
    }

    pub fn with_log_odds(mut self, log_odds: LogOddsThresholds) -> Self {
        self.log_odds = log_odds;
        self
    }

    pub fn with_search_parity(mut self, parity: SearchParity) -> Self {
        self.search_parity = parity;
        self
    }

    pub fn with_search_radius(mut self, radius: f64) -> Self {
        self.search_radius = radius;
        self
    }

    pub fn with_in_parallel(mut self, in_parallel: bool) -> Self {
        self.in_parallel = in_parallel;
        self
    }
}

/// Full parameter bundle for one solve attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Name of the profile these parameters came from.
    pub name: String,
    pub extraction: ExtractionParameters,
    pub solve: SolveParameters,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            extraction: ExtractionParameters::default(),
            solve: SolveParameters::default(),
        }
    }
}

impl Parameters {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_extraction(mut self, extraction: ExtractionParameters) -> Self {
        self.extraction = extraction;
        self
    }

    pub fn with_solve(mut self, solve: SolveParameters) -> Self {
        self.solve = solve;
        self
    }

    pub fn with_multi_algorithm(mut self, algo: MultiAlgo) -> Self {
        self.solve.multi_algorithm = algo;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.solve.time_limit = limit;
        self
    }

    pub fn with_log_odds(mut self, log_odds: LogOddsThresholds) -> Self {
        self.solve.log_odds = log_odds;
        self
    }
}
