//! Star list filtering applied after extraction.
//!
//! Filters run in a fixed order:
//! 1. truncate to `initial_keep`
//! 2. sort brightest first (when resorting is enabled)
//! 3. drop the brightest and dimmest percentages
//! 4. drop saturated, oversized, undersized and elongated stars
//! 5. truncate to `keep_num`
//!
//! Percentage and `keep_num` filters rely on brightness order, so they are
//! skipped when resorting is disabled.

use crate::image::{ImageStatistics, Star};
use serde::{Deserialize, Serialize};

/// Star filter settings. Zero disables a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarFilter {
    /// Maximum semi-axis in pixels.
    pub max_size: f64,
    /// Minimum semi-axis in pixels.
    pub min_size: f64,
    /// Maximum ratio of semi-major to semi-minor axis.
    pub max_ellipse: f64,
    /// Number of stars taken from the extractor before any filtering.
    pub initial_keep: usize,
    /// Number of brightest stars kept after filtering.
    pub keep_num: usize,
    /// Percentage of brightest stars removed.
    pub remove_brightest: f64,
    /// Percentage of dimmest stars removed.
    pub remove_dimmest: f64,
    /// Peak level, as a percentage of the data maximum, above which a star
    /// counts as saturated.
    pub saturation_limit: f64,
}

impl Default for StarFilter {
    fn default() -> Self {
        Self {
            max_size: 0.0,
            min_size: 0.0,
            max_ellipse: 0.0,
            initial_keep: 1_000_000,
            keep_num: 0,
            remove_brightest: 0.0,
            remove_dimmest: 0.0,
            saturation_limit: 0.0,
        }
    }
}

impl StarFilter {
    pub fn with_keep_num(mut self, keep_num: usize) -> Self {
        self.keep_num = keep_num;
        self
    }

    pub fn with_size_limits(mut self, min_size: f64, max_size: f64) -> Self {
        self.min_size = min_size;
        self.max_size = max_size;
        self
    }

    pub fn with_max_ellipse(mut self, max_ellipse: f64) -> Self {
        self.max_ellipse = max_ellipse;
        self
    }

    pub fn with_brightness_cuts(mut self, remove_brightest: f64, remove_dimmest: f64) -> Self {
        self.remove_brightest = remove_brightest;
        self.remove_dimmest = remove_dimmest;
        self
    }

    pub fn with_saturation_limit(mut self, percent: f64) -> Self {
        self.saturation_limit = percent;
        self
    }

    /// Apply the filter to an extracted star list.
    pub fn apply(&self, mut stars: Vec<Star>, statistics: &ImageStatistics, resort: bool) -> Vec<Star> {
        if self.initial_keep > 0 {
            stars.truncate(self.initial_keep);
        }

        if resort {
            stars.sort_by(|a, b| a.mag.total_cmp(&b.mag));

            let total = stars.len();
            let brightest = percent_of(total, self.remove_brightest);
            let dimmest = percent_of(total, self.remove_dimmest);
            if brightest + dimmest >= total {
                stars.clear();
            } else {
                stars.truncate(total - dimmest);
                stars.drain(..brightest);
            }
        }

        if self.saturation_limit > 0.0 {
            let ceiling = statistics.data_max * self.saturation_limit / 100.0;
            stars.retain(|s| s.peak <= ceiling);
        }
        if self.max_size > 0.0 {
            stars.retain(|s| s.a <= self.max_size && s.b <= self.max_size);
        }
        if self.min_size > 0.0 {
            stars.retain(|s| s.a >= self.min_size && s.b >= self.min_size);
        }
        if self.max_ellipse > 1.0 {
            stars.retain(|s| s.b > 0.0 && s.a / s.b <= self.max_ellipse);
        }

        if resort && self.keep_num > 0 {
            stars.truncate(self.keep_num);
        }
        stars
    }
}

fn percent_of(total: usize, percent: f64) -> usize {
    if percent <= 0.0 {
        0
    } else {
        ((total as f64) * percent / 100.0).floor() as usize
    }
}
