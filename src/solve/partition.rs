//! Splitting the scale/depth search space into partitions.
//!
//! Scale is split in log space because field widths span several orders of
//! magnitude; each scale partition reaches slightly into its neighbours so a
//! solution sitting on a boundary is found by at least one side. Depth is
//! split into disjoint contiguous star-count ranges.

use crate::config::MultiAlgo;
use crate::solve::config::PartitionConfig;
use serde::{Deserialize, Serialize};

/// Field-width range in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub low: f64,
    pub high: f64,
}

impl ScaleRange {
    /// Create a range, ordering the bounds.
    pub fn new(a: f64, b: f64) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// Ratio of the upper to the lower bound.
    pub fn ratio(&self) -> f64 {
        self.high / self.low
    }

    /// Whether the range can be split in log space.
    fn is_splittable(&self) -> bool {
        self.low > 0.0 && self.high > self.low && self.low.is_finite() && self.high.is_finite()
    }
}

/// Inclusive, 1-based range of brightest stars to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthRange {
    pub low: u32,
    pub high: u32,
}

impl DepthRange {
    pub fn new(a: u32, b: u32) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            low: low.max(1),
            high: high.max(1),
        }
    }

    /// Number of star counts covered.
    pub fn span(&self) -> u32 {
        self.high.saturating_sub(self.low) + 1
    }
}

/// Resolved partitioning strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    Single,
    ByScale,
    ByDepth,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Single => write!(f, "single"),
            Strategy::ByScale => write!(f, "by-scale"),
            Strategy::ByDepth => write!(f, "by-depth"),
        }
    }
}

/// One slice of the search space, consumed by exactly one solve task.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    pub index: usize,
    pub scale: ScaleRange,
    pub depth: DepthRange,
}

/// Output of the partitioner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub strategy: Strategy,
    pub partitions: Vec<Partition>,
    /// Recommended number of concurrent tasks, always >= 1.
    pub degree: usize,
    /// Scale range the partitions cover.
    pub scale: ScaleRange,
    /// Depth range the partitions cover.
    pub depth: DepthRange,
}

impl Plan {
    fn single(scale: ScaleRange, depth: DepthRange) -> Self {
        Self {
            strategy: Strategy::Single,
            partitions: vec![Partition {
                index: 0,
                scale,
                depth,
            }],
            degree: 1,
            scale,
            depth,
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.degree > 1
    }
}

/// Pure planner turning bounds and a strategy selector into partitions.
#[derive(Debug, Clone, Default)]
pub struct Partitioner {
    config: PartitionConfig,
}

impl Partitioner {
    pub fn new(config: PartitionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Produce a plan for the given bounds.
    ///
    /// A scale hint replaces `global_scale` as the range to search. A narrow
    /// hint disables scale splitting and steers `Auto` towards depth
    /// splitting. Plans that would have a single partition always come back
    /// as [`Strategy::Single`].
    pub fn plan(
        &self,
        global_scale: ScaleRange,
        global_depth: DepthRange,
        scale_hint: Option<ScaleRange>,
        algo: MultiAlgo,
        hardware_concurrency: usize,
    ) -> Plan {
        let scale = scale_hint.unwrap_or(global_scale);
        let narrow = scale_hint.is_some_and(|h| h.ratio() <= self.config.narrow_scale_ratio);
        let n = hardware_concurrency.min(self.config.max_partitions).max(1);

        let strategy = match algo {
            MultiAlgo::None => Strategy::Single,
            MultiAlgo::ByScale if narrow => Strategy::Single,
            MultiAlgo::ByScale => Strategy::ByScale,
            MultiAlgo::ByDepth => Strategy::ByDepth,
            MultiAlgo::Auto if narrow => Strategy::ByDepth,
            MultiAlgo::Auto => Strategy::ByScale,
        };

        let slices: Vec<(ScaleRange, DepthRange)> = match strategy {
            Strategy::Single => vec![(scale, global_depth)],
            Strategy::ByScale => self
                .split_scale(scale, n)
                .into_iter()
                .map(|s| (s, global_depth))
                .collect(),
            Strategy::ByDepth => self
                .split_depth(global_depth, n)
                .into_iter()
                .map(|d| (scale, d))
                .collect(),
        };

        if slices.len() <= 1 {
            return Plan::single(scale, global_depth);
        }

        let partitions: Vec<Partition> = slices
            .into_iter()
            .enumerate()
            .map(|(index, (scale, depth))| Partition {
                index,
                scale,
                depth,
            })
            .collect();

        Plan {
            strategy,
            degree: partitions.len(),
            partitions,
            scale,
            depth: global_depth,
        }
    }

    fn split_scale(&self, range: ScaleRange, n: usize) -> Vec<ScaleRange> {
        if n <= 1 || !range.is_splittable() {
            return vec![range];
        }

        let log_lo = range.low.ln();
        let log_hi = range.high.ln();
        let width = log_hi - log_lo;
        let min_width = self.config.min_scale_ratio.ln();

        // Merge rather than produce degenerate slivers
        let mut k = n;
        while k > 1 && width / (k as f64) < min_width {
            k -= 1;
        }
        if k <= 1 {
            return vec![range];
        }

        let step = width / k as f64;
        let margin = step * self.config.overlap;
        let bounds: Vec<f64> = (0..=k)
            .map(|j| if j == k { log_hi } else { log_lo + step * j as f64 })
            .collect();

        (0..k)
            .map(|i| {
                let low = if i == 0 {
                    range.low
                } else {
                    (bounds[i] - margin).max(log_lo).exp()
                };
                let high = if i == k - 1 {
                    range.high
                } else {
                    (bounds[i + 1] + margin).min(log_hi).exp()
                };
                ScaleRange { low, high }
            })
            .collect()
    }

    fn split_depth(&self, range: DepthRange, n: usize) -> Vec<DepthRange> {
        let n = n.min(u32::MAX as usize).max(1) as u32;
        let min_span = self.config.min_depth_span.max(1);
        let span = range.span().div_ceil(n).max(min_span);

        let mut slices = Vec::new();
        let mut low = range.low;
        loop {
            let high = low.saturating_add(span - 1).min(range.high);
            slices.push(DepthRange { low, high });
            match high.checked_add(1) {
                Some(next) if next <= range.high => low = next,
                _ => break,
            }
        }

        // Fold a short tail into its neighbour
        if slices.len() > 1
            && let Some(last) = slices.last().copied()
            && last.span() < min_span
        {
            slices.pop();
            if let Some(prev) = slices.last_mut() {
                prev.high = last.high;
            }
        }
        slices
    }
}
