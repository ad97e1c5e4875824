//! Configuration for orchestrated solve sessions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Tuning for how the search space is split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Hard cap on partitions per session regardless of core count.
    pub max_partitions: usize,
    /// Fraction of a scale sub-range (in log space) each partition extends
    /// into its neighbours.
    pub overlap: f64,
    /// Narrowest useful scale sub-range, as a high/low ratio.
    pub min_scale_ratio: f64,
    /// Scale hints with a high/low ratio at or below this are "narrow".
    pub narrow_scale_ratio: f64,
    /// Fewest stars a depth partition may span.
    pub min_depth_span: u32,
    /// Depth searched when the star filter does not cap the star count.
    pub default_depth: u32,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_partitions: 8,
            overlap: 0.05,
            min_scale_ratio: 1.1,
            narrow_scale_ratio: 1.5,
            min_depth_span: 10,
            default_depth: 200,
        }
    }
}

impl PartitionConfig {
    pub fn with_max_partitions(mut self, max_partitions: usize) -> Self {
        self.max_partitions = max_partitions.max(1);
        self
    }

    pub fn with_overlap(mut self, overlap: f64) -> Self {
        self.overlap = overlap.clamp(0.0, 0.5);
        self
    }

    pub fn with_min_scale_ratio(mut self, ratio: f64) -> Self {
        self.min_scale_ratio = ratio.max(1.0);
        self
    }

    pub fn with_narrow_scale_ratio(mut self, ratio: f64) -> Self {
        self.narrow_scale_ratio = ratio.max(1.0);
        self
    }

    pub fn with_min_depth_span(mut self, span: u32) -> Self {
        self.min_depth_span = span.max(1);
        self
    }

    pub fn with_default_depth(mut self, depth: u32) -> Self {
        self.default_depth = depth.max(1);
        self
    }
}

/// Configuration for the solve orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum number of partitions solving at once.
    pub max_workers: usize,
    /// How often the orchestrator checks for caller aborts while waiting.
    pub poll_interval: Duration,
    /// How long to wait for cancelled tasks to acknowledge teardown.
    pub teardown_grace: Duration,
    pub partition: PartitionConfig,
    /// Parent directory for session scratch space (system temp dir if unset).
    pub temp_dir: Option<PathBuf>,
    /// Base name for marker and scratch files.
    pub base_name: Option<String>,
    /// Write cancel/solved marker files for out-of-process solvers.
    pub marker_files: bool,
    /// Fill in RA/Dec for every extracted star once a winner is chosen.
    pub compute_wcs_for_stars: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get(),
            poll_interval: Duration::from_millis(50),
            teardown_grace: Duration::from_secs(2),
            partition: PartitionConfig::default(),
            temp_dir: None,
            base_name: None,
            marker_files: true,
            compute_wcs_for_stars: false,
        }
    }
}

impl OrchestratorConfig {
    /// Set the number of concurrently running partitions.
    pub fn with_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn with_teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    pub fn with_partition(mut self, partition: PartitionConfig) -> Self {
        self.partition = partition;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    pub fn with_base_name(mut self, name: impl Into<String>) -> Self {
        self.base_name = Some(name.into());
        self
    }

    pub fn with_marker_files(mut self, enabled: bool) -> Self {
        self.marker_files = enabled;
        self
    }

    pub fn with_compute_wcs_for_stars(mut self, enabled: bool) -> Self {
        self.compute_wcs_for_stars = enabled;
        self
    }

    /// Base name for session files, generated from the process id if unset.
    pub fn session_base_name(&self) -> String {
        self.base_name
            .clone()
            .unwrap_or_else(|| format!("solver_{}", std::process::id()))
    }
}
