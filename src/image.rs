//! Image, star and background types shared between extraction and solving.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Summary information about an image buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStatistics {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of colour channels (1 for mono).
    pub channels: u32,
    /// Largest value the sensor/data type can represent; used as the
    /// saturation reference by star filters.
    pub data_max: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub stddev: f64,
}

impl ImageStatistics {
    /// Statistics for a mono image of the given size with 16-bit range.
    pub fn mono(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            channels: 1,
            data_max: u16::MAX as f64,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            median: 0.0,
            stddev: 0.0,
        }
    }

    pub fn with_data_max(mut self, data_max: f64) -> Self {
        self.data_max = data_max;
        self
    }

    /// Number of samples a buffer for these statistics must hold.
    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize * self.channels.max(1) as usize
    }
}

/// An image handed to the extractor.
///
/// The pixel buffer is reference counted so that a solve session can share
/// it with every partition without copying.
#[derive(Debug, Clone)]
pub struct Image {
    pub statistics: ImageStatistics,
    pub pixels: Arc<[f32]>,
}

impl Image {
    pub fn new(statistics: ImageStatistics, pixels: impl Into<Arc<[f32]>>) -> Self {
        Self {
            statistics,
            pixels: pixels.into(),
        }
    }

    /// Check that the buffer length matches the statistics.
    pub fn is_consistent(&self) -> bool {
        self.pixels.len() == self.statistics.sample_count()
    }

    pub fn width(&self) -> u32 {
        self.statistics.width
    }

    pub fn height(&self) -> u32 {
        self.statistics.height
    }
}

/// A detected star.
///
/// `ra`/`dec` are only populated once a solution has been applied to the
/// star list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Star {
    pub x: f64,
    pub y: f64,
    pub mag: f64,
    pub flux: f64,
    pub peak: f64,
    pub hfr: f64,
    /// Semi-major axis in pixels.
    pub a: f64,
    /// Semi-minor axis in pixels.
    pub b: f64,
    /// Position angle in degrees.
    pub theta: f64,
    pub ra: Option<f64>,
    pub dec: Option<f64>,
}

impl Star {
    pub fn at(x: f64, y: f64, mag: f64) -> Self {
        Self {
            x,
            y,
            mag,
            a: 1.0,
            b: 1.0,
            ..Default::default()
        }
    }

    pub fn pixel(&self) -> PixelPoint {
        PixelPoint {
            x: self.x,
            y: self.y,
        }
    }
}

/// Background levels estimated during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Background {
    /// Background mesh width in pixels.
    pub bw: u32,
    /// Background mesh height in pixels.
    pub bh: u32,
    pub global: f64,
    pub global_rms: f64,
    pub num_stars_detected: usize,
}

/// A pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

/// A celestial position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SkyPoint {
    pub ra: f64,
    pub dec: f64,
}
