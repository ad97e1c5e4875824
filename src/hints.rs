//! Optional scale and position hints narrowing the solve search.

use serde::{Deserialize, Serialize};

/// Units a scale hint is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleUnits {
    /// Field width in degrees.
    #[default]
    DegWidth,
    /// Field width in arcminutes.
    ArcminWidth,
    /// Pixel scale in arcseconds per pixel.
    ArcsecPerPix,
    /// Focal length in millimetres (35mm-equivalent sensor).
    FocalMm,
}

impl std::fmt::Display for ScaleUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaleUnits::DegWidth => write!(f, "degwidth"),
            ScaleUnits::ArcminWidth => write!(f, "arcminwidth"),
            ScaleUnits::ArcsecPerPix => write!(f, "arcsecperpix"),
            ScaleUnits::FocalMm => write!(f, "focalmm"),
        }
    }
}

impl std::str::FromStr for ScaleUnits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "degwidth" | "deg" | "degrees" => Ok(ScaleUnits::DegWidth),
            "arcminwidth" | "arcmin" => Ok(ScaleUnits::ArcminWidth),
            "arcsecperpix" | "app" | "arcsec" => Ok(ScaleUnits::ArcsecPerPix),
            "focalmm" | "focal" | "mm" => Ok(ScaleUnits::FocalMm),
            _ => Err(format!(
                "Unknown scale units: '{}'. Valid options: degwidth, arcminwidth, arcsecperpix, focalmm",
                s
            )),
        }
    }
}

/// Expected image scale range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleHint {
    pub low: f64,
    pub high: f64,
    pub units: ScaleUnits,
}

impl ScaleHint {
    pub fn new(low: f64, high: f64, units: ScaleUnits) -> Self {
        Self { low, high, units }
    }

    /// Convert the hint into a field-width range in degrees, lowest first.
    ///
    /// `image_height` is needed for per-pixel units. Focal length maps
    /// inversely onto field width, so the bounds are re-sorted after
    /// conversion.
    pub fn to_degree_width(&self, image_height: u32) -> (f64, f64) {
        let a = convert_to_degree_width(self.low, self.units, image_height);
        let b = convert_to_degree_width(self.high, self.units, image_height);
        if a <= b { (a, b) } else { (b, a) }
    }
}

fn convert_to_degree_width(scale: f64, units: ScaleUnits, image_height: u32) -> f64 {
    match units {
        ScaleUnits::DegWidth => scale,
        ScaleUnits::ArcminWidth => scale / 60.0,
        ScaleUnits::ArcsecPerPix => scale / 3600.0 * image_height as f64,
        ScaleUnits::FocalMm => (36.0 / (2.0 * scale)).atan().to_degrees(),
    }
}

/// Approximate field centre and how far from it to search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionHint {
    pub ra_deg: f64,
    pub dec_deg: f64,
    /// Search radius in degrees.
    pub radius_deg: f64,
}

impl PositionHint {
    pub fn new(ra_deg: f64, dec_deg: f64, radius_deg: f64) -> Self {
        Self {
            ra_deg,
            dec_deg,
            radius_deg,
        }
    }
}
