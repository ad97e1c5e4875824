//! Gnomonic (TAN) world coordinate transform and the solution it backs.

use crate::image::{PixelPoint, SkyPoint, Star};
use serde::{Deserialize, Serialize};

/// Image parity of a solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    Positive,
    Negative,
}

impl std::fmt::Display for Parity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Parity::Positive => write!(f, "pos"),
            Parity::Negative => write!(f, "neg"),
        }
    }
}

/// TAN projection: reference pixel, reference sky position and the CD
/// matrix in degrees per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TanWcs {
    pub crpix: [f64; 2],
    /// Reference RA/Dec in degrees.
    pub crval: [f64; 2],
    pub cd: [[f64; 2]; 2],
}

impl TanWcs {
    pub fn new(crpix: [f64; 2], crval: [f64; 2], cd: [[f64; 2]; 2]) -> Self {
        Self { crpix, crval, cd }
    }

    /// North-up, east-left transform with the given pixel scale in
    /// arcseconds, rotated by `rotation_deg`.
    pub fn from_scale(crpix: [f64; 2], crval: [f64; 2], arcsec_per_pixel: f64, rotation_deg: f64) -> Self {
        let s = arcsec_per_pixel / 3600.0;
        let (sin_r, cos_r) = rotation_deg.to_radians().sin_cos();
        Self {
            crpix,
            crval,
            cd: [[-s * cos_r, s * sin_r], [s * sin_r, s * cos_r]],
        }
    }

    pub fn determinant(&self) -> f64 {
        self.cd[0][0] * self.cd[1][1] - self.cd[0][1] * self.cd[1][0]
    }

    /// Pixel scale in arcseconds per pixel.
    pub fn pixel_scale(&self) -> f64 {
        self.determinant().abs().sqrt() * 3600.0
    }

    pub fn parity(&self) -> Parity {
        if self.determinant() >= 0.0 {
            Parity::Negative
        } else {
            Parity::Positive
        }
    }

    /// Position angle of the image "up" axis, degrees east of north.
    pub fn orientation(&self) -> f64 {
        let parity = if self.determinant() >= 0.0 { 1.0 } else { -1.0 };
        let t = parity * self.cd[0][0] + self.cd[1][1];
        let a = parity * self.cd[1][0] - self.cd[0][1];
        -a.atan2(t).to_degrees()
    }

    /// Project a pixel onto the sky.
    pub fn pixel_to_sky(&self, pixel: PixelPoint) -> SkyPoint {
        let dx = pixel.x - self.crpix[0];
        let dy = pixel.y - self.crpix[1];
        let xi = (self.cd[0][0] * dx + self.cd[0][1] * dy).to_radians();
        let eta = (self.cd[1][0] * dx + self.cd[1][1] * dy).to_radians();

        let ra0 = self.crval[0].to_radians();
        let dec0 = self.crval[1].to_radians();
        let (sin_d0, cos_d0) = dec0.sin_cos();

        let denom = cos_d0 - eta * sin_d0;
        let ra = ra0 + xi.atan2(denom);
        let dec = (sin_d0 + eta * cos_d0).atan2((xi * xi + denom * denom).sqrt());

        SkyPoint {
            ra: ra.to_degrees().rem_euclid(360.0),
            dec: dec.to_degrees(),
        }
    }

    /// Project a sky position into pixel space.
    ///
    /// Returns `None` for points on the far side of the tangent plane or when
    /// the CD matrix is singular.
    pub fn sky_to_pixel(&self, sky: SkyPoint) -> Option<PixelPoint> {
        let ra = sky.ra.to_radians();
        let dec = sky.dec.to_radians();
        let ra0 = self.crval[0].to_radians();
        let dec0 = self.crval[1].to_radians();
        let (sin_d, cos_d) = dec.sin_cos();
        let (sin_d0, cos_d0) = dec0.sin_cos();
        let (sin_da, cos_da) = (ra - ra0).sin_cos();

        let denom = sin_d * sin_d0 + cos_d * cos_d0 * cos_da;
        if denom <= 0.0 {
            return None;
        }
        let xi = (cos_d * sin_da / denom).to_degrees();
        let eta = ((sin_d * cos_d0 - cos_d * sin_d0 * cos_da) / denom).to_degrees();

        let det = self.determinant();
        if det == 0.0 {
            return None;
        }
        let dx = (self.cd[1][1] * xi - self.cd[0][1] * eta) / det;
        let dy = (-self.cd[1][0] * xi + self.cd[0][0] * eta) / det;
        Some(PixelPoint {
            x: dx + self.crpix[0],
            y: dy + self.crpix[1],
        })
    }
}

/// An accepted astrometric solution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Field width in arcminutes.
    pub field_width: f64,
    /// Field height in arcminutes.
    pub field_height: f64,
    /// Field centre RA in degrees.
    pub ra: f64,
    /// Field centre Dec in degrees.
    pub dec: f64,
    /// Degrees east of north.
    pub orientation: f64,
    /// Arcseconds per pixel.
    pub pixscale: f64,
    pub parity: Parity,
    /// RA error in arcseconds, when the solver reports one.
    pub ra_error: f64,
    /// Dec error in arcseconds, when the solver reports one.
    pub dec_error: f64,
    pub wcs: TanWcs,
}

impl Solution {
    /// Derive the summary fields from a transform for an image of the given
    /// size in pixels.
    pub fn from_wcs(wcs: TanWcs, width: u32, height: u32) -> Self {
        let centre = wcs.pixel_to_sky(PixelPoint {
            x: width as f64 / 2.0,
            y: height as f64 / 2.0,
        });
        let pixscale = wcs.pixel_scale();
        Self {
            field_width: width as f64 * pixscale / 60.0,
            field_height: height as f64 * pixscale / 60.0,
            ra: centre.ra,
            dec: centre.dec,
            orientation: wcs.orientation(),
            pixscale,
            parity: wcs.parity(),
            ra_error: 0.0,
            dec_error: 0.0,
            wcs,
        }
    }

    pub fn pixel_to_sky(&self, pixel: PixelPoint) -> SkyPoint {
        self.wcs.pixel_to_sky(pixel)
    }

    pub fn sky_to_pixel(&self, sky: SkyPoint) -> Option<PixelPoint> {
        self.wcs.sky_to_pixel(sky)
    }

    /// Copy a star list with celestial coordinates filled in.
    pub fn annotate_stars(&self, stars: &[Star]) -> Vec<Star> {
        stars
            .iter()
            .map(|star| {
                let sky = self.pixel_to_sky(star.pixel());
                Star {
                    ra: Some(sky.ra),
                    dec: Some(sky.dec),
                    ..star.clone()
                }
            })
            .collect()
    }
}
