//! Dominant light direction from the spread of surface normals.
//!
//! The horizontal parts of the normals over the relevant cells are centred and
//! reduced to their principal axis. Light is placed one standard deviation
//! along that axis from the mean, always arriving from the `-x` side, at a
//! fixed elevation of 60 degrees.

use common::Grid;
use glam::{DVec2, DVec3, Vec3};
use tracing::debug;

use crate::error::{DegenerateInputError, Result};
use crate::normals::NormalField;

/// Cells whose companion density is at or below this are background and do
/// not vote on the light direction.
pub const RELEVANCE_THRESHOLD: f32 = 1e-4;

/// Light elevation above the horizontal plane.
pub const ELEVATION: f64 = std::f64::consts::FRAC_PI_3;

/// Azimuth used when the normals carry no directional information.
const FALLBACK_AZIMUTH: DVec2 = DVec2::NEG_X;

const EIGEN_EPSILON: f64 = 1e-12;

/// Unit light direction, `z = sin(60 deg)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightVector(DVec3);

impl LightVector {
    /// Light from `azimuth` (any non-zero horizontal vector) at the fixed
    /// elevation.
    pub fn from_azimuth(azimuth: DVec2) -> Self {
        let z = ELEVATION.sin();
        let horizontal = azimuth.normalize_or(FALLBACK_AZIMUTH) * (1.0 - z * z).sqrt();
        Self(horizontal.extend(z))
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.0.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.0.y
    }

    #[inline]
    pub fn z(&self) -> f64 {
        self.0.z
    }

    #[inline]
    pub fn as_dvec3(&self) -> DVec3 {
        self.0
    }

    /// Lambertian term for one normal.
    #[inline]
    pub fn dot(&self, normal: Vec3) -> f64 {
        self.0.dot(normal.as_dvec3())
    }
}

/// Estimates the light direction from the normals of cells where
/// `relevance > RELEVANCE_THRESHOLD`.
///
/// A single relevant cell, or normals that all agree, leave no spread to
/// follow; those fall back to light from `-x`. Only an empty relevant set is
/// an error.
pub fn estimate_light(normals: &NormalField, relevance: &Grid<f32>) -> Result<LightVector> {
    assert_eq!(normals.shape(), relevance.shape(), "grid shape mismatch");

    let samples: Vec<DVec2> = normals
        .cells()
        .iter()
        .zip(relevance.cells())
        .filter(|&(_, &r)| r > RELEVANCE_THRESHOLD)
        .map(|(n, _)| DVec2::new(n.x as f64, n.y as f64))
        .collect();

    if samples.is_empty() {
        return Err(DegenerateInputError::NoRelevantCells {
            threshold: RELEVANCE_THRESHOLD,
        }
        .into());
    }

    let mean = samples.iter().copied().sum::<DVec2>() / samples.len() as f64;
    let covariance = Covariance2::of(&samples, mean);
    let (lambda, axis) = covariance.dominant_eigen();
    let offset = axis * lambda.max(0.0).sqrt();

    let mut candidate = mean + offset;
    if candidate.x > 0.0 {
        candidate = mean - offset;
    }
    if candidate.length() < EIGEN_EPSILON {
        candidate = FALLBACK_AZIMUTH;
    }

    let light = LightVector::from_azimuth(candidate);
    debug!(
        "Light from {} relevant cells: mean {:?}, lambda {:.3e}, light {:?}",
        samples.len(),
        mean,
        lambda,
        light.as_dvec3()
    );
    Ok(light)
}

/// Symmetric 2x2 sample covariance `[[xx, xy], [xy, yy]]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Covariance2 {
    xx: f64,
    xy: f64,
    yy: f64,
}

impl Covariance2 {
    fn of(samples: &[DVec2], mean: DVec2) -> Self {
        let mut xx = 0.0;
        let mut xy = 0.0;
        let mut yy = 0.0;
        for s in samples {
            let d = *s - mean;
            xx += d.x * d.x;
            xy += d.x * d.y;
            yy += d.y * d.y;
        }
        let denom = samples.len().saturating_sub(1).max(1) as f64;
        Self {
            xx: xx / denom,
            xy: xy / denom,
            yy: yy / denom,
        }
    }

    /// Largest eigenvalue and its unit eigenvector. The vector's
    /// largest-magnitude component is made positive.
    fn dominant_eigen(&self) -> (f64, DVec2) {
        let half_trace = 0.5 * (self.xx + self.yy);
        let half_diff = 0.5 * (self.xx - self.yy);
        let lambda = half_trace + (half_diff * half_diff + self.xy * self.xy).sqrt();

        let vector = if self.xy.abs() <= EIGEN_EPSILON * half_trace.abs().max(1.0) {
            if self.xx >= self.yy {
                DVec2::X
            } else {
                DVec2::Y
            }
        } else {
            // Two equivalent forms; take the better conditioned one.
            let a = DVec2::new(lambda - self.yy, self.xy);
            let b = DVec2::new(self.xy, lambda - self.xx);
            if a.length_squared() >= b.length_squared() {
                a.normalize()
            } else {
                b.normalize()
            }
        };

        let vector = if vector.x.abs() >= vector.y.abs() {
            vector * vector.x.signum()
        } else {
            vector * vector.y.signum()
        };
        (lambda, vector)
    }
}
