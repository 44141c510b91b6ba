//! Render configuration: output size, palette, shading strength, detail
//! filter and the two lens kinds.
//!
//! The host sends these as JSON with camelCase keys. Decoding goes through
//! small wire structs so that a bad filter name or a missing filter parameter
//! comes back as a typed [`ConfigError`] rather than an opaque parse error.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

use crate::colormap::Colormap;
use crate::error::{ConfigError, Result};

// ============================================================================
// Detail filter
// ============================================================================

/// Names accepted in the `filter` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum FilterKind {
    Gaussian,
    Guided,
}

/// Low-pass filter used to split the density into base and detail layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetailFilter {
    /// Separable Gaussian blur with kernel size `2 * radius - 1`.
    Gaussian { radius: u32, sigma: f32 },
    /// Self-guided edge-aware filter over `(2 * radius + 1)^2` windows.
    Guided { radius: u32, eps: f32 },
}

impl DetailFilter {
    pub fn kind(&self) -> FilterKind {
        match self {
            DetailFilter::Gaussian { .. } => FilterKind::Gaussian,
            DetailFilter::Guided { .. } => FilterKind::Guided,
        }
    }

    pub fn radius(&self) -> u32 {
        match *self {
            DetailFilter::Gaussian { radius, .. } | DetailFilter::Guided { radius, .. } => radius,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.radius() == 0 {
            return Err(ConfigError::NonPositiveRadius(0).into());
        }
        match *self {
            DetailFilter::Gaussian { sigma, .. } => {
                if !(sigma > 0.0 && sigma.is_finite()) {
                    return Err(ConfigError::NonPositiveSigma(sigma).into());
                }
            }
            DetailFilter::Guided { eps, .. } => {
                if !(eps > 0.0 && eps.is_finite()) {
                    return Err(ConfigError::NonPositiveEps(eps).into());
                }
            }
        }
        Ok(())
    }
}

impl Default for DetailFilter {
    fn default() -> Self {
        DetailFilter::Gaussian {
            radius: 5,
            sigma: 3.0,
        }
    }
}

// ============================================================================
// Render parameters
// ============================================================================

/// Parameters for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RenderParamsWire", into = "RenderParamsWire")]
pub struct RenderParams {
    /// Output raster width in pixels.
    pub width: u32,
    /// Output raster height in pixels.
    pub height: u32,
    pub colormap: Colormap,
    /// Vertical exaggeration applied to the height field before gradients.
    pub eta: f32,
    /// Shading strength in lightness percent. 0 disables shading; a negative
    /// value darkens the sunlit side instead of the shadowed one.
    pub phi: f32,
    pub filter: DetailFilter,
    /// Global amplification of the detail layer. 1 leaves the density as is.
    pub detail_factor: f32,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            colormap: Colormap::Plasma,
            eta: 1.0,
            phi: 50.0,
            filter: DetailFilter::default(),
            detail_factor: 1.0,
        }
    }
}

impl RenderParams {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::EmptyOutput {
                width: self.width,
                height: self.height,
            }
            .into());
        }
        if !(self.eta > 0.0 && self.eta.is_finite()) {
            return Err(ConfigError::InvalidEta(self.eta).into());
        }
        if !self.phi.is_finite() {
            return Err(ConfigError::InvalidPhi(self.phi).into());
        }
        if !(self.detail_factor >= 0.0 && self.detail_factor.is_finite()) {
            return Err(ConfigError::InvalidDetailFactor(self.detail_factor).into());
        }
        self.filter.validate()
    }

    /// Decodes the host's JSON parameter payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        let wire: RenderParamsWire = serde_json::from_str(payload)
            .map_err(|e| ConfigError::Payload(e.to_string()))?;
        Ok(Self::try_from(wire)?)
    }

    /// Encodes the parameters in the same camelCase shape `from_json` reads.
    pub fn to_json(&self) -> Result<String> {
        let wire = RenderParamsWire::from(self.clone());
        Ok(serde_json::to_string(&wire).map_err(|e| ConfigError::Payload(e.to_string()))?)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FilterParamsWire {
    #[serde(default)]
    radius: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sigma: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eps: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RenderParamsWire {
    width: u32,
    height: u32,
    #[serde(default)]
    colormap: Option<String>,
    #[serde(default = "default_eta", alias = "vertExaggeration")]
    eta: f32,
    #[serde(default)]
    phi: f32,
    #[serde(default = "default_filter_name")]
    filter: String,
    #[serde(default)]
    filter_params: FilterParamsWire,
    #[serde(default = "default_detail_factor")]
    detail_factor: f32,
}

fn default_eta() -> f32 {
    1.0
}

fn default_filter_name() -> String {
    FilterKind::Gaussian.to_string()
}

fn default_detail_factor() -> f32 {
    1.0
}

impl TryFrom<RenderParamsWire> for RenderParams {
    type Error = ConfigError;

    fn try_from(wire: RenderParamsWire) -> std::result::Result<Self, Self::Error> {
        let kind: FilterKind = wire
            .filter
            .parse()
            .map_err(|_| ConfigError::UnknownFilter(wire.filter.clone()))?;

        let radius = wire
            .filter_params
            .radius
            .ok_or(ConfigError::MissingFilterParam {
                filter: kind.into(),
                param: "radius",
            })?;
        if radius <= 0 || radius > u32::MAX as i64 {
            return Err(ConfigError::NonPositiveRadius(radius));
        }
        let radius = radius as u32;

        let filter = match kind {
            FilterKind::Gaussian => DetailFilter::Gaussian {
                radius,
                sigma: wire.filter_params.sigma.ok_or(ConfigError::MissingFilterParam {
                    filter: kind.into(),
                    param: "sigma",
                })?,
            },
            FilterKind::Guided => DetailFilter::Guided {
                radius,
                eps: wire.filter_params.eps.ok_or(ConfigError::MissingFilterParam {
                    filter: kind.into(),
                    param: "eps",
                })?,
            },
        };

        // No colormap requested means a grey passthrough.
        let colormap = wire
            .colormap
            .as_deref()
            .map_or(Colormap::Greyscale, Colormap::from_name);

        Ok(Self {
            width: wire.width,
            height: wire.height,
            colormap,
            eta: wire.eta,
            phi: wire.phi,
            filter,
            detail_factor: wire.detail_factor,
        })
    }
}

impl From<RenderParams> for RenderParamsWire {
    fn from(params: RenderParams) -> Self {
        let filter_params = match params.filter {
            DetailFilter::Gaussian { radius, sigma } => FilterParamsWire {
                radius: Some(radius as i64),
                sigma: Some(sigma),
                eps: None,
            },
            DetailFilter::Guided { radius, eps } => FilterParamsWire {
                radius: Some(radius as i64),
                sigma: None,
                eps: Some(eps),
            },
        };
        Self {
            width: params.width,
            height: params.height,
            colormap: Some(params.colormap.to_string()),
            eta: params.eta,
            phi: params.phi,
            filter: params.filter.kind().to_string(),
            filter_params,
            detail_factor: params.detail_factor,
        }
    }
}

// ============================================================================
// Lenses
// ============================================================================

/// Detail boost override for cells whose source value lies in
/// `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueLens {
    pub start: f32,
    pub end: f32,
    pub factor: f32,
}

impl ValueLens {
    pub fn new(start: f32, end: f32, factor: f32) -> Self {
        Self { start, end, factor }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.start.is_finite() && self.end.is_finite()) || self.start > self.end {
            return Err(ConfigError::MalformedValueLens {
                start: self.start,
                end: self.end,
            }
            .into());
        }
        validate_factor(self.factor)
    }

    #[inline]
    pub fn contains(&self, value: f32) -> bool {
        value >= self.start && value <= self.end
    }
}

/// Detail boost override inside a rectangle of cells.
///
/// Bounds are inclusive; `x` indexes columns and `y` indexes rows of the
/// source grid (before the output flip). Bounds outside the grid are clipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionLens {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
    pub factor: f32,
}

impl RegionLens {
    pub fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64, factor: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            factor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return Err(ConfigError::MalformedRegionLens {
                min_x: self.min_x,
                min_y: self.min_y,
                max_x: self.max_x,
                max_y: self.max_y,
            }
            .into());
        }
        validate_factor(self.factor)
    }

    /// Row and column ranges clipped to a `rows x cols` grid. `None` when the
    /// lens does not overlap the grid.
    pub fn clip(
        &self,
        rows: usize,
        cols: usize,
    ) -> Option<(std::ops::Range<usize>, std::ops::Range<usize>)> {
        let row_range = clip_axis(self.min_y, self.max_y, rows)?;
        let col_range = clip_axis(self.min_x, self.max_x, cols)?;
        Some((row_range, col_range))
    }
}

fn clip_axis(min: i64, max: i64, len: usize) -> Option<std::ops::Range<usize>> {
    if len == 0 || max < 0 || min >= len as i64 {
        return None;
    }
    let start = min.max(0) as usize;
    let end = (max.min(len as i64 - 1) as usize) + 1;
    (start < end).then_some(start..end)
}

fn validate_factor(factor: f32) -> Result<()> {
    if factor >= 0.0 && factor.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidLensFactor(factor).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn default_params_are_valid() {
        RenderParams::default().validate().unwrap();
    }

    #[test]
    fn decodes_host_payload() {
        let params = RenderParams::from_json(
            r#"{"width": 400, "height": 300, "colormap": "Magma", "vertExaggeration": 2.0,
                "phi": 40, "filter": "guided", "filterParams": {"radius": 3, "eps": 0.01},
                "detailFactor": 2.5}"#,
        )
        .unwrap();
        assert_eq!(params.width, 400);
        assert_eq!(params.height, 300);
        assert_eq!(params.colormap, Colormap::Magma);
        assert_eq!(params.eta, 2.0);
        assert_eq!(params.phi, 40.0);
        assert_eq!(
            params.filter,
            DetailFilter::Guided {
                radius: 3,
                eps: 0.01
            }
        );
        assert_eq!(params.detail_factor, 2.5);
    }

    #[test]
    fn unknown_filter_is_typed_error() {
        let err = RenderParams::from_json(
            r#"{"width": 4, "height": 4, "filter": "bilateral", "filterParams": {"radius": 2}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigError::UnknownFilter(ref name)) if name == "bilateral"
        ));
    }

    #[test]
    fn missing_sigma_is_reported() {
        let err = RenderParams::from_json(
            r#"{"width": 4, "height": 4, "filter": "gaussian", "filterParams": {"radius": 2}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigError::MissingFilterParam { param: "sigma", .. })
        ));
    }

    #[test]
    fn non_positive_radius_is_rejected() {
        let err = RenderParams::from_json(
            r#"{"width": 4, "height": 4, "filter": "guided", "filterParams": {"radius": 0, "eps": 0.1}}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigError::NonPositiveRadius(0))
        ));
    }

    #[test]
    fn missing_colormap_means_greyscale() {
        let params = RenderParams::from_json(
            r#"{"width": 4, "height": 4, "filter": "gaussian", "filterParams": {"radius": 2, "sigma": 1.0}}"#,
        )
        .unwrap();
        assert_eq!(params.colormap, Colormap::Greyscale);
    }

    #[test]
    fn json_round_trip_keeps_params() {
        let params = RenderParams {
            filter: DetailFilter::Guided {
                radius: 2,
                eps: 0.05,
            },
            colormap: Colormap::Cividis,
            phi: -15.0,
            ..RenderParams::default()
        };
        let json = params.to_json().unwrap();
        assert_eq!(RenderParams::from_json(&json).unwrap(), params);
    }

    #[test]
    fn validate_rejects_bad_numbers() {
        let bad = [
            RenderParams {
                width: 0,
                ..RenderParams::default()
            },
            RenderParams {
                eta: 0.0,
                ..RenderParams::default()
            },
            RenderParams {
                phi: f32::NAN,
                ..RenderParams::default()
            },
            RenderParams {
                phi: f32::NEG_INFINITY,
                ..RenderParams::default()
            },
            RenderParams {
                detail_factor: f32::NAN,
                ..RenderParams::default()
            },
            RenderParams {
                filter: DetailFilter::Gaussian {
                    radius: 2,
                    sigma: 0.0,
                },
                ..RenderParams::default()
            },
            RenderParams {
                filter: DetailFilter::Guided {
                    radius: 2,
                    eps: -0.1,
                },
                ..RenderParams::default()
            },
        ];
        for params in bad {
            assert!(
                matches!(params.validate(), Err(Error::Configuration(_))),
                "{:?} should be rejected",
                params
            );
        }
    }

    #[test]
    fn negative_phi_is_accepted() {
        for phi in [-20.0, -0.5, 0.0] {
            let params = RenderParams {
                phi,
                ..RenderParams::default()
            };
            params.validate().unwrap();
        }
    }

    #[test]
    fn value_lens_validation() {
        ValueLens::new(1.0, 2.0, 3.0).validate().unwrap();
        assert!(ValueLens::new(2.0, 1.0, 3.0).validate().is_err());
        assert!(ValueLens::new(0.0, f32::INFINITY, 3.0).validate().is_err());
        assert!(ValueLens::new(0.0, 1.0, -1.0).validate().is_err());
        assert!(ValueLens::new(1.0, 2.0, 0.0).contains(2.0));
    }

    #[test]
    fn region_lens_clip() {
        let lens = RegionLens::new(-5, 2, 3, 100, 2.0);
        assert_eq!(lens.clip(10, 8), Some((2..10, 0..4)));

        let outside = RegionLens::new(20, 20, 30, 30, 2.0);
        assert_eq!(outside.clip(10, 10), None);

        let negative = RegionLens::new(-10, -10, -1, -1, 2.0);
        assert_eq!(negative.clip(10, 10), None);
    }

    #[test]
    fn region_lens_rejects_inverted_bounds() {
        let err = RegionLens::new(5, 0, 4, 3, 1.0).validate().unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigError::MalformedRegionLens { .. })
        ));
    }

    #[test]
    fn region_lens_payload_uses_camel_case() {
        let lens: RegionLens =
            serde_json::from_str(r#"{"minX": 1, "minY": 2, "maxX": 3, "maxY": 4, "factor": 5.0}"#)
                .unwrap();
        assert_eq!(lens, RegionLens::new(1, 2, 3, 4, 5.0));
    }
}
