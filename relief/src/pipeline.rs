//! The combined render pipeline: detail boost, relighting, colorization.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{RegionLens, RenderParams, RenderParamsWire, ValueLens};
use crate::density_map::{DensityMap, DensityMapWire};
use crate::detail::boost_detail;
use crate::error::{ConfigError, Result};
use crate::library::FilterLibrary;
use crate::light::estimate_light;
use crate::normals::estimate_normals;
use crate::output::{compose, OutputRaster};
use crate::shading::{luminance_deltas, IntensityField};

/// Everything one render needs.
///
/// `baseline` is the same data estimated at a coarser bandwidth. When present,
/// shading follows `density - baseline` and only cells where the baseline is
/// non-empty vote on the light direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub density: DensityMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<DensityMap>,
    pub params: RenderParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_lens: Option<ValueLens>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_lens: Option<RegionLens>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequestWire {
    density: DensityMapWire,
    #[serde(default)]
    baseline: Option<DensityMapWire>,
    params: RenderParamsWire,
    #[serde(default)]
    value_lens: Option<ValueLens>,
    #[serde(default)]
    region_lens: Option<RegionLens>,
}

impl RenderRequest {
    pub fn new(density: DensityMap, params: RenderParams) -> Self {
        Self {
            density,
            baseline: None,
            params,
            value_lens: None,
            region_lens: None,
        }
    }

    pub fn with_baseline(mut self, baseline: DensityMap) -> Self {
        self.baseline = Some(baseline);
        self
    }

    pub fn with_value_lens(mut self, lens: ValueLens) -> Self {
        self.value_lens = Some(lens);
        self
    }

    pub fn with_region_lens(mut self, lens: RegionLens) -> Self {
        self.region_lens = Some(lens);
        self
    }

    /// Decodes a host payload. Malformed JSON is a
    /// [`ConfigError::Payload`]; well-formed but invalid content keeps its
    /// specific error.
    pub fn from_json(payload: &str) -> Result<Self> {
        let wire: RenderRequestWire = serde_json::from_str(payload)
            .map_err(|e| ConfigError::Payload(e.to_string()))?;
        Ok(Self {
            density: wire.density.try_into()?,
            baseline: wire.baseline.map(DensityMap::try_from).transpose()?,
            params: RenderParams::try_from(wire.params)?,
            value_lens: wire.value_lens,
            region_lens: wire.region_lens,
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;
        if let Some(lens) = &self.value_lens {
            lens.validate()?;
        }
        if let Some(lens) = &self.region_lens {
            lens.validate()?;
        }
        if let Some(baseline) = &self.baseline {
            if baseline.shape() != self.density.shape() {
                return Err(ConfigError::BaselineShape {
                    density: self.density.shape(),
                    baseline: baseline.shape(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Renders requests against one loaded [`FilterLibrary`].
#[derive(Debug, Clone)]
pub struct Renderer {
    library: Arc<FilterLibrary>,
}

impl Renderer {
    pub fn new(library: Arc<FilterLibrary>) -> Self {
        Self { library }
    }

    pub fn library(&self) -> &Arc<FilterLibrary> {
        &self.library
    }

    pub fn render(&self, request: &RenderRequest) -> Result<OutputRaster> {
        request.validate()?;

        let start = Instant::now();
        let RenderRequest {
            density,
            baseline,
            params,
            value_lens,
            region_lens,
        } = request;
        info!(
            "Rendering {}x{} map to {}x{} ({}, phi {}, {} filter)",
            density.rows(),
            density.cols(),
            params.width,
            params.height,
            params.colormap,
            params.phi,
            params.filter.kind()
        );

        let enhanced = boost_detail(
            &self.library,
            density.grid(),
            &params.filter,
            params.detail_factor,
            value_lens.as_ref(),
            region_lens.as_ref(),
        );

        let deltas = if params.phi != 0.0 {
            Some(shade(density, baseline.as_ref(), params)?)
        } else {
            debug!("Shading disabled");
            None
        };

        let raster = compose(
            &self.library,
            &enhanced,
            params.colormap,
            deltas.as_ref(),
            params.width,
            params.height,
        );
        info!("Rendered in {:?}", start.elapsed());
        Ok(raster)
    }
}

fn shade(
    density: &DensityMap,
    baseline: Option<&DensityMap>,
    params: &RenderParams,
) -> Result<IntensityField> {
    let height = match baseline {
        Some(baseline) => Cow::Owned(density.difference(baseline)?),
        None => Cow::Borrowed(density),
    };
    let relevance = baseline.unwrap_or(density);

    let normals = estimate_normals(height.grid(), params.eta);
    let light = estimate_light(&normals, relevance.grid())?;
    Ok(luminance_deltas(&normals, &light, params.phi))
}

/// Renders one density map without a baseline.
pub fn render(
    library: &Arc<FilterLibrary>,
    density: &DensityMap,
    params: &RenderParams,
    value_lens: Option<&ValueLens>,
    region_lens: Option<&RegionLens>,
) -> Result<OutputRaster> {
    let request = RenderRequest {
        density: density.clone(),
        baseline: None,
        params: params.clone(),
        value_lens: value_lens.copied(),
        region_lens: region_lens.copied(),
    };
    Renderer::new(Arc::clone(library)).render(&request)
}
