//! Relief - relighting and detail boosting for density maps.
//!
//! A density map is read as a height field and lit from an automatically
//! chosen oblique direction, so faint structure in sparse regions becomes
//! visible without changing the data values. The pipeline:
//! - boosts the detail layer of the density, optionally only inside a value
//!   range or a rectangle (lenses), clamped to the source value range
//! - estimates surface normals and a dominant light direction from them
//! - colorizes the density and shifts its CIE lightness by the shading
//! - resizes and flips the result into an RGBA raster
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use relief::{DensityMap, FilterLibrary, RenderParams, RenderRequest, Renderer};
//!
//! let library = Arc::new(FilterLibrary::load());
//! let density = DensityMap::new(rows, cols, values)?;
//! let request = RenderRequest::new(density, RenderParams::default());
//! let raster = Renderer::new(library).render(&request)?;
//! raster.save_png("density.png")?;
//! ```

pub(crate) mod bandwidth;
pub(crate) mod colormap;
pub(crate) mod config;
pub(crate) mod density_map;
pub(crate) mod detail;
pub(crate) mod error;
pub mod filters;
pub(crate) mod library;
pub(crate) mod light;
pub(crate) mod normals;
pub(crate) mod output;
pub(crate) mod pipeline;
pub(crate) mod shading;
pub(crate) mod worker;

pub use common::Grid;

// ============================================================================
// Data and configuration
// ============================================================================

pub use colormap::{Colormap, ColormapLut, LUT_SIZE};
pub use config::{DetailFilter, FilterKind, RegionLens, RenderParams, ValueLens};
pub use density_map::DensityMap;
pub use error::{ConfigError, DegenerateInputError, Error, Result};

// ============================================================================
// Stages
// ============================================================================

pub use detail::{
    boost_detail, build_boost_mask, decompose, BoostMask, Decomposition, BOOST_MASK_SMOOTH_SIZE,
};
pub use light::{estimate_light, LightVector, ELEVATION, RELEVANCE_THRESHOLD};
pub use normals::{estimate_normals, NormalField, FLAT_EPSILON};
pub use output::{colorize, compose, quantize, OutputRaster};
pub use shading::{apply_lightness, luminance_deltas, IntensityField, LIGHTNESS_TO_U8};

// ============================================================================
// Entry points
// ============================================================================

pub use bandwidth::silverman_bandwidth;
pub use library::{FilterLibrary, LibraryLoader, DEFAULT_READY_TIMEOUT};
pub use pipeline::{render, RenderRequest, Renderer};
pub use worker::RenderWorker;
