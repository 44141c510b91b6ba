//! Detail boosting: split the density into a smooth base and a detail layer,
//! amplify the detail by a per-cell mask and recombine.
//!
//! The mask starts at the global detail factor. A value lens overrides it
//! where the source value falls in its range, then a region lens overrides it
//! inside its rectangle. The mask is box-smoothed so boosts fade in gradually.
//! The result is clamped to the source's own value range.


use common::Grid;
use tracing::debug;

use crate::config::{DetailFilter, RegionLens, ValueLens};
use crate::filters::{box_filter, guided_filter};
use crate::library::FilterLibrary;

/// Window size of the box filter that softens the boost mask.
pub const BOOST_MASK_SMOOTH_SIZE: usize = 11;

/// Per-cell amplification of the detail layer. Values are `>= 0`.
pub type BoostMask = Grid<f32>;

/// Base and detail layers with `base + detail == source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    pub base: Grid<f32>,
    pub detail: Grid<f32>,
}

/// Low-pass `source` with `filter` and keep the residual as detail.
pub fn decompose(
    library: &FilterLibrary,
    source: &Grid<f32>,
    filter: &DetailFilter,
) -> Decomposition {
    let base = match *filter {
        DetailFilter::Gaussian { radius, sigma } => {
            let ksize = 2 * radius as usize - 1;
            library.gaussian_blur(source, ksize, sigma)
        }
        DetailFilter::Guided { radius, eps } => guided_filter(source, radius as usize, eps),
    };
    let detail = source.zip_map(&base, |&s, &b| s - b);
    Decomposition { base, detail }
}

/// Builds the smoothed boost mask for `source`.
pub fn build_boost_mask(
    source: &Grid<f32>,
    detail_factor: f32,
    value_lens: Option<&ValueLens>,
    region_lens: Option<&RegionLens>,
) -> BoostMask {
    let (rows, cols) = source.shape();
    let mut mask = Grid::new_filled(rows, cols, detail_factor);

    if let Some(lens) = value_lens {
        let mut hits = 0usize;
        for (m, &v) in mask.cells_mut().iter_mut().zip(source.cells()) {
            if lens.contains(v) {
                *m = lens.factor;
                hits += 1;
            }
        }
        debug!(
            "Value lens [{}, {}] x{} covers {} of {} cells",
            lens.start,
            lens.end,
            lens.factor,
            hits,
            mask.len()
        );
    }

    if let Some(lens) = region_lens {
        match lens.clip(rows, cols) {
            Some((row_range, col_range)) => {
                debug!(
                    "Region lens x{} covers rows {:?}, cols {:?}",
                    lens.factor, row_range, col_range
                );
                for row in row_range {
                    for col in col_range.clone() {
                        mask[(row, col)] = lens.factor;
                    }
                }
            }
            None => debug!("Region lens {:?} lies outside the {}x{} grid", lens, rows, cols),
        }
    }

    box_filter(&mask, BOOST_MASK_SMOOTH_SIZE)
}

/// Boosts the detail of `source` and clamps the result to `source`'s range.
pub fn boost_detail(
    library: &FilterLibrary,
    source: &Grid<f32>,
    filter: &DetailFilter,
    detail_factor: f32,
    value_lens: Option<&ValueLens>,
    region_lens: Option<&RegionLens>,
) -> Grid<f32> {
    let Some((lo, hi)) = source.extent() else {
        return source.clone();
    };

    let Decomposition { base, detail } = decompose(library, source, filter);
    let mask = build_boost_mask(source, detail_factor, value_lens, region_lens);

    let boosted = detail.zip_map(&mask, |&d, &m| d * m);
    base.zip_map(&boosted, |&b, &d| (b + d).max(lo).min(hi))
}
