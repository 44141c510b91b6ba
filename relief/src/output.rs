//! Final raster assembly: quantize, colorize, shade, resize, flip.

use std::path::Path;

use common::Grid;
use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageResult, Rgba, RgbaImage};
use tracing::debug;

use crate::colormap::Colormap;
use crate::filters::normalize_min_max;
use crate::library::FilterLibrary;
use crate::shading::{apply_lightness, IntensityField};

/// RGBA output, `width x height`. Row 0 is the top of the image, which shows
/// the last row of the source grid.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRaster {
    image: RgbaImage,
}

impl OutputRaster {
    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Row-major RGBA bytes.
    #[inline]
    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.image.save_with_format(path, ImageFormat::Png)
    }
}

/// Min-max normalizes `values` to `0..=255` and rounds to 8 bits. A constant
/// grid maps to 255.
pub fn quantize(values: &Grid<f32>) -> Grid<u8> {
    normalize_min_max(values, 0.0, 255.0).map(|&v| v.round().clamp(0.0, 255.0) as u8)
}

/// Looks every cell up in the palette, inverting first for palettes that
/// are dark at the low end.
pub fn colorize(library: &FilterLibrary, levels: &Grid<u8>, colormap: Colormap) -> Grid<[u8; 3]> {
    let lut = library.lut(colormap);
    if colormap.is_inverted() {
        levels.map(|&v| lut.apply(!v))
    } else {
        levels.map(|&v| lut.apply(v))
    }
}

/// Turns a scalar grid into the display raster.
///
/// `deltas`, when given, shift CIE lightness at grid resolution before the
/// resize.
pub fn compose(
    library: &FilterLibrary,
    values: &Grid<f32>,
    colormap: Colormap,
    deltas: Option<&IntensityField>,
    width: u32,
    height: u32,
) -> OutputRaster {
    let levels = quantize(values);
    let mut pixels = colorize(library, &levels, colormap);
    if let Some(deltas) = deltas {
        apply_lightness(&mut pixels, deltas);
    }

    let (rows, cols) = pixels.shape();
    let grid_image = RgbaImage::from_fn(cols as u32, rows as u32, |x, y| {
        let [r, g, b] = pixels[(y as usize, x as usize)];
        Rgba([r, g, b, u8::MAX])
    });

    let mut image = if grid_image.dimensions() == (width, height) {
        grid_image
    } else {
        debug!("Resizing {}x{} to {}x{}", cols, rows, width, height);
        imageops::resize(&grid_image, width, height, FilterType::Triangle)
    };
    imageops::flip_vertical_in_place(&mut image);

    OutputRaster { image }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_stretches_to_full_range() {
        let grid = Grid::new(1, 4, vec![2.0, 3.0, 4.0, 6.0]);
        assert_eq!(quantize(&grid).cells(), &[0, 64, 128, 255]);
    }

    #[test]
    fn constant_grid_quantizes_to_top() {
        let grid = Grid::new_filled(2, 2, -3.5f32);
        assert!(quantize(&grid).cells().iter().all(|&v| v == 255));
    }

    #[test]
    fn inverted_palettes_read_back_to_front() {
        let library = FilterLibrary::load();
        let levels = Grid::new(1, 2, vec![0u8, 255]);
        let magma = colorize(&library, &levels, Colormap::Magma);
        assert_eq!(magma[(0, 0)], Colormap::Magma.lut().apply(255));
        assert_eq!(magma[(0, 1)], Colormap::Magma.lut().apply(0));

        let viridis = colorize(&library, &levels, Colormap::Viridis);
        assert_eq!(viridis[(0, 0)], Colormap::Viridis.lut().apply(0));
    }

    #[test]
    fn output_is_flipped_vertically() {
        let library = FilterLibrary::load();
        // Row 0 low, row 1 high.
        let grid = Grid::new(2, 1, vec![0.0, 1.0]);
        let raster = compose(&library, &grid, Colormap::Greyscale, None, 1, 2);
        assert_eq!(raster.pixel(0, 0), [255, 255, 255, 255]);
        assert_eq!(raster.pixel(0, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn output_matches_requested_size() {
        let library = FilterLibrary::load();
        let grid = Grid::new(3, 5, (0..15).map(|v| v as f32).collect());
        let raster = compose(&library, &grid, Colormap::Turbo, None, 40, 24);
        assert_eq!((raster.width(), raster.height()), (40, 24));
        assert_eq!(raster.as_raw().len(), 40 * 24 * 4);
        assert!(raster.as_raw().chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn constant_grid_upscales_to_one_colour() {
        let library = FilterLibrary::load();
        let grid = Grid::new_filled(4, 4, 0.25f32);
        let raster = compose(&library, &grid, Colormap::Plasma, None, 17, 9);
        let first = raster.pixel(0, 0);
        assert_eq!(first, [240, 249, 33, 255]);
        assert!(raster.as_raw().chunks(4).all(|px| px == first));
    }
}
