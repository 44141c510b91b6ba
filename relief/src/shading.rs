//! Lambertian shading blended into the lightness channel of CIE LCh.
//!
//! Only `L` moves and the hue angle is held fixed. A shifted colour that
//! leaves the sRGB gamut gives up chroma, never hue.

use common::float_ext::FloatExt;
use common::parallel::{par_fill_rows, par_map_indices};
use common::Grid;
use palette::convert::IntoColorUnclamped;
use palette::{FromColor, Lch, LinSrgb, Srgb};

use crate::light::LightVector;
use crate::normals::NormalField;

/// Scale from lightness percent to the 8-bit `L` channel.
pub const LIGHTNESS_TO_U8: f64 = 2.55;

/// Bisection steps when pulling an out-of-gamut colour back in by chroma.
const GAMUT_SEARCH_STEPS: usize = 24;

/// Slack on the linear channels before a colour counts as out of gamut.
const GAMUT_TOLERANCE: f32 = 1e-4;

/// Per-cell additive lightness delta in 8-bit `L` units, truncated toward zero.
pub type IntensityField = Grid<f32>;

/// Maps the Lambertian intensity `n . l` onto lightness deltas.
///
/// The range `[min(intensity), light.z]` is mapped affinely onto
/// `[phi * 2.55, 0]`. When the two ends coincide every delta is 0.
pub fn luminance_deltas(normals: &NormalField, light: &LightVector, phi: f32) -> IntensityField {
    let intensity = par_map_indices(normals.len(), |i| light.dot(normals[i]));
    let min = intensity.iter().copied().fold(f64::INFINITY, f64::min);

    let top = light.z();
    let peak = phi as f64 * LIGHTNESS_TO_U8;
    if !min.is_finite() || min.approximately_eq(top) {
        return Grid::new_filled(normals.rows(), normals.cols(), 0.0);
    }

    let k = peak / (min - top);
    let b = peak - k * min;
    let limit = i16::MAX as f64;
    let deltas = intensity
        .into_iter()
        .map(|i| (k * i + b).trunc().clamp(-limit, limit) as f32)
        .collect();
    Grid::new(normals.rows(), normals.cols(), deltas)
}

/// Adds `deltas` to the 8-bit CIE lightness of every pixel. Cells with a zero
/// delta are left untouched.
pub fn apply_lightness(pixels: &mut Grid<[u8; 3]>, deltas: &IntensityField) {
    assert_eq!(pixels.shape(), deltas.shape(), "grid shape mismatch");
    let cols = pixels.cols();
    par_fill_rows(pixels.cells_mut(), cols, |row, out_row| {
        for (px, &delta) in out_row.iter_mut().zip(deltas.row(row)) {
            if delta != 0.0 {
                *px = shift_lightness(*px, delta);
            }
        }
    });
}

fn shift_lightness(rgb: [u8; 3], delta: f32) -> [u8; 3] {
    let mut lch: Lch = Lch::from_color(to_linear(rgb));

    let scale = LIGHTNESS_TO_U8 as f32;
    let l8 = (lch.l * scale).round();
    lch.l = (l8 + delta).clamp(0.0, 255.0) / scale;

    let srgb: Srgb<f32> = Srgb::from_linear(fit_chroma(lch));
    [
        channel_to_u8(srgb.red),
        channel_to_u8(srgb.green),
        channel_to_u8(srgb.blue),
    ]
}

fn to_linear(rgb: [u8; 3]) -> LinSrgb<f32> {
    Srgb::new(
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    )
    .into_linear()
}

/// Converts to linear sRGB, lowering chroma at constant lightness and hue
/// until the colour is displayable. The conversions stay unclamped so that
/// out-of-gamut channels are seen rather than silently cut.
fn fit_chroma(lch: Lch) -> LinSrgb<f32> {
    let lin: LinSrgb<f32> = lch.into_color_unclamped();
    if in_gamut(lin) {
        return lin;
    }

    let mut fitted = lch;
    let (mut inside, mut outside) = (0.0f32, lch.chroma);
    for _ in 0..GAMUT_SEARCH_STEPS {
        fitted.chroma = 0.5 * (inside + outside);
        if in_gamut(fitted.into_color_unclamped()) {
            inside = fitted.chroma;
        } else {
            outside = fitted.chroma;
        }
    }
    fitted.chroma = inside;
    fitted.into_color_unclamped()
}

#[inline]
fn in_gamut(lin: LinSrgb<f32>) -> bool {
    let range = -GAMUT_TOLERANCE..=1.0 + GAMUT_TOLERANCE;
    range.contains(&lin.red) && range.contains(&lin.green) && range.contains(&lin.blue)
}

#[inline]
fn channel_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::Colormap;
    use glam::{DVec2, Vec3};

    fn lch_of(rgb: [u8; 3]) -> Lch {
        Lch::from_color(to_linear(rgb))
    }

    fn hue_distance(a: f32, b: f32) -> f32 {
        let d = (a - b).rem_euclid(360.0);
        d.min(360.0 - d)
    }

    #[test]
    fn flat_field_has_no_deltas() {
        let normals = Grid::new_filled(3, 3, Vec3::Z);
        let light = LightVector::from_azimuth(DVec2::NEG_X);
        let deltas = luminance_deltas(&normals, &light, 50.0);
        assert!(deltas.cells().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn darkest_slope_gets_full_delta() {
        let light = LightVector::from_azimuth(DVec2::NEG_X);
        let away = Vec3::new(0.6, 0.0, 0.8);
        let normals = Grid::new(1, 3, vec![Vec3::Z, away, Vec3::Z]);
        let deltas = luminance_deltas(&normals, &light, 10.0);
        // 10 * 2.55 = 25.5, truncated.
        assert_eq!(deltas[(0, 1)], 25.0);
        assert_eq!(deltas[(0, 0)], 0.0);
        assert_eq!(deltas[(0, 2)], 0.0);
    }

    #[test]
    fn negative_phi_darkens_the_slope() {
        let light = LightVector::from_azimuth(DVec2::NEG_X);
        let away = Vec3::new(0.6, 0.0, 0.8);
        let normals = Grid::new(1, 3, vec![Vec3::Z, away, Vec3::Z]);
        let deltas = luminance_deltas(&normals, &light, -10.0);
        assert_eq!(deltas[(0, 1)], -25.0);
        assert_eq!(deltas[(0, 0)], 0.0);

        let mut pixels = Grid::new_filled(1, 3, [120u8, 120, 120]);
        apply_lightness(&mut pixels, &deltas);
        assert!(pixels[(0, 1)][0] < 120);
        assert_eq!(pixels[(0, 0)], [120, 120, 120]);
    }

    #[test]
    fn deltas_are_integers() {
        let light = LightVector::from_azimuth(DVec2::new(-1.0, 0.5));
        let cells = (0..16)
            .map(|i| Vec3::new((i as f32 - 8.0) * 0.05, (i % 4) as f32 * 0.1, 1.0).normalize())
            .collect();
        let deltas = luminance_deltas(&Grid::new(4, 4, cells), &light, 33.3);
        for &d in deltas.cells() {
            assert_eq!(d, d.trunc());
        }
    }

    #[test]
    fn zero_delta_keeps_pixel() {
        let mut pixels = Grid::new(1, 2, vec![[13, 8, 135], [240, 249, 33]]);
        let before = pixels.clone();
        apply_lightness(&mut pixels, &Grid::new_filled(1, 2, 0.0));
        assert_eq!(pixels, before);
    }

    #[test]
    fn lightness_saturates() {
        let mut pixels = Grid::new(1, 2, vec![[128, 128, 128], [128, 128, 128]]);
        apply_lightness(&mut pixels, &Grid::new(1, 2, vec![400.0, -400.0]));
        assert_eq!(pixels[(0, 0)], [255, 255, 255]);
        assert_eq!(pixels[(0, 1)], [0, 0, 0]);
    }

    #[test]
    fn positive_delta_brightens() {
        let mut pixels = Grid::new(1, 1, vec![[90, 40, 160]]);
        apply_lightness(&mut pixels, &Grid::new(1, 1, vec![30.0]));
        let [r, g, b] = pixels[(0, 0)];
        assert!(r as u32 + g as u32 + b as u32 > 90 + 40 + 160);
    }

    #[test]
    fn lightness_shift_keeps_hue() {
        let lut = Colormap::Plasma.lut();
        let mut checked = 0;
        for level in 0..=255u8 {
            let rgb = lut.apply(level);
            for delta in [-63.0, 63.0] {
                let shifted = shift_lightness(rgb, delta);
                let (before, after) = (lch_of(rgb), lch_of(shifted));
                // Near-grey results carry no meaningful hue after 8-bit rounding.
                if after.chroma < 20.0 {
                    continue;
                }
                let drift = hue_distance(
                    before.hue.into_positive_degrees(),
                    after.hue.into_positive_degrees(),
                );
                assert!(
                    drift < 3.0,
                    "level {level} {rgb:?} -> {shifted:?}: hue moved {drift} degrees"
                );
                checked += 1;
            }
        }
        assert!(checked >= 64, "only {checked} shifts kept enough chroma");
    }

    #[test]
    fn out_of_gamut_shift_reduces_chroma() {
        let rgb = [250, 168, 54];
        let shifted = shift_lightness(rgb, 60.0);
        let (before, after) = (lch_of(rgb), lch_of(shifted));
        assert!(after.l > before.l);
        assert!(after.chroma < before.chroma);
    }
}
