//! Colormap lookup tables.
//!
//! Plasma, Viridis, Inferno and Magma carry matplotlib's full 256-entry
//! tables. Turbo and Cividis are nine evenly spaced anchors. Either way the
//! palette is sampled piecewise-linearly, so an 8-bit value `v` maps to the
//! palette at `t = v / 255`, which for the full tables is entry `v`.

mod tables;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};
use tracing::warn;

/// Number of entries in an 8-bit lookup table.
pub const LUT_SIZE: usize = 256;

/// Display palette applied to the quantized density.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumString,
    Display,
    EnumIter,
    AsRefStr,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(from = "String", into = "String")]
pub enum Colormap {
    #[default]
    Plasma,
    Viridis,
    Inferno,
    Turbo,
    Cividis,
    Magma,
    /// Grey passthrough: the 8-bit value is replicated into all channels.
    #[strum(to_string = "Greyscale", serialize = "Grey", serialize = "Gray")]
    Greyscale,
}

impl Colormap {
    /// Parses a palette name, falling back to [`Colormap::Plasma`] for
    /// unknown names.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!("Unknown colormap '{}', using Plasma", name);
            Colormap::Plasma
        })
    }

    /// Palettes whose low end is dark. Their input is bit-inverted before the
    /// lookup so empty regions stay light against a light background.
    pub fn is_inverted(self) -> bool {
        matches!(self, Colormap::Magma | Colormap::Inferno | Colormap::Cividis)
    }

    /// Palette colour at `t` in `[0, 1]`. Values outside are clamped.
    pub fn sample(self, t: f32) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let table = match self {
            Colormap::Greyscale => {
                let v = to_u8(t);
                return [v, v, v];
            }
            Colormap::Plasma => &tables::PLASMA[..],
            Colormap::Viridis => &tables::VIRIDIS[..],
            Colormap::Inferno => &tables::INFERNO[..],
            Colormap::Magma => &tables::MAGMA[..],
            Colormap::Turbo => &TURBO[..],
            Colormap::Cividis => &CIVIDIS[..],
        };
        lerp_table(table, t)
    }

    /// Colour for a legend entry at `t`, matching what the renderer shows for
    /// a cell normalized to `t`: inverted palettes are read back to front.
    pub fn legend_color(self, t: f32) -> [u8; 3] {
        if self.is_inverted() {
            self.sample(1.0 - t)
        } else {
            self.sample(t)
        }
    }

    pub fn lut(self) -> ColormapLut {
        let mut entries = [[0u8; 3]; LUT_SIZE];
        for (i, entry) in entries.iter_mut().enumerate() {
            *entry = self.sample(i as f32 / (LUT_SIZE - 1) as f32);
        }
        ColormapLut { entries }
    }
}

impl From<String> for Colormap {
    fn from(name: String) -> Self {
        Colormap::from_name(&name)
    }
}

impl From<Colormap> for String {
    fn from(colormap: Colormap) -> Self {
        colormap.to_string()
    }
}

/// Expanded 8-bit lookup table for one palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColormapLut {
    entries: [[u8; 3]; LUT_SIZE],
}

impl ColormapLut {
    #[inline]
    pub fn apply(&self, value: u8) -> [u8; 3] {
        self.entries[value as usize]
    }
}

fn to_u8(x: f32) -> u8 {
    (x * 255.0).round().clamp(0.0, 255.0) as u8
}

fn lerp_table(table: &[[f32; 3]], t: f32) -> [u8; 3] {
    let segments = (table.len() - 1) as f32;
    let pos = t * segments;
    let lo = (pos.floor() as usize).min(table.len() - 2);
    let frac = pos - lo as f32;
    let a = table[lo];
    let b = table[lo + 1];
    [
        to_u8(a[0] + (b[0] - a[0]) * frac),
        to_u8(a[1] + (b[1] - a[1]) * frac),
        to_u8(a[2] + (b[2] - a[2]) * frac),
    ]
}

// Anchors at t = 0, 1/8, ..., 1 (sRGB, 0..1).

const CIVIDIS: [[f32; 3]; 9] = [
    [0.000000, 0.135112, 0.304751],
    [0.125000, 0.218000, 0.427000],
    [0.263000, 0.309000, 0.421000],
    [0.372000, 0.394000, 0.436000],
    [0.484000, 0.484000, 0.471000],
    [0.600000, 0.576000, 0.468000],
    [0.727000, 0.677000, 0.430000],
    [0.859000, 0.787000, 0.347000],
    [0.995737, 0.909344, 0.217772],
];

const TURBO: [[f32; 3]; 9] = [
    [0.189950, 0.071760, 0.232170],
    [0.255200, 0.406300, 0.887300],
    [0.160900, 0.688300, 0.980600],
    [0.190000, 0.910000, 0.680000],
    [0.644900, 0.987300, 0.233300],
    [0.929200, 0.823400, 0.220000],
    [0.992500, 0.555100, 0.134900],
    [0.848000, 0.261800, 0.028300],
    [0.479600, 0.015830, 0.010550],
];

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Colormap::from_name("magma"), Colormap::Magma);
        assert_eq!(Colormap::from_name("VIRIDIS"), Colormap::Viridis);
        assert_eq!(Colormap::from_name("gray"), Colormap::Greyscale);
    }

    #[test]
    fn unknown_name_falls_back_to_plasma() {
        assert_eq!(Colormap::from_name("Plamsa"), Colormap::Plasma);
        assert_eq!(Colormap::from_name(""), Colormap::Plasma);
    }

    #[test]
    fn display_round_trips_through_parse() {
        for colormap in Colormap::iter() {
            assert_eq!(Colormap::from_name(&colormap.to_string()), colormap);
        }
    }

    #[test]
    fn inverted_set() {
        let inverted: Vec<_> = Colormap::iter().filter(|c| c.is_inverted()).collect();
        assert_eq!(
            inverted,
            vec![Colormap::Inferno, Colormap::Cividis, Colormap::Magma]
        );
    }

    #[test]
    fn lut_endpoints_match_tables() {
        let lut = Colormap::Plasma.lut();
        assert_eq!(lut.apply(0), [13, 8, 135]);
        assert_eq!(lut.apply(255), [240, 249, 33]);
        assert_eq!(lut.apply(255), Colormap::Plasma.sample(1.0));
    }

    #[test]
    fn full_tables_match_matplotlib() {
        assert_eq!(Colormap::Viridis.lut().apply(128), [33, 145, 140]);
        assert_eq!(Colormap::Magma.lut().apply(200), [253, 152, 105]);
        assert_eq!(Colormap::Inferno.lut().apply(32), [33, 12, 74]);
        assert_eq!(Colormap::Plasma.lut().apply(205), [252, 168, 53]);
    }

    #[test]
    fn every_level_hits_its_table_entry() {
        let palettes = [
            (Colormap::Plasma, &tables::PLASMA),
            (Colormap::Viridis, &tables::VIRIDIS),
            (Colormap::Inferno, &tables::INFERNO),
            (Colormap::Magma, &tables::MAGMA),
        ];
        for (colormap, table) in palettes {
            let lut = colormap.lut();
            for (level, rgb) in table.iter().enumerate() {
                let expected = [to_u8(rgb[0]), to_u8(rgb[1]), to_u8(rgb[2])];
                let got = lut.apply(level as u8);
                for c in 0..3 {
                    assert!(
                        got[c].abs_diff(expected[c]) <= 1,
                        "{colormap} level {level}: {got:?} vs {expected:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn greyscale_is_identity() {
        let lut = Colormap::Greyscale.lut();
        for v in [0u8, 1, 77, 128, 254, 255] {
            assert_eq!(lut.apply(v), [v, v, v]);
        }
    }

    #[test]
    fn legend_is_reversed_for_inverted_palettes() {
        assert_eq!(
            Colormap::Magma.legend_color(0.0),
            Colormap::Magma.sample(1.0)
        );
        assert_eq!(
            Colormap::Viridis.legend_color(0.25),
            Colormap::Viridis.sample(0.25)
        );
    }

    #[test]
    fn sample_clamps_out_of_range() {
        assert_eq!(Colormap::Turbo.sample(-3.0), Colormap::Turbo.sample(0.0));
        assert_eq!(Colormap::Turbo.sample(7.0), Colormap::Turbo.sample(1.0));
        assert_eq!(Colormap::Turbo.sample(f32::NAN), Colormap::Turbo.sample(0.0));
    }
}
