use common::Grid;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, DegenerateInputError, Result};

/// Immutable scalar field to be rendered, `rows x cols`, row-major.
///
/// Values are finite. They are usually non-negative densities, but a
/// difference against a coarser baseline may go below zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DensityMapWire", into = "DensityMapWire")]
pub struct DensityMap {
    grid: Grid<f32>,
}

impl DensityMap {
    pub fn new(rows: usize, cols: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(ConfigError::ShapeMismatch {
                rows,
                cols,
                values: values.len(),
            }
            .into());
        }
        if values.is_empty() {
            return Err(DegenerateInputError::EmptyMap.into());
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(DegenerateInputError::NonFinite(idx).into());
        }
        Ok(Self {
            grid: Grid::new(rows, cols, values),
        })
    }

    /// Builds a map from nested rows, as produced by KDE evaluation on a mesh.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != cols) {
            return Err(ConfigError::ShapeMismatch {
                rows: rows.len(),
                cols,
                values: cols * (rows.len() - 1) + bad.len(),
            }
            .into());
        }
        Self::new(rows.len(), cols, rows.concat())
    }

    /// Constant-valued map.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Result<Self> {
        Self::new(rows, cols, vec![value; rows * cols])
    }

    pub(crate) fn from_grid(grid: Grid<f32>) -> Self {
        debug_assert!(grid.cells().iter().all(|v| v.is_finite()));
        Self { grid }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.grid.shape()
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        self.grid.cells()
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        *self.grid.get(row, col)
    }

    #[inline]
    pub fn grid(&self) -> &Grid<f32> {
        &self.grid
    }

    /// `(min, max)` of the values.
    pub fn extent(&self) -> (f32, f32) {
        self.grid
            .extent()
            .expect("density maps are never empty")
    }

    /// Cell-wise `self - baseline`. Shapes must match.
    pub fn difference(&self, baseline: &DensityMap) -> Result<DensityMap> {
        if self.shape() != baseline.shape() {
            return Err(ConfigError::BaselineShape {
                density: self.shape(),
                baseline: baseline.shape(),
            }
            .into());
        }
        Ok(Self::from_grid(self.grid.zip_map(&baseline.grid, |a, b| a - b)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct DensityMapWire {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
}

impl TryFrom<DensityMapWire> for DensityMap {
    type Error = crate::error::Error;

    fn try_from(wire: DensityMapWire) -> Result<Self> {
        DensityMap::new(wire.rows, wire.cols, wire.values)
    }
}

impl From<DensityMap> for DensityMapWire {
    fn from(map: DensityMap) -> Self {
        let (rows, cols) = map.shape();
        Self {
            rows,
            cols,
            values: map.grid.into_cells(),
        }
    }
}
