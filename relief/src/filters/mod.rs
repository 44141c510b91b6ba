//! Grid filters used by the relighting and detail stages.
//!
//! All filters treat borders as reflect-101 (`dcb|abcd|cba`): the edge cell
//! is not repeated. Separable filters run a horizontal then a vertical pass,
//! each parallelised over rows.

#[cfg(test)]
mod tests;

use common::parallel::par_fill_rows;
use common::Grid;

/// Maps an out-of-range index back into `0..len` by reflect-101.
#[inline]
pub(crate) fn reflect_101(mut i: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    loop {
        if i < 0 {
            i = -i;
        } else if i > last {
            i = 2 * last - i;
        } else {
            return i as usize;
        }
    }
}

/// Normalized 1D Gaussian kernel of odd length `ksize`.
pub fn gaussian_kernel(ksize: usize, sigma: f32) -> Vec<f32> {
    assert!(ksize % 2 == 1, "Kernel size must be odd");
    assert!(sigma > 0.0, "Sigma must be positive");

    let half = (ksize / 2) as f32;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..ksize)
        .map(|i| {
            let x = i as f32 - half;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in &mut kernel {
        *v /= sum;
    }
    kernel
}

/// Convolves with `kernel` along rows, then along columns.
pub fn convolve_separable(input: &Grid<f32>, kernel: &[f32]) -> Grid<f32> {
    assert!(kernel.len() % 2 == 1, "Kernel size must be odd");
    if kernel.len() == 1 {
        let k = kernel[0];
        return input.map(|v| v * k);
    }
    let temp = convolve_rows(input, kernel);
    convolve_cols(&temp, kernel)
}

fn convolve_rows(input: &Grid<f32>, kernel: &[f32]) -> Grid<f32> {
    let (rows, cols) = input.shape();
    let radius = (kernel.len() / 2) as isize;
    let mut out = vec![0.0f32; rows * cols];

    par_fill_rows(&mut out, cols, |row, out_row| {
        let in_row = input.row(row);
        for (col, o) in out_row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (k, &w) in kernel.iter().enumerate() {
                let c = reflect_101(col as isize + k as isize - radius, cols);
                sum += in_row[c] * w;
            }
            *o = sum;
        }
    });

    Grid::new(rows, cols, out)
}

fn convolve_cols(input: &Grid<f32>, kernel: &[f32]) -> Grid<f32> {
    let (rows, cols) = input.shape();
    let radius = (kernel.len() / 2) as isize;
    let mut out = vec![0.0f32; rows * cols];

    par_fill_rows(&mut out, cols, |row, out_row| {
        for (k, &w) in kernel.iter().enumerate() {
            let src = input.row(reflect_101(row as isize + k as isize - radius, rows));
            for (o, &v) in out_row.iter_mut().zip(src) {
                *o += v * w;
            }
        }
    });

    Grid::new(rows, cols, out)
}

/// Gaussian blur with an odd kernel size.
pub fn gaussian_blur(input: &Grid<f32>, ksize: usize, sigma: f32) -> Grid<f32> {
    convolve_separable(input, &gaussian_kernel(ksize, sigma))
}

/// Normalized box filter (window mean) with an odd window size.
pub fn box_filter(input: &Grid<f32>, ksize: usize) -> Grid<f32> {
    assert!(ksize % 2 == 1, "Kernel size must be odd");
    let kernel = vec![1.0 / ksize as f32; ksize];
    convolve_separable(input, &kernel)
}

/// Horizontal derivative `f[c+1] - f[c-1]` (3-tap, no cross smoothing).
pub fn gradient_x(input: &Grid<f32>) -> Grid<f32> {
    let (rows, cols) = input.shape();
    let mut out = vec![0.0f32; rows * cols];

    par_fill_rows(&mut out, cols, |row, out_row| {
        let in_row = input.row(row);
        for (col, o) in out_row.iter_mut().enumerate() {
            let next = in_row[reflect_101(col as isize + 1, cols)];
            let prev = in_row[reflect_101(col as isize - 1, cols)];
            *o = next - prev;
        }
    });

    Grid::new(rows, cols, out)
}

/// Vertical derivative `f[r+1] - f[r-1]` (3-tap, no cross smoothing).
pub fn gradient_y(input: &Grid<f32>) -> Grid<f32> {
    let (rows, cols) = input.shape();
    let mut out = vec![0.0f32; rows * cols];

    par_fill_rows(&mut out, cols, |row, out_row| {
        let next = input.row(reflect_101(row as isize + 1, rows));
        let prev = input.row(reflect_101(row as isize - 1, rows));
        for ((o, &n), &p) in out_row.iter_mut().zip(next).zip(prev) {
            *o = n - p;
        }
    });

    Grid::new(rows, cols, out)
}

/// Self-guided edge-preserving smoothing (He, Sun, Tang 2012).
///
/// Fits `q = a * p + b` in every `(2 * radius + 1)^2` window. Flat windows
/// (variance << eps) collapse to the window mean, while strong edges
/// (variance >> eps) keep `a ~ 1` and pass through.
pub fn guided_filter(source: &Grid<f32>, radius: usize, eps: f32) -> Grid<f32> {
    assert!(eps > 0.0, "Eps must be positive");
    let ksize = 2 * radius + 1;

    let mean_p = box_filter(source, ksize);
    let mean_pp = box_filter(&source.map(|v| v * v), ksize);

    let a = mean_pp.zip_map(&mean_p, |&pp, &m| {
        let var = (pp - m * m).max(0.0);
        var / (var + eps)
    });
    let b = mean_p.zip_map(&a, |&m, &a| m - a * m);

    let mean_a = box_filter(&a, ksize);
    let mean_b = box_filter(&b, ksize);

    let scaled = mean_a.zip_map(source, |&a, &p| a * p);
    scaled.zip_map(&mean_b, |&ap, &b| ap + b)
}

/// Linearly rescales values to `[lo, hi]` using the grid's own extent.
///
/// A constant grid has no extent to stretch; every cell maps to `hi`.
pub fn normalize_min_max(input: &Grid<f32>, lo: f32, hi: f32) -> Grid<f32> {
    let Some((min, max)) = input.extent() else {
        return input.clone();
    };
    let range = max - min;
    if range <= 0.0 {
        return input.map(|_| hi);
    }
    let scale = (hi - lo) / range;
    input.map(|&v| (v - min) * scale + lo)
}
