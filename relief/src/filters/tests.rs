//! Tests for the grid filters.

use super::*;

fn ramp(rows: usize, cols: usize) -> Grid<f32> {
    let cells = (0..rows * cols).map(|i| (i % cols) as f32).collect();
    Grid::new(rows, cols, cells)
}

fn step(rows: usize, cols: usize, low: f32, high: f32) -> Grid<f32> {
    let cells = (0..rows * cols)
        .map(|i| if i % cols < cols / 2 { low } else { high })
        .collect();
    Grid::new(rows, cols, cells)
}

// ============================================================================
// Border handling
// ============================================================================

#[test]
fn test_reflect_101() {
    assert_eq!(reflect_101(-1, 5), 1);
    assert_eq!(reflect_101(-2, 5), 2);
    assert_eq!(reflect_101(5, 5), 3);
    assert_eq!(reflect_101(6, 5), 2);
    assert_eq!(reflect_101(3, 5), 3);
    assert_eq!(reflect_101(-7, 1), 0);
    // Reflection repeats for offsets larger than the grid.
    assert_eq!(reflect_101(9, 3), 1);
}

// ============================================================================
// Kernels
// ============================================================================

#[test]
fn test_gaussian_kernel_normalization() {
    for (ksize, sigma) in [(3, 0.5), (5, 1.0), (9, 3.0), (21, 2.0)] {
        let kernel = gaussian_kernel(ksize, sigma);
        assert_eq!(kernel.len(), ksize);
        let sum: f32 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "sum {} for ksize={}", sum, ksize);
    }
}

#[test]
fn test_gaussian_kernel_symmetric_peak() {
    let kernel = gaussian_kernel(7, 1.5);
    for i in 0..3 {
        assert!((kernel[i] - kernel[6 - i]).abs() < 1e-7);
        assert!(kernel[i] < kernel[3]);
    }
}

#[test]
#[should_panic(expected = "Kernel size must be odd")]
fn test_gaussian_kernel_even_size_panics() {
    gaussian_kernel(4, 1.0);
}

#[test]
#[should_panic(expected = "Sigma must be positive")]
fn test_gaussian_kernel_zero_sigma_panics() {
    gaussian_kernel(3, 0.0);
}

// ============================================================================
// Convolution
// ============================================================================

#[test]
fn test_single_tap_blur_is_identity() {
    let grid = ramp(4, 6);
    assert_eq!(gaussian_blur(&grid, 1, 2.0), grid);
}

#[test]
fn test_blur_preserves_constant() {
    let grid = Grid::new_filled(9, 13, 4.25f32);
    for out in [gaussian_blur(&grid, 7, 2.0), box_filter(&grid, 11)] {
        for &v in out.cells() {
            assert!((v - 4.25).abs() < 1e-5);
        }
    }
}

#[test]
fn test_blur_preserves_linear_ramp_interior() {
    // A symmetric kernel leaves a linear function unchanged away from borders.
    let grid = ramp(5, 20);
    let out = gaussian_blur(&grid, 5, 1.0);
    for row in 0..5 {
        for col in 2..18 {
            assert!((out[(row, col)] - col as f32).abs() < 1e-4);
        }
    }
}

#[test]
fn test_box_filter_three_tap_mean() {
    let grid = Grid::new(1, 5, vec![0.0, 3.0, 6.0, 9.0, 12.0]);
    let out = box_filter(&grid, 3);
    // Vertical pass over a single row reflects onto itself.
    assert!((out[(0, 2)] - 6.0).abs() < 1e-5);
    // Left border: (3 + 0 + 3) / 3
    assert!((out[(0, 0)] - 2.0).abs() < 1e-5);
}

#[test]
fn test_kernel_larger_than_grid() {
    let grid = Grid::new(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
    let out = box_filter(&grid, 11);
    for &v in out.cells() {
        assert!(v.is_finite());
        assert!((1.0..=4.0).contains(&v));
    }
}

// ============================================================================
// Gradients
// ============================================================================

#[test]
fn test_gradient_x_of_ramp() {
    let grid = ramp(3, 6);
    let gx = gradient_x(&grid);
    for row in 0..3 {
        assert_eq!(gx[(row, 0)], 0.0);
        assert_eq!(gx[(row, 5)], 0.0);
        for col in 1..5 {
            assert_eq!(gx[(row, col)], 2.0);
        }
    }
    let gy = gradient_y(&grid);
    assert!(gy.cells().iter().all(|&v| v == 0.0));
}

#[test]
fn test_gradient_y_matches_transpose() {
    let cells = (0..4 * 3).map(|i| (i / 3) as f32 * 1.5).collect();
    let grid = Grid::new(4, 3, cells);
    let gy = gradient_y(&grid);
    assert_eq!(gy[(0, 1)], 0.0);
    assert_eq!(gy[(1, 1)], 3.0);
    assert_eq!(gy[(2, 2)], 3.0);
    assert_eq!(gy[(3, 0)], 0.0);
}

// ============================================================================
// Guided filter
// ============================================================================

#[test]
fn test_guided_filter_constant_is_fixed_point() {
    let grid = Grid::new_filled(6, 6, 2.0f32);
    let out = guided_filter(&grid, 2, 0.01);
    for &v in out.cells() {
        assert!((v - 2.0).abs() < 1e-5);
    }
}

#[test]
fn test_guided_filter_flat_noise_is_smoothed() {
    // Tiny fluctuations relative to eps are averaged out.
    let cells = (0..64).map(|i| 1.0 + if i % 2 == 0 { 0.01 } else { -0.01 }).collect();
    let grid = Grid::new(8, 8, cells);
    let out = guided_filter(&grid, 1, 1.0);
    let spread = out.cells().iter().fold(0.0f32, |m, &v| m.max((v - 1.0).abs()));
    assert!(spread < 0.005, "spread {}", spread);
}

#[test]
fn test_guided_filter_keeps_step_edge() {
    let grid = step(8, 16, 0.0, 1.0);
    let guided = guided_filter(&grid, 1, 0.01);
    let blurred = gaussian_blur(&grid, 3, 1.0);
    let edge_err = |out: &Grid<f32>| -> f32 {
        (0..8)
            .map(|row| {
                let a = out[(row, 7)] - grid[(row, 7)];
                let b = out[(row, 8)] - grid[(row, 8)];
                a * a + b * b
            })
            .sum()
    };
    assert!(edge_err(&guided) < edge_err(&blurred));
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn test_normalize_min_max() {
    let grid = Grid::new(1, 3, vec![-1.0, 0.0, 3.0]);
    let out = normalize_min_max(&grid, 0.0, 255.0);
    assert_eq!(out.cells(), &[0.0, 63.75, 255.0]);
}

#[test]
fn test_normalize_constant_maps_to_upper_bound() {
    let grid = Grid::new_filled(3, 3, 5.0f32);
    let out = normalize_min_max(&grid, 0.0, 255.0);
    assert!(out.cells().iter().all(|&v| v == 255.0));
}
