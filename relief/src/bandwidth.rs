//! Kernel density bandwidth selection.

use crate::error::{DegenerateInputError, Result};

/// `Phi^-1(0.75) - Phi^-1(0.25)` for the standard normal.
const NORMAL_IQR: f64 = 1.3489795003921634;

/// `Phi^-1(0.99) - Phi^-1(0.01)` for the standard normal.
const NORMAL_SPREAD_98: f64 = 4.6526957480816815;

/// Silverman's rule of thumb for 2D samples, the smaller of the two axes.
///
/// Per axis `h = min(std, IQR / 1.349) * (3n / 4)^(-1/5)`. Axes with no
/// interquartile spread fall back to the 1st to 99th percentile spread, and
/// to `h = 1` when that is zero as well. A single sample gives 1.
pub fn silverman_bandwidth(samples: &[[f64; 2]]) -> Result<f64> {
    let n = samples.len();
    match n {
        0 => return Err(DegenerateInputError::NoSamples.into()),
        1 => return Ok(1.0),
        _ => {}
    }

    let factor = (n as f64 * 3.0 / 4.0).powf(-0.2);
    let bandwidth = (0..2)
        .map(|axis| {
            let mut values: Vec<f64> = samples.iter().map(|s| s[axis]).collect();
            values.sort_by(f64::total_cmp);
            axis_bandwidth(&values, factor)
        })
        .fold(f64::INFINITY, f64::min);
    Ok(bandwidth)
}

fn axis_bandwidth(sorted: &[f64], factor: f64) -> f64 {
    let iqr = (quantile(sorted, 0.75) - quantile(sorted, 0.25)) / NORMAL_IQR;
    let sigma = std_dev(sorted).min(iqr);
    if sigma > 0.0 {
        return sigma * factor;
    }
    let spread = (quantile(sorted, 0.99) - quantile(sorted, 0.01)) / NORMAL_SPREAD_98;
    if spread > 0.0 {
        spread * factor
    } else {
        1.0
    }
}

/// Unbiased (`n - 1`) standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (ss / (n - 1.0)).sqrt()
}

/// Quantile of sorted data with linear interpolation between order
/// statistics.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
