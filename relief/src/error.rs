//! Error types for the relighting pipeline.

use std::time::Duration;

use thiserror::Error;

/// Errors surfaced by the render entry points.
///
/// Numeric edge cases inside a stage (flat gradients, singular covariance)
/// never show up here; they are resolved by the stage itself.
#[derive(Debug, Error)]
pub enum Error {
    /// Caller bug: the parameters or lenses cannot be honoured.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// Data bug: the density map cannot be rendered.
    #[error("degenerate input: {0}")]
    DegenerateInput(#[from] DegenerateInputError),

    /// The filter library did not become ready in time. Retryable.
    #[error("filter library not ready after {timeout:?}")]
    ResourceReadiness { timeout: Duration },

    /// The in-flight render disappeared before publishing a result.
    #[error("render task conflict: in-flight job vanished before publishing its result")]
    DispatchConflict,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unknown filter kind '{0}'")]
    UnknownFilter(String),

    #[error("filter radius must be positive, got {0}")]
    NonPositiveRadius(i64),

    #[error("gaussian sigma must be positive, got {0}")]
    NonPositiveSigma(f32),

    #[error("guided filter eps must be positive, got {0}")]
    NonPositiveEps(f32),

    #[error("filter '{filter}' requires parameter '{param}'")]
    MissingFilterParam {
        filter: &'static str,
        param: &'static str,
    },

    #[error("output size must be positive, got {width}x{height}")]
    EmptyOutput { width: u32, height: u32 },

    #[error("eta must be positive and finite, got {0}")]
    InvalidEta(f32),

    #[error("phi must be finite, got {0}")]
    InvalidPhi(f32),

    #[error("detail factor must be non-negative and finite, got {0}")]
    InvalidDetailFactor(f32),

    #[error("lens factor must be non-negative and finite, got {0}")]
    InvalidLensFactor(f32),

    #[error("value lens range is malformed: [{start}, {end}]")]
    MalformedValueLens { start: f32, end: f32 },

    #[error("region lens bounds are malformed: x {min_x}..={max_x}, y {min_y}..={max_y}")]
    MalformedRegionLens {
        min_x: i64,
        min_y: i64,
        max_x: i64,
        max_y: i64,
    },

    #[error("{values} values do not fill a {rows}x{cols} grid")]
    ShapeMismatch {
        rows: usize,
        cols: usize,
        values: usize,
    },

    #[error("baseline shape {baseline:?} does not match density shape {density:?}")]
    BaselineShape {
        density: (usize, usize),
        baseline: (usize, usize),
    },

    #[error("malformed request payload: {0}")]
    Payload(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DegenerateInputError {
    #[error("density map has no cells")]
    EmptyMap,

    #[error("density map holds a non-finite value at index {0}")]
    NonFinite(usize),

    #[error("no cells above the relevance threshold {threshold}")]
    NoRelevantCells { threshold: f32 },

    #[error("bandwidth selection needs at least one sample")]
    NoSamples,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_filter_message() {
        let err: Error = ConfigError::UnknownFilter("bilateral".into()).into();
        assert_eq!(
            err.to_string(),
            "invalid configuration: unknown filter kind 'bilateral'"
        );
    }

    #[test]
    fn readiness_message_mentions_timeout() {
        let err = Error::ResourceReadiness {
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.to_string(), "filter library not ready after 30s");
    }

    #[test]
    fn degenerate_input_converts() {
        let err: Error = DegenerateInputError::EmptyMap.into();
        assert!(matches!(
            err,
            Error::DegenerateInput(DegenerateInputError::EmptyMap)
        ));
    }
}
