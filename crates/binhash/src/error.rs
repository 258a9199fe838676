//! Setup-time errors.
//!
//! Nothing in the per-step path fails: out-of-domain cells are reported as
//! [`Bucket::OutOfDomain`](crate::locate::Bucket) and skipped. Only the
//! configuration boundary can reject input.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// `h` must be finite and strictly positive.
    #[error("interaction radius must be finite and positive, got {0}")]
    InvalidRadius(f32),

    /// `1/h` produces more cells per axis than an `i32` coordinate can hold.
    #[error("interaction radius {0} is too small to quantize the unit domain")]
    RadiusTooSmall(f32),

    #[error("invalid grid config: {0}")]
    Json(#[from] serde_json::Error),
}
