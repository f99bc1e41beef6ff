//! Volume construction errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VolumeError>;

/// Reasons a volume cannot be built from the data a provider hands over.
#[derive(Debug, Error, PartialEq)]
pub enum VolumeError {
    #[error("volume dimensions must be positive, got {0:?}")]
    ZeroDimension([usize; 3]),

    #[error("data length {actual} does not match dimensions (expected {expected})")]
    DataLengthMismatch { expected: usize, actual: usize },

    #[error("voxel spacing must be positive and finite, got {0:?}")]
    InvalidSpacing([f64; 3]),

    #[error("volume dimensions {0:?} do not fit in memory")]
    ShapeOverflow([usize; 3]),

    #[error("unsupported channel count {0}, expected 1 or 3")]
    ChannelMismatch(usize),

    #[error("voxel-to-millimetre matrix does not map the voxel axes onto distinct world axes")]
    DegenerateAxes,

    #[error("voxel-to-millimetre matrix is not invertible")]
    SingularAffine,
}
