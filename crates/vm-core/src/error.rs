use thiserror::Error;

/// Errors shared by every stage of the vessel pipeline.
///
/// `Configuration` and `DataShape` are raised before any computation starts.
/// `NumericAnomaly` means a non-finite value reached a stage that has no
/// defined semantics for it (usually a preprocessing defect upstream).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    DataShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("non-finite value in {stage} at pixel index {index}")]
    NumericAnomaly { stage: &'static str, index: usize },
    #[error("size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("invalid stride")]
    InvalidStride,
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }
}

pub type Result<T> = core::result::Result<T, Error>;

/// Fails with [`Error::DataShape`] unless both dimension pairs agree.
pub fn ensure_same_dims(expected: (usize, usize), actual: (usize, usize)) -> Result<()> {
    if expected != actual {
        return Err(Error::DataShape { expected, actual });
    }
    Ok(())
}

/// Returns the first non-finite sample as [`Error::NumericAnomaly`].
pub fn ensure_finite(stage: &'static str, data: &[f32]) -> Result<()> {
    match data.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(Error::NumericAnomaly { stage, index }),
        None => Ok(()),
    }
}
