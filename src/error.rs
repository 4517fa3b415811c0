//! Error types for the optics core.
//!
//! Only genuine precondition violations and refused evaluations are errors.
//! Physical non-solutions such as total internal reflection or an evanescent
//! exit medium are ordinary values (NaN or zero) and never appear here.

use thiserror::Error;

/// Errors raised by dispersion models, solvers and the material registry.
#[derive(Debug, Error)]
pub enum OpticsError {
    #[error("wavelength must be positive and finite, got {0} m")]
    InvalidWavelength(f64),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("singular denominator in Sellmeier term {term} at wavelength {wavelength} m")]
    SingularDenominator { term: usize, wavelength: f64 },

    #[error("material not found: {0}")]
    MaterialNotFound(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OpticsError>;

impl OpticsError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
