//! Error taxonomy for element validation, grid construction and propagation.

use thiserror::Error;
use crate::kepler::KeplerError;

/// Errors raised by the propagation core.
///
/// Every variant is fatal for the run that produced it: bad input is
/// rejected before any sample is computed, and a solver failure aborts the
/// run at the sample where it occurred.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropagationError {
    #[error("Invalid orbital element '{field}' = {value}: {reason}")]
    InvalidElements {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Invalid time grid '{field}' = {value}: {reason}")]
    InvalidGrid {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Kepler solver failed at sample {index} (t = {epoch} s): {source}")]
    NonConvergence {
        index: usize,
        epoch: f64,
        source: KeplerError,
    },
}

impl PropagationError {
    pub(crate) fn elements(field: &'static str, value: f64, reason: &'static str) -> Self {
        PropagationError::InvalidElements { field, value, reason }
    }

    pub(crate) fn grid(field: &'static str, value: f64, reason: &'static str) -> Self {
        PropagationError::InvalidGrid { field, value, reason }
    }

    /// Name of the input field responsible for the failure, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            PropagationError::InvalidElements { field, .. }
            | PropagationError::InvalidGrid { field, .. } => Some(field),
            PropagationError::NonConvergence { .. } => None,
        }
    }

    /// Epoch offset (s) of the failing sample for mid-run failures.
    pub fn epoch(&self) -> Option<f64> {
        match self {
            PropagationError::NonConvergence { epoch, .. } => Some(*epoch),
            _ => None,
        }
    }
}
