use crate::reference_cell::ReferenceCell;
use thiserror::Error;

/// Coarse classification of [`FeValuesError`].
///
/// Assembly code can use the kind to decide whether a failure points to a programming error
/// (the common case) or to bad input data such as mismatched vector sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The mapping, element and cell do not fit together.
    Configuration,
    /// A call was made in a state or with arguments it does not accept.
    Precondition,
    /// An index lies outside its valid range.
    Range,
    /// A code path that is known to be unsupported was reached.
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeValuesError {
    #[error("The mapping is not compatible with cells of type {0:?}")]
    IncompatibleMapping(ReferenceCell),
    #[error("The finite element assigned to the cell does not match the finite element of this object")]
    ElementMismatch,
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error(
        "You are requesting information from an object that is not initialized for this field. \
         Add `{0}` to the update flags."
    )]
    AccessToUninitializedField(&'static str),
    #[error("The object has not been reinitialized on any cell, or its mesh has changed since")]
    NotReinitialized,
    #[error("The present cell does not provide degree of freedom indices")]
    NeedsDofHandler,
    #[error("Dimension {actual} not equal to {expected}")]
    DimensionMismatch { actual: usize, expected: usize },
    #[error("Division of {dividend} by {divisor} has a non-zero remainder")]
    NotMultiple { dividend: usize, divisor: usize },
    #[error("Shape function {0} is not primitive")]
    NotPrimitive(usize),
    #[error("Subface values can only be computed on cells that are not refined")]
    RefinedCell,
    #[error("Index {index} is not in the half-open range [0, {end})")]
    IndexOutOfRange { index: usize, end: usize },
    #[error("Internal error: {0}")]
    Internal(&'static str),
}

impl FeValuesError {
    pub fn kind(&self) -> ErrorKind {
        use FeValuesError::*;
        match self {
            IncompatibleMapping(_) | ElementMismatch | InvalidConfiguration(_) => ErrorKind::Configuration,
            AccessToUninitializedField(_)
            | NotReinitialized
            | NeedsDofHandler
            | DimensionMismatch { .. }
            | NotMultiple { .. }
            | NotPrimitive(_)
            | RefinedCell => ErrorKind::Precondition,
            IndexOutOfRange { .. } => ErrorKind::Range,
            Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Returns an [`FeValuesError::IndexOutOfRange`] error unless `index < end`.
pub(crate) fn check_index(index: usize, end: usize) -> Result<(), FeValuesError> {
    if index < end {
        Ok(())
    } else {
        Err(FeValuesError::IndexOutOfRange { index, end })
    }
}

pub(crate) fn check_dimension(actual: usize, expected: usize) -> Result<(), FeValuesError> {
    if actual == expected {
        Ok(())
    } else {
        Err(FeValuesError::DimensionMismatch { actual, expected })
    }
}
