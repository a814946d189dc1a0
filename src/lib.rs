pub mod cell;
pub mod element;
pub mod error;
pub mod flags;
pub mod mapping;
pub mod mesh;
pub mod output;
pub mod quadrature;
pub mod reference_cell;
pub mod signals;
pub mod similarity;
pub mod sparsity;
pub mod tensor;
pub mod values;
pub mod views;

pub(crate) mod kernels;
pub(crate) mod workspace;

#[cfg(feature = "proptest")]
pub mod proptest;

pub extern crate fevalues_traits;
pub extern crate nalgebra;

pub use error::{ErrorKind, FeValuesError};
pub use flags::UpdateFlags;
pub use similarity::{CellSimilarity, SimilarityDetection};
pub use values::{EvaluationSettings, FEFaceValues, FESubfaceValues, FEValues, FEValuesBase};
