//! Geometric mappings from reference cells to physical cells.
use crate::cell::Cell;
use crate::flags::UpdateFlags;
use crate::output::MappingData;
use crate::quadrature::{QCollection, Quadrature};
use crate::reference_cell::ReferenceCell;
use crate::similarity::CellSimilarity;
use fevalues_traits::Real;

mod affine;

pub use affine::*;

/// A map from reference cells of dimension `DIM` into a space of dimension `SPACEDIM`.
pub trait Mapping<T: Real, const DIM: usize, const SPACEDIM: usize>: Sync {
    type InternalData: Send;

    fn is_compatible_with(&self, reference_cell: ReferenceCell) -> bool;

    /// Additional flags the mapping needs in order to compute the requested ones.
    fn requires_update_flags(&self, flags: UpdateFlags) -> UpdateFlags;

    fn get_data(&self, flags: UpdateFlags, quadrature: &Quadrature<T>) -> Self::InternalData;

    fn get_face_data(&self, flags: UpdateFlags, quadrature: &QCollection<T>) -> Self::InternalData;

    fn get_subface_data(&self, flags: UpdateFlags, quadrature: &Quadrature<T>) -> Self::InternalData;

    /// Computes the geometric data of `cell` and returns the similarity that was actually
    /// exploited.
    fn fill_fe_values<C>(
        &self,
        cell: &C,
        similarity: CellSimilarity,
        quadrature: &Quadrature<T>,
        internal: &mut Self::InternalData,
        output: &mut MappingData<T, DIM, SPACEDIM>,
    ) -> CellSimilarity
    where
        C: Cell<T, SPACEDIM>;

    fn fill_fe_face_values<C>(
        &self,
        cell: &C,
        face_no: usize,
        quadrature: &QCollection<T>,
        internal: &mut Self::InternalData,
        output: &mut MappingData<T, DIM, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>;

    fn fill_fe_subface_values<C>(
        &self,
        cell: &C,
        face_no: usize,
        subface_no: usize,
        quadrature: &Quadrature<T>,
        internal: &mut Self::InternalData,
        output: &mut MappingData<T, DIM, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>;
}
