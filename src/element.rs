//! Finite element descriptions consumed by evaluation contexts.
use crate::cell::Cell;
use crate::flags::UpdateFlags;
use crate::mapping::Mapping;
use crate::output::{MappingData, ShapeData};
use crate::quadrature::{QCollection, Quadrature};
use crate::reference_cell::ReferenceCell;
use crate::similarity::CellSimilarity;
use fevalues_traits::Real;
use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};

mod lagrange;
mod polynomial;
mod system;

pub use lagrange::*;
pub use system::*;

/// Summary of a finite element used to check that a cell and an evaluation context agree on
/// the element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementData {
    pub dofs_per_cell: usize,
    pub n_components: usize,
    pub degree: usize,
}

/// A finite element on a reference cell of dimension `DIM`, embedded in a space of dimension
/// `SPACEDIM`.
///
/// Elements tabulate their shape functions into a [`ShapeData`] whose rows follow the
/// [`ShapeFunctionToRowTable`](crate::sparsity::ShapeFunctionToRowTable) of the element.
/// Everything that depends only on the quadrature rule is computed once in `get_*data` and
/// kept in the internal data; the `fill_*` methods transform it for the present cell.
pub trait FiniteElement<T: Real, const DIM: usize, const SPACEDIM: usize>: Sync {
    type InternalData: Send;

    fn reference_cell(&self) -> ReferenceCell;

    fn n_components(&self) -> usize;

    fn n_dofs_per_cell(&self) -> usize;

    fn degree(&self) -> usize;

    fn element_data(&self) -> ElementData {
        ElementData {
            dofs_per_cell: self.n_dofs_per_cell(),
            n_components: self.n_components(),
            degree: self.degree(),
        }
    }

    /// The vector components in which shape function `shape_function` is not structurally zero.
    fn nonzero_components(&self, shape_function: usize) -> FixedBitSet;

    fn n_nonzero_components(&self, shape_function: usize) -> usize {
        self.nonzero_components(shape_function).count_ones(..)
    }

    /// Returns `true` if the shape function is nonzero in exactly one component.
    fn is_primitive_shape_function(&self, shape_function: usize) -> bool {
        self.n_nonzero_components(shape_function) == 1
    }

    fn is_primitive(&self) -> bool {
        (0..self.n_dofs_per_cell()).all(|i| self.is_primitive_shape_function(i))
    }

    /// For a primitive shape function, its component and its index among the shape functions
    /// of that component.
    ///
    /// # Panics
    ///
    /// Panics if the shape function is not primitive.
    fn system_to_component_index(&self, shape_function: usize) -> (usize, usize) {
        assert!(
            self.is_primitive_shape_function(shape_function),
            "Shape function {} is not primitive",
            shape_function
        );
        let component = self
            .nonzero_components(shape_function)
            .ones()
            .next()
            .expect("Primitive shape functions have one nonzero component");
        let index = (0..shape_function)
            .filter(|&j| self.is_primitive_shape_function(j) && self.nonzero_components(j).contains(component))
            .count();
        (component, index)
    }

    /// Additional flags the element needs in order to compute the requested ones.
    fn requires_update_flags(&self, flags: UpdateFlags) -> UpdateFlags;

    fn get_data<M>(
        &self,
        flags: UpdateFlags,
        mapping: &M,
        quadrature: &Quadrature<T>,
        output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>;

    fn get_face_data<M>(
        &self,
        flags: UpdateFlags,
        mapping: &M,
        quadrature: &QCollection<T>,
        output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>;

    fn get_subface_data<M>(
        &self,
        flags: UpdateFlags,
        mapping: &M,
        quadrature: &Quadrature<T>,
        output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>;

    #[allow(clippy::too_many_arguments)]
    fn fill_fe_values<C, M>(
        &self,
        cell: &C,
        similarity: CellSimilarity,
        quadrature: &Quadrature<T>,
        mapping: &M,
        mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>;

    #[allow(clippy::too_many_arguments)]
    fn fill_fe_face_values<C, M>(
        &self,
        cell: &C,
        face_no: usize,
        quadrature: &QCollection<T>,
        mapping: &M,
        mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>;

    #[allow(clippy::too_many_arguments)]
    fn fill_fe_subface_values<C, M>(
        &self,
        cell: &C,
        face_no: usize,
        subface_no: usize,
        quadrature: &Quadrature<T>,
        mapping: &M,
        mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>;
}
