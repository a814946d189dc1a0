//! Views that extract one physical quantity from a possibly vector valued element.
//!
//! A view interprets a window of consecutive components of the element as a scalar, a vector,
//! a symmetric rank-two tensor or a general rank-two tensor field. Views are obtained from an
//! evaluation context with [`FEValuesBase::scalar`](crate::values::FEValuesBase::scalar) and its
//! siblings. They borrow the context and only read its present shape data, so a view can not
//! outlive a reinit.
//!
//! Every quantity is available in two forms: from a global coefficient vector, which is gathered
//! through the degree of freedom indices of the present cell, and `*_from_local_dof_values`,
//! which takes coefficients already in local order. The output vector is resized to the number
//! of quadrature points and only written if all preconditions hold.

use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use crate::flags::UpdateFlags;
use crate::mapping::Mapping;
use crate::output::{ShapeData, ShapeTable};
use crate::sparsity::ViewSparsity;
use crate::values::FEValuesBase;
use fevalues_traits::Real;

/// Generates the global and local form of a function query from a kernel method
/// `fn kernel<N>(&self, dof_values: &[N], output: &mut Vec<Output>)`.
macro_rules! function_queries {
    ($(#[$attr:meta])* $global:ident, $local:ident, $kernel:ident, $flag:expr, $output:ty) => {
        $(#[$attr])*
        pub fn $global<V, N>(&self, fe_function: &V, output: &mut Vec<$output>) -> Result<(), FeValuesError>
        where
            V: FieldVector<N> + ?Sized,
            N: FieldValue<T>,
        {
            self.fe_values
                .with_cell_dof_values($flag, fe_function, |dofs| self.$kernel(dofs, output))
        }

        pub fn $local<N>(&self, dof_values: &[N], output: &mut Vec<$output>) -> Result<(), FeValuesError>
        where
            N: FieldValue<T>,
        {
            self.fe_values
                .with_local_dof_values($flag, dof_values, |dofs| self.$kernel(dofs, output))
        }
    };
}

/// Combines the tabulated entries of all nonzero sub-components of one shape function at one
/// quadrature point.
#[allow(clippy::too_many_arguments)]
fn combine_shape_entries<T, M, E, C, S, O, F, const DIM: usize, const SPACEDIM: usize>(
    fe_values: &FEValuesBase<'_, T, M, E, C, DIM, SPACEDIM>,
    sparsity: &ViewSparsity,
    flag: UpdateFlags,
    table: fn(&ShapeData<T, SPACEDIM>) -> &ShapeTable<S>,
    shape_function: usize,
    q: usize,
    mut output: O,
    mut contribute: F,
) -> Result<O, FeValuesError>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
    S: Copy,
    F: FnMut(&mut O, usize, &S),
{
    fe_values.check_shape_access(flag, shape_function, q)?;
    let table = table(fe_values.shape_data());
    for d in 0..sparsity.width() {
        if let Some(row) = sparsity.row_index(shape_function, d) {
            contribute(&mut output, d, table.get(row, q));
        }
    }
    Ok(output)
}

/// Fails for views whose shape functions may be nonzero in several of the selected components.
fn check_single_support(sparsity: &ViewSparsity, quantity: &'static str) -> Result<(), FeValuesError> {
    if sparsity.has_multiple_support() {
        Err(FeValuesError::Internal(quantity))
    } else {
        Ok(())
    }
}

mod scalar;
mod symmetric_tensor;
mod tensor;
mod vector;

pub use scalar::ScalarView;
pub use symmetric_tensor::SymmetricTensorView;
pub use tensor::TensorView;
pub use vector::VectorView;
