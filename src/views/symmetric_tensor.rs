use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use crate::flags::UpdateFlags;
use crate::kernels::{accumulate, reset};
use crate::mapping::Mapping;
use crate::output::ShapeData;
use crate::sparsity::ViewSparsity;
use crate::tensor::symmetric_unrolled_to_component_indices;
use crate::values::FEValuesBase;
use crate::views::{check_single_support, combine_shape_entries};
use fevalues_traits::{FieldValue, FieldVector, Real};
use nalgebra::{SMatrix, SVector};

/// Components of an element viewed as a symmetric rank-two tensor field.
///
/// The view selects `SPACEDIM * (SPACEDIM + 1) / 2` components, ordered as described by
/// [`symmetric_unrolled_to_component_indices`]. Values are returned as full symmetric matrices.
pub struct SymmetricTensorView<'v, 'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    fe_values: &'v FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>,
    sparsity: &'v ViewSparsity,
}

impl<'v, 'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> SymmetricTensorView<'v, 'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    pub(crate) fn new(fe_values: &'v FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>, sparsity: &'v ViewSparsity) -> Self {
        Self { fe_values, sparsity }
    }

    pub fn first_component(&self) -> usize {
        self.sparsity.first_component()
    }

    pub fn sparsity(&self) -> &ViewSparsity {
        self.sparsity
    }

    pub fn value(&self, shape_function: usize, q: usize) -> Result<SMatrix<T, SPACEDIM, SPACEDIM>, FeValuesError> {
        combine_shape_entries(
            self.fe_values,
            self.sparsity,
            UpdateFlags::VALUES,
            ShapeData::values,
            shape_function,
            q,
            SMatrix::zeros(),
            |out, d, v| {
                let (i, j) = symmetric_unrolled_to_component_indices(d, SPACEDIM);
                out[(i, j)] = *v;
                out[(j, i)] = *v;
            },
        )
    }

    /// The row-wise divergence of a shape function, `div(S)_i = sum_j dS_ij / dx_j`.
    pub fn divergence(&self, shape_function: usize, q: usize) -> Result<SVector<T, SPACEDIM>, FeValuesError> {
        check_single_support(self.sparsity, DIVERGENCE_OF_MULTIPLE)?;
        combine_shape_entries(
            self.fe_values,
            self.sparsity,
            UpdateFlags::GRADIENTS,
            ShapeData::gradients,
            shape_function,
            q,
            SVector::zeros(),
            |out, d, g| {
                let (i, j) = symmetric_unrolled_to_component_indices(d, SPACEDIM);
                out[i] += g[j];
                if i != j {
                    out[j] += g[i];
                }
            },
        )
    }

    fn values_from<N: FieldValue<T>>(&self, dof_values: &[N], values: &mut Vec<SMatrix<N, SPACEDIM, SPACEDIM>>) {
        reset(values, self.fe_values.n_quadrature_points(), SMatrix::zeros());
        let table = self.fe_values.shape_data().values();
        accumulate(dof_values, self.sparsity, table, values, |out, d, c, v| {
            let (i, j) = symmetric_unrolled_to_component_indices(d, SPACEDIM);
            out[(i, j)] += c * *v;
            if i != j {
                out[(j, i)] += c * *v;
            }
        });
    }

    fn divergences_from<N: FieldValue<T>>(&self, dof_values: &[N], divergences: &mut Vec<SVector<N, SPACEDIM>>) {
        reset(divergences, self.fe_values.n_quadrature_points(), SVector::zeros());
        let table = self.fe_values.shape_data().gradients();
        accumulate(dof_values, self.sparsity, table, divergences, |out, d, c, g| {
            add_divergence(out, d, c, g)
        });
    }

    function_queries!(
        get_function_values,
        get_function_values_from_local_dof_values,
        values_from,
        UpdateFlags::VALUES,
        SMatrix<N, SPACEDIM, SPACEDIM>
    );

    /// The row-wise divergence at every quadrature point.
    ///
    /// Fails with [`FeValuesError::Internal`] if a shape function of the element is nonzero in
    /// more than one of the selected components.
    pub fn get_function_divergences<V, N>(
        &self,
        fe_function: &V,
        divergences: &mut Vec<SVector<N, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        check_single_support(self.sparsity, DIVERGENCE_OF_MULTIPLE)?;
        self.fe_values
            .with_cell_dof_values(UpdateFlags::GRADIENTS, fe_function, |dofs| {
                self.divergences_from(dofs, divergences)
            })
    }

    pub fn get_function_divergences_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        divergences: &mut Vec<SVector<N, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        check_single_support(self.sparsity, DIVERGENCE_OF_MULTIPLE)?;
        self.fe_values
            .with_local_dof_values(UpdateFlags::GRADIENTS, dof_values, |dofs| {
                self.divergences_from(dofs, divergences)
            })
    }
}

const DIVERGENCE_OF_MULTIPLE: &str =
    "Divergence of symmetric tensor views with shape functions in several components is not implemented";

/// Adds the divergence contribution of unrolled component `d` with gradient `gradient`.
fn add_divergence<T, N, const SPACEDIM: usize>(
    divergence: &mut SVector<N, SPACEDIM>,
    d: usize,
    weight: N,
    gradient: &SVector<T, SPACEDIM>,
) where
    T: Real,
    N: FieldValue<T>,
{
    let (i, j) = symmetric_unrolled_to_component_indices(d, SPACEDIM);
    divergence[i] += weight * gradient[j];
    if i != j {
        divergence[j] += weight * gradient[i];
    }
}
