use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use crate::flags::UpdateFlags;
use crate::kernels::{accumulate, reset};
use crate::mapping::Mapping;
use crate::output::ShapeData;
use crate::sparsity::ViewSparsity;
use crate::tensor::{tensor3_zeros, tensor_unrolled_to_component_indices, Tensor3};
use crate::values::FEValuesBase;
use crate::views::{check_single_support, combine_shape_entries};
use fevalues_traits::{FieldValue, FieldVector, Real};
use nalgebra::{SMatrix, SVector};

/// `SPACEDIM * SPACEDIM` components of an element viewed as a general rank-two tensor field,
/// unrolled in row-major order.
pub struct TensorView<'v, 'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    fe_values: &'v FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>,
    sparsity: &'v ViewSparsity,
}

impl<'v, 'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> TensorView<'v, 'a, T, M, E, C, DIM, SPACEDIM>
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
            |out, d, v| out[tensor_unrolled_to_component_indices(d, SPACEDIM)] = *v,
        )
    }

    /// The row-wise divergence of a shape function.
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
                let (i, j) = tensor_unrolled_to_component_indices(d, SPACEDIM);
                out[i] += g[j];
            },
        )
    }

    /// The gradient of a shape function, `grad[i][(j, k)] = dT_ij / dx_k`.
    pub fn gradient(&self, shape_function: usize, q: usize) -> Result<Tensor3<T, SPACEDIM>, FeValuesError> {
        check_single_support(self.sparsity, GRADIENT_OF_MULTIPLE)?;
        combine_shape_entries(
            self.fe_values,
            self.sparsity,
            UpdateFlags::GRADIENTS,
            ShapeData::gradients,
            shape_function,
            q,
            tensor3_zeros(),
            |out, d, g| {
                let (i, j) = tensor_unrolled_to_component_indices(d, SPACEDIM);
                out[i].row_mut(j).copy_from(&g.transpose());
            },
        )
    }

    fn values_from<N: FieldValue<T>>(&self, dof_values: &[N], values: &mut Vec<SMatrix<N, SPACEDIM, SPACEDIM>>) {
        reset(values, self.fe_values.n_quadrature_points(), SMatrix::zeros());
        let table = self.fe_values.shape_data().values();
        accumulate(dof_values, self.sparsity, table, values, |out, d, c, v| {
            out[tensor_unrolled_to_component_indices(d, SPACEDIM)] += c * *v
        });
    }

    fn divergences_from<N: FieldValue<T>>(&self, dof_values: &[N], divergences: &mut Vec<SVector<N, SPACEDIM>>) {
        reset(divergences, self.fe_values.n_quadrature_points(), SVector::zeros());
        let table = self.fe_values.shape_data().gradients();
        accumulate(dof_values, self.sparsity, table, divergences, |out, d, c, g| {
            let (i, j) = tensor_unrolled_to_component_indices(d, SPACEDIM);
            out[i] += c * g[j];
        });
    }

    fn gradients_from<N: FieldValue<T>>(&self, dof_values: &[N], gradients: &mut Vec<Tensor3<N, SPACEDIM>>) {
        reset(gradients, self.fe_values.n_quadrature_points(), tensor3_zeros());
        let table = self.fe_values.shape_data().gradients();
        accumulate(dof_values, self.sparsity, table, gradients, |out, d, c, g| {
            let (i, j) = tensor_unrolled_to_component_indices(d, SPACEDIM);
            for k in 0..SPACEDIM {
                out[i][(j, k)] += c * g[k];
            }
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

    pub fn get_function_gradients<V, N>(
        &self,
        fe_function: &V,
        gradients: &mut Vec<Tensor3<N, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        check_single_support(self.sparsity, GRADIENT_OF_MULTIPLE)?;
        self.fe_values
            .with_cell_dof_values(UpdateFlags::GRADIENTS, fe_function, |dofs| self.gradients_from(dofs, gradients))
    }

    pub fn get_function_gradients_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        gradients: &mut Vec<Tensor3<N, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        check_single_support(self.sparsity, GRADIENT_OF_MULTIPLE)?;
        self.fe_values
            .with_local_dof_values(UpdateFlags::GRADIENTS, dof_values, |dofs| self.gradients_from(dofs, gradients))
    }
}

const DIVERGENCE_OF_MULTIPLE: &str =
    "Divergence of tensor views with shape functions in several components is not implemented";
const GRADIENT_OF_MULTIPLE: &str =
    "Gradient of tensor views with shape functions in several components is not implemented";
