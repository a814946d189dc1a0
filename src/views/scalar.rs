use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use crate::flags::UpdateFlags;
use crate::kernels::{accumulate, reset};
use crate::mapping::Mapping;
use crate::output::ShapeTable;
use crate::sparsity::ViewSparsity;
use crate::tensor::{add_scaled, add_scaled_tensor3, tensor3_zeros, Tensor3};
use crate::values::FEValuesBase;
use fevalues_traits::{FieldValue, FieldVector, Real};
use nalgebra::{SMatrix, SVector};

/// A single component of an element, viewed as a scalar field.
pub struct ScalarView<'v, 'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    fe_values: &'v FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>,
    sparsity: &'v ViewSparsity,
}

impl<'v, 'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> ScalarView<'v, 'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    pub(crate) fn new(fe_values: &'v FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>, sparsity: &'v ViewSparsity) -> Self {
        Self { fe_values, sparsity }
    }

    pub fn component(&self) -> usize {
        self.sparsity.first_component()
    }

    pub fn sparsity(&self) -> &ViewSparsity {
        self.sparsity
    }

    fn entry<S: Copy>(&self, table: &ShapeTable<S>, shape_function: usize, q: usize, zero: S) -> S {
        self.sparsity
            .row_index(shape_function, 0)
            .map_or(zero, |row| *table.get(row, q))
    }

    /// The value of the selected component of a shape function at quadrature point `q`.
    pub fn value(&self, shape_function: usize, q: usize) -> Result<T, FeValuesError> {
        self.fe_values
            .check_shape_access(UpdateFlags::VALUES, shape_function, q)?;
        let values = self.fe_values.shape_data().values();
        Ok(self.entry(values, shape_function, q, T::zero()))
    }

    pub fn gradient(&self, shape_function: usize, q: usize) -> Result<SVector<T, SPACEDIM>, FeValuesError> {
        self.fe_values
            .check_shape_access(UpdateFlags::GRADIENTS, shape_function, q)?;
        let gradients = self.fe_values.shape_data().gradients();
        Ok(self.entry(gradients, shape_function, q, SVector::zeros()))
    }

    pub fn hessian(&self, shape_function: usize, q: usize) -> Result<SMatrix<T, SPACEDIM, SPACEDIM>, FeValuesError> {
        self.fe_values
            .check_shape_access(UpdateFlags::HESSIANS, shape_function, q)?;
        let hessians = self.fe_values.shape_data().hessians();
        Ok(self.entry(hessians, shape_function, q, SMatrix::zeros()))
    }

    pub fn third_derivative(&self, shape_function: usize, q: usize) -> Result<Tensor3<T, SPACEDIM>, FeValuesError> {
        self.fe_values
            .check_shape_access(UpdateFlags::THIRD_DERIVATIVES, shape_function, q)?;
        let third_derivatives = self.fe_values.shape_data().third_derivatives();
        Ok(self.entry(third_derivatives, shape_function, q, tensor3_zeros()))
    }

    fn evaluate<N, S, O, F>(&self, dof_values: &[N], table: &ShapeTable<S>, zero: O, output: &mut Vec<O>, mut contribute: F)
    where
        N: FieldValue<T>,
        S: Copy,
        O: Clone,
        F: FnMut(&mut O, N, &S),
    {
        reset(output, self.fe_values.n_quadrature_points(), zero);
        accumulate(dof_values, self.sparsity, table, output, |out, _, c, entry| contribute(out, c, entry));
    }

    fn values_from<N: FieldValue<T>>(&self, dof_values: &[N], values: &mut Vec<N>) {
        let table = self.fe_values.shape_data().values();
        self.evaluate(dof_values, table, N::zero(), values, |out, c, v| *out += c * *v);
    }

    fn gradients_from<N: FieldValue<T>>(&self, dof_values: &[N], gradients: &mut Vec<SVector<N, SPACEDIM>>) {
        let table = self.fe_values.shape_data().gradients();
        self.evaluate(dof_values, table, SVector::zeros(), gradients, |out, c, g| add_scaled(out, c, g));
    }

    fn hessians_from<N: FieldValue<T>>(&self, dof_values: &[N], hessians: &mut Vec<SMatrix<N, SPACEDIM, SPACEDIM>>) {
        let table = self.fe_values.shape_data().hessians();
        self.evaluate(dof_values, table, SMatrix::zeros(), hessians, |out, c, h| add_scaled(out, c, h));
    }

    fn laplacians_from<N: FieldValue<T>>(&self, dof_values: &[N], laplacians: &mut Vec<N>) {
        let table = self.fe_values.shape_data().hessians();
        self.evaluate(dof_values, table, N::zero(), laplacians, |out, c, h| *out += c * h.trace());
    }

    fn third_derivatives_from<N: FieldValue<T>>(&self, dof_values: &[N], third_derivatives: &mut Vec<Tensor3<N, SPACEDIM>>) {
        let table = self.fe_values.shape_data().third_derivatives();
        self.evaluate(dof_values, table, tensor3_zeros(), third_derivatives, |out, c, t| {
            add_scaled_tensor3(out, c, t)
        });
    }

    function_queries!(
        get_function_values,
        get_function_values_from_local_dof_values,
        values_from,
        UpdateFlags::VALUES,
        N
    );

    function_queries!(
        get_function_gradients,
        get_function_gradients_from_local_dof_values,
        gradients_from,
        UpdateFlags::GRADIENTS,
        SVector<N, SPACEDIM>
    );

    function_queries!(
        get_function_hessians,
        get_function_hessians_from_local_dof_values,
        hessians_from,
        UpdateFlags::HESSIANS,
        SMatrix<N, SPACEDIM, SPACEDIM>
    );

    function_queries!(
        /// The trace of the Hessian at every quadrature point.
        get_function_laplacians,
        get_function_laplacians_from_local_dof_values,
        laplacians_from,
        UpdateFlags::HESSIANS,
        N
    );

    function_queries!(
        get_function_third_derivatives,
        get_function_third_derivatives_from_local_dof_values,
        third_derivatives_from,
        UpdateFlags::THIRD_DERIVATIVES,
        Tensor3<N, SPACEDIM>
    );
}
