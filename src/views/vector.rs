use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use crate::flags::UpdateFlags;
use crate::kernels::{accumulate, reset};
use crate::mapping::Mapping;
use crate::output::{ShapeData, ShapeTable};
use crate::sparsity::ViewSparsity;
use crate::tensor::{add_scaled, add_scaled_tensor3, tensor3_zeros, CurlDimension, Tensor3};
use crate::values::FEValuesBase;
use crate::views::combine_shape_entries;
use fevalues_traits::{FieldValue, FieldVector, Real};
use nalgebra::{Const, SMatrix, SVector};
use numeric_literals::replace_float_literals;

/// `SPACEDIM` consecutive components of an element, viewed as a vector field.
///
/// Gradients are returned with one row per vector component, i.e. `grad[(i, j)]` is the
/// derivative of component `i` with respect to coordinate `j`. Hessians are returned as one
/// matrix per component, and third derivatives as one rank-three tensor per component.
pub struct VectorView<'v, 'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    fe_values: &'v FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>,
    sparsity: &'v ViewSparsity,
}

impl<'v, 'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> VectorView<'v, 'a, T, M, E, C, DIM, SPACEDIM>
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

    #[allow(clippy::too_many_arguments)]
    fn shape_entry<S, O, F>(
        &self,
        flag: UpdateFlags,
        table: fn(&ShapeData<T, SPACEDIM>) -> &ShapeTable<S>,
        shape_function: usize,
        q: usize,
        output: O,
        contribute: F,
    ) -> Result<O, FeValuesError>
    where
        S: Copy,
        F: FnMut(&mut O, usize, &S),
    {
        combine_shape_entries(self.fe_values, self.sparsity, flag, table, shape_function, q, output, contribute)
    }

    pub fn value(&self, shape_function: usize, q: usize) -> Result<SVector<T, SPACEDIM>, FeValuesError> {
        self.shape_entry(
            UpdateFlags::VALUES,
            ShapeData::values,
            shape_function,
            q,
            SVector::zeros(),
            |out, d, v| out[d] = *v,
        )
    }

    pub fn gradient(&self, shape_function: usize, q: usize) -> Result<SMatrix<T, SPACEDIM, SPACEDIM>, FeValuesError> {
        self.shape_entry(
            UpdateFlags::GRADIENTS,
            ShapeData::gradients,
            shape_function,
            q,
            SMatrix::zeros(),
            |out, d, g| out.row_mut(d).copy_from(&g.transpose()),
        )
    }

    /// The symmetric part of the gradient of a shape function.
    pub fn symmetric_gradient(
        &self,
        shape_function: usize,
        q: usize,
    ) -> Result<SMatrix<T, SPACEDIM, SPACEDIM>, FeValuesError> {
        let gradient = self.gradient(shape_function, q)?;
        Ok((gradient + gradient.transpose()) * T::from_f64(0.5).expect("Literal must fit in T"))
    }

    pub fn divergence(&self, shape_function: usize, q: usize) -> Result<T, FeValuesError> {
        self.shape_entry(
            UpdateFlags::GRADIENTS,
            ShapeData::gradients,
            shape_function,
            q,
            T::zero(),
            |out, d, g| *out += g[d],
        )
    }

    /// The curl of a shape function: a scalar in two dimensions and a vector in three.
    ///
    /// Fails with an internal error in one dimension, where the curl is not defined.
    pub fn curl(
        &self,
        shape_function: usize,
        q: usize,
    ) -> Result<<Const<SPACEDIM> as CurlDimension<T>>::Curl, FeValuesError>
    where
        T: FieldValue<T>,
        Const<SPACEDIM>: CurlDimension<T>,
    {
        check_curl_defined::<T, SPACEDIM>()?;
        self.shape_entry(
            UpdateFlags::GRADIENTS,
            ShapeData::gradients,
            shape_function,
            q,
            <Const<SPACEDIM> as CurlDimension<T>>::zero(),
            |out, d, g| <Const<SPACEDIM> as CurlDimension<T>>::add_contribution(out, d, T::one(), g.as_slice()),
        )
    }

    /// The Hessian of each component of a shape function.
    pub fn hessian(&self, shape_function: usize, q: usize) -> Result<Tensor3<T, SPACEDIM>, FeValuesError> {
        self.shape_entry(
            UpdateFlags::HESSIANS,
            ShapeData::hessians,
            shape_function,
            q,
            tensor3_zeros(),
            |out, d, h| out[d] = *h,
        )
    }

    pub fn third_derivative(
        &self,
        shape_function: usize,
        q: usize,
    ) -> Result<[Tensor3<T, SPACEDIM>; SPACEDIM], FeValuesError> {
        self.shape_entry(
            UpdateFlags::THIRD_DERIVATIVES,
            ShapeData::third_derivatives,
            shape_function,
            q,
            [tensor3_zeros(); SPACEDIM],
            |out, d, t| out[d] = *t,
        )
    }

    fn evaluate<N, S, O, F>(&self, dof_values: &[N], table: &ShapeTable<S>, zero: O, output: &mut Vec<O>, contribute: F)
    where
        N: FieldValue<T>,
        S: Copy,
        O: Clone,
        F: FnMut(&mut O, usize, N, &S),
    {
        reset(output, self.fe_values.n_quadrature_points(), zero);
        accumulate(dof_values, self.sparsity, table, output, contribute);
    }

    fn values_from<N: FieldValue<T>>(&self, dof_values: &[N], values: &mut Vec<SVector<N, SPACEDIM>>) {
        let table = self.fe_values.shape_data().values();
        self.evaluate(dof_values, table, SVector::zeros(), values, |out, d, c, v| out[d] += c * *v);
    }

    fn gradients_from<N: FieldValue<T>>(&self, dof_values: &[N], gradients: &mut Vec<SMatrix<N, SPACEDIM, SPACEDIM>>) {
        let table = self.fe_values.shape_data().gradients();
        self.evaluate(dof_values, table, SMatrix::zeros(), gradients, |out, d, c, g| {
            for j in 0..SPACEDIM {
                out[(d, j)] += c * g[j];
            }
        });
    }

    #[replace_float_literals(T::from_f64(literal).expect("Literal must fit in T"))]
    fn symmetric_gradients_from<N: FieldValue<T>>(
        &self,
        dof_values: &[N],
        symmetric_gradients: &mut Vec<SMatrix<N, SPACEDIM, SPACEDIM>>,
    ) {
        let table = self.fe_values.shape_data().gradients();
        self.evaluate(dof_values, table, SMatrix::zeros(), symmetric_gradients, |out, d, c, g| {
            for j in 0..SPACEDIM {
                let half = c * (g[j] * 0.5);
                out[(d, j)] += half;
                out[(j, d)] += half;
            }
        });
    }

    fn divergences_from<N: FieldValue<T>>(&self, dof_values: &[N], divergences: &mut Vec<N>) {
        let table = self.fe_values.shape_data().gradients();
        self.evaluate(dof_values, table, N::zero(), divergences, |out, d, c, g| *out += c * g[d]);
    }

    fn curls_from<N>(&self, dof_values: &[N], curls: &mut Vec<<Const<SPACEDIM> as CurlDimension<N>>::Curl>)
    where
        N: FieldValue<T>,
        Const<SPACEDIM>: CurlDimension<N>,
    {
        let table = self.fe_values.shape_data().gradients();
        let zero = <Const<SPACEDIM> as CurlDimension<N>>::zero();
        self.evaluate(dof_values, table, zero, curls, |out, d, c, g| {
            <Const<SPACEDIM> as CurlDimension<N>>::add_contribution(out, d, c, g.as_slice())
        });
    }

    fn hessians_from<N: FieldValue<T>>(&self, dof_values: &[N], hessians: &mut Vec<Tensor3<N, SPACEDIM>>) {
        let table = self.fe_values.shape_data().hessians();
        self.evaluate(dof_values, table, tensor3_zeros(), hessians, |out, d, c, h| add_scaled(&mut out[d], c, h));
    }

    fn laplacians_from<N: FieldValue<T>>(&self, dof_values: &[N], laplacians: &mut Vec<SVector<N, SPACEDIM>>) {
        let table = self.fe_values.shape_data().hessians();
        self.evaluate(dof_values, table, SVector::zeros(), laplacians, |out, d, c, h| {
            out[d] += c * h.trace()
        });
    }

    fn third_derivatives_from<N: FieldValue<T>>(
        &self,
        dof_values: &[N],
        third_derivatives: &mut Vec<[Tensor3<N, SPACEDIM>; SPACEDIM]>,
    ) {
        let table = self.fe_values.shape_data().third_derivatives();
        let zero = [tensor3_zeros(); SPACEDIM];
        self.evaluate(dof_values, table, zero, third_derivatives, |out, d, c, t| {
            add_scaled_tensor3(&mut out[d], c, t)
        });
    }

    function_queries!(
        get_function_values,
        get_function_values_from_local_dof_values,
        values_from,
        UpdateFlags::VALUES,
        SVector<N, SPACEDIM>
    );

    function_queries!(
        get_function_gradients,
        get_function_gradients_from_local_dof_values,
        gradients_from,
        UpdateFlags::GRADIENTS,
        SMatrix<N, SPACEDIM, SPACEDIM>
    );

    function_queries!(
        /// The symmetric part of the gradient, `(grad u + grad u^T) / 2`.
        get_function_symmetric_gradients,
        get_function_symmetric_gradients_from_local_dof_values,
        symmetric_gradients_from,
        UpdateFlags::GRADIENTS,
        SMatrix<N, SPACEDIM, SPACEDIM>
    );

    function_queries!(
        get_function_divergences,
        get_function_divergences_from_local_dof_values,
        divergences_from,
        UpdateFlags::GRADIENTS,
        N
    );

    /// The curl of the field at every quadrature point.
    ///
    /// The curl is only defined in two and three dimensions. In one dimension this fails with
    /// [`FeValuesError::Internal`] and leaves `curls` untouched.
    pub fn get_function_curls<V, N>(
        &self,
        fe_function: &V,
        curls: &mut Vec<<Const<SPACEDIM> as CurlDimension<N>>::Curl>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
        Const<SPACEDIM>: CurlDimension<N>,
    {
        check_curl_defined::<N, SPACEDIM>()?;
        self.fe_values
            .with_cell_dof_values(UpdateFlags::GRADIENTS, fe_function, |dofs| self.curls_from(dofs, curls))
    }

    pub fn get_function_curls_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        curls: &mut Vec<<Const<SPACEDIM> as CurlDimension<N>>::Curl>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
        Const<SPACEDIM>: CurlDimension<N>,
    {
        check_curl_defined::<N, SPACEDIM>()?;
        self.fe_values
            .with_local_dof_values(UpdateFlags::GRADIENTS, dof_values, |dofs| self.curls_from(dofs, curls))
    }

    function_queries!(
        /// The Hessian of every component, one matrix per component.
        get_function_hessians,
        get_function_hessians_from_local_dof_values,
        hessians_from,
        UpdateFlags::HESSIANS,
        Tensor3<N, SPACEDIM>
    );

    function_queries!(
        /// The Laplacian of every component.
        get_function_laplacians,
        get_function_laplacians_from_local_dof_values,
        laplacians_from,
        UpdateFlags::HESSIANS,
        SVector<N, SPACEDIM>
    );

    function_queries!(
        get_function_third_derivatives,
        get_function_third_derivatives_from_local_dof_values,
        third_derivatives_from,
        UpdateFlags::THIRD_DERIVATIVES,
        [Tensor3<N, SPACEDIM>; SPACEDIM]
    );
}

fn check_curl_defined<N, const SPACEDIM: usize>() -> Result<(), FeValuesError>
where
    Const<SPACEDIM>: CurlDimension<N>,
{
    if <Const<SPACEDIM> as CurlDimension<N>>::IS_DEFINED {
        Ok(())
    } else {
        Err(FeValuesError::Internal("The curl is only defined in two and three dimensions"))
    }
}
