//! Evaluation contexts.
//!
//! An evaluation context combines a [`Mapping`], a [`FiniteElement`] and a quadrature rule. It is
//! reinitialized on one cell (or face, or subface) at a time and then provides shape function
//! values and derivatives, mapping quantities and the values of finite element functions at the
//! quadrature points. Everything that only depends on the quadrature rule is computed once at
//! construction.
//!
//! The three contexts [`FEValues`], [`FEFaceValues`] and [`FESubfaceValues`] only differ in how
//! they are reinitialized. All queries live on [`FEValuesBase`], which they dereference to.
use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::{check_dimension, check_index, FeValuesError};
use crate::flags::UpdateFlags;
use crate::kernels::{accumulate_components, reset};
use crate::mapping::Mapping;
use crate::output::{MappingData, ShapeData, ShapeTable};
use crate::signals::{Connection, MeshSignals};
use crate::similarity::{CellSimilarity, SimilarityDetection};
use crate::sparsity::{ShapeFunctionToRowTable, ViewSparsity};
use crate::tensor::{add_scaled, add_scaled_tensor3, symmetric_tensor_n_independent_components, tensor3_zeros, Tensor3};
use crate::views::{ScalarView, SymmetricTensorView, TensorView, VectorView};
use crate::workspace::Workspace;
use fevalues_traits::{Coefficient, FieldValue, FieldVector, Real};
use log::{debug, trace, warn};
use nalgebra::{Point, SMatrix, SVector};
use once_cell::unsync::OnceCell;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod cell;
mod face;
mod subface;

pub use cell::FEValues;
pub use face::FEFaceValues;
pub use subface::FESubfaceValues;

/// Settings of an evaluation context that do not affect which quantities are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EvaluationSettings {
    pub similarity: SimilarityDetection,
}

/// The flags actually computed for the requested `flags`, including everything the element and
/// the mapping need to compute them.
pub fn compute_update_flags<T, M, E, const DIM: usize, const SPACEDIM: usize>(
    mapping: &M,
    element: &E,
    flags: UpdateFlags,
) -> UpdateFlags
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
{
    let flags = flags | element.requires_update_flags(flags);
    flags | mapping.requires_update_flags(flags)
}

#[derive(Debug)]
struct PresentCell<C> {
    cell: C,
    dof_indices: Vec<usize>,
    n_global_dofs: Option<usize>,
}

/// Subscription to the mesh of the present cell.
#[derive(Debug, Default)]
struct MeshBinding {
    connection: Option<Connection>,
    invalidated: Arc<AtomicBool>,
}

impl MeshBinding {
    fn is_invalidated(&self) -> bool {
        self.invalidated.load(Ordering::Acquire)
    }

    /// Clears the invalidation flag, returning whether it was set.
    fn take_invalidation(&mut self) -> bool {
        self.invalidated.swap(false, Ordering::AcqRel)
    }

    /// Subscribes to `signals` unless already subscribed. Returns `true` if the mesh changed.
    fn bind(&mut self, signals: &MeshSignals) -> bool {
        if self.connection.as_ref().map(Connection::mesh) == Some(signals.id()) {
            return false;
        }

        // Disconnect from the previous mesh first
        self.connection = None;
        let invalidated = Arc::clone(&self.invalidated);
        self.connection = Some(signals.connect(move |change| {
            trace!("Evaluation context invalidated by {:?}", change);
            invalidated.store(true, Ordering::Release);
        }));
        true
    }
}

/// Lazily built sparsity patterns of the views, one per view kind and first component.
#[derive(Debug, Default)]
struct ViewCache {
    scalars: Vec<OnceCell<ViewSparsity>>,
    vectors: Vec<OnceCell<ViewSparsity>>,
    symmetric_tensors: Vec<OnceCell<ViewSparsity>>,
    tensors: Vec<OnceCell<ViewSparsity>>,
}

impl ViewCache {
    fn new(n_components: usize) -> Self {
        let cells = || (0..n_components).map(|_| OnceCell::new()).collect();
        Self {
            scalars: cells(),
            vectors: cells(),
            symmetric_tensors: cells(),
            tensors: cells(),
        }
    }
}

/// State and queries shared by all evaluation contexts.
pub struct FEValuesBase<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    mapping: &'a M,
    element: &'a E,
    update_flags: UpdateFlags,
    n_quadrature_points: usize,
    max_n_quadrature_points: usize,
    dofs_per_cell: usize,
    mapping_internal: M::InternalData,
    element_internal: E::InternalData,
    mapping_output: MappingData<T, DIM, SPACEDIM>,
    element_output: ShapeData<T, SPACEDIM>,
    cell_similarity: CellSimilarity,
    settings: EvaluationSettings,
    present: Option<PresentCell<C>>,
    binding: MeshBinding,
    views: ViewCache,
    workspace: RefCell<Workspace>,
}

impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    /// Sets up the context. `get_data` creates the internal data of the mapping and the element
    /// for the final update flags, tabulating into the given shape data.
    #[allow(clippy::too_many_arguments)]
    fn new<F>(
        mapping: &'a M,
        element: &'a E,
        flags: UpdateFlags,
        n_quadrature_points: usize,
        max_n_quadrature_points: usize,
        settings: EvaluationSettings,
        get_data: F,
    ) -> Result<Self, FeValuesError>
    where
        F: FnOnce(UpdateFlags, &mut ShapeData<T, SPACEDIM>) -> (M::InternalData, E::InternalData),
    {
        let reference_cell = element.reference_cell();
        if !mapping.is_compatible_with(reference_cell) {
            return Err(FeValuesError::IncompatibleMapping(reference_cell));
        }

        let update_flags = compute_update_flags::<T, M, E, DIM, SPACEDIM>(mapping, element, flags);
        let row_table = ShapeFunctionToRowTable::from_element::<T, E, DIM, SPACEDIM>(element);
        let mut element_output = ShapeData::new(row_table, max_n_quadrature_points, update_flags);
        let (mapping_internal, element_internal) = get_data(update_flags, &mut element_output);
        debug!(
            "Created evaluation context with {:?} and {} quadrature points",
            update_flags, max_n_quadrature_points
        );

        Ok(Self {
            mapping,
            element,
            update_flags,
            n_quadrature_points,
            max_n_quadrature_points,
            dofs_per_cell: element.n_dofs_per_cell(),
            mapping_internal,
            element_internal,
            mapping_output: MappingData::new(max_n_quadrature_points, update_flags),
            element_output,
            cell_similarity: CellSimilarity::None,
            settings,
            present: None,
            binding: MeshBinding::default(),
            views: ViewCache::new(element.n_components()),
            workspace: RefCell::default(),
        })
    }

    /// Checks that `cell` can be visited by this context.
    fn check_cell(&self, cell: &C) -> Result<(), FeValuesError> {
        let reference_cell = cell.reference_cell();
        if !self.mapping.is_compatible_with(reference_cell) {
            return Err(FeValuesError::IncompatibleMapping(reference_cell));
        }
        if self.element.reference_cell() != reference_cell {
            return Err(FeValuesError::ElementMismatch);
        }
        match cell.element_data() {
            Some(data) if data != self.element.element_data() => Err(FeValuesError::ElementMismatch),
            _ => Ok(()),
        }
    }

    /// Makes sure this context listens to the mesh of `cell`, discarding the present cell if its
    /// mesh changed in the meantime.
    fn bind_mesh(&mut self, cell: &C) {
        if self.binding.take_invalidation() {
            warn!("The mesh changed after the last reinit; discarding the present cell");
            self.present = None;
            self.cell_similarity = CellSimilarity::None;
        }
        if self.binding.bind(cell.signals()) {
            trace!("Evaluation context subscribed to mesh {:?}", cell.signals().id());
            self.present = None;
            self.cell_similarity = CellSimilarity::None;
        }
    }

    /// The local degree of freedom indices of `cell`, reusing the storage of the present cell.
    fn gather_dof_indices(&mut self, cell: &C) -> (Vec<usize>, Option<usize>) {
        let mut dof_indices = self
            .present
            .take()
            .map(|present| present.dof_indices)
            .unwrap_or_default();
        dof_indices.clear();

        let n_global_dofs = cell.n_global_dofs();
        if n_global_dofs.is_some() {
            dof_indices.resize(self.dofs_per_cell, 0);
            cell.populate_dof_indices(&mut dof_indices);
        }
        (dof_indices, n_global_dofs)
    }

    fn set_present(&mut self, cell: &C, dof_indices: Vec<usize>, n_global_dofs: Option<usize>) {
        self.present = Some(PresentCell {
            cell: cell.clone(),
            dof_indices,
            n_global_dofs,
        });
    }

    fn present(&self) -> Result<&PresentCell<C>, FeValuesError> {
        match &self.present {
            Some(present) if !self.binding.is_invalidated() => Ok(present),
            _ => Err(FeValuesError::NotReinitialized),
        }
    }

    pub fn mapping(&self) -> &'a M {
        self.mapping
    }

    pub fn element(&self) -> &'a E {
        self.element
    }

    /// The flags computed on every reinit, including those required by the element and mapping.
    pub fn update_flags(&self) -> UpdateFlags {
        self.update_flags
    }

    pub fn settings(&self) -> &EvaluationSettings {
        &self.settings
    }

    /// The number of quadrature points of the present cell, face or subface.
    pub fn n_quadrature_points(&self) -> usize {
        self.n_quadrature_points
    }

    pub fn max_n_quadrature_points(&self) -> usize {
        self.max_n_quadrature_points
    }

    pub fn dofs_per_cell(&self) -> usize {
        self.dofs_per_cell
    }

    pub fn cell_similarity(&self) -> CellSimilarity {
        self.cell_similarity
    }

    /// Returns `true` if the context was reinitialized and its mesh has not changed since.
    pub fn is_bound(&self) -> bool {
        self.present().is_ok()
    }

    pub fn present_cell(&self) -> Result<&C, FeValuesError> {
        self.present().map(|present| &present.cell)
    }

    /// The shape data tabulated for the present cell.
    pub fn shape_data(&self) -> &ShapeData<T, SPACEDIM> {
        &self.element_output
    }

    /// The mapping quantities computed for the present cell.
    pub fn mapping_data(&self) -> &MappingData<T, DIM, SPACEDIM> {
        &self.mapping_output
    }

    pub(crate) fn check_flag(&self, flag: UpdateFlags) -> Result<(), FeValuesError> {
        if self.update_flags.contains(flag) {
            Ok(())
        } else {
            Err(FeValuesError::AccessToUninitializedField(flag.name().unwrap_or("update_default")))
        }
    }

    /// Checks the preconditions of an accessor for one shape function at one quadrature point.
    pub(crate) fn check_shape_access(&self, flag: UpdateFlags, shape_function: usize, q: usize) -> Result<(), FeValuesError> {
        self.check_flag(flag)?;
        self.present()?;
        check_index(shape_function, self.dofs_per_cell)?;
        check_index(q, self.n_quadrature_points)
    }

    pub(crate) fn n_components(&self) -> usize {
        self.element.n_components()
    }

    /// Runs `kernel` on the local coefficients of `fe_function` on the present cell.
    pub(crate) fn with_cell_dof_values<V, N, R, F>(
        &self,
        flag: UpdateFlags,
        fe_function: &V,
        kernel: F,
    ) -> Result<R, FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: Coefficient,
        F: FnOnce(&[N]) -> R,
    {
        self.check_flag(flag)?;
        let present = self.present()?;
        let n_global_dofs = present.n_global_dofs.ok_or(FeValuesError::NeedsDofHandler)?;
        check_dimension(fe_function.len(), n_global_dofs)?;
        self.with_gathered(fe_function, &present.dof_indices, kernel)
    }

    /// Runs `kernel` on the given local coefficients, which must hold one set of coefficients
    /// for the present cell.
    pub(crate) fn with_local_dof_values<N, R, F>(
        &self,
        flag: UpdateFlags,
        dof_values: &[N],
        kernel: F,
    ) -> Result<R, FeValuesError>
    where
        N: Coefficient,
        F: FnOnce(&[N]) -> R,
    {
        self.check_flag(flag)?;
        self.present()?;
        check_dimension(dof_values.len(), self.dofs_per_cell)?;
        Ok(kernel(dof_values))
    }

    /// Like [`FEValuesBase::with_local_dof_values`], but accepts any number of consecutive sets
    /// of local coefficients.
    fn with_local_dof_value_sets<N, R, F>(&self, flag: UpdateFlags, dof_values: &[N], kernel: F) -> Result<R, FeValuesError>
    where
        N: Coefficient,
        F: FnOnce(&[N]) -> R,
    {
        self.check_flag(flag)?;
        self.present()?;
        self.check_multiple(dof_values.len())?;
        Ok(kernel(dof_values))
    }

    /// Runs `kernel` on the entries of `fe_function` at `indices`, a list of one or more sets of
    /// local degree of freedom indices.
    fn with_indexed_dof_values<V, N, R, F>(
        &self,
        flag: UpdateFlags,
        fe_function: &V,
        indices: &[usize],
        kernel: F,
    ) -> Result<R, FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: Coefficient,
        F: FnOnce(&[N]) -> R,
    {
        self.check_flag(flag)?;
        self.present()?;
        self.check_multiple(indices.len())?;
        if let Some(&index) = indices.iter().find(|&&index| index >= fe_function.len()) {
            return Err(FeValuesError::IndexOutOfRange {
                index,
                end: fe_function.len(),
            });
        }
        self.with_gathered(fe_function, indices, kernel)
    }

    fn check_multiple(&self, len: usize) -> Result<(), FeValuesError> {
        if len.checked_rem(self.dofs_per_cell) == Some(0) {
            Ok(())
        } else {
            Err(FeValuesError::NotMultiple {
                dividend: len,
                divisor: self.dofs_per_cell,
            })
        }
    }

    fn with_gathered<V, N, R, F>(&self, fe_function: &V, indices: &[usize], kernel: F) -> Result<R, FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: Coefficient,
        F: FnOnce(&[N]) -> R,
    {
        let mut buffer: Vec<N> = self.workspace.borrow_mut().take();
        buffer.clear();
        buffer.resize(indices.len(), N::zero());
        fe_function.gather(indices, &mut buffer);
        let result = kernel(&buffer);
        self.workspace.borrow_mut().restore(buffer);
        Ok(result)
    }

    /// Gathers the local coefficients of `fe_function` on the present cell.
    pub fn get_interpolated_dof_values<V, N>(&self, fe_function: &V, dof_values: &mut Vec<N>) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: Coefficient,
    {
        self.with_cell_dof_values(UpdateFlags::empty(), fe_function, |local| {
            dof_values.clear();
            dof_values.extend_from_slice(local);
        })
    }
}

/// View factories.
impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    fn view_sparsity<'s>(
        &'s self,
        cache: &'s [OnceCell<ViewSparsity>],
        first_component: usize,
        width: usize,
    ) -> Result<&'s ViewSparsity, FeValuesError> {
        let cell = cache
            .get(first_component)
            .ok_or_else(|| FeValuesError::IndexOutOfRange {
                index: first_component.saturating_add(width - 1),
                end: self.n_components(),
            })?;
        cell.get_or_try_init(|| {
            ViewSparsity::new::<T, E, DIM, SPACEDIM>(self.element, self.element_output.row_table(), first_component, width)
        })
    }

    /// A view of component `component` as a scalar field.
    pub fn scalar(&self, component: usize) -> Result<ScalarView<'_, 'a, T, M, E, C, DIM, SPACEDIM>, FeValuesError> {
        let sparsity = self.view_sparsity(&self.views.scalars, component, 1)?;
        Ok(ScalarView::new(self, sparsity))
    }

    /// A view of the `SPACEDIM` components starting at `first_component` as a vector field.
    pub fn vector(
        &self,
        first_component: usize,
    ) -> Result<VectorView<'_, 'a, T, M, E, C, DIM, SPACEDIM>, FeValuesError> {
        let sparsity = self.view_sparsity(&self.views.vectors, first_component, SPACEDIM)?;
        Ok(VectorView::new(self, sparsity))
    }

    /// A view of the components starting at `first_component` as a symmetric rank-two tensor
    /// field, given by its independent components.
    pub fn symmetric_tensor(
        &self,
        first_component: usize,
    ) -> Result<SymmetricTensorView<'_, 'a, T, M, E, C, DIM, SPACEDIM>, FeValuesError> {
        let width = symmetric_tensor_n_independent_components(SPACEDIM);
        let sparsity = self.view_sparsity(&self.views.symmetric_tensors, first_component, width)?;
        Ok(SymmetricTensorView::new(self, sparsity))
    }

    /// A view of the `SPACEDIM * SPACEDIM` components starting at `first_component` as a general
    /// rank-two tensor field.
    pub fn tensor(
        &self,
        first_component: usize,
    ) -> Result<TensorView<'_, 'a, T, M, E, C, DIM, SPACEDIM>, FeValuesError> {
        let sparsity = self.view_sparsity(&self.views.tensors, first_component, SPACEDIM * SPACEDIM)?;
        Ok(TensorView::new(self, sparsity))
    }
}

/// Raw shape function data.
impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    fn shape_entry<S: Copy>(
        &self,
        flag: UpdateFlags,
        shape_function: usize,
        q: usize,
        table: fn(&ShapeData<T, SPACEDIM>) -> &ShapeTable<S>,
    ) -> Result<S, FeValuesError> {
        self.check_shape_access(flag, shape_function, q)?;
        if !self.element.is_primitive_shape_function(shape_function) {
            return Err(FeValuesError::NotPrimitive(shape_function));
        }
        let (component, _) = self.element.system_to_component_index(shape_function);
        let row = self
            .element_output
            .row(shape_function, component)
            .ok_or(FeValuesError::Internal("Primitive shape function without tabulated data"))?;
        Ok(*table(&self.element_output).get(row, q))
    }

    fn shape_component_entry<S: Copy>(
        &self,
        flag: UpdateFlags,
        shape_function: usize,
        q: usize,
        component: usize,
        zero: S,
        table: fn(&ShapeData<T, SPACEDIM>) -> &ShapeTable<S>,
    ) -> Result<S, FeValuesError> {
        self.check_shape_access(flag, shape_function, q)?;
        check_index(component, self.n_components())?;
        Ok(self
            .element_output
            .row(shape_function, component)
            .map_or(zero, |row| *table(&self.element_output).get(row, q)))
    }

    /// The value of a primitive shape function at quadrature point `q`.
    pub fn shape_value(&self, shape_function: usize, q: usize) -> Result<T, FeValuesError> {
        self.shape_entry(UpdateFlags::VALUES, shape_function, q, ShapeData::values)
    }

    pub fn shape_value_component(&self, shape_function: usize, q: usize, component: usize) -> Result<T, FeValuesError> {
        self.shape_component_entry(UpdateFlags::VALUES, shape_function, q, component, T::zero(), ShapeData::values)
    }

    pub fn shape_grad(&self, shape_function: usize, q: usize) -> Result<SVector<T, SPACEDIM>, FeValuesError> {
        self.shape_entry(UpdateFlags::GRADIENTS, shape_function, q, ShapeData::gradients)
    }

    pub fn shape_grad_component(
        &self,
        shape_function: usize,
        q: usize,
        component: usize,
    ) -> Result<SVector<T, SPACEDIM>, FeValuesError> {
        self.shape_component_entry(
            UpdateFlags::GRADIENTS,
            shape_function,
            q,
            component,
            SVector::zeros(),
            ShapeData::gradients,
        )
    }

    pub fn shape_hessian(&self, shape_function: usize, q: usize) -> Result<SMatrix<T, SPACEDIM, SPACEDIM>, FeValuesError> {
        self.shape_entry(UpdateFlags::HESSIANS, shape_function, q, ShapeData::hessians)
    }

    pub fn shape_hessian_component(
        &self,
        shape_function: usize,
        q: usize,
        component: usize,
    ) -> Result<SMatrix<T, SPACEDIM, SPACEDIM>, FeValuesError> {
        self.shape_component_entry(
            UpdateFlags::HESSIANS,
            shape_function,
            q,
            component,
            SMatrix::zeros(),
            ShapeData::hessians,
        )
    }

    pub fn shape_3rd_derivative(&self, shape_function: usize, q: usize) -> Result<Tensor3<T, SPACEDIM>, FeValuesError> {
        self.shape_entry(UpdateFlags::THIRD_DERIVATIVES, shape_function, q, ShapeData::third_derivatives)
    }

    pub fn shape_3rd_derivative_component(
        &self,
        shape_function: usize,
        q: usize,
        component: usize,
    ) -> Result<Tensor3<T, SPACEDIM>, FeValuesError> {
        self.shape_component_entry(
            UpdateFlags::THIRD_DERIVATIVES,
            shape_function,
            q,
            component,
            tensor3_zeros(),
            ShapeData::third_derivatives,
        )
    }
}

/// Mapping quantities.
impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    fn mapping_slice<'s, S>(&'s self, flag: UpdateFlags, data: &'s [S]) -> Result<&'s [S], FeValuesError> {
        self.check_flag(flag)?;
        self.present()?;
        Ok(&data[..self.n_quadrature_points])
    }

    fn mapping_entry<'s, S>(&'s self, flag: UpdateFlags, data: &'s [S], q: usize) -> Result<&'s S, FeValuesError> {
        let data = self.mapping_slice(flag, data)?;
        check_index(q, data.len())?;
        Ok(&data[q])
    }

    pub fn get_quadrature_points(&self) -> Result<&[Point<T, SPACEDIM>], FeValuesError> {
        self.mapping_slice(UpdateFlags::QUADRATURE_POINTS, &self.mapping_output.quadrature_points)
    }

    pub fn quadrature_point(&self, q: usize) -> Result<&Point<T, SPACEDIM>, FeValuesError> {
        self.mapping_entry(UpdateFlags::QUADRATURE_POINTS, &self.mapping_output.quadrature_points, q)
    }

    /// Quadrature weights multiplied by the volume (or surface) element of the mapping.
    pub fn get_jxw_values(&self) -> Result<&[T], FeValuesError> {
        self.mapping_slice(UpdateFlags::JXW_VALUES, &self.mapping_output.jxw_values)
    }

    pub fn jxw(&self, q: usize) -> Result<T, FeValuesError> {
        self.mapping_entry(UpdateFlags::JXW_VALUES, &self.mapping_output.jxw_values, q)
            .copied()
    }

    pub fn get_jacobians(&self) -> Result<&[SMatrix<T, SPACEDIM, DIM>], FeValuesError> {
        self.mapping_slice(UpdateFlags::JACOBIANS, &self.mapping_output.jacobians)
    }

    pub fn jacobian(&self, q: usize) -> Result<&SMatrix<T, SPACEDIM, DIM>, FeValuesError> {
        self.mapping_entry(UpdateFlags::JACOBIANS, &self.mapping_output.jacobians, q)
    }

    pub fn get_inverse_jacobians(&self) -> Result<&[SMatrix<T, DIM, SPACEDIM>], FeValuesError> {
        self.mapping_slice(UpdateFlags::INVERSE_JACOBIANS, &self.mapping_output.inverse_jacobians)
    }

    pub fn inverse_jacobian(&self, q: usize) -> Result<&SMatrix<T, DIM, SPACEDIM>, FeValuesError> {
        self.mapping_entry(UpdateFlags::INVERSE_JACOBIANS, &self.mapping_output.inverse_jacobians, q)
    }

    /// Unit normal vectors: outward normals of faces, or normals of cells of codimension one.
    pub fn get_normal_vectors(&self) -> Result<&[SVector<T, SPACEDIM>], FeValuesError> {
        self.mapping_slice(UpdateFlags::NORMAL_VECTORS, &self.mapping_output.normal_vectors)
    }

    pub fn normal_vector(&self, q: usize) -> Result<&SVector<T, SPACEDIM>, FeValuesError> {
        self.mapping_entry(UpdateFlags::NORMAL_VECTORS, &self.mapping_output.normal_vectors, q)
    }

    pub(crate) fn get_boundary_forms(&self) -> Result<&[SVector<T, SPACEDIM>], FeValuesError> {
        self.mapping_slice(UpdateFlags::BOUNDARY_FORMS, &self.mapping_output.boundary_forms)
    }

    pub(crate) fn boundary_form(&self, q: usize) -> Result<&SVector<T, SPACEDIM>, FeValuesError> {
        self.mapping_entry(UpdateFlags::BOUNDARY_FORMS, &self.mapping_output.boundary_forms, q)
    }
}

/// Values of finite element functions, for elements with any number of components.
///
/// The `*_values`, `*_gradients`, ... methods without `component` in their name require a scalar
/// element and produce one entry per quadrature point. The `component` variants produce, for every
/// quadrature point, one entry per component and set of coefficients: component `c` of set `b` is
/// stored at index `b * n_components + c`.
impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    fn scalar_element_view(&self) -> Result<ScalarView<'_, 'a, T, M, E, C, DIM, SPACEDIM>, FeValuesError> {
        check_dimension(self.n_components(), 1)?;
        self.scalar(0)
    }

    fn components_from<N, S, O, F>(
        &self,
        dof_values: &[N],
        table: &ShapeTable<S>,
        zero: O,
        output: &mut Vec<Vec<O>>,
        contribute: F,
    ) where
        N: Coefficient,
        S: Copy,
        O: Clone,
        F: FnMut(&mut O, N, &S),
    {
        let n_sets = dof_values.len() / self.dofs_per_cell.max(1);
        reset(output, self.n_quadrature_points, vec![zero; n_sets * self.n_components()]);
        accumulate_components(dof_values, self.element_output.row_table(), table, output, contribute);
    }

    fn component_values_from<N: FieldValue<T>>(&self, dof_values: &[N], values: &mut Vec<Vec<N>>) {
        self.components_from(dof_values, self.element_output.values(), N::zero(), values, |out, c, v| {
            *out += c * *v
        });
    }

    fn component_gradients_from<N: FieldValue<T>>(&self, dof_values: &[N], gradients: &mut Vec<Vec<SVector<N, SPACEDIM>>>) {
        self.components_from(
            dof_values,
            self.element_output.gradients(),
            SVector::zeros(),
            gradients,
            |out, c, g| add_scaled(out, c, g),
        );
    }

    fn component_hessians_from<N: FieldValue<T>>(
        &self,
        dof_values: &[N],
        hessians: &mut Vec<Vec<SMatrix<N, SPACEDIM, SPACEDIM>>>,
    ) {
        self.components_from(
            dof_values,
            self.element_output.hessians(),
            SMatrix::zeros(),
            hessians,
            |out, c, h| add_scaled(out, c, h),
        );
    }

    fn component_laplacians_from<N: FieldValue<T>>(&self, dof_values: &[N], laplacians: &mut Vec<Vec<N>>) {
        self.components_from(dof_values, self.element_output.hessians(), N::zero(), laplacians, |out, c, h| {
            *out += c * h.trace()
        });
    }

    fn component_third_derivatives_from<N: FieldValue<T>>(
        &self,
        dof_values: &[N],
        third_derivatives: &mut Vec<Vec<Tensor3<N, SPACEDIM>>>,
    ) {
        self.components_from(
            dof_values,
            self.element_output.third_derivatives(),
            tensor3_zeros(),
            third_derivatives,
            |out, c, t| add_scaled_tensor3(out, c, t),
        );
    }

    pub fn get_function_values<V, N>(&self, fe_function: &V, values: &mut Vec<N>) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::VALUES)?;
        self.scalar_element_view()?
            .get_function_values(fe_function, values)
    }

    pub fn get_function_values_from_local_dof_values<N>(&self, dof_values: &[N], values: &mut Vec<N>) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::VALUES)?;
        self.scalar_element_view()?
            .get_function_values_from_local_dof_values(dof_values, values)
    }

    pub fn get_function_gradients<V, N>(
        &self,
        fe_function: &V,
        gradients: &mut Vec<SVector<N, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::GRADIENTS)?;
        self.scalar_element_view()?
            .get_function_gradients(fe_function, gradients)
    }

    pub fn get_function_gradients_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        gradients: &mut Vec<SVector<N, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::GRADIENTS)?;
        self.scalar_element_view()?
            .get_function_gradients_from_local_dof_values(dof_values, gradients)
    }

    pub fn get_function_hessians<V, N>(
        &self,
        fe_function: &V,
        hessians: &mut Vec<SMatrix<N, SPACEDIM, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::HESSIANS)?;
        self.scalar_element_view()?
            .get_function_hessians(fe_function, hessians)
    }

    pub fn get_function_hessians_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        hessians: &mut Vec<SMatrix<N, SPACEDIM, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::HESSIANS)?;
        self.scalar_element_view()?
            .get_function_hessians_from_local_dof_values(dof_values, hessians)
    }

    pub fn get_function_laplacians<V, N>(&self, fe_function: &V, laplacians: &mut Vec<N>) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::HESSIANS)?;
        self.scalar_element_view()?
            .get_function_laplacians(fe_function, laplacians)
    }

    pub fn get_function_laplacians_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        laplacians: &mut Vec<N>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::HESSIANS)?;
        self.scalar_element_view()?
            .get_function_laplacians_from_local_dof_values(dof_values, laplacians)
    }

    pub fn get_function_third_derivatives<V, N>(
        &self,
        fe_function: &V,
        third_derivatives: &mut Vec<Tensor3<N, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::THIRD_DERIVATIVES)?;
        self.scalar_element_view()?
            .get_function_third_derivatives(fe_function, third_derivatives)
    }

    pub fn get_function_third_derivatives_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        third_derivatives: &mut Vec<Tensor3<N, SPACEDIM>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.check_flag(UpdateFlags::THIRD_DERIVATIVES)?;
        self.scalar_element_view()?
            .get_function_third_derivatives_from_local_dof_values(dof_values, third_derivatives)
    }

    pub fn get_function_component_values<V, N>(&self, fe_function: &V, values: &mut Vec<Vec<N>>) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_cell_dof_values(UpdateFlags::VALUES, fe_function, |dofs| self.component_values_from(dofs, values))
    }

    /// Component values for one or more consecutive sets of local coefficients.
    pub fn get_function_component_values_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        values: &mut Vec<Vec<N>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.with_local_dof_value_sets(UpdateFlags::VALUES, dof_values, |dofs| self.component_values_from(dofs, values))
    }

    /// Component values for the coefficients of `fe_function` at one or more sets of indices.
    pub fn get_function_component_values_from_indices<V, N>(
        &self,
        fe_function: &V,
        indices: &[usize],
        values: &mut Vec<Vec<N>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_indexed_dof_values(UpdateFlags::VALUES, fe_function, indices, |dofs| {
            self.component_values_from(dofs, values)
        })
    }

    pub fn get_function_component_gradients<V, N>(
        &self,
        fe_function: &V,
        gradients: &mut Vec<Vec<SVector<N, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_cell_dof_values(UpdateFlags::GRADIENTS, fe_function, |dofs| {
            self.component_gradients_from(dofs, gradients)
        })
    }

    pub fn get_function_component_gradients_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        gradients: &mut Vec<Vec<SVector<N, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.with_local_dof_value_sets(UpdateFlags::GRADIENTS, dof_values, |dofs| {
            self.component_gradients_from(dofs, gradients)
        })
    }

    pub fn get_function_component_gradients_from_indices<V, N>(
        &self,
        fe_function: &V,
        indices: &[usize],
        gradients: &mut Vec<Vec<SVector<N, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_indexed_dof_values(UpdateFlags::GRADIENTS, fe_function, indices, |dofs| {
            self.component_gradients_from(dofs, gradients)
        })
    }

    pub fn get_function_component_hessians<V, N>(
        &self,
        fe_function: &V,
        hessians: &mut Vec<Vec<SMatrix<N, SPACEDIM, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_cell_dof_values(UpdateFlags::HESSIANS, fe_function, |dofs| {
            self.component_hessians_from(dofs, hessians)
        })
    }

    pub fn get_function_component_hessians_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        hessians: &mut Vec<Vec<SMatrix<N, SPACEDIM, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.with_local_dof_value_sets(UpdateFlags::HESSIANS, dof_values, |dofs| {
            self.component_hessians_from(dofs, hessians)
        })
    }

    pub fn get_function_component_hessians_from_indices<V, N>(
        &self,
        fe_function: &V,
        indices: &[usize],
        hessians: &mut Vec<Vec<SMatrix<N, SPACEDIM, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_indexed_dof_values(UpdateFlags::HESSIANS, fe_function, indices, |dofs| {
            self.component_hessians_from(dofs, hessians)
        })
    }

    pub fn get_function_component_laplacians<V, N>(
        &self,
        fe_function: &V,
        laplacians: &mut Vec<Vec<N>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_cell_dof_values(UpdateFlags::HESSIANS, fe_function, |dofs| {
            self.component_laplacians_from(dofs, laplacians)
        })
    }

    pub fn get_function_component_laplacians_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        laplacians: &mut Vec<Vec<N>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.with_local_dof_value_sets(UpdateFlags::HESSIANS, dof_values, |dofs| {
            self.component_laplacians_from(dofs, laplacians)
        })
    }

    pub fn get_function_component_laplacians_from_indices<V, N>(
        &self,
        fe_function: &V,
        indices: &[usize],
        laplacians: &mut Vec<Vec<N>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_indexed_dof_values(UpdateFlags::HESSIANS, fe_function, indices, |dofs| {
            self.component_laplacians_from(dofs, laplacians)
        })
    }

    pub fn get_function_component_third_derivatives<V, N>(
        &self,
        fe_function: &V,
        third_derivatives: &mut Vec<Vec<Tensor3<N, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_cell_dof_values(UpdateFlags::THIRD_DERIVATIVES, fe_function, |dofs| {
            self.component_third_derivatives_from(dofs, third_derivatives)
        })
    }

    pub fn get_function_component_third_derivatives_from_local_dof_values<N>(
        &self,
        dof_values: &[N],
        third_derivatives: &mut Vec<Vec<Tensor3<N, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        N: FieldValue<T>,
    {
        self.with_local_dof_value_sets(UpdateFlags::THIRD_DERIVATIVES, dof_values, |dofs| {
            self.component_third_derivatives_from(dofs, third_derivatives)
        })
    }

    pub fn get_function_component_third_derivatives_from_indices<V, N>(
        &self,
        fe_function: &V,
        indices: &[usize],
        third_derivatives: &mut Vec<Vec<Tensor3<N, SPACEDIM>>>,
    ) -> Result<(), FeValuesError>
    where
        V: FieldVector<N> + ?Sized,
        N: FieldValue<T>,
    {
        self.with_indexed_dof_values(UpdateFlags::THIRD_DERIVATIVES, fe_function, indices, |dofs| {
            self.component_third_derivatives_from(dofs, third_derivatives)
        })
    }
}
