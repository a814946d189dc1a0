//! Per-cell output tables filled by the mapping and the finite element on every reinit.
use crate::flags::UpdateFlags;
use crate::sparsity::ShapeFunctionToRowTable;
use crate::tensor::{tensor3_zeros, Tensor3};
use fevalues_traits::Real;
use nalgebra::{Point, SMatrix, SVector, Scalar};

/// A dense table with one row per (shape function, nonzero component) pair and one column per
/// quadrature point.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeTable<S> {
    n_rows: usize,
    n_columns: usize,
    entries: Vec<S>,
}

impl<S> Default for ShapeTable<S> {
    fn default() -> Self {
        Self {
            n_rows: 0,
            n_columns: 0,
            entries: Vec::new(),
        }
    }
}

impl<S: Copy> ShapeTable<S> {
    pub fn new(n_rows: usize, n_columns: usize, value: S) -> Self {
        Self {
            n_rows,
            n_columns,
            entries: vec![value; n_rows * n_columns],
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn row(&self, row: usize) -> &[S] {
        &self.entries[row * self.n_columns..(row + 1) * self.n_columns]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [S] {
        &mut self.entries[row * self.n_columns..(row + 1) * self.n_columns]
    }

    pub fn get(&self, row: usize, column: usize) -> &S {
        &self.row(row)[column]
    }
}

/// Shape function values and derivatives at the quadrature points of the present cell.
///
/// Derivatives are given with respect to physical coordinates. Rows are enumerated by the
/// [`ShapeFunctionToRowTable`], so structurally zero (shape function, component) pairs are not
/// stored. Only the tables for the requested update flags are allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeData<T: Scalar, const SPACEDIM: usize> {
    update_flags: UpdateFlags,
    row_table: ShapeFunctionToRowTable,
    values: ShapeTable<T>,
    gradients: ShapeTable<SVector<T, SPACEDIM>>,
    hessians: ShapeTable<SMatrix<T, SPACEDIM, SPACEDIM>>,
    third_derivatives: ShapeTable<Tensor3<T, SPACEDIM>>,
}

impl<T: Real, const SPACEDIM: usize> ShapeData<T, SPACEDIM> {
    pub fn new(row_table: ShapeFunctionToRowTable, n_quadrature_points: usize, flags: UpdateFlags) -> Self {
        let n_rows = row_table.n_rows();
        let rows_for = |flag| if flags.contains(flag) { n_rows } else { 0 };
        Self {
            update_flags: flags,
            values: ShapeTable::new(rows_for(UpdateFlags::VALUES), n_quadrature_points, T::zero()),
            gradients: ShapeTable::new(rows_for(UpdateFlags::GRADIENTS), n_quadrature_points, SVector::zeros()),
            hessians: ShapeTable::new(rows_for(UpdateFlags::HESSIANS), n_quadrature_points, SMatrix::zeros()),
            third_derivatives: ShapeTable::new(
                rows_for(UpdateFlags::THIRD_DERIVATIVES),
                n_quadrature_points,
                tensor3_zeros(),
            ),
            row_table,
        }
    }

    pub fn update_flags(&self) -> UpdateFlags {
        self.update_flags
    }

    pub fn row_table(&self) -> &ShapeFunctionToRowTable {
        &self.row_table
    }

    /// The row holding component `component` of shape function `shape_function`, if the pair is
    /// not structurally zero.
    pub fn row(&self, shape_function: usize, component: usize) -> Option<usize> {
        self.row_table.row(shape_function, component)
    }

    pub fn values(&self) -> &ShapeTable<T> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ShapeTable<T> {
        &mut self.values
    }

    pub fn gradients(&self) -> &ShapeTable<SVector<T, SPACEDIM>> {
        &self.gradients
    }

    pub fn gradients_mut(&mut self) -> &mut ShapeTable<SVector<T, SPACEDIM>> {
        &mut self.gradients
    }

    pub fn hessians(&self) -> &ShapeTable<SMatrix<T, SPACEDIM, SPACEDIM>> {
        &self.hessians
    }

    pub fn hessians_mut(&mut self) -> &mut ShapeTable<SMatrix<T, SPACEDIM, SPACEDIM>> {
        &mut self.hessians
    }

    pub fn third_derivatives(&self) -> &ShapeTable<Tensor3<T, SPACEDIM>> {
        &self.third_derivatives
    }

    pub fn third_derivatives_mut(&mut self) -> &mut ShapeTable<Tensor3<T, SPACEDIM>> {
        &mut self.third_derivatives
    }
}

/// Geometric quantities at the quadrature points of the present cell, face or subface.
///
/// Vectors for quantities that were not requested stay empty.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingData<T: Scalar, const DIM: usize, const SPACEDIM: usize> {
    pub quadrature_points: Vec<Point<T, SPACEDIM>>,
    pub jxw_values: Vec<T>,
    pub jacobians: Vec<SMatrix<T, SPACEDIM, DIM>>,
    pub inverse_jacobians: Vec<SMatrix<T, DIM, SPACEDIM>>,
    pub normal_vectors: Vec<SVector<T, SPACEDIM>>,
    pub boundary_forms: Vec<SVector<T, SPACEDIM>>,
}

impl<T: Real, const DIM: usize, const SPACEDIM: usize> MappingData<T, DIM, SPACEDIM> {
    pub fn new(n_quadrature_points: usize, flags: UpdateFlags) -> Self {
        let n = |flag| if flags.contains(flag) { n_quadrature_points } else { 0 };
        Self {
            quadrature_points: vec![Point::origin(); n(UpdateFlags::QUADRATURE_POINTS)],
            jxw_values: vec![T::zero(); n(UpdateFlags::JXW_VALUES)],
            jacobians: vec![SMatrix::zeros(); n(UpdateFlags::JACOBIANS)],
            inverse_jacobians: vec![SMatrix::zeros(); n(UpdateFlags::INVERSE_JACOBIANS)],
            normal_vectors: vec![SVector::zeros(); n(UpdateFlags::NORMAL_VECTORS)],
            boundary_forms: vec![SVector::zeros(); n(UpdateFlags::BOUNDARY_FORMS)],
        }
    }
}

impl<T: Real, const DIM: usize, const SPACEDIM: usize> Default for MappingData<T, DIM, SPACEDIM> {
    fn default() -> Self {
        Self::new(0, UpdateFlags::empty())
    }
}
