use crate::cell::Cell;
use crate::element::polynomial::Polynomial;
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use crate::flags::UpdateFlags;
use crate::mapping::Mapping;
use crate::output::{MappingData, ShapeData};
use crate::quadrature::{QCollection, Quadrature};
use crate::reference_cell::ReferenceCell;
use crate::similarity::CellSimilarity;
use crate::tensor::Tensor3;
use fevalues_traits::Real;
use fixedbitset::FixedBitSet;
use nalgebra::{SMatrix, SVector};
use std::array;

/// Scalar tensor-product Lagrange element with equispaced nodes on the reference hypercube
/// `[0, 1]^DIM`.
///
/// Shape functions are numbered lexicographically by their nodes, with the first coordinate
/// running fastest. For degree one the shape functions therefore coincide with the vertices of
/// the reference cell.
///
/// Hessians and third derivatives are transformed with the inverse Jacobian only, which is exact
/// for affine cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Lagrange<T: Real, const DIM: usize> {
    degree: usize,
    reference_cell: ReferenceCell,
    // For each 1D node, the basis polynomial and its first three derivatives
    basis: Vec<[Polynomial<T>; 4]>,
}

impl<T: Real, const DIM: usize> Lagrange<T, DIM> {
    pub fn new(degree: usize) -> Result<Self, FeValuesError> {
        if degree == 0 {
            return Err(FeValuesError::InvalidConfiguration(
                "Lagrange elements must have degree at least one".to_string(),
            ));
        }
        let reference_cell = ReferenceCell::hypercube(DIM)
            .filter(|cell| cell.dim() > 0)
            .ok_or_else(|| {
                FeValuesError::InvalidConfiguration(format!("No Lagrange element in dimension {}", DIM))
            })?;

        let p = T::from_usize(degree).expect("Degree must fit in T");
        let nodes: Vec<T> = (0..=degree)
            .map(|k| T::from_usize(k).expect("Node index must fit in T") / p)
            .collect();
        let basis = (0..=degree)
            .map(|i| {
                let p0 = Polynomial::lagrange_basis(&nodes, i);
                let p1 = p0.derivative();
                let p2 = p1.derivative();
                let p3 = p2.derivative();
                [p0, p1, p2, p3]
            })
            .collect();

        Ok(Self {
            degree,
            reference_cell,
            basis,
        })
    }

    fn multi_index(&self, shape_function: usize) -> [usize; DIM] {
        let n = self.degree + 1;
        let mut remainder = shape_function;
        array::from_fn(|_| {
            let index = remainder % n;
            remainder /= n;
            index
        })
    }

    fn tabulate(&self, flags: UpdateFlags, points: &[SVector<T, DIM>]) -> ReferenceTable<T, DIM> {
        let n_dofs = (self.degree + 1).pow(DIM as u32);
        let mut table = ReferenceTable {
            n_points: points.len(),
            ..ReferenceTable::default()
        };

        for i in 0..n_dofs {
            let index = self.multi_index(i);
            for xi in points {
                let evaluations: [[T; 4]; DIM] =
                    array::from_fn(|a| array::from_fn(|k| self.basis[index[a]][k].evaluate(xi[a])));
                // Partial derivative with respect to the given reference axes
                let derivative = |axes: &[usize]| {
                    (0..DIM)
                        .map(|a| evaluations[a][axes.iter().filter(|&&axis| axis == a).count()])
                        .fold(T::one(), |product, v| product * v)
                };

                table.values.push(derivative(&[]));
                if flags.contains(UpdateFlags::GRADIENTS) {
                    table
                        .gradients
                        .push(SVector::from_fn(|a, _| derivative(&[a])));
                }
                if flags.contains(UpdateFlags::HESSIANS) {
                    table
                        .hessians
                        .push(SMatrix::from_fn(|a, b| derivative(&[a, b])));
                }
                if flags.contains(UpdateFlags::THIRD_DERIVATIVES) {
                    table
                        .third_derivatives
                        .push(array::from_fn(|a| SMatrix::from_fn(|b, c| derivative(&[a, b, c]))));
                }
            }
        }

        table
    }

    fn fill_from_table<const SPACEDIM: usize>(
        &self,
        flags: UpdateFlags,
        table: &ReferenceTable<T, DIM>,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        output: &mut ShapeData<T, SPACEDIM>,
    ) {
        let n_points = table.n_points;
        for i in 0..self.n_dofs() {
            let Some(row) = output.row(i, 0) else { continue };
            let offset = i * n_points;

            if flags.contains(UpdateFlags::VALUES) {
                output.values_mut().row_mut(row)[..n_points].copy_from_slice(&table.values[offset..offset + n_points]);
            }
            if flags.contains(UpdateFlags::GRADIENTS) {
                let target = output.gradients_mut().row_mut(row);
                for q in 0..n_points {
                    let k = &mapping_data.inverse_jacobians[q];
                    target[q] = k.transpose() * table.gradients[offset + q];
                }
            }
            if flags.contains(UpdateFlags::HESSIANS) {
                let target = output.hessians_mut().row_mut(row);
                for q in 0..n_points {
                    let k = &mapping_data.inverse_jacobians[q];
                    target[q] = k.transpose() * table.hessians[offset + q] * k;
                }
            }
            if flags.contains(UpdateFlags::THIRD_DERIVATIVES) {
                let target = output.third_derivatives_mut().row_mut(row);
                for q in 0..n_points {
                    let k = &mapping_data.inverse_jacobians[q];
                    target[q] = transform_third_derivative(&table.third_derivatives[offset + q], k);
                }
            }
        }
    }

    fn n_dofs(&self) -> usize {
        (self.degree + 1).pow(DIM as u32)
    }
}

/// Computes `t[s][(u, v)] = sum_{a, b, c} r[a][(b, c)] K[(a, s)] K[(b, u)] K[(c, v)]`.
fn transform_third_derivative<T: Real, const DIM: usize, const SPACEDIM: usize>(
    reference: &Tensor3<T, DIM>,
    inverse_jacobian: &SMatrix<T, DIM, SPACEDIM>,
) -> Tensor3<T, SPACEDIM> {
    let k = inverse_jacobian;
    let contracted: [SMatrix<T, SPACEDIM, SPACEDIM>; DIM] = array::from_fn(|a| k.transpose() * reference[a] * k);
    array::from_fn(|s| {
        let mut t = SMatrix::zeros();
        for (a, m) in contracted.iter().enumerate() {
            t += m * k[(a, s)];
        }
        t
    })
}

/// Shape functions and reference derivatives of all shape functions at one set of points,
/// stored shape function by shape function.
#[derive(Debug, Clone, PartialEq)]
struct ReferenceTable<T: Real, const DIM: usize> {
    n_points: usize,
    values: Vec<T>,
    gradients: Vec<SVector<T, DIM>>,
    hessians: Vec<SMatrix<T, DIM, DIM>>,
    third_derivatives: Vec<Tensor3<T, DIM>>,
}

impl<T: Real, const DIM: usize> Default for ReferenceTable<T, DIM> {
    fn default() -> Self {
        Self {
            n_points: 0,
            values: Vec::new(),
            gradients: Vec::new(),
            hessians: Vec::new(),
            third_derivatives: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LagrangeData<T: Real, const DIM: usize> {
    flags: UpdateFlags,
    // One table for the cell, per face, or per `face * max_children_per_face + subface`
    tables: Vec<ReferenceTable<T, DIM>>,
}

impl<T: Real, const DIM: usize, const SPACEDIM: usize> FiniteElement<T, DIM, SPACEDIM> for Lagrange<T, DIM> {
    type InternalData = LagrangeData<T, DIM>;

    fn reference_cell(&self) -> ReferenceCell {
        self.reference_cell
    }

    fn n_components(&self) -> usize {
        1
    }

    fn n_dofs_per_cell(&self) -> usize {
        self.n_dofs()
    }

    fn degree(&self) -> usize {
        self.degree
    }

    fn nonzero_components(&self, _shape_function: usize) -> FixedBitSet {
        let mut mask = FixedBitSet::with_capacity(1);
        mask.insert(0);
        mask
    }

    fn requires_update_flags(&self, flags: UpdateFlags) -> UpdateFlags {
        let derivatives = UpdateFlags::GRADIENTS | UpdateFlags::HESSIANS | UpdateFlags::THIRD_DERIVATIVES;
        if flags.intersects(derivatives) {
            UpdateFlags::INVERSE_JACOBIANS
        } else {
            UpdateFlags::empty()
        }
    }

    fn get_data<M>(
        &self,
        flags: UpdateFlags,
        _mapping: &M,
        quadrature: &Quadrature<T>,
        output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>,
    {
        let points: Vec<_> = quadrature
            .points()
            .map(SVector::from_column_slice)
            .collect();
        let table = self.tabulate(flags, &points);

        // Values do not depend on the cell
        if flags.contains(UpdateFlags::VALUES) {
            for i in 0..self.n_dofs() {
                if let Some(row) = output.row(i, 0) {
                    let values = &table.values[i * table.n_points..(i + 1) * table.n_points];
                    output.values_mut().row_mut(row)[..table.n_points].copy_from_slice(values);
                }
            }
        }

        LagrangeData {
            flags,
            tables: vec![table],
        }
    }

    fn get_face_data<M>(
        &self,
        flags: UpdateFlags,
        _mapping: &M,
        quadrature: &QCollection<T>,
        _output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>,
    {
        let tables = (0..self.reference_cell.n_faces())
            .filter_map(|face_no| {
                let map = self.reference_cell.face_map(face_no)?;
                let points: Vec<_> = quadrature
                    .rule(face_no)
                    .points()
                    .map(|p| map.map_point(p))
                    .collect();
                Some(self.tabulate(flags, &points))
            })
            .collect();
        LagrangeData { flags, tables }
    }

    fn get_subface_data<M>(
        &self,
        flags: UpdateFlags,
        _mapping: &M,
        quadrature: &Quadrature<T>,
        _output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>,
    {
        let cell = self.reference_cell;
        let mut tables = Vec::new();
        for face_no in 0..cell.n_faces() {
            for subface_no in 0..cell.max_children_per_face() {
                if let Some(map) = cell.subface_map(face_no, subface_no) {
                    let points: Vec<_> = quadrature.points().map(|p| map.map_point(p)).collect();
                    tables.push(self.tabulate(flags, &points));
                }
            }
        }
        LagrangeData { flags, tables }
    }

    fn fill_fe_values<C, M>(
        &self,
        _cell: &C,
        _similarity: CellSimilarity,
        _quadrature: &Quadrature<T>,
        _mapping: &M,
        _mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>,
    {
        let flags = internal.flags.difference(UpdateFlags::VALUES);
        self.fill_from_table(flags, &internal.tables[0], mapping_data, output);
    }

    fn fill_fe_face_values<C, M>(
        &self,
        _cell: &C,
        face_no: usize,
        _quadrature: &QCollection<T>,
        _mapping: &M,
        _mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>,
    {
        self.fill_from_table(internal.flags, &internal.tables[face_no], mapping_data, output);
    }

    fn fill_fe_subface_values<C, M>(
        &self,
        _cell: &C,
        face_no: usize,
        subface_no: usize,
        _quadrature: &Quadrature<T>,
        _mapping: &M,
        _mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>,
    {
        let index = face_no * self.reference_cell.max_children_per_face() + subface_no;
        self.fill_from_table(internal.flags, &internal.tables[index], mapping_data, output);
    }
}
