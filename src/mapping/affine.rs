use crate::cell::Cell;
use crate::flags::UpdateFlags;
use crate::mapping::Mapping;
use crate::output::MappingData;
use crate::quadrature::{QCollection, Quadrature};
use crate::reference_cell::{FaceMap, ReferenceCell};
use crate::similarity::CellSimilarity;
use fevalues_traits::Real;
use itertools::izip;
use log::warn;
use nalgebra::{DMatrix, Point, SMatrix, SVector};

/// The affine map `x = v_0 + J ξ` determined by the first vertex of a cell and the vertices
/// at the ends of its reference axes.
///
/// The map is exact for simplices, parallelograms and parallelepipeds. Cells of any dimension up
/// to the dimension of the surrounding space are supported; for lower-dimensional cells the
/// inverse Jacobian is the Moore–Penrose pseudo-inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffineMapping {
    reference_cell: ReferenceCell,
}

impl AffineMapping {
    pub fn new(reference_cell: ReferenceCell) -> Self {
        Self { reference_cell }
    }

    pub fn reference_cell(&self) -> ReferenceCell {
        self.reference_cell
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CellGeometry<T: Real, const DIM: usize, const SPACEDIM: usize> {
    jacobian: SMatrix<T, SPACEDIM, DIM>,
    inverse_jacobian: SMatrix<T, DIM, SPACEDIM>,
    measure: T,
}

/// Quadrature points and reference geometry of one face or subface.
#[derive(Debug, Clone, PartialEq)]
struct FaceGeometry<T: Real, const DIM: usize> {
    points: Vec<SVector<T, DIM>>,
    weights: Vec<T>,
    tangents: Vec<SVector<T, DIM>>,
    normal: SVector<T, DIM>,
}

impl<T: Real, const DIM: usize> FaceGeometry<T, DIM> {
    fn new(map: &FaceMap, rule: &Quadrature<T>) -> Self {
        Self {
            points: rule.points().map(|p| map.map_point(p)).collect(),
            weights: rule.weights().to_vec(),
            tangents: map.tangent_vectors(),
            normal: map.normal_vector(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffineMappingData<T: Real, const DIM: usize, const SPACEDIM: usize> {
    flags: UpdateFlags,
    cell_points: Vec<SVector<T, DIM>>,
    cell_weights: Vec<T>,
    // Indexed by face, or by `face * max_children_per_face + subface`
    faces: Vec<FaceGeometry<T, DIM>>,
    cached_geometry: Option<CellGeometry<T, DIM, SPACEDIM>>,
}

impl<T: Real, const DIM: usize, const SPACEDIM: usize> AffineMappingData<T, DIM, SPACEDIM> {
    fn new(flags: UpdateFlags) -> Self {
        Self {
            flags,
            cell_points: Vec::new(),
            cell_weights: Vec::new(),
            faces: Vec::new(),
            cached_geometry: None,
        }
    }
}

impl AffineMapping {
    fn cell_geometry<T, C, const DIM: usize, const SPACEDIM: usize>(&self, cell: &C) -> CellGeometry<T, DIM, SPACEDIM>
    where
        T: Real,
        C: Cell<T, SPACEDIM>,
    {
        let axes = self.reference_cell.affine_axis_vertices();
        let v0 = cell.vertex(0);
        let jacobian = SMatrix::<T, SPACEDIM, DIM>::from_fn(|i, a| cell.vertex(axes[a])[i] - v0[i]);
        let (inverse_jacobian, measure) = pseudo_inverse_and_measure(&jacobian);
        CellGeometry {
            jacobian,
            inverse_jacobian,
            measure,
        }
    }
}

/// Computes the pseudo-inverse `(JᵀJ)⁻¹Jᵀ` and the volume element `sqrt(det(JᵀJ))` of `J`.
fn pseudo_inverse_and_measure<T: Real, const R: usize, const C: usize>(
    jacobian: &SMatrix<T, R, C>,
) -> (SMatrix<T, C, R>, T) {
    let j = DMatrix::from_column_slice(R, C, jacobian.as_slice());
    let gram = j.transpose() * &j;
    let measure = gram.determinant().max(T::zero()).sqrt();
    match gram.try_inverse() {
        Some(gram_inverse) => {
            let inverse = gram_inverse * j.transpose();
            (SMatrix::from_column_slice(inverse.as_slice()), measure)
        }
        None => {
            warn!("Encountered a degenerate cell with vanishing volume element");
            (SMatrix::zeros(), measure)
        }
    }
}

/// The surface element and the outward unit normal of a face in physical space.
fn face_measure_and_normal<T: Real, const DIM: usize, const SPACEDIM: usize>(
    geometry: &CellGeometry<T, DIM, SPACEDIM>,
    face: &FaceGeometry<T, DIM>,
) -> (T, SVector<T, SPACEDIM>) {
    let tangents: Vec<SVector<T, SPACEDIM>> = face
        .tangents
        .iter()
        .map(|t| geometry.jacobian * t)
        .collect();
    let n = tangents.len();
    let measure = if n == 0 {
        T::one()
    } else {
        let gram = DMatrix::from_fn(n, n, |a, b| tangents[a].dot(&tangents[b]));
        gram.determinant().max(T::zero()).sqrt()
    };

    let normal = geometry.inverse_jacobian.transpose() * face.normal;
    let norm = normal.norm();
    let normal = if norm > T::zero() { normal / norm } else { normal };
    (measure, normal)
}

/// Unit normal of a codimension one cell, oriented by its direction flag.
fn cell_normal<T: Real, const DIM: usize, const SPACEDIM: usize>(
    jacobian: &SMatrix<T, SPACEDIM, DIM>,
    direction_flag: bool,
) -> SVector<T, SPACEDIM> {
    let normal: SVector<T, SPACEDIM> = match (DIM, SPACEDIM) {
        (1, 2) => SVector::from_fn(|i, _| if i == 0 { -jacobian[(1, 0)] } else { jacobian[(0, 0)] }),
        (2, 3) => SVector::from_fn(|i, _| {
            let (p, q) = ((i + 1) % 3, (i + 2) % 3);
            jacobian[(p, 0)] * jacobian[(q, 1)] - jacobian[(q, 0)] * jacobian[(p, 1)]
        }),
        _ => SVector::zeros(),
    };
    let norm = normal.norm();
    let normal = if norm > T::zero() { normal / norm } else { normal };
    if direction_flag {
        normal
    } else {
        -normal
    }
}

fn fill_face_data<T, C, const DIM: usize, const SPACEDIM: usize>(
    geometry: &CellGeometry<T, DIM, SPACEDIM>,
    cell: &C,
    face: &FaceGeometry<T, DIM>,
    flags: UpdateFlags,
    output: &mut MappingData<T, DIM, SPACEDIM>,
) where
    T: Real,
    C: Cell<T, SPACEDIM>,
{
    let (measure, normal) = face_measure_and_normal(geometry, face);
    let v0 = cell.vertex(0).coords;

    if flags.contains(UpdateFlags::QUADRATURE_POINTS) {
        for (x, xi) in output.quadrature_points.iter_mut().zip(&face.points) {
            *x = Point::from(v0 + geometry.jacobian * xi);
        }
    }
    if flags.contains(UpdateFlags::JXW_VALUES) {
        for (jxw, w) in output.jxw_values.iter_mut().zip(&face.weights) {
            *jxw = *w * measure;
        }
    }
    fill_jacobians(geometry, face.points.len(), flags, output);
    if flags.contains(UpdateFlags::NORMAL_VECTORS) {
        for n in output.normal_vectors.iter_mut().take(face.points.len()) {
            *n = normal;
        }
    }
    if flags.contains(UpdateFlags::BOUNDARY_FORMS) {
        for b in output.boundary_forms.iter_mut().take(face.points.len()) {
            *b = normal * measure;
        }
    }
}

fn fill_jacobians<T: Real, const DIM: usize, const SPACEDIM: usize>(
    geometry: &CellGeometry<T, DIM, SPACEDIM>,
    n_points: usize,
    flags: UpdateFlags,
    output: &mut MappingData<T, DIM, SPACEDIM>,
) {
    if flags.contains(UpdateFlags::JACOBIANS) {
        for j in output.jacobians.iter_mut().take(n_points) {
            *j = geometry.jacobian;
        }
    }
    if flags.contains(UpdateFlags::INVERSE_JACOBIANS) {
        for k in output.inverse_jacobians.iter_mut().take(n_points) {
            *k = geometry.inverse_jacobian;
        }
    }
}

impl<T: Real, const DIM: usize, const SPACEDIM: usize> Mapping<T, DIM, SPACEDIM> for AffineMapping {
    type InternalData = AffineMappingData<T, DIM, SPACEDIM>;

    fn is_compatible_with(&self, reference_cell: ReferenceCell) -> bool {
        reference_cell == self.reference_cell && reference_cell.dim() == DIM && DIM <= SPACEDIM
    }

    fn requires_update_flags(&self, _flags: UpdateFlags) -> UpdateFlags {
        UpdateFlags::empty()
    }

    fn get_data(&self, flags: UpdateFlags, quadrature: &Quadrature<T>) -> Self::InternalData {
        let mut data = AffineMappingData::new(flags);
        data.cell_points = quadrature
            .points()
            .map(SVector::from_column_slice)
            .collect();
        data.cell_weights = quadrature.weights().to_vec();
        data
    }

    fn get_face_data(&self, flags: UpdateFlags, quadrature: &QCollection<T>) -> Self::InternalData {
        let mut data = AffineMappingData::new(flags);
        data.faces = (0..self.reference_cell.n_faces())
            .filter_map(|face_no| {
                let map = self.reference_cell.face_map(face_no)?;
                Some(FaceGeometry::new(&map, quadrature.rule(face_no)))
            })
            .collect();
        data
    }

    fn get_subface_data(&self, flags: UpdateFlags, quadrature: &Quadrature<T>) -> Self::InternalData {
        let mut data = AffineMappingData::new(flags);
        let n_children = self.reference_cell.max_children_per_face();
        for face_no in 0..self.reference_cell.n_faces() {
            for subface_no in 0..n_children {
                if let Some(map) = self.reference_cell.subface_map(face_no, subface_no) {
                    data.faces.push(FaceGeometry::new(&map, quadrature));
                }
            }
        }
        data
    }

    fn fill_fe_values<C>(
        &self,
        cell: &C,
        similarity: CellSimilarity,
        _quadrature: &Quadrature<T>,
        internal: &mut Self::InternalData,
        output: &mut MappingData<T, DIM, SPACEDIM>,
    ) -> CellSimilarity
    where
        C: Cell<T, SPACEDIM>,
    {
        let reuse = matches!(
            similarity,
            CellSimilarity::Translation | CellSimilarity::InvertedTranslation
        );
        let geometry = match internal.cached_geometry {
            Some(geometry) if reuse => geometry,
            _ => {
                let geometry = self.cell_geometry(cell);
                internal.cached_geometry = Some(geometry);
                geometry
            }
        };

        let flags = internal.flags;
        let v0 = cell.vertex(0).coords;
        if flags.contains(UpdateFlags::QUADRATURE_POINTS) {
            for (x, xi) in output.quadrature_points.iter_mut().zip(&internal.cell_points) {
                *x = Point::from(v0 + geometry.jacobian * xi);
            }
        }
        if flags.contains(UpdateFlags::JXW_VALUES) {
            for (jxw, w) in izip!(output.jxw_values.iter_mut(), &internal.cell_weights) {
                *jxw = *w * geometry.measure;
            }
        }
        fill_jacobians(&geometry, internal.cell_points.len(), flags, output);
        if flags.contains(UpdateFlags::NORMAL_VECTORS) {
            let normal = cell_normal(&geometry.jacobian, cell.direction_flag());
            for n in &mut output.normal_vectors {
                *n = normal;
            }
        }

        similarity
    }

    fn fill_fe_face_values<C>(
        &self,
        cell: &C,
        face_no: usize,
        _quadrature: &QCollection<T>,
        internal: &mut Self::InternalData,
        output: &mut MappingData<T, DIM, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
    {
        let geometry = self.cell_geometry(cell);
        fill_face_data(&geometry, cell, &internal.faces[face_no], internal.flags, output);
    }

    fn fill_fe_subface_values<C>(
        &self,
        cell: &C,
        face_no: usize,
        subface_no: usize,
        _quadrature: &Quadrature<T>,
        internal: &mut Self::InternalData,
        output: &mut MappingData<T, DIM, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
    {
        let geometry = self.cell_geometry(cell);
        let index = face_no * self.reference_cell.max_children_per_face() + subface_no;
        fill_face_data(&geometry, cell, &internal.faces[index], internal.flags, output);
    }
}
