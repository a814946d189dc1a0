//! The view of a mesh cell consumed by evaluation contexts.
use crate::element::ElementData;
use crate::reference_cell::ReferenceCell;
use crate::signals::MeshSignals;
use fevalues_traits::Real;
use nalgebra::Point;

/// A cell of a mesh, together with its degrees of freedom.
///
/// Evaluation contexts store a clone of the present cell, so implementations are typically light
/// handles that refer back to their mesh.
pub trait Cell<T: Real, const SPACEDIM: usize>: Clone {
    /// The change notifications of the mesh this cell belongs to.
    fn signals(&self) -> &MeshSignals;

    fn reference_cell(&self) -> ReferenceCell;

    fn n_vertices(&self) -> usize {
        self.reference_cell().n_vertices()
    }

    fn vertex(&self, index: usize) -> Point<T, SPACEDIM>;

    /// Returns `true` if this cell is a translation of `other`.
    fn is_translation_of(&self, other: &Self) -> bool {
        is_translation(self, other)
    }

    /// Orientation of a cell embedded in a higher dimensional space.
    fn direction_flag(&self) -> bool {
        true
    }

    fn has_children(&self) -> bool {
        false
    }

    /// Global index of face `face_no`.
    fn face_index(&self, face_no: usize) -> usize;

    fn face_has_children(&self, face_no: usize) -> bool {
        self.face_n_children(face_no) > 0
    }

    fn face_n_children(&self, _face_no: usize) -> usize {
        0
    }

    /// The number of subfaces that may be visited on face `face_no`.
    ///
    /// For a face on a periodic boundary, implementations return the number of children of the
    /// matching face on the other side.
    fn n_subfaces(&self, face_no: usize) -> usize {
        self.face_n_children(face_no)
    }

    /// Global index of child `subface_no` of face `face_no`.
    fn subface_index(&self, face_no: usize, subface_no: usize) -> usize;

    /// Data of the finite element assigned to this cell, if any.
    fn element_data(&self) -> Option<ElementData> {
        None
    }

    /// The total number of degrees of freedom, if the cell carries a degree of freedom numbering.
    fn n_global_dofs(&self) -> Option<usize> {
        None
    }

    /// Writes the global indices of the local degrees of freedom into `indices`.
    fn populate_dof_indices(&self, indices: &mut [usize]);
}

/// Returns `true` if the vertices of `a` are those of `b` shifted by a common vector.
///
/// Vertex differences are compared relative to the size of `b`.
pub fn is_translation<T, C, const SPACEDIM: usize>(a: &C, b: &C) -> bool
where
    T: Real,
    C: Cell<T, SPACEDIM> + ?Sized,
{
    let n = a.n_vertices();
    if n != b.n_vertices() || a.reference_cell() != b.reference_cell() || n == 0 {
        return false;
    }

    let (a0, b0) = (a.vertex(0), b.vertex(0));
    let scale = (1..n)
        .map(|i| (b.vertex(i) - b0).norm())
        .fold(T::zero(), T::max);
    let tolerance = T::from_f64(1e-12).expect("Tolerance must fit in T") * scale;

    (1..n).all(|i| ((a.vertex(i) - a0) - (b.vertex(i) - b0)).norm() <= tolerance)
}
