//! Reference cell shapes and the geometry of their faces.
use fevalues_traits::Real;
use nalgebra::SVector;
use serde::{Deserialize, Serialize};

/// The shape of a reference cell.
///
/// Hypercube vertices are numbered lexicographically, with the first coordinate running
/// fastest. Faces of hypercubes are numbered `2 * axis + side`, so that face `2 * a` is the face
/// where coordinate `a` vanishes. Simplex faces follow the usual vertex subsets
/// (`{0, 1}`, `{1, 2}`, `{2, 0}` for triangles and `{0, 1, 2}`, `{0, 1, 3}`, `{0, 2, 3}`,
/// `{1, 2, 3}` for tetrahedra).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceCell {
    Vertex,
    Line,
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Hexahedron,
}

impl ReferenceCell {
    /// The hypercube of the given dimension, if supported.
    pub fn hypercube(dim: usize) -> Option<Self> {
        match dim {
            0 => Some(Self::Vertex),
            1 => Some(Self::Line),
            2 => Some(Self::Quadrilateral),
            3 => Some(Self::Hexahedron),
            _ => None,
        }
    }

    pub fn dim(&self) -> usize {
        use ReferenceCell::*;
        match self {
            Vertex => 0,
            Line => 1,
            Triangle | Quadrilateral => 2,
            Tetrahedron | Hexahedron => 3,
        }
    }

    pub fn is_hypercube(&self) -> bool {
        use ReferenceCell::*;
        matches!(self, Vertex | Line | Quadrilateral | Hexahedron)
    }

    pub fn n_vertices(&self) -> usize {
        use ReferenceCell::*;
        match self {
            Vertex => 1,
            Line => 2,
            Triangle => 3,
            Quadrilateral | Tetrahedron => 4,
            Hexahedron => 8,
        }
    }

    pub fn n_faces(&self) -> usize {
        use ReferenceCell::*;
        match self {
            Vertex => 0,
            Line => 2,
            Triangle => 3,
            Quadrilateral | Tetrahedron => 4,
            Hexahedron => 6,
        }
    }

    /// The shape of the faces of this cell.
    pub fn face_reference_cell(&self) -> Option<Self> {
        use ReferenceCell::*;
        match self {
            Vertex => None,
            Line => Some(Vertex),
            Triangle | Quadrilateral => Some(Line),
            Tetrahedron => Some(Triangle),
            Hexahedron => Some(Quadrilateral),
        }
    }

    /// The number of children of a face under isotropic refinement.
    pub fn max_children_per_face(&self) -> usize {
        use ReferenceCell::*;
        match self {
            Vertex => 0,
            Line => 1,
            Triangle | Quadrilateral => 2,
            Tetrahedron | Hexahedron => 4,
        }
    }

    /// Vertices `v_a` such that `v_a - v_0` is the image of the `a`-th reference axis
    /// under an affine map of the cell.
    pub fn affine_axis_vertices(&self) -> &'static [usize] {
        use ReferenceCell::*;
        match self {
            Vertex => &[],
            Line => &[1],
            Triangle | Quadrilateral => &[1, 2],
            Tetrahedron => &[1, 2, 3],
            Hexahedron => &[1, 2, 4],
        }
    }

    /// The map from reference coordinates of face `face_no` into reference cell coordinates.
    pub fn face_map(&self, face_no: usize) -> Option<FaceMap> {
        if face_no >= self.n_faces() {
            return None;
        }

        if self.is_hypercube() {
            return Some(hypercube_face_map(self.dim(), face_no));
        }

        let s = 1.0 / 2.0f64.sqrt();
        let t = 1.0 / 3.0f64.sqrt();
        let (origin, tangents, normal): (Vec<f64>, Vec<Vec<f64>>, Vec<f64>) = match (self, face_no) {
            (Self::Triangle, 0) => (vec![0.0, 0.0], vec![vec![1.0, 0.0]], vec![0.0, -1.0]),
            (Self::Triangle, 1) => (vec![1.0, 0.0], vec![vec![-1.0, 1.0]], vec![s, s]),
            (Self::Triangle, _) => (vec![0.0, 1.0], vec![vec![0.0, -1.0]], vec![-1.0, 0.0]),
            (Self::Tetrahedron, 0) => (
                vec![0.0, 0.0, 0.0],
                vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
                vec![0.0, 0.0, -1.0],
            ),
            (Self::Tetrahedron, 1) => (
                vec![0.0, 0.0, 0.0],
                vec![vec![1.0, 0.0, 0.0], vec![0.0, 0.0, 1.0]],
                vec![0.0, -1.0, 0.0],
            ),
            (Self::Tetrahedron, 2) => (
                vec![0.0, 0.0, 0.0],
                vec![vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
                vec![-1.0, 0.0, 0.0],
            ),
            (Self::Tetrahedron, _) => (
                vec![1.0, 0.0, 0.0],
                vec![vec![-1.0, 1.0, 0.0], vec![-1.0, 0.0, 1.0]],
                vec![t, t, t],
            ),
            _ => return None,
        };

        Some(FaceMap {
            origin,
            tangents,
            normal,
        })
    }

    /// The map from reference coordinates of child `subface_no` of face `face_no` into
    /// reference cell coordinates, assuming isotropic refinement of the face.
    pub fn subface_map(&self, face_no: usize, subface_no: usize) -> Option<FaceMap> {
        let face = self.face_map(face_no)?;
        let (offset, axes) = face_child_map(self.face_reference_cell()?, subface_no)?;

        let dim = self.dim();
        let mut origin = face.origin.clone();
        for (k, tangent) in face.tangents.iter().enumerate() {
            for i in 0..dim {
                origin[i] += offset[k] * tangent[i];
            }
        }

        let tangents = axes
            .iter()
            .map(|axis| {
                let mut mapped = vec![0.0; dim];
                for (k, tangent) in face.tangents.iter().enumerate() {
                    for i in 0..dim {
                        mapped[i] += axis[k] * tangent[i];
                    }
                }
                mapped
            })
            .collect();

        Some(FaceMap {
            origin,
            tangents,
            normal: face.normal,
        })
    }
}

/// Affine map `x = origin + sum_k u_k * tangent_k` from face reference coordinates `u` into
/// reference cell coordinates, together with the outward unit normal of the face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMap {
    origin: Vec<f64>,
    tangents: Vec<Vec<f64>>,
    normal: Vec<f64>,
}

impl FaceMap {
    pub fn cell_dim(&self) -> usize {
        self.origin.len()
    }

    pub fn face_dim(&self) -> usize {
        self.tangents.len()
    }

    pub fn origin(&self) -> &[f64] {
        &self.origin
    }

    pub fn tangents(&self) -> &[Vec<f64>] {
        &self.tangents
    }

    pub fn normal(&self) -> &[f64] {
        &self.normal
    }

    /// Maps a point given in face coordinates to reference cell coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `DIM` is not the cell dimension or the point has the wrong number of coordinates.
    pub fn map_point<T: Real, const DIM: usize>(&self, face_point: &[T]) -> SVector<T, DIM> {
        assert_eq!(DIM, self.cell_dim(), "Point dimension must match cell dimension");
        assert_eq!(face_point.len(), self.face_dim(), "Face point has wrong number of coordinates");
        let mut x = to_vector::<T, DIM>(&self.origin);
        for (u, tangent) in face_point.iter().zip(&self.tangents) {
            x += to_vector::<T, DIM>(tangent) * *u;
        }
        x
    }

    pub fn tangent_vectors<T: Real, const DIM: usize>(&self) -> Vec<SVector<T, DIM>> {
        self.tangents.iter().map(|t| to_vector(t)).collect()
    }

    pub fn normal_vector<T: Real, const DIM: usize>(&self) -> SVector<T, DIM> {
        to_vector(&self.normal)
    }
}

fn to_vector<T: Real, const DIM: usize>(coords: &[f64]) -> SVector<T, DIM> {
    SVector::from_fn(|i, _| T::from_f64(coords[i]).expect("Coordinate must fit in T"))
}

fn hypercube_face_map(dim: usize, face_no: usize) -> FaceMap {
    let axis = face_no / 2;
    let side = (face_no % 2) as f64;

    let mut origin = vec![0.0; dim];
    origin[axis] = side;

    let mut normal = vec![0.0; dim];
    normal[axis] = 2.0 * side - 1.0;

    let tangents = (0..dim)
        .filter(|&a| a != axis)
        .map(|a| {
            let mut t = vec![0.0; dim];
            t[a] = 1.0;
            t
        })
        .collect();

    FaceMap {
        origin,
        tangents,
        normal,
    }
}

/// Offset and axis images of child `child` of a reference face, in face coordinates.
fn face_child_map(face: ReferenceCell, child: usize) -> Option<(Vec<f64>, Vec<Vec<f64>>)> {
    use ReferenceCell::*;
    let map = match (face, child) {
        (Vertex, 0) => (vec![], vec![]),
        (Line, 0 | 1) => (vec![0.5 * child as f64], vec![vec![0.5]]),
        (Quadrilateral, 0..=3) => (
            vec![0.5 * (child % 2) as f64, 0.5 * (child / 2) as f64],
            vec![vec![0.5, 0.0], vec![0.0, 0.5]],
        ),
        (Triangle, 0) => (vec![0.0, 0.0], vec![vec![0.5, 0.0], vec![0.0, 0.5]]),
        (Triangle, 1) => (vec![0.5, 0.0], vec![vec![0.5, 0.0], vec![0.0, 0.5]]),
        (Triangle, 2) => (vec![0.0, 0.5], vec![vec![0.5, 0.0], vec![0.0, 0.5]]),
        (Triangle, 3) => (vec![0.5, 0.5], vec![vec![-0.5, 0.0], vec![0.0, -0.5]]),
        _ => return None,
    };
    Some(map)
}
