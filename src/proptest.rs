//! Strategies for property-based testing of evaluation contexts.
use crate::mesh::Mesh;
use crate::reference_cell::ReferenceCell;
use ::proptest::prelude::*;
use nalgebra::{Point2, Vector2};

pub fn point2() -> impl Strategy<Value = Point2<f64>> {
    // Pick a reasonably small range to pick coordinates from,
    // otherwise we can easily get floating point numbers that are
    // so ridiculously large as to break anything we might want to do with them
    let range = -10.0..10.0;
    [range.clone(), range.clone()].prop_map(|[x, y]| Point2::new(x, y))
}

/// Vectors of `len` coefficients in a moderate range.
pub fn coefficients(len: usize) -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-10.0..10.0, len)
}

/// A positively oriented parallelogram, i.e. an affine image of the unit square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parallelogram {
    pub origin: Point2<f64>,
    pub axes: [Vector2<f64>; 2],
}

impl Parallelogram {
    /// The vertices in lexicographic order.
    pub fn vertices(&self) -> [Point2<f64>; 4] {
        let [a, b] = self.axes;
        [self.origin, self.origin + a, self.origin + b, self.origin + a + b]
    }

    /// A mesh with the parallelogram as its only cell.
    pub fn to_mesh(&self) -> Mesh<f64, 2> {
        Mesh::from_vertices_and_cells(self.vertices().to_vec(), vec![(ReferenceCell::Quadrilateral, vec![0, 1, 2, 3])])
            .expect("A parallelogram is a valid quadrilateral cell")
    }
}

impl Arbitrary for Parallelogram {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        // Dominant diagonal entries keep the Jacobian determinant bounded away from zero
        let stretch = 0.5..2.0;
        let shear = -0.25..0.25;
        (point2(), stretch.clone(), shear.clone(), shear, stretch)
            .prop_map(|(origin, ax, ay, bx, by)| Self {
                origin,
                axes: [Vector2::new(ax, ay), Vector2::new(bx, by)],
            })
            .boxed()
    }
}
