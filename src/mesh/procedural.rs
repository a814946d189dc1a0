//! Basic procedural mesh generation routines.
use crate::mesh::Mesh;
use crate::reference_cell::ReferenceCell;
use fevalues_traits::Real;
use nalgebra::{Point1, Point2, Vector2};

/// Uniform mesh of `[0, 1]` with `n_cells` cells.
pub fn create_unit_interval_mesh<T: Real>(n_cells: usize) -> Mesh<T, 1> {
    create_interval_mesh(T::zero(), T::one(), n_cells)
}

pub fn create_interval_mesh<T: Real>(a: T, b: T, n_cells: usize) -> Mesh<T, 1> {
    let n = T::from_usize(n_cells.max(1)).expect("Must be able to fit usize in T");
    let vertices = (0..=n_cells)
        .map(|i| {
            let i = T::from_usize(i).expect("Must be able to fit usize in T");
            Point1::new(a + (b - a) * i / n)
        })
        .collect();
    let cells = (0..n_cells)
        .map(|i| (ReferenceCell::Line, vec![i, i + 1]))
        .collect();
    Mesh::from_vertices_and_cells(vertices, cells).expect("Interval cells are always valid")
}

pub fn create_unit_square_uniform_quad_mesh<T: Real>(cells_per_dim: usize) -> Mesh<T, 2> {
    create_rectangular_uniform_quad_mesh(T::one(), 1, 1, cells_per_dim, &Vector2::zeros())
}

/// Generates an axis-aligned rectangular uniform mesh given a unit length,
/// dimensions as multipliers of the unit length and the number of cells per unit length.
///
/// The vertices of every cell are numbered lexicographically, starting at the corner with the
/// smallest coordinates.
pub fn create_rectangular_uniform_quad_mesh<T: Real>(
    unit_length: T,
    units_x: usize,
    units_y: usize,
    cells_per_unit: usize,
    bottom_left: &Vector2<T>,
) -> Mesh<T, 2> {
    let mut vertices = Vec::new();
    let mut cells = Vec::new();

    if cells_per_unit > 0 && units_x > 0 && units_y > 0 {
        let cell_size = unit_length / T::from_usize(cells_per_unit).expect("Must be able to fit usize in T");
        let num_cells_x = units_x * cells_per_unit;
        let num_cells_y = units_y * cells_per_unit;

        let to_global_vertex_index = |i, j| (num_cells_x + 1) * j + i;

        for j in 0..=num_cells_y {
            for i in 0..=num_cells_x {
                let i_as_t = T::from_usize(i).expect("Must be able to fit usize in T");
                let j_as_t = T::from_usize(j).expect("Must be able to fit usize in T");
                let v = bottom_left + Vector2::new(i_as_t, j_as_t) * cell_size;
                vertices.push(Point2::from(v));
            }
        }

        for j in 0..num_cells_y {
            for i in 0..num_cells_x {
                let quad = vec![
                    to_global_vertex_index(i, j),
                    to_global_vertex_index(i + 1, j),
                    to_global_vertex_index(i, j + 1),
                    to_global_vertex_index(i + 1, j + 1),
                ];
                cells.push((ReferenceCell::Quadrilateral, quad));
            }
        }
    }

    Mesh::from_vertices_and_cells(vertices, cells).expect("Quadrilateral cells are always valid")
}
