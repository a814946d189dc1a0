//! Interpolates a smooth function on a sequence of uniform quad meshes and reports the error of
//! the interpolant in the L2 norm and the H1 seminorm.
//!
//! Cells are processed in parallel, with one evaluation context per rayon worker.
use eyre::eyre;
use fevalues::element::{FiniteElement, Lagrange};
use fevalues::mapping::AffineMapping;
use fevalues::mesh::procedural::create_unit_square_uniform_quad_mesh;
use fevalues::mesh::{DofNumbering, Mesh, MeshCell};
use fevalues::quadrature::Quadrature;
use fevalues::reference_cell::ReferenceCell;
use fevalues::{FEValues, UpdateFlags};
use nalgebra::{Point2, Vector2};
use rayon::prelude::*;
use std::f64::consts::PI;

type Values<'a> = FEValues<'a, f64, AffineMapping, Lagrange<f64, 2>, MeshCell<f64, 2>, 2, 2>;

fn exact(x: &Point2<f64>) -> f64 {
    (PI * x.x).sin() * (PI * x.y).sin()
}

fn exact_gradient(x: &Point2<f64>) -> Vector2<f64> {
    let (sx, cx) = (PI * x.x).sin_cos();
    let (sy, cy) = (PI * x.y).sin_cos();
    Vector2::new(PI * cx * sy, PI * sx * cy)
}

/// Squared L2 and H1 seminorm errors of the vertex interpolant of `exact` on one cell.
fn cell_errors(fe_values: &mut Values, cell: &MeshCell<f64, 2>, u: &[f64]) -> eyre::Result<(f64, f64)> {
    fe_values.reinit(cell)?;
    let mut values = Vec::new();
    let mut gradients = Vec::new();
    fe_values.get_function_values(u, &mut values)?;
    fe_values.get_function_gradients(u, &mut gradients)?;

    let points = fe_values.get_quadrature_points()?;
    let jxw = fe_values.get_jxw_values()?;
    let mut errors = (0.0, 0.0);
    for q in 0..fe_values.n_quadrature_points() {
        errors.0 += (values[q] - exact(&points[q])).powi(2) * jxw[q];
        errors.1 += (gradients[q] - exact_gradient(&points[q])).norm_squared() * jxw[q];
    }
    Ok(errors)
}

fn interpolation_errors(mesh: &Mesh<f64, 2>, element: &Lagrange<f64, 2>, mapping: &AffineMapping) -> eyre::Result<(f64, f64)> {
    // Vertex numbering gives vertex v the global index v
    let u: Vec<f64> = mesh.vertices().iter().map(exact).collect();
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS | UpdateFlags::QUADRATURE_POINTS | UpdateFlags::JXW_VALUES;

    let (l2, h1) = (0..mesh.n_cells())
        .into_par_iter()
        .map_init(
            || Values::new(mapping, element, Quadrature::gauss(3, 2), flags),
            |fe_values, cell_index| {
                let fe_values = fe_values.as_mut().map_err(|err| eyre!(err.clone()))?;
                let cell = mesh
                    .get_cell(cell_index)
                    .ok_or_else(|| eyre!("Missing cell {}", cell_index))?;
                cell_errors(fe_values, &cell, &u)
            },
        )
        .try_reduce(|| (0.0, 0.0), |a, b| Ok((a.0 + b.0, a.1 + b.1)))?;
    Ok((l2.sqrt(), h1.sqrt()))
}

fn main() -> eyre::Result<()> {
    let element = Lagrange::new(1)?;
    let mapping = AffineMapping::new(ReferenceCell::Quadrilateral);

    let mut previous: Option<(f64, f64)> = None;
    println!("{:>6} {:>12} {:>6} {:>12} {:>6}", "cells", "L2", "rate", "H1", "rate");
    for resolution in [4, 8, 16, 32, 64] {
        let mut mesh = create_unit_square_uniform_quad_mesh(resolution);
        mesh.distribute_dofs(FiniteElement::<f64, 2, 2>::element_data(&element), DofNumbering::Vertex)?;
        let (l2, h1) = interpolation_errors(&mesh, &element, &mapping)?;
        let (l2_rate, h1_rate) = previous
            .map(|(l2_prev, h1_prev)| ((l2_prev / l2).log2(), (h1_prev / h1).log2()))
            .unwrap_or((f64::NAN, f64::NAN));
        println!(
            "{:>6} {:>12.4e} {:>6.2} {:>12.4e} {:>6.2}",
            mesh.n_cells(),
            l2,
            l2_rate,
            h1,
            h1_rate
        );
        previous = Some((l2, h1));
    }
    Ok(())
}
