use crate::{first_cell, mapping, q1, single_cell_mesh, CellValues};
use fevalues::element::{FiniteElement, Lagrange, SystemElement};
use fevalues::mesh::procedural::create_interval_mesh;
use fevalues::quadrature::Quadrature;
use fevalues::reference_cell::ReferenceCell;
use fevalues::{ErrorKind, FEValues, FeValuesError, UpdateFlags};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{point, Matrix2, Point, Point2, SVector, Vector2};
use paste::paste;

type System = SystemElement<f64, Lagrange<f64, 2>>;

fn planar<E: FiniteElement<f64, 2, 2>>(element: &E) -> &impl FiniteElement<f64, 2, 2> {
    element
}

#[test]
fn lagrange_element_properties() {
    let line = Lagrange::<f64, 1>::new(3).unwrap();
    let quad = Lagrange::<f64, 2>::new(2).unwrap();
    let hex = Lagrange::<f64, 3>::new(1).unwrap();

    assert_eq!(FiniteElement::<f64, 1, 1>::n_dofs_per_cell(&line), 4);
    assert_eq!(FiniteElement::<f64, 3, 3>::n_dofs_per_cell(&hex), 8);
    assert_eq!(FiniteElement::<f64, 3, 3>::reference_cell(&hex), ReferenceCell::Hexahedron);

    let quad = planar(&quad);
    assert_eq!(quad.n_dofs_per_cell(), 9);
    assert_eq!(quad.reference_cell(), ReferenceCell::Quadrilateral);
    assert_eq!(quad.degree(), 2);
    assert_eq!(quad.n_components(), 1);
    assert!(quad.is_primitive());
    assert_eq!(quad.system_to_component_index(7), (0, 7));
    assert_eq!(quad.requires_update_flags(UpdateFlags::VALUES), UpdateFlags::empty());
    assert_eq!(
        quad.requires_update_flags(UpdateFlags::VALUES | UpdateFlags::HESSIANS),
        UpdateFlags::INVERSE_JACOBIANS
    );
}

#[test]
fn lagrange_element_rejects_degree_zero() {
    let error = Lagrange::<f64, 2>::new(0).unwrap_err();
    assert!(matches!(error, FeValuesError::InvalidConfiguration(_)));
    assert_eq!(error.kind(), ErrorKind::Configuration);
}

#[test]
fn lagrange_shape_functions_are_nodal() {
    let mesh = single_cell_mesh(point![0.0, 0.0], [[1.0, 0.0], [0.0, 1.0]]);
    let element = Lagrange::<f64, 2>::new(2).unwrap();
    let mapping = mapping::<2>();
    let nodes: Vec<Point2<f64>> = (0..3)
        .flat_map(|l| (0..3).map(move |k| Point2::new(k as f64 / 2.0, l as f64 / 2.0)))
        .collect();
    let quadrature = Quadrature::from_points(vec![1.0 / 9.0; 9], &nodes);
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, quadrature, UpdateFlags::VALUES).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    for i in 0..9 {
        for q in 0..9 {
            let expected = if i == q { 1.0 } else { 0.0 };
            assert_scalar_eq!(fe_values.shape_value(i, q).unwrap(), expected, comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn bilinear_derivatives_on_rectangle() {
    let mesh = single_cell_mesh(point![0.0, 0.0], [[2.0, 0.0], [0.0, 1.0]]);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let quadrature = Quadrature::new(2, vec![1.0], vec![vec![0.25, 0.5]]);
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS | UpdateFlags::HESSIANS;
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, quadrature, flags).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    // (1 - x / 2) (1 - y) and x y / 2 at (0.5, 0.5)
    assert_scalar_eq!(fe_values.shape_value(0, 0).unwrap(), 0.375, comp = abs, tol = 1e-14);
    assert_matrix_eq!(fe_values.shape_grad(0, 0).unwrap(), Vector2::new(-0.25, -0.75), comp = abs, tol = 1e-14);
    assert_scalar_eq!(fe_values.shape_value(3, 0).unwrap(), 0.125, comp = abs, tol = 1e-14);
    assert_matrix_eq!(fe_values.shape_grad(3, 0).unwrap(), Vector2::new(0.25, 0.25), comp = abs, tol = 1e-14);
    assert_matrix_eq!(
        fe_values.shape_hessian(3, 0).unwrap(),
        Matrix2::new(0.0, 0.5, 0.5, 0.0),
        comp = abs,
        tol = 1e-14
    );
}

#[test]
fn cubic_third_derivative_on_interval() {
    let mesh = create_interval_mesh(1.0, 3.0, 1);
    let element = Lagrange::<f64, 1>::new(3).unwrap();
    let mapping = mapping::<1>();
    let mut fe_values: CellValues<Lagrange<f64, 1>, 1, 1> =
        FEValues::new(&mapping, &element, Quadrature::gauss(2, 1), UpdateFlags::THIRD_DERIVATIVES).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    // The leading coefficient of the first basis polynomial is -9 / 2 on the unit interval
    for q in 0..2 {
        let third = fe_values.shape_3rd_derivative(0, q).unwrap();
        assert_scalar_eq!(third[0][(0, 0)], -27.0 / 8.0, comp = abs, tol = 1e-11);
    }
}

#[test]
fn system_element_with_unit_directions() {
    let system = SystemElement::new(q1::<2>(), 2).unwrap();
    let element = planar(&system);
    assert_eq!(element.n_dofs_per_cell(), 8);
    assert_eq!(element.n_components(), 2);
    assert_eq!(element.degree(), 1);
    assert!(element.is_primitive());
    assert_eq!(element.system_to_component_index(0), (0, 0));
    assert_eq!(element.system_to_component_index(5), (1, 2));
    assert_eq!(element.nonzero_components(6).ones().collect::<Vec<_>>(), vec![0]);
    assert_eq!(system.directions(), &[vec![1.0, 0.0], vec![0.0, 1.0]]);
}

#[test]
fn system_element_with_general_directions() {
    let system: System = SystemElement::with_directions(q1(), 2, vec![vec![1.0, 1.0], vec![0.0, 1.0]]).unwrap();
    let element = planar(&system);
    assert_eq!(element.n_dofs_per_cell(), 8);
    assert_eq!(element.nonzero_components(0).ones().collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(element.n_nonzero_components(0), 2);
    assert!(!element.is_primitive_shape_function(0));
    assert!(element.is_primitive_shape_function(1));
    assert!(!element.is_primitive());
    assert_eq!(element.system_to_component_index(1), (1, 0));
    assert_eq!(element.system_to_component_index(3), (1, 1));

    // A single direction gives a vector-valued element with as many shape functions as the base
    let single: System = SystemElement::with_directions(q1(), 3, vec![vec![0.0, 2.0, -1.0]]).unwrap();
    assert_eq!(planar(&single).n_dofs_per_cell(), 4);
    assert_eq!(planar(&single).nonzero_components(2).ones().collect::<Vec<_>>(), vec![1, 2]);
}

#[test]
#[should_panic]
fn system_to_component_index_panics_for_non_primitive_shape_function() {
    let system: System = SystemElement::with_directions(q1(), 2, vec![vec![1.0, 1.0]]).unwrap();
    planar(&system).system_to_component_index(0);
}

#[test]
fn system_element_validates_directions() {
    let no_directions = SystemElement::<f64, _>::with_directions(q1::<2>(), 2, vec![]);
    assert!(matches!(no_directions, Err(FeValuesError::InvalidConfiguration(_))));
    let no_components = SystemElement::<f64, _>::new(q1::<2>(), 0);
    assert!(matches!(no_components, Err(FeValuesError::InvalidConfiguration(_))));
    let wrong_length = SystemElement::with_directions(q1::<2>(), 2, vec![vec![1.0, 0.0], vec![1.0]]);
    assert_eq!(wrong_length.unwrap_err(), FeValuesError::DimensionMismatch { actual: 1, expected: 2 });
}

#[test]
fn element_data_summarizes_element() {
    let system = SystemElement::new(Lagrange::<f64, 2>::new(2).unwrap(), 3).unwrap();
    let data = planar(&system).element_data();
    assert_eq!(data.dofs_per_cell, 27);
    assert_eq!(data.n_components, 3);
    assert_eq!(data.degree, 2);
    assert_ne!(data, planar(&q1::<2>()).element_data());
}

/// Interpolates `(1 + c · x)^degree` in the nodes of a Lagrange element on an affine cell and
/// checks that values and gradients are reproduced at the quadrature points.
fn check_polynomial_reproduction<const D: usize>(degree: usize, origin: Point<f64, D>, axes: [[f64; D]; D]) {
    let mesh = single_cell_mesh(origin, axes);
    let cell = first_cell(&mesh);
    let element = Lagrange::<f64, D>::new(degree).unwrap();
    let mapping = mapping::<D>();
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS | UpdateFlags::QUADRATURE_POINTS;
    let mut fe_values: CellValues<Lagrange<f64, D>, D, D> =
        FEValues::new(&mapping, &element, Quadrature::gauss(degree + 1, D), flags).unwrap();
    fe_values.reinit(&cell).unwrap();

    let c = SVector::<f64, D>::from_fn(|i, _| [0.5, -0.25, 0.75][i]);
    let f = |x: &Point<f64, D>| (1.0 + c.dot(&x.coords)).powi(degree as i32);
    let grad_f = |x: &Point<f64, D>| c * (degree as f64 * (1.0 + c.dot(&x.coords)).powi(degree as i32 - 1));

    let n = degree + 1;
    let dof_values: Vec<f64> = (0..n.pow(D as u32))
        .map(|i| {
            let mut node = origin;
            for (a, axis) in axes.iter().enumerate() {
                let xi = ((i / n.pow(a as u32)) % n) as f64 / degree as f64;
                node.coords += SVector::<f64, D>::from_fn(|d, _| axis[d]) * xi;
            }
            f(&node)
        })
        .collect();

    let (mut values, mut gradients) = (Vec::new(), Vec::new());
    fe_values
        .get_function_values_from_local_dof_values(&dof_values, &mut values)
        .unwrap();
    fe_values
        .get_function_gradients_from_local_dof_values(&dof_values, &mut gradients)
        .unwrap();
    for (q, x) in fe_values.get_quadrature_points().unwrap().iter().enumerate() {
        assert_scalar_eq!(values[q], f(x), comp = abs, tol = 1e-10);
        assert_matrix_eq!(gradients[q], grad_f(x), comp = abs, tol = 1e-9);
    }
}

macro_rules! test_polynomial_reproduction {
    ($dim:literal, $origin:expr, $axes:expr, [$($degree:literal),*]) => {
        paste! {
            $(
                #[test]
                fn [<lagrange_q $degree _ $dim d_reproduces_polynomials>]() {
                    check_polynomial_reproduction::<$dim>($degree, $origin, $axes);
                }
            )*
        }
    };
}

test_polynomial_reproduction!(1, point![1.0], [[2.0]], [1, 2, 3, 4]);
test_polynomial_reproduction!(2, point![0.5, -0.25], [[2.0, 0.5], [0.25, 1.5]], [1, 2, 3]);
test_polynomial_reproduction!(3, point![0.0, 0.5, 1.0], [[1.5, 0.25, 0.0], [0.0, 1.25, 0.5], [0.25, 0.0, 2.0]], [1, 2]);
