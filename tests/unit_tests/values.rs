use crate::{
    distribute_dofs, first_cell, gauss, mapping, q1, single_cell_mesh, skewed_hex_mesh, skewed_quad_mesh,
    wavy_coefficients, CellValues,
};
use fevalues::element::{Lagrange, SystemElement};
use fevalues::fevalues_traits::Dual;
use fevalues::mapping::AffineMapping;
use fevalues::mesh::procedural::{create_unit_interval_mesh, create_unit_square_uniform_quad_mesh};
use fevalues::mesh::DofNumbering;
use fevalues::quadrature::Quadrature;
use fevalues::reference_cell::ReferenceCell;
use fevalues::values::compute_update_flags;
use fevalues::{ErrorKind, EvaluationSettings, FEValues, FeValuesError, SimilarityDetection, UpdateFlags};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{point, Matrix2, Matrix3, Vector1, Vector2, Vector3};

#[test]
fn equal_endpoint_coefficients_give_constant_field_on_interval() {
    let mesh = single_cell_mesh(point![0.0], [[1.0]]);
    let element = q1::<1>();
    let mapping = mapping::<1>();
    let quadrature = Quadrature::new(1, vec![1.0], vec![vec![0.5]]);
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS;
    let mut fe_values: CellValues<Lagrange<f64, 1>, 1, 1> =
        FEValues::new(&mapping, &element, quadrature, flags).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    let mut values = Vec::new();
    let mut gradients = Vec::new();
    let scalar = fe_values.scalar(0).unwrap();
    scalar
        .get_function_values_from_local_dof_values(&[1.0, 1.0], &mut values)
        .unwrap();
    scalar
        .get_function_gradients_from_local_dof_values(&[1.0, 1.0], &mut gradients)
        .unwrap();

    assert_eq!(values.len(), 1);
    assert_eq!(gradients.len(), 1);
    assert_scalar_eq!(values[0], 1.0, comp = abs, tol = 1e-14);
    assert_matrix_eq!(gradients[0], Vector1::new(0.0), comp = abs, tol = 1e-14);
}

#[test]
fn linear_field_on_interval_has_constant_slope() {
    let mesh = single_cell_mesh(point![1.0], [[2.0]]);
    let element = q1::<1>();
    let mapping = mapping::<1>();
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS | UpdateFlags::QUADRATURE_POINTS;
    let mut fe_values: CellValues<Lagrange<f64, 1>, 1, 1> =
        FEValues::new(&mapping, &element, gauss::<1>(3), flags).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    // u(x) = 3x - 1 on [1, 3]
    let dof_values = [2.0, 8.0];
    let mut values = Vec::new();
    let mut gradients = Vec::new();
    fe_values
        .get_function_values_from_local_dof_values(&dof_values, &mut values)
        .unwrap();
    fe_values
        .get_function_gradients_from_local_dof_values(&dof_values, &mut gradients)
        .unwrap();

    let points = fe_values.get_quadrature_points().unwrap();
    assert_eq!(points.len(), 3);
    for (q, x) in points.iter().enumerate() {
        assert_scalar_eq!(values[q], 3.0 * x[0] - 1.0, comp = abs, tol = 1e-12);
        assert_scalar_eq!(gradients[q][0], 3.0, comp = abs, tol = 1e-12);
    }
}

#[test]
fn affine_fields_are_reproduced_on_parallelogram() {
    let mesh = skewed_quad_mesh();
    let cell = first_cell(&mesh);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS | UpdateFlags::HESSIANS | UpdateFlags::QUADRATURE_POINTS;
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(3), flags).unwrap();
    fe_values.reinit(&cell).unwrap();

    let f = |x: f64, y: f64| 2.0 * x - 3.0 * y + 1.0;
    let dof_values: Vec<f64> = cell.vertices().iter().map(|v| f(v.x, v.y)).collect();

    let (mut values, mut gradients, mut laplacians) = (Vec::new(), Vec::new(), Vec::new());
    let scalar = fe_values.scalar(0).unwrap();
    scalar
        .get_function_values_from_local_dof_values(&dof_values, &mut values)
        .unwrap();
    scalar
        .get_function_gradients_from_local_dof_values(&dof_values, &mut gradients)
        .unwrap();
    scalar
        .get_function_laplacians_from_local_dof_values(&dof_values, &mut laplacians)
        .unwrap();

    let points = fe_values.get_quadrature_points().unwrap();
    assert_eq!(values.len(), 9);
    for q in 0..9 {
        assert_scalar_eq!(values[q], f(points[q].x, points[q].y), comp = abs, tol = 1e-12);
        assert_matrix_eq!(gradients[q], Vector2::new(2.0, -3.0), comp = abs, tol = 1e-12);
        assert_scalar_eq!(laplacians[q], 0.0, comp = abs, tol = 1e-12);
    }
}

#[test]
fn zero_coefficients_give_zero_for_every_derivative_order() {
    let mesh = skewed_quad_mesh();
    let element = Lagrange::<f64, 2>::new(2).unwrap();
    let mapping = mapping::<2>();
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(2), UpdateFlags::SHAPE).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    let zeros = vec![0.0; 9];
    let (mut values, mut gradients, mut hessians) = (Vec::new(), Vec::new(), Vec::new());
    let (mut laplacians, mut third_derivatives) = (Vec::new(), Vec::new());
    fe_values
        .get_function_values_from_local_dof_values(&zeros, &mut values)
        .unwrap();
    fe_values
        .get_function_gradients_from_local_dof_values(&zeros, &mut gradients)
        .unwrap();
    fe_values
        .get_function_hessians_from_local_dof_values(&zeros, &mut hessians)
        .unwrap();
    fe_values
        .get_function_laplacians_from_local_dof_values(&zeros, &mut laplacians)
        .unwrap();
    fe_values
        .get_function_third_derivatives_from_local_dof_values(&zeros, &mut third_derivatives)
        .unwrap();

    assert_eq!(values, vec![0.0; 4]);
    assert_eq!(gradients, vec![Vector2::zeros(); 4]);
    assert_eq!(hessians, vec![Matrix2::zeros(); 4]);
    assert_eq!(laplacians, vec![0.0; 4]);
    assert_eq!(third_derivatives, vec![[Matrix2::zeros(); 2]; 4]);
}

#[test]
fn single_coefficient_scales_the_shape_function() {
    let mesh = skewed_quad_mesh();
    let element = Lagrange::<f64, 2>::new(2).unwrap();
    let mapping = mapping::<2>();
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS | UpdateFlags::HESSIANS;
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(3), flags).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    let c = -2.5;
    let (mut values, mut gradients, mut hessians) = (Vec::new(), Vec::new(), Vec::new());
    for k in 0..fe_values.dofs_per_cell() {
        let mut dof_values = vec![0.0; 9];
        dof_values[k] = c;
        let scalar = fe_values.scalar(0).unwrap();
        scalar
            .get_function_values_from_local_dof_values(&dof_values, &mut values)
            .unwrap();
        scalar
            .get_function_gradients_from_local_dof_values(&dof_values, &mut gradients)
            .unwrap();
        scalar
            .get_function_hessians_from_local_dof_values(&dof_values, &mut hessians)
            .unwrap();

        for q in 0..fe_values.n_quadrature_points() {
            assert_scalar_eq!(values[q], c * fe_values.shape_value(k, q).unwrap(), comp = float);
            assert_matrix_eq!(gradients[q], fe_values.shape_grad(k, q).unwrap() * c, comp = float);
            assert_matrix_eq!(hessians[q], fe_values.shape_hessian(k, q).unwrap() * c, comp = float);
            assert_eq!(scalar.value(k, q).unwrap(), fe_values.shape_value(k, q).unwrap());
        }
    }
}

#[test]
fn shape_functions_form_a_partition_of_unity() {
    let mesh = skewed_hex_mesh();
    let element = Lagrange::<f64, 3>::new(2).unwrap();
    let mapping = mapping::<3>();
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS;
    let mut fe_values: CellValues<Lagrange<f64, 3>, 3, 3> =
        FEValues::new(&mapping, &element, gauss::<3>(2), flags).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    let ones = vec![1.0; 27];
    let (mut values, mut gradients) = (Vec::new(), Vec::new());
    fe_values
        .get_function_values_from_local_dof_values(&ones, &mut values)
        .unwrap();
    fe_values
        .get_function_gradients_from_local_dof_values(&ones, &mut gradients)
        .unwrap();
    for q in 0..8 {
        assert_scalar_eq!(values[q], 1.0, comp = abs, tol = 1e-12);
        assert_matrix_eq!(gradients[q], Vector3::zeros(), comp = abs, tol = 1e-11);
    }
}

#[test]
fn reinit_on_same_cell_is_idempotent() {
    let mesh = skewed_quad_mesh();
    let cell = first_cell(&mesh);
    let element = Lagrange::<f64, 2>::new(2).unwrap();
    let mapping = mapping::<2>();
    let flags = UpdateFlags::SHAPE
        | UpdateFlags::QUADRATURE_POINTS
        | UpdateFlags::JXW_VALUES
        | UpdateFlags::JACOBIANS
        | UpdateFlags::INVERSE_JACOBIANS;
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(3), flags).unwrap();
    let dof_values = wavy_coefficients(9);

    fe_values.reinit(&cell).unwrap();
    let shape_data = fe_values.shape_data().clone();
    let mapping_data = fe_values.mapping_data().clone();
    let mut first = Vec::new();
    fe_values
        .get_function_hessians_from_local_dof_values(&dof_values, &mut first)
        .unwrap();

    fe_values.reinit(&cell).unwrap();
    let mut second = Vec::new();
    fe_values
        .get_function_hessians_from_local_dof_values(&dof_values, &mut second)
        .unwrap();

    assert_eq!(fe_values.shape_data(), &shape_data);
    assert_eq!(fe_values.mapping_data(), &mapping_data);
    assert_eq!(first, second);
}

#[test]
fn querying_a_field_without_its_flag_fails_and_leaves_output_untouched() {
    let mesh = skewed_quad_mesh();
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(2), UpdateFlags::VALUES).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    let mut gradients = vec![Vector2::new(7.0, 7.0)];
    let error = fe_values
        .scalar(0)
        .unwrap()
        .get_function_gradients_from_local_dof_values(&[1.0, 2.0, 3.0, 4.0], &mut gradients)
        .unwrap_err();
    assert_eq!(error, FeValuesError::AccessToUninitializedField("update_gradients"));
    assert_eq!(error.kind(), ErrorKind::Precondition);
    assert_eq!(gradients, vec![Vector2::new(7.0, 7.0)]);

    assert_eq!(
        fe_values.shape_grad(0, 0),
        Err(FeValuesError::AccessToUninitializedField("update_gradients"))
    );
    assert_eq!(
        fe_values.get_jxw_values().unwrap_err(),
        FeValuesError::AccessToUninitializedField("update_JxW_values")
    );
}

#[test]
fn queries_before_reinit_fail() {
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let flags = UpdateFlags::VALUES | UpdateFlags::JXW_VALUES;
    let fe_values: CellValues<Lagrange<f64, 2>, 2, 2> = FEValues::new(&mapping, &element, gauss::<2>(2), flags).unwrap();

    assert!(!fe_values.is_bound());
    let mut values = vec![3.0];
    assert_eq!(
        fe_values.get_function_values_from_local_dof_values(&[0.0; 4], &mut values),
        Err(FeValuesError::NotReinitialized)
    );
    assert_eq!(values, vec![3.0]);
    assert_eq!(fe_values.shape_value(0, 0), Err(FeValuesError::NotReinitialized));
    assert_eq!(fe_values.jxw(0), Err(FeValuesError::NotReinitialized));
    assert!(fe_values.present_cell().is_err());
}

#[test]
fn global_coefficients_need_dof_indices_of_matching_length() {
    let mut mesh = create_unit_square_uniform_quad_mesh::<f64>(2);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(2), UpdateFlags::VALUES).unwrap();

    fe_values.reinit(&first_cell(&mesh)).unwrap();
    let mut values = Vec::new();
    assert_eq!(
        fe_values.get_function_values(&vec![0.0; 9], &mut values),
        Err(FeValuesError::NeedsDofHandler)
    );

    let n_dofs = distribute_dofs(&mut mesh, &element, DofNumbering::Vertex);
    assert_eq!(n_dofs, 9);
    fe_values.reinit(&first_cell(&mesh)).unwrap();
    let error = fe_values
        .get_function_values(&vec![0.0; 8], &mut values)
        .unwrap_err();
    assert_eq!(error, FeValuesError::DimensionMismatch { actual: 8, expected: 9 });
    assert_eq!(
        fe_values.get_function_values_from_local_dof_values(&[0.0; 3], &mut values),
        Err(FeValuesError::DimensionMismatch { actual: 3, expected: 4 })
    );
    assert!(values.is_empty());
}

#[test]
fn global_and_local_coefficients_agree() {
    let mut mesh = create_unit_square_uniform_quad_mesh::<f64>(2);
    let element = q1::<2>();
    let n_dofs = distribute_dofs(&mut mesh, &element, DofNumbering::Vertex);
    let u = wavy_coefficients(n_dofs);
    let mapping = mapping::<2>();
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS;
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(2), flags).unwrap();

    let mut local = Vec::new();
    let (mut values_global, mut values_local) = (Vec::new(), Vec::new());
    let (mut gradients_global, mut gradients_local) = (Vec::new(), Vec::new());
    for cell in mesh.cell_iter() {
        fe_values.reinit(&cell).unwrap();
        fe_values.get_interpolated_dof_values(&u, &mut local).unwrap();
        let expected: Vec<f64> = cell
            .dof_indices()
            .unwrap()
            .iter()
            .map(|&i| u[i])
            .collect();
        assert_eq!(local, expected);

        fe_values.get_function_values(&u, &mut values_global).unwrap();
        fe_values
            .get_function_values_from_local_dof_values(&local, &mut values_local)
            .unwrap();
        fe_values.get_function_gradients(&u, &mut gradients_global).unwrap();
        fe_values
            .get_function_gradients_from_local_dof_values(&local, &mut gradients_local)
            .unwrap();
        assert_eq!(values_global, values_local);
        assert_eq!(gradients_global, gradients_local);
    }
}

#[test]
fn modifying_the_mesh_invalidates_the_context() {
    let mut mesh = create_unit_square_uniform_quad_mesh::<f64>(2);
    let element = q1::<2>();
    let n_dofs = distribute_dofs(&mut mesh, &element, DofNumbering::Vertex);
    let u = wavy_coefficients(n_dofs);
    let mapping = mapping::<2>();
    let flags = UpdateFlags::VALUES | UpdateFlags::QUADRATURE_POINTS;
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(2), flags).unwrap();

    fe_values.reinit(&mesh.get_cell(3).unwrap()).unwrap();
    assert!(fe_values.is_bound());
    assert_eq!(mesh.signals().n_listeners(), 1);
    let before = *fe_values.quadrature_point(0).unwrap();

    mesh.translate(&Vector2::new(1.0, 0.0));
    assert!(!fe_values.is_bound());
    let mut values = Vec::new();
    assert_eq!(
        fe_values.get_function_values(&u, &mut values),
        Err(FeValuesError::NotReinitialized)
    );
    assert_eq!(fe_values.quadrature_point(0), Err(FeValuesError::NotReinitialized));

    fe_values.reinit(&mesh.get_cell(3).unwrap()).unwrap();
    assert!(fe_values.is_bound());
    assert_eq!(mesh.signals().n_listeners(), 1);
    let after = fe_values.quadrature_point(0).unwrap();
    assert_matrix_eq!(after.coords, before.coords + Vector2::new(1.0, 0.0), comp = abs, tol = 1e-14);

    mesh.clear();
    assert!(!fe_values.is_bound());
}

#[test]
fn reinit_on_another_mesh_disconnects_from_the_previous_one() {
    let first = create_unit_square_uniform_quad_mesh::<f64>(1);
    let second = skewed_quad_mesh();
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(2), UpdateFlags::VALUES).unwrap();

    fe_values.reinit(&first_cell(&first)).unwrap();
    assert_eq!(first.signals().n_listeners(), 1);
    assert_eq!(second.signals().n_listeners(), 0);

    fe_values.reinit(&first_cell(&second)).unwrap();
    assert_eq!(first.signals().n_listeners(), 0);
    assert_eq!(second.signals().n_listeners(), 1);

    drop(fe_values);
    assert_eq!(second.signals().n_listeners(), 0);
}

#[test]
fn failed_reinit_keeps_the_present_cell() {
    let mut other = create_unit_square_uniform_quad_mesh::<f64>(1);
    let mesh = skewed_quad_mesh();
    let element = q1::<2>();
    let quadratic = Lagrange::<f64, 2>::new(2).unwrap();
    distribute_dofs(&mut other, &quadratic, DofNumbering::Discontinuous);
    let mapping = mapping::<2>();
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(2), UpdateFlags::VALUES).unwrap();

    let cell = first_cell(&mesh);
    fe_values.reinit(&cell).unwrap();
    assert_eq!(fe_values.reinit(&first_cell(&other)), Err(FeValuesError::ElementMismatch));
    assert!(fe_values.is_bound());
    assert_eq!(fe_values.present_cell().unwrap().index(), cell.index());
    assert_eq!(mesh.signals().n_listeners(), 1);
    assert_eq!(other.signals().n_listeners(), 0);
}

#[test]
fn mapping_quantities_on_parallelogram() {
    let mesh = skewed_quad_mesh();
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let flags = UpdateFlags::QUADRATURE_POINTS
        | UpdateFlags::JXW_VALUES
        | UpdateFlags::JACOBIANS
        | UpdateFlags::INVERSE_JACOBIANS;
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> = FEValues::new(&mapping, &element, gauss::<2>(2), flags).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    let expected_jacobian = Matrix2::new(2.0, 0.25, 0.5, 1.5);
    let jxw = fe_values.get_jxw_values().unwrap();
    assert_eq!(jxw.len(), 4);
    assert_scalar_eq!(jxw.iter().sum::<f64>(), 2.875, comp = abs, tol = 1e-12);

    let centroid = fe_values
        .get_quadrature_points()
        .unwrap()
        .iter()
        .zip(jxw)
        .fold(Vector2::zeros(), |sum, (x, w)| sum + x.coords * *w)
        / 2.875;
    assert_matrix_eq!(centroid, Vector2::new(1.625, 0.75), comp = abs, tol = 1e-12);

    for q in 0..4 {
        let jacobian = *fe_values.jacobian(q).unwrap();
        let inverse = *fe_values.inverse_jacobian(q).unwrap();
        assert_matrix_eq!(jacobian, expected_jacobian, comp = abs, tol = 1e-12);
        assert_matrix_eq!(inverse * jacobian, Matrix2::identity(), comp = abs, tol = 1e-12);
    }
    assert_eq!(
        fe_values.jxw(4),
        Err(FeValuesError::IndexOutOfRange { index: 4, end: 4 })
    );
}

#[test]
fn volume_of_parallelepiped() {
    let mesh = skewed_hex_mesh();
    let cell = first_cell(&mesh);
    let element = q1::<3>();
    let mapping = mapping::<3>();
    let mut fe_values: CellValues<Lagrange<f64, 3>, 3, 3> =
        FEValues::new(&mapping, &element, gauss::<3>(2), UpdateFlags::JXW_VALUES).unwrap();
    fe_values.reinit(&cell).unwrap();

    let vertices = cell.vertices();
    let axes = Matrix3::from_columns(&[
        vertices[1] - vertices[0],
        vertices[2] - vertices[0],
        vertices[4] - vertices[0],
    ]);
    let volume: f64 = fe_values.get_jxw_values().unwrap().iter().sum();
    assert_scalar_eq!(volume, axes.determinant(), comp = abs, tol = 1e-12);
}

#[test]
fn construction_validates_configuration() {
    let element = q1::<2>();
    let mapping = mapping::<2>();
    type Values<'a> = CellValues<'a, Lagrange<f64, 2>, 2, 2>;

    let wrong_dimension = Values::new(&mapping, &element, Quadrature::gauss(2, 1), UpdateFlags::VALUES);
    let error = wrong_dimension.err().unwrap();
    assert!(matches!(error, FeValuesError::InvalidConfiguration(_)));
    assert_eq!(error.kind(), ErrorKind::Configuration);

    let empty = Values::new(&mapping, &element, Quadrature::new(2, vec![], vec![]), UpdateFlags::VALUES);
    assert!(matches!(empty.err().unwrap(), FeValuesError::InvalidConfiguration(_)));

    let normals = Values::new(&mapping, &element, gauss::<2>(1), UpdateFlags::NORMAL_VECTORS);
    assert!(matches!(normals.err().unwrap(), FeValuesError::InvalidConfiguration(_)));

    let line_mapping = AffineMapping::new(ReferenceCell::Line);
    let incompatible = Values::new(&line_mapping, &element, gauss::<2>(1), UpdateFlags::VALUES);
    assert_eq!(
        incompatible.err().unwrap(),
        FeValuesError::IncompatibleMapping(ReferenceCell::Quadrilateral)
    );
}

#[test]
fn cell_with_other_element_is_rejected() {
    let mut mesh = create_unit_interval_mesh::<f64>(2);
    let linear = q1::<1>();
    distribute_dofs(&mut mesh, &linear, DofNumbering::Vertex);
    let quadratic = Lagrange::<f64, 1>::new(2).unwrap();
    let mapping = mapping::<1>();

    let mut fe_values: CellValues<Lagrange<f64, 1>, 1, 1> =
        FEValues::new(&mapping, &quadratic, gauss::<1>(2), UpdateFlags::VALUES).unwrap();
    assert_eq!(fe_values.reinit(&first_cell(&mesh)), Err(FeValuesError::ElementMismatch));

    let mut fe_values: CellValues<Lagrange<f64, 1>, 1, 1> =
        FEValues::new(&mapping, &linear, gauss::<1>(2), UpdateFlags::VALUES).unwrap();
    assert_eq!(fe_values.reinit(&first_cell(&mesh)), Ok(()));
}

#[test]
fn derivative_flags_require_inverse_jacobians() {
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let computed = compute_update_flags::<f64, AffineMapping, Lagrange<f64, 2>, 2, 2>(
        &mapping,
        &element,
        UpdateFlags::GRADIENTS,
    );
    assert_eq!(computed, UpdateFlags::GRADIENTS | UpdateFlags::INVERSE_JACOBIANS);

    let values_only = compute_update_flags::<f64, AffineMapping, Lagrange<f64, 2>, 2, 2>(
        &mapping,
        &element,
        UpdateFlags::VALUES,
    );
    assert_eq!(values_only, UpdateFlags::VALUES);

    let fe_values: CellValues<Lagrange<f64, 2>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(1), UpdateFlags::HESSIANS).unwrap();
    assert_eq!(fe_values.update_flags(), UpdateFlags::HESSIANS | UpdateFlags::INVERSE_JACOBIANS);
}

#[test]
fn dual_coefficients_carry_sensitivities() {
    let mesh = skewed_quad_mesh();
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let flags = UpdateFlags::VALUES | UpdateFlags::GRADIENTS;
    let mut fe_values: CellValues<Lagrange<f64, 2>, 2, 2> = FEValues::new(&mapping, &element, gauss::<2>(2), flags).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    let plain = wavy_coefficients(4);
    let mut dual: Vec<Dual<f64>> = plain.iter().copied().map(Dual::constant).collect();
    dual[2] = Dual::variable(plain[2]);

    let (mut values, mut dual_values) = (Vec::new(), Vec::new());
    let mut dual_gradients = Vec::new();
    fe_values
        .get_function_values_from_local_dof_values(&plain, &mut values)
        .unwrap();
    fe_values
        .get_function_values_from_local_dof_values(&dual, &mut dual_values)
        .unwrap();
    fe_values
        .get_function_gradients_from_local_dof_values(&dual, &mut dual_gradients)
        .unwrap();

    for q in 0..4 {
        assert_scalar_eq!(dual_values[q].value, values[q], comp = abs, tol = 1e-14);
        assert_scalar_eq!(dual_values[q].derivative, fe_values.shape_value(2, q).unwrap(), comp = abs, tol = 1e-14);
        let gradient = fe_values.shape_grad(2, q).unwrap();
        for d in 0..2 {
            assert_scalar_eq!(dual_gradients[q][d].derivative, gradient[d], comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn system_element_rejects_scalar_queries() {
    let mesh = skewed_quad_mesh();
    let element = SystemElement::new(q1::<2>(), 2).unwrap();
    let mapping = mapping::<2>();
    let mut fe_values: CellValues<SystemElement<f64, Lagrange<f64, 2>>, 2, 2> =
        FEValues::new(&mapping, &element, gauss::<2>(2), UpdateFlags::VALUES).unwrap();
    fe_values.reinit(&first_cell(&mesh)).unwrap();

    let mut values = Vec::new();
    assert_eq!(
        fe_values.get_function_values_from_local_dof_values(&[0.0; 8], &mut values),
        Err(FeValuesError::DimensionMismatch { actual: 2, expected: 1 })
    );
    assert_eq!(fe_values.shape_value(1, 0).unwrap(), fe_values.shape_value_component(1, 0, 1).unwrap());
    assert_eq!(fe_values.shape_value_component(1, 0, 0).unwrap(), 0.0);
}

#[test]
fn settings_round_trip_through_json() {
    let settings: EvaluationSettings = serde_json::from_str(r#"{"similarity":"Disabled"}"#).unwrap();
    assert_eq!(settings.similarity, SimilarityDetection::Disabled);
    assert_eq!(EvaluationSettings::default().similarity, SimilarityDetection::Automatic);
    let json = serde_json::to_string(&settings).unwrap();
    insta::assert_snapshot!(json, @r###"{"similarity":"Disabled"}"###);
}

#[test]
fn error_messages() {
    insta::assert_snapshot!(
        FeValuesError::AccessToUninitializedField("update_gradients").to_string(),
        @"You are requesting information from an object that is not initialized for this field. Add `update_gradients` to the update flags."
    );
    insta::assert_snapshot!(
        FeValuesError::NotMultiple { dividend: 7, divisor: 4 }.to_string(),
        @"Division of 7 by 4 has a non-zero remainder"
    );
    insta::assert_snapshot!(
        FeValuesError::IndexOutOfRange { index: 4, end: 4 }.to_string(),
        @"Index 4 is not in the half-open range [0, 4)"
    );
    insta::assert_debug_snapshot!(
        UpdateFlags::VALUES | UpdateFlags::GRADIENTS | UpdateFlags::INVERSE_JACOBIANS,
        @"UpdateFlags(update_values | update_gradients | update_inverse_jacobians)"
    );
}
