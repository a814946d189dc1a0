use crate::{first_cell, gauss, mapping, q1, single_cell_mesh, skewed_hex_mesh, skewed_quad_mesh, FaceValues, SubfaceValues};
use fevalues::cell::Cell;
use fevalues::element::Lagrange;
use fevalues::mesh::procedural::create_interval_mesh;
use fevalues::quadrature::{QCollection, Quadrature};
use fevalues::{ErrorKind, FEFaceValues, FESubfaceValues, FeValuesError, UpdateFlags};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{point, Vector1, Vector2, Vector3};

fn face_flags() -> UpdateFlags {
    UpdateFlags::VALUES
        | UpdateFlags::QUADRATURE_POINTS
        | UpdateFlags::JXW_VALUES
        | UpdateFlags::NORMAL_VECTORS
        | UpdateFlags::BOUNDARY_FORMS
}

#[test]
fn normals_and_surface_elements_of_rectangle_faces() {
    let mesh = single_cell_mesh(point![0.0, 0.0], [[2.0, 0.0], [0.0, 1.0]]);
    let cell = first_cell(&mesh);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_face_values: FaceValues<Lagrange<f64, 2>, 2, 2> =
        FEFaceValues::new(&mapping, &element, gauss::<1>(2), face_flags()).unwrap();

    let expected = [
        (Vector2::new(-1.0, 0.0), 1.0),
        (Vector2::new(1.0, 0.0), 1.0),
        (Vector2::new(0.0, -1.0), 2.0),
        (Vector2::new(0.0, 1.0), 2.0),
    ];
    for (face_no, (normal, length)) in expected.into_iter().enumerate() {
        fe_face_values.reinit(&cell, face_no).unwrap();
        assert_eq!(fe_face_values.present_face_number(), Ok(face_no));
        assert_eq!(fe_face_values.present_face_index(), Ok(mesh.face_index(0, face_no).unwrap()));
        assert_eq!(fe_face_values.n_quadrature_points(), 2);

        let jxw: f64 = fe_face_values.get_jxw_values().unwrap().iter().sum();
        assert_scalar_eq!(jxw, length, comp = abs, tol = 1e-14);
        for q in 0..2 {
            assert_matrix_eq!(*fe_face_values.normal_vector(q).unwrap(), normal, comp = abs, tol = 1e-14);
            assert_matrix_eq!(*fe_face_values.boundary_form(q).unwrap(), normal * length, comp = abs, tol = 1e-14);
        }
    }

    // Points of the face x = 2
    fe_face_values.reinit(&cell, 1).unwrap();
    for x in fe_face_values.get_quadrature_points().unwrap() {
        assert_scalar_eq!(x.x, 2.0, comp = abs, tol = 1e-14);
    }
}

#[test]
fn outward_normal_of_skewed_face() {
    let mesh = skewed_quad_mesh();
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_face_values: FaceValues<Lagrange<f64, 2>, 2, 2> =
        FEFaceValues::new(&mapping, &element, gauss::<1>(3), face_flags()).unwrap();
    fe_face_values.reinit(&first_cell(&mesh), 0).unwrap();

    // Face 0 is spanned by the second axis and points away from the first
    let (a, b) = (Vector2::<f64>::new(2.0, 0.5), Vector2::<f64>::new(0.25, 1.5));
    let jxw: f64 = fe_face_values.get_jxw_values().unwrap().iter().sum();
    assert_scalar_eq!(jxw, b.norm(), comp = abs, tol = 1e-13);
    let normal = *fe_face_values.normal_vector(0).unwrap();
    assert_scalar_eq!(normal.norm(), 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(normal.dot(&b), 0.0, comp = abs, tol = 1e-14);
    assert!(normal.dot(&a) < 0.0);
}

#[test]
fn affine_field_on_faces_of_parallelogram() {
    let mesh = skewed_quad_mesh();
    let cell = first_cell(&mesh);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_face_values: FaceValues<Lagrange<f64, 2>, 2, 2> =
        FEFaceValues::new(&mapping, &element, gauss::<1>(2), face_flags()).unwrap();

    let f = |x: f64, y: f64| 0.5 * x + 4.0 * y - 2.0;
    let dof_values: Vec<f64> = cell.vertices().iter().map(|v| f(v.x, v.y)).collect();
    let mut values = Vec::new();
    for face_no in 0..4 {
        fe_face_values.reinit(&cell, face_no).unwrap();
        fe_face_values
            .get_function_values_from_local_dof_values(&dof_values, &mut values)
            .unwrap();
        let points = fe_face_values.get_quadrature_points().unwrap();
        assert_eq!(values.len(), points.len());
        for (value, x) in values.iter().zip(points) {
            assert_scalar_eq!(*value, f(x.x, x.y), comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn quadrature_per_face() {
    let mesh = skewed_quad_mesh();
    let cell = first_cell(&mesh);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let rules = QCollection::new((1..=4).map(gauss::<1>).collect());
    let mut fe_face_values: FaceValues<Lagrange<f64, 2>, 2, 2> =
        FEFaceValues::new(&mapping, &element, rules, UpdateFlags::VALUES | UpdateFlags::JXW_VALUES).unwrap();
    assert_eq!(fe_face_values.max_n_quadrature_points(), 4);

    let mut values = Vec::new();
    for face_no in 0..4 {
        fe_face_values.reinit(&cell, face_no).unwrap();
        assert_eq!(fe_face_values.n_quadrature_points(), face_no + 1);
        assert_eq!(fe_face_values.get_jxw_values().unwrap().len(), face_no + 1);
        fe_face_values
            .get_function_values_from_local_dof_values(&[1.0; 4], &mut values)
            .unwrap();
        assert_eq!(values.len(), face_no + 1);
        for value in &values {
            assert_scalar_eq!(*value, 1.0, comp = abs, tol = 1e-14);
        }
    }
}

#[test]
fn faces_of_an_interval() {
    let mesh = create_interval_mesh(1.0, 3.0, 1);
    let cell = first_cell(&mesh);
    let element = q1::<1>();
    let mapping = mapping::<1>();
    let mut fe_face_values: FaceValues<Lagrange<f64, 1>, 1, 1> =
        FEFaceValues::new(&mapping, &element, Quadrature::gauss(1, 0), face_flags()).unwrap();

    let dof_values = [5.0, -1.0];
    let mut values = Vec::new();
    for (face_no, (normal, x)) in [(-1.0, 1.0), (1.0, 3.0)].into_iter().enumerate() {
        fe_face_values.reinit(&cell, face_no).unwrap();
        assert_eq!(fe_face_values.n_quadrature_points(), 1);
        assert_scalar_eq!(fe_face_values.jxw(0).unwrap(), 1.0, comp = abs, tol = 1e-14);
        assert_matrix_eq!(*fe_face_values.normal_vector(0).unwrap(), Vector1::new(normal), comp = abs, tol = 1e-14);
        assert_scalar_eq!(fe_face_values.quadrature_point(0).unwrap().x, x, comp = abs, tol = 1e-14);
        fe_face_values
            .get_function_values_from_local_dof_values(&dof_values, &mut values)
            .unwrap();
        assert_scalar_eq!(values[0], dof_values[face_no], comp = abs, tol = 1e-14);
    }
}

#[test]
fn face_of_parallelepiped() {
    let mesh = skewed_hex_mesh();
    let cell = first_cell(&mesh);
    let element = q1::<3>();
    let mapping = mapping::<3>();
    let mut fe_face_values: FaceValues<Lagrange<f64, 3>, 3, 3> =
        FEFaceValues::new(&mapping, &element, gauss::<2>(2), face_flags()).unwrap();
    fe_face_values.reinit(&cell, 4).unwrap();

    let vertices = cell.vertices();
    let a: Vector3<f64> = vertices[1] - vertices[0];
    let b: Vector3<f64> = vertices[2] - vertices[0];
    let c: Vector3<f64> = vertices[4] - vertices[0];
    let area: f64 = fe_face_values.get_jxw_values().unwrap().iter().sum();
    assert_scalar_eq!(area, a.cross(&b).norm(), comp = abs, tol = 1e-12);

    let normal = *fe_face_values.normal_vector(0).unwrap();
    assert_scalar_eq!(normal.dot(&a), 0.0, comp = abs, tol = 1e-13);
    assert_scalar_eq!(normal.dot(&b), 0.0, comp = abs, tol = 1e-13);
    assert!(normal.dot(&c) < 0.0);
    for x in fe_face_values.get_quadrature_points().unwrap() {
        assert_scalar_eq!((x - vertices[0]).dot(&normal), 0.0, comp = abs, tol = 1e-13);
    }
}

#[test]
fn face_values_validate_configuration_and_state() {
    let mesh = skewed_quad_mesh();
    let element = q1::<2>();
    let mapping = mapping::<2>();
    type Values<'a> = FaceValues<'a, Lagrange<f64, 2>, 2, 2>;

    let three_rules = QCollection::new(vec![gauss::<1>(1), gauss::<1>(2), gauss::<1>(3)]);
    let error = Values::new(&mapping, &element, three_rules, UpdateFlags::VALUES)
        .err()
        .unwrap();
    assert!(matches!(error, FeValuesError::InvalidConfiguration(_)));

    let cell_rule = Values::new(&mapping, &element, gauss::<2>(2), UpdateFlags::VALUES);
    assert!(matches!(cell_rule.err().unwrap(), FeValuesError::InvalidConfiguration(_)));

    let mut fe_face_values = Values::new(&mapping, &element, gauss::<1>(2), UpdateFlags::VALUES).unwrap();
    assert_eq!(fe_face_values.present_face_number(), Err(FeValuesError::NotReinitialized));
    let error = fe_face_values.reinit(&first_cell(&mesh), 4).unwrap_err();
    assert_eq!(error, FeValuesError::IndexOutOfRange { index: 4, end: 4 });
    assert_eq!(error.kind(), ErrorKind::Range);
    assert!(!fe_face_values.is_bound());
    assert_eq!(
        fe_face_values.get_boundary_forms().unwrap_err(),
        FeValuesError::AccessToUninitializedField("update_boundary_forms")
    );
}

#[test]
fn subfaces_cover_the_refined_face() {
    let mut mesh = single_cell_mesh(point![0.0, 0.0], [[1.0, 0.0], [0.0, 1.0]]);
    let face = mesh.face_index(0, 1).unwrap();
    mesh.refine_face(face).unwrap();
    let cell = first_cell(&mesh);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_subface_values: SubfaceValues<Lagrange<f64, 2>, 2, 2> =
        FESubfaceValues::new(&mapping, &element, gauss::<1>(2), face_flags()).unwrap();

    let f = |x: f64, y: f64| 3.0 * x - y;
    let dof_values: Vec<f64> = cell.vertices().iter().map(|v| f(v.x, v.y)).collect();
    let mut values = Vec::new();
    let mut total = 0.0;
    for subface_no in 0..2 {
        fe_subface_values.reinit(&cell, 1, subface_no).unwrap();
        assert_eq!(fe_subface_values.present_face_number(), Ok(1));
        assert_eq!(fe_subface_values.present_face_index(), Ok(4 + subface_no));

        let jxw: f64 = fe_subface_values.get_jxw_values().unwrap().iter().sum();
        assert_scalar_eq!(jxw, 0.5, comp = abs, tol = 1e-14);
        total += jxw;
        assert_matrix_eq!(*fe_subface_values.boundary_form(0).unwrap(), Vector2::new(0.5, 0.0), comp = abs, tol = 1e-14);

        fe_subface_values
            .get_function_values_from_local_dof_values(&dof_values, &mut values)
            .unwrap();
        let lower = 0.5 * subface_no as f64;
        for (x, value) in fe_subface_values.get_quadrature_points().unwrap().iter().zip(&values) {
            assert_scalar_eq!(x.x, 1.0, comp = abs, tol = 1e-14);
            assert!(x.y >= lower && x.y <= lower + 0.5);
            assert_scalar_eq!(*value, f(x.x, x.y), comp = abs, tol = 1e-13);
        }
    }
    assert_scalar_eq!(total, 1.0, comp = abs, tol = 1e-14);

    assert_eq!(
        fe_subface_values.reinit(&cell, 1, 2),
        Err(FeValuesError::IndexOutOfRange { index: 2, end: 2 })
    );
}

#[test]
fn subfaces_of_periodic_face_without_children() {
    let mut mesh = single_cell_mesh(point![0.0, 0.0], [[1.0, 0.0], [0.0, 1.0]]);
    let (left, right) = (mesh.face_index(0, 0).unwrap(), mesh.face_index(0, 1).unwrap());
    mesh.make_periodic(left, right).unwrap();
    mesh.refine_face(right).unwrap();
    let cell = first_cell(&mesh);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let flags = UpdateFlags::QUADRATURE_POINTS | UpdateFlags::JXW_VALUES;
    let mut fe_subface_values: SubfaceValues<Lagrange<f64, 2>, 2, 2> =
        FESubfaceValues::new(&mapping, &element, gauss::<1>(2), flags).unwrap();

    fe_subface_values.reinit(&cell, 0, 1).unwrap();
    assert_eq!(fe_subface_values.present_face_index(), Ok(left));
    for x in fe_subface_values.get_quadrature_points().unwrap() {
        assert_scalar_eq!(x.x, 0.0, comp = abs, tol = 1e-14);
        assert!(x.y >= 0.5);
    }
    assert_eq!(
        fe_subface_values.reinit(&cell, 0, 2),
        Err(FeValuesError::IndexOutOfRange { index: 2, end: 2 })
    );
}

#[test]
fn childless_face_without_periodic_neighbor_has_no_subfaces() {
    let mut mesh = single_cell_mesh(point![0.0, 0.0], [[1.0, 0.0], [0.0, 1.0]]);
    let refined = mesh.face_index(0, 1).unwrap();
    mesh.refine_face(refined).unwrap();
    let cell = first_cell(&mesh);
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_subface_values: SubfaceValues<Lagrange<f64, 2>, 2, 2> =
        FESubfaceValues::new(&mapping, &element, gauss::<1>(2), UpdateFlags::JXW_VALUES).unwrap();

    for face_no in [0, 2, 3] {
        assert_eq!(cell.n_subfaces(face_no), 0);
        for subface_no in 0..2 {
            let error = fe_subface_values
                .reinit(&cell, face_no, subface_no)
                .unwrap_err();
            assert_eq!(error, FeValuesError::IndexOutOfRange { index: subface_no, end: 0 });
            assert_eq!(error.kind(), ErrorKind::Range);
        }
    }
    assert_eq!(fe_subface_values.present_face_index(), Err(FeValuesError::NotReinitialized));

    fe_subface_values.reinit(&cell, 1, 1).unwrap();
    assert_eq!(fe_subface_values.present_face_index(), Ok(cell.subface_index(1, 1)));
}

#[test]
fn subfaces_of_a_cube_face() {
    let mut mesh = single_cell_mesh(point![0.0, 0.0, 0.0], [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
    let face = mesh.face_index(0, 5).unwrap();
    mesh.refine_face(face).unwrap();
    let cell = first_cell(&mesh);
    let element = q1::<3>();
    let mapping = mapping::<3>();
    let flags = UpdateFlags::QUADRATURE_POINTS | UpdateFlags::JXW_VALUES;
    let mut fe_subface_values: SubfaceValues<Lagrange<f64, 3>, 3, 3> =
        FESubfaceValues::new(&mapping, &element, gauss::<2>(1), flags).unwrap();

    let mut centroid = Vector3::zeros();
    for subface_no in 0..4 {
        fe_subface_values.reinit(&cell, 5, subface_no).unwrap();
        assert_scalar_eq!(fe_subface_values.jxw(0).unwrap(), 0.25, comp = abs, tol = 1e-14);
        centroid += fe_subface_values.quadrature_point(0).unwrap().coords / 4.0;
    }
    assert_matrix_eq!(centroid, Vector3::new(0.5, 0.5, 1.0), comp = abs, tol = 1e-14);
}

#[test]
fn subface_values_are_not_defined_on_refined_cells() {
    let mut mesh = skewed_quad_mesh();
    mesh.refine_cell(0).unwrap();
    let element = q1::<2>();
    let mapping = mapping::<2>();
    let mut fe_subface_values: SubfaceValues<Lagrange<f64, 2>, 2, 2> =
        FESubfaceValues::new(&mapping, &element, gauss::<1>(2), UpdateFlags::VALUES).unwrap();

    let error = fe_subface_values
        .reinit(&first_cell(&mesh), 0, 0)
        .unwrap_err();
    assert_eq!(error, FeValuesError::RefinedCell);
    assert_eq!(error.kind(), ErrorKind::Precondition);
    assert_eq!(fe_subface_values.present_face_index(), Err(FeValuesError::NotReinitialized));
}
