use super::{EvaluationSettings, FEValuesBase};
use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::{check_index, FeValuesError};
use crate::flags::UpdateFlags;
use crate::mapping::Mapping;
use crate::quadrature::{QCollection, Quadrature};
use fevalues_traits::Real;
use nalgebra::SVector;
use std::ops::Deref;

/// Checks a quadrature rule for use on faces of cells of dimension `dim`.
pub(super) fn check_face_quadrature<T: Real>(quadrature: &Quadrature<T>, dim: usize) -> Result<(), FeValuesError> {
    if dim == 0 || quadrature.dim() + 1 != dim {
        return Err(FeValuesError::InvalidConfiguration(format!(
            "Quadrature of dimension {} cannot be used on faces of cells of dimension {}",
            quadrature.dim(),
            dim
        )));
    }
    if quadrature.is_empty() {
        return Err(FeValuesError::InvalidConfiguration("Quadrature has no points".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PresentFace {
    pub number: usize,
    pub index: usize,
}

/// Shape functions and mapping quantities at the quadrature points of a face of a cell.
///
/// The quadrature is given as a collection holding either one rule for all faces or one rule per
/// face, so the number of quadrature points may change from face to face.
pub struct FEFaceValues<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    base: FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>,
    quadrature: QCollection<T>,
    present_face: Option<PresentFace>,
}

impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> FEFaceValues<'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    pub fn new(
        mapping: &'a M,
        element: &'a E,
        quadrature: impl Into<QCollection<T>>,
        flags: UpdateFlags,
    ) -> Result<Self, FeValuesError> {
        Self::with_settings(mapping, element, quadrature, flags, EvaluationSettings::default())
    }

    pub fn with_settings(
        mapping: &'a M,
        element: &'a E,
        quadrature: impl Into<QCollection<T>>,
        flags: UpdateFlags,
        settings: EvaluationSettings,
    ) -> Result<Self, FeValuesError> {
        let quadrature = quadrature.into();
        let n_faces = element.reference_cell().n_faces();
        if quadrature.is_empty() || (quadrature.len() != 1 && quadrature.len() != n_faces) {
            return Err(FeValuesError::InvalidConfiguration(format!(
                "Expected one quadrature rule or one per face ({}), got {}",
                n_faces,
                quadrature.len()
            )));
        }
        for rule in quadrature.iter() {
            check_face_quadrature(rule, DIM)?;
        }

        let base = FEValuesBase::new(
            mapping,
            element,
            flags,
            quadrature.rule(0).size(),
            quadrature.max_n_quadrature_points(),
            settings,
            |flags, output| {
                let (element_internal, mapping_internal) = rayon::join(
                    || element.get_face_data(flags, mapping, &quadrature, output),
                    || mapping.get_face_data(flags, &quadrature),
                );
                (mapping_internal, element_internal)
            },
        )?;
        Ok(Self {
            base,
            quadrature,
            present_face: None,
        })
    }

    pub fn quadrature(&self) -> &QCollection<T> {
        &self.quadrature
    }

    /// Computes all requested quantities on face `face_no` of `cell`.
    pub fn reinit(&mut self, cell: &C, face_no: usize) -> Result<(), FeValuesError> {
        self.base.check_cell(cell)?;
        check_index(face_no, cell.reference_cell().n_faces())?;
        self.base.bind_mesh(cell);

        let base = &mut self.base;
        let (dof_indices, n_global_dofs) = base.gather_dof_indices(cell);
        base.n_quadrature_points = self.quadrature.rule(face_no).size();

        if base.update_flags.intersects(UpdateFlags::MAPPING) {
            base.mapping.fill_fe_face_values(
                cell,
                face_no,
                &self.quadrature,
                &mut base.mapping_internal,
                &mut base.mapping_output,
            );
        }
        base.element.fill_fe_face_values(
            cell,
            face_no,
            &self.quadrature,
            base.mapping,
            &base.mapping_internal,
            &base.mapping_output,
            &mut base.element_internal,
            &mut base.element_output,
        );

        self.present_face = Some(PresentFace {
            number: face_no,
            index: cell.face_index(face_no),
        });
        base.set_present(cell, dof_indices, n_global_dofs);
        Ok(())
    }

    /// The number of the present face within its cell.
    pub fn present_face_number(&self) -> Result<usize, FeValuesError> {
        self.base.present()?;
        self.present_face
            .map(|face| face.number)
            .ok_or(FeValuesError::NotReinitialized)
    }

    /// The global index of the present face.
    pub fn present_face_index(&self) -> Result<usize, FeValuesError> {
        self.base.present()?;
        self.present_face
            .map(|face| face.index)
            .ok_or(FeValuesError::NotReinitialized)
    }

    /// Outward normal vectors scaled by the surface element.
    pub fn get_boundary_forms(&self) -> Result<&[SVector<T, SPACEDIM>], FeValuesError> {
        self.base.get_boundary_forms()
    }

    pub fn boundary_form(&self, q: usize) -> Result<&SVector<T, SPACEDIM>, FeValuesError> {
        self.base.boundary_form(q)
    }
}

impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> Deref for FEFaceValues<'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    type Target = FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}
