use super::face::{check_face_quadrature, PresentFace};
use super::{EvaluationSettings, FEValuesBase};
use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::{check_index, FeValuesError};
use crate::flags::UpdateFlags;
use crate::mapping::Mapping;
use crate::quadrature::Quadrature;
use fevalues_traits::Real;
use nalgebra::SVector;
use std::ops::Deref;

/// Shape functions and mapping quantities at the quadrature points of a child of a face.
///
/// The quadrature rule is given on the reference face and mapped onto the child, so the
/// quadrature points of all children of a face together cover the face.
pub struct FESubfaceValues<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    base: FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>,
    quadrature: Quadrature<T>,
    present_face: Option<PresentFace>,
}

impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> FESubfaceValues<'a, T, M, E, C, DIM, SPACEDIM>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    pub fn new(mapping: &'a M, element: &'a E, quadrature: Quadrature<T>, flags: UpdateFlags) -> Result<Self, FeValuesError> {
        Self::with_settings(mapping, element, quadrature, flags, EvaluationSettings::default())
    }

    pub fn with_settings(
        mapping: &'a M,
        element: &'a E,
        quadrature: Quadrature<T>,
        flags: UpdateFlags,
        settings: EvaluationSettings,
    ) -> Result<Self, FeValuesError> {
        check_face_quadrature(&quadrature, DIM)?;

        let n_quadrature_points = quadrature.size();
        let base = FEValuesBase::new(
            mapping,
            element,
            flags,
            n_quadrature_points,
            n_quadrature_points,
            settings,
            |flags, output| {
                let (element_internal, mapping_internal) = rayon::join(
                    || element.get_subface_data(flags, mapping, &quadrature, output),
                    || mapping.get_subface_data(flags, &quadrature),
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

    pub fn quadrature(&self) -> &Quadrature<T> {
        &self.quadrature
    }

    /// Computes all requested quantities on child `subface_no` of face `face_no` of `cell`.
    ///
    /// The cell itself must not be refined. If the face has no children but the neighbor across a
    /// periodic boundary is refined, the part of the face corresponding to `subface_no` is still
    /// visited, and the present face index is that of the face itself. A face that has neither
    /// children nor a refined periodic neighbor has no subfaces.
    pub fn reinit(&mut self, cell: &C, face_no: usize, subface_no: usize) -> Result<(), FeValuesError> {
        self.base.check_cell(cell)?;
        let reference_cell = cell.reference_cell();
        check_index(face_no, reference_cell.n_faces())?;
        if cell.has_children() {
            return Err(FeValuesError::RefinedCell);
        }
        let face_has_children = cell.face_has_children(face_no);
        check_index(subface_no, cell.n_subfaces(face_no))?;
        self.base.bind_mesh(cell);

        let base = &mut self.base;
        let (dof_indices, n_global_dofs) = base.gather_dof_indices(cell);

        if base.update_flags.intersects(UpdateFlags::MAPPING) {
            base.mapping.fill_fe_subface_values(
                cell,
                face_no,
                subface_no,
                &self.quadrature,
                &mut base.mapping_internal,
                &mut base.mapping_output,
            );
        }
        base.element.fill_fe_subface_values(
            cell,
            face_no,
            subface_no,
            &self.quadrature,
            base.mapping,
            &base.mapping_internal,
            &base.mapping_output,
            &mut base.element_internal,
            &mut base.element_output,
        );

        let index = if face_has_children {
            cell.subface_index(face_no, subface_no)
        } else {
            cell.face_index(face_no)
        };
        self.present_face = Some(PresentFace { number: face_no, index });
        base.set_present(cell, dof_indices, n_global_dofs);
        Ok(())
    }

    pub fn present_face_number(&self) -> Result<usize, FeValuesError> {
        self.base.present()?;
        self.present_face
            .map(|face| face.number)
            .ok_or(FeValuesError::NotReinitialized)
    }

    /// The global index of the present subface, or of the face if it has no children.
    pub fn present_face_index(&self) -> Result<usize, FeValuesError> {
        self.base.present()?;
        self.present_face
            .map(|face| face.index)
            .ok_or(FeValuesError::NotReinitialized)
    }

    pub fn get_boundary_forms(&self) -> Result<&[SVector<T, SPACEDIM>], FeValuesError> {
        self.base.get_boundary_forms()
    }

    pub fn boundary_form(&self, q: usize) -> Result<&SVector<T, SPACEDIM>, FeValuesError> {
        self.base.boundary_form(q)
    }
}

impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> Deref for FESubfaceValues<'a, T, M, E, C, DIM, SPACEDIM>
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
