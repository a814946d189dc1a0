use super::{EvaluationSettings, FEValuesBase};
use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use crate::flags::UpdateFlags;
use crate::mapping::Mapping;
use crate::quadrature::Quadrature;
use crate::similarity::classify_similarity;
use fevalues_traits::Real;
use std::ops::Deref;

/// Shape functions and mapping quantities at the quadrature points of a cell.
pub struct FEValues<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize>
where
    T: Real,
    M: Mapping<T, DIM, SPACEDIM>,
    E: FiniteElement<T, DIM, SPACEDIM>,
    C: Cell<T, SPACEDIM>,
{
    base: FEValuesBase<'a, T, M, E, C, DIM, SPACEDIM>,
    quadrature: Quadrature<T>,
}

impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> FEValues<'a, T, M, E, C, DIM, SPACEDIM>
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
        if quadrature.dim() != DIM {
            return Err(FeValuesError::InvalidConfiguration(format!(
                "Quadrature of dimension {} cannot be used on cells of dimension {}",
                quadrature.dim(),
                DIM
            )));
        }
        if quadrature.is_empty() {
            return Err(FeValuesError::InvalidConfiguration("Quadrature has no points".to_string()));
        }
        if flags.contains(UpdateFlags::NORMAL_VECTORS) && DIM + 1 != SPACEDIM {
            return Err(FeValuesError::InvalidConfiguration(
                "Cell normal vectors are only defined for cells of codimension one".to_string(),
            ));
        }

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
                    || element.get_data(flags, mapping, &quadrature, output),
                    || mapping.get_data(flags, &quadrature),
                );
                (mapping_internal, element_internal)
            },
        )?;
        Ok(Self { base, quadrature })
    }

    pub fn quadrature(&self) -> &Quadrature<T> {
        &self.quadrature
    }

    /// Computes all requested quantities on `cell`.
    ///
    /// On failure, the context stays bound to the previous cell.
    pub fn reinit(&mut self, cell: &C) -> Result<(), FeValuesError> {
        self.base.check_cell(cell)?;
        self.base.bind_mesh(cell);

        let base = &mut self.base;
        let similarity = classify_similarity::<T, C, DIM, SPACEDIM>(
            base.settings.similarity,
            base.present.as_ref().map(|present| &present.cell),
            base.cell_similarity,
            cell,
        );
        let (dof_indices, n_global_dofs) = base.gather_dof_indices(cell);

        let similarity = if base.update_flags.intersects(UpdateFlags::MAPPING) {
            base.mapping.fill_fe_values(
                cell,
                similarity,
                &self.quadrature,
                &mut base.mapping_internal,
                &mut base.mapping_output,
            )
        } else {
            similarity
        };
        base.element.fill_fe_values(
            cell,
            similarity,
            &self.quadrature,
            base.mapping,
            &base.mapping_internal,
            &base.mapping_output,
            &mut base.element_internal,
            &mut base.element_output,
        );

        base.cell_similarity = similarity;
        base.set_present(cell, dof_indices, n_global_dofs);
        Ok(())
    }
}

impl<'a, T, M, E, C, const DIM: usize, const SPACEDIM: usize> Deref for FEValues<'a, T, M, E, C, DIM, SPACEDIM>
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
