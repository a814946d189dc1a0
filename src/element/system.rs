use crate::cell::Cell;
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use crate::flags::UpdateFlags;
use crate::mapping::Mapping;
use crate::output::{MappingData, ShapeData, ShapeTable};
use crate::quadrature::{QCollection, Quadrature};
use crate::reference_cell::ReferenceCell;
use crate::similarity::CellSimilarity;
use crate::sparsity::ShapeFunctionToRowTable;
use fevalues_traits::Real;
use fixedbitset::FixedBitSet;

/// A vector-valued element built from a scalar base element and a set of direction vectors.
///
/// Shape function `i = j * n_directions + k` is `psi_j * direction_k`, where `psi_j` is shape
/// function `j` of the base element. With the unit directions of [`SystemElement::new`] this is
/// the usual direct sum of `n_components` copies of the base element and every shape function is
/// primitive. Directions with several nonzero entries give shape functions that are nonzero in
/// more than one component.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemElement<T: Real, E> {
    base: E,
    n_components: usize,
    directions: Vec<Vec<T>>,
}

impl<T: Real, E> SystemElement<T, E> {
    pub fn new(base: E, n_components: usize) -> Result<Self, FeValuesError> {
        let directions = (0..n_components)
            .map(|k| {
                let mut direction = vec![T::zero(); n_components];
                direction[k] = T::one();
                direction
            })
            .collect();
        Self::with_directions(base, n_components, directions)
    }

    /// Builds the element from a scalar base element and `n_components`-dimensional directions.
    pub fn with_directions(base: E, n_components: usize, directions: Vec<Vec<T>>) -> Result<Self, FeValuesError> {
        if n_components == 0 || directions.is_empty() {
            return Err(FeValuesError::InvalidConfiguration(
                "A system element needs at least one component and one direction".to_string(),
            ));
        }
        if let Some(direction) = directions.iter().find(|d| d.len() != n_components) {
            return Err(FeValuesError::DimensionMismatch {
                actual: direction.len(),
                expected: n_components,
            });
        }

        Ok(Self {
            base,
            n_components,
            directions,
        })
    }

    pub fn base(&self) -> &E {
        &self.base
    }

    pub fn directions(&self) -> &[Vec<T>] {
        &self.directions
    }

    /// Copies the base element's tabulated data into `output`, scaled by the direction of each
    /// shape function.
    fn scatter<const SPACEDIM: usize>(&self, base: &ShapeData<T, SPACEDIM>, output: &mut ShapeData<T, SPACEDIM>) {
        debug_assert_eq!(base.row_table().n_components(), 1, "Base element must be scalar");
        let flags = output.update_flags();
        let n_directions = self.directions.len();
        let n_dofs = base.row_table().n_dofs() * n_directions;

        for i in 0..n_dofs {
            let (j, k) = (i / n_directions, i % n_directions);
            let Some(base_row) = base.row(j, 0) else { continue };
            for c in 0..self.n_components {
                let Some(row) = output.row(i, c) else { continue };
                let w = self.directions[k][c];
                if flags.contains(UpdateFlags::VALUES) {
                    copy_scaled(base.values(), output.values_mut(), base_row, row, |v| *v * w);
                }
                if flags.contains(UpdateFlags::GRADIENTS) {
                    copy_scaled(base.gradients(), output.gradients_mut(), base_row, row, |g| g * w);
                }
                if flags.contains(UpdateFlags::HESSIANS) {
                    copy_scaled(base.hessians(), output.hessians_mut(), base_row, row, |h| h * w);
                }
                if flags.contains(UpdateFlags::THIRD_DERIVATIVES) {
                    copy_scaled(
                        base.third_derivatives(),
                        output.third_derivatives_mut(),
                        base_row,
                        row,
                        |t| t.map(|m| m * w),
                    );
                }
            }
        }
    }
}

fn copy_scaled<S, F>(source: &ShapeTable<S>, target: &mut ShapeTable<S>, source_row: usize, target_row: usize, scale: F)
where
    S: Copy,
    F: Fn(&S) -> S,
{
    for (t, s) in target.row_mut(target_row).iter_mut().zip(source.row(source_row)) {
        *t = scale(s);
    }
}

#[derive(Debug)]
pub struct SystemElementData<T: Real, D, const SPACEDIM: usize> {
    base_internal: D,
    base_output: ShapeData<T, SPACEDIM>,
}

fn tabulation_for<T, E, const DIM: usize, const SPACEDIM: usize>(
    base: &E,
    n_quadrature_points: usize,
    flags: UpdateFlags,
) -> ShapeData<T, SPACEDIM>
where
    T: Real,
    E: FiniteElement<T, DIM, SPACEDIM>,
{
    ShapeData::new(ShapeFunctionToRowTable::from_element(base), n_quadrature_points, flags)
}

impl<T, E, const DIM: usize, const SPACEDIM: usize> FiniteElement<T, DIM, SPACEDIM> for SystemElement<T, E>
where
    T: Real,
    E: FiniteElement<T, DIM, SPACEDIM>,
{
    type InternalData = SystemElementData<T, E::InternalData, SPACEDIM>;

    fn reference_cell(&self) -> ReferenceCell {
        self.base.reference_cell()
    }

    fn n_components(&self) -> usize {
        self.n_components
    }

    fn n_dofs_per_cell(&self) -> usize {
        self.base.n_dofs_per_cell() * self.directions.len()
    }

    fn degree(&self) -> usize {
        self.base.degree()
    }

    fn nonzero_components(&self, shape_function: usize) -> FixedBitSet {
        let direction = &self.directions[shape_function % self.directions.len()];
        let mut mask = FixedBitSet::with_capacity(self.n_components);
        for (c, w) in direction.iter().enumerate() {
            if *w != T::zero() {
                mask.insert(c);
            }
        }
        mask
    }

    fn requires_update_flags(&self, flags: UpdateFlags) -> UpdateFlags {
        self.base.requires_update_flags(flags)
    }

    fn get_data<M>(
        &self,
        flags: UpdateFlags,
        mapping: &M,
        quadrature: &Quadrature<T>,
        output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>,
    {
        let mut base_output = tabulation_for(&self.base, quadrature.size(), flags);
        let base_internal = self
            .base
            .get_data(flags, mapping, quadrature, &mut base_output);
        self.scatter(&base_output, output);
        SystemElementData {
            base_internal,
            base_output,
        }
    }

    fn get_face_data<M>(
        &self,
        flags: UpdateFlags,
        mapping: &M,
        quadrature: &QCollection<T>,
        output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>,
    {
        let mut base_output = tabulation_for(&self.base, quadrature.max_n_quadrature_points(), flags);
        let base_internal = self
            .base
            .get_face_data(flags, mapping, quadrature, &mut base_output);
        self.scatter(&base_output, output);
        SystemElementData {
            base_internal,
            base_output,
        }
    }

    fn get_subface_data<M>(
        &self,
        flags: UpdateFlags,
        mapping: &M,
        quadrature: &Quadrature<T>,
        output: &mut ShapeData<T, SPACEDIM>,
    ) -> Self::InternalData
    where
        M: Mapping<T, DIM, SPACEDIM>,
    {
        let mut base_output = tabulation_for(&self.base, quadrature.size(), flags);
        let base_internal = self
            .base
            .get_subface_data(flags, mapping, quadrature, &mut base_output);
        self.scatter(&base_output, output);
        SystemElementData {
            base_internal,
            base_output,
        }
    }

    fn fill_fe_values<C, M>(
        &self,
        cell: &C,
        similarity: CellSimilarity,
        quadrature: &Quadrature<T>,
        mapping: &M,
        mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>,
    {
        self.base.fill_fe_values(
            cell,
            similarity,
            quadrature,
            mapping,
            mapping_internal,
            mapping_data,
            &mut internal.base_internal,
            &mut internal.base_output,
        );
        self.scatter(&internal.base_output, output);
    }

    fn fill_fe_face_values<C, M>(
        &self,
        cell: &C,
        face_no: usize,
        quadrature: &QCollection<T>,
        mapping: &M,
        mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>,
    {
        self.base.fill_fe_face_values(
            cell,
            face_no,
            quadrature,
            mapping,
            mapping_internal,
            mapping_data,
            &mut internal.base_internal,
            &mut internal.base_output,
        );
        self.scatter(&internal.base_output, output);
    }

    fn fill_fe_subface_values<C, M>(
        &self,
        cell: &C,
        face_no: usize,
        subface_no: usize,
        quadrature: &Quadrature<T>,
        mapping: &M,
        mapping_internal: &M::InternalData,
        mapping_data: &MappingData<T, DIM, SPACEDIM>,
        internal: &mut Self::InternalData,
        output: &mut ShapeData<T, SPACEDIM>,
    ) where
        C: Cell<T, SPACEDIM>,
        M: Mapping<T, DIM, SPACEDIM>,
    {
        self.base.fill_fe_subface_values(
            cell,
            face_no,
            subface_no,
            quadrature,
            mapping,
            mapping_internal,
            mapping_data,
            &mut internal.base_internal,
            &mut internal.base_output,
        );
        self.scatter(&internal.base_output, output);
    }
}
