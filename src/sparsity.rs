//! Structural sparsity of shape functions with respect to the components of an element.
use crate::element::FiniteElement;
use crate::error::FeValuesError;
use fevalues_traits::Real;
use fixedbitset::FixedBitSet;

/// Compacted enumeration of the (shape function, component) pairs that are not structurally
/// zero.
///
/// Shape functions are visited in index order and, within a shape function, components in
/// increasing order. Every nonzero pair receives the next free row. The finite element fills its
/// tabulated data in exactly this order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShapeFunctionToRowTable {
    n_components: usize,
    n_rows: usize,
    rows: Vec<Option<usize>>,
}

impl ShapeFunctionToRowTable {
    /// Builds the table from the nonzero components of each shape function.
    pub fn from_nonzero_components<I>(n_components: usize, nonzero_components: I) -> Self
    where
        I: IntoIterator<Item = FixedBitSet>,
    {
        let mut rows = Vec::new();
        let mut next_row = 0;
        for mask in nonzero_components {
            for component in 0..n_components {
                if mask.contains(component) {
                    rows.push(Some(next_row));
                    next_row += 1;
                } else {
                    rows.push(None);
                }
            }
        }

        Self {
            n_components,
            n_rows: next_row,
            rows,
        }
    }

    pub fn from_element<T, E, const DIM: usize, const SPACEDIM: usize>(element: &E) -> Self
    where
        T: Real,
        E: FiniteElement<T, DIM, SPACEDIM> + ?Sized,
    {
        let n_dofs = element.n_dofs_per_cell();
        Self::from_nonzero_components(
            element.n_components(),
            (0..n_dofs).map(|i| element.nonzero_components(i)),
        )
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn n_dofs(&self) -> usize {
        if self.n_components == 0 {
            0
        } else {
            self.rows.len() / self.n_components
        }
    }

    /// The total number of rows, i.e. the number of nonzero (shape function, component) pairs.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn row(&self, shape_function: usize, component: usize) -> Option<usize> {
        assert!(component < self.n_components, "Component index out of bounds");
        self.rows[shape_function * self.n_components + component]
    }
}

/// How a shape function contributes to the components selected by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSupport {
    /// The shape function vanishes in all selected components.
    None,
    /// The shape function is nonzero in exactly one selected component, stored in `row`.
    Single { row: usize, component: usize },
    /// The shape function is nonzero in more than one selected component.
    Multiple,
}

/// Nonzero pattern of all shape functions restricted to a window of `width` consecutive
/// components starting at `first_component`.
///
/// The pattern depends only on the element, so it is computed once per view and reused for every
/// cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSparsity {
    first_component: usize,
    width: usize,
    row_indices: Vec<Option<usize>>,
    support: Vec<ComponentSupport>,
}

impl ViewSparsity {
    pub fn new<T, E, const DIM: usize, const SPACEDIM: usize>(
        element: &E,
        row_table: &ShapeFunctionToRowTable,
        first_component: usize,
        width: usize,
    ) -> Result<Self, FeValuesError>
    where
        T: Real,
        E: FiniteElement<T, DIM, SPACEDIM> + ?Sized,
    {
        assert!(width > 0, "A view must select at least one component");
        let n_components = element.n_components();
        if first_component
            .checked_add(width)
            .map_or(true, |end| end > n_components)
        {
            return Err(FeValuesError::IndexOutOfRange {
                index: first_component.saturating_add(width - 1),
                end: n_components,
            });
        }

        let n_dofs = element.n_dofs_per_cell();
        let mut row_indices = Vec::with_capacity(n_dofs * width);
        let mut support = Vec::with_capacity(n_dofs);
        for i in 0..n_dofs {
            let primitive_component = element
                .is_primitive_shape_function(i)
                .then(|| element.system_to_component_index(i).0);
            let mask = match primitive_component {
                Some(_) => None,
                None => Some(element.nonzero_components(i)),
            };
            let is_nonzero = |c: usize| match (primitive_component, &mask) {
                (Some(primitive), _) => primitive == c,
                (None, Some(mask)) => mask.contains(c),
                (None, None) => false,
            };

            let mut dof_support = ComponentSupport::None;
            for d in 0..width {
                let component = first_component + d;
                let row = if is_nonzero(component) {
                    row_table.row(i, component)
                } else {
                    None
                };
                if let Some(row) = row {
                    dof_support = match dof_support {
                        ComponentSupport::None => ComponentSupport::Single { row, component: d },
                        _ => ComponentSupport::Multiple,
                    };
                }
                row_indices.push(row);
            }
            support.push(dof_support);
        }

        Ok(Self {
            first_component,
            width,
            row_indices,
            support,
        })
    }

    pub fn first_component(&self) -> usize {
        self.first_component
    }

    /// The number of components selected by the view.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn n_dofs(&self) -> usize {
        self.support.len()
    }

    pub fn is_nonzero(&self, shape_function: usize, d: usize) -> bool {
        self.row_index(shape_function, d).is_some()
    }

    /// The table row of sub-component `d` of the given shape function, if nonzero.
    pub fn row_index(&self, shape_function: usize, d: usize) -> Option<usize> {
        assert!(d < self.width, "Sub-component index out of bounds");
        self.row_indices[shape_function * self.width + d]
    }

    pub fn support(&self, shape_function: usize) -> ComponentSupport {
        self.support[shape_function]
    }

    /// The sub-component in which the shape function is nonzero, if it is nonzero in exactly one.
    pub fn single_nonzero_component_index(&self, shape_function: usize) -> Option<usize> {
        match self.support[shape_function] {
            ComponentSupport::Single { component, .. } => Some(component),
            _ => None,
        }
    }

    pub fn has_multiple_support(&self) -> bool {
        self.support
            .iter()
            .any(|s| *s == ComponentSupport::Multiple)
    }
}
