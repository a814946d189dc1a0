//! Accumulation of finite element functions from tabulated shape data.
//!
//! All quantities share the same loop structure: walk the local degrees of freedom, skip those
//! whose coefficient is negligible, and add the weighted tabulated entries of every nonzero
//! (shape function, component) row into the per-quadrature-point output. The kernels are generic
//! over the tabulated entry type `S` (value, gradient, Hessian, third derivative) and the output
//! type `O`; the quantity-specific contraction is supplied by the caller.
use crate::output::ShapeTable;
use crate::sparsity::{ComponentSupport, ShapeFunctionToRowTable, ViewSparsity};
use fevalues_traits::Coefficient;

/// Accumulates `sum_i dof_values[i] * table[row(i, d)]` into `output` for the components selected
/// by a view.
///
/// `contribute(out, d, coefficient, entry)` adds the contribution of one tabulated entry of
/// sub-component `d` to the output of one quadrature point. The output must already be zeroed.
pub(crate) fn accumulate<N, S, O, F>(
    dof_values: &[N],
    sparsity: &ViewSparsity,
    table: &ShapeTable<S>,
    output: &mut [O],
    mut contribute: F,
) where
    N: Coefficient,
    S: Copy,
    F: FnMut(&mut O, usize, N, &S),
{
    for (shape_function, &coefficient) in dof_values.iter().enumerate() {
        let support = sparsity.support(shape_function);
        if support == ComponentSupport::None || coefficient.is_negligible() {
            continue;
        }

        match support {
            ComponentSupport::Single { row, component } => {
                for (out, entry) in output.iter_mut().zip(table.row(row)) {
                    contribute(out, component, coefficient, entry);
                }
            }
            ComponentSupport::Multiple => {
                for d in 0..sparsity.width() {
                    if let Some(row) = sparsity.row_index(shape_function, d) {
                        for (out, entry) in output.iter_mut().zip(table.row(row)) {
                            contribute(out, d, coefficient, entry);
                        }
                    }
                }
            }
            ComponentSupport::None => {}
        }
    }
}

/// Accumulates all components of the element for `multiplicity` consecutive sets of local
/// coefficients.
///
/// `dof_values` holds `multiplicity * dofs_per_cell` coefficients. Component `c` of set `b` is
/// written to `output[q][b * n_components + c]`, which must already be zeroed.
pub(crate) fn accumulate_components<N, S, O, F>(
    dof_values: &[N],
    row_table: &ShapeFunctionToRowTable,
    table: &ShapeTable<S>,
    output: &mut [Vec<O>],
    mut contribute: F,
) where
    N: Coefficient,
    S: Copy,
    F: FnMut(&mut O, N, &S),
{
    let dofs_per_cell = row_table.n_dofs();
    let n_components = row_table.n_components();
    if dofs_per_cell == 0 {
        return;
    }

    for (set, coefficients) in dof_values.chunks_exact(dofs_per_cell).enumerate() {
        for (shape_function, &coefficient) in coefficients.iter().enumerate() {
            if coefficient.is_negligible() {
                continue;
            }
            for component in 0..n_components {
                if let Some(row) = row_table.row(shape_function, component) {
                    let slot = set * n_components + component;
                    for (out, entry) in output.iter_mut().zip(table.row(row)) {
                        contribute(&mut out[slot], coefficient, entry);
                    }
                }
            }
        }
    }
}

/// Resets `output` to `n` copies of `zero`.
pub(crate) fn reset<O: Clone>(output: &mut Vec<O>, n: usize, zero: O) {
    output.clear();
    output.resize(n, zero);
}
