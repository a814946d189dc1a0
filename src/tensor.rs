//! Tensor types of per-quadrature-point quantities and the index conventions used for tensor
//! valued views.
use fevalues_traits::{FieldValue, Real};
use nalgebra::{SMatrix, SVector, Scalar};
use num::Zero;

/// Rank-three tensor stored as `D` matrices: `t[i][(j, k)]`.
pub type Tensor3<T, const D: usize> = [SMatrix<T, D, D>; D];

pub fn tensor3_zeros<T: Scalar + Zero + Copy, const D: usize>() -> Tensor3<T, D> {
    [SMatrix::zeros(); D]
}

/// Number of independent components of a symmetric rank-two tensor in `dim` dimensions.
pub const fn symmetric_tensor_n_independent_components(dim: usize) -> usize {
    dim * (dim + 1) / 2
}

/// Maps the unrolled index of a symmetric rank-two tensor to its `(row, column)` pair.
///
/// Diagonal entries come first, followed by the upper off-diagonal entries in row-major order.
/// In three dimensions the order is `(0, 0), (1, 1), (2, 2), (0, 1), (0, 2), (1, 2)`.
///
/// # Panics
///
/// Panics if `index` is not smaller than the number of independent components.
pub fn symmetric_unrolled_to_component_indices(index: usize, dim: usize) -> (usize, usize) {
    assert!(index < symmetric_tensor_n_independent_components(dim));
    if index < dim {
        return (index, index);
    }
    let mut k = dim;
    for i in 0..dim {
        for j in (i + 1)..dim {
            if k == index {
                return (i, j);
            }
            k += 1;
        }
    }
    unreachable!("Index was checked against the number of independent components")
}

/// Maps the unrolled index of a general rank-two tensor to its `(row, column)` pair
/// (row-major).
pub fn tensor_unrolled_to_component_indices(index: usize, dim: usize) -> (usize, usize) {
    assert!(index < dim * dim);
    (index / dim, index % dim)
}

/// Computes `target += weight * source` entrywise.
pub(crate) fn add_scaled<T, N, const R: usize, const C: usize>(
    target: &mut SMatrix<N, R, C>,
    weight: N,
    source: &SMatrix<T, R, C>,
) where
    T: Real,
    N: FieldValue<T>,
{
    for (t, s) in target.iter_mut().zip(source.iter()) {
        *t += weight * *s;
    }
}

pub(crate) fn add_scaled_tensor3<T, N, const D: usize>(target: &mut Tensor3<N, D>, weight: N, source: &Tensor3<T, D>)
where
    T: Real,
    N: FieldValue<T>,
{
    for (t, s) in target.iter_mut().zip(source) {
        add_scaled(t, weight, s);
    }
}

/// Spatial dimensions in which the curl of a vector field is defined.
///
/// The curl is a scalar in two dimensions and a vector in three. Curls in one dimension are not
/// meaningful; the implementation for `Const<1>` only exists so that dimension-generic code
/// can report the misuse at runtime.
pub trait CurlDimension<N> {
    type Curl: Copy + std::fmt::Debug + PartialEq;

    const IS_DEFINED: bool = true;

    fn zero() -> Self::Curl;

    /// Adds the curl of `weight * phi * e_component`, where `gradient` is the gradient of `phi`.
    fn add_contribution<T>(curl: &mut Self::Curl, component: usize, weight: N, gradient: &[T])
    where
        T: Real,
        N: FieldValue<T>;
}

impl<N: Scalar + Zero + Copy> CurlDimension<N> for nalgebra::Const<1> {
    type Curl = N;

    const IS_DEFINED: bool = false;

    fn zero() -> N {
        N::zero()
    }

    fn add_contribution<T>(_: &mut N, _: usize, _: N, _: &[T])
    where
        T: Real,
        N: FieldValue<T>,
    {
        unreachable!("Curl is not defined in one dimension")
    }
}

impl<N: Scalar + Zero + Copy> CurlDimension<N> for nalgebra::Const<2> {
    type Curl = N;

    fn zero() -> N {
        N::zero()
    }

    fn add_contribution<T>(curl: &mut N, component: usize, weight: N, gradient: &[T])
    where
        T: Real,
        N: FieldValue<T>,
    {
        match component {
            0 => *curl -= weight * gradient[1],
            1 => *curl += weight * gradient[0],
            _ => unreachable!("Vector views in two dimensions have two components"),
        }
    }
}

impl<N: Scalar + Zero + Copy> CurlDimension<N> for nalgebra::Const<3> {
    type Curl = SVector<N, 3>;

    fn zero() -> SVector<N, 3> {
        SVector::zeros()
    }

    fn add_contribution<T>(curl: &mut SVector<N, 3>, component: usize, weight: N, gradient: &[T])
    where
        T: Real,
        N: FieldValue<T>,
    {
        match component {
            0 => {
                curl[1] += weight * gradient[2];
                curl[2] -= weight * gradient[1];
            }
            1 => {
                curl[0] -= weight * gradient[2];
                curl[2] += weight * gradient[0];
            }
            2 => {
                curl[0] += weight * gradient[1];
                curl[1] -= weight * gradient[0];
            }
            _ => unreachable!("Vector views in three dimensions have three components"),
        }
    }
}
