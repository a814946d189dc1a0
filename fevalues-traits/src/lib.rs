use nalgebra::{DVector, RealField, Scalar};
use num::{Complex, Zero};
use std::ops::{AddAssign, Mul, SubAssign};

pub use nalgebra;

mod dual;

pub use dual::Dual;

/// Scalar type used for geometry and tabulated shape function data.
pub trait Real: RealField + Copy + Send + Sync {}

impl<T: RealField + Copy + Send + Sync> Real for T {}

/// A number type that can serve as the coefficient of a degree of freedom.
///
/// Accumulation of finite element functions skips coefficients that are exactly zero. This is
/// only valid for plain values: a number that carries sensitivities (for example a dual number)
/// may contribute through its derivative part even when its nominal value vanishes. Such types
/// set [`Coefficient::HAS_SENSITIVITIES`] to `true`, which disables the shortcut.
pub trait Coefficient: Scalar + Copy + Zero + AddAssign + SubAssign + Send + Sync {
    const HAS_SENSITIVITIES: bool = false;

    /// Returns `true` if a term weighted by this coefficient can be skipped entirely.
    fn is_negligible(&self) -> bool {
        !Self::HAS_SENSITIVITIES && self.is_zero()
    }
}

/// A coefficient that can be scaled by shape function data of type `T`.
pub trait FieldValue<T>: Coefficient + Mul<T, Output = Self> {}

impl<T, N> FieldValue<T> for N where N: Coefficient + Mul<T, Output = N> {}

impl Coefficient for f32 {}

impl Coefficient for f64 {}

impl<T: Real> Coefficient for Complex<T> {}

/// Read access to a vector of degree of freedom coefficients.
pub trait FieldVector<N> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, index: usize) -> N;

    /// Gathers the entries at the given indices into `output`.
    ///
    /// # Panics
    ///
    /// Panics if the lengths of `indices` and `output` differ, or if an index is out of bounds.
    fn gather(&self, indices: &[usize], output: &mut [N]) {
        assert_eq!(indices.len(), output.len(), "Index list and output must have the same length");
        for (out, &index) in output.iter_mut().zip(indices) {
            *out = self.entry(index);
        }
    }
}

impl<N: Copy> FieldVector<N> for [N] {
    fn len(&self) -> usize {
        <[N]>::len(self)
    }

    fn entry(&self, index: usize) -> N {
        self[index]
    }
}

impl<N: Copy> FieldVector<N> for Vec<N> {
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn entry(&self, index: usize) -> N {
        self[index]
    }
}

impl<N: Scalar + Copy> FieldVector<N> for DVector<N> {
    fn len(&self) -> usize {
        self.nrows()
    }

    fn entry(&self, index: usize) -> N {
        self[index]
    }
}
