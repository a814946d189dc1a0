use crate::{Coefficient, Real};
use num::Zero;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

/// Forward-mode dual number `value + derivative * ε` with `ε² = 0`.
///
/// Used as a coefficient type, a dual number propagates the sensitivity of every evaluated
/// quantity with respect to one seeded parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dual<T> {
    pub value: T,
    pub derivative: T,
}

impl<T: Real> Dual<T> {
    pub fn new(value: T, derivative: T) -> Self {
        Self { value, derivative }
    }

    /// A quantity that does not depend on the seeded parameter.
    pub fn constant(value: T) -> Self {
        Self::new(value, T::zero())
    }

    /// The seeded parameter itself.
    pub fn variable(value: T) -> Self {
        Self::new(value, T::one())
    }
}

impl<T: Real> Add for Dual<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.value + rhs.value, self.derivative + rhs.derivative)
    }
}

impl<T: Real> Sub for Dual<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.value - rhs.value, self.derivative - rhs.derivative)
    }
}

impl<T: Real> Mul for Dual<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.value * rhs.value,
            self.value * rhs.derivative + self.derivative * rhs.value,
        )
    }
}

impl<T: Real> Mul<T> for Dual<T> {
    type Output = Self;

    fn mul(self, rhs: T) -> Self {
        Self::new(self.value * rhs, self.derivative * rhs)
    }
}

impl<T: Real> Neg for Dual<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.value, -self.derivative)
    }
}

impl<T: Real> AddAssign for Dual<T> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<T: Real> SubAssign for Dual<T> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<T: Real> Zero for Dual<T> {
    fn zero() -> Self {
        Self::constant(T::zero())
    }

    fn is_zero(&self) -> bool {
        self.value.is_zero() && self.derivative.is_zero()
    }
}

impl<T: Real> Coefficient for Dual<T> {
    const HAS_SENSITIVITIES: bool = true;
}
