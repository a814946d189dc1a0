use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Set of quantities that an evaluation context computes on every reinitialization.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct UpdateFlags(u32);

impl UpdateFlags {
    pub const DEFAULT: Self = Self(0);
    /// Shape function values.
    pub const VALUES: Self = Self(1 << 0);
    /// Shape function gradients in physical coordinates.
    pub const GRADIENTS: Self = Self(1 << 1);
    /// Second derivatives of shape functions in physical coordinates.
    pub const HESSIANS: Self = Self(1 << 2);
    /// Third derivatives of shape functions in physical coordinates.
    pub const THIRD_DERIVATIVES: Self = Self(1 << 3);
    /// Quadrature points mapped to physical coordinates.
    pub const QUADRATURE_POINTS: Self = Self(1 << 4);
    /// Quadrature weights multiplied by the volume (or surface) element.
    pub const JXW_VALUES: Self = Self(1 << 5);
    /// Jacobian of the mapping.
    pub const JACOBIANS: Self = Self(1 << 6);
    /// (Pseudo-)inverse of the Jacobian, used to transform covariant quantities.
    pub const INVERSE_JACOBIANS: Self = Self(1 << 7);
    /// Unit normals of faces, or of codimension one cells.
    pub const NORMAL_VECTORS: Self = Self(1 << 8);
    /// Outward normals scaled by the surface element of faces.
    pub const BOUNDARY_FORMS: Self = Self(1 << 9);

    /// All quantities produced by the mapping.
    pub const MAPPING: Self = Self(
        Self::QUADRATURE_POINTS.0
            | Self::JXW_VALUES.0
            | Self::JACOBIANS.0
            | Self::INVERSE_JACOBIANS.0
            | Self::NORMAL_VECTORS.0
            | Self::BOUNDARY_FORMS.0,
    );

    /// All quantities produced by the finite element.
    pub const SHAPE: Self = Self(Self::VALUES.0 | Self::GRADIENTS.0 | Self::HESSIANS.0 | Self::THIRD_DERIVATIVES.0);

    const NAMES: [(Self, &'static str); 10] = [
        (Self::VALUES, "update_values"),
        (Self::GRADIENTS, "update_gradients"),
        (Self::HESSIANS, "update_hessians"),
        (Self::THIRD_DERIVATIVES, "update_3rd_derivatives"),
        (Self::QUADRATURE_POINTS, "update_quadrature_points"),
        (Self::JXW_VALUES, "update_JxW_values"),
        (Self::JACOBIANS, "update_jacobians"),
        (Self::INVERSE_JACOBIANS, "update_inverse_jacobians"),
        (Self::NORMAL_VECTORS, "update_normal_vectors"),
        (Self::BOUNDARY_FORMS, "update_boundary_forms"),
    ];

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every flag in `other` is also set in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `self` and `other` have at least one flag in common.
    pub const fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// The flags of `self` that are not in `other`.
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// The name of a single flag, as used in error messages.
    pub fn name(&self) -> Option<&'static str> {
        Self::NAMES
            .iter()
            .find(|(flag, _)| flag == self)
            .map(|(_, name)| *name)
    }
}

impl BitOr for UpdateFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for UpdateFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl BitAnd for UpdateFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        self.intersection(rhs)
    }
}

impl fmt::Debug for UpdateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "UpdateFlags(update_default)");
        }
        let names: Vec<_> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "UpdateFlags({})", names.join(" | "))
    }
}
