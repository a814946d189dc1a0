//! Quadrature rules on reference cells.
//!
//! Rules are stored with a runtime dimension so that cell, face and subface rules share one
//! type. Points are given in the reference coordinates of the domain the rule lives on: a face
//! rule of a hexahedron is a rule on the unit square.
use fevalues_traits::Real;
use itertools::Itertools;
use nalgebra::Point;
use num::Zero;
use std::f64::consts::PI;
use std::ops::{AddAssign, Mul};

/// A quadrature rule consisting of weights and points.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadrature<T> {
    dim: usize,
    weights: Vec<T>,
    points: Vec<T>,
}

impl<T: Real> Quadrature<T> {
    /// Creates a rule from weights and points.
    ///
    /// # Panics
    ///
    /// Panics if the number of weights and points differ, or a point does not have `dim`
    /// coordinates.
    pub fn new(dim: usize, weights: Vec<T>, points: Vec<Vec<T>>) -> Self {
        assert_eq!(weights.len(), points.len(), "Must have as many weights as points");
        let mut flat = Vec::with_capacity(dim * points.len());
        for point in points {
            assert_eq!(point.len(), dim, "All points must have dimension {}", dim);
            flat.extend(point);
        }
        Self {
            dim,
            weights,
            points: flat,
        }
    }

    pub fn from_points<const D: usize>(weights: Vec<T>, points: &[Point<T, D>]) -> Self {
        assert_eq!(weights.len(), points.len(), "Must have as many weights as points");
        let flat = points
            .iter()
            .flat_map(|p| p.coords.iter().copied())
            .collect();
        Self {
            dim: D,
            weights,
            points: flat,
        }
    }

    /// Tensor-product Gauss–Legendre rule on the unit hypercube `[0, 1]^dim`.
    ///
    /// Given `n` points per axis, the rule integrates polynomials of degree up to `2n - 1` in
    /// each coordinate exactly.
    ///
    /// # Panics
    ///
    /// Panics if zero points are requested.
    pub fn gauss(points_per_axis: usize, dim: usize) -> Self {
        let (weights_1d, points_1d) = gauss_unit_interval(points_per_axis);
        let mut weights = vec![1.0];
        let mut points: Vec<Vec<f64>> = vec![vec![]];
        // The first coordinate runs fastest
        for _ in 0..dim {
            let combined: Vec<_> = extend_tensor_rule(&weights, &points, &weights_1d, &points_1d);
            weights = combined.iter().map(|(w, _)| *w).collect();
            points = combined.into_iter().map(|(_, p)| p).collect();
        }

        let convert = |x: f64| T::from_f64(x).expect("Quadrature data must fit in T");
        Self::new(
            dim,
            weights.into_iter().map(convert).collect(),
            points
                .into_iter()
                .map(|p| p.into_iter().map(convert).collect())
                .collect(),
        )
    }

    /// The one-point rule at the center of the unit hypercube.
    pub fn midpoint(dim: usize) -> Self {
        Self::gauss(1, dim)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn size(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn weight(&self, q: usize) -> T {
        self.weights[q]
    }

    /// The coordinates of point `q`.
    pub fn point(&self, q: usize) -> &[T] {
        &self.points[q * self.dim..(q + 1) * self.dim]
    }

    pub fn points(&self) -> impl Iterator<Item = &[T]> + '_ {
        (0..self.size()).map(move |q| self.point(q))
    }

    /// Approximates the integral of the given function using this quadrature rule.
    pub fn integrate<U, F>(&self, f: F) -> U
    where
        F: Fn(&[T]) -> U,
        U: Zero + Mul<T, Output = U> + AddAssign,
    {
        let mut integral = U::zero();
        for (w, p) in self.weights.iter().zip(self.points()) {
            integral += f(p) * *w;
        }
        integral
    }
}

fn extend_tensor_rule(
    weights: &[f64],
    points: &[Vec<f64>],
    weights_1d: &[f64],
    points_1d: &[f64],
) -> Vec<(f64, Vec<f64>)> {
    weights_1d
        .iter()
        .zip(points_1d)
        .cartesian_product(weights.iter().zip(points))
        .map(|((w_new, x_new), (w, p))| {
            let mut point = p.clone();
            point.push(*x_new);
            (w * w_new, point)
        })
        .collect()
}

/// A collection of face rules: either one rule shared by all faces, or one rule per face.
#[derive(Debug, Clone, PartialEq)]
pub struct QCollection<T> {
    rules: Vec<Quadrature<T>>,
}

impl<T: Real> QCollection<T> {
    /// # Panics
    ///
    /// Panics if `rules` is empty or the rules have different dimensions.
    pub fn new(rules: Vec<Quadrature<T>>) -> Self {
        assert!(!rules.is_empty(), "A quadrature collection needs at least one rule");
        assert!(
            rules.iter().map(Quadrature::dim).all_equal(),
            "All rules in a collection must have the same dimension"
        );
        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.rules[0].dim()
    }

    /// The rule used on face `face_no`.
    pub fn rule(&self, face_no: usize) -> &Quadrature<T> {
        if self.rules.len() == 1 {
            &self.rules[0]
        } else {
            &self.rules[face_no]
        }
    }

    pub fn max_n_quadrature_points(&self) -> usize {
        self.rules.iter().map(Quadrature::size).max().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quadrature<T>> {
        self.rules.iter()
    }
}

impl<T: Real> From<Quadrature<T>> for QCollection<T> {
    fn from(rule: Quadrature<T>) -> Self {
        Self::new(vec![rule])
    }
}

/// Recurrence relation for Legendre polynomials.
///
/// The derivative formula is not defined at |x| == 1, so it is only suitable for evaluation in
/// the open interval (-1, 1).
struct LegendreRecurrence {
    n: usize,
    x: f64,
    // p_n(x)
    p1: f64,
    // p_{n - 1}(x)
    p2: f64,
}

impl LegendreRecurrence {
    fn evaluate(n: usize, x: f64) -> Self {
        //  m P_m(x) = (2m - 1) * x P_{m - 1}(x) - (m - 1) P_{m - 2}(x)
        let mut p1 = 1.0;
        let mut p2 = 0.0;
        for m in 1..=n {
            let m = m as f64;
            let p3 = p2;
            p2 = p1;
            p1 = ((2.0 * m - 1.0) * x * p2 - (m - 1.0) * p3) / m;
        }
        Self { n, x, p1, p2 }
    }

    fn value_and_derivative(&self) -> (f64, f64) {
        let n = self.n as f64;
        let x = self.x;
        (self.p1, n * (x * self.p1 - self.p2) / (x * x - 1.0))
    }
}

/// Gauss–Legendre weights and points on `[0, 1]`.
fn gauss_unit_interval(n: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(n > 0, "number of points must be positive");
    let m = (n + 1) / 2;

    let mut points = vec![0.0; n];
    let mut weights = vec![0.0; n];

    // Roots come in symmetric pairs, so only the first half is computed with Newton's method
    for i in 0..m {
        let mut x = (PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        loop {
            let (p, dp) = LegendreRecurrence::evaluate(n, x).value_and_derivative();
            let dx = -p / dp;
            x += dx;
            if dx.abs() <= 1e-15 {
                break;
            }
        }
        let (_, dp) = LegendreRecurrence::evaluate(n, x).value_and_derivative();
        let w = 2.0 / ((1.0 - x * x) * dp * dp);

        // Map from [-1, 1] to [0, 1]; the roots are found in descending order
        points[n - 1 - i] = 0.5 * (x + 1.0);
        points[i] = 0.5 * (1.0 - x);
        weights[i] = 0.5 * w;
        weights[n - 1 - i] = 0.5 * w;
    }

    (weights, points)
}
