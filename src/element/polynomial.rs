use fevalues_traits::Real;

/// A polynomial in one variable, stored by its coefficients in order of increasing degree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Polynomial<T> {
    coefficients: Vec<T>,
}

impl<T: Real> Polynomial<T> {
    pub fn new(coefficients: Vec<T>) -> Self {
        Self { coefficients }
    }

    /// The Lagrange basis polynomial that is one at `nodes[i]` and zero at all other nodes.
    pub fn lagrange_basis(nodes: &[T], i: usize) -> Self {
        let mut coefficients = vec![T::one()];
        for (j, &node) in nodes.iter().enumerate() {
            if j == i {
                continue;
            }
            let scale = T::one() / (nodes[i] - node);
            let mut next = vec![T::zero(); coefficients.len() + 1];
            for (k, &c) in coefficients.iter().enumerate() {
                next[k + 1] += c * scale;
                next[k] -= c * node * scale;
            }
            coefficients = next;
        }
        Self { coefficients }
    }

    pub fn derivative(&self) -> Self {
        let coefficients = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .map(|(k, &c)| c * T::from_usize(k).expect("Degree must fit in T"))
            .collect();
        Self { coefficients }
    }

    pub fn evaluate(&self, x: T) -> T {
        self.coefficients
            .iter()
            .rev()
            .fold(T::zero(), |acc, &c| acc * x + c)
    }
}
