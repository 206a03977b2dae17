use nalgebra::{DMatrix, DVector, Dyn, LU};

/// Factorization of the shifted Jacobian `shift*I - J` with partial pivoting.
/// The pivot permutation is stored inside the nalgebra `LU` and rebuilt on every
/// call of [`ShiftedLU::factor`]; after a failed factorization no solve is possible
/// until the next successful one.
#[derive(Debug, Clone)]
pub struct ShiftedLU {
    n: usize,
    lu: Option<LU<f64, Dyn, Dyn>>,
}

impl ShiftedLU {
    pub fn new(n: usize) -> Self {
        ShiftedLU { n, lu: None }
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn resize(&mut self, n: usize) {
        if self.n != n {
            self.n = n;
            self.lu = None;
        }
    }

    /// Forms `shift*I - J` and factors it. Returns false if the matrix is singular
    /// (zero pivot) or contains non-finite entries.
    pub fn factor(&mut self, shift: f64, J: &DMatrix<f64>) -> bool {
        assert_eq!(J.shape(), (self.n, self.n), "Jacobian has wrong shape");
        self.lu = None;
        // the LU takes ownership of this matrix and factors it in place
        let mut shifted = J.clone();
        shifted.neg_mut();
        for i in 0..self.n {
            shifted[(i, i)] += shift;
        }
        if shifted.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let lu = LU::new(shifted);
        if !lu.is_invertible() {
            return false;
        }
        self.lu = Some(lu);
        true
    }

    pub fn is_factored(&self) -> bool {
        self.lu.is_some()
    }

    /// overwrites `b` with the solution of (shift*I - J) x = b
    pub fn solve_vector(&self, b: &mut DVector<f64>) -> bool {
        match &self.lu {
            Some(lu) => lu.solve_mut(b),
            None => false,
        }
    }

    /// same as [`ShiftedLU::solve_vector`] for every column of `b`
    pub fn solve_matrix(&self, b: &mut DMatrix<f64>) -> bool {
        match &self.lu {
            Some(lu) => lu.solve_mut(b),
            None => false,
        }
    }

    pub fn invalidate(&mut self) {
        self.lu = None;
    }
}
