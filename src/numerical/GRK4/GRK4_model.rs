//! Model oracle consumed by the integrator: the right-hand side f(t, x, q) of
//! x' = f(t, x, q) and, on request, its Jacobians with respect to x and q.
use nalgebra::{DMatrix, DVector};

/// Right-hand side of the stiff system. `kk` is the index of the integration
/// interval (segment) the caller is working on; it is passed through untouched.
/// Evaluations must be deterministic for identical arguments.
pub trait StiffModel {
    /// dimension of the state vector
    fn n_states(&self) -> usize;

    /// number of parameters q entering f
    fn n_params(&self) -> usize {
        0
    }

    /// writes f(t, x, q) into `f`
    fn residual(&self, kk: usize, t: f64, x: &DVector<f64>, q: &DVector<f64>, f: &mut DVector<f64>);

    /// true if `residual_jacobian` is implemented analytically
    fn has_jacobian(&self) -> bool {
        false
    }

    /// Writes f, df/dx into `jx` and, if requested, df/dq into `jq`.
    /// The default implementation uses forward differences of `residual`.
    fn residual_jacobian(
        &self,
        kk: usize,
        t: f64,
        x: &DVector<f64>,
        q: &DVector<f64>,
        f: &mut DVector<f64>,
        jx: &mut DMatrix<f64>,
        jq: Option<&mut DMatrix<f64>>,
    ) {
        self.residual(kk, t, x, q, f);
        fd_state_jacobian(self, kk, t, x, q, f, jx);
        if let Some(jq) = jq {
            fd_param_jacobian(self, kk, t, x, q, f, jq);
        }
    }
}

fn fd_increment(v: f64) -> f64 {
    f64::EPSILON.sqrt() * v.abs().max(1.0)
}

/// Forward-difference approximation of df/dx; `f` must hold f(t, x, q).
pub fn fd_state_jacobian<M: StiffModel + ?Sized>(
    model: &M,
    kk: usize,
    t: f64,
    x: &DVector<f64>,
    q: &DVector<f64>,
    f: &DVector<f64>,
    jx: &mut DMatrix<f64>,
) {
    let n = x.len();
    let mut x_pert = x.clone();
    let mut f_pert = DVector::zeros(f.len());
    for j in 0..n {
        let delta = fd_increment(x[j]);
        x_pert[j] = x[j] + delta;
        model.residual(kk, t, &x_pert, q, &mut f_pert);
        x_pert[j] = x[j];
        for i in 0..f.len() {
            jx[(i, j)] = (f_pert[i] - f[i]) / delta;
        }
    }
}

/// Forward-difference approximation of df/dq; `f` must hold f(t, x, q).
pub fn fd_param_jacobian<M: StiffModel + ?Sized>(
    model: &M,
    kk: usize,
    t: f64,
    x: &DVector<f64>,
    q: &DVector<f64>,
    f: &DVector<f64>,
    jq: &mut DMatrix<f64>,
) {
    let mut q_pert = q.clone();
    let mut f_pert = DVector::zeros(f.len());
    for j in 0..q.len() {
        let delta = fd_increment(q[j]);
        q_pert[j] = q[j] + delta;
        model.residual(kk, t, x, &q_pert, &mut f_pert);
        q_pert[j] = q[j];
        for i in 0..f.len() {
            jq[(i, j)] = (f_pert[i] - f[i]) / delta;
        }
    }
}

pub type RhsFn = Box<dyn Fn(f64, &DVector<f64>, &DVector<f64>) -> DVector<f64>>;
pub type JacobianFn = Box<dyn Fn(f64, &DVector<f64>, &DVector<f64>) -> DMatrix<f64>>;

/// Simple model wrapper for closures f(t, x, q). Jacobians not supplied are
/// approximated by forward differences.
pub struct ClosureModel {
    n_states: usize,
    n_params: usize,
    rhs: RhsFn,
    jac_x: Option<JacobianFn>,
    jac_q: Option<JacobianFn>,
}

impl ClosureModel {
    pub fn new<F>(n_states: usize, rhs: F) -> Self
    where
        F: Fn(f64, &DVector<f64>, &DVector<f64>) -> DVector<f64> + 'static,
    {
        ClosureModel {
            n_states,
            n_params: 0,
            rhs: Box::new(rhs),
            jac_x: None,
            jac_q: None,
        }
    }

    pub fn with_params(mut self, n_params: usize) -> Self {
        self.n_params = n_params;
        self
    }

    pub fn with_jacobian<F>(mut self, jac_x: F) -> Self
    where
        F: Fn(f64, &DVector<f64>, &DVector<f64>) -> DMatrix<f64> + 'static,
    {
        self.jac_x = Some(Box::new(jac_x));
        self
    }

    pub fn with_param_jacobian<F>(mut self, jac_q: F) -> Self
    where
        F: Fn(f64, &DVector<f64>, &DVector<f64>) -> DMatrix<f64> + 'static,
    {
        self.jac_q = Some(Box::new(jac_q));
        self
    }
}

impl StiffModel for ClosureModel {
    fn n_states(&self) -> usize {
        self.n_states
    }

    fn n_params(&self) -> usize {
        self.n_params
    }

    fn residual(&self, _kk: usize, t: f64, x: &DVector<f64>, q: &DVector<f64>, f: &mut DVector<f64>) {
        f.copy_from(&(self.rhs)(t, x, q));
    }

    fn has_jacobian(&self) -> bool {
        self.jac_x.is_some()
    }

    fn residual_jacobian(
        &self,
        kk: usize,
        t: f64,
        x: &DVector<f64>,
        q: &DVector<f64>,
        f: &mut DVector<f64>,
        jx: &mut DMatrix<f64>,
        jq: Option<&mut DMatrix<f64>>,
    ) {
        self.residual(kk, t, x, q, f);
        match &self.jac_x {
            Some(jac_x) => jx.copy_from(&jac_x(t, x, q)),
            None => fd_state_jacobian(self, kk, t, x, q, f, jx),
        }
        if let Some(jq) = jq {
            match &self.jac_q {
                Some(jac_q) => jq.copy_from(&jac_q(t, x, q)),
                None => fd_param_jacobian(self, kk, t, x, q, f, jq),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// f = (q0*x0*x1, sin(x0) + q1*t)
    fn nonlinear() -> ClosureModel {
        ClosureModel::new(
            2,
            |t, x: &DVector<f64>, q: &DVector<f64>| {
                DVector::from_vec(vec![q[0] * x[0] * x[1], x[0].sin() + q[1] * t])
            },
        )
        .with_params(2)
    }

    #[test]
    fn test_fd_jacobians_match_analytic() {
        let model = nonlinear();
        assert!(!model.has_jacobian());
        let (t, x, q) = (
            2.0,
            DVector::from_vec(vec![0.3, -1.5]),
            DVector::from_vec(vec![4.0, 0.5]),
        );
        let mut f = DVector::zeros(2);
        let mut jx = DMatrix::zeros(2, 2);
        let mut jq = DMatrix::zeros(2, 2);
        model.residual_jacobian(0, t, &x, &q, &mut f, &mut jx, Some(&mut jq));

        assert_relative_eq!(f[0], 4.0 * 0.3 * -1.5, epsilon = 1e-14);
        let jx_exact = DMatrix::from_row_slice(2, 2, &[4.0 * -1.5, 4.0 * 0.3, 0.3f64.cos(), 0.0]);
        let jq_exact = DMatrix::from_row_slice(2, 2, &[0.3 * -1.5, 0.0, 0.0, 2.0]);
        assert_relative_eq!(jx, jx_exact, epsilon = 1e-6);
        assert_relative_eq!(jq, jq_exact, epsilon = 1e-6);
    }

    #[test]
    fn test_analytic_jacobian_is_used() {
        let model = ClosureModel::new(1, |_t, x, _q| x * -3.0)
            .with_jacobian(|_t, _x, _q| DMatrix::from_element(1, 1, -7.0));
        assert!(model.has_jacobian());
        let x = DVector::from_element(1, 1.0);
        let q = DVector::zeros(0);
        let mut f = DVector::zeros(1);
        let mut jx = DMatrix::zeros(1, 1);
        model.residual_jacobian(3, 0.0, &x, &q, &mut f, &mut jx, None);
        assert_eq!(f[0], -3.0);
        // the supplied Jacobian is taken as is, even if inconsistent with f
        assert_eq!(jx[(0, 0)], -7.0);
    }
}
