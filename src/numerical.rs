/// SOLVER OF STIFF IVP
/// embedded (3)4 Rosenbrock methods (GRK4) with step size control and forward sensitivities
/// Example
/// ```
/// use RustedGRK4::numerical::GRK4::{ClosureModel, GRK4, GRK4Method, GRK4Settings, SensitivityBlock, StageState};
/// use nalgebra::{DMatrix, DVector};
/// // y' = -q y, sensitivities with respect to y0 and q
/// let model = ClosureModel::new(1, |_t, y: &DVector<f64>, q: &DVector<f64>| y * -q[0])
///     .with_params(1)
///     .with_jacobian(|_t, _y, q: &DVector<f64>| DMatrix::from_element(1, 1, -q[0]));
/// let settings = GRK4Settings::default().with_method(GRK4Method::LStable);
/// let mut solver = GRK4::new(settings);
/// let mut state = StageState::new(DVector::from_element(1, 1.0))
///     .with_sensitivities(SensitivityBlock::initial(1, 1, Some(0)));
/// solver.solve(&model, 0, 0.0, 1.0, &mut state, &DVector::from_element(1, 0.5)).unwrap();
/// let S = &state.sensitivities.as_ref().unwrap().s;
/// // dy/dy0 = e^{-q t}
/// assert!((S[(0, 0)] - (-0.5f64).exp()).abs() < 5e-3);
/// println!("{}", solver);
/// ```
pub mod GRK4;
