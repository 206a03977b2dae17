//! GRK4 stiff integrator: embedded (3)4 Rosenbrock methods with step size control,
//! Jacobian reuse and forward sensitivities.
//! Example
//! ```
//! use RustedGRK4::numerical::GRK4::{ClosureModel, GRK4, GRK4Settings, StageState};
//! use nalgebra::DVector;
//! // y' = -50 (y - cos t)
//! let model = ClosureModel::new(1, |t, y, _q| DVector::from_element(1, -50.0 * (y[0] - t.cos())));
//! let mut solver = GRK4::new(GRK4Settings::default().with_tolerances(1e-6, 1e-9));
//! let mut state = StageState::new(DVector::from_element(1, 0.0));
//! solver.solve(&model, 0, 0.0, 1.0, &mut state, &DVector::zeros(0)).unwrap();
//! // exact: (2500 cos 1 + 50 sin 1)/2501 - 2500/2501 e^-50
//! assert!((state.x[0] - 0.556909).abs() < 1e-4);
//! ```
/// coefficient sets of the six methods
pub mod GRK4_tableau;
/// error taxonomy
pub mod GRK4_error;
/// tolerances, limits and method selection
pub mod GRK4_settings;
/// right-hand side and Jacobians supplied by the caller
pub mod GRK4_model;
/// LU factorization of the shifted Jacobian
pub mod GRK4_linalg;
/// Main GRK4 solver
pub mod GRK4_solver;


pub use GRK4_error::GRK4Error;
pub use GRK4_model::{ClosureModel, StiffModel};
pub use GRK4_settings::GRK4Settings;
pub use GRK4_solver::{GRK4, GRK4Stats, SensitivityBlock, StageState, StepRecord};
pub use GRK4_tableau::{GRK4Coefficients, GRK4Method};
