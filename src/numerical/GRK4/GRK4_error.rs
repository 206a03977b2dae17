use std::fmt;

/// Error types of the GRK4 integrator
#[derive(Debug, Clone, PartialEq)]
pub enum GRK4Error {
    /// rtol <= 10*uround or atol <= 0
    InvalidTolerance { rtol: f64, atol: f64 },
    InvalidMaxSteps(usize),
    InvalidUround(f64),
    InvalidStepFactors { fac1: f64, fac2: f64 },
    UnknownMethod(i64),
    /// malformed task document, unknown key or value of the wrong type
    InvalidConfig(String),
    DimensionMismatch(String),
    NonFiniteInitialState,
    /// the shifted Jacobian could not be factorized `consecutive` times in a row
    SingularJacobian { t: f64, consecutive: usize },
    MaxStepsExceeded { t: f64, nmax: usize },
    StepSizeTooSmall { t: f64, h: f64 },
}

impl fmt::Display for GRK4Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GRK4Error::InvalidTolerance { rtol, atol } => write!(
                f,
                "Tolerances are too small: rtol = {}, atol = {}",
                rtol, atol
            ),
            GRK4Error::InvalidMaxSteps(nmax) => write!(f, "Wrong input for nmax = {}", nmax),
            GRK4Error::InvalidUround(uround) => write!(f, "Wrong input for uround = {}", uround),
            GRK4Error::InvalidStepFactors { fac1, fac2 } => write!(
                f,
                "Wrong input for step size parameters fac1 = {}, fac2 = {}",
                fac1, fac2
            ),
            GRK4Error::UnknownMethod(id) => write!(f, "Wrong input for method = {}", id),
            GRK4Error::InvalidConfig(msg) => write!(f, "Invalid integrator settings: {}", msg),
            GRK4Error::DimensionMismatch(msg) => write!(f, "Dimension mismatch: {}", msg),
            GRK4Error::NonFiniteInitialState => {
                write!(f, "All components of the initial state must be finite")
            }
            GRK4Error::SingularJacobian { t, consecutive } => write!(
                f,
                "Singular Jacobian at t = {} ({} consecutive factorization failures)",
                t, consecutive
            ),
            GRK4Error::MaxStepsExceeded { t, nmax } => write!(
                f,
                "More than nmax = {} steps are needed, stopped at t = {}",
                nmax, t
            ),
            GRK4Error::StepSizeTooSmall { t, h } => {
                write!(f, "Step size too small: h = {} at t = {}", h, t)
            }
        }
    }
}

impl std::error::Error for GRK4Error {}

impl GRK4Error {
    /// true for errors detected before any stepping occurs
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            GRK4Error::InvalidTolerance { .. }
                | GRK4Error::InvalidMaxSteps(_)
                | GRK4Error::InvalidUround(_)
                | GRK4Error::InvalidStepFactors { .. }
                | GRK4Error::UnknownMethod(_)
                | GRK4Error::InvalidConfig(_)
        )
    }
}
