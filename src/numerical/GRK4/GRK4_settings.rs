//! Configuration surface of the GRK4 integrator.
//!
//! Settings are plain fields; they can also be read from a task document
//! (see [`crate::Utils::task_parser`]) with a section titled `integrator`:
//! ```text
//! integrator
//!   rtol: 1e-6
//!   atol: 1e-8
//!   prg_int_coeffs: 6
//! ```
use crate::Utils::task_parser::{Value, parse_document};
use crate::numerical::GRK4::GRK4_error::GRK4Error;
use crate::numerical::GRK4::GRK4_tableau::GRK4Method;
use log::info;
use std::path::Path;
use std::str::FromStr;

/// section of a task document holding the integrator settings
pub const SETTINGS_SECTION: &str = "integrator";

#[derive(Debug, Clone, PartialEq)]
pub struct GRK4Settings {
    /// relative tolerance, must exceed 10*uround
    pub rtol: f64,
    /// absolute tolerance, must be positive
    pub atol: f64,
    /// initial step size; 0 selects |t_end - t_start|/10
    pub hinit: f64,
    /// maximal step size; 0 selects |t_end - t_start|
    pub hmax: f64,
    /// maximal number of step attempts per solve
    pub nmax: usize,
    /// unit roundoff
    pub uround: f64,
    /// step size may shrink at most by fac1 ...
    pub fac1: f64,
    /// ... and grow at most by 1/fac2 per step
    pub fac2: f64,
    /// tableau id 1..=6, see [`GRK4Method`]
    pub method: i64,
    /// consecutive singular factorizations tolerated before aborting
    pub max_sing: usize,
    /// keep the Jacobian of a base point across retries after a rejected step
    pub reuse_jacobian: bool,
}

impl Default for GRK4Settings {
    fn default() -> Self {
        GRK4Settings {
            rtol: 1e-6,
            atol: 1e-8,
            hinit: 0.0,
            hmax: 0.0,
            nmax: 100000,
            uround: f64::EPSILON,
            fac1: 5.0,
            fac2: 1.0 / 6.0,
            method: GRK4Method::default().id(),
            max_sing: 5,
            reuse_jacobian: true,
        }
    }
}

impl GRK4Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn with_method(mut self, method: GRK4Method) -> Self {
        self.method = method.id();
        self
    }

    /// Checks every setting and returns the selected tableau.
    pub fn validate(&self) -> Result<GRK4Method, GRK4Error> {
        if !(self.uround > 1e-35 && self.uround < 1.0) {
            return Err(GRK4Error::InvalidUround(self.uround));
        }
        // NaN tolerances fail these comparisons too
        if !(self.rtol > 10.0 * self.uround) || !(self.atol > 0.0) {
            return Err(GRK4Error::InvalidTolerance {
                rtol: self.rtol,
                atol: self.atol,
            });
        }
        if self.nmax == 0 {
            return Err(GRK4Error::InvalidMaxSteps(self.nmax));
        }
        if !(self.fac1 >= 1.0 && self.fac2 >= 0.0 && self.fac2 <= 1.0) {
            return Err(GRK4Error::InvalidStepFactors {
                fac1: self.fac1,
                fac2: self.fac2,
            });
        }
        if !self.hinit.is_finite() || !self.hmax.is_finite() {
            return Err(GRK4Error::InvalidConfig(format!(
                "step sizes must be finite: hinit = {}, hmax = {}",
                self.hinit, self.hmax
            )));
        }
        GRK4Method::from_id(self.method)
    }

    /// Sets one field by name. Legacy `prg_int_*` names are accepted as aliases.
    pub fn set_param(&mut self, key: &str, value: &Value) -> Result<(), GRK4Error> {
        let float = |value: &Value| {
            value.as_float().ok_or_else(|| {
                GRK4Error::InvalidConfig(format!("`{}` expects a number, got `{}`", key, value))
            })
        };
        let count = |value: &Value| {
            value
                .as_integer()
                .filter(|v| *v >= 0)
                .map(|v| v as usize)
                .ok_or_else(|| {
                    GRK4Error::InvalidConfig(format!(
                        "`{}` expects a non-negative integer, got `{}`",
                        key, value
                    ))
                })
        };
        match key {
            "rtol" => self.rtol = float(value)?,
            "atol" => self.atol = float(value)?,
            "hinit" | "prg_int_hinit" => self.hinit = float(value)?,
            "hmax" | "prg_int_hmax" => self.hmax = float(value)?,
            "nmax" => self.nmax = count(value)?,
            "uround" => self.uround = float(value)?,
            "fac1" => self.fac1 = float(value)?,
            "fac2" => self.fac2 = float(value)?,
            "max_sing" => self.max_sing = count(value)?,
            "method" | "prg_int_coeffs" => {
                self.method = match value {
                    Value::Integer(id) => *id,
                    Value::String(name) => GRK4Method::from_str(name)
                        .map_err(|_| {
                            GRK4Error::InvalidConfig(format!("unknown method name `{}`", name))
                        })?
                        .id(),
                    _ => {
                        return Err(GRK4Error::InvalidConfig(format!(
                            "`{}` expects a method id or name, got `{}`",
                            key, value
                        )));
                    }
                }
            }
            "reuse_jacobian" => {
                self.reuse_jacobian = value.as_boolean().ok_or_else(|| {
                    GRK4Error::InvalidConfig(format!("`{}` expects true/false", key))
                })?
            }
            _ => {
                return Err(GRK4Error::InvalidConfig(format!(
                    "unknown setting `{}`",
                    key
                )));
            }
        }
        Ok(())
    }

    /// Reads the `integrator` section of a task document on top of the defaults.
    /// Other sections are ignored.
    pub fn from_document(input: &str) -> Result<Self, GRK4Error> {
        let document = parse_document(input).map_err(GRK4Error::InvalidConfig)?;
        let mut settings = GRK4Settings::default();
        let Some(section) = document.get(SETTINGS_SECTION) else {
            return Err(GRK4Error::InvalidConfig(format!(
                "section `{}` not found",
                SETTINGS_SECTION
            )));
        };
        // sorted for a reproducible order of error reports
        let mut keys: Vec<&String> = section.keys().collect();
        keys.sort();
        for key in keys {
            let values = &section[key];
            if values.len() != 1 {
                return Err(GRK4Error::InvalidConfig(format!(
                    "`{}` expects a single value, got {}",
                    key,
                    values.len()
                )));
            }
            settings.set_param(key, &values[0])?;
        }
        info!("integrator settings read from document: {:?}", settings);
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GRK4Error> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            GRK4Error::InvalidConfig(format!(
                "cannot read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_document(&content)
    }
}
