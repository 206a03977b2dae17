//! Coefficient sets of the embedded (3)4 linearly-implicit Runge-Kutta methods.
//!
//! All six sets use the same stage structure
//! ```text
//! (I/(h*gamma) - J) k_i = f(x + c_i*h, y + sum_j a_ij*k_j) + h*d_i*f_t + sum_j (c_ij/h)*k_j
//! y_new = y + sum_i b_i*k_i,      err = sum_i e_i*k_i
//! ```
//! and differ only in the numbers below (E. Hairer, G. Wanner, Solving ODE II, ros4.f).
use crate::numerical::GRK4::GRK4_error::GRK4Error;
use strum_macros::{Display, EnumIter, EnumString};

/// Selectable GRK4 method. The integer id is the one used by task documents (1..=6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GRK4Method {
    /// method of Shampine
    Shampine,
    /// GRK4A of Kaps-Rentrop
    KapsRentropA,
    /// GRK4T of Kaps-Rentrop
    KapsRentropT,
    /// van Veldhuizen, gamma = 1/2
    VanVeldhuizen,
    /// van Veldhuizen, "D-stable"
    #[default]
    VanVeldhuizenDStable,
    /// an L-stable method
    LStable,
}

/// Immutable coefficient record of one method
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GRK4Coefficients {
    pub a21: f64,
    pub a31: f64,
    pub a32: f64,
    pub c21: f64,
    pub c31: f64,
    pub c32: f64,
    pub c41: f64,
    pub c42: f64,
    pub c43: f64,
    pub b1: f64,
    pub b2: f64,
    pub b3: f64,
    pub b4: f64,
    pub e1: f64,
    pub e2: f64,
    pub e3: f64,
    pub e4: f64,
    pub gamma: f64,
    pub c2: f64,
    pub c3: f64,
    pub d1: f64,
    pub d2: f64,
    pub d3: f64,
    pub d4: f64,
}

pub const SHAMPINE: GRK4Coefficients = GRK4Coefficients {
    a21: 2.0,
    a31: 48.0 / 25.0,
    a32: 6.0 / 25.0,
    c21: -8.0,
    c31: 372.0 / 25.0,
    c32: 12.0 / 5.0,
    c41: -112.0 / 125.0,
    c42: -54.0 / 125.0,
    c43: -2.0 / 5.0,
    b1: 19.0 / 9.0,
    b2: 1.0 / 2.0,
    b3: 25.0 / 108.0,
    b4: 125.0 / 108.0,
    e1: 17.0 / 54.0,
    e2: 7.0 / 36.0,
    e3: 0.0,
    e4: 125.0 / 108.0,
    gamma: 0.5,
    c2: 1.0,
    c3: 0.6,
    d1: 0.5,
    d2: -1.5,
    d3: 2.42,
    d4: 0.116,
};

pub const KAPS_RENTROP_A: GRK4Coefficients = GRK4Coefficients {
    a21: 0.1108860759493671E+01,
    a31: 0.2377085261983360E+01,
    a32: 0.1850114988899692E+00,
    c21: -0.4920188402397641E+01,
    c31: 0.1055588686048583E+01,
    c32: 0.3351817267668938E+01,
    c41: 0.3846869007049313E+01,
    c42: 0.3427109241268180E+01,
    c43: -0.2162408848753263E+01,
    b1: 0.1845683240405840E+01,
    b2: 0.1369796894360503E+00,
    b3: 0.7129097783291559E+00,
    b4: 0.6329113924050632E+00,
    e1: 0.4831870177201765E-01,
    e2: -0.6471108651049505E+00,
    e3: 0.2186876660500240E+00,
    e4: -0.6329113924050632E+00,
    gamma: 0.3950000000000000E+00,
    c2: 0.4380000000000000E+00,
    c3: 0.8700000000000000E+00,
    d1: 0.3950000000000000E+00,
    d2: -0.3726723954840920E+00,
    d3: 0.6629196544571492E-01,
    d4: 0.4340946962568634E+00,
};

pub const KAPS_RENTROP_T: GRK4Coefficients = GRK4Coefficients {
    a21: 0.2000000000000000E+01,
    a31: 0.4524708207373116E+01,
    a32: 0.4163528788597648E+01,
    c21: -0.5071675338776316E+01,
    c31: 0.6020152728650786E+01,
    c32: 0.1597506846727117E+00,
    c41: -0.1856343618686113E+01,
    c42: -0.8505380858179826E+01,
    c43: -0.2084075136023187E+01,
    b1: 0.3957503746640777E+01,
    b2: 0.4624892388363313E+01,
    b3: 0.6174772638750108E+00,
    b4: 0.1282612945269037E+01,
    e1: 0.2302155402932996E+01,
    e2: 0.3073634485392623E+01,
    e3: -0.8732808018045032E+00,
    e4: -0.1282612945269037E+01,
    gamma: 0.2310000000000000E+00,
    c2: 0.4620000000000000E+00,
    c3: 0.8802083333333334E+00,
    d1: 0.2310000000000000E+00,
    d2: -0.3962966775244303E-01,
    d3: 0.5507789395789127E+00,
    d4: -0.5535098457052764E-01,
};

pub const VAN_VELDHUIZEN: GRK4Coefficients = GRK4Coefficients {
    a21: 0.2000000000000000E+01,
    a31: 0.1750000000000000E+01,
    a32: 0.2500000000000000E+00,
    c21: -0.8000000000000000E+01,
    c31: -0.8000000000000000E+01,
    c32: -0.1000000000000000E+01,
    c41: 0.5000000000000000E+00,
    c42: -0.5000000000000000E+00,
    c43: 0.2000000000000000E+01,
    b1: 0.1333333333333333E+01,
    b2: 0.6666666666666667E+00,
    b3: -0.1333333333333333E+01,
    b4: 0.1333333333333333E+01,
    e1: -0.3333333333333333E+00,
    e2: -0.3333333333333333E+00,
    e3: -0.0000000000000000E+00,
    e4: -0.1333333333333333E+01,
    gamma: 0.5000000000000000E+00,
    c2: 0.1000000000000000E+01,
    c3: 0.5000000000000000E+00,
    d1: 0.5000000000000000E+00,
    d2: -0.1500000000000000E+01,
    d3: -0.7500000000000000E+00,
    d4: 0.2500000000000000E+00,
};

pub const VAN_VELDHUIZEN_D_STABLE: GRK4Coefficients = GRK4Coefficients {
    a21: 0.2000000000000000E+01,
    a31: 0.4812234362695436E+01,
    a32: 0.4578146956747842E+01,
    c21: -0.5333333333333331E+01,
    c31: 0.6100529678848254E+01,
    c32: 0.1804736797378427E+01,
    c41: -0.2540515456634749E+01,
    c42: -0.9443746328915205E+01,
    c43: -0.1988471753215993E+01,
    b1: 0.4289339254654537E+01,
    b2: 0.5036098482851414E+01,
    b3: 0.6085736420673917E+00,
    b4: 0.1355958941201148E+01,
    e1: 0.2175672787531755E+01,
    e2: 0.2950911222575741E+01,
    e3: -0.7859744544887430E+00,
    e4: -0.1355958941201148E+01,
    gamma: 0.2257081148225682E+00,
    c2: 0.4514162296451364E+00,
    c3: 0.8755928946018455E+00,
    d1: 0.2257081148225682E+00,
    d2: -0.4599403502680582E-01,
    d3: 0.5177590504944076E+00,
    d4: -0.3805623938054428E-01,
};

pub const L_STABLE: GRK4Coefficients = GRK4Coefficients {
    a21: 0.2000000000000000E+01,
    a31: 0.1867943637803922E+01,
    a32: 0.2344449711399156E+00,
    c21: -0.7137615036412310E+01,
    c31: 0.2580708087951457E+01,
    c32: 0.6515950076447975E+00,
    c41: -0.2137148994382534E+01,
    c42: -0.3214669691237626E+00,
    c43: -0.6949742501781779E+00,
    b1: 0.2255570073418735E+01,
    b2: 0.2870493262186792E+00,
    b3: 0.4353179431840180E+00,
    b4: 0.1093502252409163E+01,
    e1: -0.2815431932141155E+00,
    e2: -0.7276199124938920E-01,
    e3: -0.1082196201495311E+00,
    e4: -0.1093502252409163E+01,
    gamma: 0.5728200000000000E+00,
    c2: 0.1145640000000000E+01,
    c3: 0.6552168638155900E+00,
    d1: 0.5728200000000000E+00,
    d2: -0.1769193891319233E+01,
    d3: 0.7592633437920482E+00,
    d4: -0.1049021087100450E+00,
};

impl GRK4Method {
    /// integer id used in task documents
    pub fn id(&self) -> i64 {
        match self {
            GRK4Method::Shampine => 1,
            GRK4Method::KapsRentropA => 2,
            GRK4Method::KapsRentropT => 3,
            GRK4Method::VanVeldhuizen => 4,
            GRK4Method::VanVeldhuizenDStable => 5,
            GRK4Method::LStable => 6,
        }
    }

    pub fn from_id(id: i64) -> Result<GRK4Method, GRK4Error> {
        match id {
            1 => Ok(GRK4Method::Shampine),
            2 => Ok(GRK4Method::KapsRentropA),
            3 => Ok(GRK4Method::KapsRentropT),
            4 => Ok(GRK4Method::VanVeldhuizen),
            5 => Ok(GRK4Method::VanVeldhuizenDStable),
            6 => Ok(GRK4Method::LStable),
            _ => Err(GRK4Error::UnknownMethod(id)),
        }
    }

    pub fn coefficients(&self) -> &'static GRK4Coefficients {
        match self {
            GRK4Method::Shampine => &SHAMPINE,
            GRK4Method::KapsRentropA => &KAPS_RENTROP_A,
            GRK4Method::KapsRentropT => &KAPS_RENTROP_T,
            GRK4Method::VanVeldhuizen => &VAN_VELDHUIZEN,
            GRK4Method::VanVeldhuizenDStable => &VAN_VELDHUIZEN_D_STABLE,
            GRK4Method::LStable => &L_STABLE,
        }
    }
}
