//! Polarization-dependent admittances and Fresnel coefficients.
//!
//! Boundary conditions at a planar interface only involve the tangential
//! field components, so every medium in a stack can be summarised by its
//! normal wavevector component `kz = k0 √(n² − α²)` and its optical
//! admittance `η`, with `α` the lateral wavevector invariant:
//!
//! - s (TE): `η = kz`
//! - p (TM): `η = n² / kz`

use std::fmt;
use std::str::FromStr;

use nalgebra::Complex;
use serde::{Deserialize, Serialize};

use crate::error::OpticsError;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn parse_polarization() {
        assert_eq!("s".parse::<Polarization>().unwrap(), Polarization::S);
        assert_eq!("P".parse::<Polarization>().unwrap(), Polarization::P);
        assert_eq!(" tm ".parse::<Polarization>().unwrap(), Polarization::P);
        assert!("x".parse::<Polarization>().is_err());
        assert_eq!(Polarization::S.to_string(), "S");
    }

    #[test]
    fn normal_incidence_admittance() {
        let n = Complex::new(1.5, 0.0);
        let k0 = 2.0;
        let kz = normal_wavevector(n, Complex::new(0.0, 0.0), k0);
        assert!((kz - n * k0).norm() < 1e-12);
        let eta_s = admittance(n, kz, Polarization::S);
        let eta_p = admittance(n, kz, Polarization::P);
        assert!((eta_s - 3.0).norm() < 1e-12);
        assert!((eta_p - 0.75).norm() < 1e-12);
    }

    #[test]
    fn evanescent_kz_decays() {
        let n = Complex::new(1.0, 0.0);
        let alpha = Complex::new(1.2, 0.0);
        let kz = normal_wavevector(n, alpha, 1.0);
        assert!(kz.re.abs() < 1e-12);
        assert!(kz.im > 0.0);
    }
}

/// Linear polarization state relative to the plane of incidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    /// Electric field perpendicular to the plane of incidence (TE).
    #[serde(alias = "s", alias = "TE", alias = "te")]
    S,
    /// Electric field in the plane of incidence (TM).
    #[serde(alias = "p", alias = "TM", alias = "tm")]
    P,
}

impl FromStr for Polarization {
    type Err = OpticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "te" => Ok(Self::S),
            "p" | "tm" => Ok(Self::P),
            other => Err(OpticsError::invalid(format!(
                "unknown polarization '{other}', expected S or P"
            ))),
        }
    }
}

impl fmt::Display for Polarization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S => write!(f, "S"),
            Self::P => write!(f, "P"),
        }
    }
}

/// Normal wavevector component `k0 √(n² − α²)` on the principal branch.
pub fn normal_wavevector(n: Complex<f64>, alpha: Complex<f64>, k0: f64) -> Complex<f64> {
    (n * n - alpha * alpha).sqrt() * k0
}

/// Optical admittance of a medium with index `n` and normal wavevector `kz`.
pub fn admittance(n: Complex<f64>, kz: Complex<f64>, polarization: Polarization) -> Complex<f64> {
    match polarization {
        Polarization::S => kz,
        Polarization::P => n * n / kz,
    }
}
