//! Transfer-matrix solver for planar thin-film stacks.
//!
//! A stack is an ordered list of [`Layer`]s between a semi-infinite incidence
//! medium (the coupling prism) and a semi-infinite exit medium (the analyte).
//! Each layer contributes a 2×2 characteristic matrix relating the tangential
//! fields on its two faces; the product of these matrices, taken in
//! propagation order, yields the amplitude reflection and transmission
//! coefficients of the whole stack.
//!
//! Reflectance and transmittance are reported as computed. They are not
//! clamped to `[0, 1]`: for strongly absorbing layers rounding can push them
//! slightly outside that range, and a clamp would also hide bad parameters.

use std::f64::consts::PI;

use log::debug;
use nalgebra::{Complex, Matrix2};
use num_complex::Complex64;
use serde::Serialize;

use crate::config::{ADMITTANCE_TOLERANCE, DETERMINANT_TOLERANCE, INCIDENT_ADMITTANCE_TOLERANCE};
use crate::dispersion::{check_wavelength, DispersionModel, Material};
use crate::error::{OpticsError, Result};
use crate::fresnel::{admittance, normal_wavevector, Polarization};
use crate::snell;


/// A homogeneous film of a given material and physical thickness (m).
#[derive(Debug, Clone)]
pub struct Layer {
    pub material: Material,
    pub thickness: f64,
}

impl Layer {
    pub fn new(material: Material, thickness: f64) -> Result<Self> {
        if !(thickness >= 0.0 && thickness.is_finite()) {
            return Err(OpticsError::invalid(format!(
                "layer thickness must be non-negative and finite, got {thickness} m"
            )));
        }
        Ok(Self {
            material,
            thickness,
        })
    }
}

/// Outcome of a single transfer-matrix evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RtResult {
    /// Real part of the refraction angle in the exit medium (degrees).
    pub theta_out: f64,
    pub reflectance: f64,
    pub transmittance: f64,
}

/// Characteristic matrix of one layer.
fn layer_matrix(delta: Complex64, eta: Complex64) -> Matrix2<Complex<f64>> {
    let i = Complex64::i();
    let (sin, cos) = (delta.sin(), delta.cos());
    let m12 = if eta.norm() < ADMITTANCE_TOLERANCE {
        Complex64::new(0.0, 0.0)
    } else {
        -i * sin / eta
    };
    Matrix2::new(cos, m12, -i * eta * sin, cos)
}

/// Reflectance and transmittance of `layers` between `material_in` and
/// `material_out` for light of vacuum wavelength `wavelength` (m) incident at
/// `theta_in` degrees.
pub fn compute(
    wavelength: f64,
    material_in: &dyn DispersionModel,
    layers: &[Layer],
    material_out: &dyn DispersionModel,
    theta_in: f64,
    polarization: Polarization,
) -> Result<RtResult> {
    check_wavelength(wavelength)?;
    let theta_in_rad = theta_in * PI / 180.0;
    let k0 = 2.0 * PI / wavelength;

    let n_in = material_in.evaluate(wavelength)?;
    let n_out = material_out.evaluate(wavelength)?;

    let alpha = n_in * theta_in_rad.sin();
    let theta_out = snell::transmitted_angle(n_in, n_out, theta_in_rad).re * 180.0 / PI;

    let mut m = Matrix2::<Complex<f64>>::identity();
    for layer in layers {
        let n = layer.material.evaluate(wavelength)?;
        let kz = normal_wavevector(n, alpha, k0);
        let eta = admittance(n, kz, polarization);
        m = layer_matrix(kz * layer.thickness, eta) * m;
    }

    let eta_in = admittance(n_in, normal_wavevector(n_in, alpha, k0), polarization);
    let eta_out = admittance(n_out, normal_wavevector(n_out, alpha, k0), polarization);
    let (m11, m12, m21, m22) = (m[(0, 0)], m[(0, 1)], m[(1, 0)], m[(1, 1)]);

    let forward = eta_in * m11 + eta_in * eta_out * m12;
    let backward = m21 + eta_out * m22;
    let denominator = forward + backward;
    if denominator.norm() < DETERMINANT_TOLERANCE {
        debug!(
            "degenerate stack at {} m, {} deg ({}): |D| = {:e}",
            wavelength,
            theta_in,
            polarization,
            denominator.norm()
        );
        return Ok(RtResult {
            theta_out,
            reflectance: 0.0,
            transmittance: 0.0,
        });
    }

    let r = (forward - backward) / denominator;
    let t = 2.0 * eta_in / denominator;

    let reflectance = r.norm_sqr();
    let transmittance = if eta_in.re > INCIDENT_ADMITTANCE_TOLERANCE {
        eta_out.re / eta_in.re * t.norm_sqr()
    } else {
        0.0
    };

    Ok(RtResult {
        theta_out,
        reflectance,
        transmittance,
    })
}
