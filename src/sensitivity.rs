//! Finite-difference sensitivity of SPR reflectance to the analyte index.
//!
//! The sensitivity of an SPR sensor is the change in p-polarized reflectance
//! per unit change of the outer medium's refractive index, `dR/dn`. It is
//! estimated with a forward difference: the outer medium is replaced by a copy
//! whose complex index is shifted by a small real increment at every
//! wavelength, and the stack is solved twice.

use std::sync::Arc;

use log::debug;
use num_complex::Complex64;

use crate::config::{MIN_BASELINE_REFLECTANCE, MIN_INDEX_PERTURBATION, SENSITIVITY_PERTURBATION};
use crate::dispersion::{DispersionModel, Material};
use crate::error::{OpticsError, Result};
use crate::fresnel::Polarization;
use crate::tmm::{self, Layer};


/// A dispersion model shifted by a constant real index increment.
#[derive(Debug, Clone)]
pub struct OffsetModel {
    base: Material,
    offset: f64,
}

impl OffsetModel {
    pub fn new(base: Material, offset: f64) -> Self {
        Self { base, offset }
    }
}

impl DispersionModel for OffsetModel {
    fn index_at(&self, wavelength: f64) -> Result<Complex64> {
        Ok(self.base.evaluate(wavelength)? + self.offset)
    }
}

/// Sensitivity `dR/dn` of p-polarized reflectance to the outer medium index,
/// using the standard increment of `1e-6`.
///
/// With `absolute` the raw reflectance change is used; otherwise the change
/// relative to the unperturbed reflectance, which is NaN when that
/// reflectance is vanishingly small.
pub fn sensitivity(
    material_in: &dyn DispersionModel,
    layers: &[Layer],
    material_out: &Material,
    wavelength: f64,
    theta_in: f64,
    absolute: bool,
) -> Result<f64> {
    sensitivity_with_step(
        material_in,
        layers,
        material_out,
        wavelength,
        theta_in,
        absolute,
        SENSITIVITY_PERTURBATION,
    )
}

/// As [`sensitivity`], with an explicit index increment `step`.
pub fn sensitivity_with_step(
    material_in: &dyn DispersionModel,
    layers: &[Layer],
    material_out: &Material,
    wavelength: f64,
    theta_in: f64,
    absolute: bool,
    step: f64,
) -> Result<f64> {
    if !step.is_finite() {
        return Err(OpticsError::invalid(format!(
            "index perturbation must be finite, got {step}"
        )));
    }
    let perturbed = OffsetModel::new(Arc::clone(material_out), step);

    let r0 = tmm::compute(
        wavelength,
        material_in,
        layers,
        material_out.as_ref(),
        theta_in,
        Polarization::P,
    )?
    .reflectance;
    let r1 = tmm::compute(
        wavelength,
        material_in,
        layers,
        &perturbed,
        theta_in,
        Polarization::P,
    )?
    .reflectance;
    let delta_r = r1 - r0;

    let change = if absolute {
        delta_r
    } else {
        if r0 < MIN_BASELINE_REFLECTANCE {
            debug!("baseline reflectance {r0:e} too small for relative sensitivity");
            return Ok(f64::NAN);
        }
        delta_r / r0
    };

    let delta_n = (perturbed.evaluate(wavelength)? - material_out.evaluate(wavelength)?).re;
    if delta_n.abs() < MIN_INDEX_PERTURBATION {
        debug!("index perturbation {delta_n:e} too small for a sensitivity quotient");
        return Ok(f64::NAN);
    }

    Ok(change / delta_n)
}
