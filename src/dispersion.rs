//! Wavelength-dependent complex refractive index models.
//!
//! Every material entering the thin-film solver is described by a
//! [`DispersionModel`], a pure mapping from vacuum wavelength (in metres) to a
//! complex refractive index `n + ik`. Five strategies are provided:
//!
//! - [`Analytic`]: an arbitrary closure, e.g. a constant index.
//! - [`Interpolated`]: tabulated samples with linear interpolation.
//! - [`Sellmeier`]: the Sellmeier equation for transparent dielectrics.
//! - [`Schott`]: the six-coefficient Schott power series.
//! - [`LorentzDrude`]: the Drude free-electron term plus Lorentz oscillators,
//!   the usual parametrisation for noble metals.
//!
//! Square roots are always taken on the principal branch (non-negative real
//! part), which keeps the absorption index `k` positive for lossy media.

use std::f64::consts::PI;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use num_complex::Complex64;

use crate::config::{EV_TO_RAD_PER_S, SPEED_OF_LIGHT};
use crate::error::{OpticsError, Result};


/// A material's complex refractive index as a pure function of wavelength.
///
/// Implementors provide [`DispersionModel::index_at`]; callers use
/// [`DispersionModel::evaluate`], which validates the wavelength first.
pub trait DispersionModel: Send + Sync + fmt::Debug {
    /// Refractive index at the wavelength `wavelength` (m). Closed-form models
    /// skip validation here and return NaN for nonsensical input; tabulated
    /// models reject it. Use [`DispersionModel::evaluate`] for a checked call.
    fn index_at(&self, wavelength: f64) -> Result<Complex64>;

    /// Complex refractive index `n + ik` at the vacuum wavelength `wavelength` (m).
    fn evaluate(&self, wavelength: f64) -> Result<Complex64> {
        check_wavelength(wavelength)?;
        self.index_at(wavelength)
    }
}

/// Shared handle to a dispersion model, as stored in the registry and in layers.
pub type Material = Arc<dyn DispersionModel>;

/// Returns an error unless `wavelength` is positive and finite.
pub fn check_wavelength(wavelength: f64) -> Result<()> {
    if wavelength > 0.0 && wavelength.is_finite() {
        Ok(())
    } else {
        Err(OpticsError::InvalidWavelength(wavelength))
    }
}

fn to_microns(wavelength: f64) -> f64 {
    wavelength * 1e6
}

fn ensure_finite(values: impl IntoIterator<Item = f64>, what: &str) -> Result<()> {
    if values.into_iter().all(f64::is_finite) {
        Ok(())
    } else {
        Err(OpticsError::invalid(format!("{what} must be finite")))
    }
}

/// Caller-supplied mapping from wavelength to refractive index.
#[derive(Clone)]
pub struct Analytic {
    func: Arc<dyn Fn(f64) -> Complex64 + Send + Sync>,
}

impl Analytic {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(f64) -> Complex64 + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// A non-dispersive medium.
    pub fn constant(index: Complex64) -> Self {
        Self::new(move |_| index)
    }
}

impl fmt::Debug for Analytic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analytic").finish_non_exhaustive()
    }
}

impl DispersionModel for Analytic {
    fn index_at(&self, wavelength: f64) -> Result<Complex64> {
        Ok((self.func)(wavelength))
    }
}

/// Tabulated refractive index, linearly interpolated between samples.
///
/// Real and imaginary parts are interpolated independently. Outside the
/// tabulated range the nearest endpoint value is returned unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolated {
    wavelengths: Vec<f64>,
    values: Vec<Complex64>,
}

impl Interpolated {
    /// Builds the table from `(wavelength, index)` samples, which must be
    /// strictly increasing in wavelength.
    pub fn new(samples: Vec<(f64, Complex64)>) -> Result<Self> {
        if samples.is_empty() {
            return Err(OpticsError::invalid("at least one sample is required"));
        }
        for (wavelength, _) in &samples {
            check_wavelength(*wavelength)?;
        }
        if !samples
            .iter()
            .tuple_windows()
            .all(|(left, right)| left.0 < right.0)
        {
            return Err(OpticsError::invalid(
                "sample wavelengths must be strictly increasing",
            ));
        }
        let (wavelengths, values) = samples.into_iter().unzip();
        Ok(Self {
            wavelengths,
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    /// Tabulated wavelength range (m).
    pub fn range(&self) -> (f64, f64) {
        (self.wavelengths[0], self.wavelengths[self.len() - 1])
    }
}

impl DispersionModel for Interpolated {
    fn index_at(&self, wavelength: f64) -> Result<Complex64> {
        // the sample search below needs an ordered wavelength
        check_wavelength(wavelength)?;
        let last = self.len() - 1;
        if wavelength <= self.wavelengths[0] {
            return Ok(self.values[0]);
        }
        if wavelength >= self.wavelengths[last] {
            return Ok(self.values[last]);
        }

        // first sample at or beyond the wavelength, always in 1..=last here
        let right = self.wavelengths.partition_point(|&w| w < wavelength);
        if self.wavelengths[right] == wavelength {
            return Ok(self.values[right]);
        }
        let left = right - 1;

        let t = (wavelength - self.wavelengths[left])
            / (self.wavelengths[right] - self.wavelengths[left]);
        let a = self.values[left];
        let b = self.values[right];
        Ok(Complex64::new(
            a.re + t * (b.re - a.re),
            a.im + t * (b.im - a.im),
        ))
    }
}

/// Sellmeier equation `n² = 1 + Σ Kᵢ λ² / (λ² − Lᵢ)` with λ in µm and Lᵢ in µm².
#[derive(Debug, Clone, PartialEq)]
pub struct Sellmeier {
    terms: Vec<(f64, f64)>,
}

impl Sellmeier {
    /// Creates the model from `(K, L)` pairs.
    pub fn new(terms: Vec<(f64, f64)>) -> Result<Self> {
        if terms.is_empty() {
            return Err(OpticsError::invalid(
                "Sellmeier model needs at least one term",
            ));
        }
        ensure_finite(
            terms.iter().flat_map(|&(k, l)| [k, l]),
            "Sellmeier coefficients",
        )?;
        Ok(Self { terms })
    }

    pub fn terms(&self) -> &[(f64, f64)] {
        &self.terms
    }
}

impl DispersionModel for Sellmeier {
    fn index_at(&self, wavelength: f64) -> Result<Complex64> {
        let lambda = to_microns(wavelength);
        let lambda_sq = lambda * lambda;

        let mut sum = 0.0;
        for (term, &(k, l)) in self.terms.iter().enumerate() {
            let denominator = lambda_sq - l;
            if denominator == 0.0 {
                return Err(OpticsError::SingularDenominator { term, wavelength });
            }
            sum += k * lambda_sq / denominator;
        }
        Ok(Complex64::new(1.0 + sum, 0.0).sqrt())
    }
}

/// Schott power series `n² = A0 + A1 λ² + A2 λ⁻² + A3 λ⁻⁴ + A4 λ⁻⁶ + A5 λ⁻⁸`, λ in µm.
#[derive(Debug, Clone, PartialEq)]
pub struct Schott {
    coefficients: [f64; 6],
}

impl Schott {
    /// Creates the model from up to six coefficients; missing trailing
    /// coefficients are zero.
    pub fn new(coefficients: &[f64]) -> Result<Self> {
        if coefficients.is_empty() {
            return Err(OpticsError::invalid("Schott model needs at least A0"));
        }
        if coefficients.len() > 6 {
            return Err(OpticsError::invalid(format!(
                "Schott model takes at most 6 coefficients, got {}",
                coefficients.len()
            )));
        }
        ensure_finite(coefficients.iter().copied(), "Schott coefficients")?;
        let mut padded = [0.0; 6];
        padded[..coefficients.len()].copy_from_slice(coefficients);
        Ok(Self {
            coefficients: padded,
        })
    }

    pub fn coefficients(&self) -> &[f64; 6] {
        &self.coefficients
    }
}

impl DispersionModel for Schott {
    fn index_at(&self, wavelength: f64) -> Result<Complex64> {
        let lambda = to_microns(wavelength);
        let lambda_sq = lambda * lambda;
        let inv2 = 1.0 / lambda_sq;
        let inv4 = inv2 * inv2;
        let inv6 = inv4 * inv2;
        let inv8 = inv4 * inv4;
        let [a0, a1, a2, a3, a4, a5] = self.coefficients;
        let eps = a0 + a1 * lambda_sq + a2 * inv2 + a3 * inv4 + a4 * inv6 + a5 * inv8;
        Ok(Complex64::new(eps, 0.0).sqrt())
    }
}

/// A bound-electron Lorentz oscillator. Frequencies are angular (rad/s)
/// unless the oscillator is handed to [`LorentzDrude::from_ev`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillator {
    pub strength: f64,
    pub resonance: f64,
    pub damping: f64,
}

impl Oscillator {
    pub fn new(strength: f64, resonance: f64, damping: f64) -> Self {
        Self {
            strength,
            resonance,
            damping,
        }
    }
}

/// Lorentz-Drude dielectric function for metals.
///
/// ```text
/// ε(ω) = ε∞ − Ωp² / (ω² + iγω) + Σⱼ fⱼ ωp² / (ωⱼ² − ω² − iγⱼω),   Ωp = √f0 ωp
/// ```
///
/// The Drude term uses the effective plasma frequency `Ωp` while the Lorentz
/// terms use the bare `ωp`, following the Rakić parametrisation.
#[derive(Debug, Clone, PartialEq)]
pub struct LorentzDrude {
    eps_inf: f64,
    plasma_frequency: f64,
    damping: f64,
    drude_strength: f64,
    oscillators: Vec<Oscillator>,
}

impl LorentzDrude {
    /// Creates the model from angular frequencies in rad/s, with unit Drude strength.
    pub fn new(
        eps_inf: f64,
        plasma_frequency: f64,
        damping: f64,
        oscillators: Vec<Oscillator>,
    ) -> Result<Self> {
        ensure_finite([eps_inf, plasma_frequency, damping], "Drude parameters")?;
        ensure_finite(
            oscillators
                .iter()
                .flat_map(|o| [o.strength, o.resonance, o.damping]),
            "oscillator parameters",
        )?;
        Ok(Self {
            eps_inf,
            plasma_frequency,
            damping,
            drude_strength: 1.0,
            oscillators,
        })
    }

    /// Sets the Drude strength `f0`.
    pub fn with_drude_strength(mut self, strength: f64) -> Result<Self> {
        if !(strength >= 0.0 && strength.is_finite()) {
            return Err(OpticsError::invalid(format!(
                "Drude strength must be non-negative, got {strength}"
            )));
        }
        self.drude_strength = strength;
        Ok(self)
    }

    /// Creates the model from energies in eV, as tabulated in the literature.
    pub fn from_ev(
        eps_inf: f64,
        plasma_ev: f64,
        drude_strength: f64,
        damping_ev: f64,
        oscillators_ev: &[Oscillator],
    ) -> Result<Self> {
        let oscillators = oscillators_ev
            .iter()
            .map(|o| {
                Oscillator::new(
                    o.strength,
                    o.resonance * EV_TO_RAD_PER_S,
                    o.damping * EV_TO_RAD_PER_S,
                )
            })
            .collect();
        Self::new(
            eps_inf,
            plasma_ev * EV_TO_RAD_PER_S,
            damping_ev * EV_TO_RAD_PER_S,
            oscillators,
        )?
        .with_drude_strength(drude_strength)
    }

    pub fn drude_strength(&self) -> f64 {
        self.drude_strength
    }

    pub fn oscillators(&self) -> &[Oscillator] {
        &self.oscillators
    }

    /// Relative permittivity ε at `wavelength` (m).
    pub fn permittivity(&self, wavelength: f64) -> Result<Complex64> {
        check_wavelength(wavelength)?;
        Ok(self.dielectric(wavelength))
    }

    fn dielectric(&self, wavelength: f64) -> Complex64 {
        let omega = 2.0 * PI * SPEED_OF_LIGHT / wavelength;
        let omega_sq = omega * omega;
        let plasma_sq = self.plasma_frequency * self.plasma_frequency;
        let effective_plasma_sq = self.drude_strength * plasma_sq;

        let drude = effective_plasma_sq / Complex64::new(omega_sq, self.damping * omega);
        let lorentz: Complex64 = self
            .oscillators
            .iter()
            .map(|o| {
                o.strength * plasma_sq
                    / Complex64::new(o.resonance * o.resonance - omega_sq, -o.damping * omega)
            })
            .sum();

        Complex64::new(self.eps_inf, 0.0) - drude + lorentz
    }
}

impl DispersionModel for LorentzDrude {
    fn index_at(&self, wavelength: f64) -> Result<Complex64> {
        Ok(self.dielectric(wavelength).sqrt())
    }
}
