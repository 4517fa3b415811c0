//! Parallel reflectance sweeps over incidence angle or wavelength.
//!
//! A [`Sweep`] resolves the configured stack against a material registry,
//! lays out a grid of angles or wavelengths and evaluates every point
//! independently: S and P reflectance, optionally the sensitivity `dR/dn` and
//! the direction in which the reflected ray leaves the coupling prism.
//!
//! **Context**: SPRi instruments are characterised by reflectance curves.
//! Scanning the angle at a fixed wavelength locates the plasmon dip and the
//! steepest working point; scanning the wavelength at a fixed angle does the
//! same for spectral interrogation.
//!
//! **How it Works**: Points share nothing but read-only materials, so they are
//! evaluated with rayon and collected in grid order. Progress is reported on an
//! indicatif bar and the sweep can be written out with [`Sweep::writeup`].

use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use ndarray::Array1;
use rayon::prelude::*;
use serde::Serialize;

use crate::dispersion::Material;
use crate::error;
use crate::fresnel::Polarization;
use crate::grid;
use crate::output;
use crate::prism::PrismGeometry;
use crate::registry::MaterialRegistry;
use crate::sensitivity::sensitivity;
use crate::settings::{Settings, SweepKind};
use crate::snell::refract_sine;
use crate::tmm::{self, Layer, RtResult};

#[cfg(test)]
mod tests {

    use super::*;
    use crate::settings::{load_default_config, SweepSpec};

    fn short_angle_sweep() -> Settings {
        let mut settings = load_default_config().unwrap();
        settings.sweep = SweepSpec {
            kind: SweepKind::Angle,
            start: 60.0,
            end: 80.0,
            step: 0.5,
        };
        settings
    }

    #[test]
    fn angle_sweep_in_grid_order() {
        let registry = MaterialRegistry::builtin().unwrap();
        let mut sweep = Sweep::new(short_angle_sweep(), &registry).unwrap();
        assert_eq!(sweep.grid.len(), 41);
        sweep.solve().unwrap();

        assert_eq!(sweep.points.len(), 41);
        for (point, angle) in sweep.points.iter().zip(sweep.grid.iter()) {
            assert_eq!(point.theta_in, *angle);
            assert_eq!(point.wavelength, 660e-9);
            assert!(point.s.reflectance.is_finite());
            assert!(point.p.reflectance.is_finite());
            assert!(point.sensitivity.is_some());
            assert!(point.prism_out_angle.is_some());
        }

        // the plasmon dip for gold on BK7 in water at 660 nm sits near 72 degrees
        let (angle, reflectance) = sweep.p_minimum().unwrap();
        assert!((70.0..75.0).contains(&angle), "dip at {angle}");
        assert!(reflectance < 0.1);
    }

    #[test]
    fn wavelength_sweep() {
        let registry = MaterialRegistry::builtin().unwrap();
        let mut settings = load_default_config().unwrap();
        settings.sweep = SweepSpec {
            kind: SweepKind::Wavelength,
            start: 600e-9,
            end: 700e-9,
            step: 10e-9,
        };
        settings.angle = 72.0;
        settings.sensitivity.enabled = false;
        settings.prism = None;

        let mut sweep = Sweep::new(settings, &registry).unwrap();
        sweep.solve().unwrap();
        assert_eq!(sweep.points.len(), 11);
        for point in &sweep.points {
            assert_eq!(point.theta_in, 72.0);
            assert!(point.p.reflectance.is_finite());
            assert!(point.sensitivity.is_none());
            assert!(point.prism_out_angle.is_none());
        }
        assert!((sweep.points[10].wavelength - 700e-9).abs() < 1e-15);
    }

    #[test]
    fn unknown_material_fails_early() {
        let registry = MaterialRegistry::builtin().unwrap();
        let mut settings = short_angle_sweep();
        settings.exit = crate::settings::MaterialSpec::Named("unobtainium".to_string());
        assert!(Sweep::new(settings, &registry).is_err());
    }

    #[test]
    fn unsolved_sweep_has_no_minimum() {
        let registry = MaterialRegistry::builtin().unwrap();
        let sweep = Sweep::new(short_angle_sweep(), &registry).unwrap();
        assert!(sweep.p_minimum().is_none());
    }
}

/// Resolved media of a thin-film stack.
#[derive(Debug, Clone)]
pub struct Stack {
    pub incidence: Material,
    pub layers: Vec<Layer>,
    pub exit: Material,
}

impl Stack {
    pub fn new(settings: &Settings, registry: &MaterialRegistry) -> Result<Self> {
        let incidence = settings
            .incidence
            .resolve(registry)
            .with_context(|| format!("invalid incidence medium {}", settings.incidence))?;
        let layers = settings
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| {
                layer
                    .resolve(registry)
                    .with_context(|| format!("invalid layer {index} ({})", layer.material))
            })
            .collect::<Result<Vec<_>>>()?;
        let exit = settings
            .exit
            .resolve(registry)
            .with_context(|| format!("invalid exit medium {}", settings.exit))?;
        Ok(Self {
            incidence,
            layers,
            exit,
        })
    }

    pub fn compute(
        &self,
        wavelength: f64,
        theta_in: f64,
        polarization: Polarization,
    ) -> error::Result<RtResult> {
        tmm::compute(
            wavelength,
            self.incidence.as_ref(),
            &self.layers,
            self.exit.as_ref(),
            theta_in,
            polarization,
        )
    }
}

/// Everything computed at one grid point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    /// Wavelength in metres.
    pub wavelength: f64,
    /// Incidence angle in degrees.
    pub theta_in: f64,
    pub s: RtResult,
    pub p: RtResult,
    /// `dR/dn` of the p reflectance, when enabled.
    pub sensitivity: Option<f64>,
    /// Exit direction from the coupling prism in degrees, when a prism is configured.
    pub prism_out_angle: Option<f64>,
}

/// A reflectance sweep of one stack.
#[derive(Debug)]
pub struct Sweep {
    pub settings: Settings,
    pub stack: Stack,
    /// Slide material and base angle of the coupling prism.
    pub prism: Option<(Material, f64)>,
    /// Angles (degrees) or wavelengths (metres), depending on the sweep kind.
    pub grid: Array1<f64>,
    pub points: Vec<SweepPoint>,
}

impl Sweep {
    /// Resolves every material and lays out the grid. Nothing is computed yet.
    pub fn new(settings: Settings, registry: &MaterialRegistry) -> Result<Self> {
        settings.validate()?;
        let stack = Stack::new(&settings, registry)?;
        let prism = settings
            .prism
            .as_ref()
            .map(|prism| -> Result<(Material, f64)> {
                let slide = prism
                    .slide
                    .resolve(registry)
                    .with_context(|| format!("invalid slide material {}", prism.slide))?;
                Ok((slide, prism.angle))
            })
            .transpose()?;

        let grid = grid::steps(settings.sweep.start, settings.sweep.end, settings.sweep.step)
            .context("invalid sweep grid")?;
        if grid.len() == 1 {
            warn!("sweep grid has a single point");
        }

        Ok(Self {
            settings,
            stack,
            prism,
            grid,
            points: Vec::new(),
        })
    }

    /// Wavelength and incidence angle of the grid value `value`.
    fn coordinates(&self, value: f64) -> (f64, f64) {
        match self.settings.sweep.kind {
            SweepKind::Angle => (self.settings.wavelength, value),
            SweepKind::Wavelength => (value, self.settings.angle),
        }
    }

    fn solve_point(&self, value: f64) -> error::Result<SweepPoint> {
        let (wavelength, theta_in) = self.coordinates(value);
        let s = self.stack.compute(wavelength, theta_in, Polarization::S)?;
        let p = self.stack.compute(wavelength, theta_in, Polarization::P)?;

        let sensitivity = if self.settings.sensitivity.enabled {
            Some(sensitivity(
                self.stack.incidence.as_ref(),
                &self.stack.layers,
                &self.stack.exit,
                wavelength,
                theta_in,
                self.settings.sensitivity.absolute,
            )?)
        } else {
            None
        };

        let prism_out_angle = match &self.prism {
            Some((slide, angle)) => {
                let geometry = PrismGeometry::from_materials(
                    *angle,
                    slide.as_ref(),
                    self.stack.incidence.as_ref(),
                    wavelength,
                )?;
                // same lateral invariant in the slide as in the incidence medium
                let n_in = self.stack.incidence.evaluate(wavelength)?.re;
                let sin_slide = refract_sine(theta_in.to_radians().sin(), n_in, geometry.n_slide);
                Some(geometry.exit_angle(sin_slide.asin().to_degrees()))
            }
            None => None,
        };

        Ok(SweepPoint {
            wavelength,
            theta_in,
            s,
            p,
            sensitivity,
            prism_out_angle,
        })
    }

    /// Evaluates every grid point in parallel, replacing any earlier results.
    pub fn solve(&mut self) -> Result<()> {
        let start = Instant::now();
        info!("solving {} sweep points...", self.grid.len());

        let pb = ProgressBar::new(self.grid.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>5}/{len:5} {msg} ETA: {eta_precise}",
            )?
            .progress_chars("█▇▆▅▄▃▂▁"),
        );
        pb.set_message(match self.settings.sweep.kind {
            SweepKind::Angle => "angle",
            SweepKind::Wavelength => "wavelength",
        });

        let values = self.grid.to_vec();
        let points = values
            .par_iter()
            .map(|value| {
                let point = self.solve_point(*value);
                pb.inc(1);
                point
            })
            .collect::<error::Result<Vec<_>>>()
            .context("sweep point failed")?;
        pb.finish_and_clear();
        self.points = points;

        let duration = start.elapsed();
        info!(
            "time taken: {:.2?}, time per point: {:.2?}",
            duration,
            duration / self.points.len().max(1) as u32
        );
        Ok(())
    }

    /// Grid value and reflectance of the lowest sampled p reflectance.
    pub fn p_minimum(&self) -> Option<(f64, f64)> {
        let value = |point: &SweepPoint| match self.settings.sweep.kind {
            SweepKind::Angle => point.theta_in,
            SweepKind::Wavelength => point.wavelength,
        };
        self.points
            .iter()
            .filter(|point| point.p.reflectance.is_finite())
            .min_by(|a, b| a.p.reflectance.total_cmp(&b.p.reflectance))
            .map(|point| (value(point), point.p.reflectance))
    }

    /// Writes the sweep table, a JSON summary and the settings used to `settings.directory`.
    pub fn writeup(&self) -> Result<()> {
        let directory = &self.settings.directory;
        output::write_sweep(&self.points, self.settings.sweep.kind, directory)?;
        output::write_summary(&output::Summary::new(self), directory)?;
        output::write_settings(&self.settings, directory)?;
        info!("results written to {directory:?}");
        Ok(())
    }
}
