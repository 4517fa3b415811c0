use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use log::info;
use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dispersion::{Analytic, Material};
use crate::fresnel::Polarization;
use crate::grid;
use crate::registry::{MaterialRegistry, TableKind};
use crate::tmm::Layer;

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn default_config_loads() {
        let settings = load_default_config().unwrap();
        assert_eq!(settings.polarization, Polarization::P);
        assert_eq!(settings.sweep.kind, SweepKind::Angle);
        assert_eq!(settings.layers.len(), 1);
        assert_eq!(settings.incidence, MaterialSpec::Named("BK7".to_string()));
        assert!(settings.sensitivity.enabled);
        assert!(settings.prism.is_some());
        settings.validate().unwrap();
    }

    #[test]
    fn cli_overrides_apply() {
        let mut settings = load_default_config().unwrap();
        let args = CliArgs::try_parse_from([
            "spri",
            "-w",
            "633e-9",
            "--polarization",
            "s",
            "--exit",
            "1.34+0.001i",
            "--layer",
            "Cr:2e-9",
            "--layer",
            "Au:48e-9",
            "--wavelength-sweep",
            "500e-9",
            "800e-9",
            "1e-9",
            "--angle",
            "68",
            "--absolute",
            "--prism-angle",
            "45",
            "-d",
            "out",
        ])
        .unwrap();
        args.apply(&mut settings);

        assert_eq!(settings.wavelength, 633e-9);
        assert_eq!(settings.polarization, Polarization::S);
        assert_eq!(settings.exit, MaterialSpec::Index(Complex::new(1.34, 0.001)));
        assert_eq!(
            settings.layers,
            vec![
                LayerSpec {
                    material: MaterialSpec::Named("Cr".to_string()),
                    thickness: 2e-9
                },
                LayerSpec {
                    material: MaterialSpec::Named("Au".to_string()),
                    thickness: 48e-9
                },
            ]
        );
        assert_eq!(settings.sweep.kind, SweepKind::Wavelength);
        assert_eq!(settings.sweep.start, 500e-9);
        assert_eq!(settings.angle, 68.0);
        assert!(settings.sensitivity.absolute);
        assert_eq!(settings.prism.as_ref().map(|p| p.angle), Some(45.0));
        assert_eq!(settings.directory, PathBuf::from("out"));
    }

    #[test]
    fn sweep_flags_conflict() {
        let args = CliArgs::try_parse_from([
            "spri",
            "--sweep",
            "40",
            "80",
            "1",
            "--wavelength-sweep",
            "5e-7",
            "6e-7",
            "1e-9",
        ]);
        assert!(args.is_err());
    }

    #[test]
    fn material_arguments() {
        assert_eq!(
            parse_material("H2O").unwrap(),
            MaterialSpec::Named("H2O".to_string())
        );
        assert_eq!(
            parse_material("1.5").unwrap(),
            MaterialSpec::Index(Complex::new(1.5, 0.0))
        );
        assert!(parse_material("  ").is_err());
        // names a complex parser would also accept stay names
        for name in ["i", "-i", "inf", "NaN", "e"] {
            assert_eq!(
                parse_material(name).unwrap(),
                MaterialSpec::Named(name.to_string())
            );
        }
        assert_eq!(
            parse_material("-1.5").unwrap(),
            MaterialSpec::Index(Complex::new(-1.5, 0.0))
        );
        assert_eq!(
            parse_material(".5+1i").unwrap(),
            MaterialSpec::Index(Complex::new(0.5, 1.0))
        );
        assert_eq!(
            parse_material("2x").unwrap(),
            MaterialSpec::Named("2x".to_string())
        );

        let layer = parse_layer("0.2+3.4i:50e-9").unwrap();
        assert_eq!(layer.material, MaterialSpec::Index(Complex::new(0.2, 3.4)));
        assert_eq!(layer.thickness, 50e-9);
        assert!(parse_layer("Au").is_err());
        assert!(parse_layer("Au:thick").is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let base = load_default_config().unwrap();

        let mut settings = base.clone();
        settings.wavelength = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = base.clone();
        settings.sweep.step = 0.0;
        assert!(settings.validate().is_err());

        let mut settings = base.clone();
        settings.sweep.end = settings.sweep.start - 1.0;
        assert!(settings.validate().is_err());

        let mut settings = base.clone();
        settings.layers[0].thickness = -1e-9;
        assert!(settings.validate().is_err());

        let mut settings = base.clone();
        settings.angle = f64::NAN;
        assert!(settings.validate().is_err());

        let mut settings = base;
        settings.sweep = SweepSpec {
            kind: SweepKind::Wavelength,
            start: 0.0,
            end: 1e-6,
            step: 1e-9,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn validation_rejects_unbounded_sweeps() {
        let base = load_default_config().unwrap();

        let mut settings = base.clone();
        settings.sweep.end = f64::INFINITY;
        assert!(settings.validate().is_err());

        let mut settings = base.clone();
        settings.sweep.start = f64::NEG_INFINITY;
        assert!(settings.validate().is_err());

        let mut settings = base.clone();
        settings.sweep.step = 1e-12;
        assert!(settings.validate().is_err());

        let mut settings = base;
        let args = CliArgs::try_parse_from(["spri", "--sweep", "40", "inf", "0.1"]).unwrap();
        args.apply(&mut settings);
        assert_eq!(settings.sweep.end, f64::INFINITY);
        assert!(settings.validate().is_err());
    }

    #[test]
    fn materials_resolve() {
        let registry = MaterialRegistry::builtin().unwrap();
        let water = MaterialSpec::Named("water".to_string())
            .resolve(&registry)
            .unwrap();
        assert!((water.evaluate(589e-9).unwrap().re - 1.333).abs() < 1e-2);
        let constant = MaterialSpec::Index(Complex::new(1.7, 0.1))
            .resolve(&registry)
            .unwrap();
        assert_eq!(constant.evaluate(1e-6).unwrap(), Complex::new(1.7, 0.1));
        assert!(MaterialSpec::Named("mithril".to_string())
            .resolve(&registry)
            .is_err());
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let settings = load_default_config().unwrap();
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}

/// A material reference: a registry name or a constant complex index `[re, im]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MaterialSpec {
    Named(String),
    Index(Complex<f64>),
}

impl MaterialSpec {
    pub fn resolve(&self, registry: &MaterialRegistry) -> crate::error::Result<Material> {
        match self {
            Self::Named(name) => registry.get(name),
            Self::Index(index) => Ok(Arc::new(Analytic::constant(*index))),
        }
    }
}

impl fmt::Display for MaterialSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::Index(index) => write!(f, "{:.6} + {:.6}i", index.re, index.im),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LayerSpec {
    pub material: MaterialSpec,
    /// Physical thickness in metres.
    pub thickness: f64,
}

impl LayerSpec {
    pub fn resolve(&self, registry: &MaterialRegistry) -> crate::error::Result<Layer> {
        Layer::new(self.material.resolve(registry)?, self.thickness)
    }
}

/// Which quantity the sweep grid runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Incidence angle in degrees at the fixed `wavelength`.
    Angle,
    /// Wavelength in metres at the fixed `angle`.
    Wavelength,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SweepSpec {
    pub kind: SweepKind,
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SensitivitySpec {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Use the raw reflectance change rather than the change relative to `R`.
    #[serde(default)]
    pub absolute: bool,
}

impl Default for SensitivitySpec {
    fn default() -> Self {
        Self {
            enabled: true,
            absolute: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Coupling prism below the slide; adds the exit angle in air to each sweep point.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PrismSpec {
    /// Base angle of the prism in degrees.
    pub angle: f64,
    pub slide: MaterialSpec,
}

/// Optional material tables loaded on top of the built-in ones.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MaterialFiles {
    pub sellmeier: Option<PathBuf>,
    pub schott: Option<PathBuf>,
    pub lorentz_drude: Option<PathBuf>,
}

/// Runtime configuration for the application.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    /// Working wavelength in metres, used by angle sweeps.
    pub wavelength: f64,
    pub polarization: Polarization,
    pub incidence: MaterialSpec,
    #[serde(default)]
    pub layers: Vec<LayerSpec>,
    pub exit: MaterialSpec,
    pub sweep: SweepSpec,
    /// Incidence angle in degrees, used by wavelength sweeps.
    #[serde(default = "default_angle")]
    pub angle: f64,
    #[serde(default)]
    pub sensitivity: SensitivitySpec,
    #[serde(default)]
    pub prism: Option<PrismSpec>,
    #[serde(default)]
    pub materials: MaterialFiles,
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

fn default_angle() -> f64 {
    70.0
}

fn default_directory() -> PathBuf {
    PathBuf::from("spri_output")
}

impl Settings {
    /// Built-in materials plus any extra tables named under `materials`.
    pub fn registry(&self) -> Result<MaterialRegistry> {
        let mut registry = MaterialRegistry::builtin().context("failed to load built-in materials")?;
        let tables = [
            (&self.materials.sellmeier, TableKind::Sellmeier),
            (&self.materials.schott, TableKind::Schott),
            (&self.materials.lorentz_drude, TableKind::LorentzDrude),
        ];
        for (path, kind) in tables {
            if let Some(path) = path {
                let count = registry
                    .load_table_file(path, kind)
                    .with_context(|| format!("failed to load {kind:?} table {path:?}"))?;
                info!("loaded {count} materials from {path:?}");
            }
        }
        Ok(registry)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.wavelength > 0.0 && self.wavelength.is_finite(),
            "wavelength must be positive, got {}",
            self.wavelength
        );
        ensure!(
            self.sweep.step > 0.0,
            "sweep step must be positive, got {}",
            self.sweep.step
        );
        ensure!(
            self.sweep.end >= self.sweep.start,
            "sweep end {} lies before its start {}",
            self.sweep.end,
            self.sweep.start
        );
        if self.sweep.kind == SweepKind::Wavelength {
            ensure!(
                self.sweep.start > 0.0,
                "wavelength sweep must start above zero, got {}",
                self.sweep.start
            );
        }
        grid::point_count(self.sweep.start, self.sweep.end, self.sweep.step)
            .context("invalid sweep grid")?;
        ensure!(
            self.angle.is_finite(),
            "incidence angle must be finite, got {}",
            self.angle
        );
        for (index, layer) in self.layers.iter().enumerate() {
            ensure!(
                layer.thickness >= 0.0 && layer.thickness.is_finite(),
                "layer {index} ({}) has invalid thickness {}",
                layer.material,
                layer.thickness
            );
        }
        Ok(())
    }
}

/// Loads `config/default.toml` from the project root without any overrides.
pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let settings: Settings = Config::builder()
        .add_source(File::from(default_config_file.as_path()).required(true))
        .build()
        .with_context(|| format!("error loading configuration {default_config_file:?}"))?
        .try_deserialize()
        .context("error deserializing configuration")?;

    settings.validate()?;
    Ok(settings)
}

/// Loads the configuration file, environment overrides (`SPRI_*`) and
/// command-line overrides, in that order of increasing precedence.
pub fn load_config() -> Result<Settings> {
    load_config_with(CliArgs::parse())
}

pub fn load_config_with(args: CliArgs) -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    let config_file = if local_config.exists() {
        info!("using local configuration: {local_config:?}");
        local_config
    } else {
        info!("using default configuration: {default_config_file:?}");
        default_config_file
    };

    let mut settings: Settings = Config::builder()
        .add_source(File::from(config_file.as_path()).required(true))
        .add_source(Environment::with_prefix("spri"))
        .build()
        .with_context(|| format!("error loading configuration {config_file:?}"))?
        .try_deserialize()
        .context("error deserializing configuration")?;

    args.apply(&mut settings);
    settings.validate()?;

    info!("{settings}");

    Ok(settings)
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the SPRI_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("SPRI_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    let exe_path = env::current_exe().context("failed to get current executable path")?;
    let mut current_dir: Option<&Path> = exe_path.parent();
    while let Some(dir) = current_dir {
        if dir.join("config").is_dir() {
            return Ok(dir.to_path_buf());
        }
        current_dir = dir.parent();
    }
    bail!("could not find project root directory; set SPRI_ROOT_DIR")
}

#[derive(Parser, Debug)]
#[command(version, about = "SPRi - surface plasmon resonance imaging optics")]
pub struct CliArgs {
    /// Working wavelength in metres.
    #[arg(short, long)]
    wavelength: Option<f64>,

    /// Primary polarization (S/TE or P/TM).
    #[arg(short, long)]
    polarization: Option<Polarization>,

    /// Incidence medium: a material name or a complex index such as `1.515+0i`.
    /// Values starting with a digit are read as indices.
    #[arg(long, value_parser = parse_material)]
    incidence: Option<MaterialSpec>,

    /// Exit (analyte) medium: a material name or a complex index.
    #[arg(long, value_parser = parse_material)]
    exit: Option<MaterialSpec>,

    /// Film layer as `material:thickness` (metres), incidence side first.
    /// Repeat for multilayer stacks; replaces the configured layers.
    #[arg(short, long, value_parser = parse_layer)]
    layer: Vec<LayerSpec>,

    /// Sweep the incidence angle: start end step, in degrees.
    #[arg(long, num_args = 3, value_delimiter = ' ', group = "grid")]
    sweep: Option<Vec<f64>>,

    /// Sweep the wavelength: start end step, in metres.
    #[arg(long, num_args = 3, value_delimiter = ' ', group = "grid")]
    wavelength_sweep: Option<Vec<f64>>,

    /// Fixed incidence angle in degrees for wavelength sweeps.
    #[arg(short, long)]
    angle: Option<f64>,

    /// Report the absolute reflectance change rather than the relative one.
    #[arg(long)]
    absolute: bool,

    /// Skip the sensitivity calculation.
    #[arg(long)]
    no_sensitivity: bool,

    /// Base angle of the coupling prism in degrees. The slide defaults to the
    /// incidence medium when no prism is configured.
    #[arg(long)]
    prism_angle: Option<f64>,

    /// Output directory.
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

impl CliArgs {
    /// Overrides `settings` with every argument that was given.
    pub fn apply(self, settings: &mut Settings) {
        if let Some(wavelength) = self.wavelength {
            settings.wavelength = wavelength;
        }
        if let Some(polarization) = self.polarization {
            settings.polarization = polarization;
        }
        if let Some(incidence) = self.incidence {
            settings.incidence = incidence;
        }
        if let Some(exit) = self.exit {
            settings.exit = exit;
        }
        if !self.layer.is_empty() {
            settings.layers = self.layer;
        }

        if let Some(values) = self.sweep {
            settings.sweep = sweep_spec(SweepKind::Angle, &values);
        } else if let Some(values) = self.wavelength_sweep {
            settings.sweep = sweep_spec(SweepKind::Wavelength, &values);
        }

        if let Some(angle) = self.angle {
            settings.angle = angle;
        }
        if self.absolute {
            settings.sensitivity.absolute = true;
        }
        if self.no_sensitivity {
            settings.sensitivity.enabled = false;
        }
        if let Some(angle) = self.prism_angle {
            match settings.prism.as_mut() {
                Some(prism) => prism.angle = angle,
                None => {
                    settings.prism = Some(PrismSpec {
                        angle,
                        slide: settings.incidence.clone(),
                    })
                }
            }
        }
        if let Some(directory) = self.directory {
            settings.directory = directory;
        }
    }
}

// clap guarantees exactly three values
fn sweep_spec(kind: SweepKind, values: &[f64]) -> SweepSpec {
    SweepSpec {
        kind,
        start: values[0],
        end: values[1],
        step: values[2],
    }
}

/// Parse a material argument. Text that starts with a number (after an
/// optional sign) and reads as a complex value such as `1.33` or `0.2+3.4i`
/// is a constant index; anything else, including `i` or `inf`, is a name.
fn parse_material(s: &str) -> Result<MaterialSpec, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("material must not be empty".to_string());
    }
    let numeric = s
        .trim_start_matches(['+', '-'])
        .starts_with(|c: char| c.is_ascii_digit() || c == '.');
    if numeric {
        if let Ok(index) = s.parse::<Complex<f64>>() {
            return Ok(MaterialSpec::Index(index));
        }
    }
    Ok(MaterialSpec::Named(s.to_string()))
}

/// Parse a layer in the format "material:thickness"
fn parse_layer(s: &str) -> Result<LayerSpec, String> {
    let (material, thickness) = s
        .rsplit_once(':')
        .ok_or_else(|| format!("invalid layer '{s}', expected 'material:thickness'"))?;
    let thickness = thickness
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("invalid layer thickness '{thickness}'"))?;
    Ok(LayerSpec {
        material: parse_material(material)?,
        thickness,
    })
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let layers = self
            .layers
            .iter()
            .map(|layer| format!("{} ({:e} m)", layer.material, layer.thickness))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "Settings:
  - Wavelength: {:e}
  - Polarization: {}
  - Incidence: {}
  - Layers: [{}]
  - Exit: {}
  - Sweep: {:?} from {} to {} step {}
  - Sensitivity: {} (absolute: {})
  - Directory: {:?}
  ",
            self.wavelength,
            self.polarization,
            self.incidence,
            layers,
            self.exit,
            self.sweep.kind,
            self.sweep.start,
            self.sweep.end,
            self.sweep.step,
            self.sensitivity.enabled,
            self.sensitivity.absolute,
            self.directory,
        )
    }
}
