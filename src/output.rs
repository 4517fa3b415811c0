use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use crate::fresnel::Polarization;
use crate::settings::{Settings, SweepKind};
use crate::sweep::{Sweep, SweepPoint};
use crate::tmm::RtResult;

#[cfg(test)]
mod tests {
    use super::*;

    fn point(theta_in: f64, reflectance: f64) -> SweepPoint {
        let rt = RtResult {
            theta_out: 60.0,
            reflectance,
            transmittance: 1.0 - reflectance,
        };
        SweepPoint {
            wavelength: 660e-9,
            theta_in,
            s: rt,
            p: rt,
            sensitivity: Some(-12.5),
            prism_out_angle: None,
        }
    }

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("spri_output_{name}_{}", std::process::id()))
    }

    #[test]
    fn sweep_table_preserves_order() {
        let directory = scratch("table");
        let points = [point(40.0, 0.9), point(40.1, 0.5), point(40.2, 0.7)];
        write_sweep(&points, SweepKind::Angle, &directory).unwrap();

        let text = fs::read_to_string(directory.join(SWEEP_FILE)).unwrap();
        fs::remove_dir_all(&directory).unwrap();

        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("# theta_in"));
        let angles: Vec<f64> = lines[1..]
            .iter()
            .map(|line| line.split_whitespace().next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(angles, vec![40.0, 40.1, 40.2]);
        // missing values are written as NaN so every row has the same columns
        let columns = lines[1].split_whitespace().count();
        assert!(lines[1..].iter().all(|l| l.split_whitespace().count() == columns));
        assert!(lines[1].ends_with("NaN"));
    }

    #[test]
    fn wavelength_column_first_for_wavelength_sweeps() {
        let directory = scratch("wavelength");
        write_sweep(&[point(70.0, 0.2)], SweepKind::Wavelength, &directory).unwrap();
        let text = fs::read_to_string(directory.join(SWEEP_FILE)).unwrap();
        fs::remove_dir_all(&directory).unwrap();
        assert!(text.starts_with("# wavelength"));
        let first: f64 = text.lines().nth(1).unwrap().split_whitespace().next().unwrap().parse().unwrap();
        assert_eq!(first, 660e-9);
    }

    #[test]
    fn summary_and_settings_are_written() {
        let directory = scratch("summary");
        let settings = crate::settings::load_default_config().unwrap();
        let summary = Summary {
            generated: "2024-01-01T00:00:00+00:00".to_string(),
            points: 3,
            polarization: Polarization::P,
            p_minimum: Some(PMinimum {
                position: 72.3,
                reflectance: 0.003,
            }),
            settings: settings.clone(),
        };
        write_summary(&summary, &directory).unwrap();
        write_settings(&settings, &directory).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(directory.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(json["points"], 3);
        assert_eq!(json["p_minimum"]["position"], 72.3);
        assert_eq!(json["settings"]["incidence"], "BK7");

        let text = fs::read_to_string(directory.join(SETTINGS_FILE)).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
        fs::remove_dir_all(&directory).unwrap();
    }
}

pub const SWEEP_FILE: &str = "sweep.dat";
pub const SUMMARY_FILE: &str = "summary.json";
pub const SETTINGS_FILE: &str = "settings.toml";

/// Location of the lowest sampled p reflectance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PMinimum {
    /// Grid value: an angle in degrees or a wavelength in metres.
    pub position: f64,
    pub reflectance: f64,
}

/// Run metadata written next to the sweep table.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub generated: String,
    pub points: usize,
    pub polarization: Polarization,
    pub p_minimum: Option<PMinimum>,
    pub settings: Settings,
}

impl Summary {
    pub fn new(sweep: &Sweep) -> Self {
        Self {
            generated: Local::now().to_rfc3339(),
            points: sweep.points.len(),
            polarization: sweep.settings.polarization,
            p_minimum: sweep.p_minimum().map(|(position, reflectance)| PMinimum {
                position,
                reflectance,
            }),
            settings: sweep.settings.clone(),
        }
    }
}

fn create(directory: &Path, name: &str) -> Result<BufWriter<File>> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create output directory {directory:?}"))?;
    let path = directory.join(name);
    let file = File::create(&path).with_context(|| format!("failed to create {path:?}"))?;
    Ok(BufWriter::new(file))
}

fn write_rt(writer: &mut impl Write, rt: &RtResult) -> std::io::Result<()> {
    write!(
        writer,
        " {} {} {}",
        rt.theta_out, rt.reflectance, rt.transmittance
    )
}

/// Write the sweep points as whitespace-separated columns, one row per grid
/// point in grid order. The swept quantity comes first; absent optional
/// values are written as NaN.
pub fn write_sweep(points: &[SweepPoint], kind: SweepKind, directory: &Path) -> Result<()> {
    let mut writer = create(directory, SWEEP_FILE)?;

    let leading = match kind {
        SweepKind::Angle => "theta_in wavelength",
        SweepKind::Wavelength => "wavelength theta_in",
    };
    writeln!(
        writer,
        "# {leading} theta_out_s R_s T_s theta_out_p R_p T_p sensitivity prism_out_angle"
    )?;

    for point in points {
        match kind {
            SweepKind::Angle => write!(writer, "{} {}", point.theta_in, point.wavelength)?,
            SweepKind::Wavelength => write!(writer, "{} {}", point.wavelength, point.theta_in)?,
        }
        write_rt(&mut writer, &point.s)?;
        write_rt(&mut writer, &point.p)?;
        writeln!(
            writer,
            " {} {}",
            point.sensitivity.unwrap_or(f64::NAN),
            point.prism_out_angle.unwrap_or(f64::NAN)
        )?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the run summary as pretty-printed JSON.
pub fn write_summary(summary: &Summary, directory: &Path) -> Result<()> {
    let mut writer = create(directory, SUMMARY_FILE)?;
    serde_json::to_writer_pretty(&mut writer, summary).context("failed to serialize summary")?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the settings used for the run, in the same format they are read from.
pub fn write_settings(settings: &Settings, directory: &Path) -> Result<()> {
    let text = toml::to_string_pretty(settings).context("failed to serialize settings")?;
    let mut writer = create(directory, SETTINGS_FILE)?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}
