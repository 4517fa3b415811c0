//! Named material lookup.
//!
//! A [`MaterialRegistry`] maps case-insensitive names to shared dispersion
//! models. It is an ordinary value built by the caller and handed to whatever
//! needs to resolve material names; there is no global table.
//!
//! Tables are plain comma-separated rows, one material per row, with the
//! material name in the first column. Blank lines and lines starting with `#`
//! are ignored:
//!
//! - Sellmeier: `name, K1, L1, K2, L2, ...` (L in µm²)
//! - Schott: `name, A0, A1, A2, A3, A4, A5` (trailing coefficients optional)
//! - Lorentz-Drude: `name, ωp, f0, Γ0, f1, Γ1, ω1, ...` (energies in eV, ε∞ = 1)

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::dispersion::{Analytic, LorentzDrude, Material, Oscillator, Schott, Sellmeier};
use crate::error::{OpticsError, Result};

const BUILTIN_SELLMEIER: &str = include_str!("../data/sellmeier.csv");
const BUILTIN_SCHOTT: &str = include_str!("../data/schott.csv");
const BUILTIN_LORENTZ_DRUDE: &str = include_str!("../data/lorentz_drude.csv");

#[cfg(test)]
mod tests {

    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn builtin_materials() {
        let registry = MaterialRegistry::builtin().unwrap();
        for name in ["BK7", "bk7", "SF10", "h2o", "Water", "N-BK7", "au", "Ag", "air"] {
            assert!(registry.lookup(name).is_some(), "missing {name}");
        }
        let bk7 = registry.get("BK7").unwrap().evaluate(587.56e-9).unwrap();
        let nbk7 = registry.get("n-bk7").unwrap().evaluate(587.56e-9).unwrap();
        assert_abs_diff_eq!(bk7.re, 1.5168, epsilon = 1e-4);
        assert_abs_diff_eq!(nbk7.re, bk7.re, epsilon = 1e-4);
        let water = registry.get("water").unwrap().evaluate(587.56e-9).unwrap();
        assert_abs_diff_eq!(water.re, 1.3334, epsilon = 1e-3);
        assert_eq!(
            registry.get("vacuum").unwrap().evaluate(1e-6).unwrap(),
            Complex64::new(1.0, 0.0)
        );
    }

    #[test]
    fn builtin_gold_matches_reference() {
        let registry = MaterialRegistry::builtin().unwrap();
        let gold = registry.get("Au").unwrap();
        let n = gold.evaluate(600e-9).unwrap();
        assert_abs_diff_eq!(n.re, 0.36216, epsilon = 1e-3);
        assert_abs_diff_eq!(n.im, 2.8493, epsilon = 1e-3);
        let silver = registry.get("ag").unwrap().evaluate(600e-9).unwrap();
        assert!(silver.im > 3.0 && silver.re < 0.5, "silver {silver}");
    }

    #[test]
    fn unknown_material() {
        let registry = MaterialRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup("unobtainium").is_none());
        assert!(matches!(
            registry.get("unobtainium"),
            Err(OpticsError::MaterialNotFound(name)) if name == "unobtainium"
        ));
    }

    #[test]
    fn later_rows_replace_earlier() {
        let mut registry = MaterialRegistry::new();
        let count = registry
            .load_schott_table("# header\n\nglass, 2.25\n GLASS , 4.0\n")
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(registry.len(), 1);
        let n = registry.get("Glass").unwrap().evaluate(500e-9).unwrap();
        assert_abs_diff_eq!(n.re, 2.0, epsilon = 1e-12);
        assert_eq!(registry.names(), vec!["glass".to_string()]);
    }

    #[test]
    fn parse_errors_report_lines() {
        let mut registry = MaterialRegistry::new();
        let err = registry
            .load_sellmeier_table("# K/L pairs\nok, 1.0, 0.01\nbad, 1.0\n")
            .unwrap_err();
        assert!(matches!(err, OpticsError::Parse { line: 3, .. }), "{err}");

        let err = registry
            .load_schott_table("x, 1.0, two\n")
            .unwrap_err();
        assert!(matches!(err, OpticsError::Parse { line: 1, .. }), "{err}");

        let err = registry.load_sellmeier_table(", 1.0, 0.01\n").unwrap_err();
        assert!(matches!(err, OpticsError::Parse { line: 1, .. }));

        let err = registry
            .load_lorentz_drude_table("metal, 9.0, 1.0, 0.1, 0.5, 0.2\n")
            .unwrap_err();
        assert!(matches!(err, OpticsError::Parse { line: 1, .. }));

        let err = registry.load_schott_table("x, 1, 2, 3, 4, 5, 6, 7\n").unwrap_err();
        assert!(matches!(err, OpticsError::Parse { line: 1, .. }));
    }

    #[test]
    fn drude_only_row() {
        let mut registry = MaterialRegistry::new();
        registry
            .load_lorentz_drude_table("free, 9.0, 1.0, 0.1\n")
            .unwrap();
        let n = registry.get("FREE").unwrap().evaluate(1e-14).unwrap();
        assert_abs_diff_eq!(n.re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn loads_table_file() {
        let path = std::env::temp_dir().join(format!("spri_registry_{}.csv", std::process::id()));
        std::fs::write(&path, "custom, 1.0, 0.01\n").unwrap();
        let mut registry = MaterialRegistry::new();
        let count = registry.load_table_file(&path, TableKind::Sellmeier).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(count, 1);
        assert!(registry.contains("Custom"));
        assert!(registry
            .load_table_file(&path, TableKind::Sellmeier)
            .is_err());
    }
}

/// Layout of a material table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Sellmeier,
    Schott,
    LorentzDrude,
}

/// Case-insensitive map from material names to dispersion models.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: HashMap<String, Material>,
}

fn key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Non-comment rows of a table as `(line number, name, values)`.
fn rows(text: &str) -> impl Iterator<Item = Result<(usize, String, Vec<f64>)>> + '_ {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line, text)| {
            let mut fields = text.split(',').map(str::trim);
            let name = fields.next().unwrap_or_default();
            if name.is_empty() {
                return Err(OpticsError::Parse {
                    line,
                    message: "missing material name".to_string(),
                });
            }
            let values = fields
                .map(|field| {
                    field.parse::<f64>().map_err(|_| OpticsError::Parse {
                        line,
                        message: format!("invalid number '{field}'"),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((line, name.to_string(), values))
        })
}

fn sellmeier_row(values: &[f64]) -> Result<Material> {
    if values.len() % 2 != 0 {
        return Err(OpticsError::invalid(format!(
            "Sellmeier rows need K/L pairs, got {} values",
            values.len()
        )));
    }
    let terms: Vec<(f64, f64)> = values.iter().copied().tuples().collect();
    Ok(Arc::new(Sellmeier::new(terms)?))
}

fn schott_row(values: &[f64]) -> Result<Material> {
    Ok(Arc::new(Schott::new(values)?))
}

fn lorentz_drude_row(values: &[f64]) -> Result<Material> {
    if values.len() < 3 || (values.len() - 3) % 3 != 0 {
        return Err(OpticsError::invalid(format!(
            "Lorentz-Drude rows need wp, f0, G0 and (f, G, w) triples, got {} values",
            values.len()
        )));
    }
    let oscillators: Vec<_> = values[3..]
        .iter()
        .copied()
        .tuples::<(f64, f64, f64)>()
        .map(|(strength, damping, resonance)| Oscillator::new(strength, resonance, damping))
        .collect();
    let model = LorentzDrude::from_ev(1.0, values[0], values[1], values[2], &oscillators)?;
    Ok(Arc::new(model))
}

impl MaterialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The materials shipped with the crate: common SPRi glasses, water,
    /// gold and silver, plus `air`/`vacuum`.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::new();
        let unity: Material = Arc::new(Analytic::constant(Complex64::new(1.0, 0.0)));
        registry.insert("air", Arc::clone(&unity));
        registry.insert("vacuum", unity);
        registry.load_table(BUILTIN_SELLMEIER, TableKind::Sellmeier)?;
        registry.load_table(BUILTIN_SCHOTT, TableKind::Schott)?;
        registry.load_table(BUILTIN_LORENTZ_DRUDE, TableKind::LorentzDrude)?;
        Ok(registry)
    }

    /// Adds or replaces a material.
    pub fn insert(&mut self, name: &str, model: Material) {
        self.materials.insert(key(name), model);
    }

    pub fn lookup(&self, name: &str) -> Option<Material> {
        self.materials.get(&key(name)).cloned()
    }

    /// Like [`MaterialRegistry::lookup`], but unknown names are an error.
    pub fn get(&self, name: &str) -> Result<Material> {
        self.lookup(name)
            .ok_or_else(|| OpticsError::MaterialNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.materials.contains_key(&key(name))
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    /// Registered names (lower case), sorted.
    pub fn names(&self) -> Vec<String> {
        self.materials.keys().cloned().sorted().collect()
    }

    /// Parses every row of `text` and registers it. Returns the number of rows read.
    pub fn load_table(&mut self, text: &str, kind: TableKind) -> Result<usize> {
        let mut count = 0;
        for row in rows(text) {
            let (line, name, values) = row?;
            let model = match kind {
                TableKind::Sellmeier => sellmeier_row(&values),
                TableKind::Schott => schott_row(&values),
                TableKind::LorentzDrude => lorentz_drude_row(&values),
            }
            .map_err(|err| OpticsError::Parse {
                line,
                message: format!("{name}: {err}"),
            })?;
            self.insert(&name, model);
            count += 1;
        }
        debug!("loaded {count} {kind:?} materials");
        Ok(count)
    }

    pub fn load_sellmeier_table(&mut self, text: &str) -> Result<usize> {
        self.load_table(text, TableKind::Sellmeier)
    }

    pub fn load_schott_table(&mut self, text: &str) -> Result<usize> {
        self.load_table(text, TableKind::Schott)
    }

    pub fn load_lorentz_drude_table(&mut self, text: &str) -> Result<usize> {
        self.load_table(text, TableKind::LorentzDrude)
    }

    pub fn load_table_file(&mut self, path: impl AsRef<Path>, kind: TableKind) -> Result<usize> {
        let text = fs::read_to_string(path)?;
        self.load_table(&text, kind)
    }
}
