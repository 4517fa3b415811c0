//! Optics of surface plasmon resonance imaging (SPRi) sensors.
//!
//! - [`dispersion`]: complex refractive index models of real materials
//! - [`registry`]: named materials and the tables they are loaded from
//! - [`tmm`]: reflectance and transmittance of planar thin-film stacks
//! - [`sensitivity`]: response of the reflectance to the analyte index
//! - [`prism`]: ray geometry through the coupling prism
//! - [`sweep`]: parallel angle and wavelength scans, written out by [`output`]

pub mod config;
pub mod dispersion;
pub mod error;
pub mod fresnel;
pub mod grid;
pub mod output;
pub mod prism;
pub mod registry;
pub mod sensitivity;
pub mod settings;
pub mod snell;
pub mod sweep;
pub mod tmm;

pub use dispersion::{DispersionModel, Material};
pub use error::{OpticsError, Result};
pub use fresnel::Polarization;
pub use registry::MaterialRegistry;
