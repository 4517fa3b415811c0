//! Physical constants and numerical tolerances shared by the solvers.

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
/// Elementary charge (C).
pub const ELECTRON_CHARGE: f64 = 1.602_176_634e-19;
/// Reduced Planck constant (J s).
pub const REDUCED_PLANCK: f64 = 1.054_571_817e-34;
/// Conversion from photon energy in eV to angular frequency in rad/s.
pub const EV_TO_RAD_PER_S: f64 = ELECTRON_CHARGE / REDUCED_PLANCK;
/// Refractive index of the medium surrounding the prism.
pub const AMBIENT_REFR_INDEX: f64 = 1.0;

/// Below this magnitude the transfer-matrix denominator is treated as zero.
pub const DETERMINANT_TOLERANCE: f64 = 1e-15;
/// Below this magnitude a layer admittance is treated as zero.
pub const ADMITTANCE_TOLERANCE: f64 = 1e-15;
/// Minimum real admittance of the incidence medium for transmitted power to be defined.
pub const INCIDENT_ADMITTANCE_TOLERANCE: f64 = 1e-15;
/// Real increment added to the outer medium index for sensitivity estimates.
pub const SENSITIVITY_PERTURBATION: f64 = 1e-6;
/// Minimum baseline reflectance for relative sensitivity.
pub const MIN_BASELINE_REFLECTANCE: f64 = 1e-15;
/// Minimum index change for a sensitivity quotient.
pub const MIN_INDEX_PERTURBATION: f64 = 1e-20;
/// Largest number of points a sweep grid may hold.
pub const MAX_GRID_POINTS: usize = 10_000_000;
/// Slack (as a direction component) when deciding which prism leg a ray inside the prism meets.
pub const LEG_SIDE_TOLERANCE: f64 = 1e-12;
/// Two reverse prism solutions closer than this (degrees) are the same ray.
pub const PRISM_ANGLE_TOLERANCE: f64 = 1e-9;
