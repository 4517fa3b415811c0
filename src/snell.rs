//! Snell's law for real and complex refractive indices.
//!
//! The transfer-matrix solver works with the lateral wavevector invariant
//! `α = n₁ sin θ₁`, so the complex form here is a plain principal-branch
//! arcsine. The prism geometry only deals with transparent glass and air and
//! uses the real form, which reports total internal reflection as NaN.

use num_complex::Complex64;


/// Complex transmitted angle (rad) for incidence angle `theta_i` (rad) from
/// medium `m1` into `m2`. The real part is the geometric refraction angle;
/// a non-zero imaginary part marks an evanescent transmitted field.
pub fn transmitted_angle(m1: Complex64, m2: Complex64, theta_i: f64) -> Complex64 {
    (m1 * theta_i.sin() / m2).asin()
}

/// Sine of the refraction angle for real indices, or NaN when the ray is
/// totally internally reflected.
pub fn refract_sine(sin_theta_i: f64, n1: f64, n2: f64) -> f64 {
    let sin_theta_t = n1 * sin_theta_i / n2;
    if sin_theta_t.abs() > 1.0 {
        f64::NAN
    } else {
        sin_theta_t
    }
}
