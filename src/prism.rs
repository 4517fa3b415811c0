//! Ray geometry through the coupling prism of an SPRi instrument.
//!
//! The instrument is modelled in a 2-D cross-section: an isosceles prism with
//! base angle `prism_angle` sits on a glass slide. A ray leaves the centre of
//! the slide at the SPRi working angle, refracts into the prism through its
//! base, crosses to one of the legs and refracts out into air. The direction
//! of the outgoing ray is what a camera or detector outside the prism sees.
//!
//! All directions are unit vectors `(x, y)` with `y` along the prism's
//! vertical bisector and `x` positive to the right; angles are measured from
//! the vertical as `atan2(x, y)`. This keeps both legs symmetric and handles
//! base angles above 90° (a trapezoidal, practically infinite-leg prism)
//! without quadrant special cases.
//!
//! Unreachable configurations (total internal reflection at either face)
//! yield NaN rather than an error.
//!
//! The reverse problem is not one-to-one: for small SPRi angles a ray that
//! crosses to one leg and a ray that crosses to the other can leave the prism
//! in the same direction. [`PrismGeometry::spri_angle_on`] solves for a given
//! leg; [`PrismGeometry::spri_angle`] only answers when a single leg fits.

use std::str::FromStr;

use nalgebra::Vector2;
use serde::Serialize;

use crate::config::{AMBIENT_REFR_INDEX, LEG_SIDE_TOLERANCE, PRISM_ANGLE_TOLERANCE};
use crate::dispersion::DispersionModel;
use crate::error::{OpticsError, Result};
use crate::snell::refract_sine;


/// Both angles of a prism traversal, in degrees from the vertical.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PrismSolution {
    /// Incidence angle at the slide/prism interface.
    pub spri_angle: f64,
    /// Direction of the ray after leaving the prism into air.
    pub prism_out_angle: f64,
}

/// Cross-section of a coupling prism on a slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrismGeometry {
    /// Base angle of the prism (degrees).
    pub prism_angle: f64,
    pub n_slide: f64,
    pub n_prism: f64,
}

/// Which leg of the prism a ray crosses to, seen from above the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    /// The leg on the positive `x` side.
    Right,
    Left,
}

impl Side {
    /// Leg reached by a ray leaving the slide at `spri_angle` degrees.
    pub fn of_spri_angle(spri_angle: f64) -> Self {
        if spri_angle >= 0.0 {
            Self::Right
        } else {
            Self::Left
        }
    }

    fn of_direction(direction: &Vector2<f64>) -> Self {
        if direction.x >= 0.0 {
            Self::Right
        } else {
            Self::Left
        }
    }
}

impl FromStr for Side {
    type Err = OpticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "right" | "r" => Ok(Self::Right),
            "left" | "l" => Ok(Self::Left),
            other => Err(OpticsError::invalid(format!(
                "unknown prism side '{other}', expected right or left"
            ))),
        }
    }
}

/// Outward normal and tangent (pointing from the base towards the apex) of a leg.
struct Leg {
    side: Side,
    normal: Vector2<f64>,
    tangent: Vector2<f64>,
}

impl Leg {
    fn new(prism_angle: f64, side: Side) -> Self {
        let (sin, cos) = prism_angle.to_radians().sin_cos();
        // inward leg direction rotated by -90 degrees gives the outward normal
        match side {
            Side::Right => Self {
                side,
                normal: Vector2::new(sin, cos),
                tangent: Vector2::new(-cos, sin),
            },
            Side::Left => Self {
                side,
                normal: Vector2::new(-sin, cos),
                tangent: Vector2::new(cos, sin),
            },
        }
    }

    /// Whether a ray inside the prism travelling along `direction` reaches this leg.
    fn receives(&self, direction: &Vector2<f64>) -> bool {
        let lateral = match self.side {
            Side::Right => direction.x,
            Side::Left => -direction.x,
        };
        direction.y >= 0.0 && lateral >= -LEG_SIDE_TOLERANCE
    }

    /// Unit direction making angle `asin(sin_angle)` with the normal, on the
    /// side of the tangent given by `sign`.
    fn compose(&self, sin_angle: f64, sign: f64) -> Vector2<f64> {
        let cos_angle = (1.0 - sin_angle * sin_angle).sqrt();
        self.normal * cos_angle + self.tangent * (sign * sin_angle)
    }
}

fn angle_from_vertical(direction: &Vector2<f64>) -> f64 {
    direction.x.atan2(direction.y).to_degrees()
}

fn direction_from_vertical(angle: f64) -> Vector2<f64> {
    let (sin, cos) = angle.to_radians().sin_cos();
    Vector2::new(sin, cos)
}

impl PrismGeometry {
    pub fn new(prism_angle: f64, n_slide: f64, n_prism: f64) -> Result<Self> {
        if !prism_angle.is_finite() {
            return Err(OpticsError::invalid(format!(
                "prism angle must be finite, got {prism_angle}"
            )));
        }
        for (name, n) in [("slide", n_slide), ("prism", n_prism)] {
            if !(n > 0.0 && n.is_finite()) {
                return Err(OpticsError::invalid(format!(
                    "{name} index must be positive and finite, got {n}"
                )));
            }
        }
        Ok(Self {
            prism_angle,
            n_slide,
            n_prism,
        })
    }

    /// Builds the geometry from the real parts of two materials at `wavelength` (m).
    pub fn from_materials(
        prism_angle: f64,
        slide: &dyn DispersionModel,
        prism: &dyn DispersionModel,
        wavelength: f64,
    ) -> Result<Self> {
        Self::new(
            prism_angle,
            slide.evaluate(wavelength)?.re,
            prism.evaluate(wavelength)?.re,
        )
    }

    /// Solves for whichever of the two angles is NaN.
    pub fn solve(&self, spri_angle: f64, prism_out_angle: f64) -> Result<PrismSolution> {
        match (spri_angle.is_nan(), prism_out_angle.is_nan()) {
            (false, true) => Ok(PrismSolution {
                spri_angle,
                prism_out_angle: self.exit_angle(spri_angle),
            }),
            (true, false) => Ok(PrismSolution {
                spri_angle: self.spri_angle(prism_out_angle),
                prism_out_angle,
            }),
            (false, false) => Err(OpticsError::invalid(
                "both the SPRi angle and the prism exit angle are known",
            )),
            (true, true) => Err(OpticsError::invalid(
                "one of the SPRi angle and the prism exit angle must be known",
            )),
        }
    }

    /// Exit angle in air (degrees) for a ray leaving the slide at `spri_angle` degrees.
    pub fn exit_angle(&self, spri_angle: f64) -> f64 {
        let sin_prism = refract_sine(spri_angle.to_radians().sin(), self.n_slide, self.n_prism);
        if sin_prism.is_nan() {
            return f64::NAN;
        }
        let inside = Vector2::new(sin_prism, (1.0 - sin_prism * sin_prism).sqrt());

        let leg = Leg::new(self.prism_angle, Side::of_direction(&inside));
        let tangential = inside.dot(&leg.tangent);
        let sin_air = refract_sine(tangential.abs(), self.n_prism, AMBIENT_REFR_INDEX);
        if sin_air.is_nan() {
            return f64::NAN;
        }

        let outside = leg.compose(sin_air, tangential.signum());
        angle_from_vertical(&outside)
    }

    /// SPRi angle (degrees) that produces an exit ray at `prism_out_angle` degrees.
    ///
    /// NaN when no ray inside the prism leaves in that direction, and also when
    /// rays crossing to either leg do (see [`PrismGeometry::spri_angle_on`]).
    pub fn spri_angle(&self, prism_out_angle: f64) -> f64 {
        let right = self.spri_angle_on(prism_out_angle, Side::Right);
        let left = self.spri_angle_on(prism_out_angle, Side::Left);
        match (right.is_nan(), left.is_nan()) {
            (false, true) => right,
            (true, false) => left,
            // both legs only agree on a ray along the bisector
            (false, false) if (right - left).abs() <= PRISM_ANGLE_TOLERANCE => right,
            _ => f64::NAN,
        }
    }

    /// SPRi angle (degrees) of the ray that crosses to the `side` leg and exits
    /// at `prism_out_angle` degrees, or NaN if that leg cannot produce it.
    pub fn spri_angle_on(&self, prism_out_angle: f64, side: Side) -> f64 {
        let outside = direction_from_vertical(prism_out_angle);
        let leg = Leg::new(self.prism_angle, side);
        if outside.dot(&leg.normal) <= 0.0 {
            return f64::NAN;
        }

        let tangential = outside.dot(&leg.tangent);
        let sin_inside = refract_sine(tangential.abs(), AMBIENT_REFR_INDEX, self.n_prism);
        if sin_inside.is_nan() {
            return f64::NAN;
        }

        let inside = leg.compose(sin_inside, tangential.signum());
        if !leg.receives(&inside) {
            return f64::NAN;
        }
        let sin_spri = refract_sine(inside.x, self.n_prism, self.n_slide);
        if sin_spri.is_nan() {
            return f64::NAN;
        }
        sin_spri.asin().to_degrees()
    }
}
