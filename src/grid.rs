use ndarray::Array1;

use crate::config::MAX_GRID_POINTS;
use crate::error::{OpticsError, Result};

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn inclusive_grid() {
        let grid = steps(40.0, 85.0, 0.1).unwrap();
        assert_eq!(grid.len(), 451);
        assert_eq!(grid[0], 40.0);
        assert!((grid[450] - 85.0).abs() < 1e-12);
        assert!((grid[1] - 40.1).abs() < 1e-12);
    }

    #[test]
    fn uneven_step_stops_before_end() {
        let grid = steps(0.0, 1.0, 0.3).unwrap();
        assert_eq!(grid.len(), 4);
        assert!((grid[3] - 0.9).abs() < 1e-12);
    }

    #[test]
    fn single_point() {
        let grid = steps(600e-9, 600e-9, 1e-9).unwrap();
        assert_eq!(grid.len(), 1);
        assert_eq!(grid[0], 600e-9);
    }

    #[test]
    fn unbounded_grids_are_rejected() {
        assert!(steps(40.0, f64::INFINITY, 0.1).is_err());
        assert!(steps(f64::NEG_INFINITY, 85.0, 0.1).is_err());
        assert!(steps(40.0, f64::NAN, 0.1).is_err());
        assert!(steps(40.0, 85.0, 1e-300).is_err());
        assert!(steps(-1e308, 1e308, 1.0).is_err());
        assert!(steps(40.0, 85.0, 0.0).is_err());
        assert!(steps(85.0, 40.0, 0.1).is_err());
        assert!(matches!(
            point_count(0.0, MAX_GRID_POINTS as f64, 1.0),
            Err(OpticsError::InvalidArgument(_))
        ));
        assert_eq!(point_count(0.0, (MAX_GRID_POINTS - 1) as f64, 1.0).unwrap(), MAX_GRID_POINTS);
    }
}

/// Number of points [`steps`] lays out between `start` and `end`.
///
/// Fails unless all three values are finite, `step > 0`, `end >= start` and
/// the grid holds at most [`MAX_GRID_POINTS`] points.
pub fn point_count(start: f64, end: f64, step: f64) -> Result<usize> {
    if !(start.is_finite() && end.is_finite() && step.is_finite()) {
        return Err(OpticsError::invalid(format!(
            "grid bounds and step must be finite, got {start} to {end} step {step}"
        )));
    }
    if step <= 0.0 || end < start {
        return Err(OpticsError::invalid(format!(
            "grid needs a positive step and end >= start, got {start} to {end} step {step}"
        )));
    }
    // tolerate rounding in (end - start) / step for grids that land on `end`
    let intervals = ((end - start) / step + 1e-9).floor();
    if !(intervals < MAX_GRID_POINTS as f64) {
        return Err(OpticsError::invalid(format!(
            "grid from {start} to {end} step {step} exceeds {MAX_GRID_POINTS} points"
        )));
    }
    Ok(intervals as usize + 1)
}

/// Evenly spaced values from `start` towards `end` (inclusive when `end` lies
/// on the grid) separated by `step`.
pub fn steps(start: f64, end: f64, step: f64) -> Result<Array1<f64>> {
    let count = point_count(start, end, step)?;
    let last = start + (count - 1) as f64 * step;
    Ok(Array1::linspace(start, last, count))
}
