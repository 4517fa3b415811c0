use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use spri::{prism::{PrismGeometry, Side}, registry::MaterialRegistry, tmm, tmm::Layer, OpticsError, Polarization};

fn to_py(err: OpticsError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn registry() -> PyResult<MaterialRegistry> {
    MaterialRegistry::builtin().map_err(to_py)
}

fn stack(registry: &MaterialRegistry, layers: Vec<(String, f64)>) -> PyResult<Vec<Layer>> {
    layers
        .into_iter()
        .map(|(name, thickness)| {
            let material = registry.get(&name)?;
            Layer::new(material, thickness)
        })
        .collect::<spri::Result<Vec<_>>>()
        .map_err(to_py)
}

/// Complex refractive index `(n, k)` of a built-in material at `wavelength` (m).
#[pyfunction]
fn refractive_index(material: &str, wavelength: f64) -> PyResult<(f64, f64)> {
    let index = registry()?
        .get(material)
        .and_then(|model| model.evaluate(wavelength))
        .map_err(to_py)?;
    Ok((index.re, index.im))
}

/// Refraction angle, reflectance and transmittance of a thin-film stack.
/// `layers` is a list of `(material, thickness)` pairs, incidence side first.
#[pyfunction]
#[pyo3(signature = (wavelength, incidence, layers, exit, theta, polarization = "P"))]
fn reflectance(
    wavelength: f64,
    incidence: &str,
    layers: Vec<(String, f64)>,
    exit: &str,
    theta: f64,
    polarization: &str,
) -> PyResult<(f64, f64, f64)> {
    let registry = registry()?;
    let layers = stack(&registry, layers)?;
    let polarization: Polarization = polarization.parse().map_err(to_py)?;
    let material_in = registry.get(incidence).map_err(to_py)?;
    let material_out = registry.get(exit).map_err(to_py)?;
    let result = tmm::compute(
        wavelength,
        material_in.as_ref(),
        &layers,
        material_out.as_ref(),
        theta,
        polarization,
    )
    .map_err(to_py)?;
    Ok((result.theta_out, result.reflectance, result.transmittance))
}

/// Sensitivity `dR/dn` of the p reflectance to the exit medium index.
#[pyfunction]
#[pyo3(signature = (wavelength, incidence, layers, exit, theta, absolute = false))]
fn sensitivity(
    wavelength: f64,
    incidence: &str,
    layers: Vec<(String, f64)>,
    exit: &str,
    theta: f64,
    absolute: bool,
) -> PyResult<f64> {
    let registry = registry()?;
    let layers = stack(&registry, layers)?;
    let material_in = registry.get(incidence).map_err(to_py)?;
    let material_out = registry.get(exit).map_err(to_py)?;
    spri::sensitivity::sensitivity(
        material_in.as_ref(),
        &layers,
        &material_out,
        wavelength,
        theta,
        absolute,
    )
    .map_err(to_py)
}

/// Exit angle in air (deg) of a ray leaving the slide at `spri_angle` (deg).
#[pyfunction]
fn prism_exit_angle(spri_angle: f64, prism_angle: f64, n_slide: f64, n_prism: f64) -> PyResult<f64> {
    let prism = PrismGeometry::new(prism_angle, n_slide, n_prism).map_err(to_py)?;
    Ok(prism.exit_angle(spri_angle))
}

/// SPRi angle (deg) that leaves the prism at `out_angle` (deg). Without a
/// `side` ("right" or "left"), exit directions both legs can produce give NaN.
#[pyfunction]
#[pyo3(signature = (out_angle, prism_angle, n_slide, n_prism, side = None))]
fn prism_spri_angle(
    out_angle: f64,
    prism_angle: f64,
    n_slide: f64,
    n_prism: f64,
    side: Option<&str>,
) -> PyResult<f64> {
    let prism = PrismGeometry::new(prism_angle, n_slide, n_prism).map_err(to_py)?;
    match side {
        Some(side) => {
            let side: Side = side.parse().map_err(to_py)?;
            Ok(prism.spri_angle_on(out_angle, side))
        }
        None => Ok(prism.spri_angle(out_angle)),
    }
}

/// Names of the built-in materials.
#[pyfunction]
fn materials() -> PyResult<Vec<String>> {
    Ok(registry()?.names())
}

/// A Python module implemented in Rust.
#[pymodule]
fn _spri_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(refractive_index, m)?)?;
    m.add_function(wrap_pyfunction!(reflectance, m)?)?;
    m.add_function(wrap_pyfunction!(sensitivity, m)?)?;
    m.add_function(wrap_pyfunction!(prism_exit_angle, m)?)?;
    m.add_function(wrap_pyfunction!(prism_spri_angle, m)?)?;
    m.add_function(wrap_pyfunction!(materials, m)?)?;
    Ok(())
}
