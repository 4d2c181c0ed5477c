use chemotaxis_core::{SimConfig, TileMap, World};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// Python bindings for chemotaxis-core.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Run an experiment on a text map and return the run summary as JSON.
///
/// `config_json` may be empty or a partial config; missing fields take defaults.
#[pyfunction]
#[pyo3(signature = (map, config_json, steps, sample_every = 1))]
fn run_experiment(
    map: &str,
    config_json: &str,
    steps: usize,
    sample_every: usize,
) -> PyResult<String> {
    let config: SimConfig = if config_json.trim().is_empty() {
        SimConfig::default()
    } else {
        serde_json::from_str(config_json)
            .map_err(|e| PyValueError::new_err(format!("invalid config: {e}")))?
    };
    let tile_map = TileMap::from_ascii(map).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let mut world =
        World::try_new(&tile_map, config).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let summary = world
        .try_run_experiment(steps, sample_every)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    serde_json::to_string(&summary).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(run_experiment, m)?)?;
    Ok(())
}
