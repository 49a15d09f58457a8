//! Python bindings for the tempo pipeline.
//!
//! The Python front end passes play-by-play JSON and receives report JSON, or
//! a typed summary object for the game engine.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::api::ResidualSummary;
use crate::config::AnalysisConfig;
use crate::error::TempoError;
use crate::services::tempo::analyze_game_json;

fn to_py_err(err: TempoError) -> PyErr {
    PyErr::new::<PyValueError, _>(err.to_string())
}

fn load_config(config_toml: Option<&str>) -> PyResult<AnalysisConfig> {
    match config_toml {
        Some(content) => AnalysisConfig::from_toml_str(content).map_err(to_py_err),
        None => Ok(AnalysisConfig::default()),
    }
}

/// Python wrapper for ResidualSummary
#[pyclass]
#[derive(Clone)]
pub struct PyResidualSummary {
    #[pyo3(get)]
    pub total_poss_p1: usize,
    #[pyo3(get)]
    pub mean_residual_p1: Option<f64>,
    #[pyo3(get)]
    pub median_residual_p1: Option<f64>,
    #[pyo3(get)]
    pub total_poss_p2: usize,
    #[pyo3(get)]
    pub mean_residual_p2: Option<f64>,
    #[pyo3(get)]
    pub median_residual_p2: Option<f64>,
    #[pyo3(get)]
    pub p_value_p2: Option<f64>,
    #[pyo3(get)]
    pub total_poss: usize,
    #[pyo3(get)]
    pub mean_residual: Option<f64>,
    #[pyo3(get)]
    pub median_residual: Option<f64>,
    #[pyo3(get)]
    pub verdict: String,
}

#[pymethods]
impl PyResidualSummary {
    fn __repr__(&self) -> String {
        format!(
            "ResidualSummary(p1={}, p2={}, game={}, verdict={})",
            self.total_poss_p1, self.total_poss_p2, self.total_poss, self.verdict
        )
    }
}

impl PyResidualSummary {
    fn new(summary: ResidualSummary, verdict: String) -> Self {
        PyResidualSummary {
            total_poss_p1: summary.total_poss_p1,
            mean_residual_p1: summary.mean_residual_p1,
            median_residual_p1: summary.median_residual_p1,
            total_poss_p2: summary.total_poss_p2,
            mean_residual_p2: summary.mean_residual_p2,
            median_residual_p2: summary.median_residual_p2,
            p_value_p2: summary.p_value_p2,
            total_poss: summary.total_poss,
            mean_residual: summary.mean_residual,
            median_residual: summary.median_residual,
            verdict,
        }
    }
}

/// Analyze one game and return the full report as JSON.
#[pyfunction]
#[pyo3(name = "analyze_game", signature = (events_json, closing_total=None, config_toml=None))]
pub fn py_analyze_game(
    events_json: &str,
    closing_total: Option<f64>,
    config_toml: Option<&str>,
) -> PyResult<String> {
    let config = load_config(config_toml)?;
    let report = analyze_game_json(events_json, closing_total, &config).map_err(to_py_err)?;
    serde_json::to_string(&report)
        .map_err(|e| PyErr::new::<PyRuntimeError, _>(format!("Failed to serialize report: {}", e)))
}

/// Analyze one game and return only the residual summary.
#[pyfunction]
#[pyo3(name = "residual_summary", signature = (events_json, closing_total=None, config_toml=None))]
pub fn py_residual_summary(
    events_json: &str,
    closing_total: Option<f64>,
    config_toml: Option<&str>,
) -> PyResult<PyResidualSummary> {
    let config = load_config(config_toml)?;
    let report = analyze_game_json(events_json, closing_total, &config).map_err(to_py_err)?;
    let verdict = serde_json::to_value(report.verdict.direction)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    Ok(PyResidualSummary::new(report.summary, verdict))
}

/// Python module definition.
#[pymodule]
fn tfs_tempo(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyResidualSummary>()?;
    m.add_function(wrap_pyfunction!(py_analyze_game, m)?)?;
    m.add_function(wrap_pyfunction!(py_residual_summary, m)?)?;
    Ok(())
}
