//! Building blocks of the `camcal` binary, kept in a library so they can be
//! driven from tests with scripted input and synthetic detectors.

pub mod batch;
pub mod repl;

use anyhow::{Context, Result};
use camcal_pipeline::CalibrationConfig;
use std::{fs, path::Path};

pub use batch::calibrate_directory;
pub use repl::{run_repl, Command, ReplExit, ReplOptions};

pub fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

/// Load the config file if given, otherwise defaults.
pub fn load_config(path: Option<&Path>) -> Result<CalibrationConfig> {
    match path {
        Some(path) => load_json_file(path),
        None => Ok(CalibrationConfig::default()),
    }
}
