// Central place to initialize logging across the binaries and tests.
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::lib::logger::{configure_logger, install, Logger};

// outcome of the one install attempt; a failure is reported on every call
static INSTALLED: OnceLock<std::result::Result<(), String>> = OnceLock::new();

/// Configure the process-wide `neuralnilm` logger and make it the `log`
/// backend. Safe to call repeatedly: the backend is installed once and the
/// first successful configuration keeps its sinks. If another backend was
/// already installed, every call fails, not just the first.
pub fn setup(output_filename: Option<&Path>) -> Result<Arc<Logger>> {
    let logger = configure_logger(output_filename)?;
    let installed = INSTALLED.get_or_init(|| {
        install(Arc::clone(&logger)).map_err(|err| err.to_string())
    });
    if let Err(msg) = installed {
        return Err(anyhow!("{}", msg));
    }
    Ok(logger)
}
