use anyhow::{anyhow, Result};
use log::debug;
use serde_derive::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::lib::logger::{Logger, Registry, LOGGER_NAME};

fn default_name() -> String {
    LOGGER_NAME.to_string()
}

/// Logger setup as read from a YAML file, e.g.
///
/// ```yaml
/// name: neuralnilm
/// output_filename: experiments/e1/run.log
/// ```
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LoggerConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub output_filename: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        LoggerConfig {
            name: default_name(),
            output_filename: None,
        }
    }
}

impl LoggerConfig {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        // an empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(LoggerConfig::default());
        }
        let config: LoggerConfig = serde_yaml::from_str(contents)
            .map_err(|err| anyhow!("Invalid logger configuration: {}", err))?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|err| {
            anyhow!(
                "Could not read logger configuration at {:?}: {}",
                path,
                err
            )
        })?;
        LoggerConfig::from_yaml(&contents)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Configure the named logger of `registry` from this config.
    pub fn apply(&self, registry: &Registry) -> Result<Arc<Logger>> {
        let logger = registry.configure_named(&self.name, self.output_filename.as_deref())?;
        debug!(
            "configured logger '{}' (output file: {:?})",
            self.name, self.output_filename
        );
        Ok(logger)
    }
}
