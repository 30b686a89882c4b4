/// `load_config` module: reads the YAML configuration of the `bcplan` CLI and applies
/// environment overrides.
///
/// The YAML has two top-level sections, both optional:
///
/// ```yaml
/// plan:        # bcplan_core::config::PlanConfig, every field defaulted
///   standalone_objects: [arch/x86/kernel/head_64.o]
/// tools:       # how the CLI itself drives the external tools at plan time
///   ar: llvm-ar
///   extraction_log: wrapper-logs/wrapper.log
/// ```
///
/// # Errors
/// Unreadable files and invalid YAML are reported as `anyhow::Error` with the config
/// path in the message; nothing is defaulted past a broken file.
use anyhow::Result;
use bcplan_core::config::PlanConfig;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Overrides the archive tool.
pub const AR_ENV: &str = "BCPLAN_AR";
/// Overrides the extraction log path.
pub const EXTRACTION_LOG_ENV: &str = "BCPLAN_EXTRACTION_LOG";
/// Log path the extractor itself honours, used when [`EXTRACTION_LOG_ENV`] is unset.
pub const EXTRACTOR_LOG_ENV: &str = "GLLVM_OUTPUT_FILE";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub plan: PlanConfig,
    pub tools: ToolsSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    pub ar: String,
    /// Relative paths are resolved against the source root.
    pub extraction_log: PathBuf,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            ar: "ar".to_string(),
            extraction_log: PathBuf::from("wrapper-logs/wrapper.log"),
        }
    }
}

impl CliConfig {
    /// Defaults plus environment overrides, for runs without `--config`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(ar) = env::var(AR_ENV) {
            info!(env = AR_ENV, ar = %ar, "Archive tool overridden from environment");
            self.tools.ar = ar;
        }
        let log = env::var_os(EXTRACTION_LOG_ENV).or_else(|| env::var_os(EXTRACTOR_LOG_ENV));
        if let Some(log) = log {
            info!(log = ?log, "Extraction log overridden from environment");
            self.tools.extraction_log = PathBuf::from(log);
        }
    }
}

/// Loads a YAML config file and applies the environment overrides on top.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty document deserialises to unit, not to an empty mapping.
    let mut config: CliConfig = if config_content.trim().is_empty() {
        CliConfig::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    config.apply_env();
    config.plan.trace_loaded();
    Ok(config)
}
