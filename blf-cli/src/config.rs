//! Configuration loading and parsing
//!
//! The optional `--config` file is TOML with two tables:
//!
//! ```toml
//! [output]
//! include_errors = true
//! format = "csv"            # or "jsonl"
//! progress_interval = 10000
//!
//! [decoder]
//! unsupported_compression = "skip"
//! strict_timestamps = true
//! channel_filter = [0, 1]
//! ```
//!
//! Command-line flags override values from the file.

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use blf_decoder::DecoderConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main application configuration (loaded from a TOML file)
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Write error frames instead of counting and omitting them
    #[serde(default)]
    pub include_errors: bool,
    #[serde(default)]
    pub format: OutputFormat,
    /// Log progress every N rows written (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_progress_interval() -> u64 {
    10_000
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            include_errors: false,
            format: OutputFormat::default(),
            progress_interval: default_progress_interval(),
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blf_decoder::CompressionPolicy;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [output]
            include_errors = true
            format = "jsonl"

            [decoder]
            unsupported_compression = "skip"
            strict_timestamps = false
            channel_filter = [0, 2]
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert!(config.output.include_errors);
        assert_eq!(config.output.format, OutputFormat::Jsonl);
        assert_eq!(config.output.progress_interval, 10_000);
        assert_eq!(config.decoder.unsupported_compression, CompressionPolicy::Skip);
        assert_eq!(config.decoder.channel_filter, Some(vec![0, 2]));
        assert!(!config.decoder.strict_timestamps);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert!(config.decoder.strict_timestamps);
    }

    #[test]
    fn test_load_config_errors() {
        assert!(load_config(Path::new("/nonexistent/config.toml")).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[output]\nformat = \"xml\"").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
