//! # CLI Configuration File
//!
//! Optional YAML file passed with `--config`. Every key is optional and
//! every key can be overridden by the matching command-line flag.
//!
//! ```yaml
//! definitions: content/definitions.json
//! characteristics: scans/host-01.json
//! variables: content/variables.json
//! definition_ids:
//!   - oval:org.example:def:1
//! format: json
//! reference_time: 2024-01-01T00:00:00Z
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::report::OutputFormat;

/// Defaults loaded from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub definitions: Option<PathBuf>,
    pub characteristics: Option<PathBuf>,
    pub variables: Option<PathBuf>,
    pub definition_ids: Vec<String>,
    pub format: Option<OutputFormat>,
    pub reference_time: Option<DateTime<Utc>>,
}

impl CliConfig {
    /// Load a configuration file.
    ///
    /// Relative paths inside the file are resolved against the file's own
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        tracing::debug!(config = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        for path in [
            &mut self.definitions,
            &mut self.characteristics,
            &mut self.variables,
        ]
        .into_iter()
        .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config: CliConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn parses_all_keys() {
        let config: CliConfig = serde_yaml::from_str(
            "definitions: defs.json\n\
             characteristics: sc.json\n\
             definition_ids: [\"oval:x:def:1\"]\n\
             format: json\n\
             reference_time: 2024-01-01T00:00:00Z\n",
        )
        .unwrap();
        assert_eq!(config.definitions, Some(PathBuf::from("defs.json")));
        assert_eq!(config.definition_ids, vec!["oval:x:def:1".to_string()]);
        assert_eq!(config.format, Some(OutputFormat::Json));
        assert!(config.reference_time.is_some());
        assert!(config.variables.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<CliConfig, _> = serde_yaml::from_str("definitons: typo.json\n");
        assert!(result.is_err());
    }

    #[test]
    fn load_resolves_paths_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oval.yaml");
        std::fs::write(&path, "definitions: defs.json\nvariables: /abs/vars.json\n").unwrap();
        let config = CliConfig::load(&path).unwrap();
        assert_eq!(config.definitions, Some(dir.path().join("defs.json")));
        assert_eq!(config.variables, Some(PathBuf::from("/abs/vars.json")));
    }

    #[test]
    fn load_missing_file_fails_with_path() {
        let err = CliConfig::load(Path::new("/nonexistent/oval.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/oval.yaml"));
    }
}
