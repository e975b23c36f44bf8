//! Engine configuration, loadable from YAML.

use std::fs;
use std::path::{Path, PathBuf};

use gf_solver::CalculationMethod;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Number of worker slots started with a fresh pool.
pub const DEFAULT_INITIAL_SLOTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Pre-warmed pool size. The pool grows beyond it on demand.
    pub initial_slots: usize,
    pub method: CalculationMethod,
    /// When set, slot `i` exports its results to `<export_dir>/model_<i+1>`.
    pub export_dir: Option<PathBuf>,
    /// Leave failed segments out of the cache so the next selective round
    /// dispatches them again.
    pub retry_failed_segments: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_slots: DEFAULT_INITIAL_SLOTS,
            method: CalculationMethod::default(),
            export_dir: None,
            retry_failed_segments: false,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> EngineResult<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| EngineError::ConfigFileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> EngineResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.initial_slots == 0 {
            return Err(EngineError::Config(
                "initial_slots must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Export directory of one worker slot, if exporting is enabled.
    pub fn slot_export_dir(&self, slot: usize) -> Option<PathBuf> {
        slot_export_dir(self.export_dir.as_deref(), slot)
    }
}

pub(crate) fn slot_export_dir(base: Option<&Path>, slot: usize) -> Option<PathBuf> {
    base.map(|dir| dir.join(format!("model_{}", slot + 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.initial_slots, 5);
        assert_eq!(config.method, CalculationMethod::Lpf);
    }

    #[test]
    fn partial_document_overrides_fields() {
        let yaml = "method: lopf\nexport_dir: /tmp/gridflow\nretry_failed_segments: true\n";
        let config = EngineConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.method, CalculationMethod::Lopf);
        assert_eq!(config.initial_slots, 5);
        assert!(config.retry_failed_segments);
        assert_eq!(
            config.slot_export_dir(0),
            Some(PathBuf::from("/tmp/gridflow/model_1"))
        );
    }

    #[test]
    fn zero_slots_rejected() {
        assert!(matches!(
            EngineConfig::from_yaml_str("initial_slots: 0"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn unknown_method_rejected() {
        assert!(matches!(
            EngineConfig::from_yaml_str("method: newton"),
            Err(EngineError::Yaml(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::from_yaml_file(Path::new("/nonexistent/engine.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/engine.yaml"));
    }

    #[test]
    fn yaml_roundtrip() {
        let config = EngineConfig {
            initial_slots: 2,
            method: CalculationMethod::Optimize,
            export_dir: Some(PathBuf::from("out")),
            retry_failed_segments: true,
        };
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(EngineConfig::from_yaml_str(&yaml).unwrap(), config);
    }
}
