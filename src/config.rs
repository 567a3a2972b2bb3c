use crate::error::ProjectionResult;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default limit on composite nesting during object graph construction
pub const DEFAULT_MAX_BUILD_DEPTH: usize = 32;

/// Engine settings, loadable from YAML
///
/// ```yaml
/// max_build_depth: 16
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Composite nesting deeper than this fails the build instead of recursing
    pub max_build_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_build_depth: DEFAULT_MAX_BUILD_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(content: &str) -> ProjectionResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> ProjectionResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }
}
