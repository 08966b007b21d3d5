//! Runtime configuration, loaded from TOML.
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use serde::{Deserialize, Serialize};

use crate::beliefbase::ViewMode;
use crate::consistency::{Compression, Filter, FilterKind, Metric, MetricKind};
use crate::context::Budget;
use crate::error::{ConfigError, ConfigResult};
use crate::plan::PlanRanking;
use crate::term::Path;
use crate::unify::UnifyAlgorithm;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredoConfig {
    pub unifier: UnifierConfig,
    pub beliefs: BeliefsConfig,
    pub selector: SelectorConfig,
    pub consistency: ConsistencyConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnifierConfig {
    pub algorithm: UnifyAlgorithm,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeliefsConfig {
    /// Report a replace of a belief by an equal one as an event.
    pub emit_unchanged: bool,
    /// Mode of views created implicitly by adding beliefs.
    pub default_view_mode: ViewMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Report a trigger without applicable plans as an error.
    pub strict: bool,
    pub ranking: PlanRanking,
    #[serde(default = "default_max_rule_depth")]
    pub max_rule_depth: usize,
    /// Resolution steps per call; 0 means unlimited.
    pub max_steps: u64,
}

fn default_max_rule_depth() -> usize {
    64
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            strict: false,
            ranking: PlanRanking::default(),
            max_rule_depth: default_max_rule_depth(),
            max_steps: 0,
        }
    }
}

impl SelectorConfig {
    pub fn budget(&self) -> Budget {
        let budget = Budget::with_depth(self.max_rule_depth);
        match self.max_steps {
            0 => budget,
            steps => budget.with_steps(steps),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    pub metric: MetricKind,
    /// Compressor for the `ncd` metric.
    pub compression: Compression,
    pub filter: FilterKind,
    /// Paths for the `paths` filter.
    pub paths: Vec<Path>,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
}

fn default_iterations() -> usize {
    8
}
fn default_epsilon() -> f64 {
    0.001
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            compression: Compression::default(),
            filter: FilterKind::default(),
            paths: Vec::new(),
            iterations: default_iterations(),
            epsilon: default_epsilon(),
        }
    }
}

impl ConsistencyConfig {
    pub fn metric(&self) -> Metric {
        Metric::from_kind(self.metric, self.compression)
    }

    pub fn filter(&self) -> Filter {
        Filter::from_kind(self.filter, &self.paths)
    }
}

impl CredoConfig {
    /// Load from a TOML file.
    pub fn load(path: &std::path::Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Load from `path` if given, defaults otherwise.
    pub fn load_or_default(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &std::path::Path) -> ConfigResult<()> {
        let content = self.to_toml().map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CredoConfig::default();
        assert_eq!(config.unifier.algorithm, UnifyAlgorithm::HashIndexed);
        assert_eq!(config.selector.max_rule_depth, 64);
        assert_eq!(config.selector.budget().max_steps, None);
        assert_eq!(config.consistency.iterations, 8);
        assert_eq!(config.consistency.metric(), Metric::Discrete);
        assert_eq!(config.consistency.filter(), Filter::All);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = CredoConfig::parse(
            r#"
            [unifier]
            algorithm = "recursive"

            [selector]
            max_steps = 500

            [consistency]
            metric = "ncd"
            compression = "gzip"
            filter = "paths"
            paths = ["room", "weather/today"]
            "#,
        )
        .unwrap();
        assert_eq!(config.unifier.algorithm, UnifyAlgorithm::Recursive);
        assert_eq!(config.selector.max_rule_depth, 64);
        assert_eq!(config.selector.budget().max_steps, Some(500));
        assert_eq!(config.consistency.metric(), Metric::Ncd(Compression::Gzip));
        assert_eq!(config.consistency.epsilon, 0.001);
        match config.consistency.filter() {
            Filter::Paths(paths) => assert_eq!(paths.len(), 2),
            other => panic!("unexpected filter {other:?}"),
        }
    }

    #[test]
    fn unknown_enum_value_is_a_parse_error() {
        assert!(CredoConfig::parse("[consistency]\nmetric = \"cosine\"").is_err());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("credo.toml");
        let mut config = CredoConfig::default();
        config.beliefs.emit_unchanged = true;
        config.beliefs.default_view_mode = ViewMode::Opaque;
        config.selector.ranking = PlanRanking::SuccessRatio;
        config.save(&path).unwrap();

        let loaded = CredoConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CredoConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
