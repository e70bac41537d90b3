//! Engine configuration.
//!
//! Read from environment variables:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `DEPOTWATCH_HIGH_RISK_THRESHOLD` | risk score above which an untyped anomaly is `high_risk` | `0.7` |
//! | `DEPOTWATCH_DEFAULT_RULES` | load the built-in rule table (`true`/`false`) | `true` |
//! | `DEPOTWATCH_RULES_FILE` | JSON array of extra rules | unset |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::defaults::default_rules;
use crate::error::ConfigError;
use crate::estimate::EstimateWindows;
use crate::rule::AutoResolutionRule;

pub const ENV_HIGH_RISK_THRESHOLD: &str = "DEPOTWATCH_HIGH_RISK_THRESHOLD";
pub const ENV_DEFAULT_RULES: &str = "DEPOTWATCH_DEFAULT_RULES";
pub const ENV_RULES_FILE: &str = "DEPOTWATCH_RULES_FILE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub high_risk_threshold: f64,
    pub include_default_rules: bool,
    pub rules_file: Option<PathBuf>,
    pub estimate_windows: EstimateWindows,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 0.7,
            include_default_rules: true,
            rules_file: None,
            estimate_windows: EstimateWindows::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_HIGH_RISK_THRESHOLD) {
            config.high_risk_threshold = raw
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_HIGH_RISK_THRESHOLD, &raw))?;
        }

        if let Some(raw) = lookup(ENV_DEFAULT_RULES) {
            config.include_default_rules = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => return Err(invalid(ENV_DEFAULT_RULES, &raw)),
            };
        }

        if let Some(raw) = lookup(ENV_RULES_FILE) {
            if !raw.trim().is_empty() {
                config.rules_file = Some(PathBuf::from(raw.trim()));
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.high_risk_threshold) {
            return Err(invalid(
                "highRiskThreshold",
                &self.high_risk_threshold.to_string(),
            ));
        }

        let w = &self.estimate_windows;
        for (name, range) in [("high", w.high), ("medium", w.medium), ("low", w.low)] {
            if !range.is_valid() {
                return Err(invalid(
                    &format!("estimateWindows.{name}"),
                    &format!("{}..{}", range.min_hours, range.max_hours),
                ));
            }
        }
        Ok(())
    }

    /// Startup rule list: built-ins (if enabled) followed by the rules file.
    pub fn load_rules(&self) -> Result<Vec<AutoResolutionRule>, ConfigError> {
        let mut rules = if self.include_default_rules {
            default_rules()
        } else {
            Vec::new()
        };

        if let Some(path) = &self.rules_file {
            let extra = load_rules_file(path)?;
            info!(path = %path.display(), count = extra.len(), "loaded rules file");
            rules.extend(extra);
        }
        Ok(rules)
    }
}

/// Parse a JSON array of rule definitions.
pub fn parse_rules(json: &str) -> Result<Vec<AutoResolutionRule>, ConfigError> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_rules_file(path: &Path) -> Result<Vec<AutoResolutionRule>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_rules(&raw)
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.load_rules().unwrap().len(), default_rules().len());
    }

    #[test]
    fn reads_threshold_and_default_rule_switch() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_HIGH_RISK_THRESHOLD, "0.55"),
            (ENV_DEFAULT_RULES, "off"),
        ]))
        .unwrap();
        assert_eq!(config.high_risk_threshold, 0.55);
        assert!(!config.include_default_rules);
        assert!(config.load_rules().unwrap().is_empty());
    }

    #[test]
    fn rejects_unparsable_and_out_of_range_values() {
        let err = EngineConfig::from_lookup(lookup(&[(ENV_HIGH_RISK_THRESHOLD, "high")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == ENV_HIGH_RISK_THRESHOLD));

        assert!(EngineConfig::from_lookup(lookup(&[(ENV_HIGH_RISK_THRESHOLD, "1.5")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[(ENV_DEFAULT_RULES, "maybe")])).is_err());
    }

    #[test]
    fn rejects_inverted_estimate_window() {
        let mut config = EngineConfig::default();
        config.estimate_windows.low.min_hours = 100;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "estimateWindows.low"
        ));
    }

    #[test]
    fn missing_rules_file_is_an_io_error() {
        let config = EngineConfig {
            rules_file: Some(PathBuf::from("/nonexistent/depotwatch/rules.json")),
            ..EngineConfig::default()
        };
        assert!(matches!(config.load_rules(), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn rules_file_is_appended_after_built_ins() {
        let path = std::env::temp_dir().join(format!("depotwatch-rules-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{ "name": "cancel dupes", "exceptionType": "重复订单",
                  "actions": [{ "type": "cancel" }], "priority": "low" }]"#,
        )
        .unwrap();

        let config = EngineConfig {
            rules_file: Some(path.clone()),
            ..EngineConfig::default()
        };
        let rules = config.load_rules().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rules.len(), default_rules().len() + 1);
        assert_eq!(rules.last().unwrap().name, "cancel dupes");
    }

    #[test]
    fn parse_rules_surfaces_rule_errors() {
        let err = parse_rules(r#"[{ "exceptionType": "x",
            "conditions": [{ "field": "type", "operator": "like", "value": "in" }] }]"#)
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("unknown condition operator `like`"));
    }

    #[test]
    fn config_deserializes_with_partial_fields() {
        let config: EngineConfig = serde_json::from_str(r#"{ "highRiskThreshold": 0.8 }"#).unwrap();
        assert_eq!(config.high_risk_threshold, 0.8);
        assert!(config.include_default_rules);
    }
}
