//! Engine configuration: rule catalog, trade-type workflows and switches.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use tradedesk_lifecycle::TradeTypeCatalog;
use tradedesk_observability::LogFormat;
use tradedesk_rules::RuleCatalog;

pub const CONFIG_ENV_VAR: &str = "TRADEDESK_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub rules: RuleCatalog,
    pub trade_types: TradeTypeCatalog,
    /// Reject lifecycle moves that are not adjacent on the workflow path.
    pub strict_transitions: bool,
    /// Skip reminders whose threshold was already scheduled or sent.
    pub suppress_repeat_reminders: bool,
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules: RuleCatalog::default(),
            trade_types: TradeTypeCatalog::default(),
            strict_transitions: false,
            suppress_repeat_reminders: false,
            log_format: LogFormat::Json,
        }
    }
}

impl EngineConfig {
    pub fn with_strict_transitions(mut self, strict: bool) -> Self {
        self.strict_transitions = strict;
        self
    }

    pub fn with_reminder_suppression(mut self, suppress: bool) -> Self {
        self.suppress_repeat_reminders = suppress;
        self
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json).context("parsing engine config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading engine config {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("loading {}", path.display()))
    }

    /// Load from the file named by `TRADEDESK_CONFIG`, or fall back to defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => {
                let config = Self::from_path(&path)?;
                tracing::info!(
                    path = %path,
                    rules = config.rules.rules().len(),
                    "engine config loaded"
                );
                Ok(config)
            }
            Err(_) => {
                tracing::warn!(
                    "{CONFIG_ENV_VAR} not set; using built-in rule catalog and workflows"
                );
                Ok(Self::default())
            }
        }
    }

    /// Install the process-wide tracing subscriber in the configured format.
    pub fn init_logging(&self) {
        tradedesk_observability::init_with(self.log_format);
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.rules.validate().context("invalid rule catalog")?;
        self.trade_types
            .validate()
            .context("invalid trade type configuration")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradedesk_contracts::TradeType;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert!(!config.strict_transitions);
        assert!(config.trade_types.get(TradeType::Cci).is_some());
    }

    #[test]
    fn partial_json_keeps_default_catalogs() {
        let config = EngineConfig::from_json_str(
            r#"{ "strictTransitions": true, "logFormat": "pretty" }"#,
        )
        .unwrap();
        assert!(config.strict_transitions);
        assert_eq!(config.log_format, LogFormat::Pretty);
        config.init_logging();
        assert_eq!(config.rules, RuleCatalog::default());
    }

    #[test]
    fn invalid_catalog_is_rejected() {
        let json = r#"{
            "rules": [
                { "id": "r", "name": "R", "description": "", "type": "QUANTITY",
                  "severity": "WARNING", "conditions": [], "action": "ESCALATE" }
            ]
        }"#;
        let err = EngineConfig::from_json_str(json).unwrap_err();
        assert!(format!("{err:#}").contains("invalid rule catalog"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = EngineConfig::from_path("/nonexistent/tradedesk.json").unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/tradedesk.json"));
    }
}
