use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use tradedesk_core::Role;

/// Business area a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleType {
    Validation,
    Approval,
    Pricing,
    Quantity,
    Credit,
    Compliance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleSeverity {
    Error,
    Warning,
    Info,
}

/// What a rule asks the caller to do.
///
/// `Block` and `Escalate` act when the rule fires. `AutoApprove` acts when the
/// rule passes. `Warn` is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
    Block,
    Warn,
    AutoApprove,
    Escalate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    Equals,
    GreaterThan,
    LessThan,
    Contains,
    /// Inclusive on both bounds; needs `value2`.
    Between,
}

/// One predicate over a contract field addressed by a dot path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: JsonValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<JsonValue>,
}

impl RuleCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: JsonValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
            value2: None,
        }
    }

    pub fn equals(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::new(field, ConditionOperator::Equals, value.into())
    }

    pub fn greater_than(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::new(field, ConditionOperator::GreaterThan, value.into())
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::new(field, ConditionOperator::LessThan, value.into())
    }

    pub fn contains(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        Self::new(field, ConditionOperator::Contains, value.into())
    }

    pub fn between(
        field: impl Into<String>,
        low: impl Into<JsonValue>,
        high: impl Into<JsonValue>,
    ) -> Self {
        Self {
            value2: Some(high.into()),
            ..Self::new(field, ConditionOperator::Between, low.into())
        }
    }
}

/// Immutable catalog entry.
///
/// A rule *fires* when every one of its conditions holds. A rule with no
/// conditions always fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub severity: RuleSeverity,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate_to: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensating_action: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl BusinessRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rule_type: RuleType,
        severity: RuleSeverity,
        action: RuleAction,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            rule_type,
            severity,
            enabled: true,
            conditions: Vec::new(),
            action,
            escalate_to: None,
            compensating_action: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn escalate_to(mut self, role: Role) -> Self {
        self.escalate_to = Some(role);
        self
    }

    pub fn with_compensating_action(mut self, action: impl Into<String>) -> Self {
        self.compensating_action = Some(action.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}
