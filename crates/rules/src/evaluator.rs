use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use tradedesk_contracts::ContractSnapshot;
use tradedesk_core::Role;

use crate::resolver::{ConditionOutcome, check_condition};
use crate::rule::{BusinessRule, RuleAction, RuleSeverity, RuleType};

/// Result of evaluating one enabled rule against one contract.
///
/// Produced fresh on every evaluation and never persisted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluationResult {
    pub rule_id: String,
    pub rule_name: String,
    pub rule_type: RuleType,
    /// `false` means the rule fired.
    pub passed: bool,
    pub severity: RuleSeverity,
    pub message: String,
    pub action: RuleAction,
    pub requires_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate_to: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compensating_action: Option<String>,
    /// Conditions that could not be checked (bad path or operand types).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved: Vec<String>,
}

impl RuleEvaluationResult {
    pub fn fired(&self) -> bool {
        !self.passed
    }

    /// Fired with the given action.
    pub fn fired_with(&self, action: RuleAction) -> bool {
        !self.passed && self.action == action
    }
}

/// Evaluate `rules` in order against `contract`.
///
/// Disabled rules produce no result at all.
pub fn evaluate(contract: &ContractSnapshot, rules: &[BusinessRule]) -> Vec<RuleEvaluationResult> {
    let document = contract_document(contract);

    let results: Vec<RuleEvaluationResult> = rules
        .iter()
        .filter(|rule| rule.enabled)
        .map(|rule| evaluate_rule(rule, &document))
        .collect();

    tracing::debug!(
        contract_id = %contract.id,
        evaluated = results.len(),
        fired = results.iter().filter(|r| r.fired()).count(),
        "rules evaluated"
    );

    results
}

/// Evaluate a single rule against an already-serialized contract document.
///
/// The rule fires iff every condition is met; an unresolvable condition counts
/// as not met and is listed in `unresolved`.
pub fn evaluate_rule(rule: &BusinessRule, document: &JsonValue) -> RuleEvaluationResult {
    let mut all_met = true;
    let mut unresolved = Vec::new();

    for condition in &rule.conditions {
        match check_condition(document, condition) {
            ConditionOutcome::Met => {}
            ConditionOutcome::NotMet => all_met = false,
            ConditionOutcome::Unresolvable(reason) => {
                tracing::warn!(rule_id = %rule.id, %reason, "rule condition unresolvable");
                all_met = false;
                unresolved.push(condition.field.clone());
            }
        }
    }

    if all_met {
        RuleEvaluationResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            rule_type: rule.rule_type,
            passed: false,
            severity: rule.severity,
            message: rule.description.clone(),
            action: rule.action,
            requires_override: rule.action == RuleAction::Block,
            escalate_to: rule.escalate_to.clone(),
            compensating_action: rule.compensating_action.clone(),
            unresolved,
        }
    } else {
        RuleEvaluationResult {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            rule_type: rule.rule_type,
            passed: true,
            severity: rule.severity,
            message: format!("{} - OK", rule.name),
            action: rule.action,
            requires_override: false,
            escalate_to: None,
            compensating_action: None,
            unresolved,
        }
    }
}

fn contract_document(contract: &ContractSnapshot) -> JsonValue {
    match contract.rule_document() {
        Ok(doc) => doc,
        Err(err) => {
            // Every field then resolves as unresolvable.
            tracing::error!(
                contract_id = %contract.id,
                error = %err,
                "contract snapshot not serializable"
            );
            JsonValue::Null
        }
    }
}
