//! Rule catalog: an ordered, injectable list of business rules.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use tradedesk_contracts::ContractSnapshot;
use tradedesk_core::{DomainError, DomainResult, Role};

use crate::evaluator::{RuleEvaluationResult, evaluate};
use crate::rule::{
    BusinessRule, ConditionOperator, RuleAction, RuleCondition, RuleSeverity, RuleType,
};

/// Ordered rule catalog. Evaluation follows catalog order.
///
/// `Default` yields the shipped trade desk rules; tests and deployments can
/// substitute any catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleCatalog {
    rules: Vec<BusinessRule>,
}

impl RuleCatalog {
    pub fn new(rules: Vec<BusinessRule>) -> Self {
        Self { rules }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Parse a JSON array of rules and validate it.
    pub fn from_json_str(json: &str) -> DomainResult<Self> {
        let catalog: RuleCatalog = serde_json::from_str(json)
            .map_err(|e| DomainError::validation(format!("rule catalog: {e}")))?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn rules(&self) -> &[BusinessRule] {
        &self.rules
    }

    pub fn enabled(&self) -> impl Iterator<Item = &BusinessRule> {
        self.rules.iter().filter(|r| r.enabled)
    }

    pub fn get(&self, rule_id: &str) -> Option<&BusinessRule> {
        self.rules.iter().find(|r| r.id == rule_id)
    }

    pub fn evaluate(&self, contract: &ContractSnapshot) -> Vec<RuleEvaluationResult> {
        evaluate(contract, &self.rules)
    }

    /// Reject catalogs that could only ever misbehave at evaluation time.
    pub fn validate(&self) -> DomainResult<()> {
        let mut seen = HashSet::new();

        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(DomainError::validation("rule id must not be empty"));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(DomainError::validation(format!(
                    "duplicate rule id '{}'",
                    rule.id
                )));
            }
            if rule.name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "rule '{}' has no name",
                    rule.id
                )));
            }
            if rule.action == RuleAction::Escalate
                && rule.escalate_to.as_ref().is_none_or(Role::is_blank)
            {
                return Err(DomainError::validation(format!(
                    "rule '{}' escalates but names no role",
                    rule.id
                )));
            }
            for condition in &rule.conditions {
                validate_condition(&rule.id, condition)?;
            }
        }

        Ok(())
    }
}

impl Default for RuleCatalog {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

fn validate_condition(rule_id: &str, condition: &RuleCondition) -> DomainResult<()> {
    if condition.field.trim().is_empty() || condition.field.split('.').any(str::is_empty) {
        return Err(DomainError::validation(format!(
            "rule '{rule_id}' has a malformed field path '{}'",
            condition.field
        )));
    }

    let numeric = |v: &serde_json::Value| v.is_number();
    match condition.operator {
        ConditionOperator::GreaterThan | ConditionOperator::LessThan => {
            if !numeric(&condition.value) {
                return Err(DomainError::validation(format!(
                    "rule '{rule_id}': {:?} on '{}' needs a numeric value",
                    condition.operator, condition.field
                )));
            }
        }
        ConditionOperator::Between => match &condition.value2 {
            Some(upper) if numeric(&condition.value) && numeric(upper) => {}
            _ => {
                return Err(DomainError::validation(format!(
                    "rule '{rule_id}': between on '{}' needs numeric value and value2",
                    condition.field
                )));
            }
        },
        ConditionOperator::Equals | ConditionOperator::Contains => {}
    }

    Ok(())
}

/// Shipped rule set for the cotton trade desk.
///
/// `required-parties` fires only when *both* party ids are empty: its
/// conditions are AND-ed like every other rule's.
pub fn default_rules() -> Vec<BusinessRule> {
    vec![
        BusinessRule::new(
            "required-parties",
            "Required parties",
            RuleType::Validation,
            RuleSeverity::Error,
            RuleAction::Block,
        )
        .with_description("Client and vendor must be selected")
        .with_condition(RuleCondition::equals("clientId", ""))
        .with_condition(RuleCondition::equals("vendorId", "")),
        BusinessRule::new(
            "quantity-limit",
            "Quantity limit",
            RuleType::Quantity,
            RuleSeverity::Warning,
            RuleAction::Escalate,
        )
        .with_description("Quantity exceeds 1000 bales and needs admin approval")
        .with_condition(RuleCondition::greater_than("quantityBales", 1000))
        .escalate_to(Role::ADMIN),
        BusinessRule::new(
            "large-quantity-notice",
            "Large quantity notice",
            RuleType::Quantity,
            RuleSeverity::Info,
            RuleAction::Warn,
        )
        .with_description("Quantity between 501 and 1000 bales; confirm logistics capacity")
        .with_condition(RuleCondition::between("quantityBales", 501, 1000)),
        BusinessRule::new(
            "rate-floor",
            "Rate floor",
            RuleType::Pricing,
            RuleSeverity::Warning,
            RuleAction::Warn,
        )
        .with_description("Rate is below 1000 per candy; verify pricing")
        .with_condition(RuleCondition::less_than("rate", 1000)),
        BusinessRule::new(
            "kachha-sauda-review",
            "Kachha sauda review",
            RuleType::Approval,
            RuleSeverity::Warning,
            RuleAction::Escalate,
        )
        .with_description("Kachha sauda needs confirmation from the trade manager")
        .with_condition(RuleCondition::equals("bargainType", "Kachha Sauda"))
        .escalate_to(Role::new("Trade Manager")),
        BusinessRule::new(
            "cci-emd-required",
            "CCI EMD required",
            RuleType::Compliance,
            RuleSeverity::Error,
            RuleAction::Block,
        )
        .with_description("CCI trades require the EMD to be paid")
        .with_condition(RuleCondition::equals("tradeType", "CCI Trade"))
        .with_condition(RuleCondition::equals("emdPaid", false))
        .with_compensating_action("Collect EMD from the buyer before activation"),
        BusinessRule::new(
            "cci-low-micronaire",
            "CCI low micronaire",
            RuleType::Compliance,
            RuleSeverity::Warning,
            RuleAction::Escalate,
        )
        .with_description("CCI lot micronaire below 3.5 needs quality review")
        .with_condition(RuleCondition::equals("tradeType", "CCI Trade"))
        .with_condition(RuleCondition::less_than("qualitySpecs.micronaire", 3.5))
        .escalate_to(Role::new("Quality Manager")),
        BusinessRule::new(
            "buyer-credit-watch",
            "Buyer credit watch",
            RuleType::Credit,
            RuleSeverity::Error,
            RuleAction::Escalate,
        )
        .with_description("Buyer is on the credit watch list")
        .with_condition(RuleCondition::equals("creditWatch", true))
        .escalate_to(Role::new("Credit Manager"))
        .disabled(),
        BusinessRule::new(
            "auto-approval-limit",
            "Auto-approval limit",
            RuleType::Approval,
            RuleSeverity::Info,
            RuleAction::AutoApprove,
        )
        .with_description("Quantity above 100 bales is outside the auto-approval limit")
        .with_condition(RuleCondition::greater_than("quantityBales", 100)),
    ]
}
