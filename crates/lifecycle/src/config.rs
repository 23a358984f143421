use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use tradedesk_contracts::{ContractLifecycleState, TradeType};
use tradedesk_core::{DomainError, DomainResult};

/// Workflow and reminder configuration for one trade type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeTypeConfig {
    pub trade_type: TradeType,
    pub requires_quality_passing: bool,
    #[serde(rename = "requiresEMDPayment")]
    pub requires_emd_payment: bool,
    /// Days-before-due thresholds for payment reminders.
    pub payment_due_days: Vec<i64>,
    /// Days-before-due thresholds for delivery reminders.
    pub delivery_reminder_days: Vec<i64>,
    /// Days-before-due thresholds for quality-check reminders.
    pub quality_check_days: Vec<i64>,
    /// Canonical path, strictly ordered, no repeats, no branch states.
    pub workflow_steps: Vec<ContractLifecycleState>,
}

impl TradeTypeConfig {
    pub fn normal_trade() -> Self {
        use ContractLifecycleState::*;
        Self {
            trade_type: TradeType::Normal,
            requires_quality_passing: false,
            requires_emd_payment: false,
            payment_due_days: vec![7, 3, 1],
            delivery_reminder_days: vec![7, 3, 1],
            quality_check_days: Vec::new(),
            workflow_steps: vec![
                Draft,
                PendingValidation,
                PendingApproval,
                Approved,
                Active,
                AwaitingDelivery,
                Delivered,
                Invoiced,
                AwaitingPayment,
                Paid,
                Reconciled,
                Completed,
            ],
        }
    }

    pub fn cci_trade() -> Self {
        use ContractLifecycleState::*;
        Self {
            trade_type: TradeType::Cci,
            requires_quality_passing: true,
            requires_emd_payment: true,
            payment_due_days: vec![3, 1, 0],
            delivery_reminder_days: vec![5, 2],
            quality_check_days: vec![3, 1],
            workflow_steps: vec![
                Draft,
                PendingValidation,
                PendingApproval,
                Approved,
                Active,
                AwaitingQualityPassing,
                QualityPassed,
                AwaitingDelivery,
                Delivered,
                Invoiced,
                AwaitingPayment,
                Paid,
                Reconciled,
                Completed,
            ],
        }
    }

    /// Position of `state` on the workflow path.
    pub fn step_index(&self, state: ContractLifecycleState) -> Option<usize> {
        self.workflow_steps.iter().position(|s| *s == state)
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.workflow_steps.is_empty() {
            return Err(DomainError::validation(format!(
                "{}: workflow has no steps",
                self.trade_type
            )));
        }

        let mut seen = HashSet::new();
        for step in &self.workflow_steps {
            if step.is_branch() {
                return Err(DomainError::validation(format!(
                    "{}: branch state {step} cannot be a workflow step",
                    self.trade_type
                )));
            }
            if !seen.insert(*step) {
                return Err(DomainError::validation(format!(
                    "{}: workflow visits {step} twice",
                    self.trade_type
                )));
            }
        }

        if self.requires_quality_passing
            && self
                .step_index(ContractLifecycleState::AwaitingQualityPassing)
                .is_none()
        {
            return Err(DomainError::validation(format!(
                "{}: quality passing required but not on the workflow",
                self.trade_type
            )));
        }

        Ok(())
    }
}

/// All trade type configurations known to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeTypeCatalog {
    configs: Vec<TradeTypeConfig>,
}

impl TradeTypeCatalog {
    pub fn new(configs: Vec<TradeTypeConfig>) -> Self {
        Self { configs }
    }

    pub fn get(&self, trade_type: TradeType) -> Option<&TradeTypeConfig> {
        self.configs.iter().find(|c| c.trade_type == trade_type)
    }

    pub fn configs(&self) -> &[TradeTypeConfig] {
        &self.configs
    }

    /// Positional successor of `current` in `trade_type`'s workflow.
    pub fn next_state(
        &self,
        current: ContractLifecycleState,
        trade_type: TradeType,
    ) -> Option<ContractLifecycleState> {
        self.get(trade_type)
            .and_then(|config| crate::machine::next_lifecycle_state(current, config))
    }

    pub fn validate(&self) -> DomainResult<()> {
        let mut seen = HashSet::new();
        for config in &self.configs {
            if !seen.insert(config.trade_type) {
                return Err(DomainError::validation(format!(
                    "{} configured twice",
                    config.trade_type
                )));
            }
            config.validate()?;
        }
        Ok(())
    }
}

impl Default for TradeTypeCatalog {
    fn default() -> Self {
        Self::new(vec![TradeTypeConfig::normal_trade(), TradeTypeConfig::cci_trade()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_configs_are_valid() {
        TradeTypeCatalog::default().validate().unwrap();
    }

    #[test]
    fn cci_inserts_quality_states_normal_does_not() {
        let normal = TradeTypeConfig::normal_trade();
        let cci = TradeTypeConfig::cci_trade();
        assert!(normal.step_index(ContractLifecycleState::QualityPassed).is_none());
        assert_eq!(cci.step_index(ContractLifecycleState::AwaitingQualityPassing), Some(5));
        assert!(cci.requires_emd_payment && !normal.requires_emd_payment);
    }

    #[test]
    fn rejects_cyclic_or_branching_workflows() {
        let mut repeated = TradeTypeConfig::normal_trade();
        repeated.workflow_steps.push(ContractLifecycleState::Draft);
        assert!(repeated.validate().is_err());

        let mut branch = TradeTypeConfig::normal_trade();
        branch.workflow_steps.insert(2, ContractLifecycleState::Disputed);
        assert!(branch.validate().is_err());

        let twice = TradeTypeCatalog::new(vec![
            TradeTypeConfig::normal_trade(),
            TradeTypeConfig::normal_trade(),
        ]);
        assert!(twice.validate().is_err());
    }

    #[test]
    fn json_uses_catalog_field_names() {
        let json = serde_json::to_value(TradeTypeConfig::cci_trade()).unwrap();
        assert_eq!(json["tradeType"], "CCI Trade");
        assert_eq!(json["requiresEMDPayment"], true);
        assert_eq!(json["workflowSteps"][5], "AWAITING_QUALITY_PASSING");
    }
}
