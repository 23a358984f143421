use serde::{Deserialize, Serialize};

use tradedesk_contracts::ContractLifecycleState;
use tradedesk_core::{DomainError, DomainResult};

use crate::config::TradeTypeConfig;

/// Positional successor of `current` on the workflow path.
///
/// `None` when `current` is the last step or not on the path at all (branch
/// states never have a successor here).
pub fn next_lifecycle_state(
    current: ContractLifecycleState,
    config: &TradeTypeConfig,
) -> Option<ContractLifecycleState> {
    let index = config.step_index(current)?;
    config.workflow_steps.get(index + 1).copied()
}

/// Opt-in strict check for a proposed transition.
///
/// Allowed:
/// - the positional next workflow step;
/// - `Disputed`, `Cancelled` or `Amended` from any non-terminal state;
/// - `PendingValidation` → `ValidationFailed`;
/// - `ValidationFailed` or `Amended` → `PendingValidation`;
/// - `Disputed` → any workflow step (dispute settled by explicit decision).
pub fn validate_transition(
    from: ContractLifecycleState,
    to: ContractLifecycleState,
    config: &TradeTypeConfig,
) -> DomainResult<()> {
    use ContractLifecycleState::*;

    if from == to {
        return Err(DomainError::invariant(format!("contract is already {to}")));
    }
    if from.is_terminal() {
        return Err(DomainError::invariant(format!(
            "cannot leave terminal state {from}"
        )));
    }

    let allowed = match (from, to) {
        (_, Disputed | Cancelled | Amended) => true,
        (PendingValidation, ValidationFailed) => true,
        (ValidationFailed | Amended, PendingValidation) => true,
        (Disputed, target) => config.step_index(target).is_some(),
        _ => next_lifecycle_state(from, config) == Some(to),
    };

    if allowed {
        Ok(())
    } else {
        Err(DomainError::invariant(format!(
            "illegal transition {from} -> {to} for {}",
            config.trade_type
        )))
    }
}

/// Where a contract stands on its workflow path, for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowProgress {
    /// 1-based step number.
    pub step: usize,
    pub total_steps: usize,
    pub percent: u8,
}

pub fn workflow_progress(
    state: ContractLifecycleState,
    config: &TradeTypeConfig,
) -> Option<WorkflowProgress> {
    let index = config.step_index(state)?;
    let total_steps = config.workflow_steps.len();
    let step = index + 1;
    let percent = ((step * 100) / total_steps) as u8;
    Some(WorkflowProgress {
        step,
        total_steps,
        percent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TradeTypeCatalog;
    use proptest::prelude::*;
    use tradedesk_contracts::TradeType;
    use ContractLifecycleState::*;

    #[test]
    fn next_state_follows_trade_type_path() {
        let catalog = TradeTypeCatalog::default();
        assert_eq!(catalog.next_state(Approved, TradeType::Normal), Some(Active));
        assert_eq!(
            catalog.next_state(Active, TradeType::Cci),
            Some(AwaitingQualityPassing)
        );
        assert_eq!(catalog.next_state(Active, TradeType::Normal), Some(AwaitingDelivery));
    }

    #[test]
    fn completed_and_branch_states_have_no_successor() {
        let catalog = TradeTypeCatalog::default();
        for trade_type in TradeType::ALL {
            assert_eq!(catalog.next_state(Completed, trade_type), None);
            for branch in [Disputed, Cancelled, ValidationFailed, Amended] {
                assert_eq!(catalog.next_state(branch, trade_type), None);
            }
        }
        // Normal trades never pass through quality states.
        assert_eq!(catalog.next_state(QualityPassed, TradeType::Normal), None);
    }

    #[test]
    fn strict_validator_accepts_workflow_and_branch_moves() {
        let config = TradeTypeConfig::cci_trade();
        assert!(validate_transition(Active, AwaitingQualityPassing, &config).is_ok());
        assert!(validate_transition(AwaitingDelivery, Disputed, &config).is_ok());
        assert!(validate_transition(Disputed, AwaitingDelivery, &config).is_ok());
        assert!(validate_transition(PendingValidation, ValidationFailed, &config).is_ok());
        assert!(validate_transition(ValidationFailed, PendingValidation, &config).is_ok());
    }

    #[test]
    fn strict_validator_rejects_skips_and_terminal_exits() {
        let config = TradeTypeConfig::normal_trade();
        assert!(validate_transition(Draft, Approved, &config).is_err());
        assert!(validate_transition(Active, AwaitingQualityPassing, &config).is_err());
        assert!(validate_transition(Completed, Disputed, &config).is_err());
        assert!(validate_transition(Cancelled, Draft, &config).is_err());
        assert!(validate_transition(Paid, Paid, &config).is_err());
    }

    #[test]
    fn progress_reports_step_position() {
        let config = TradeTypeConfig::normal_trade();
        let p = workflow_progress(Draft, &config).unwrap();
        assert_eq!((p.step, p.total_steps), (1, 12));
        assert_eq!(workflow_progress(Completed, &config).unwrap().percent, 100);
        assert!(workflow_progress(Disputed, &config).is_none());
    }

    #[test]
    fn next_walks_the_whole_path() {
        for config in [TradeTypeConfig::normal_trade(), TradeTypeConfig::cci_trade()] {
            let mut visited = vec![config.workflow_steps[0]];
            while let Some(next) = next_lifecycle_state(*visited.last().unwrap(), &config) {
                assert!(visited.len() <= config.workflow_steps.len());
                visited.push(next);
            }
            assert_eq!(visited, config.workflow_steps);
        }
    }

    proptest! {
        /// Property: the successor of step `i` is step `i + 1`, and only the
        /// last step has none.
        #[test]
        fn successor_is_purely_positional(index in 0usize..14) {
            let config = TradeTypeConfig::cci_trade();
            let current = config.workflow_steps[index];
            let expected = config.workflow_steps.get(index + 1).copied();
            prop_assert_eq!(next_lifecycle_state(current, &config), expected);
        }
    }
}
