//! Verdicts derived from evaluator output.
//!
//! Precedence: a fired `Block` dominates a fired `Escalate`, which dominates a
//! passing `AutoApprove`. `Warn` never changes a verdict.

use serde::{Deserialize, Serialize};

use crate::evaluator::RuleEvaluationResult;
use crate::rule::RuleAction;

/// False iff some rule fired with `Block`.
pub fn can_proceed(results: &[RuleEvaluationResult]) -> bool {
    !results.iter().any(|r| r.fired_with(RuleAction::Block))
}

/// True iff some rule fired with `Escalate`.
pub fn requires_manual_approval(results: &[RuleEvaluationResult]) -> bool {
    results.iter().any(|r| r.fired_with(RuleAction::Escalate))
}

/// True iff some `AutoApprove` rule passed and nothing fired with `Block` or
/// `Escalate`.
pub fn can_auto_approve(results: &[RuleEvaluationResult]) -> bool {
    let has_auto_approval = results
        .iter()
        .any(|r| r.passed && r.action == RuleAction::AutoApprove);
    has_auto_approval && can_proceed(results) && !requires_manual_approval(results)
}

/// Single verdict for UI badges and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Blocked,
    NeedsApproval,
    AutoApproved,
    Proceed,
}

/// Decision summary over one evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub verdict: Verdict,
    pub can_proceed: bool,
    pub requires_manual_approval: bool,
    pub can_auto_approve: bool,
    /// Ids of rules that fired with `Block`.
    pub blocking_rules: Vec<String>,
    /// Ids of rules that fired with `Escalate`.
    pub escalation_rules: Vec<String>,
    /// Ids of rules that fired with `Warn`.
    pub warnings: Vec<String>,
}

impl Decision {
    pub fn from_results(results: &[RuleEvaluationResult]) -> Self {
        let can_proceed = can_proceed(results);
        let requires_manual_approval = requires_manual_approval(results);
        let can_auto_approve = can_auto_approve(results);

        let verdict = if !can_proceed {
            Verdict::Blocked
        } else if requires_manual_approval {
            Verdict::NeedsApproval
        } else if can_auto_approve {
            Verdict::AutoApproved
        } else {
            Verdict::Proceed
        };

        let ids_fired_with = |action: RuleAction| -> Vec<String> {
            results
                .iter()
                .filter(|r| r.fired_with(action))
                .map(|r| r.rule_id.clone())
                .collect()
        };

        Self {
            verdict,
            can_proceed,
            requires_manual_approval,
            can_auto_approve,
            blocking_rules: ids_fired_with(RuleAction::Block),
            escalation_rules: ids_fired_with(RuleAction::Escalate),
            warnings: ids_fired_with(RuleAction::Warn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{RuleSeverity, RuleType};
    use proptest::prelude::*;

    fn result(id: &str, passed: bool, action: RuleAction) -> RuleEvaluationResult {
        RuleEvaluationResult {
            rule_id: id.to_string(),
            rule_name: id.to_string(),
            rule_type: RuleType::Validation,
            passed,
            severity: RuleSeverity::Warning,
            message: String::new(),
            action,
            requires_override: !passed && action == RuleAction::Block,
            escalate_to: None,
            compensating_action: None,
            unresolved: Vec::new(),
        }
    }

    #[test]
    fn empty_results_can_proceed() {
        assert!(can_proceed(&[]));
        assert!(!requires_manual_approval(&[]));
        assert!(!can_auto_approve(&[]));
        assert_eq!(Decision::from_results(&[]).verdict, Verdict::Proceed);
    }

    #[test]
    fn passing_block_rule_does_not_stop_proceeding() {
        assert!(can_proceed(&[result("a", true, RuleAction::Block)]));
        assert!(!can_proceed(&[result("a", false, RuleAction::Block)]));
    }

    #[test]
    fn auto_approve_requires_passing_rule_and_no_block_or_escalate() {
        let auto = result("auto", true, RuleAction::AutoApprove);
        let block = result("block", false, RuleAction::Block);
        let escalate = result("esc", false, RuleAction::Escalate);

        // passing auto-approve, nothing else
        assert!(can_auto_approve(&[auto.clone()]));
        // passing auto-approve + fired block
        assert!(!can_auto_approve(&[auto.clone(), block.clone()]));
        // passing auto-approve + fired escalate
        assert!(!can_auto_approve(&[auto.clone(), escalate.clone()]));
        // no passing auto-approve at all
        assert!(!can_auto_approve(&[result("auto", false, RuleAction::AutoApprove)]));
    }

    #[test]
    fn warnings_never_change_verdicts() {
        let results = vec![
            result("auto", true, RuleAction::AutoApprove),
            result("warn", false, RuleAction::Warn),
        ];
        let decision = Decision::from_results(&results);
        assert_eq!(decision.verdict, Verdict::AutoApproved);
        assert_eq!(decision.warnings, vec!["warn".to_string()]);
    }

    #[test]
    fn block_dominates_escalate() {
        let results = vec![
            result("esc", false, RuleAction::Escalate),
            result("block", false, RuleAction::Block),
        ];
        let decision = Decision::from_results(&results);
        assert_eq!(decision.verdict, Verdict::Blocked);
        assert!(decision.requires_manual_approval);
        assert_eq!(decision.blocking_rules, vec!["block".to_string()]);
        assert_eq!(decision.escalation_rules, vec!["esc".to_string()]);
    }

    fn action_strategy() -> impl Strategy<Value = RuleAction> {
        prop_oneof![
            Just(RuleAction::Block),
            Just(RuleAction::Warn),
            Just(RuleAction::AutoApprove),
            Just(RuleAction::Escalate),
        ]
    }

    proptest! {
        /// Property: `can_proceed` is false exactly when a fired Block exists,
        /// and auto-approval never coexists with a block or an escalation.
        #[test]
        fn verdict_precedence_holds(
            entries in prop::collection::vec((any::<bool>(), action_strategy()), 0..12)
        ) {
            let results: Vec<_> = entries
                .iter()
                .enumerate()
                .map(|(i, (passed, action))| result(&i.to_string(), *passed, *action))
                .collect();

            let fired_block = entries.iter().any(|(p, a)| !p && *a == RuleAction::Block);
            prop_assert_eq!(can_proceed(&results), !fired_block);

            if can_auto_approve(&results) {
                prop_assert!(can_proceed(&results));
                prop_assert!(!requires_manual_approval(&results));
            }
        }
    }
}
