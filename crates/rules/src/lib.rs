//! Business rule catalog, evaluator and decision classifier.
//!
//! Everything here is deterministic over a caller-supplied contract snapshot:
//! no IO, no clocks, no shared state. A failing rule is an evaluation result,
//! never an error.

pub mod catalog;
pub mod decision;
pub mod evaluator;
pub mod resolver;
pub mod rule;

pub use catalog::RuleCatalog;
pub use decision::{
    Decision, Verdict, can_auto_approve, can_proceed, requires_manual_approval,
};
pub use evaluator::{RuleEvaluationResult, evaluate, evaluate_rule};
pub use resolver::{ConditionOutcome, Resolution, check_condition, resolve};
pub use rule::{BusinessRule, ConditionOperator, RuleAction, RuleCondition, RuleSeverity, RuleType};
