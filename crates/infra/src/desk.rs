//! Contract desk: the service layer over the engine.
//!
//! ```text
//! load contract ─▶ evaluate rules ─▶ apply approved overrides ─▶ decision
//!                                  └▶ raise escalations ─▶ notices
//! ```
//!
//! The engine crates are pure. Everything that needs a guard against
//! concurrent or repeated callers lives here: one open override per
//! (contract, rule), approve/reject only from `Pending`, close only from
//! `Resolved`, no duplicate open escalation per rule, and optimistic
//! concurrency on the lifecycle log.
//!
//! Each guard runs load → check → write under a per-contract lock, so
//! callers sharing one desk are serialized per contract. Desks in separate
//! processes rely on the repository's own version checks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use tradedesk_approvals::{
    Escalation, EscalationSeverity, EscalationStatus, EscalationType, OverrideRequest,
    required_escalations,
};
use tradedesk_contracts::{ContractLifecycleState, ContractSnapshot};
use tradedesk_core::{
    ContractId, DomainError, EscalationId, ExpectedVersion, NotificationId, OverrideId, Role,
};
use tradedesk_lifecycle::{
    LifecycleEvent, LifecycleTimeline, TradeTypeConfig, WorkflowProgress, next_lifecycle_state,
    transition_state, validate_transition, workflow_progress,
};
use tradedesk_notifications::{
    AutomatedNotification, escalation_notice, generate_automated_reminders,
    suppress_already_scheduled,
};
use tradedesk_rules::{Decision, RuleAction, RuleEvaluationResult};
use tradedesk_transparency::{TradeCycleStatus, trade_cycle_status};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::repository::{ContractRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum DeskError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate open request, or a record no longer in the expected status.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stale expected version on the lifecycle log.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    #[error("storage failure: {0}")]
    Storage(RepositoryError),
}

pub type DeskResult<T> = Result<T, DeskError>;

impl From<RepositoryError> for DeskError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound(msg) => DeskError::NotFound(msg),
            RepositoryError::Concurrency(msg) => DeskError::Concurrency(msg),
            other => DeskError::Storage(other),
        }
    }
}

impl From<DomainError> for DeskError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                DeskError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) => DeskError::InvariantViolation(msg),
            DomainError::NotFound(msg) => DeskError::NotFound(msg),
            DomainError::Conflict(msg) => DeskError::Conflict(msg),
        }
    }
}

/// Outcome of one evaluation pass over a stored contract.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub contract_id: ContractId,
    /// Results after approved overrides were applied.
    pub results: Vec<RuleEvaluationResult>,
    pub decision: Decision,
    /// Rule ids whose failure was bypassed by an approved override.
    pub overridden_rules: Vec<String>,
    /// Escalations raised by this pass (already open ones are not repeated).
    pub raised_escalations: Vec<Escalation>,
    pub notices: Vec<AutomatedNotification>,
}

/// Report fired `Block` results covered by an approved override as passed.
///
/// Returns the adjusted results and the ids of the rules that were bypassed.
pub fn apply_overrides(
    results: Vec<RuleEvaluationResult>,
    overrides: &[OverrideRequest],
) -> (Vec<RuleEvaluationResult>, Vec<String>) {
    let mut bypassed = Vec::new();
    let adjusted = results
        .into_iter()
        .map(|mut r| {
            let approved = overrides
                .iter()
                .any(|o| o.is_approved() && o.rule_id == r.rule_id);
            if approved && r.fired_with(RuleAction::Block) {
                bypassed.push(r.rule_id.clone());
                r.passed = true;
                r.requires_override = false;
                r.message = format!("{} - overridden", r.rule_name);
                r.escalate_to = None;
                r.compensating_action = None;
            }
            r
        })
        .collect();
    (adjusted, bypassed)
}

/// Write locks keyed by contract.
#[derive(Debug, Default)]
struct ContractLocks {
    locks: Mutex<HashMap<ContractId, Arc<Mutex<()>>>>,
}

impl ContractLocks {
    fn handle(&self, contract_id: &ContractId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(contract_id.clone()).or_default().clone()
    }
}

pub struct ContractDesk<R: ContractRepository> {
    repository: R,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    locks: ContractLocks,
}

impl<R: ContractRepository> ContractDesk<R> {
    pub fn new(repository: R, config: EngineConfig) -> Self {
        Self {
            repository,
            config,
            clock: Arc::new(SystemClock),
            locks: ContractLocks::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Run `f` while holding the contract's write lock.
    fn serialized<T>(
        &self,
        contract_id: &ContractId,
        f: impl FnOnce() -> DeskResult<T>,
    ) -> DeskResult<T> {
        let lock = self.locks.handle(contract_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    fn trade_config(&self, contract: &ContractSnapshot) -> DeskResult<&TradeTypeConfig> {
        self.config
            .trade_types
            .get(contract.trade_type)
            .ok_or_else(|| {
                DeskError::NotFound(format!("workflow for trade type {}", contract.trade_type))
            })
    }

    fn effective_results(
        &self,
        contract: &ContractSnapshot,
    ) -> DeskResult<(Vec<RuleEvaluationResult>, Vec<String>)> {
        let results = self.config.rules.evaluate(contract);
        let overrides = self.repository.overrides(&contract.id)?;
        Ok(apply_overrides(results, &overrides))
    }

    // -- rules -------------------------------------------------------------

    /// Evaluate a stored contract, raise any new escalations and queue their notices.
    pub fn evaluate_contract(&self, contract_id: &ContractId) -> DeskResult<EvaluationReport> {
        self.serialized(contract_id, || {
            let contract = self.repository.load_contract(contract_id)?;
            let now = self.now();
            let (results, overridden_rules) = self.effective_results(&contract)?;
            let decision = Decision::from_results(&results);

            let existing = self.repository.escalations(contract_id)?;
            let raised: Vec<Escalation> = required_escalations(&contract, &results, now)
                .into_iter()
                .filter(|e| {
                    !existing
                        .iter()
                        .any(|open| open.is_open() && open.rule_id == e.rule_id)
                })
                .collect();

            let notices: Vec<AutomatedNotification> =
                raised.iter().map(|e| escalation_notice(e, now)).collect();

            for escalation in &raised {
                self.repository.upsert_escalation(escalation.clone())?;
            }
            self.repository.record_notifications(notices.clone())?;

            tracing::info!(
                contract_id = %contract_id,
                verdict = ?decision.verdict,
                overridden = overridden_rules.len(),
                escalations_raised = raised.len(),
                "contract evaluated"
            );

            Ok(EvaluationReport {
                contract_id: contract_id.clone(),
                results,
                decision,
                overridden_rules,
                raised_escalations: raised,
                notices,
            })
        })
    }

    // -- lifecycle ---------------------------------------------------------

    /// Record a lifecycle move and update the stored contract status.
    ///
    /// With `strict_transitions` the move must pass `validate_transition`.
    /// The event is flagged `overridden` when an approved override is what
    /// keeps the contract from being blocked.
    pub fn transition(
        &self,
        contract_id: &ContractId,
        to_state: ContractLifecycleState,
        actor: &str,
        reason: &str,
        automated: bool,
        expected: ExpectedVersion,
    ) -> DeskResult<LifecycleEvent> {
        self.serialized(contract_id, || {
            let contract = self.repository.load_contract(contract_id)?;
            let config = self.trade_config(&contract)?;

            if self.config.strict_transitions {
                if let Err(e) = validate_transition(contract.status, to_state, config) {
                    tracing::warn!(
                        contract_id = %contract_id,
                        from = %contract.status,
                        to = %to_state,
                        error = %e,
                        "transition rejected"
                    );
                    return Err(e.into());
                }
            }

            let events = self.repository.events(contract_id)?;
            let mut timeline = LifecycleTimeline::from_events(contract_id.clone(), events)?;
            expected
                .check(timeline.version())
                .map_err(|e| DeskError::Concurrency(e.to_string()))?;

            let (_, overridden_rules) = self.effective_results(&contract)?;
            let mut event =
                transition_state(&contract, to_state, actor, reason, automated, self.now());
            if !overridden_rules.is_empty() {
                event = event
                    .mark_overridden()
                    .with_metadata(json!({ "overriddenRules": overridden_rules }));
            }
            timeline.append(event.clone())?;

            // Status first; a failed append puts the previous status back.
            self.repository
                .save_contract(contract.clone().with_status(to_state))?;
            let appended = self
                .repository
                .append_event(event.clone(), ExpectedVersion::Exact(timeline.version() - 1));
            if let Err(err) = appended {
                if let Err(restore) = self.repository.save_contract(contract) {
                    tracing::error!(
                        contract_id = %contract_id,
                        error = %restore,
                        "failed to restore contract status after rejected lifecycle append"
                    );
                }
                return Err(err.into());
            }

            tracing::info!(
                contract_id = %contract_id,
                from = ?event.from_state,
                to = %to_state,
                actor = %actor,
                automated,
                "lifecycle transition recorded"
            );
            Ok(event)
        })
    }

    /// Move to the positional next workflow step, if there is one.
    pub fn advance(
        &self,
        contract_id: &ContractId,
        actor: &str,
        reason: &str,
        expected: ExpectedVersion,
    ) -> DeskResult<Option<LifecycleEvent>> {
        match self.next_state(contract_id)? {
            Some(next) => self
                .transition(contract_id, next, actor, reason, true, expected)
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn next_state(
        &self,
        contract_id: &ContractId,
    ) -> DeskResult<Option<ContractLifecycleState>> {
        let contract = self.repository.load_contract(contract_id)?;
        Ok(next_lifecycle_state(contract.status, self.trade_config(&contract)?))
    }

    pub fn timeline(&self, contract_id: &ContractId) -> DeskResult<LifecycleTimeline> {
        let events = self.repository.events(contract_id)?;
        Ok(LifecycleTimeline::from_events(contract_id.clone(), events)?)
    }

    pub fn progress(&self, contract_id: &ContractId) -> DeskResult<Option<WorkflowProgress>> {
        let contract = self.repository.load_contract(contract_id)?;
        Ok(workflow_progress(contract.status, self.trade_config(&contract)?))
    }

    // -- overrides ---------------------------------------------------------

    pub fn request_override(
        &self,
        contract_id: &ContractId,
        rule_id: &str,
        requested_by: &str,
        reason: &str,
    ) -> DeskResult<OverrideRequest> {
        let rule = self
            .config
            .rules
            .get(rule_id)
            .ok_or_else(|| DeskError::NotFound(format!("rule {rule_id}")))?;

        self.serialized(contract_id, || {
            self.repository.load_contract(contract_id)?;
            let open = self
                .repository
                .overrides(contract_id)?
                .into_iter()
                .any(|o| o.is_pending() && o.rule_id == rule_id);
            if open {
                return Err(DeskError::Conflict(format!(
                    "an override for rule {rule_id} on {contract_id} is already pending"
                )));
            }

            let request = tradedesk_approvals::create_override_request(
                contract_id.clone(),
                rule.id.clone(),
                rule.name.clone(),
                requested_by,
                reason,
                self.now(),
            );
            self.repository.upsert_override(request.clone())?;
            tracing::info!(
                contract_id = %contract_id,
                rule_id,
                override_id = %request.id,
                "override requested"
            );
            Ok(request)
        })
    }

    /// Apply `decide` to a still-pending override under its contract's lock.
    fn settle_override(
        &self,
        id: &OverrideId,
        decide: impl FnOnce(OverrideRequest) -> DeskResult<OverrideRequest>,
    ) -> DeskResult<OverrideRequest> {
        let contract_id = self.repository.load_override(id)?.contract_id;
        self.serialized(&contract_id, || {
            let request = self.repository.load_override(id)?;
            if !request.is_pending() {
                return Err(DeskError::Conflict(format!(
                    "override {id} is already {:?}",
                    request.status
                )));
            }
            let settled = decide(request)?;
            self.repository.upsert_override(settled.clone())?;
            Ok(settled)
        })
    }

    pub fn approve_override(
        &self,
        id: &OverrideId,
        approved_by: &str,
    ) -> DeskResult<OverrideRequest> {
        let now = self.now();
        let approved = self.settle_override(id, |r| Ok(r.approve(approved_by, now)))?;
        tracing::info!(
            override_id = %id,
            rule_id = %approved.rule_id,
            approved_by,
            "override approved"
        );
        Ok(approved)
    }

    pub fn reject_override(&self, id: &OverrideId, reason: &str) -> DeskResult<OverrideRequest> {
        let rejected = self.settle_override(id, |r| Ok(r.reject(reason)?))?;
        tracing::info!(override_id = %id, rule_id = %rejected.rule_id, "override rejected");
        Ok(rejected)
    }

    // -- escalations -------------------------------------------------------

    pub fn raise_escalation(
        &self,
        contract_id: &ContractId,
        escalation_type: EscalationType,
        severity: EscalationSeverity,
        description: &str,
        escalated_to: Role,
    ) -> DeskResult<Escalation> {
        tradedesk_core::require_text("description", description)?;
        self.serialized(contract_id, || {
            self.repository.load_contract(contract_id)?;
            let now = self.now();
            let escalation = Escalation::manual(
                contract_id.clone(),
                escalation_type,
                severity,
                description,
                escalated_to,
                now,
            );
            self.repository.upsert_escalation(escalation.clone())?;
            self.repository
                .record_notifications(vec![escalation_notice(&escalation, now)])?;
            Ok(escalation)
        })
    }

    /// Apply `step` to the stored escalation under its contract's lock.
    fn update_escalation(
        &self,
        id: &EscalationId,
        step: impl FnOnce(Escalation) -> DeskResult<Escalation>,
    ) -> DeskResult<Escalation> {
        let contract_id = self.repository.load_escalation(id)?.contract_id;
        self.serialized(&contract_id, || {
            let updated = step(self.repository.load_escalation(id)?)?;
            self.repository.upsert_escalation(updated.clone())?;
            Ok(updated)
        })
    }

    pub fn acknowledge_escalation(&self, id: &EscalationId) -> DeskResult<Escalation> {
        self.update_escalation(id, |e| Ok(e.acknowledge()?))
    }

    pub fn resolve_escalation(
        &self,
        id: &EscalationId,
        resolved_by: &str,
        resolution: &str,
    ) -> DeskResult<Escalation> {
        let now = self.now();
        let resolved =
            self.update_escalation(id, |e| Ok(e.resolve(resolved_by, resolution, now)?))?;
        tracing::info!(escalation_id = %id, resolved_by, "escalation resolved");
        Ok(resolved)
    }

    pub fn close_escalation(&self, id: &EscalationId) -> DeskResult<Escalation> {
        self.update_escalation(id, |e| {
            if e.status != EscalationStatus::Resolved {
                return Err(DeskError::Conflict(format!(
                    "escalation {id} is {:?}, only resolved escalations can be closed",
                    e.status
                )));
            }
            Ok(e.close())
        })
    }

    // -- reminders ---------------------------------------------------------

    /// Generate and store reminders for the contract's current state.
    pub fn schedule_reminders(
        &self,
        contract_id: &ContractId,
        due_date: DateTime<Utc>,
    ) -> DeskResult<Vec<AutomatedNotification>> {
        self.serialized(contract_id, || {
            let contract = self.repository.load_contract(contract_id)?;
            let config = self.trade_config(&contract)?;

            let mut reminders = generate_automated_reminders(
                contract_id,
                config,
                contract.status,
                due_date,
                &contract.buyer,
                &contract.seller,
                self.now(),
            );
            if self.config.suppress_repeat_reminders {
                let history = self.repository.notifications(contract_id)?;
                reminders = suppress_already_scheduled(reminders, &history);
            }

            self.repository.record_notifications(reminders.clone())?;
            tracing::debug!(
                contract_id = %contract_id,
                scheduled = reminders.len(),
                "reminders scheduled"
            );
            Ok(reminders)
        })
    }

    /// Report the delivery outcome of a scheduled notification.
    pub fn settle_notification(
        &self,
        contract_id: &ContractId,
        id: &NotificationId,
        delivered: bool,
    ) -> DeskResult<AutomatedNotification> {
        self.serialized(contract_id, || {
            let notification = self
                .repository
                .notifications(contract_id)?
                .into_iter()
                .find(|n| &n.id == id)
                .ok_or_else(|| DeskError::NotFound(format!("notification {id}")))?;

            let settled = if delivered {
                notification.mark_sent()?
            } else {
                notification.mark_failed()?
            };
            self.repository.record_notifications(vec![settled.clone()])?;
            Ok(settled)
        })
    }

    // -- transparency ------------------------------------------------------

    pub fn trade_cycle(&self, contract_id: &ContractId) -> DeskResult<TradeCycleStatus> {
        let contract = self.repository.load_contract(contract_id)?;
        Ok(trade_cycle_status(
            &contract,
            &self.repository.invoices(contract_id)?,
            &self.repository.payments(contract_id)?,
            &self.repository.deliveries(contract_id)?,
            &self.repository.disputes(contract_id)?,
        ))
    }
}
