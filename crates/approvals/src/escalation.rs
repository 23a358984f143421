//! Escalations: exceptions routed to a responsible role.
//!
//! Rule-driven escalations come from `required_escalations`; anything else
//! (including `Critical` ones) is raised with `Escalation::manual`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradedesk_contracts::ContractSnapshot;
use tradedesk_core::{
    ContractId, DomainError, DomainResult, Entity, EscalationId, Role, require_text,
};
use tradedesk_rules::{RuleAction, RuleEvaluationResult, RuleSeverity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationType {
    Exception,
    ApprovalRequired,
    ManualReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// `Open → InProgress → Resolved → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Escalation {
    pub id: EscalationId,
    pub contract_id: ContractId,
    #[serde(rename = "type")]
    pub escalation_type: EscalationType,
    pub severity: EscalationSeverity,
    pub description: String,
    pub escalated_to: Role,
    pub escalated_at: DateTime<Utc>,
    pub status: EscalationStatus,
    /// Rule that raised this escalation; `None` for manual ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Fixed mapping; rule severities never map to `Critical`.
pub fn severity_for(rule_severity: RuleSeverity) -> EscalationSeverity {
    match rule_severity {
        RuleSeverity::Error => EscalationSeverity::High,
        RuleSeverity::Warning => EscalationSeverity::Medium,
        RuleSeverity::Info => EscalationSeverity::Low,
    }
}

/// One open escalation per rule that fired with `Escalate` and names a role.
pub fn required_escalations(
    contract: &ContractSnapshot,
    results: &[RuleEvaluationResult],
    at: DateTime<Utc>,
) -> Vec<Escalation> {
    results
        .iter()
        .filter(|r| r.fired_with(RuleAction::Escalate))
        .filter_map(|r| {
            let role = r.escalate_to.as_ref().filter(|role| !role.is_blank())?;
            Some(Escalation {
                id: EscalationId::new(),
                contract_id: contract.id.clone(),
                escalation_type: EscalationType::ApprovalRequired,
                severity: severity_for(r.severity),
                description: r.message.clone(),
                escalated_to: role.clone(),
                escalated_at: at,
                status: EscalationStatus::Open,
                rule_id: Some(r.rule_id.clone()),
                resolved_by: None,
                resolved_at: None,
                resolution: None,
            })
        })
        .collect()
}

impl Escalation {
    /// Raise an escalation outside rule evaluation.
    pub fn manual(
        contract_id: ContractId,
        escalation_type: EscalationType,
        severity: EscalationSeverity,
        description: impl Into<String>,
        escalated_to: Role,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EscalationId::new(),
            contract_id,
            escalation_type,
            severity,
            description: description.into(),
            escalated_to,
            escalated_at: at,
            status: EscalationStatus::Open,
            rule_id: None,
            resolved_by: None,
            resolved_at: None,
            resolution: None,
        }
    }

    /// Open or in progress.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            EscalationStatus::Open | EscalationStatus::InProgress
        )
    }

    /// Someone in the role picked it up.
    pub fn acknowledge(&self) -> DomainResult<Self> {
        if self.status != EscalationStatus::Open {
            return Err(DomainError::invariant(format!(
                "cannot acknowledge escalation in status {:?}",
                self.status
            )));
        }
        Ok(Self {
            status: EscalationStatus::InProgress,
            ..self.clone()
        })
    }

    pub fn resolve(
        &self,
        resolved_by: impl Into<String>,
        resolution: impl Into<String>,
        at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let resolution = resolution.into();
        require_text("resolution", &resolution)?;
        if !self.is_open() {
            return Err(DomainError::invariant(format!(
                "cannot resolve escalation in status {:?}",
                self.status
            )));
        }
        Ok(Self {
            status: EscalationStatus::Resolved,
            resolved_by: Some(resolved_by.into()),
            resolved_at: Some(at),
            resolution: Some(resolution),
            ..self.clone()
        })
    }

    /// Closed copy. Only meaningful from `Resolved`; the caller enforces that.
    pub fn close(&self) -> Self {
        Self {
            status: EscalationStatus::Closed,
            ..self.clone()
        }
    }
}

impl Entity for Escalation {
    type Id = EscalationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Escalations routed to `role`.
pub fn escalations_for_role<'a>(escalations: &'a [Escalation], role: &Role) -> Vec<&'a Escalation> {
    escalations
        .iter()
        .filter(|e| &e.escalated_to == role)
        .collect()
}

pub fn open_escalations(escalations: &[Escalation]) -> Vec<&Escalation> {
    escalations.iter().filter(|e| e.is_open()).collect()
}
