use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradedesk_core::{ContractId, DomainResult, Entity, OverrideId, require_text};
use tradedesk_rules::RuleEvaluationResult;

/// `Pending` moves once, to `Approved` or `Rejected`; both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverrideStatus {
    Pending,
    Approved,
    Rejected,
}

/// A logged request to bypass one blocking rule for one contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub id: OverrideId,
    pub contract_id: ContractId,
    pub rule_id: String,
    pub rule_name: String,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub reason: String,
    pub status: OverrideStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

pub fn create_override_request(
    contract_id: ContractId,
    rule_id: impl Into<String>,
    rule_name: impl Into<String>,
    requested_by: impl Into<String>,
    reason: impl Into<String>,
    at: DateTime<Utc>,
) -> OverrideRequest {
    OverrideRequest {
        id: OverrideId::new(),
        contract_id,
        rule_id: rule_id.into(),
        rule_name: rule_name.into(),
        requested_by: requested_by.into(),
        requested_at: at,
        reason: reason.into(),
        status: OverrideStatus::Pending,
        approved_by: None,
        approved_at: None,
        rejection_reason: None,
    }
}

impl OverrideRequest {
    /// Request an override of the rule behind a failing evaluation result.
    pub fn for_result(
        contract_id: ContractId,
        result: &RuleEvaluationResult,
        requested_by: impl Into<String>,
        reason: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        create_override_request(
            contract_id,
            result.rule_id.clone(),
            result.rule_name.clone(),
            requested_by,
            reason,
            at,
        )
    }

    pub fn is_pending(&self) -> bool {
        self.status == OverrideStatus::Pending
    }

    pub fn is_approved(&self) -> bool {
        self.status == OverrideStatus::Approved
    }

    /// Approved copy of this request.
    ///
    /// Does not check the current status: a second approval must be refused
    /// by the caller before it gets here.
    pub fn approve(&self, approved_by: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: OverrideStatus::Approved,
            approved_by: Some(approved_by.into()),
            approved_at: Some(at),
            ..self.clone()
        }
    }

    /// Rejected copy of this request. The reason must not be blank.
    pub fn reject(&self, rejection_reason: impl Into<String>) -> DomainResult<Self> {
        let rejection_reason = rejection_reason.into();
        require_text("rejection reason", &rejection_reason)?;
        Ok(Self {
            status: OverrideStatus::Rejected,
            rejection_reason: Some(rejection_reason),
            ..self.clone()
        })
    }
}

impl Entity for OverrideRequest {
    type Id = OverrideId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradedesk_core::DomainError;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn pending() -> OverrideRequest {
        create_override_request(
            ContractId::new("TC-5"),
            "cci-emd-required",
            "CCI EMD required",
            "trader.ravi",
            "EMD wired, bank confirmation pending",
            test_time(),
        )
    }

    #[test]
    fn new_request_is_pending() {
        let req = pending();
        assert_eq!(req.status, OverrideStatus::Pending);
        assert!(req.approved_by.is_none() && req.approved_at.is_none());
        assert!(req.rejection_reason.is_none());
    }

    #[test]
    fn approval_sets_approver_and_time() {
        let at = test_time();
        let approved = pending().approve("admin.meera", at);
        assert!(approved.is_approved());
        assert_eq!(approved.approved_by.as_deref(), Some("admin.meera"));
        assert_eq!(approved.approved_at, Some(at));
    }

    #[test]
    fn rejection_requires_reason() {
        let err = pending().reject("  ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let rejected = pending().reject("no bank proof").unwrap();
        assert_eq!(rejected.status, OverrideStatus::Rejected);
        assert_eq!(rejected.rejection_reason.as_deref(), Some("no bank proof"));
    }

    #[test]
    fn repeated_approval_is_not_guarded_here() {
        let first = pending().approve("admin.meera", test_time());
        let second = first.approve("admin.vikram", test_time());
        assert_eq!(second.approved_by.as_deref(), Some("admin.vikram"));
        assert_eq!(second.id, first.id);
    }

    #[test]
    fn wire_format_uses_camel_case_and_omits_unset_fields() {
        let doc = serde_json::to_value(pending()).unwrap();
        assert_eq!(doc["contractId"], serde_json::json!("TC-5"));
        assert_eq!(doc["ruleId"], serde_json::json!("cci-emd-required"));
        assert_eq!(doc["status"], serde_json::json!("PENDING"));
        assert!(doc.get("approvedBy").is_none());
        assert!(doc.get("rejectionReason").is_none());

        let rejected = pending().reject("no bank proof").unwrap();
        let doc = serde_json::to_value(&rejected).unwrap();
        assert_eq!(doc["status"], serde_json::json!("REJECTED"));
        assert_eq!(doc["rejectionReason"], serde_json::json!("no bank proof"));
        let back: OverrideRequest = serde_json::from_value(doc).unwrap();
        assert_eq!(back, rejected);
    }
}
