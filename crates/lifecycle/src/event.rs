use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use tradedesk_contracts::{ContractLifecycleState, ContractSnapshot};
use tradedesk_core::{ContractId, LifecycleEventId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggeredBy {
    System,
    User,
}

/// One recorded state change. Append-only: never edited once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    pub id: LifecycleEventId,
    pub contract_id: ContractId,
    pub timestamp: DateTime<Utc>,
    pub from_state: Option<ContractLifecycleState>,
    pub to_state: ContractLifecycleState,
    pub triggered_by: TriggeredBy,
    pub actor: String,
    pub reason: String,
    pub automated: bool,
    /// Set when the move went through on an approved override.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub overridden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

impl LifecycleEvent {
    pub fn event_type(&self) -> &'static str {
        "contract.lifecycle.transitioned"
    }

    pub fn mark_overridden(mut self) -> Self {
        self.overridden = true;
        self
    }

    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Record a move of `contract` to `to_state`.
///
/// `from_state` is the contract's status at call time. No adjacency check is
/// made here; this is a logging constructor, not a guard.
pub fn transition_state(
    contract: &ContractSnapshot,
    to_state: ContractLifecycleState,
    actor: impl Into<String>,
    reason: impl Into<String>,
    automated: bool,
    at: DateTime<Utc>,
) -> LifecycleEvent {
    LifecycleEvent {
        id: LifecycleEventId::new(),
        contract_id: contract.id.clone(),
        timestamp: at,
        from_state: Some(contract.status),
        to_state,
        triggered_by: if automated {
            TriggeredBy::System
        } else {
            TriggeredBy::User
        },
        actor: actor.into(),
        reason: reason.into(),
        automated,
        overridden: false,
        metadata: None,
    }
}
