//! Ledger entries as supplied by finance and logistics. Read-only here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradedesk_core::ContractId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub contract_id: ContractId,
    /// Amount in smallest currency unit.
    pub amount: u64,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub contract_id: ContractId,
    /// Amount in smallest currency unit.
    pub amount: u64,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOrder {
    pub id: String,
    pub contract_id: ContractId,
    pub quantity_bales: u64,
    pub dispatched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisputeStatus {
    Open,
    UnderReview,
    Resolved,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dispute {
    pub id: String,
    pub contract_id: ContractId,
    pub reason: String,
    pub status: DisputeStatus,
    pub raised_at: DateTime<Utc>,
}

impl Dispute {
    pub fn is_open(&self) -> bool {
        matches!(self.status, DisputeStatus::Open | DisputeStatus::UnderReview)
    }
}
