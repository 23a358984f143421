use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradedesk_core::{ContractId, DomainError, DomainResult, Entity, NotificationId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    PaymentDue,
    DeliveryPending,
    QualityCheckRequired,
    EscalationRaised,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecipientType {
    Buyer,
    Seller,
    Admin,
    BothParties,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Channel {
    Chat,
    Email,
    Dashboard,
    Sms,
    #[serde(rename = "WHATSAPP")]
    WhatsApp,
}

/// `Scheduled` moves once, to `Sent`, `Failed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Scheduled,
    Sent,
    Failed,
    Cancelled,
}

/// Intent to notify someone about a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomatedNotification {
    pub id: NotificationId,
    pub contract_id: ContractId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub recipient: String,
    pub recipient_type: RecipientType,
    pub channels: Vec<Channel>,
    pub message: String,
    pub scheduled_at: DateTime<Utc>,
    pub status: NotificationStatus,
    /// Reminder threshold that produced this notification, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold_days: Option<i64>,
}

impl AutomatedNotification {
    pub fn scheduled(
        contract_id: ContractId,
        notification_type: NotificationType,
        recipient: impl Into<String>,
        recipient_type: RecipientType,
        channels: Vec<Channel>,
        message: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            contract_id,
            notification_type,
            recipient: recipient.into(),
            recipient_type,
            channels,
            message: message.into(),
            scheduled_at: at,
            status: NotificationStatus::Scheduled,
            threshold_days: None,
        }
    }

    pub fn with_threshold(mut self, days: i64) -> Self {
        self.threshold_days = Some(days);
        self
    }

    pub fn is_scheduled(&self) -> bool {
        self.status == NotificationStatus::Scheduled
    }

    pub fn mark_sent(&self) -> DomainResult<Self> {
        self.settle(NotificationStatus::Sent)
    }

    pub fn mark_failed(&self) -> DomainResult<Self> {
        self.settle(NotificationStatus::Failed)
    }

    pub fn cancel(&self) -> DomainResult<Self> {
        self.settle(NotificationStatus::Cancelled)
    }

    fn settle(&self, status: NotificationStatus) -> DomainResult<Self> {
        if !self.is_scheduled() {
            return Err(DomainError::invariant(format!(
                "notification {} is already {:?}",
                self.id, self.status
            )));
        }
        Ok(Self {
            status,
            ..self.clone()
        })
    }
}

impl Entity for AutomatedNotification {
    type Id = NotificationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_notification() -> AutomatedNotification {
        AutomatedNotification::scheduled(
            ContractId::new("TC-1"),
            NotificationType::PaymentDue,
            "B-1",
            RecipientType::Buyer,
            vec![Channel::Chat, Channel::Email],
            "pay up",
            Utc::now(),
        )
    }

    #[test]
    fn settles_only_from_scheduled() {
        let sent = test_notification().mark_sent().unwrap();
        assert_eq!(sent.status, NotificationStatus::Sent);
        assert!(sent.mark_failed().is_err());
        assert!(sent.cancel().is_err());

        let cancelled = test_notification().cancel().unwrap();
        assert!(cancelled.mark_sent().is_err());
    }

    #[test]
    fn serializes_with_wire_literals() {
        let doc = serde_json::to_value(test_notification().with_threshold(3)).unwrap();
        assert_eq!(doc["type"], json!("PAYMENT_DUE"));
        assert_eq!(doc["recipientType"], json!("BUYER"));
        assert_eq!(doc["channels"], json!(["CHAT", "EMAIL"]));
        assert_eq!(doc["status"], json!("SCHEDULED"));
        assert_eq!(doc["thresholdDays"], json!(3));
    }
}
