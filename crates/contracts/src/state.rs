use serde::{Deserialize, Serialize};

/// Contract lifecycle state.
///
/// Workflow states appear in a trade type's `workflow_steps`. Branch states
/// (`Disputed`, `Cancelled`, `Amended`, `ValidationFailed`) never do; they are
/// entered and left by explicit decision only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractLifecycleState {
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
    Disputed,
    Cancelled,
    Amended,
    ValidationFailed,
}

impl ContractLifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingValidation => "PENDING_VALIDATION",
            Self::PendingApproval => "PENDING_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Active => "ACTIVE",
            Self::AwaitingQualityPassing => "AWAITING_QUALITY_PASSING",
            Self::QualityPassed => "QUALITY_PASSED",
            Self::AwaitingDelivery => "AWAITING_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Invoiced => "INVOICED",
            Self::AwaitingPayment => "AWAITING_PAYMENT",
            Self::Paid => "PAID",
            Self::Reconciled => "RECONCILED",
            Self::Completed => "COMPLETED",
            Self::Disputed => "DISPUTED",
            Self::Cancelled => "CANCELLED",
            Self::Amended => "AMENDED",
            Self::ValidationFailed => "VALIDATION_FAILED",
        }
    }

    /// States that live outside every workflow path.
    pub fn is_branch(&self) -> bool {
        matches!(
            self,
            Self::Disputed | Self::Cancelled | Self::Amended | Self::ValidationFailed
        )
    }

    /// No further movement is expected from these.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Reconciled or completed contracts count as settled for transparency views.
    pub fn is_reconciled(&self) -> bool {
        matches!(self, Self::Reconciled | Self::Completed)
    }
}

impl core::fmt::Display for ContractLifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
