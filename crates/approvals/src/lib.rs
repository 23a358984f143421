//! Override and escalation workflows.
//!
//! Both records are immutable values: every state change returns a new record
//! for the caller to store. Neither module arbitrates concurrent writers or
//! deduplicates requests; the calling layer does that.

pub mod escalation;
pub mod overrides;

pub use escalation::{
    Escalation, EscalationSeverity, EscalationStatus, EscalationType, escalations_for_role,
    open_escalations, required_escalations, severity_for,
};
pub use overrides::{OverrideRequest, OverrideStatus, create_override_request};
