//! Reminder scheduling.
//!
//! The scheduler only decides that a notification should exist. Delivery over
//! a channel belongs to a transport outside this workspace, which reports back
//! through `mark_sent` / `mark_failed`.

pub mod notification;
pub mod scheduler;

pub use notification::{
    AutomatedNotification, Channel, NotificationStatus, NotificationType, RecipientType,
};
pub use scheduler::{
    days_until_due, escalation_notice, generate_automated_reminders, suppress_already_scheduled,
};
