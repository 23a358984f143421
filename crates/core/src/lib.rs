//! `tradedesk-core` — shared building blocks for the contract engine.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, roles, the domain error model and the optimistic concurrency
//! expectation used by repositories.

pub mod concurrency;
pub mod entity;
pub mod error;
pub mod id;
pub mod role;

pub use concurrency::ExpectedVersion;
pub use entity::Entity;
pub use error::{DomainError, DomainResult, require_text};
pub use id::{ContractId, EscalationId, LifecycleEventId, NotificationId, OverrideId};
pub use role::Role;
