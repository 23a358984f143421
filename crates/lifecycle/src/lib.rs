//! Contract lifecycle: per-trade-type workflows and the lifecycle event log.
//!
//! "Next state" is purely positional within a trade type's workflow.
//! `transition_state` records an event and does not validate adjacency;
//! callers wanting strict transitions use `validate_transition` first.

pub mod config;
pub mod event;
pub mod machine;
pub mod timeline;

pub use config::{TradeTypeCatalog, TradeTypeConfig};
pub use event::{LifecycleEvent, TriggeredBy, transition_state};
pub use machine::{WorkflowProgress, next_lifecycle_state, validate_transition, workflow_progress};
pub use timeline::LifecycleTimeline;
