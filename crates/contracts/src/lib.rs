//! Contract vocabulary shared by every engine component.
//!
//! This crate holds the read-only contract snapshot supplied by contract
//! management, plus the closed sets of lifecycle states and trade types.
//! It performs no IO and makes no decisions.

pub mod contract;
pub mod state;
pub mod trade_type;

pub use contract::{ContractSnapshot, Party, QualitySpecs};
pub use state::ContractLifecycleState;
pub use trade_type::TradeType;
