//! Trade cycle transparency: one read model over the delivery, invoice,
//! payment and dispute ledgers of a contract.

pub mod ledger;
pub mod status;

pub use ledger::{DeliveryOrder, Dispute, DisputeStatus, Invoice, Payment};
pub use status::{TradeCycleStatus, trade_cycle_status};
