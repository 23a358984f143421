use serde::{Deserialize, Serialize};

use tradedesk_contracts::{ContractLifecycleState, ContractSnapshot};
use tradedesk_core::ContractId;

use crate::ledger::{DeliveryOrder, Dispute, Invoice, Payment};

/// Per-contract roll-up of the sub-ledgers. Derived on demand, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeCycleStatus {
    pub contract_id: ContractId,
    pub status: ContractLifecycleState,
    pub contracted_bales: u64,
    pub total_delivered: u64,
    pub total_invoiced: u64,
    pub total_paid: u64,
    pub delivery_complete: bool,
    pub payment_complete: bool,
    pub reconciled: bool,
    pub buyer_can_view: bool,
    pub seller_can_view: bool,
    pub invoice_count: usize,
    pub payment_count: usize,
    pub delivery_count: usize,
    pub dispute_count: usize,
    pub open_dispute_count: usize,
}

impl TradeCycleStatus {
    /// Invoiced but not yet paid. Overpayment counts as zero.
    pub fn outstanding_amount(&self) -> u64 {
        self.total_invoiced.saturating_sub(self.total_paid)
    }

    /// Delivered share of the contracted quantity, capped at 100.
    pub fn delivery_percent(&self) -> u8 {
        if self.contracted_bales == 0 {
            return 100;
        }
        let pct = self.total_delivered.saturating_mul(100) / self.contracted_bales;
        pct.min(100) as u8
    }

    pub fn has_open_dispute(&self) -> bool {
        self.open_dispute_count > 0
    }
}

/// Aggregate the ledgers for `contract`. Entries for other contracts are skipped.
pub fn trade_cycle_status(
    contract: &ContractSnapshot,
    invoices: &[Invoice],
    payments: &[Payment],
    deliveries: &[DeliveryOrder],
    disputes: &[Dispute],
) -> TradeCycleStatus {
    let id = &contract.id;
    let invoices: Vec<_> = invoices.iter().filter(|i| &i.contract_id == id).collect();
    let payments: Vec<_> = payments.iter().filter(|p| &p.contract_id == id).collect();
    let deliveries: Vec<_> = deliveries.iter().filter(|d| &d.contract_id == id).collect();
    let disputes: Vec<_> = disputes.iter().filter(|d| &d.contract_id == id).collect();

    let total_invoiced = saturating_total(invoices.iter().map(|i| i.amount));
    let total_paid = saturating_total(payments.iter().map(|p| p.amount));
    let total_delivered = saturating_total(deliveries.iter().map(|d| d.quantity_bales));

    TradeCycleStatus {
        contract_id: id.clone(),
        status: contract.status,
        contracted_bales: contract.quantity_bales,
        total_delivered,
        total_invoiced,
        total_paid,
        delivery_complete: total_delivered >= contract.quantity_bales,
        payment_complete: total_invoiced > 0 && total_paid >= total_invoiced,
        reconciled: contract.status.is_reconciled(),
        buyer_can_view: true,
        seller_can_view: true,
        invoice_count: invoices.len(),
        payment_count: payments.len(),
        delivery_count: deliveries.len(),
        dispute_count: disputes.len(),
        open_dispute_count: disputes.iter().filter(|d| d.is_open()).count(),
    }
}

fn saturating_total(amounts: impl Iterator<Item = u64>) -> u64 {
    amounts.fold(0, u64::saturating_add)
}
