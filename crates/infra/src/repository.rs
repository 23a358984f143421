//! Storage abstraction for the service layer.
//!
//! The engine crates never touch storage; `ContractDesk` reaches it only
//! through `ContractRepository`. `InMemoryContractRepository` backs tests and
//! local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use tradedesk_approvals::{Escalation, OverrideRequest};
use tradedesk_contracts::ContractSnapshot;
use tradedesk_core::{ContractId, Entity, EscalationId, ExpectedVersion, OverrideId};
use tradedesk_lifecycle::LifecycleEvent;
use tradedesk_notifications::AutomatedNotification;
use tradedesk_transparency::{DeliveryOrder, Dispute, Invoice, Payment};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

pub trait ContractRepository: Send + Sync {
    fn load_contract(&self, contract_id: &ContractId) -> RepositoryResult<ContractSnapshot>;
    fn save_contract(&self, contract: ContractSnapshot) -> RepositoryResult<()>;

    fn invoices(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Invoice>>;
    fn payments(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Payment>>;
    fn deliveries(&self, contract_id: &ContractId) -> RepositoryResult<Vec<DeliveryOrder>>;
    fn disputes(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Dispute>>;

    /// Append to the contract's event log. Returns the new log length.
    ///
    /// `expected` is checked against the current length.
    fn append_event(
        &self,
        event: LifecycleEvent,
        expected: ExpectedVersion,
    ) -> RepositoryResult<u64>;
    fn events(&self, contract_id: &ContractId) -> RepositoryResult<Vec<LifecycleEvent>>;

    fn upsert_override(&self, request: OverrideRequest) -> RepositoryResult<()>;
    fn load_override(&self, id: &OverrideId) -> RepositoryResult<OverrideRequest>;
    fn overrides(&self, contract_id: &ContractId) -> RepositoryResult<Vec<OverrideRequest>>;

    fn upsert_escalation(&self, escalation: Escalation) -> RepositoryResult<()>;
    fn load_escalation(&self, id: &EscalationId) -> RepositoryResult<Escalation>;
    fn escalations(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Escalation>>;

    /// Insert or replace notifications by id.
    fn record_notifications(
        &self,
        notifications: Vec<AutomatedNotification>,
    ) -> RepositoryResult<()>;
    fn notifications(
        &self,
        contract_id: &ContractId,
    ) -> RepositoryResult<Vec<AutomatedNotification>>;
}

impl<R> ContractRepository for Arc<R>
where
    R: ContractRepository + ?Sized,
{
    fn load_contract(&self, contract_id: &ContractId) -> RepositoryResult<ContractSnapshot> {
        (**self).load_contract(contract_id)
    }

    fn save_contract(&self, contract: ContractSnapshot) -> RepositoryResult<()> {
        (**self).save_contract(contract)
    }

    fn invoices(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Invoice>> {
        (**self).invoices(contract_id)
    }

    fn payments(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Payment>> {
        (**self).payments(contract_id)
    }

    fn deliveries(&self, contract_id: &ContractId) -> RepositoryResult<Vec<DeliveryOrder>> {
        (**self).deliveries(contract_id)
    }

    fn disputes(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Dispute>> {
        (**self).disputes(contract_id)
    }

    fn append_event(
        &self,
        event: LifecycleEvent,
        expected: ExpectedVersion,
    ) -> RepositoryResult<u64> {
        (**self).append_event(event, expected)
    }

    fn events(&self, contract_id: &ContractId) -> RepositoryResult<Vec<LifecycleEvent>> {
        (**self).events(contract_id)
    }

    fn upsert_override(&self, request: OverrideRequest) -> RepositoryResult<()> {
        (**self).upsert_override(request)
    }

    fn load_override(&self, id: &OverrideId) -> RepositoryResult<OverrideRequest> {
        (**self).load_override(id)
    }

    fn overrides(&self, contract_id: &ContractId) -> RepositoryResult<Vec<OverrideRequest>> {
        (**self).overrides(contract_id)
    }

    fn upsert_escalation(&self, escalation: Escalation) -> RepositoryResult<()> {
        (**self).upsert_escalation(escalation)
    }

    fn load_escalation(&self, id: &EscalationId) -> RepositoryResult<Escalation> {
        (**self).load_escalation(id)
    }

    fn escalations(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Escalation>> {
        (**self).escalations(contract_id)
    }

    fn record_notifications(
        &self,
        notifications: Vec<AutomatedNotification>,
    ) -> RepositoryResult<()> {
        (**self).record_notifications(notifications)
    }

    fn notifications(
        &self,
        contract_id: &ContractId,
    ) -> RepositoryResult<Vec<AutomatedNotification>> {
        (**self).notifications(contract_id)
    }
}

#[derive(Debug, Default)]
struct Tables {
    contracts: HashMap<ContractId, ContractSnapshot>,
    invoices: Vec<Invoice>,
    payments: Vec<Payment>,
    deliveries: Vec<DeliveryOrder>,
    disputes: Vec<Dispute>,
    events: HashMap<ContractId, Vec<LifecycleEvent>>,
    // Insertion-ordered; upserts replace in place.
    overrides: Vec<OverrideRequest>,
    escalations: Vec<Escalation>,
    notifications: Vec<AutomatedNotification>,
}

/// In-memory repository for tests/dev. One lock over all tables.
#[derive(Debug, Default)]
pub struct InMemoryContractRepository {
    tables: RwLock<Tables>,
}

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unavailable("lock poisoned".to_string())
}

fn upsert_entity<T: Entity>(items: &mut Vec<T>, item: T) {
    match items.iter_mut().find(|existing| existing.id() == item.id()) {
        Some(slot) => *slot = item,
        None => items.push(item),
    }
}

impl InMemoryContractRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_contract(&self, contract: ContractSnapshot) -> RepositoryResult<()> {
        self.save_contract(contract)
    }

    pub fn add_invoice(&self, invoice: Invoice) -> RepositoryResult<()> {
        self.tables.write().map_err(poisoned)?.invoices.push(invoice);
        Ok(())
    }

    pub fn add_payment(&self, payment: Payment) -> RepositoryResult<()> {
        self.tables.write().map_err(poisoned)?.payments.push(payment);
        Ok(())
    }

    pub fn add_delivery(&self, delivery: DeliveryOrder) -> RepositoryResult<()> {
        self.tables.write().map_err(poisoned)?.deliveries.push(delivery);
        Ok(())
    }

    pub fn add_dispute(&self, dispute: Dispute) -> RepositoryResult<()> {
        self.tables.write().map_err(poisoned)?.disputes.push(dispute);
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> RepositoryResult<T> {
        let tables = self.tables.read().map_err(poisoned)?;
        Ok(f(&tables))
    }
}

impl ContractRepository for InMemoryContractRepository {
    fn load_contract(&self, contract_id: &ContractId) -> RepositoryResult<ContractSnapshot> {
        self.read(|t| t.contracts.get(contract_id).cloned())?
            .ok_or_else(|| RepositoryError::NotFound(format!("contract {contract_id}")))
    }

    fn save_contract(&self, contract: ContractSnapshot) -> RepositoryResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        tables.contracts.insert(contract.id.clone(), contract);
        Ok(())
    }

    fn invoices(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Invoice>> {
        self.read(|t| {
            t.invoices
                .iter()
                .filter(|i| &i.contract_id == contract_id)
                .cloned()
                .collect()
        })
    }

    fn payments(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Payment>> {
        self.read(|t| {
            t.payments
                .iter()
                .filter(|p| &p.contract_id == contract_id)
                .cloned()
                .collect()
        })
    }

    fn deliveries(&self, contract_id: &ContractId) -> RepositoryResult<Vec<DeliveryOrder>> {
        self.read(|t| {
            t.deliveries
                .iter()
                .filter(|d| &d.contract_id == contract_id)
                .cloned()
                .collect()
        })
    }

    fn disputes(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Dispute>> {
        self.read(|t| {
            t.disputes
                .iter()
                .filter(|d| &d.contract_id == contract_id)
                .cloned()
                .collect()
        })
    }

    fn append_event(
        &self,
        event: LifecycleEvent,
        expected: ExpectedVersion,
    ) -> RepositoryResult<u64> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        let stream = tables.events.entry(event.contract_id.clone()).or_default();
        let current = stream.len() as u64;

        if !expected.matches(current) {
            return Err(RepositoryError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        stream.push(event);
        Ok(current + 1)
    }

    fn events(&self, contract_id: &ContractId) -> RepositoryResult<Vec<LifecycleEvent>> {
        self.read(|t| t.events.get(contract_id).cloned().unwrap_or_default())
    }

    fn upsert_override(&self, request: OverrideRequest) -> RepositoryResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        upsert_entity(&mut tables.overrides, request);
        Ok(())
    }

    fn load_override(&self, id: &OverrideId) -> RepositoryResult<OverrideRequest> {
        self.read(|t| t.overrides.iter().find(|o| &o.id == id).cloned())?
            .ok_or_else(|| RepositoryError::NotFound(format!("override {id}")))
    }

    fn overrides(&self, contract_id: &ContractId) -> RepositoryResult<Vec<OverrideRequest>> {
        self.read(|t| {
            t.overrides
                .iter()
                .filter(|o| &o.contract_id == contract_id)
                .cloned()
                .collect()
        })
    }

    fn upsert_escalation(&self, escalation: Escalation) -> RepositoryResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        upsert_entity(&mut tables.escalations, escalation);
        Ok(())
    }

    fn load_escalation(&self, id: &EscalationId) -> RepositoryResult<Escalation> {
        self.read(|t| t.escalations.iter().find(|e| &e.id == id).cloned())?
            .ok_or_else(|| RepositoryError::NotFound(format!("escalation {id}")))
    }

    fn escalations(&self, contract_id: &ContractId) -> RepositoryResult<Vec<Escalation>> {
        self.read(|t| {
            t.escalations
                .iter()
                .filter(|e| &e.contract_id == contract_id)
                .cloned()
                .collect()
        })
    }

    fn record_notifications(
        &self,
        notifications: Vec<AutomatedNotification>,
    ) -> RepositoryResult<()> {
        let mut tables = self.tables.write().map_err(poisoned)?;
        for n in notifications {
            upsert_entity(&mut tables.notifications, n);
        }
        Ok(())
    }

    fn notifications(
        &self,
        contract_id: &ContractId,
    ) -> RepositoryResult<Vec<AutomatedNotification>> {
        self.read(|t| {
            t.notifications
                .iter()
                .filter(|n| &n.contract_id == contract_id)
                .cloned()
                .collect()
        })
    }
}
