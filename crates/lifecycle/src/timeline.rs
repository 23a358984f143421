use chrono::{DateTime, Utc};

use tradedesk_contracts::ContractLifecycleState;
use tradedesk_core::{ContractId, DomainError, DomainResult};

use crate::event::LifecycleEvent;

/// Append-only log of one contract's lifecycle events.
///
/// Order is arrival order; timestamps are informational and may run
/// backwards when writers' clocks disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleTimeline {
    contract_id: ContractId,
    events: Vec<LifecycleEvent>,
}

impl LifecycleTimeline {
    pub fn new(contract_id: ContractId) -> Self {
        Self {
            contract_id,
            events: Vec::new(),
        }
    }

    /// Rebuild from stored events, re-checking ownership.
    pub fn from_events(
        contract_id: ContractId,
        events: impl IntoIterator<Item = LifecycleEvent>,
    ) -> DomainResult<Self> {
        let mut timeline = Self::new(contract_id);
        for event in events {
            timeline.append(event)?;
        }
        Ok(timeline)
    }

    pub fn contract_id(&self) -> &ContractId {
        &self.contract_id
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Number of events; used as the optimistic concurrency version.
    pub fn version(&self) -> u64 {
        self.events.len() as u64
    }

    pub fn current_state(&self) -> Option<ContractLifecycleState> {
        self.events.last().map(|e| e.to_state)
    }

    pub fn last_transition_at(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|e| e.timestamp)
    }

    pub fn append(&mut self, event: LifecycleEvent) -> DomainResult<()> {
        if event.contract_id != self.contract_id {
            return Err(DomainError::invariant(format!(
                "event for {} appended to timeline of {}",
                event.contract_id, self.contract_id
            )));
        }
        if let Some(last) = self.last_transition_at() {
            if event.timestamp < last {
                tracing::warn!(
                    contract_id = %self.contract_id,
                    at = %event.timestamp,
                    last = %last,
                    "lifecycle event timestamp precedes the previous event"
                );
            }
        }
        self.events.push(event);
        Ok(())
    }
}
