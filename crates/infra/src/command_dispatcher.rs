//! Command execution pipeline for the document aggregates.
//!
//! ```text
//! Command
//!   ↓
//! 1. Load the current document state from its store (company-scoped)
//!   ↓
//! 2. Check the expected version (optimistic concurrency)
//!   ↓
//! 3. Handle the command (pure decision logic, produces events)
//!   ↓
//! 4. Apply the events and store the new state
//! ```
//!
//! Documents are stored as state, not as event streams: the events returned by a
//! dispatch are what the book uses to maintain its cross-document indexes and to
//! decide which sale orders need recomputing.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use orderlink_core::{Aggregate, CompanyId, DomainError, ExpectedVersion};
use orderlink_events::Event;

use crate::error::ServiceError;
use crate::read_model::{InMemoryTenantStore, TenantStore};

/// Outcome of a successful dispatch.
#[derive(Debug, Clone)]
pub struct Dispatched<A: Aggregate> {
    /// Document state after every event was applied.
    pub aggregate: A,
    /// Events produced by the command, in application order. Empty for no-ops.
    pub events: Vec<A::Event>,
}

impl<A: Aggregate> Dispatched<A> {
    pub fn changed(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Reusable command execution engine for one document type.
pub struct CommandDispatcher<K, A> {
    store: Arc<dyn TenantStore<K, A>>,
    aggregate_type: &'static str,
}

impl<K, A> std::fmt::Debug for CommandDispatcher<K, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("aggregate_type", &self.aggregate_type)
            .finish_non_exhaustive()
    }
}

impl<K, A> CommandDispatcher<K, A>
where
    K: Clone + Display,
    A: Aggregate<Error = DomainError> + Clone,
    A::Event: Event,
{
    pub fn new(store: Arc<dyn TenantStore<K, A>>, aggregate_type: &'static str) -> Self {
        Self {
            store,
            aggregate_type,
        }
    }

    pub fn in_memory(aggregate_type: &'static str) -> Self
    where
        K: Eq + Hash + Send + Sync + 'static,
        A: Send + Sync + 'static,
    {
        Self::new(Arc::new(InMemoryTenantStore::new()), aggregate_type)
    }

    pub fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }

    pub fn load(&self, company_id: CompanyId, id: &K) -> Option<A> {
        self.store.get(company_id, id)
    }

    pub fn list(&self, company_id: CompanyId) -> Vec<A> {
        self.store.list(company_id)
    }

    /// Run `command` against the stored document, or against `make_aggregate(id)`
    /// when the company has no such document yet.
    ///
    /// Nothing is stored when the command fails or produces no events.
    pub fn dispatch(
        &self,
        company_id: CompanyId,
        id: K,
        expected_version: ExpectedVersion,
        command: A::Command,
        make_aggregate: impl FnOnce(K) -> A,
    ) -> Result<Dispatched<A>, ServiceError> {
        let mut aggregate = self
            .store
            .get(company_id, &id)
            .unwrap_or_else(|| make_aggregate(id.clone()));

        expected_version.check(aggregate.version())?;

        let events = aggregate.handle(&command)?;
        if events.is_empty() {
            debug!(
                aggregate_type = self.aggregate_type,
                aggregate_id = %id,
                "command produced no events"
            );
            return Ok(Dispatched { aggregate, events });
        }

        for event in &events {
            aggregate.apply(event);
            debug!(
                aggregate_type = self.aggregate_type,
                aggregate_id = %id,
                event_type = event.event_type(),
                version = aggregate.version(),
                "event applied"
            );
        }

        self.store.upsert(company_id, id, aggregate.clone());
        Ok(Dispatched { aggregate, events })
    }
}
