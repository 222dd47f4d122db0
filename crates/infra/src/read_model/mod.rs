//! Company-isolated storage for documents and derived read models.

pub mod tenant_store;

pub use tenant_store::{InMemoryTenantStore, TenantStore};
