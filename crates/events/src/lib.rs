//! Domain events and audit notes.
//!
//! Events describe what happened to a single document. Audit notes are the
//! human-readable trail posted on a document (the "chatter") when links between
//! documents change.

pub mod audit;
pub mod event;
pub mod in_memory_audit;

pub use audit::{AuditError, AuditNote, AuditSink, DocumentKind, DocumentRef, post_best_effort};
pub use event::Event;
pub use in_memory_audit::InMemoryAuditLog;
