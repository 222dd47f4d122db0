//! Audit notes posted on documents (chatter).
//!
//! Posting a note is a side effect of a primary write. Callers log a failed post
//! and carry on; an audit failure never undoes or blocks the write itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use orderlink_core::{AggregateId, CompanyId};

/// Kind of document a note is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    SaleOrder,
    PurchaseOrder,
    Invoice,
}

/// Reference to any document, independent of its typed identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: AggregateId,
}

impl DocumentRef {
    pub fn new(kind: DocumentKind, id: AggregateId) -> Self {
        Self { kind, id }
    }
}

/// A note in a document's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditNote {
    pub company_id: CompanyId,
    pub document: DocumentRef,
    pub subject: String,
    /// One entry per line of the note body.
    pub lines: Vec<String>,
    pub posted_at: DateTime<Utc>,
}

impl AuditNote {
    pub fn new(
        company_id: CompanyId,
        document: DocumentRef,
        subject: impl Into<String>,
        lines: Vec<String>,
        posted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            company_id,
            document,
            subject: subject.into(),
            lines,
            posted_at,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Internal lock poisoning.
    #[error("audit log is poisoned")]
    Poisoned,
    /// The sink refused the note (e.g. remote chatter service error).
    #[error("audit note rejected: {0}")]
    Rejected(String),
}

/// Destination for audit notes.
pub trait AuditSink: Send + Sync {
    fn post(&self, note: AuditNote) -> Result<(), AuditError>;
}

impl<S> AuditSink for std::sync::Arc<S>
where
    S: AuditSink + ?Sized,
{
    fn post(&self, note: AuditNote) -> Result<(), AuditError> {
        (**self).post(note)
    }
}

/// Post a note, logging instead of propagating a failure.
pub fn post_best_effort(sink: &dyn AuditSink, note: AuditNote) {
    let document = note.document;
    if let Err(err) = sink.post(note) {
        tracing::warn!(
            document_kind = ?document.kind,
            document_id = %document.id,
            error = %err,
            "failed to post audit note"
        );
    }
}
