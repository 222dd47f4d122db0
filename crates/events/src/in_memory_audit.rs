//! In-memory audit log for tests/dev.

use std::sync::Mutex;

use crate::audit::{AuditError, AuditNote, AuditSink, DocumentRef};

/// Append-only, in-memory list of posted notes.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    notes: Mutex<Vec<AuditNote>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<AuditNote> {
        match self.notes.lock() {
            Ok(notes) => notes.clone(),
            Err(_) => vec![],
        }
    }

    /// Notes attached to one document, oldest first.
    pub fn notes_for(&self, document: DocumentRef) -> Vec<AuditNote> {
        self.all()
            .into_iter()
            .filter(|n| n.document == document)
            .collect()
    }
}

impl AuditSink for InMemoryAuditLog {
    fn post(&self, note: AuditNote) -> Result<(), AuditError> {
        let mut notes = self.notes.lock().map_err(|_| AuditError::Poisoned)?;
        notes.push(note);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{DocumentKind, post_best_effort};
    use chrono::Utc;
    use orderlink_core::{AggregateId, CompanyId};

    struct FailingSink;

    impl AuditSink for FailingSink {
        fn post(&self, _note: AuditNote) -> Result<(), AuditError> {
            Err(AuditError::Rejected("chatter offline".to_string()))
        }
    }

    fn note(document: DocumentRef) -> AuditNote {
        AuditNote::new(
            CompanyId::new(),
            document,
            "Purchase orders linked",
            vec!["P00001 - ACME".to_string()],
            Utc::now(),
        )
    }

    #[test]
    fn notes_are_filtered_by_document() {
        let log = InMemoryAuditLog::new();
        let a = DocumentRef::new(DocumentKind::SaleOrder, AggregateId::new());
        let b = DocumentRef::new(DocumentKind::SaleOrder, AggregateId::new());

        log.post(note(a)).unwrap();
        log.post(note(b)).unwrap();
        log.post(note(a)).unwrap();

        assert_eq!(log.all().len(), 3);
        assert_eq!(log.notes_for(a).len(), 2);
        assert_eq!(log.notes_for(b).len(), 1);
    }

    #[test]
    fn best_effort_post_swallows_failures() {
        let doc = DocumentRef::new(DocumentKind::PurchaseOrder, AggregateId::new());
        post_best_effort(&FailingSink, note(doc));
    }
}
