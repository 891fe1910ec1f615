//! Open documents and their published analyses.
//!
//! Each document holds one immutable `Arc<Analysis>`. An update
//! analyses outside the lock and publishes with a single write, so a
//! reader always sees one complete snapshot. Updates are numbered by
//! ticket; a finished analysis is published only if no newer update
//! was requested for the document in the meantime, otherwise it is
//! dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chill_core::span::FileId;
use chill_core::{analyze, Analysis, AnalysisOptions, Externals};

#[derive(Debug)]
struct Document {
    file_id: FileId,
    /// Ticket of the most recent update requested.
    latest: u64,
    /// Ticket of the analysis in `snapshot`.
    published: u64,
    snapshot: Option<Arc<Analysis>>,
}

/// An update whose analysis has not been published yet.
#[derive(Debug)]
pub struct PendingUpdate {
    uri: String,
    ticket: u64,
    file_id: FileId,
    text: String,
    options: AnalysisOptions,
}

impl PendingUpdate {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    Published(Arc<Analysis>),
    /// A newer update was requested, or the document was closed,
    /// while this one was being analysed.
    Stale,
}

impl UpdateOutcome {
    pub fn snapshot(&self) -> Option<&Arc<Analysis>> {
        match self {
            UpdateOutcome::Published(snapshot) => Some(snapshot),
            UpdateOutcome::Stale => None,
        }
    }
}

/// Document store shared between the editor shell and query handlers.
#[derive(Debug, Default)]
pub struct Workspace {
    documents: RwLock<HashMap<String, Document>>,
    next_ticket: AtomicU64,
    next_file: AtomicU32,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `uri` and analyse its first text.
    pub fn open(&self, uri: &str, text: &str) -> UpdateOutcome {
        {
            let mut docs = self.write();
            if !docs.contains_key(uri) {
                let file_id = FileId(self.next_file.fetch_add(1, Ordering::Relaxed));
                tracing::debug!(uri, file = file_id.0, "document opened");
                docs.insert(
                    uri.to_string(),
                    Document {
                        file_id,
                        latest: 0,
                        published: 0,
                        snapshot: None,
                    },
                );
            }
        }
        self.update(uri, text)
    }

    /// Re-analyse `uri` with new text. Unknown documents are opened.
    pub fn update(&self, uri: &str, text: &str) -> UpdateOutcome {
        match self.begin_update(uri, text) {
            Some(pending) => self.finish_update(pending),
            None => self.open(uri, text),
        }
    }

    /// Take a ticket for an update of an open document and capture the
    /// names other documents currently grant.
    pub fn begin_update(&self, uri: &str, text: &str) -> Option<PendingUpdate> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1;
        let mut docs = self.write();
        let externals: Externals = docs
            .iter()
            .filter(|(other, _)| other.as_str() != uri)
            .filter_map(|(_, doc)| doc.snapshot.as_ref())
            .flat_map(|snapshot| snapshot.exports())
            .collect();
        let doc = docs.get_mut(uri)?;
        doc.latest = ticket;
        tracing::trace!(uri, ticket, externals = externals.len(), "update requested");
        Some(PendingUpdate {
            uri: uri.to_string(),
            ticket,
            file_id: doc.file_id,
            text: text.to_string(),
            options: AnalysisOptions { externals },
        })
    }

    /// Analyse without holding the lock, then publish unless stale.
    pub fn finish_update(&self, pending: PendingUpdate) -> UpdateOutcome {
        let analysis = Arc::new(analyze(pending.file_id, &pending.text, &pending.options));
        let mut docs = self.write();
        let Some(doc) = docs.get_mut(&pending.uri) else {
            tracing::debug!(uri = %pending.uri, ticket = pending.ticket, "document closed, discarding analysis");
            return UpdateOutcome::Stale;
        };
        if pending.ticket <= doc.published || pending.ticket != doc.latest {
            tracing::debug!(
                uri = %pending.uri,
                ticket = pending.ticket,
                latest = doc.latest,
                "discarding stale analysis"
            );
            return UpdateOutcome::Stale;
        }
        doc.published = pending.ticket;
        doc.snapshot = Some(Arc::clone(&analysis));
        tracing::debug!(
            uri = %pending.uri,
            ticket = pending.ticket,
            errors = analysis.diagnostics.error_count(),
            warnings = analysis.diagnostics.warning_count(),
            "analysis published"
        );
        UpdateOutcome::Published(analysis)
    }

    pub fn close(&self, uri: &str) -> bool {
        let removed = self.write().remove(uri).is_some();
        if removed {
            tracing::debug!(uri, "document closed");
        }
        removed
    }

    /// Latest published analysis; queries run on it without any lock.
    pub fn snapshot(&self, uri: &str) -> Option<Arc<Analysis>> {
        self.read().get(uri).and_then(|doc| doc.snapshot.clone())
    }

    /// Open documents, sorted.
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.read().keys().cloned().collect();
        uris.sort();
        uris
    }

    // Documents are replaced whole; a poisoned map is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Document>> {
        self.documents.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Document>> {
        self.documents.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Workspace>();
    }

    #[test]
    fn closing_an_unknown_document_is_a_no_op() {
        let ws = Workspace::new();
        assert!(!ws.close("file:///nowhere.ch"));
        assert!(ws.snapshot("file:///nowhere.ch").is_none());
    }
}
