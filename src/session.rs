use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use uuid::Uuid;

use crate::models::content::DecodedContent;
use crate::models::document::DocumentRecord;
use crate::models::search::{MatchResult, SearchMode};
use crate::services::content_search;
use crate::services::locator_service::LocalFile;

/// Single-slot holder for search results. Searches may finish out of order;
/// only a result whose ticket is newer than the last published one lands.
#[derive(Debug, Default)]
pub struct ResultSlot {
    issued: AtomicU64,
    latest: Mutex<(u64, MatchResult)>,
}

impl ResultSlot {
    pub fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn publish(&self, ticket: u64, results: MatchResult) -> bool {
        let mut slot = self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if ticket <= slot.0 {
            return false;
        }
        *slot = (ticket, results);
        true
    }

    pub fn latest(&self) -> MatchResult {
        self.latest
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .1
            .clone()
    }
}

/// Everything one open preview needs: the record, its decoded text, and the
/// local copy backing it. Dropping the session removes any temp copy.
///
/// A session whose document could not be located shows the failure message
/// but has no text to search.
#[derive(Debug)]
pub struct PreviewSession {
    id: Uuid,
    document: DocumentRecord,
    content: DecodedContent,
    searchable: bool,
    context_chars: usize,
    results: ResultSlot,
    _local: Option<LocalFile>,
}

impl PreviewSession {
    pub fn new(
        document: DocumentRecord,
        content: DecodedContent,
        context_chars: usize,
        local: Option<LocalFile>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document,
            content,
            searchable: true,
            context_chars,
            results: ResultSlot::default(),
            _local: local,
        }
    }

    pub fn unavailable(
        document: DocumentRecord,
        message: impl Into<String>,
        context_chars: usize,
    ) -> Self {
        Self {
            searchable: false,
            ..Self::new(document, DecodedContent::message(message), context_chars, None)
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> &DocumentRecord {
        &self.document
    }

    pub fn content(&self) -> &DecodedContent {
        &self.content
    }

    pub fn results(&self) -> &ResultSlot {
        &self.results
    }

    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    pub fn search(&self, query: &str, mode: SearchMode) -> MatchResult {
        if !self.searchable {
            return MatchResult::new();
        }
        content_search::search_with_context(&self.content.full_text, query, mode, self.context_chars)
    }
}
