//! Text/prompt search merged with tag search.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::error::{FlowError, GatewayError};
use crate::gateway::Backend;
use crate::notify::Notifier;
use crate::tagging::TagDialog;
use crate::types::{SearchMode, SearchRequest, SearchResult, TagSearchRequest};

/// Append `extra` to `base`, skipping names already present. First seen wins.
pub fn merge_results(base: Vec<SearchResult>, extra: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(base.len() + extra.len());
    for result in base.into_iter().chain(extra) {
        if seen.insert(result.name.clone()) {
            merged.push(result);
        }
    }
    merged
}

/// One search invocation, captured at start time.
#[derive(Debug, Clone)]
pub struct SearchTicket {
    pub id: u64,
    pub query: Option<SearchRequest>,
    pub tags: Option<TagSearchRequest>,
}

#[derive(Debug)]
pub enum FetchError {
    Query(GatewayError),
    Tags(GatewayError),
}

impl FetchError {
    fn message(&self) -> &'static str {
        match self {
            FetchError::Query(_) => "Search failed",
            FetchError::Tags(_) => "Tag search failed",
        }
    }

    fn into_gateway(self) -> GatewayError {
        match self {
            FetchError::Query(e) | FetchError::Tags(e) => e,
        }
    }
}

impl SearchTicket {
    /// Run the query search, then the tag search. The first failure aborts.
    pub async fn fetch(&self, backend: &dyn Backend) -> Result<Vec<SearchResult>, FetchError> {
        let mut results = Vec::new();
        if let Some(req) = &self.query {
            results = backend.search(req).await.map_err(FetchError::Query)?;
        }
        if let Some(req) = &self.tags {
            let tagged = backend.search_by_tags(req).await.map_err(FetchError::Tags)?;
            results = merge_results(results, tagged);
        }
        Ok(results)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchView {
    pub query: String,
    pub mode: SearchMode,
    pub tags: Vec<String>,
    pub results: Vec<SearchResult>,
    pub in_flight: bool,
    pub tagging: TagDialog,
}

pub struct SearchController {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    pub query: String,
    mode: SearchMode,
    tags: Vec<String>,
    results: Vec<SearchResult>,
    /// Batch-tag dialog over the current results.
    pub tagging: TagDialog,
    last_ticket: u64,
    in_flight: Option<u64>,
    last_run: Option<SearchTicket>,
}

impl SearchController {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            query: String::new(),
            mode: SearchMode::default(),
            tags: Vec::new(),
            results: Vec::new(),
            tagging: TagDialog::default(),
            last_ticket: 0,
            in_flight: None,
            last_run: None,
        }
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results
    }

    pub fn is_searching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn view(&self) -> SearchView {
        SearchView {
            query: self.query.clone(),
            mode: self.mode,
            tags: self.tags.clone(),
            results: self.results.clone(),
            in_flight: self.in_flight.is_some(),
            tagging: self.tagging.clone(),
        }
    }

    /// Add a search tag. Input is trimmed and loses one leading `#`.
    /// Returns false if nothing was added (blank or already present).
    pub fn add_tag(&mut self, input: &str) -> bool {
        let trimmed = input.trim();
        let tag = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if tag.is_empty() || self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, index: usize) -> Option<String> {
        (index < self.tags.len()).then(|| self.tags.remove(index))
    }

    /// Results and pending tags belong to a mode; switching drops both.
    pub fn set_mode(&mut self, mode: SearchMode) {
        if mode != self.mode {
            self.mode = mode;
            self.results.clear();
            self.tags.clear();
            self.tagging.selection.clear();
        }
    }

    /// Capture the current query and tags. Previous results are cleared.
    pub fn begin(&mut self) -> Result<SearchTicket, FlowError> {
        let query = self.query.trim();
        if query.is_empty() && self.tags.is_empty() {
            self.notifier.error(FlowError::EmptySearch.to_string());
            return Err(FlowError::EmptySearch);
        }
        self.last_ticket += 1;
        let ticket = SearchTicket {
            id: self.last_ticket,
            query: (!query.is_empty()).then(|| SearchRequest {
                query: query.to_string(),
                mode: self.mode,
            }),
            tags: (!self.tags.is_empty()).then(|| TagSearchRequest {
                tags: self.tags.clone(),
            }),
        };
        self.results.clear();
        self.in_flight = Some(ticket.id);
        tracing::debug!("search #{} started", ticket.id);
        Ok(ticket)
    }

    /// Apply an outcome. Tags are cleared on every completion; an outcome
    /// for anything but the newest ticket is dropped. Returns whether the
    /// outcome was applied.
    pub fn finish(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<Vec<SearchResult>, FetchError>,
    ) -> Result<bool, FlowError> {
        self.tags.clear();
        if ticket.id != self.last_ticket {
            tracing::debug!("dropping stale search #{}", ticket.id);
            return Ok(false);
        }
        self.in_flight = None;
        match outcome {
            Ok(results) => {
                self.results = results;
                let names = self.results.iter().map(|r| r.name.as_str());
                self.tagging.selection.retain_listed(names);
                self.last_run = Some(ticket);
                Ok(true)
            }
            Err(e) => {
                self.notifier.error(e.message());
                Err(e.into_gateway().into())
            }
        }
    }

    pub async fn run(&mut self) -> Result<bool, FlowError> {
        let ticket = self.begin()?;
        let outcome = ticket.fetch(self.backend.as_ref()).await;
        self.finish(ticket, outcome)
    }

    /// Prompt-mode search for arbitrary text, as launched from a prompt card.
    pub fn begin_prompt(&mut self, text: &str) -> Result<SearchTicket, FlowError> {
        self.set_mode(SearchMode::Prompt);
        self.query = text.to_string();
        self.begin()
    }

    /// Returns the number of hits applied.
    pub fn finish_prompt(
        &mut self,
        ticket: SearchTicket,
        outcome: Result<Vec<SearchResult>, FetchError>,
    ) -> Result<usize, FlowError> {
        match self.finish(ticket, outcome) {
            Ok(true) => {
                let found = self.results.len();
                self.notifier.success(format!("Found {found} relevant notes"));
                Ok(found)
            }
            Ok(false) => Ok(0),
            Err(e) => {
                self.notifier.error("Failed to search for relevant notes");
                Err(e)
            }
        }
    }

    pub async fn run_prompt(&mut self, text: &str) -> Result<usize, FlowError> {
        let ticket = self.begin_prompt(text)?;
        let outcome = ticket.fetch(self.backend.as_ref()).await;
        self.finish_prompt(ticket, outcome)
    }

    /// Voice entry: drop the wake word and search with what is left.
    /// `Ok(None)` when nothing but the wake word was heard.
    pub fn begin_transcript(&mut self, transcript: &str) -> Result<Option<SearchTicket>, FlowError> {
        let query = crate::voice::strip_wake_word(transcript);
        self.query = query.clone();
        if query.is_empty() {
            return Ok(None);
        }
        self.begin().map(Some)
    }

    pub async fn run_transcript(&mut self, transcript: &str) -> Result<bool, FlowError> {
        let Some(ticket) = self.begin_transcript(transcript)? else {
            return Ok(false);
        };
        let outcome = ticket.fetch(self.backend.as_ref()).await;
        self.finish(ticket, outcome)
    }

    /// Re-issue the query half of the last applied search. Tags were cleared
    /// when it completed and are not sent again; a tag-only search has
    /// nothing to repeat.
    pub fn begin_rerun(&mut self) -> Option<SearchTicket> {
        let query = self.last_run.as_ref()?.query.clone()?;
        self.last_ticket += 1;
        let ticket = SearchTicket {
            id: self.last_ticket,
            query: Some(query),
            tags: None,
        };
        self.results.clear();
        self.in_flight = Some(ticket.id);
        Some(ticket)
    }

    pub async fn rerun(&mut self) -> Result<bool, FlowError> {
        let Some(ticket) = self.begin_rerun() else {
            return Ok(false);
        };
        let outcome = ticket.fetch(self.backend.as_ref()).await;
        self.finish(ticket, outcome)
    }

    /// Batch-tag the selected results, then refresh them.
    pub async fn tag_selected(&mut self) -> Result<bool, FlowError> {
        let sent = self.tagging.apply(self.backend.as_ref(), &self.notifier).await?;
        if sent {
            self.rerun().await?;
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{hit, FakeBackend};
    use serde_json::json;

    fn controller(backend: &Arc<FakeBackend>) -> SearchController {
        SearchController::new(backend.clone(), Notifier::default())
    }

    fn names(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn merge_keeps_first_occurrence_in_order() {
        let merged = merge_results(
            vec![hit("a"), hit("b")],
            vec![hit("b"), hit("c"), hit("a"), hit("c")],
        );
        assert_eq!(names(&merged), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn empty_query_and_tags_make_no_call() {
        let backend = Arc::new(FakeBackend::new());
        let mut search = controller(&backend);
        search.query = "   ".into();
        assert!(matches!(search.run().await, Err(FlowError::EmptySearch)));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn tag_entry_trims_strips_hash_and_dedupes() {
        let backend = Arc::new(FakeBackend::new());
        let mut search = controller(&backend);
        assert!(search.add_tag("  #rust "));
        assert!(!search.add_tag("rust"));
        assert!(!search.add_tag(" # "));
        assert!(search.add_tag("##nested"));
        assert_eq!(search.tags(), ["rust".to_string(), "#nested".to_string()]);
        assert_eq!(search.remove_tag(0).as_deref(), Some("rust"));
        assert_eq!(search.remove_tag(5), None);
    }

    #[tokio::test]
    async fn query_and_tag_results_are_merged_and_tags_cleared() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_search_results(vec![hit("Foo"), hit("Bar")]);
        backend.set_tag_results(vec![hit("Bar"), hit("Baz")]);
        let mut search = controller(&backend);
        search.query = "college".into();
        search.add_tag("essay");

        assert!(search.run().await.unwrap());
        assert_eq!(names(search.results()), ["Foo", "Bar", "Baz"]);
        assert!(search.tags().is_empty());
        assert_eq!(
            backend.bodies("search"),
            vec![json!({"query": "college", "mode": "text"})]
        );
        assert_eq!(backend.bodies("search_by_tags"), vec![json!({"tags": ["essay"]})]);
    }

    #[tokio::test]
    async fn failure_aborts_and_still_clears_tags() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail("search");
        let mut search = controller(&backend);
        search.query = "x".into();
        search.add_tag("t");

        assert!(search.run().await.is_err());
        assert!(search.results().is_empty());
        assert!(search.tags().is_empty());
        assert_eq!(backend.count("search_by_tags"), 0);
        assert_eq!(search.notifier.current_error().as_deref(), Some("Search failed"));
    }

    #[tokio::test]
    async fn tag_only_search_reports_tag_failure() {
        let backend = Arc::new(FakeBackend::new());
        backend.fail("search_by_tags");
        let mut search = controller(&backend);
        search.add_tag("t");
        assert!(search.run().await.is_err());
        assert_eq!(backend.count("search"), 0);
        assert_eq!(search.notifier.current_error().as_deref(), Some("Tag search failed"));
    }

    #[tokio::test]
    async fn stale_outcome_is_dropped() {
        let backend = Arc::new(FakeBackend::new());
        let mut search = controller(&backend);
        search.query = "first".into();
        let first = search.begin().unwrap();
        search.query = "second".into();
        let second = search.begin().unwrap();

        assert!(search.finish(second, Ok(vec![hit("new")])).unwrap());
        assert!(!search.finish(first, Ok(vec![hit("old")])).unwrap());
        assert_eq!(names(search.results()), ["new"]);
        assert!(!search.is_searching());
    }

    #[tokio::test]
    async fn switching_mode_clears_results_and_tags() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_search_results(vec![hit("Foo")]);
        let mut search = controller(&backend);
        search.query = "q".into();
        search.run().await.unwrap();
        search.add_tag("pending");

        search.set_mode(SearchMode::Prompt);
        assert!(search.results().is_empty());
        assert!(search.tags().is_empty());
        assert_eq!(search.mode(), SearchMode::Prompt);
    }

    #[tokio::test]
    async fn transcript_wake_word_is_removed_before_searching() {
        let backend = Arc::new(FakeBackend::new());
        let mut search = controller(&backend);
        assert!(!search.run_transcript("Friday").await.unwrap());
        assert!(backend.calls().is_empty());

        search.run_transcript("FRIDAY stanford essays").await.unwrap();
        assert_eq!(backend.bodies("search")[0]["query"], json!("stanford essays"));
    }

    #[tokio::test]
    async fn prompt_card_search_reports_count() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_search_results(vec![hit("Foo"), hit("Bar")]);
        let mut search = controller(&backend);
        assert_eq!(search.run_prompt("Why this college?").await.unwrap(), 2);
        assert_eq!(
            backend.bodies("search"),
            vec![json!({"query": "Why this college?", "mode": "prompt"})]
        );
        assert_eq!(
            search.notifier.current_success().as_deref(),
            Some("Found 2 relevant notes")
        );
    }

    #[tokio::test]
    async fn tagging_results_reruns_the_last_search() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_search_results(vec![hit("Foo")]);
        let mut search = controller(&backend);
        search.query = "q".into();
        search.run().await.unwrap();

        search.tagging.selection.toggle("Foo");
        search.tagging.input = "done".into();
        assert!(search.tag_selected().await.unwrap());
        assert_eq!(backend.count("search"), 2);
        assert!(search.tagging.selection.is_empty());
    }

    #[tokio::test]
    async fn refresh_after_tagging_does_not_resend_cleared_tags() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_search_results(vec![hit("Foo")]);
        backend.set_tag_results(vec![hit("Bar")]);
        let mut search = controller(&backend);
        search.query = "q".into();
        search.add_tag("essay");
        search.run().await.unwrap();
        assert!(search.tags().is_empty());

        search.tagging.selection.toggle("Foo");
        search.tagging.input = "done".into();
        assert!(search.tag_selected().await.unwrap());

        assert_eq!(backend.count("search"), 2);
        assert_eq!(backend.bodies("search_by_tags"), vec![json!({"tags": ["essay"]})]);
        assert_eq!(names(search.results()), ["Foo"]);
    }

    #[tokio::test]
    async fn tag_only_search_is_not_repeated_after_tagging() {
        let backend = Arc::new(FakeBackend::new());
        backend.set_tag_results(vec![hit("Bar")]);
        let mut search = controller(&backend);
        search.add_tag("essay");
        search.run().await.unwrap();

        search.tagging.selection.toggle("Bar");
        search.tagging.input = "done".into();
        assert!(search.tag_selected().await.unwrap());
        assert_eq!(backend.count("search_by_tags"), 1);
        assert_eq!(backend.count("search"), 0);
    }

    #[tokio::test]
    async fn empty_search_is_reported() {
        let backend = Arc::new(FakeBackend::new());
        let mut search = controller(&backend);
        assert!(search.begin().is_err());
        assert_eq!(
            search.notifier.current_error().as_deref(),
            Some("Enter a query or at least one tag")
        );
    }
}
