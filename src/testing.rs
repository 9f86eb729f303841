//! Scripted in-memory backend for flow tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::GatewayError;
use crate::gateway::{Backend, GatewayResult};
use crate::types::{
    BatchTagRequest, ConnectRequest, Draft, DraftUpdate, Folder, IdeaBoard, NewBoard, NewDraft,
    NewFolder, NewPrompt, Note, NoteKind, Prompt, PromptUpdate, SearchRequest, SearchResult,
    Stats, SubmitRequest, SubmitResponse, TagSearchRequest,
};

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub endpoint: &'static str,
    pub body: Value,
}

#[derive(Default)]
struct FakeState {
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    next_id: u64,
    stats: Stats,
    notes: Vec<Note>,
    contents: HashMap<String, String>,
    suggestions: Vec<String>,
    canonical_name: Option<String>,
    search_results: Vec<SearchResult>,
    tag_results: Vec<SearchResult>,
    prompts: Vec<Prompt>,
    folders: Vec<Folder>,
    boards: Vec<IdeaBoard>,
}

pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

pub(crate) fn note(name: &str, kind: NoteKind) -> Note {
    Note {
        name: name.to_string(),
        kind,
        external: false,
        content: None,
        created: 0.0,
        modified: 0.0,
        word_count: 0,
        num_connections: 0,
    }
}

pub(crate) fn hit(name: &str) -> SearchResult {
    SearchResult {
        name: name.to_string(),
        kind: NoteKind::Idea,
        external: false,
        reason: None,
        content: None,
        score: None,
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Make every later call to `endpoint` answer 500.
    pub fn fail(&self, endpoint: &'static str) {
        self.lock().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: &'static str) {
        self.lock().failing.remove(endpoint);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn bodies(&self, endpoint: &str) -> Vec<Value> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .map(|c| c.body.clone())
            .collect()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.bodies(endpoint).len()
    }

    pub fn set_stats(&self, stats: Stats) {
        self.lock().stats = stats;
    }

    pub fn set_notes(&self, notes: Vec<Note>) {
        self.lock().notes = notes;
    }

    pub fn set_content(&self, file_name: &str, content: &str) {
        self.lock()
            .contents
            .insert(file_name.to_string(), content.to_string());
    }

    pub fn set_suggestions(&self, suggestions: &[&str], canonical_name: Option<&str>) {
        let mut s = self.lock();
        s.suggestions = suggestions.iter().map(|s| s.to_string()).collect();
        s.canonical_name = canonical_name.map(str::to_string);
    }

    pub fn set_search_results(&self, results: Vec<SearchResult>) {
        self.lock().search_results = results;
    }

    pub fn set_tag_results(&self, results: Vec<SearchResult>) {
        self.lock().tag_results = results;
    }

    pub fn set_folders(&self, folders: Vec<Folder>) {
        self.lock().folders = folders;
    }

    pub fn boards(&self) -> Vec<IdeaBoard> {
        self.lock().boards.clone()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.lock().prompts.clone()
    }

    fn record<B: Serialize>(&self, endpoint: &'static str, body: &B) -> GatewayResult<()> {
        let mut s = self.lock();
        s.calls.push(Call {
            endpoint,
            body: serde_json::to_value(body).unwrap_or(Value::Null),
        });
        if s.failing.contains(endpoint) {
            return Err(GatewayError::Status {
                status: 500,
                body: format!("scripted failure for {endpoint}"),
            });
        }
        Ok(())
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut s = self.lock();
        s.next_id += 1;
        format!("{prefix}{}", s.next_id)
    }
}

fn not_found(what: &str) -> GatewayError {
    GatewayError::Status {
        status: 404,
        body: format!("{what} not found"),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn submit(&self, req: &SubmitRequest) -> GatewayResult<SubmitResponse> {
        self.record("submit", req)?;
        let s = self.lock();
        let name = s.canonical_name.clone().unwrap_or_else(|| req.note_name.clone());
        Ok(SubmitResponse {
            suggestions: Some(s.suggestions.clone()),
            note_name: name,
        })
    }

    async fn connect(&self, req: &ConnectRequest) -> GatewayResult<()> {
        self.record("connect", req)
    }

    async fn stats(&self) -> GatewayResult<Stats> {
        self.record("stats", &())?;
        Ok(self.lock().stats.clone())
    }

    async fn all_notes(&self) -> GatewayResult<Vec<Note>> {
        self.record("all_notes", &())?;
        Ok(self.lock().notes.clone())
    }

    async fn note_content(&self, file_name: &str) -> GatewayResult<String> {
        self.record("note_content", &file_name)?;
        self.lock()
            .contents
            .get(file_name)
            .cloned()
            .ok_or_else(|| not_found("note"))
    }

    async fn batch_tag(&self, req: &BatchTagRequest) -> GatewayResult<()> {
        self.record("batch_tag", req)
    }

    async fn search(&self, req: &SearchRequest) -> GatewayResult<Vec<SearchResult>> {
        self.record("search", req)?;
        Ok(self.lock().search_results.clone())
    }

    async fn search_by_tags(&self, req: &TagSearchRequest) -> GatewayResult<Vec<SearchResult>> {
        self.record("search_by_tags", req)?;
        Ok(self.lock().tag_results.clone())
    }

    async fn list_prompts(&self) -> GatewayResult<Vec<Prompt>> {
        self.record("list_prompts", &())?;
        Ok(self.lock().prompts.clone())
    }

    async fn create_prompt(&self, req: &NewPrompt) -> GatewayResult<()> {
        self.record("create_prompt", req)?;
        let id = self.next_id("p");
        self.lock().prompts.push(Prompt {
            id,
            title: req.title.clone(),
            prompt: req.prompt.clone(),
            essay_link: req.essay_link.clone(),
            backed_up: false,
            note_name: None,
            folder: req.folder.clone(),
            drafts: Vec::new(),
        });
        Ok(())
    }

    async fn update_prompt(&self, req: &PromptUpdate) -> GatewayResult<()> {
        self.record("update_prompt", req)?;
        let mut s = self.lock();
        let prompt = s
            .prompts
            .iter_mut()
            .find(|p| p.id == req.id)
            .ok_or_else(|| not_found("prompt"))?;
        if let Some(backed_up) = req.backed_up {
            prompt.backed_up = backed_up;
        }
        if let Some(name) = &req.note_name {
            prompt.note_name = Some(name.clone()).filter(|n| !n.is_empty());
        }
        if let Some(folder) = &req.folder {
            prompt.folder = Some(folder.clone()).filter(|f| !f.is_empty());
        }
        Ok(())
    }

    async fn delete_prompt(&self, prompt_id: &str) -> GatewayResult<()> {
        self.record("delete_prompt", &prompt_id)?;
        let mut s = self.lock();
        let before = s.prompts.len();
        s.prompts.retain(|p| p.id != prompt_id);
        if s.prompts.len() == before {
            return Err(not_found("prompt"));
        }
        Ok(())
    }

    async fn create_draft(&self, prompt_id: &str, req: &NewDraft) -> GatewayResult<()> {
        self.record("create_draft", req)?;
        let id = self.next_id("d");
        let mut s = self.lock();
        let prompt = s
            .prompts
            .iter_mut()
            .find(|p| p.id == prompt_id)
            .ok_or_else(|| not_found("prompt"))?;
        prompt.drafts.push(Draft {
            id,
            title: req.title.clone(),
            link: req.link.clone(),
            backed_up: false,
            note_name: None,
        });
        Ok(())
    }

    async fn update_draft(&self, prompt_id: &str, req: &DraftUpdate) -> GatewayResult<()> {
        self.record("update_draft", req)?;
        let mut s = self.lock();
        let draft = s
            .prompts
            .iter_mut()
            .find(|p| p.id == prompt_id)
            .and_then(|p| p.drafts.iter_mut().find(|d| d.id == req.id))
            .ok_or_else(|| not_found("draft"))?;
        draft.backed_up = req.backed_up;
        draft.note_name = Some(req.note_name.clone()).filter(|n| !n.is_empty());
        Ok(())
    }

    async fn delete_draft(&self, prompt_id: &str, draft_id: &str) -> GatewayResult<()> {
        self.record("delete_draft", &draft_id)?;
        let mut s = self.lock();
        let prompt = s
            .prompts
            .iter_mut()
            .find(|p| p.id == prompt_id)
            .ok_or_else(|| not_found("prompt"))?;
        prompt.drafts.retain(|d| d.id != draft_id);
        Ok(())
    }

    async fn list_folders(&self) -> GatewayResult<Vec<Folder>> {
        self.record("list_folders", &())?;
        Ok(self.lock().folders.clone())
    }

    async fn create_folder(&self, req: &NewFolder) -> GatewayResult<()> {
        self.record("create_folder", req)?;
        let id = self.next_id("f");
        self.lock().folders.push(Folder {
            id,
            name: req.name.clone(),
            color: req.color.clone(),
        });
        Ok(())
    }

    async fn delete_folder(&self, folder_id: &str) -> GatewayResult<()> {
        self.record("delete_folder", &folder_id)?;
        self.lock().folders.retain(|f| f.id != folder_id);
        Ok(())
    }

    async fn list_boards(&self) -> GatewayResult<Vec<IdeaBoard>> {
        self.record("list_boards", &())?;
        Ok(self.lock().boards.clone())
    }

    async fn create_board(&self, req: &NewBoard) -> GatewayResult<IdeaBoard> {
        self.record("create_board", req)?;
        let board = IdeaBoard {
            id: self.next_id("b"),
            name: req.name.clone(),
            description: req.description.clone(),
            nodes: Vec::new(),
            edges: Vec::new(),
            created: 1_700_000_000.0,
            modified: 1_700_000_000.0,
        };
        self.lock().boards.push(board.clone());
        Ok(board)
    }

    async fn update_board(&self, board: &IdeaBoard) -> GatewayResult<IdeaBoard> {
        self.record("update_board", board)?;
        let mut s = self.lock();
        let slot = s
            .boards
            .iter_mut()
            .find(|b| b.id == board.id)
            .ok_or_else(|| not_found("board"))?;
        *slot = board.clone();
        Ok(board.clone())
    }

    async fn delete_board(&self, board_id: &str) -> GatewayResult<()> {
        self.record("delete_board", &board_id)?;
        self.lock().boards.retain(|b| b.id != board_id);
        Ok(())
    }
}

/// Captures URIs instead of launching anything.
#[derive(Default)]
pub(crate) struct RecordingOpener {
    opened: Mutex<Vec<String>>,
}

impl RecordingOpener {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl crate::vault::ExternalOpener for RecordingOpener {
    fn open(&self, uri: &str) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(uri.to_string());
        Ok(())
    }
}
