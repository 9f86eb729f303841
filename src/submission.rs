use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, GatewayError};
use crate::gateway::Backend;
use crate::notify::Notifier;
use crate::stats::StatsCache;
use crate::tagging::Selection;
use crate::types::{ConnectRequest, NoteKind, SubmitRequest, SubmitResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Composing,
    Submitting,
    /// Suggestions received; links are being picked.
    Suggested,
    Connecting,
}

impl Phase {
    fn busy_label(self) -> &'static str {
        match self {
            Phase::Submitting => "submitting",
            Phase::Connecting => "connecting",
            _ => "idle",
        }
    }
}

/// Compose form fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compose {
    pub kind: NoteKind,
    pub note_name: String,
    pub content: String,
    /// Only meaningful for pieces.
    pub external: bool,
}

impl Default for Compose {
    fn default() -> Self {
        Self {
            kind: NoteKind::Idea,
            note_name: String::new(),
            content: String::new(),
            external: false,
        }
    }
}

pub fn has_invalid_chars(name: &str) -> bool {
    name.contains('|') || name.contains('/')
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub phase: Phase,
    pub compose: Compose,
    pub can_submit: bool,
    pub canonical_name: Option<String>,
    pub suggestions: Vec<String>,
    pub selected: Selection,
}

/// Compose a note, receive suggested links, commit the approved ones.
pub struct SubmissionFlow {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    stats: StatsCache,
    pub compose: Compose,
    phase: Phase,
    canonical_name: Option<String>,
    suggestions: Vec<String>,
    selected: Selection,
}

impl SubmissionFlow {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier, stats: StatsCache) -> Self {
        Self {
            backend,
            notifier,
            stats,
            compose: Compose::default(),
            phase: Phase::Composing,
            canonical_name: None,
            suggestions: Vec::new(),
            selected: Selection::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn selected(&self) -> &Selection {
        &self.selected
    }

    pub fn canonical_name(&self) -> Option<&str> {
        self.canonical_name.as_deref()
    }

    pub fn view(&self) -> SubmissionView {
        SubmissionView {
            phase: self.phase,
            compose: self.compose.clone(),
            can_submit: self.can_submit(),
            canonical_name: self.canonical_name.clone(),
            suggestions: self.suggestions.clone(),
            selected: self.selected.clone(),
        }
    }

    pub fn can_submit(&self) -> bool {
        !has_invalid_chars(&self.compose.note_name)
            && !self.compose.content.trim().is_empty()
            && !matches!(self.phase, Phase::Submitting | Phase::Connecting)
    }

    fn reject(&self, err: FlowError) -> FlowError {
        self.notifier.error(err.to_string());
        err
    }

    /// Load a prompt into the form so it can be archived as a piece.
    pub fn prefill_from_prompt(&mut self, title: &str, prompt: &str) {
        self.compose.note_name = title.to_string();
        self.compose.content = prompt.to_string();
        self.compose.kind = NoteKind::Piece;
    }

    /// Validate and build the request. Clears any previous suggestions and the
    /// note name field.
    pub fn begin_submit(&mut self) -> Result<SubmitRequest, FlowError> {
        if matches!(self.phase, Phase::Submitting | Phase::Connecting) {
            return Err(self.reject(FlowError::NotReady(self.phase.busy_label())));
        }
        if has_invalid_chars(&self.compose.note_name) {
            return Err(self.reject(FlowError::InvalidNoteName));
        }
        if self.compose.content.trim().is_empty() {
            return Err(self.reject(FlowError::MissingField("Content")));
        }

        self.suggestions.clear();
        self.selected.clear();
        self.canonical_name = None;
        self.phase = Phase::Submitting;
        let kind = self.compose.kind;
        Ok(SubmitRequest {
            kind,
            content: self.compose.content.clone(),
            note_name: std::mem::take(&mut self.compose.note_name),
            external: kind == NoteKind::Piece && self.compose.external,
        })
    }

    pub fn finish_submit(
        &mut self,
        submitted_name: &str,
        outcome: Result<SubmitResponse, GatewayError>,
    ) -> Result<(), FlowError> {
        match outcome {
            Ok(resp) => {
                let name = if resp.note_name.is_empty() {
                    submitted_name.to_string()
                } else {
                    resp.note_name
                };
                self.suggestions = resp.suggestions.unwrap_or_default();
                tracing::info!(
                    "Submitted '{name}', {} suggested links",
                    self.suggestions.len()
                );
                self.canonical_name = Some(name);
                self.compose.content.clear();
                self.compose.note_name.clear();
                self.compose.external = false;
                self.phase = if self.suggestions.is_empty() {
                    Phase::Composing
                } else {
                    Phase::Suggested
                };
                self.notifier.success("Note submitted successfully!");
                self.stats.spawn_refresh(self.backend.clone());
                Ok(())
            }
            Err(e) => {
                self.phase = Phase::Composing;
                self.notifier.error("Submission failed");
                Err(e.into())
            }
        }
    }

    pub async fn submit(&mut self) -> Result<(), FlowError> {
        let req = self.begin_submit()?;
        let outcome = self.backend.submit(&req).await;
        self.finish_submit(&req.note_name, outcome)
    }

    /// Toggle one suggestion in or out of the approved set.
    pub fn toggle(&mut self, suggestion: &str) -> Result<bool, FlowError> {
        if self.phase != Phase::Suggested {
            return Err(self.reject(FlowError::NotReady("no suggestions are pending")));
        }
        if !self.suggestions.iter().any(|s| s == suggestion) {
            return Err(self.reject(FlowError::UnknownNote(suggestion.to_string())));
        }
        Ok(self.selected.toggle(suggestion))
    }

    pub fn begin_connect(&mut self) -> Result<ConnectRequest, FlowError> {
        if self.phase != Phase::Suggested {
            return Err(self.reject(FlowError::NotReady("no suggestions are pending")));
        }
        if self.selected.is_empty() {
            return Err(self.reject(FlowError::MissingField("At least one connection")));
        }
        let new_note = self.canonical_name.clone().unwrap_or_default();
        self.phase = Phase::Connecting;
        Ok(ConnectRequest {
            new_note,
            connections: self.selected.names().to_vec(),
        })
    }

    pub fn finish_connect(&mut self, outcome: Result<(), GatewayError>) -> Result<(), FlowError> {
        match outcome {
            Ok(()) => {
                tracing::info!("Connected {} links", self.selected.len());
                self.suggestions.clear();
                self.selected.clear();
                self.canonical_name = None;
                self.compose = Compose {
                    kind: self.compose.kind,
                    ..Compose::default()
                };
                self.phase = Phase::Composing;
                self.notifier.success("Connections added!");
                self.stats.spawn_refresh(self.backend.clone());
                Ok(())
            }
            Err(e) => {
                self.phase = Phase::Suggested;
                self.notifier.error("Connection failed");
                Err(e.into())
            }
        }
    }

    pub async fn connect(&mut self) -> Result<(), FlowError> {
        let req = self.begin_connect()?;
        let outcome = self.backend.connect(&req).await;
        self.finish_connect(outcome)
    }

    /// Drop pending suggestions without connecting.
    pub fn dismiss_suggestions(&mut self) {
        if self.phase == Phase::Suggested {
            self.suggestions.clear();
            self.selected.clear();
            self.canonical_name = None;
            self.phase = Phase::Composing;
        }
    }
}
