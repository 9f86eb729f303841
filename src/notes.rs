use std::sync::Arc;

use serde::Serialize;

use crate::error::FlowError;
use crate::gateway::{Backend, GatewayResult};
use crate::notify::Notifier;
use crate::tagging::TagDialog;
use crate::types::{Note, NoteKind};
use crate::vault::note_file_name;

#[derive(Debug, Clone, Serialize)]
pub struct NotesView {
    pub notes: Vec<Note>,
    pub tagging: TagDialog,
}

/// Full note listing with its own batch-tag dialog.
pub struct NotesListing {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    notes: Vec<Note>,
    pub tagging: TagDialog,
}

impl NotesListing {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            notes: Vec::new(),
            tagging: TagDialog::default(),
        }
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn find(&self, name: &str) -> Option<&Note> {
        self.notes.iter().find(|n| n.name == name)
    }

    pub fn view(&self) -> NotesView {
        NotesView {
            notes: self.notes.clone(),
            tagging: self.tagging.clone(),
        }
    }

    /// Install a fetched listing. Selected names that vanished are dropped.
    pub fn apply(&mut self, outcome: GatewayResult<Vec<Note>>) -> Result<(), FlowError> {
        match outcome {
            Ok(notes) => {
                self.tagging
                    .selection
                    .retain_listed(notes.iter().map(|n| n.name.as_str()));
                self.notes = notes;
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Failed to fetch all notes");
                Err(e.into())
            }
        }
    }

    pub async fn refresh(&mut self) -> Result<(), FlowError> {
        let outcome = self.backend.all_notes().await;
        self.apply(outcome)
    }

    /// Batch-tag the selected notes, then re-fetch the listing.
    pub async fn tag_selected(&mut self) -> Result<bool, FlowError> {
        let sent = self.tagging.apply(self.backend.as_ref(), &self.notifier).await?;
        if sent {
            self.refresh().await?;
        }
        Ok(sent)
    }
}

/// Raw markdown of one note.
pub async fn view_note(
    backend: &dyn Backend,
    notifier: &Notifier,
    name: &str,
    kind: NoteKind,
) -> Result<String, FlowError> {
    let file_name = note_file_name(name, kind);
    backend.note_content(&file_name).await.map_err(|e| {
        tracing::warn!("loading {file_name}: {e}");
        notifier.error("Failed to load note");
        e.into()
    })
}
