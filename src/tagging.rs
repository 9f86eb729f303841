use serde::Serialize;

use crate::error::FlowError;
use crate::gateway::{Backend, GatewayResult};
use crate::notify::Notifier;
use crate::types::BatchTagRequest;

/// Split a comma-separated tag string. Each token is trimmed, loses any
/// leading `#`, and is dropped if nothing is left.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|t| t.trim().trim_start_matches('#').trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Note names picked for batch tagging, in the order they were picked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Selection {
    names: Vec<String>,
}

impl Selection {
    /// Add if absent, remove if present. Returns whether it is now selected.
    pub fn toggle(&mut self, name: &str) -> bool {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            self.names.remove(pos);
            false
        } else {
            self.names.push(name.to_string());
            true
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn clear(&mut self) {
        self.names.clear();
    }

    /// Drop names that are no longer listed.
    pub fn retain_listed<'a>(&mut self, listed: impl IntoIterator<Item = &'a str>) {
        let listed: std::collections::HashSet<&str> = listed.into_iter().collect();
        self.names.retain(|n| listed.contains(n.as_str()));
    }
}

/// Transient state of one batch-tag dialog. Search results and the full
/// listing each own one; they never share a selection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TagDialog {
    pub input: String,
    pub selection: Selection,
}

impl TagDialog {
    /// Build the batch-tag request. `Ok(None)` when no tag survives parsing.
    pub fn begin(&self, notifier: &Notifier) -> Result<Option<BatchTagRequest>, FlowError> {
        let tags = parse_tags(&self.input);
        if tags.is_empty() {
            return Ok(None);
        }
        if self.selection.is_empty() {
            notifier.error("Select at least one note to tag");
            return Err(FlowError::MissingField("Note selection"));
        }
        Ok(Some(BatchTagRequest {
            note_names: self.selection.names().to_vec(),
            tags,
        }))
    }

    /// On success the input and selection are cleared and the caller should
    /// refresh whatever list the selection came from.
    pub fn finish(&mut self, notifier: &Notifier, outcome: GatewayResult<()>) -> Result<(), FlowError> {
        match outcome {
            Ok(()) => {
                self.input.clear();
                self.selection.clear();
                notifier.success("Tags added!");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("batch tag failed: {e}");
                notifier.error("Failed to add tags");
                Err(e.into())
            }
        }
    }

    /// Send the parsed tags for the selected notes. Returns `Ok(false)`
    /// without a request when there is nothing to send.
    pub async fn apply(
        &mut self,
        backend: &dyn Backend,
        notifier: &Notifier,
    ) -> Result<bool, FlowError> {
        let Some(req) = self.begin(notifier)? else {
            return Ok(false);
        };
        tracing::debug!("tagging {} notes", req.note_names.len());
        let outcome = backend.batch_tag(&req).await;
        self.finish(notifier, outcome)?;
        Ok(true)
    }
}
