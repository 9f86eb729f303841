//! Writing prompts, their drafts, and the folders used to group them.
//!
//! Every mutation is followed by a full re-fetch; nothing is patched locally.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, GatewayError};
use crate::gateway::{Backend, GatewayResult};
use crate::notify::Notifier;
use crate::palette::pick_folder_color;
use crate::types::{DraftUpdate, Folder, NewDraft, NewFolder, NewPrompt, Prompt, PromptUpdate};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum FolderFilter {
    #[default]
    All,
    Folder(String),
}

impl FolderFilter {
    pub fn admits(&self, prompt: &Prompt) -> bool {
        match self {
            FolderFilter::All => true,
            FolderFilter::Folder(id) => prompt.folder.as_deref() == Some(id.as_str()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PromptsView {
    pub filter: FolderFilter,
    pub folders: Vec<Folder>,
    pub prompts: Vec<Prompt>,
}

pub struct PromptRegistry {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    prompts: Vec<Prompt>,
    folders: Vec<Folder>,
    filter: FolderFilter,
}

#[derive(Debug, Clone)]
pub enum PromptRequest {
    CreatePrompt(NewPrompt),
    UpdatePrompt(PromptUpdate),
    DeletePrompt(String),
    CreateDraft { prompt_id: String, draft: NewDraft },
    UpdateDraft { prompt_id: String, update: DraftUpdate },
    DeleteDraft { prompt_id: String, draft_id: String },
    CreateFolder(NewFolder),
    DeleteFolder(String),
}

/// One validated mutation plus the notices it settles with.
#[derive(Debug, Clone)]
pub struct PromptChange {
    pub request: PromptRequest,
    ok: &'static str,
    failed: &'static str,
}

impl PromptChange {
    fn new(request: PromptRequest, ok: &'static str, failed: &'static str) -> Self {
        Self { request, ok, failed }
    }

    pub async fn send(&self, backend: &dyn Backend) -> GatewayResult<()> {
        match &self.request {
            PromptRequest::CreatePrompt(req) => backend.create_prompt(req).await,
            PromptRequest::UpdatePrompt(req) => backend.update_prompt(req).await,
            PromptRequest::DeletePrompt(id) => backend.delete_prompt(id).await,
            PromptRequest::CreateDraft { prompt_id, draft } => {
                backend.create_draft(prompt_id, draft).await
            }
            PromptRequest::UpdateDraft { prompt_id, update } => {
                backend.update_draft(prompt_id, update).await
            }
            PromptRequest::DeleteDraft { prompt_id, draft_id } => {
                backend.delete_draft(prompt_id, draft_id).await
            }
            PromptRequest::CreateFolder(req) => backend.create_folder(req).await,
            PromptRequest::DeleteFolder(id) => backend.delete_folder(id).await,
        }
    }

    fn failure_message(&self, err: &GatewayError) -> String {
        match (&self.request, err) {
            (PromptRequest::CreateDraft { .. }, GatewayError::Status { status, body }) => {
                format!("{}: {status} - {body}", self.failed)
            }
            _ => self.failed.to_string(),
        }
    }
}

/// Both listings, fetched together but applied independently.
pub struct PromptLists {
    pub prompts: GatewayResult<Vec<Prompt>>,
    pub folders: GatewayResult<Vec<Folder>>,
}

impl PromptLists {
    pub async fn fetch(backend: &dyn Backend) -> Self {
        Self {
            prompts: backend.list_prompts().await,
            folders: backend.list_folders().await,
        }
    }
}

fn required(value: &str, field: &'static str) -> Result<String, FlowError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FlowError::MissingField(field));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

impl PromptRegistry {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            prompts: Vec::new(),
            folders: Vec::new(),
            filter: FolderFilter::All,
        }
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn filter(&self) -> &FolderFilter {
        &self.filter
    }

    pub fn prompt(&self, id: &str) -> Option<&Prompt> {
        self.prompts.iter().find(|p| p.id == id)
    }

    /// Prompts admitted by the current folder filter.
    pub fn visible_prompts(&self) -> Vec<&Prompt> {
        self.prompts.iter().filter(|p| self.filter.admits(p)).collect()
    }

    pub fn view(&self) -> PromptsView {
        PromptsView {
            filter: self.filter.clone(),
            folders: self.folders.clone(),
            prompts: self.visible_prompts().into_iter().cloned().collect(),
        }
    }

    fn reject(&self, err: FlowError) -> FlowError {
        self.notifier.error(err.to_string());
        err
    }

    fn known_folder(&self, id: &str) -> Result<(), FlowError> {
        if self.folders.iter().any(|f| f.id == id) {
            Ok(())
        } else {
            Err(self.reject(FlowError::UnknownFolder(id.to_string())))
        }
    }

    pub fn set_filter(&mut self, filter: FolderFilter) -> Result<(), FlowError> {
        if let FolderFilter::Folder(id) = &filter {
            self.known_folder(id)?;
        }
        self.filter = filter;
        Ok(())
    }

    /// Install fetched listings. Each list is kept when its own call
    /// succeeded; any failure is reported once.
    pub fn apply_lists(&mut self, lists: PromptLists) -> Result<(), FlowError> {
        let mut failure = None;
        match lists.prompts {
            Ok(prompts) => self.prompts = prompts,
            Err(e) => failure = Some(e),
        }
        match lists.folders {
            Ok(folders) => {
                self.folders = folders;
                if let FolderFilter::Folder(id) = &self.filter {
                    if !self.folders.iter().any(|f| &f.id == id) {
                        self.filter = FolderFilter::All;
                    }
                }
            }
            Err(e) => failure = failure.or(Some(e)),
        }
        match failure {
            None => Ok(()),
            Some(e) => {
                self.notifier.error("Failed to load prompts");
                Err(e.into())
            }
        }
    }

    /// Re-fetch prompts and folders.
    pub async fn refresh(&mut self) -> Result<(), FlowError> {
        let lists = PromptLists::fetch(self.backend.as_ref()).await;
        self.apply_lists(lists)
    }

    /// Post the outcome of a sent change. The caller re-fetches on success.
    pub fn finish(&mut self, change: &PromptChange, outcome: GatewayResult<()>) -> Result<(), FlowError> {
        match outcome {
            Ok(()) => {
                if let PromptRequest::DeleteFolder(id) = &change.request {
                    if self.filter == FolderFilter::Folder(id.clone()) {
                        self.filter = FolderFilter::All;
                    }
                }
                self.notifier.success(change.ok);
                Ok(())
            }
            Err(e) => {
                self.notifier.error(change.failure_message(&e));
                Err(e.into())
            }
        }
    }

    async fn submit(&mut self, change: PromptChange) -> Result<(), FlowError> {
        let outcome = change.send(self.backend.as_ref()).await;
        self.finish(&change, outcome)?;
        if let Err(e) = self.refresh().await {
            tracing::warn!("refresh after '{}' failed: {e}", change.ok);
        }
        Ok(())
    }

    // ── Prompts ──

    pub fn begin_create_prompt(
        &self,
        title: &str,
        prompt: &str,
        essay_link: Option<&str>,
        folder: Option<&str>,
    ) -> Result<PromptChange, FlowError> {
        let req = NewPrompt {
            title: required(title, "Title").map_err(|e| self.reject(e))?,
            prompt: required(prompt, "Prompt").map_err(|e| self.reject(e))?,
            essay_link: optional(essay_link),
            folder: optional(folder),
        };
        Ok(PromptChange::new(
            PromptRequest::CreatePrompt(req),
            "Prompt created successfully!",
            "Failed to create prompt",
        ))
    }

    /// Mark a prompt archived (or not). `note_name` is the note it was archived to.
    pub fn begin_prompt_backed_up(
        &self,
        prompt_id: &str,
        backed_up: bool,
        note_name: Option<&str>,
    ) -> Result<PromptChange, FlowError> {
        let req = PromptUpdate {
            id: prompt_id.to_string(),
            backed_up: Some(backed_up),
            note_name: Some(note_name.unwrap_or_default().trim().to_string()),
            folder: None,
        };
        Ok(PromptChange::new(
            PromptRequest::UpdatePrompt(req),
            "Prompt updated successfully!",
            "Failed to update prompt",
        ))
    }

    /// Move a prompt into `folder_id`, or out of every folder with `None`.
    pub fn begin_move_prompt(
        &self,
        prompt_id: &str,
        folder_id: Option<&str>,
    ) -> Result<PromptChange, FlowError> {
        if let Some(id) = folder_id {
            self.known_folder(id)?;
        }
        let req = PromptUpdate {
            id: prompt_id.to_string(),
            folder: Some(folder_id.unwrap_or_default().to_string()),
            ..PromptUpdate::default()
        };
        Ok(PromptChange::new(
            PromptRequest::UpdatePrompt(req),
            "Prompt moved",
            "Failed to move prompt",
        ))
    }

    pub fn begin_delete_prompt(&self, prompt_id: &str) -> Result<PromptChange, FlowError> {
        Ok(PromptChange::new(
            PromptRequest::DeletePrompt(prompt_id.to_string()),
            "Prompt deleted successfully!",
            "Failed to delete prompt",
        ))
    }

    pub async fn create_prompt(
        &mut self,
        title: &str,
        prompt: &str,
        essay_link: Option<&str>,
        folder: Option<&str>,
    ) -> Result<(), FlowError> {
        let change = self.begin_create_prompt(title, prompt, essay_link, folder)?;
        self.submit(change).await
    }

    pub async fn set_prompt_backed_up(
        &mut self,
        prompt_id: &str,
        backed_up: bool,
        note_name: Option<&str>,
    ) -> Result<(), FlowError> {
        let change = self.begin_prompt_backed_up(prompt_id, backed_up, note_name)?;
        self.submit(change).await
    }

    pub async fn move_prompt(
        &mut self,
        prompt_id: &str,
        folder_id: Option<&str>,
    ) -> Result<(), FlowError> {
        let change = self.begin_move_prompt(prompt_id, folder_id)?;
        self.submit(change).await
    }

    pub async fn delete_prompt(&mut self, prompt_id: &str) -> Result<(), FlowError> {
        let change = self.begin_delete_prompt(prompt_id)?;
        self.submit(change).await
    }

    // ── Drafts ──

    pub fn begin_create_draft(
        &self,
        prompt_id: &str,
        title: &str,
        link: &str,
    ) -> Result<PromptChange, FlowError> {
        let draft = NewDraft {
            title: required(title, "Title").map_err(|e| self.reject(e))?,
            link: required(link, "Link").map_err(|e| self.reject(e))?,
        };
        Ok(PromptChange::new(
            PromptRequest::CreateDraft {
                prompt_id: prompt_id.to_string(),
                draft,
            },
            "Draft created successfully!",
            "Failed to create draft",
        ))
    }

    pub fn begin_draft_backed_up(
        &self,
        prompt_id: &str,
        draft_id: &str,
        backed_up: bool,
        note_name: Option<&str>,
    ) -> Result<PromptChange, FlowError> {
        let update = DraftUpdate {
            id: draft_id.to_string(),
            backed_up,
            note_name: note_name.unwrap_or_default().trim().to_string(),
        };
        Ok(PromptChange::new(
            PromptRequest::UpdateDraft {
                prompt_id: prompt_id.to_string(),
                update,
            },
            "Draft updated successfully!",
            "Failed to update draft",
        ))
    }

    pub fn begin_delete_draft(&self, prompt_id: &str, draft_id: &str) -> Result<PromptChange, FlowError> {
        Ok(PromptChange::new(
            PromptRequest::DeleteDraft {
                prompt_id: prompt_id.to_string(),
                draft_id: draft_id.to_string(),
            },
            "Draft deleted successfully!",
            "Failed to delete draft",
        ))
    }

    pub async fn create_draft(
        &mut self,
        prompt_id: &str,
        title: &str,
        link: &str,
    ) -> Result<(), FlowError> {
        let change = self.begin_create_draft(prompt_id, title, link)?;
        self.submit(change).await
    }

    pub async fn set_draft_backed_up(
        &mut self,
        prompt_id: &str,
        draft_id: &str,
        backed_up: bool,
        note_name: Option<&str>,
    ) -> Result<(), FlowError> {
        let change = self.begin_draft_backed_up(prompt_id, draft_id, backed_up, note_name)?;
        self.submit(change).await
    }

    pub async fn delete_draft(&mut self, prompt_id: &str, draft_id: &str) -> Result<(), FlowError> {
        let change = self.begin_delete_draft(prompt_id, draft_id)?;
        self.submit(change).await
    }

    // ── Folders ──

    pub fn begin_create_folder(&self, name: &str) -> Result<PromptChange, FlowError> {
        let name = required(name, "Folder name").map_err(|e| self.reject(e))?;
        let color = {
            let in_use = self.folders.iter().map(|f| f.color.as_str());
            pick_folder_color(in_use, &mut rand::thread_rng()).to_string()
        };
        Ok(PromptChange::new(
            PromptRequest::CreateFolder(NewFolder { name, color }),
            "Folder created",
            "Failed to create folder",
        ))
    }

    /// Prompts that pointed at the folder are the backend's concern.
    pub fn begin_delete_folder(&self, folder_id: &str) -> Result<PromptChange, FlowError> {
        Ok(PromptChange::new(
            PromptRequest::DeleteFolder(folder_id.to_string()),
            "Folder deleted",
            "Failed to delete folder",
        ))
    }

    pub async fn create_folder(&mut self, name: &str) -> Result<(), FlowError> {
        let change = self.begin_create_folder(name)?;
        self.submit(change).await
    }

    pub async fn delete_folder(&mut self, folder_id: &str) -> Result<(), FlowError> {
        let change = self.begin_delete_folder(folder_id)?;
        self.submit(change).await
    }

    /// Apply a spoken folder command to the filter.
    pub fn apply_voice(&mut self, utterance: &str) -> Result<FolderFilter, FlowError> {
        match crate::voice::interpret(utterance, &self.folders) {
            Ok(filter) => {
                let label = match &filter {
                    FolderFilter::All => "all prompts".to_string(),
                    FolderFilter::Folder(id) => self
                        .folders
                        .iter()
                        .find(|f| &f.id == id)
                        .map(|f| f.name.clone())
                        .unwrap_or_else(|| id.clone()),
                };
                self.notifier.success(format!("Showing {label}"));
                self.filter = filter.clone();
                Ok(filter)
            }
            Err(e) => {
                self.notifier.error(e.to_string());
                Err(e.into())
            }
        }
    }
}
