//! Deep links into the Obsidian vault.
//!
//! The main view builds `<vault>/<file>`. Board nodes live one level deeper,
//! under `<vault>/<board_notes_dir>/<file>`.

use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use crate::error::FlowError;
use crate::notify::Notifier;
use crate::store::LocalStore;
use crate::types::NoteKind;

/// Local-store key holding the vault root.
pub const VAULT_PATH_KEY: &str = "obsidianVaultPath";

/// `"Idea - Foo.md"` / `"Piece - Foo.md"`.
pub fn note_file_name(name: &str, kind: NoteKind) -> String {
    format!("{}{}.md", kind.file_prefix(), name)
}

pub fn note_path(vault: &str, subdir: Option<&str>, file_name: &str) -> String {
    let root = vault.trim_end_matches('/');
    match subdir {
        Some(dir) => format!("{root}/{dir}/{file_name}"),
        None => format!("{root}/{file_name}"),
    }
}

pub fn obsidian_uri(path: &str) -> String {
    format!("obsidian://open?path={}", urlencoding::encode(path))
}

/// Hands a URI to whatever the desktop has registered for its scheme.
pub trait ExternalOpener: Send + Sync {
    fn open(&self, uri: &str) -> anyhow::Result<()>;
}

pub struct SystemOpener;

impl ExternalOpener for SystemOpener {
    fn open(&self, uri: &str) -> anyhow::Result<()> {
        open::that_detached(uri).with_context(|| format!("launching {uri}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "uri", rename_all = "snake_case")]
pub enum OpenOutcome {
    Opened(String),
    /// No vault path stored yet; the file is held until one is saved.
    NeedsVaultPath,
}

pub struct VaultLinker {
    store: LocalStore,
    opener: Arc<dyn ExternalOpener>,
    notifier: Notifier,
    board_notes_dir: Option<String>,
    pending: Option<String>,
}

impl VaultLinker {
    pub fn new(
        store: LocalStore,
        opener: Arc<dyn ExternalOpener>,
        notifier: Notifier,
        board_notes_dir: Option<String>,
    ) -> Self {
        Self {
            store,
            opener,
            notifier,
            board_notes_dir,
            pending: None,
        }
    }

    pub fn vault_path(&self) -> Result<Option<String>, FlowError> {
        Ok(self
            .store
            .get(VAULT_PATH_KEY)?
            .filter(|p| !p.trim().is_empty()))
    }

    /// File name waiting for a vault path, if any.
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn cancel_pending(&mut self) {
        self.pending = None;
    }

    /// Open a note from the main view. Without a stored vault path the note is
    /// remembered and the caller should ask for the path.
    pub fn open_note(&mut self, name: &str, kind: NoteKind) -> Result<OpenOutcome, FlowError> {
        let file_name = note_file_name(name, kind);
        match self.vault_path()? {
            Some(vault) => {
                let uri = self.launch(&note_path(&vault, None, &file_name))?;
                Ok(OpenOutcome::Opened(uri))
            }
            None => {
                tracing::debug!("vault path unset; holding {file_name}");
                self.pending = Some(file_name);
                Ok(OpenOutcome::NeedsVaultPath)
            }
        }
    }

    /// Persist the vault root and open whatever was pending.
    pub fn set_vault_path(&mut self, path: &str) -> Result<Option<String>, FlowError> {
        let path = path.trim();
        if path.is_empty() {
            self.notifier.error("Vault path is required");
            return Err(FlowError::MissingField("Vault path"));
        }
        if let Err(e) = self.store.set(VAULT_PATH_KEY, path) {
            self.notifier.error("Failed to save vault path");
            return Err(e.into());
        }
        self.notifier.success("Vault path saved");
        match self.pending.take() {
            Some(file_name) => Ok(Some(self.launch(&note_path(path, None, &file_name))?)),
            None => Ok(None),
        }
    }

    pub fn clear_vault_path(&mut self) -> Result<(), FlowError> {
        self.store.remove(VAULT_PATH_KEY)?;
        Ok(())
    }

    /// Open a board node's note. A missing vault path aborts with an error.
    pub fn open_board_note(&self, name: &str, kind: NoteKind) -> Result<String, FlowError> {
        let Some(vault) = self.vault_path()? else {
            self.notifier.error(FlowError::MissingVaultPath.to_string());
            return Err(FlowError::MissingVaultPath);
        };
        let path = note_path(
            &vault,
            self.board_notes_dir.as_deref(),
            &note_file_name(name, kind),
        );
        self.launch(&path)
    }

    fn launch(&self, path: &str) -> Result<String, FlowError> {
        let uri = obsidian_uri(path);
        if let Err(e) = self.opener.open(&uri) {
            self.notifier.error("Failed to open note in Obsidian");
            return Err(e.into());
        }
        tracing::info!("Opened {uri}");
        Ok(uri)
    }
}
