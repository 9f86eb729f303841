//! Idea board graph editor.
//!
//! Edits are request-then-commit: the updated board is built, sent whole, and
//! only adopted once the backend accepts it. A failed edit leaves the loaded
//! board untouched.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::error::FlowError;
use crate::gateway::{Backend, GatewayResult};
use crate::notify::Notifier;
use crate::types::{BoardEdge, BoardNode, IdeaBoard, NewBoard, Note, NoteKind};
use crate::vault::VaultLinker;

pub const EXTERNAL_COLOR: &str = "#ff9800";
pub const IDEA_COLOR: &str = "#4caf50";
pub const PIECE_COLOR: &str = "#2196f3";
pub const ANNOTATED_EDGE_COLOR: &str = "#ff9800";
pub const PLAIN_EDGE_COLOR: &str = "#b0b0b0";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeRender {
    #[serde(flatten)]
    pub node: BoardNode,
    pub color: &'static str,
    pub size: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeRender {
    #[serde(flatten)]
    pub edge: BoardEdge,
    pub color: &'static str,
    pub width: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderState {
    pub nodes: Vec<NodeRender>,
    pub links: Vec<EdgeRender>,
}

pub fn render_node(node: &BoardNode) -> NodeRender {
    let color = match (node.external, node.kind) {
        (true, _) => EXTERNAL_COLOR,
        (false, NoteKind::Idea) => IDEA_COLOR,
        (false, NoteKind::Piece) => PIECE_COLOR,
    };
    NodeRender {
        node: node.clone(),
        color,
        size: if node.external { 12 } else { 8 },
    }
}

pub fn render_edge(edge: &BoardEdge) -> EdgeRender {
    let annotated = edge.is_annotated();
    EdgeRender {
        edge: edge.clone(),
        color: if annotated { ANNOTATED_EDGE_COLOR } else { PLAIN_EDGE_COLOR },
        width: if annotated { 3 } else { 1 },
    }
}

/// Visual attributes for a board. Pure function of its nodes and edges.
pub fn render(board: &IdeaBoard) -> RenderState {
    RenderState {
        nodes: board.nodes.iter().map(render_node).collect(),
        links: board.edges.iter().map(render_edge).collect(),
    }
}

/// Either endpoint order counts as the same connection.
pub fn has_edge_between(board: &IdeaBoard, a: &str, b: &str) -> bool {
    let forward = format!("{a}-{b}");
    let reverse = format!("{b}-{a}");
    board.edges.iter().any(|e| e.id == forward || e.id == reverse)
}

fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

#[derive(Debug, Clone, Serialize)]
pub struct BoardsView {
    pub boards: Vec<IdeaBoard>,
    pub current: Option<IdeaBoard>,
    pub graph: Option<RenderState>,
}

#[derive(Debug, Default)]
struct Listed {
    boards: Vec<IdeaBoard>,
    /// Bumped by every write; a background fetch only lands if nothing
    /// was written after it started.
    generation: u64,
}

/// Last fetched board list, shared with background refreshes.
#[derive(Debug, Clone, Default)]
pub struct BoardList {
    inner: Arc<Mutex<Listed>>,
}

impl BoardList {
    fn with<R>(&self, f: impl FnOnce(&mut Listed) -> R) -> R {
        let mut guard = match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn snapshot(&self) -> Vec<IdeaBoard> {
        self.with(|l| l.boards.clone())
    }

    pub fn find(&self, board_id: &str) -> Option<IdeaBoard> {
        self.with(|l| l.boards.iter().find(|b| b.id == board_id).cloned())
    }

    pub fn set(&self, boards: Vec<IdeaBoard>) {
        self.with(|l| {
            l.boards = boards;
            l.generation += 1;
        });
    }

    fn upsert(&self, board: IdeaBoard) {
        self.with(|l| {
            match l.boards.iter_mut().find(|b| b.id == board.id) {
                Some(slot) => *slot = board,
                None => l.boards.push(board),
            }
            l.generation += 1;
        });
    }

    fn remove(&self, board_id: &str) {
        self.with(|l| {
            l.boards.retain(|b| b.id != board_id);
            l.generation += 1;
        });
    }

    /// Re-fetch in the background. Failures keep the current list.
    pub fn spawn_refresh(&self, backend: Arc<dyn Backend>) {
        let list = self.clone();
        let started = self.with(|l| {
            l.generation += 1;
            l.generation
        });
        tokio::spawn(async move {
            match backend.list_boards().await {
                Ok(boards) => list.with(|l| {
                    if l.generation == started {
                        l.boards = boards;
                    }
                }),
                Err(e) => tracing::warn!("board list refresh failed: {e}"),
            }
        });
    }
}

/// A whole-board update, built locally and sent as one request.
#[derive(Debug, Clone)]
pub struct BoardChange {
    pub updated: IdeaBoard,
    ok: &'static str,
    failed: &'static str,
}

impl BoardChange {
    fn new(mut updated: IdeaBoard, ok: &'static str, failed: &'static str) -> Self {
        updated.modified = now_seconds();
        Self { updated, ok, failed }
    }

    pub async fn send(&self, backend: &dyn Backend) -> GatewayResult<IdeaBoard> {
        backend.update_board(&self.updated).await
    }
}

pub struct BoardEditor {
    backend: Arc<dyn Backend>,
    notifier: Notifier,
    boards: BoardList,
    current: Option<IdeaBoard>,
    /// Notes offered by the node picker.
    available: Vec<Note>,
}

impl BoardEditor {
    pub fn new(backend: Arc<dyn Backend>, notifier: Notifier) -> Self {
        Self {
            backend,
            notifier,
            boards: BoardList::default(),
            current: None,
            available: Vec::new(),
        }
    }

    pub fn boards(&self) -> Vec<IdeaBoard> {
        self.boards.snapshot()
    }

    pub fn current(&self) -> Option<&IdeaBoard> {
        self.current.as_ref()
    }

    pub fn available_notes(&self) -> &[Note] {
        &self.available
    }

    pub fn render_state(&self) -> Option<RenderState> {
        self.current.as_ref().map(render)
    }

    pub fn view(&self) -> BoardsView {
        BoardsView {
            boards: self.boards(),
            current: self.current.clone(),
            graph: self.render_state(),
        }
    }

    fn reject(&self, err: FlowError) -> FlowError {
        self.notifier.error(err.to_string());
        err
    }

    pub fn apply_boards(&mut self, outcome: GatewayResult<Vec<IdeaBoard>>) -> Result<(), FlowError> {
        match outcome {
            Ok(boards) => {
                self.boards.set(boards);
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Failed to fetch boards");
                Err(e.into())
            }
        }
    }

    pub fn apply_available(&mut self, outcome: GatewayResult<Vec<Note>>) -> Result<(), FlowError> {
        match outcome {
            Ok(notes) => {
                self.available = notes;
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Failed to fetch notes");
                Err(e.into())
            }
        }
    }

    pub async fn refresh_boards(&mut self) -> Result<(), FlowError> {
        let outcome = self.backend.list_boards().await;
        self.apply_boards(outcome)
    }

    pub async fn refresh_available(&mut self) -> Result<(), FlowError> {
        let outcome = self.backend.all_notes().await;
        self.apply_available(outcome)
    }

    pub fn begin_create_board(&self, name: &str, description: &str) -> Result<NewBoard, FlowError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(self.reject(FlowError::MissingField("Board name")));
        }
        Ok(NewBoard {
            name: name.to_string(),
            description: description.trim().to_string(),
        })
    }

    /// The created board is listed at once; the full list follows in the background.
    pub fn finish_create_board(&mut self, outcome: GatewayResult<IdeaBoard>) -> Result<IdeaBoard, FlowError> {
        match outcome {
            Ok(board) => {
                self.boards.upsert(board.clone());
                self.notifier.success("Board created successfully!");
                self.boards.spawn_refresh(self.backend.clone());
                Ok(board)
            }
            Err(e) => {
                self.notifier.error("Failed to create board");
                Err(e.into())
            }
        }
    }

    pub async fn create_board(&mut self, name: &str, description: &str) -> Result<IdeaBoard, FlowError> {
        let req = self.begin_create_board(name, description)?;
        let outcome = self.backend.create_board(&req).await;
        self.finish_create_board(outcome)
    }

    pub fn finish_delete_board(&mut self, board_id: &str, outcome: GatewayResult<()>) -> Result<(), FlowError> {
        match outcome {
            Ok(()) => {
                if self.current.as_ref().is_some_and(|b| b.id == board_id) {
                    self.current = None;
                }
                self.boards.remove(board_id);
                self.notifier.success("Board deleted successfully!");
                self.boards.spawn_refresh(self.backend.clone());
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Failed to delete board");
                Err(e.into())
            }
        }
    }

    pub async fn delete_board(&mut self, board_id: &str) -> Result<(), FlowError> {
        let outcome = self.backend.delete_board(board_id).await;
        self.finish_delete_board(board_id, outcome)
    }

    /// Load a board from the last fetched list.
    pub fn select_board(&mut self, board_id: &str) -> Result<&IdeaBoard, FlowError> {
        let board = self
            .boards
            .find(board_id)
            .ok_or_else(|| self.reject(FlowError::UnknownBoard(board_id.to_string())))?;
        Ok(self.current.insert(board))
    }

    pub fn deselect(&mut self) {
        self.current = None;
    }

    fn loaded(&self) -> Result<&IdeaBoard, FlowError> {
        self.current
            .as_ref()
            .ok_or_else(|| self.reject(FlowError::NoBoard))
    }

    /// Adopt the board that was sent, never the echo. The list catches up
    /// in the background.
    pub fn finish(&mut self, change: BoardChange, outcome: GatewayResult<IdeaBoard>) -> Result<(), FlowError> {
        match outcome {
            Ok(_) => {
                let updated = change.updated;
                tracing::info!("board '{}' updated", updated.id);
                self.boards.upsert(updated.clone());
                if self.current.as_ref().is_some_and(|b| b.id == updated.id) {
                    self.current = Some(updated);
                }
                self.notifier.success(change.ok);
                self.boards.spawn_refresh(self.backend.clone());
                Ok(())
            }
            Err(e) => {
                self.notifier.error(change.failed);
                Err(e.into())
            }
        }
    }

    async fn commit(&mut self, change: BoardChange) -> Result<(), FlowError> {
        let outcome = change.send(self.backend.as_ref()).await;
        self.finish(change, outcome)
    }

    pub fn begin_add_node(&self, note_name: &str) -> Result<BoardChange, FlowError> {
        let board = self.loaded()?;
        if board.nodes.iter().any(|n| n.id == note_name) {
            return Err(self.reject(FlowError::DuplicateNode(note_name.to_string())));
        }
        let note = self
            .available
            .iter()
            .find(|n| n.name == note_name)
            .ok_or_else(|| self.reject(FlowError::UnknownNote(note_name.to_string())))?;

        let mut updated = board.clone();
        updated.nodes.push(BoardNode {
            id: note.name.clone(),
            name: note.name.clone(),
            kind: note.kind,
            external: note.external,
        });
        Ok(BoardChange::new(updated, "Node added successfully!", "Failed to add node"))
    }

    /// Removes the node and every edge touching it.
    pub fn begin_remove_node(&self, node_id: &str) -> Result<BoardChange, FlowError> {
        let board = self.loaded()?;
        if !board.nodes.iter().any(|n| n.id == node_id) {
            return Err(self.reject(FlowError::UnknownNode(node_id.to_string())));
        }
        let mut updated = board.clone();
        updated.nodes.retain(|n| n.id != node_id);
        updated.edges.retain(|e| !e.touches(node_id));
        Ok(BoardChange::new(updated, "Node removed successfully!", "Failed to remove node"))
    }

    pub fn begin_add_edge(&self, source: &str, target: &str) -> Result<BoardChange, FlowError> {
        let board = self.loaded()?;
        let find = |id: &str| {
            board
                .nodes
                .iter()
                .find(|n| n.id == id)
                .ok_or_else(|| self.reject(FlowError::UnknownNode(id.to_string())))
        };
        let (source_node, target_node) = (find(source)?, find(target)?);
        if has_edge_between(board, source, target) {
            return Err(self.reject(FlowError::DuplicateEdge));
        }

        let edge = BoardEdge {
            id: format!("{source}-{target}"),
            source: source.to_string(),
            target: target.to_string(),
            note: None,
            source_name: Some(source_node.name.clone()),
            target_name: Some(target_node.name.clone()),
        };
        let mut updated = board.clone();
        updated.edges.push(edge);
        Ok(BoardChange::new(
            updated,
            "Connection created successfully!",
            "Failed to create connection",
        ))
    }

    /// Set or overwrite an edge's annotation. Blank text clears it.
    pub fn begin_annotate_edge(&self, edge_id: &str, note: &str) -> Result<BoardChange, FlowError> {
        let mut updated = self.loaded()?.clone();
        let edge = updated
            .edges
            .iter_mut()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| self.reject(FlowError::UnknownEdge(edge_id.to_string())))?;
        edge.note = Some(note.trim().to_string()).filter(|n| !n.is_empty());
        Ok(BoardChange::new(
            updated,
            "Edge note updated successfully!",
            "Failed to update edge note",
        ))
    }

    pub fn begin_remove_edge(&self, edge_id: &str) -> Result<BoardChange, FlowError> {
        let board = self.loaded()?;
        if !board.edges.iter().any(|e| e.id == edge_id) {
            return Err(self.reject(FlowError::UnknownEdge(edge_id.to_string())));
        }
        let mut updated = board.clone();
        updated.edges.retain(|e| e.id != edge_id);
        Ok(BoardChange::new(
            updated,
            "Connection removed successfully!",
            "Failed to remove connection",
        ))
    }

    pub async fn add_node(&mut self, note_name: &str) -> Result<(), FlowError> {
        let change = self.begin_add_node(note_name)?;
        self.commit(change).await
    }

    pub async fn remove_node(&mut self, node_id: &str) -> Result<(), FlowError> {
        let change = self.begin_remove_node(node_id)?;
        self.commit(change).await
    }

    pub async fn add_edge(&mut self, source: &str, target: &str) -> Result<(), FlowError> {
        let change = self.begin_add_edge(source, target)?;
        self.commit(change).await
    }

    pub async fn annotate_edge(&mut self, edge_id: &str, note: &str) -> Result<(), FlowError> {
        let change = self.begin_annotate_edge(edge_id, note)?;
        self.commit(change).await
    }

    pub async fn remove_edge(&mut self, edge_id: &str) -> Result<(), FlowError> {
        let change = self.begin_remove_edge(edge_id)?;
        self.commit(change).await
    }

    /// Open the clicked node's note in the vault.
    pub fn node_click(&self, node_id: &str, vault: &VaultLinker) -> Result<String, FlowError> {
        let node = self
            .loaded()?
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .ok_or_else(|| self.reject(FlowError::UnknownNode(node_id.to_string())))?;
        vault.open_board_note(&node.name, node.kind)
    }

    /// Text to pre-fill the annotation editor with.
    pub fn edge_click(&self, edge_id: &str) -> Result<String, FlowError> {
        let edge = self
            .loaded()?
            .edges
            .iter()
            .find(|e| e.id == edge_id)
            .ok_or_else(|| self.reject(FlowError::UnknownEdge(edge_id.to_string())))?;
        Ok(edge.note.clone().unwrap_or_default())
    }
}
