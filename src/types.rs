use serde::{Deserialize, Deserializer, Serialize};

/// Kind of note stored in the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    Idea,
    Piece,
}

impl NoteKind {
    /// File-name prefix the vault uses for this kind ("Idea - ", "Piece - ").
    pub fn file_prefix(self) -> &'static str {
        match self {
            NoteKind::Idea => "Idea - ",
            NoteKind::Piece => "Piece - ",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NoteKind::Idea => "idea",
            NoteKind::Piece => "piece",
        }
    }
}

impl std::str::FromStr for NoteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idea" => Ok(NoteKind::Idea),
            "piece" => Ok(NoteKind::Piece),
            other => Err(format!("unknown note type '{other}' (expected idea or piece)")),
        }
    }
}

/// A note as listed by `GET /all_notes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    #[serde(default)]
    pub external: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub created: f64, // epoch seconds
    #[serde(default)]
    pub modified: f64,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub num_connections: u64,
}

/// Search modality sent with `POST /search`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Text,
    Prompt,
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(SearchMode::Text),
            "prompt" => Ok(SearchMode::Prompt),
            other => Err(format!("unknown search mode '{other}' (expected text or prompt)")),
        }
    }
}

/// One hit from either search endpoint. Never persisted client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    #[serde(default)]
    pub external: bool,
    /// Rationale, prompt mode only.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Raw note text, text mode only.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNote {
    pub name: String,
    pub connections: u64,
}

/// Aggregate counters from `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    #[serde(default)]
    pub total_notes: u64,
    #[serde(default)]
    pub ideas: u64,
    #[serde(default)]
    pub pieces: u64,
    #[serde(default)]
    pub connections: u64,
    #[serde(default)]
    pub external_pieces: u64,
    // Older backends only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_idea: Option<Vec<RankedNote>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_piece: Option<Vec<RankedNote>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub title: String,
    pub prompt: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub essay_link: Option<String>,
    #[serde(default)]
    pub backed_up: bool,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub note_name: Option<String>,
    /// Folder id.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default)]
    pub drafts: Vec<Draft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub backed_up: bool,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub note_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// A node on an idea board. `id` is the note name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NoteKind,
    #[serde(default)]
    pub external: bool,
}

/// A user-declared connection between two board nodes.
/// `id` is `"{source}-{target}"` in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_name: Option<String>,
}

impl BoardEdge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }

    /// True when the edge annotation is present and non-empty.
    pub fn is_annotated(&self) -> bool {
        self.note.as_deref().is_some_and(|n| !n.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdeaBoard {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub nodes: Vec<BoardNode>,
    #[serde(default)]
    pub edges: Vec<BoardEdge>,
    #[serde(default)]
    pub created: f64,
    #[serde(default)]
    pub modified: f64,
}

// ─── Request bodies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SubmitRequest {
    #[serde(rename = "type")]
    pub kind: NoteKind,
    pub content: String,
    pub note_name: String,
    pub external: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub note_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectRequest {
    pub new_note: String,
    pub connections: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub mode: SearchMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagSearchRequest {
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchTagRequest {
    pub note_names: Vec<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NewPrompt {
    pub title: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub essay_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

/// Partial prompt update; absent fields are left untouched by the backend.
/// `folder: Some("")` moves the prompt out of every folder.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptUpdate {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backed_up: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDraft {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftUpdate {
    pub id: String,
    pub backed_up: bool,
    pub note_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewFolder {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewBoard {
    pub name: String,
    pub description: String,
}

/// The backend writes "" for unset optional strings.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_reads_empty_strings_as_absent() {
        let json = r#"{"id":"p1","title":"Why","prompt":"Explain","essay_link":"",
            "backed_up":false,"note_name":"","drafts":[],"folder":""}"#;
        let prompt: Prompt = serde_json::from_str(json).unwrap();
        assert_eq!(prompt.essay_link, None);
        assert_eq!(prompt.note_name, None);
        assert_eq!(prompt.folder, None);
    }

    #[test]
    fn board_edge_uses_camel_case_names() {
        let edge = BoardEdge {
            id: "a-b".into(),
            source: "a".into(),
            target: "b".into(),
            note: None,
            source_name: Some("a".into()),
            target_name: Some("b".into()),
        };
        let value = serde_json::to_value(&edge).unwrap();
        assert_eq!(value["sourceName"], "a");
        assert_eq!(value["targetName"], "b");
        assert!(value.get("note").is_none());
    }

    #[test]
    fn stats_tolerates_missing_rank_lists() {
        let stats: Stats = serde_json::from_str(
            r#"{"totalNotes":3,"ideas":2,"pieces":1,"connections":4,"externalPieces":0}"#,
        )
        .unwrap();
        assert_eq!(stats.total_notes, 3);
        assert!(stats.top_idea.is_none());
    }

    #[test]
    fn note_kind_parses_case_insensitively() {
        assert_eq!("Piece".parse::<NoteKind>().unwrap(), NoteKind::Piece);
        assert!("essay".parse::<NoteKind>().is_err());
    }
}
