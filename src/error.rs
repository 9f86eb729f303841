use thiserror::Error;

/// Failure talking to the backend. Callers only ever turn this into a
/// notification string; variants exist so logs can tell them apart.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Terminal failure of a single user operation.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Note name cannot contain '|' or '/'")]
    InvalidNoteName,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("Enter a query or at least one tag")]
    EmptySearch,
    #[error("Not available while {0}")]
    NotReady(&'static str),
    #[error("Connection already exists between these nodes")]
    DuplicateEdge,
    #[error("'{0}' is already on this board")]
    DuplicateNode(String),
    #[error("'{0}' is not on this board")]
    UnknownNode(String),
    #[error("No connection with id '{0}'")]
    UnknownEdge(String),
    #[error("No note named '{0}'")]
    UnknownNote(String),
    #[error("No folder with id '{0}'")]
    UnknownFolder(String),
    #[error("No board with id '{0}'")]
    UnknownBoard(String),
    #[error("No board selected")]
    NoBoard,
    #[error("Please set your Obsidian vault path in the main page first")]
    MissingVaultPath,
    #[error(transparent)]
    Voice(#[from] crate::voice::VoiceError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// Settings store or desktop hand-off failed.
    #[error(transparent)]
    Local(#[from] anyhow::Error),
}

impl FlowError {
    /// Validation and precondition errors never reached the backend.
    pub fn is_local(&self) -> bool {
        !matches!(self, FlowError::Gateway(_))
    }
}
