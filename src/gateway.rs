//! Backend gateway: one fixed origin, JSON bodies, no retries, no auth.
//!
//! Flow holders talk to the backend only through the [`Backend`] trait so they
//! can be driven by a scripted fake in tests.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::types::{
    BatchTagRequest, ConnectRequest, DraftUpdate, Folder, IdeaBoard, NewBoard, NewDraft,
    NewFolder, NewPrompt, Note, Prompt, PromptUpdate, SearchRequest, SearchResult,
    Stats, SubmitRequest, SubmitResponse, TagSearchRequest,
};

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Every endpoint the client depends on.
#[async_trait]
pub trait Backend: Send + Sync {
    // ── Notes ──

    async fn submit(&self, req: &SubmitRequest) -> GatewayResult<SubmitResponse>;
    async fn connect(&self, req: &ConnectRequest) -> GatewayResult<()>;
    async fn stats(&self) -> GatewayResult<Stats>;
    async fn all_notes(&self) -> GatewayResult<Vec<Note>>;
    /// Raw markdown for a vault file name such as `"Idea - Foo.md"`.
    async fn note_content(&self, file_name: &str) -> GatewayResult<String>;
    async fn batch_tag(&self, req: &BatchTagRequest) -> GatewayResult<()>;

    // ── Search ──

    async fn search(&self, req: &SearchRequest) -> GatewayResult<Vec<SearchResult>>;
    async fn search_by_tags(&self, req: &TagSearchRequest) -> GatewayResult<Vec<SearchResult>>;

    // ── Prompts / drafts / folders ──

    async fn list_prompts(&self) -> GatewayResult<Vec<Prompt>>;
    async fn create_prompt(&self, req: &NewPrompt) -> GatewayResult<()>;
    async fn update_prompt(&self, req: &PromptUpdate) -> GatewayResult<()>;
    async fn delete_prompt(&self, prompt_id: &str) -> GatewayResult<()>;
    async fn create_draft(&self, prompt_id: &str, req: &NewDraft) -> GatewayResult<()>;
    async fn update_draft(&self, prompt_id: &str, req: &DraftUpdate) -> GatewayResult<()>;
    async fn delete_draft(&self, prompt_id: &str, draft_id: &str) -> GatewayResult<()>;
    async fn list_folders(&self) -> GatewayResult<Vec<Folder>>;
    async fn create_folder(&self, req: &NewFolder) -> GatewayResult<()>;
    async fn delete_folder(&self, folder_id: &str) -> GatewayResult<()>;

    // ── Idea boards ──

    async fn list_boards(&self) -> GatewayResult<Vec<IdeaBoard>>;
    async fn create_board(&self, req: &NewBoard) -> GatewayResult<IdeaBoard>;
    /// Sends the whole board, not a diff.
    async fn update_board(&self, board: &IdeaBoard) -> GatewayResult<IdeaBoard>;
    async fn delete_board(&self, board_id: &str) -> GatewayResult<()>;
}

// ─── Response envelopes ────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ResultsEnvelope {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Deserialize)]
struct NotesEnvelope {
    #[serde(default)]
    notes: Vec<Note>,
}

#[derive(Deserialize)]
struct PromptsEnvelope {
    #[serde(default)]
    prompts: Vec<Prompt>,
}

#[derive(Deserialize)]
struct FoldersEnvelope {
    #[serde(default)]
    folders: Vec<Folder>,
}

#[derive(Deserialize)]
struct BoardsEnvelope {
    #[serde(default)]
    boards: Vec<IdeaBoard>,
}

#[derive(Deserialize)]
struct BoardEnvelope {
    board: IdeaBoard,
}

// ─── HTTP implementation ───────────────────────────────────────────────────────

/// reqwest-backed [`Backend`] bound to a single origin.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the body text of a 2xx response.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> GatewayResult<String> {
        tracing::debug!("{method} {path}");
        let mut request = self.client.request(method, self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        let text = self.send::<()>(Method::GET, path, None).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> GatewayResult<T> {
        let text = self.send(method, path, Some(body)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// For endpoints whose success body carries nothing the client reads.
    async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> GatewayResult<()> {
        self.send(method, path, body).await.map(|_| ())
    }
}

fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[async_trait]
impl Backend for HttpGateway {
    async fn submit(&self, req: &SubmitRequest) -> GatewayResult<SubmitResponse> {
        self.send_json(Method::POST, "/submit", req).await
    }

    async fn connect(&self, req: &ConnectRequest) -> GatewayResult<()> {
        self.send_unit(Method::POST, "/connect", Some(req)).await
    }

    async fn stats(&self) -> GatewayResult<Stats> {
        self.get_json("/stats").await
    }

    async fn all_notes(&self) -> GatewayResult<Vec<Note>> {
        let envelope: NotesEnvelope = self.get_json("/all_notes").await?;
        Ok(envelope.notes)
    }

    async fn note_content(&self, file_name: &str) -> GatewayResult<String> {
        let path = format!("/note_content?file_name={}", urlencoding::encode(file_name));
        self.send::<()>(Method::GET, &path, None).await
    }

    async fn batch_tag(&self, req: &BatchTagRequest) -> GatewayResult<()> {
        self.send_unit(Method::POST, "/batch_tag", Some(req)).await
    }

    async fn search(&self, req: &SearchRequest) -> GatewayResult<Vec<SearchResult>> {
        let envelope: ResultsEnvelope = self.send_json(Method::POST, "/search", req).await?;
        Ok(envelope.results)
    }

    async fn search_by_tags(&self, req: &TagSearchRequest) -> GatewayResult<Vec<SearchResult>> {
        let envelope: ResultsEnvelope =
            self.send_json(Method::POST, "/search_by_tags", req).await?;
        Ok(envelope.results)
    }

    async fn list_prompts(&self) -> GatewayResult<Vec<Prompt>> {
        let envelope: PromptsEnvelope = self.get_json("/prompts").await?;
        Ok(envelope.prompts)
    }

    async fn create_prompt(&self, req: &NewPrompt) -> GatewayResult<()> {
        self.send_unit(Method::POST, "/prompts", Some(req)).await
    }

    async fn update_prompt(&self, req: &PromptUpdate) -> GatewayResult<()> {
        let path = format!("/prompts/{}", segment(&req.id));
        self.send_unit(Method::PUT, &path, Some(req)).await
    }

    async fn delete_prompt(&self, prompt_id: &str) -> GatewayResult<()> {
        let path = format!("/prompts/{}", segment(prompt_id));
        self.send_unit::<()>(Method::DELETE, &path, None).await
    }

    async fn create_draft(&self, prompt_id: &str, req: &NewDraft) -> GatewayResult<()> {
        let path = format!("/prompts/{}/drafts", segment(prompt_id));
        self.send_unit(Method::POST, &path, Some(req)).await
    }

    async fn update_draft(&self, prompt_id: &str, req: &DraftUpdate) -> GatewayResult<()> {
        let path = format!("/prompts/{}/drafts/{}", segment(prompt_id), segment(&req.id));
        self.send_unit(Method::PUT, &path, Some(req)).await
    }

    async fn delete_draft(&self, prompt_id: &str, draft_id: &str) -> GatewayResult<()> {
        let path = format!("/prompts/{}/drafts/{}", segment(prompt_id), segment(draft_id));
        self.send_unit::<()>(Method::DELETE, &path, None).await
    }

    async fn list_folders(&self) -> GatewayResult<Vec<Folder>> {
        let envelope: FoldersEnvelope = self.get_json("/folders").await?;
        Ok(envelope.folders)
    }

    async fn create_folder(&self, req: &NewFolder) -> GatewayResult<()> {
        self.send_unit(Method::POST, "/folders", Some(req)).await
    }

    async fn delete_folder(&self, folder_id: &str) -> GatewayResult<()> {
        let path = format!("/folders/{}", segment(folder_id));
        self.send_unit::<()>(Method::DELETE, &path, None).await
    }

    async fn list_boards(&self) -> GatewayResult<Vec<IdeaBoard>> {
        let envelope: BoardsEnvelope = self.get_json("/idea_boards").await?;
        Ok(envelope.boards)
    }

    async fn create_board(&self, req: &NewBoard) -> GatewayResult<IdeaBoard> {
        let envelope: BoardEnvelope = self.send_json(Method::POST, "/idea_boards", req).await?;
        Ok(envelope.board)
    }

    async fn update_board(&self, board: &IdeaBoard) -> GatewayResult<IdeaBoard> {
        let path = format!("/idea_boards/{}", segment(&board.id));
        let envelope: BoardEnvelope = self.send_json(Method::PUT, &path, board).await?;
        Ok(envelope.board)
    }

    async fn delete_board(&self, board_id: &str) -> GatewayResult<()> {
        let path = format!("/idea_boards/{}", segment(board_id));
        self.send_unit::<()>(Method::DELETE, &path, None).await
    }
}
