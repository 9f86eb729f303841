//! Wire-format checks for `HttpGateway` against a live local server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use ideabase::error::GatewayError;
use ideabase::gateway::{Backend, HttpGateway};
use ideabase::types::{
    IdeaBoard, NoteKind, SearchMode, SearchRequest, SubmitRequest,
};

type Seen = Arc<Mutex<Vec<Value>>>;

async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn submit(State(seen): State<Seen>, Json(body): Json<Value>) -> Json<Value> {
    seen.lock().unwrap().push(body);
    Json(json!({ "suggestions": null, "note_name": "Foo" }))
}

#[tokio::test]
async fn submit_sends_type_field_and_reads_null_suggestions() {
    let seen = Seen::default();
    let app = Router::new()
        .route("/submit", post(submit))
        .with_state(seen.clone());
    let gateway = HttpGateway::new(&serve(app).await);

    let resp = gateway
        .submit(&SubmitRequest {
            kind: NoteKind::Piece,
            content: "body".into(),
            note_name: "Foo".into(),
            external: true,
        })
        .await
        .unwrap();

    assert_eq!(resp.suggestions, None);
    assert_eq!(resp.note_name, "Foo");
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        &[json!({ "type": "piece", "content": "body", "note_name": "Foo", "external": true })]
    );
}

#[tokio::test]
async fn search_unwraps_results_envelope() {
    let app = Router::new().route(
        "/search",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body, json!({ "query": "essays", "mode": "prompt" }));
            Json(json!({
                "results": [
                    { "name": "A", "type": "idea", "reason": "close match" },
                    { "name": "B", "type": "piece", "external": true, "reason": "" }
                ]
            }))
        }),
    );
    let gateway = HttpGateway::new(&serve(app).await);

    let results = gateway
        .search(&SearchRequest {
            query: "essays".into(),
            mode: SearchMode::Prompt,
        })
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].reason.as_deref(), Some("close match"));
    assert!(results[1].external);
    assert_eq!(results[1].reason, None);
}

#[tokio::test]
async fn all_notes_reads_notes_envelope() {
    let app = Router::new().route(
        "/all_notes",
        get(|| async {
            Json(json!({
                "notes": [{ "name": "Foo", "type": "idea", "word_count": 12, "num_connections": 3 }]
            }))
        }),
    );
    let gateway = HttpGateway::new(&serve(app).await);

    let notes = gateway.all_notes().await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NoteKind::Idea);
    assert_eq!(notes[0].num_connections, 3);
}

#[tokio::test]
async fn note_content_encodes_file_name_query() {
    let app = Router::new().route(
        "/note_content",
        get(|Query(q): Query<HashMap<String, String>>| async move {
            format!("# {}", q.get("file_name").cloned().unwrap_or_default())
        }),
    );
    let gateway = HttpGateway::new(&serve(app).await);

    let body = gateway.note_content("Idea - Salt & Pepper.md").await.unwrap();
    assert_eq!(body, "# Idea - Salt & Pepper.md");
}

#[tokio::test]
async fn board_update_puts_whole_board_to_encoded_path() {
    let seen = Seen::default();
    let app = Router::new()
        .route(
            "/idea_boards/{id}",
            put(
                |State(seen): State<Seen>, Path(id): Path<String>, Json(board): Json<Value>| async move {
                    seen.lock().unwrap().push(json!(id));
                    Json(json!({ "board": board }))
                },
            ),
        )
        .with_state(seen.clone());
    let gateway = HttpGateway::new(&serve(app).await);

    let board = IdeaBoard {
        id: "board 1".into(),
        name: "Essays".into(),
        description: String::new(),
        nodes: Vec::new(),
        edges: Vec::new(),
        created: 1.0,
        modified: 2.0,
    };
    let echoed = gateway.update_board(&board).await.unwrap();

    assert_eq!(echoed, board);
    assert_eq!(seen.lock().unwrap().as_slice(), &[json!("board 1")]);
}

#[tokio::test]
async fn non_success_status_keeps_code_and_body() {
    let app = Router::new().route(
        "/prompts/{id}",
        delete(|| async { (StatusCode::NOT_FOUND, "prompt not found") }),
    );
    let gateway = HttpGateway::new(&serve(app).await);

    match gateway.delete_prompt("p9").await {
        Err(GatewayError::Status { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "prompt not found");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = HttpGateway::new(&format!("http://{addr}/"));
    assert!(matches!(gateway.stats().await, Err(GatewayError::Network(_))));
}

#[tokio::test]
async fn malformed_json_is_a_decode_error() {
    let app = Router::new().route("/stats", get(|| async { "not json" }));
    let gateway = HttpGateway::new(&serve(app).await);
    assert!(matches!(gateway.stats().await, Err(GatewayError::Decode(_))));
}
