use tauri::Manager;

use crate::board::{BoardChange, BoardEditor, BoardsView};
use crate::error::FlowError;
use crate::notes::NotesView;
use crate::notify::Notices;
use crate::prompts::{FolderFilter, PromptChange, PromptLists, PromptRegistry, PromptsView};
use crate::search::SearchView;
use crate::submission::{Compose, SubmissionView};
use crate::types::{NoteKind, SearchMode, Stats};
use crate::vault::OpenOutcome;
use crate::{AppMutex, InitialLoad};

type CmdResult<T> = Result<T, String>;

fn msg(e: FlowError) -> String {
    e.to_string()
}

// ─── Notifications / stats ─────────────────────────────────────────────────────

#[tauri::command]
pub async fn get_notices(state: tauri::State<'_, AppMutex>) -> CmdResult<Notices> {
    Ok(state.lock().await.notifier.current())
}

/// `kind` is "success" or "error".
#[tauri::command]
pub async fn dismiss_notice(kind: String, state: tauri::State<'_, AppMutex>) -> CmdResult<()> {
    let s = state.lock().await;
    match kind.as_str() {
        "success" => s.notifier.dismiss_success(),
        "error" => s.notifier.dismiss_error(),
        other => return Err(format!("unknown notice kind '{other}'")),
    }
    Ok(())
}

#[tauri::command]
pub async fn get_stats(state: tauri::State<'_, AppMutex>) -> CmdResult<Stats> {
    let cache = state.lock().await.stats.clone();
    Ok(cache.get().await)
}

// ─── Submission ────────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn get_submission(state: tauri::State<'_, AppMutex>) -> CmdResult<SubmissionView> {
    Ok(state.lock().await.submission.view())
}

#[tauri::command]
pub async fn update_compose(
    compose: Compose,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SubmissionView> {
    let mut s = state.lock().await;
    s.submission.compose = compose;
    Ok(s.submission.view())
}

#[tauri::command]
pub async fn prefill_from_prompt(
    prompt_id: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SubmissionView> {
    let mut s = state.lock().await;
    let (title, body) = s
        .prompts
        .prompt(&prompt_id)
        .map(|p| (p.title.clone(), p.prompt.clone()))
        .ok_or_else(|| format!("unknown prompt '{prompt_id}'"))?;
    s.submission.prefill_from_prompt(&title, &body);
    Ok(s.submission.view())
}

/// The lock is released while the request is in flight so the phase can be
/// observed as `submitting`.
#[tauri::command]
pub async fn submit_note(state: tauri::State<'_, AppMutex>) -> CmdResult<SubmissionView> {
    let (req, backend) = {
        let mut s = state.lock().await;
        (s.submission.begin_submit().map_err(msg)?, s.backend.clone())
    };
    let outcome = backend.submit(&req).await;
    let mut s = state.lock().await;
    s.submission
        .finish_submit(&req.note_name, outcome)
        .map_err(msg)?;
    Ok(s.submission.view())
}

#[tauri::command]
pub async fn toggle_suggestion(
    name: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SubmissionView> {
    let mut s = state.lock().await;
    s.submission.toggle(&name).map_err(msg)?;
    Ok(s.submission.view())
}

#[tauri::command]
pub async fn connect_suggestions(state: tauri::State<'_, AppMutex>) -> CmdResult<SubmissionView> {
    let (req, backend) = {
        let mut s = state.lock().await;
        (s.submission.begin_connect().map_err(msg)?, s.backend.clone())
    };
    let outcome = backend.connect(&req).await;
    let mut s = state.lock().await;
    s.submission.finish_connect(outcome).map_err(msg)?;
    Ok(s.submission.view())
}

#[tauri::command]
pub async fn dismiss_suggestions(state: tauri::State<'_, AppMutex>) -> CmdResult<SubmissionView> {
    let mut s = state.lock().await;
    s.submission.dismiss_suggestions();
    Ok(s.submission.view())
}

// ─── Search ────────────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn get_search(state: tauri::State<'_, AppMutex>) -> CmdResult<SearchView> {
    Ok(state.lock().await.search.view())
}

#[tauri::command]
pub async fn set_search_query(
    query: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SearchView> {
    let mut s = state.lock().await;
    s.search.query = query;
    Ok(s.search.view())
}

#[tauri::command]
pub async fn set_search_mode(
    mode: SearchMode,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SearchView> {
    let mut s = state.lock().await;
    s.search.set_mode(mode);
    Ok(s.search.view())
}

#[tauri::command]
pub async fn add_search_tag(tag: String, state: tauri::State<'_, AppMutex>) -> CmdResult<SearchView> {
    let mut s = state.lock().await;
    s.search.add_tag(&tag);
    Ok(s.search.view())
}

#[tauri::command]
pub async fn remove_search_tag(
    index: usize,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SearchView> {
    let mut s = state.lock().await;
    s.search.remove_tag(index);
    Ok(s.search.view())
}

/// Overlapping calls are allowed; only the newest one's results are kept.
#[tauri::command]
pub async fn run_search(state: tauri::State<'_, AppMutex>) -> CmdResult<SearchView> {
    let (ticket, backend) = {
        let mut s = state.lock().await;
        (s.search.begin().map_err(msg)?, s.backend.clone())
    };
    let outcome = ticket.fetch(backend.as_ref()).await;
    let mut s = state.lock().await;
    s.search.finish(ticket, outcome).map_err(msg)?;
    Ok(s.search.view())
}

#[tauri::command]
pub async fn voice_search(
    transcript: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SearchView> {
    let (ticket, backend) = {
        let mut s = state.lock().await;
        (s.search.begin_transcript(&transcript).map_err(msg)?, s.backend.clone())
    };
    if let Some(ticket) = ticket {
        let outcome = ticket.fetch(backend.as_ref()).await;
        state.lock().await.search.finish(ticket, outcome).map_err(msg)?;
    }
    Ok(state.lock().await.search.view())
}

#[tauri::command]
pub async fn toggle_result_selection(
    name: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SearchView> {
    let mut s = state.lock().await;
    s.search.tagging.selection.toggle(&name);
    Ok(s.search.view())
}

#[tauri::command]
pub async fn tag_search_results(
    tags: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<SearchView> {
    let (req, backend) = {
        let mut s = state.lock().await;
        s.search.tagging.input = tags;
        let notifier = s.notifier.clone();
        (s.search.tagging.begin(&notifier).map_err(msg)?, s.backend.clone())
    };
    let Some(req) = req else {
        return Ok(state.lock().await.search.view());
    };
    let outcome = backend.batch_tag(&req).await;
    let ticket = {
        let mut s = state.lock().await;
        let notifier = s.notifier.clone();
        s.search.tagging.finish(&notifier, outcome).map_err(msg)?;
        s.search.begin_rerun()
    };
    if let Some(ticket) = ticket {
        let outcome = ticket.fetch(backend.as_ref()).await;
        state.lock().await.search.finish(ticket, outcome).map_err(msg)?;
    }
    Ok(state.lock().await.search.view())
}

// ─── All notes ─────────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn list_all_notes(state: tauri::State<'_, AppMutex>) -> CmdResult<NotesView> {
    let backend = state.lock().await.backend.clone();
    let outcome = backend.all_notes().await;
    let mut s = state.lock().await;
    s.notes.apply(outcome).map_err(msg)?;
    Ok(s.notes.view())
}

#[tauri::command]
pub async fn toggle_note_selection(
    name: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<NotesView> {
    let mut s = state.lock().await;
    s.notes.tagging.selection.toggle(&name);
    Ok(s.notes.view())
}

#[tauri::command]
pub async fn tag_all_notes(tags: String, state: tauri::State<'_, AppMutex>) -> CmdResult<NotesView> {
    let (req, backend) = {
        let mut s = state.lock().await;
        s.notes.tagging.input = tags;
        let notifier = s.notifier.clone();
        (s.notes.tagging.begin(&notifier).map_err(msg)?, s.backend.clone())
    };
    let Some(req) = req else {
        return Ok(state.lock().await.notes.view());
    };
    let outcome = backend.batch_tag(&req).await;
    {
        let mut s = state.lock().await;
        let notifier = s.notifier.clone();
        s.notes.tagging.finish(&notifier, outcome).map_err(msg)?;
    }
    let outcome = backend.all_notes().await;
    let mut s = state.lock().await;
    s.notes.apply(outcome).map_err(msg)?;
    Ok(s.notes.view())
}

#[tauri::command]
pub async fn view_note(
    name: String,
    kind: NoteKind,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<String> {
    let (backend, notifier) = {
        let s = state.lock().await;
        (s.backend.clone(), s.notifier.clone())
    };
    crate::notes::view_note(backend.as_ref(), &notifier, &name, kind)
        .await
        .map_err(msg)
}

// ─── Prompts / drafts / folders ────────────────────────────────────────────────

/// Validate under the lock, send and re-fetch without it.
async fn change_prompts(
    state: &AppMutex,
    begin: impl FnOnce(&PromptRegistry) -> Result<PromptChange, FlowError>,
) -> CmdResult<PromptsView> {
    let (change, backend) = {
        let s = state.lock().await;
        (begin(&s.prompts).map_err(msg)?, s.backend.clone())
    };
    let outcome = change.send(backend.as_ref()).await;
    state
        .lock()
        .await
        .prompts
        .finish(&change, outcome)
        .map_err(msg)?;
    let lists = PromptLists::fetch(backend.as_ref()).await;
    let mut s = state.lock().await;
    if let Err(e) = s.prompts.apply_lists(lists) {
        tracing::warn!("prompt refresh failed: {e}");
    }
    Ok(s.prompts.view())
}

#[tauri::command]
pub async fn get_prompts(state: tauri::State<'_, AppMutex>) -> CmdResult<PromptsView> {
    let backend = state.lock().await.backend.clone();
    let lists = PromptLists::fetch(backend.as_ref()).await;
    let mut s = state.lock().await;
    s.prompts.apply_lists(lists).map_err(msg)?;
    Ok(s.prompts.view())
}

#[tauri::command]
pub async fn create_prompt(
    title: String,
    prompt: String,
    essay_link: Option<String>,
    folder: Option<String>,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| {
        p.begin_create_prompt(&title, &prompt, essay_link.as_deref(), folder.as_deref())
    })
    .await
}

#[tauri::command]
pub async fn set_prompt_backed_up(
    prompt_id: String,
    backed_up: bool,
    note_name: Option<String>,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| {
        p.begin_prompt_backed_up(&prompt_id, backed_up, note_name.as_deref())
    })
    .await
}

#[tauri::command]
pub async fn move_prompt(
    prompt_id: String,
    folder_id: Option<String>,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| p.begin_move_prompt(&prompt_id, folder_id.as_deref())).await
}

#[tauri::command]
pub async fn delete_prompt(
    prompt_id: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| p.begin_delete_prompt(&prompt_id)).await
}

#[tauri::command]
pub async fn create_draft(
    prompt_id: String,
    title: String,
    link: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| p.begin_create_draft(&prompt_id, &title, &link)).await
}

#[tauri::command]
pub async fn set_draft_backed_up(
    prompt_id: String,
    draft_id: String,
    backed_up: bool,
    note_name: Option<String>,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| {
        p.begin_draft_backed_up(&prompt_id, &draft_id, backed_up, note_name.as_deref())
    })
    .await
}

#[tauri::command]
pub async fn delete_draft(
    prompt_id: String,
    draft_id: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| p.begin_delete_draft(&prompt_id, &draft_id)).await
}

#[tauri::command]
pub async fn create_folder(name: String, state: tauri::State<'_, AppMutex>) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| p.begin_create_folder(&name)).await
}

#[tauri::command]
pub async fn delete_folder(
    folder_id: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    change_prompts(&state, |p| p.begin_delete_folder(&folder_id)).await
}

#[tauri::command]
pub async fn set_folder_filter(
    filter: FolderFilter,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    let mut s = state.lock().await;
    s.prompts.set_filter(filter).map_err(msg)?;
    Ok(s.prompts.view())
}

#[tauri::command]
pub async fn voice_folder(
    utterance: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<PromptsView> {
    let mut s = state.lock().await;
    s.prompts.apply_voice(&utterance).map_err(msg)?;
    Ok(s.prompts.view())
}

/// Prompt-mode search for a prompt card; returns the number of hits.
#[tauri::command]
pub async fn search_for_prompt(
    prompt_id: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<usize> {
    let (ticket, backend) = {
        let mut s = state.lock().await;
        let text = s
            .prompts
            .prompt(&prompt_id)
            .map(|p| p.prompt.clone())
            .ok_or_else(|| format!("unknown prompt '{prompt_id}'"))?;
        (s.search.begin_prompt(&text).map_err(msg)?, s.backend.clone())
    };
    let outcome = ticket.fetch(backend.as_ref()).await;
    state
        .lock()
        .await
        .search
        .finish_prompt(ticket, outcome)
        .map_err(msg)
}

// ─── Idea boards ───────────────────────────────────────────────────────────────

/// Build the updated board under the lock, send it without.
async fn change_board(
    state: &AppMutex,
    begin: impl FnOnce(&BoardEditor) -> Result<BoardChange, FlowError>,
) -> CmdResult<BoardsView> {
    let (change, backend) = {
        let s = state.lock().await;
        (begin(&s.boards).map_err(msg)?, s.backend.clone())
    };
    let outcome = change.send(backend.as_ref()).await;
    let mut s = state.lock().await;
    s.boards.finish(change, outcome).map_err(msg)?;
    Ok(s.boards.view())
}

#[tauri::command]
pub async fn get_boards(state: tauri::State<'_, AppMutex>) -> CmdResult<BoardsView> {
    let backend = state.lock().await.backend.clone();
    let boards = backend.list_boards().await;
    let notes = backend.all_notes().await;
    let mut s = state.lock().await;
    s.boards.apply_boards(boards).map_err(msg)?;
    s.boards.apply_available(notes).map_err(msg)?;
    Ok(s.boards.view())
}

#[tauri::command]
pub async fn create_board(
    name: String,
    description: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<BoardsView> {
    let (req, backend) = {
        let s = state.lock().await;
        (s.boards.begin_create_board(&name, &description).map_err(msg)?, s.backend.clone())
    };
    let outcome = backend.create_board(&req).await;
    let mut s = state.lock().await;
    s.boards.finish_create_board(outcome).map_err(msg)?;
    Ok(s.boards.view())
}

#[tauri::command]
pub async fn delete_board(board_id: String, state: tauri::State<'_, AppMutex>) -> CmdResult<BoardsView> {
    let backend = state.lock().await.backend.clone();
    let outcome = backend.delete_board(&board_id).await;
    let mut s = state.lock().await;
    s.boards.finish_delete_board(&board_id, outcome).map_err(msg)?;
    Ok(s.boards.view())
}

#[tauri::command]
pub async fn select_board(board_id: String, state: tauri::State<'_, AppMutex>) -> CmdResult<BoardsView> {
    let mut s = state.lock().await;
    s.boards.select_board(&board_id).map_err(msg)?;
    Ok(s.boards.view())
}

#[tauri::command]
pub async fn add_board_node(
    note_name: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<BoardsView> {
    change_board(&state, |b| b.begin_add_node(&note_name)).await
}

#[tauri::command]
pub async fn remove_board_node(
    node_id: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<BoardsView> {
    change_board(&state, |b| b.begin_remove_node(&node_id)).await
}

#[tauri::command]
pub async fn add_board_edge(
    source: String,
    target: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<BoardsView> {
    change_board(&state, |b| b.begin_add_edge(&source, &target)).await
}

#[tauri::command]
pub async fn annotate_board_edge(
    edge_id: String,
    note: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<BoardsView> {
    change_board(&state, |b| b.begin_annotate_edge(&edge_id, &note)).await
}

#[tauri::command]
pub async fn remove_board_edge(
    edge_id: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<BoardsView> {
    change_board(&state, |b| b.begin_remove_edge(&edge_id)).await
}

#[tauri::command]
pub async fn board_node_click(node_id: String, state: tauri::State<'_, AppMutex>) -> CmdResult<String> {
    let s = state.lock().await;
    s.boards.node_click(&node_id, &s.vault).map_err(msg)
}

#[tauri::command]
pub async fn board_edge_click(edge_id: String, state: tauri::State<'_, AppMutex>) -> CmdResult<String> {
    let s = state.lock().await;
    s.boards.edge_click(&edge_id).map_err(msg)
}

// ─── Vault ─────────────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn get_vault_path(state: tauri::State<'_, AppMutex>) -> CmdResult<Option<String>> {
    state.lock().await.vault.vault_path().map_err(msg)
}

/// Saves the path and opens any note that was waiting for it.
#[tauri::command]
pub async fn set_vault_path(
    path: String,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<Option<String>> {
    state.lock().await.vault.set_vault_path(&path).map_err(msg)
}

#[tauri::command]
pub async fn open_note(
    name: String,
    kind: NoteKind,
    state: tauri::State<'_, AppMutex>,
) -> CmdResult<OpenOutcome> {
    state.lock().await.vault.open_note(&name, kind).map_err(msg)
}

// ─── Internal helpers ──────────────────────────────────────────────────────────

/// Called once on startup: load every view. Commands stay responsive while
/// the requests are out.
pub async fn startup_init(app: tauri::AppHandle) {
    let state = app.state::<AppMutex>();
    let (backend, stats) = {
        let s = state.lock().await;
        (s.backend.clone(), s.stats.clone())
    };
    let initial = InitialLoad::fetch(backend.as_ref(), &stats).await;
    state.lock().await.apply_initial(initial);
}
