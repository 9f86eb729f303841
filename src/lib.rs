pub mod board;
#[cfg(feature = "gui")]
pub mod commands;
pub mod config;
pub mod error;
pub mod gateway;
pub mod notes;
pub mod notify;
pub mod palette;
pub mod prompts;
pub mod search;
pub mod stats;
pub mod store;
pub mod submission;
pub mod tagging;
pub mod types;
pub mod vault;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::board::BoardEditor;
use crate::config::ClientConfig;
use crate::gateway::{Backend, GatewayResult, HttpGateway};
use crate::notes::NotesListing;
use crate::notify::Notifier;
use crate::prompts::{PromptLists, PromptRegistry};
use crate::search::SearchController;
use crate::stats::StatsCache;
use crate::store::LocalStore;
use crate::types::{IdeaBoard, Note};
use crate::submission::SubmissionFlow;
use crate::vault::{ExternalOpener, SystemOpener, VaultLinker};

/// Every per-view state holder, shared across commands.
pub struct AppState {
    pub config: ClientConfig,
    /// Cloned out of the lock for requests that should not hold it.
    pub backend: Arc<dyn Backend>,
    pub notifier: Notifier,
    pub stats: StatsCache,
    pub submission: SubmissionFlow,
    pub search: SearchController,
    pub notes: NotesListing,
    pub prompts: PromptRegistry,
    pub boards: BoardEditor,
    pub vault: VaultLinker,
}

impl AppState {
    pub fn new(config: ClientConfig) -> Self {
        let backend: Arc<dyn Backend> = Arc::new(HttpGateway::new(&config.backend_url));
        Self::with_parts(config, backend, Arc::new(SystemOpener))
    }

    pub fn with_parts(
        config: ClientConfig,
        backend: Arc<dyn Backend>,
        opener: Arc<dyn ExternalOpener>,
    ) -> Self {
        let notifier = Notifier::new(config.notice_ttl);
        let stats = StatsCache::default();
        let vault = VaultLinker::new(
            LocalStore::new(config.store_path.clone()),
            opener,
            notifier.clone(),
            config.board_notes_dir.clone(),
        );
        Self {
            submission: SubmissionFlow::new(backend.clone(), notifier.clone(), stats.clone()),
            search: SearchController::new(backend.clone(), notifier.clone()),
            notes: NotesListing::new(backend.clone(), notifier.clone()),
            prompts: PromptRegistry::new(backend.clone(), notifier.clone()),
            boards: BoardEditor::new(backend.clone(), notifier.clone()),
            vault,
            stats,
            notifier,
            backend,
            config,
        }
    }

    /// Initial loads for every view. Failures are already on the notifier.
    pub async fn load_all(&mut self) {
        let initial = InitialLoad::fetch(self.backend.as_ref(), &self.stats).await;
        self.apply_initial(initial);
    }

    pub fn apply_initial(&mut self, initial: InitialLoad) {
        if let Err(e) = self.prompts.apply_lists(initial.prompts) {
            tracing::warn!("initial prompt load: {e}");
        }
        if let Err(e) = self.boards.apply_boards(initial.boards) {
            tracing::warn!("initial board load: {e}");
        }
        if let Err(e) = self.boards.apply_available(initial.notes) {
            tracing::warn!("initial note load: {e}");
        }
    }
}

/// Everything the views load on startup, fetched without touching `AppState`.
pub struct InitialLoad {
    pub prompts: PromptLists,
    pub boards: GatewayResult<Vec<IdeaBoard>>,
    pub notes: GatewayResult<Vec<Note>>,
}

impl InitialLoad {
    pub async fn fetch(backend: &dyn Backend, stats: &StatsCache) -> Self {
        stats.refresh(backend).await;
        Self {
            prompts: PromptLists::fetch(backend).await,
            boards: backend.list_boards().await,
            notes: backend.all_notes().await,
        }
    }
}

/// Type alias used in Tauri command signatures and background tasks.
pub type AppMutex = Mutex<AppState>;

/// Only log WARN and above in release builds to avoid leaking note content.
pub fn init_tracing() {
    #[cfg(debug_assertions)]
    tracing_subscriber::fmt::init();
    #[cfg(not(debug_assertions))]
    tracing_subscriber::fmt().with_max_level(tracing::Level::WARN).init();
}

#[cfg(feature = "gui")]
pub fn run(config: ClientConfig) -> tauri::Result<()> {
    tauri::Builder::default()
        .manage(AppMutex::new(AppState::new(config)))
        .invoke_handler(tauri::generate_handler![
            commands::get_notices,
            commands::dismiss_notice,
            commands::get_stats,
            commands::get_submission,
            commands::update_compose,
            commands::prefill_from_prompt,
            commands::submit_note,
            commands::toggle_suggestion,
            commands::connect_suggestions,
            commands::dismiss_suggestions,
            commands::get_search,
            commands::set_search_query,
            commands::set_search_mode,
            commands::add_search_tag,
            commands::remove_search_tag,
            commands::run_search,
            commands::voice_search,
            commands::toggle_result_selection,
            commands::tag_search_results,
            commands::list_all_notes,
            commands::toggle_note_selection,
            commands::tag_all_notes,
            commands::view_note,
            commands::get_prompts,
            commands::create_prompt,
            commands::set_prompt_backed_up,
            commands::move_prompt,
            commands::delete_prompt,
            commands::create_draft,
            commands::set_draft_backed_up,
            commands::delete_draft,
            commands::create_folder,
            commands::delete_folder,
            commands::set_folder_filter,
            commands::voice_folder,
            commands::search_for_prompt,
            commands::get_boards,
            commands::create_board,
            commands::delete_board,
            commands::select_board,
            commands::add_board_node,
            commands::remove_board_node,
            commands::add_board_edge,
            commands::annotate_board_edge,
            commands::remove_board_edge,
            commands::board_node_click,
            commands::board_edge_click,
            commands::get_vault_path,
            commands::set_vault_path,
            commands::open_note,
        ])
        .setup(|app| {
            let handle = app.handle().clone();
            tauri::async_runtime::spawn(async move {
                commands::startup_init(handle).await;
            });
            Ok(())
        })
        .run(tauri::generate_context!())
}
