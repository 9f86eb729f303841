//! ideabase CLI - drives every client flow against the notes backend.
//!
//! Usage: ideabase [--backend URL] [--store PATH] [--json] <COMMAND>

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use ideabase::config::ClientConfig;
use ideabase::prompts::FolderFilter;
use ideabase::types::{NoteKind, SearchMode};
use ideabase::vault::OpenOutcome;
use ideabase::voice::{SpeechRecognizer, StdinRecognizer};
use ideabase::AppState;

#[derive(Parser)]
#[command(name = "ideabase", version, about = "Notes, prompts and idea boards from the terminal")]
struct Cli {
    /// Backend base URL (default: $IDEABASE_BACKEND_URL or http://localhost:8000)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Local settings database (default: $IDEABASE_STORE or the data dir)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show vault counters
    Stats,
    /// Submit a new note and optionally link it to suggested notes
    Submit {
        #[arg(long, default_value = "idea")]
        kind: NoteKind,
        /// Note name (the backend derives one when omitted)
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        content: String,
        /// Mark a piece as external
        #[arg(long)]
        external: bool,
        /// Suggested notes to connect; pass several times
        #[arg(long = "link")]
        links: Vec<String>,
    },
    /// Search notes by text or prompt and/or by tags
    Search {
        query: Option<String>,
        #[arg(long, default_value = "text")]
        mode: SearchMode,
        /// Tag filter; pass several times
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// List every note
    Notes,
    /// Add tags to notes
    Tag {
        /// Note to tag; pass several times
        #[arg(long = "note", required = true)]
        notes: Vec<String>,
        /// Comma-separated tags, with or without '#'
        #[arg(long)]
        tags: String,
    },
    /// Print a note's markdown
    Show {
        name: String,
        #[arg(long, default_value = "idea")]
        kind: NoteKind,
    },
    /// Open a note in Obsidian
    Open {
        name: String,
        #[arg(long, default_value = "idea")]
        kind: NoteKind,
    },
    /// Obsidian vault location
    Vault {
        #[command(subcommand)]
        cmd: VaultCommands,
    },
    /// Writing prompts
    Prompt {
        #[command(subcommand)]
        cmd: PromptCommands,
    },
    /// Drafts attached to a prompt
    Draft {
        #[command(subcommand)]
        cmd: DraftCommands,
    },
    /// Prompt folders
    Folder {
        #[command(subcommand)]
        cmd: FolderCommands,
    },
    /// Idea boards
    Board {
        #[command(subcommand)]
        cmd: BoardCommands,
    },
    /// Voice commands, read from stdin one utterance at a time
    Voice {
        #[command(subcommand)]
        cmd: VoiceCommands,
    },
    /// Launch the desktop window
    #[cfg(feature = "gui")]
    Gui,
}

#[derive(Subcommand)]
enum VaultCommands {
    Get,
    Set { path: String },
    Clear,
}

#[derive(Subcommand)]
enum PromptCommands {
    /// List prompts, optionally only those in one folder
    List {
        #[arg(long)]
        folder: Option<String>,
    },
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        essay_link: Option<String>,
        /// Folder id
        #[arg(long)]
        folder: Option<String>,
    },
    /// Mark a prompt archived, or un-archive it with --undo
    Backup {
        id: String,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        undo: bool,
    },
    /// Move a prompt into a folder, or out of all folders when --folder is omitted
    Move {
        id: String,
        #[arg(long)]
        folder: Option<String>,
    },
    Rm { id: String },
    /// Find notes relevant to a prompt
    Search { id: String },
}

#[derive(Subcommand)]
enum DraftCommands {
    Add {
        prompt_id: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        link: String,
    },
    Backup {
        prompt_id: String,
        draft_id: String,
        #[arg(long)]
        note: Option<String>,
        #[arg(long)]
        undo: bool,
    },
    Rm { prompt_id: String, draft_id: String },
}

#[derive(Subcommand)]
enum FolderCommands {
    List,
    Add { name: String },
    Rm { id: String },
}

#[derive(Subcommand)]
enum BoardCommands {
    List,
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Rm { id: String },
    /// Print a board's nodes and connections
    Show { id: String },
    AddNode { board: String, note: String },
    RmNode { board: String, node: String },
    /// Connect two nodes
    Link { board: String, source: String, target: String },
    /// Set a connection's note; empty text clears it
    Annotate { board: String, edge: String, text: String },
    Unlink { board: String, edge: String },
    /// Open a node's note in Obsidian
    Open { board: String, node: String },
}

#[derive(Subcommand)]
enum VoiceCommands {
    /// Say "friday" followed by the search query
    Search,
    /// Say a folder name, or "all"
    Folder,
}

#[tokio::main]
async fn main() {
    ideabase::init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run_cli(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn emit<T: Serialize>(json: bool, value: &T, human: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

/// Print whatever the last operation posted.
fn report(state: &AppState) {
    let notices = state.notifier.current();
    if let Some(msg) = notices.success {
        println!("{msg}");
    }
    if let Some(msg) = notices.error {
        eprintln!("{msg}");
    }
}

async fn listen() -> Result<String> {
    eprintln!("Listening...");
    StdinRecognizer
        .recognize()
        .await?
        .context("no speech recognized")
}

/// Boards must be listed before one can be selected; node pickers need notes.
async fn load_board(state: &mut AppState, id: &str, with_notes: bool) -> Result<()> {
    state.boards.refresh_boards().await?;
    if with_notes {
        state.boards.refresh_available().await?;
    }
    state.boards.select_board(id)?;
    Ok(())
}

async fn run_cli(cli: Cli) -> Result<()> {
    let config = ClientConfig::from_env()
        .with_backend_url(cli.backend)
        .with_store_path(cli.store);
    let json = cli.json;

    #[cfg(feature = "gui")]
    if matches!(cli.command, Commands::Gui) {
        tauri::async_runtime::set(tokio::runtime::Handle::current());
        return ideabase::run(config).context("desktop shell exited with an error");
    }

    let mut state = AppState::new(config);
    let outcome = dispatch(&mut state, cli.command, json).await;
    report(&state);
    outcome
}

async fn dispatch(state: &mut AppState, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Stats => {
            state.stats.refresh(state.backend.as_ref()).await;
            let stats = state.stats.get().await;
            emit(json, &stats, |s| {
                println!("Notes:       {}", s.total_notes);
                println!("Ideas:       {}", s.ideas);
                println!("Pieces:      {}", s.pieces);
                println!("External:    {}", s.external_pieces);
                println!("Connections: {}", s.connections);
            })?;
        }

        Commands::Submit { kind, name, content, external, links } => {
            let flow = &mut state.submission;
            flow.compose.kind = kind;
            flow.compose.note_name = name;
            flow.compose.content = content;
            flow.compose.external = external;
            flow.submit().await?;

            for link in &links {
                if let Err(e) = flow.toggle(link) {
                    eprintln!("Skipping '{link}': {e}");
                }
            }
            if !flow.selected().is_empty() {
                flow.connect().await?;
            }
            emit(json, &flow.view(), |v| {
                if let Some(name) = &v.canonical_name {
                    println!("Saved as '{name}'");
                }
                if !v.suggestions.is_empty() {
                    println!("Suggested links:");
                    for s in &v.suggestions {
                        println!("  {s}");
                    }
                }
            })?;
        }

        Commands::Search { query, mode, tags } => {
            let search = &mut state.search;
            search.set_mode(mode);
            search.query = query.unwrap_or_default();
            for tag in &tags {
                search.add_tag(tag);
            }
            search.run().await?;
            emit(json, &search.results().to_vec(), |results| {
                for r in results {
                    println!("[{}] {}", r.kind.as_str(), r.name);
                    if let Some(reason) = &r.reason {
                        println!("    {reason}");
                    }
                }
                eprintln!("{} results", results.len());
            })?;
        }

        Commands::Notes => {
            state.notes.refresh().await?;
            emit(json, &state.notes.notes().to_vec(), |notes| {
                for n in notes {
                    println!(
                        "[{}] {} ({} words, {} links)",
                        n.kind.as_str(),
                        n.name,
                        n.word_count,
                        n.num_connections
                    );
                }
            })?;
        }

        Commands::Tag { notes, tags } => {
            let listing = &mut state.notes;
            for name in &notes {
                listing.tagging.selection.toggle(name);
            }
            listing.tagging.input = tags;
            if !listing.tag_selected().await? {
                bail!("no tags given");
            }
        }

        Commands::Show { name, kind } => {
            let body =
                ideabase::notes::view_note(state.backend.as_ref(), &state.notifier, &name, kind)
                    .await?;
            println!("{body}");
        }

        Commands::Open { name, kind } => match state.vault.open_note(&name, kind)? {
            OpenOutcome::Opened(uri) => println!("{uri}"),
            OpenOutcome::NeedsVaultPath => {
                bail!("no vault path set; run `ideabase vault set <PATH>` first")
            }
        },

        Commands::Vault { cmd } => match cmd {
            VaultCommands::Get => match state.vault.vault_path()? {
                Some(path) => println!("{path}"),
                None => eprintln!("(not set)"),
            },
            VaultCommands::Set { path } => {
                state.vault.set_vault_path(&path)?;
            }
            VaultCommands::Clear => state.vault.clear_vault_path()?,
        },

        Commands::Prompt { cmd } => {
            let registry = &mut state.prompts;
            registry.refresh().await?;
            match cmd {
                PromptCommands::List { folder } => {
                    if let Some(id) = folder {
                        registry.set_filter(FolderFilter::Folder(id))?;
                    }
                    emit(json, &registry.view(), |v| {
                        for p in &v.prompts {
                            let mark = if p.backed_up { "x" } else { " " };
                            println!("[{mark}] {}  {} ({} drafts)", p.id, p.title, p.drafts.len());
                        }
                    })?;
                }
                PromptCommands::Add { title, prompt, essay_link, folder } => {
                    registry
                        .create_prompt(&title, &prompt, essay_link.as_deref(), folder.as_deref())
                        .await?;
                }
                PromptCommands::Backup { id, note, undo } => {
                    registry
                        .set_prompt_backed_up(&id, !undo, note.as_deref())
                        .await?;
                }
                PromptCommands::Move { id, folder } => {
                    registry.move_prompt(&id, folder.as_deref()).await?;
                }
                PromptCommands::Rm { id } => registry.delete_prompt(&id).await?,
                PromptCommands::Search { id } => {
                    let text = registry
                        .prompt(&id)
                        .map(|p| p.prompt.clone())
                        .with_context(|| format!("unknown prompt '{id}'"))?;
                    state.search.run_prompt(&text).await?;
                    emit(json, &state.search.results().to_vec(), |results| {
                        for r in results {
                            println!("[{}] {}", r.kind.as_str(), r.name);
                        }
                    })?;
                }
            }
        }

        Commands::Draft { cmd } => {
            let registry = &mut state.prompts;
            match cmd {
                DraftCommands::Add { prompt_id, title, link } => {
                    registry.create_draft(&prompt_id, &title, &link).await?;
                }
                DraftCommands::Backup { prompt_id, draft_id, note, undo } => {
                    registry
                        .set_draft_backed_up(&prompt_id, &draft_id, !undo, note.as_deref())
                        .await?;
                }
                DraftCommands::Rm { prompt_id, draft_id } => {
                    registry.delete_draft(&prompt_id, &draft_id).await?;
                }
            }
        }

        Commands::Folder { cmd } => {
            let registry = &mut state.prompts;
            registry.refresh().await?;
            match cmd {
                FolderCommands::List => {
                    emit(json, &registry.folders().to_vec(), |folders| {
                        for f in folders {
                            println!("{}  {} {}", f.id, f.color, f.name);
                        }
                    })?;
                }
                FolderCommands::Add { name } => registry.create_folder(&name).await?,
                FolderCommands::Rm { id } => registry.delete_folder(&id).await?,
            }
        }

        Commands::Board { cmd } => dispatch_board(state, cmd, json).await?,

        Commands::Voice { cmd } => match cmd {
            VoiceCommands::Search => {
                let heard = listen().await?;
                if !state.search.run_transcript(&heard).await? {
                    bail!("heard only the wake word");
                }
                emit(json, &state.search.results().to_vec(), |results| {
                    for r in results {
                        println!("[{}] {}", r.kind.as_str(), r.name);
                    }
                })?;
            }
            VoiceCommands::Folder => {
                state.prompts.refresh().await?;
                let heard = listen().await?;
                state.prompts.apply_voice(&heard)?;
                emit(json, &state.prompts.view(), |v| {
                    for p in &v.prompts {
                        println!("{}  {}", p.id, p.title);
                    }
                })?;
            }
        },

        #[cfg(feature = "gui")]
        Commands::Gui => bail!("the desktop shell is started before any state is built"),
    }
    Ok(())
}

async fn dispatch_board(state: &mut AppState, cmd: BoardCommands, json: bool) -> Result<()> {
    match cmd {
        BoardCommands::List => {
            state.boards.refresh_boards().await?;
            emit(json, &state.boards.boards(), |boards| {
                for b in boards {
                    println!("{}  {} ({} nodes)", b.id, b.name, b.nodes.len());
                }
            })?;
        }
        BoardCommands::Create { name, description } => {
            let board = state.boards.create_board(&name, &description).await?;
            println!("{}", board.id);
        }
        BoardCommands::Rm { id } => state.boards.delete_board(&id).await?,
        BoardCommands::Show { id } => {
            load_board(state, &id, false).await?;
            emit(json, &state.boards.render_state(), |graph| {
                let Some(graph) = graph else { return };
                for n in &graph.nodes {
                    println!("● {} [{}]", n.node.name, n.node.kind.as_str());
                }
                for l in &graph.links {
                    let note = l.edge.note.as_deref().unwrap_or("");
                    println!("  {} → {}  {note}", l.edge.source, l.edge.target);
                }
            })?;
        }
        BoardCommands::AddNode { board, note } => {
            load_board(state, &board, true).await?;
            state.boards.add_node(&note).await?;
        }
        BoardCommands::RmNode { board, node } => {
            load_board(state, &board, false).await?;
            state.boards.remove_node(&node).await?;
        }
        BoardCommands::Link { board, source, target } => {
            load_board(state, &board, false).await?;
            state.boards.add_edge(&source, &target).await?;
        }
        BoardCommands::Annotate { board, edge, text } => {
            load_board(state, &board, false).await?;
            state.boards.annotate_edge(&edge, &text).await?;
        }
        BoardCommands::Unlink { board, edge } => {
            load_board(state, &board, false).await?;
            state.boards.remove_edge(&edge).await?;
        }
        BoardCommands::Open { board, node } => {
            load_board(state, &board, false).await?;
            let uri = state.boards.node_click(&node, &state.vault)?;
            println!("{uri}");
        }
    }
    Ok(())
}
