//! Spoken commands: wake-word stripping for voice search and utterance to
//! folder-filter matching for the prompts view.

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;

use crate::prompts::FolderFilter;
use crate::types::Folder;

/// Leading filler phrases, tried in this order; at most one is removed.
const FILLERS: [&str; 6] = ["show me ", "show ", "display ", "open ", "go to ", "switch to "];

#[derive(Debug, Error, PartialEq)]
pub enum VoiceError {
    #[error("No folder matches '{heard}'. Available folders: {}", available.join(", "))]
    NoMatch { heard: String, available: Vec<String> },
}

fn wake_word() -> Option<&'static Regex> {
    static WAKE: OnceLock<Option<Regex>> = OnceLock::new();
    WAKE.get_or_init(|| Regex::new(r"(?i)\bfriday\b").ok()).as_ref()
}

/// Remove every whole-word "friday" (any case) and trim.
pub fn strip_wake_word(transcript: &str) -> String {
    match wake_word() {
        Some(re) => re.replace_all(transcript, "").trim().to_string(),
        None => transcript.trim().to_string(),
    }
}

pub fn normalize(utterance: &str) -> String {
    let lowered = utterance.trim().to_lowercase();
    let rest = FILLERS
        .iter()
        .find_map(|f| lowered.strip_prefix(f))
        .unwrap_or(&lowered);
    rest.trim().to_string()
}

/// Map an utterance onto a folder filter. First folder in list order whose
/// name contains, or is contained in, the utterance wins.
pub fn interpret(utterance: &str, folders: &[Folder]) -> Result<FolderFilter, VoiceError> {
    let heard = normalize(utterance);
    if heard.contains("all") || heard.contains("everything") {
        return Ok(FolderFilter::All);
    }
    if !heard.is_empty() {
        let hit = folders.iter().find(|f| {
            let name = f.name.to_lowercase();
            !name.is_empty() && (heard.contains(&name) || name.contains(&heard))
        });
        if let Some(folder) = hit {
            return Ok(FolderFilter::Folder(folder.id.clone()));
        }
    }
    Err(VoiceError::NoMatch {
        heard,
        available: folders.iter().map(|f| f.name.clone()).collect(),
    })
}

/// Source of transcribed utterances. One call is one listening session;
/// `Ok(None)` means the session ended without speech.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn recognize(&self) -> anyhow::Result<Option<String>>;
}

/// Reads one typed line from stdin in place of a microphone.
pub struct StdinRecognizer;

#[async_trait]
impl SpeechRecognizer for StdinRecognizer {
    async fn recognize(&self) -> anyhow::Result<Option<String>> {
        let line = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|n| (n > 0).then_some(line))
        })
        .await??;
        Ok(line
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty()))
    }
}
