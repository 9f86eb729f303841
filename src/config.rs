use std::path::PathBuf;
use std::time::Duration;

use crate::notify::NOTICE_TTL;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_BOARD_NOTES_DIR: &str = "UndergraduateAdmission";

pub const ENV_BACKEND_URL: &str = "IDEABASE_BACKEND_URL";
pub const ENV_STORE: &str = "IDEABASE_STORE";
pub const ENV_BOARD_DIR: &str = "IDEABASE_BOARD_DIR";

/// Runtime settings for the client.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub backend_url: String,
    /// SQLite file backing [`crate::store::LocalStore`].
    pub store_path: PathBuf,
    pub notice_ttl: Duration,
    /// Vault sub-directory board notes live under. `None` means the vault root.
    pub board_notes_dir: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            store_path: crate::store::default_store_path(),
            notice_ttl: NOTICE_TTL,
            board_notes_dir: Some(DEFAULT_BOARD_NOTES_DIR.to_string()),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `IDEABASE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            config.backend_url = url.trim().to_string();
        }
        if let Some(path) = lookup(ENV_STORE).filter(|v| !v.trim().is_empty()) {
            config.store_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_BOARD_DIR) {
            let dir = dir.trim().trim_matches('/').to_string();
            config.board_notes_dir = (!dir.is_empty()).then_some(dir);
        }
        config
    }

    pub fn with_backend_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.backend_url = url;
        }
        self
    }

    pub fn with_store_path(mut self, path: Option<PathBuf>) -> Self {
        if let Some(path) = path {
            self.store_path = path;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.board_notes_dir.as_deref(), Some("UndergraduateAdmission"));
        assert_eq!(config.notice_ttl, Duration::from_secs(4));
    }

    #[test]
    fn environment_overrides_and_empty_board_dir() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BACKEND_URL, "http://10.0.0.2:9000"),
            (ENV_STORE, "/tmp/kv.sqlite"),
            (ENV_BOARD_DIR, ""),
        ]));
        assert_eq!(config.backend_url, "http://10.0.0.2:9000");
        assert_eq!(config.store_path, PathBuf::from("/tmp/kv.sqlite"));
        assert_eq!(config.board_notes_dir, None);
    }

    #[test]
    fn cli_flags_win_over_environment() {
        let config = ClientConfig::from_lookup(lookup(&[(ENV_BACKEND_URL, "http://env:1")]))
            .with_backend_url(Some("http://flag:2".into()))
            .with_store_path(None);
        assert_eq!(config.backend_url, "http://flag:2");
    }
}
