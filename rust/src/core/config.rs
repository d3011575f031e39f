use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::AppCore;
use crate::wiki::{DEFAULT_CONTENT_RULE_LIST, MAIN_URL};

const CONFIG_FILE_NAME: &str = "namu_config.json";

const DEFAULT_DEFERRAL_MS: u64 = 300;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(super) struct AppConfig {
    /// Delay before focusing the search input and before re-reading the page after a
    /// client-side location change.
    pub(super) deferral_ms: Option<u64>,
    /// JSON content-blocker rules replacing the bundled list.
    pub(super) content_rule_list_path: Option<String>,
    pub(super) export_dir: Option<String>,
    pub(super) wiki_home_url: Option<String>,
}

pub(super) fn load_app_config(data_dir: &str) -> AppConfig {
    let path = Path::new(data_dir).join(CONFIG_FILE_NAME);
    let Ok(bytes) = std::fs::read(&path) else {
        return AppConfig::default();
    };
    serde_json::from_slice::<AppConfig>(&bytes).unwrap_or_else(|e| {
        tracing::warn!(%e, "config unreadable, using defaults");
        AppConfig::default()
    })
}

impl AppConfig {
    pub(super) fn deferral(&self) -> Duration {
        Duration::from_millis(self.deferral_ms.unwrap_or(DEFAULT_DEFERRAL_MS))
    }
}

impl AppCore {
    pub(super) fn home_url(&self) -> String {
        self.config
            .wiki_home_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(MAIN_URL)
            .to_string()
    }

    pub(super) fn export_dir(&self) -> PathBuf {
        match self.config.export_dir.as_deref().map(str::trim) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => Path::new(&self.data_dir).join("cache"),
        }
    }

    pub(super) fn content_rule_list(&self) -> String {
        let Some(path) = self.config.content_rule_list_path.as_deref() else {
            return DEFAULT_CONTENT_RULE_LIST.to_string();
        };
        match std::fs::read_to_string(path) {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!(%e, path, "content rule list unreadable, using bundled list");
                DEFAULT_CONTENT_RULE_LIST.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_app_config(dir.path().to_str().unwrap());
        assert_eq!(config.deferral(), Duration::from_millis(300));
        assert!(config.content_rule_list_path.is_none());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            br#"{"deferral_ms": 5, "export_dir": "/tmp/out"}"#,
        )
        .unwrap();
        let config = load_app_config(dir.path().to_str().unwrap());
        assert_eq!(config.deferral(), Duration::from_millis(5));
        assert_eq!(config.export_dir.as_deref(), Some("/tmp/out"));
        assert!(config.wiki_home_url.is_none());
    }

    #[test]
    fn corrupt_config_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), b"not json").unwrap();
        let config = load_app_config(dir.path().to_str().unwrap());
        assert!(config.deferral_ms.is_none());
    }
}
