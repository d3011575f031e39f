//! User preferences.
//!
//! A single `PreferenceStore` is constructed by the app actor and passed to whatever
//! needs it; there is no process-wide singleton. Changes fan out to subscribers as
//! `PreferenceChange` values over flume channels.

use std::path::{Path, PathBuf};

use flume::{Receiver, Sender};
use serde::{Deserialize, Serialize};

use crate::lists::{write_atomically, StorageError};

pub const PREFERENCES_FILE_NAME: &str = "preferences.json";
pub const DEFAULT_ACCENT_COLOR: &str = "#008275";

// Keys match the legacy user-defaults names so a migrated settings dump reads as-is.
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    #[serde(rename = "adblock")]
    pub ad_block: bool,
    #[serde(rename = "ignoreDarkmode")]
    pub ignore_dark_mode: bool,
    #[serde(rename = "enabled_history")]
    pub history_enabled: bool,
    #[serde(rename = "use_icloud")]
    pub use_cloud_bookmarks: bool,
    #[serde(rename = "open_youtube_app")]
    pub open_video_in_app: bool,
    #[serde(rename = "globalTintColor")]
    pub accent_color: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            ad_block: false,
            ignore_dark_mode: false,
            history_enabled: true,
            use_cloud_bookmarks: false,
            open_video_in_app: true,
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum PreferenceChange {
    AdBlock { enabled: bool },
    IgnoreDarkMode { enabled: bool },
    HistoryEnabled { enabled: bool },
    UseCloudBookmarks { enabled: bool },
    OpenVideoInApp { enabled: bool },
    AccentColor { hex: String },
}

impl PreferenceChange {
    pub fn tag(&self) -> &'static str {
        match self {
            PreferenceChange::AdBlock { .. } => "AdBlock",
            PreferenceChange::IgnoreDarkMode { .. } => "IgnoreDarkMode",
            PreferenceChange::HistoryEnabled { .. } => "HistoryEnabled",
            PreferenceChange::UseCloudBookmarks { .. } => "UseCloudBookmarks",
            PreferenceChange::OpenVideoInApp { .. } => "OpenVideoInApp",
            PreferenceChange::AccentColor { .. } => "AccentColor",
        }
    }

    fn applied_to(&self, prefs: &Preferences) -> Preferences {
        let mut next = prefs.clone();
        match self {
            PreferenceChange::AdBlock { enabled } => next.ad_block = *enabled,
            PreferenceChange::IgnoreDarkMode { enabled } => next.ignore_dark_mode = *enabled,
            PreferenceChange::HistoryEnabled { enabled } => next.history_enabled = *enabled,
            PreferenceChange::UseCloudBookmarks { enabled } => {
                next.use_cloud_bookmarks = *enabled
            }
            PreferenceChange::OpenVideoInApp { enabled } => next.open_video_in_app = *enabled,
            PreferenceChange::AccentColor { hex } => next.accent_color = normalize_hex_color(hex),
        }
        next
    }
}

/// `#RRGGBB`, uppercase. Anything unparseable falls back to the app default.
pub fn normalize_hex_color(input: &str) -> String {
    let trimmed = input.trim().trim_start_matches('#');
    if trimmed.len() == 6 && trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("#{}", trimmed.to_ascii_uppercase())
    } else {
        DEFAULT_ACCENT_COLOR.to_string()
    }
}

pub struct PreferenceStore {
    path: PathBuf,
    current: Preferences,
    subscribers: Vec<Sender<PreferenceChange>>,
}

impl PreferenceStore {
    pub fn load(data_dir: &str) -> Self {
        let path = Path::new(data_dir).join(PREFERENCES_FILE_NAME);
        let current = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<Preferences>(&bytes).unwrap_or_else(|e| {
                tracing::warn!(%e, "preferences unreadable, using defaults");
                Preferences::default()
            }),
            Err(_) => Preferences::default(),
        };
        Self {
            path,
            current,
            subscribers: vec![],
        }
    }

    pub fn get(&self) -> &Preferences {
        &self.current
    }

    pub fn subscribe(&mut self) -> Receiver<PreferenceChange> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Persists and publishes `change`. Returns `Ok(false)` when nothing changed.
    /// On a write failure the in-memory value is left as it was.
    pub fn apply(&mut self, change: PreferenceChange) -> Result<bool, StorageError> {
        let next = change.applied_to(&self.current);
        if next == self.current {
            return Ok(false);
        }
        self.persist(&next)?;
        self.current = next;
        tracing::info!(change = change.tag(), "preference changed");
        self.subscribers.retain(|tx| tx.send(change.clone()).is_ok());
        Ok(true)
    }

    fn persist(&self, prefs: &Preferences) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(prefs).map_err(|e| StorageError::Format {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        write_atomically(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipping_app() {
        let prefs = Preferences::default();
        assert!(!prefs.ad_block);
        assert!(!prefs.ignore_dark_mode);
        assert!(prefs.history_enabled);
        assert!(!prefs.use_cloud_bookmarks);
        assert_eq!(prefs.accent_color, DEFAULT_ACCENT_COLOR);
    }

    #[test]
    fn missing_and_corrupt_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        assert_eq!(*PreferenceStore::load(data_dir).get(), Preferences::default());

        std::fs::write(dir.path().join(PREFERENCES_FILE_NAME), b"{oops").unwrap();
        assert_eq!(*PreferenceStore::load(data_dir).get(), Preferences::default());
    }

    #[test]
    fn legacy_keys_are_read_and_missing_keys_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PREFERENCES_FILE_NAME),
            br#"{"adblock": true, "use_icloud": true}"#,
        )
        .unwrap();
        let store = PreferenceStore::load(dir.path().to_str().unwrap());
        assert!(store.get().ad_block);
        assert!(store.get().use_cloud_bookmarks);
        assert!(store.get().history_enabled);
    }

    #[test]
    fn apply_persists_and_notifies_subscribers() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let mut store = PreferenceStore::load(data_dir);
        let rx = store.subscribe();

        assert!(store.apply(PreferenceChange::AdBlock { enabled: true }).unwrap());
        assert!(!store.apply(PreferenceChange::AdBlock { enabled: true }).unwrap());
        assert_eq!(
            rx.try_iter().collect::<Vec<_>>(),
            vec![PreferenceChange::AdBlock { enabled: true }]
        );

        let reloaded = PreferenceStore::load(data_dir);
        assert!(reloaded.get().ad_block);
    }

    #[test]
    fn apply_replaces_file_without_leaving_temp_behind() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("support");
        let data_dir = nested.to_str().unwrap();
        let mut store = PreferenceStore::load(data_dir);

        assert!(store
            .apply(PreferenceChange::AccentColor { hex: "ff8800".into() })
            .unwrap());
        assert!(nested.join(PREFERENCES_FILE_NAME).exists());
        assert!(!nested.join("preferences.tmp").exists());
        assert_eq!(PreferenceStore::load(data_dir).get().accent_color, "#FF8800");
    }

    #[test]
    fn accent_color_is_normalized() {
        assert_eq!(normalize_hex_color("ff8800"), "#FF8800");
        assert_eq!(normalize_hex_color(" #a1b2c3 "), "#A1B2C3");
        assert_eq!(normalize_hex_color("red"), DEFAULT_ACCENT_COLOR);
    }
}
