// Bookmarks + history: list mutations, highlight state and exports.

use super::*;
use crate::lists::{
    write_export, StorageError, BOOKMARKS_EXPORT_FILE_NAME, HISTORY_EXPORT_FILE_NAME,
};
use crate::updates::ExportKind;

const STORAGE_ERROR_TOAST: &str = "오류가 발생했습니다.";

impl AppCore {
    pub(super) fn ensure_lists_initialized(&mut self) {
        if let Err(e) = self.bookmarks.ensure_initialized(self.bookmark_backend()) {
            tracing::error!(%e, "bookmarks store init failed");
        }
        if let Err(e) = self.history.ensure_initialized() {
            tracing::error!(%e, "history store init failed");
        }
    }

    /// Reloads both lists into state. A failed read keeps the previous in-memory list.
    pub(super) fn reload_lists(&mut self) {
        let backend = self.bookmark_backend();
        self.state.bookmark_backend = backend;
        match self.bookmarks.load(backend) {
            Ok(items) => self.state.bookmarks = items,
            Err(e) => self.note_storage_error("load bookmarks", e),
        }
        match self.history.load() {
            Ok(items) => self.state.history = items,
            Err(e) => self.note_storage_error("load history", e),
        }
    }

    /// Logs and queues a toast without emitting; callers emit once when done.
    fn note_storage_error(&mut self, op: &str, e: StorageError) {
        tracing::warn!(%e, op, "storage error");
        self.state.toast = Some(format!("{STORAGE_ERROR_TOAST} {e}"));
    }

    pub(super) fn is_bookmarked(&self, title: &str) -> bool {
        match self.bookmarks.contains(self.bookmark_backend(), title) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(%e, "bookmark lookup failed");
                false
            }
        }
    }

    /// No-op when history recording is disabled. State is not emitted here.
    pub(super) fn record_history(&mut self, title: &str) {
        if !self.preferences.get().history_enabled {
            return;
        }
        match self.history.insert_first(title) {
            Ok(()) => {
                if let Ok(items) = self.history.load() {
                    self.state.history = items;
                }
            }
            Err(e) => self.note_storage_error("record history", e),
        }
    }

    pub(super) fn toggle_bookmark(&mut self, screen_id: u64) {
        let Some(title) = self
            .state
            .screen(screen_id)
            .and_then(|s| s.document_title.clone())
        else {
            tracing::debug!(screen_id, "no document title to bookmark");
            return;
        };
        let backend = self.bookmark_backend();
        let result = match self.bookmarks.contains(backend, &title) {
            Ok(true) => self
                .bookmarks
                .remove(backend, &title)
                .map(|()| format!("즐겨찾기에서 제거됨: {title}")),
            Ok(false) => self
                .bookmarks
                .insert_first(backend, &title)
                .map(|()| format!("즐겨찾기에 추가됨: {title}")),
            Err(e) => Err(e),
        };
        match result {
            Ok(msg) => self.state.toast = Some(msg),
            Err(e) => self.note_storage_error("toggle bookmark", e),
        }
        self.reload_lists();
        self.refresh_bookmark_highlights();
        self.emit_state();
    }

    pub(super) fn remove_bookmarks(&mut self, offsets: &[u32]) {
        match self.bookmarks.remove_at(self.bookmark_backend(), offsets) {
            Ok(items) => self.state.bookmarks = items,
            Err(e) => self.note_storage_error("remove bookmarks", e),
        }
        self.refresh_bookmark_highlights();
        self.emit_state();
    }

    pub(super) fn move_bookmark(&mut self, from: u32, to: u32) {
        match self.bookmarks.move_item(self.bookmark_backend(), from, to) {
            Ok(items) => self.state.bookmarks = items,
            Err(e) => self.note_storage_error("move bookmark", e),
        }
        self.emit_state();
    }

    pub(super) fn clear_bookmarks(&mut self) {
        match self.bookmarks.remove_all(self.bookmark_backend()) {
            Ok(()) => self.state.bookmarks.clear(),
            Err(e) => self.note_storage_error("clear bookmarks", e),
        }
        self.refresh_bookmark_highlights();
        self.emit_state();
    }

    pub(super) fn remove_history_entries(&mut self, offsets: &[u32]) {
        match self.history.remove_at(offsets) {
            Ok(items) => self.state.history = items,
            Err(e) => self.note_storage_error("remove history", e),
        }
        self.emit_state();
    }

    pub(super) fn clear_history(&mut self) {
        match self.history.remove_all() {
            Ok(()) => self.state.history.clear(),
            Err(e) => self.note_storage_error("clear history", e),
        }
        self.emit_state();
    }

    pub(super) fn export_bookmarks(&mut self) {
        let text = self.bookmarks.export_text(self.bookmark_backend());
        self.export(ExportKind::Bookmarks, BOOKMARKS_EXPORT_FILE_NAME, text);
    }

    pub(super) fn export_history(&mut self) {
        let text = self.history.export_text();
        self.export(ExportKind::History, HISTORY_EXPORT_FILE_NAME, text);
    }

    fn export(&mut self, kind: ExportKind, file_name: &str, text: Option<String>) {
        let Some(text) = text else {
            self.toast(STORAGE_ERROR_TOAST);
            return;
        };
        match write_export(&self.export_dir(), file_name, &text) {
            Ok(path) => {
                let path = path.display().to_string();
                tracing::info!(?kind, "export written");
                self.emit_side_effect(|rev| AppUpdate::ExportReady { rev, kind, path });
            }
            Err(e) => {
                self.note_storage_error("export", e);
                self.emit_state();
            }
        }
    }
}
