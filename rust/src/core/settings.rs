// Preference changes and the side effects they trigger.

use super::*;

impl AppCore {
    pub(super) fn set_preference(&mut self, change: PreferenceChange) {
        match self.preferences.apply(change) {
            Ok(true) => self.drain_preference_changes(),
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(%e, "preference write failed");
                self.toast(format!("오류가 발생했습니다. {e}"));
            }
        }
    }

    fn drain_preference_changes(&mut self) {
        let changes: Vec<PreferenceChange> = self.preference_changes.try_iter().collect();
        self.state.settings = self.preferences.get().clone();
        for change in changes {
            match change {
                PreferenceChange::AdBlock { enabled } => self.set_ad_blocking(enabled),
                PreferenceChange::UseCloudBookmarks { .. } => {
                    // Each backend keeps its own list; nothing is copied across.
                    self.ensure_lists_initialized();
                    self.reload_lists();
                    self.refresh_bookmark_highlights();
                }
                PreferenceChange::IgnoreDarkMode { .. }
                | PreferenceChange::HistoryEnabled { .. }
                | PreferenceChange::OpenVideoInApp { .. }
                | PreferenceChange::AccentColor { .. } => {}
            }
        }
        self.emit_state();
    }
}
