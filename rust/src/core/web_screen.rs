// Per-screen load state machine and renderer-derived state.

use url::Url;

use super::*;
use crate::actions::PageMessage;
use crate::web_bridge::{evaluate, evaluate_flag};
use crate::wiki;

impl AppCore {
    pub(super) fn navigation_started(&mut self, screen_id: u64) {
        // A real navigation supersedes any pending settle of a client-side change.
        self.deferred.cancel(TaskKey::SettleLocation { screen_id });
        let Some(screen) = self.state.screen_mut(screen_id) else {
            tracing::debug!(screen_id, "event for unknown screen");
            return;
        };
        screen.begin_loading();
        self.emit_state();
    }

    pub(super) fn navigation_committed(&mut self, screen_id: u64) {
        let Some(web) = self.web_view() else {
            return;
        };
        let history = web.history_state(screen_id);
        let Some(screen) = self.state.screen_mut(screen_id) else {
            return;
        };
        screen.current_url = history.url;
        screen.can_go_back = history.can_go_back;
        screen.can_go_forward = history.can_go_forward;
        self.emit_state();
    }

    pub(super) fn navigation_finished(&mut self, screen_id: u64) {
        let Some(screen) = self.state.screen_mut(screen_id) else {
            return;
        };
        screen.finish_loading();
        self.refresh_screen(screen_id);

        if screen_id == MAIN_SCREEN_ID && !self.main_screen_finished {
            self.main_screen_finished = true;
            if let Some(pending) = self.pending_launch_search.take() {
                tracing::info!("running search requested at launch");
                self.search(pending.text);
            }
        }
    }

    pub(super) fn navigation_failed(&mut self, screen_id: u64, message: String) {
        tracing::warn!(screen_id, message = %message, "navigation failed");
        let Some(screen) = self.state.screen_mut(screen_id) else {
            return;
        };
        screen.fail_loading(message.clone());
        self.toast(format!("오류가 발생하였습니다. {message}"));
    }

    pub(super) fn handle_page_message(&mut self, screen_id: u64, message: PageMessage) {
        match message {
            PageMessage::PushStateChanged { .. } => {
                // No network round-trip happened; the page is already settled.
                if let Some(screen) = self.state.screen_mut(screen_id) {
                    screen.finish_loading();
                }
                self.refresh_screen(screen_id);
            }
            PageMessage::LocationHrefChanged { .. } => {
                self.schedule(DeferredTask::SettleLocationChange { screen_id });
            }
            PageMessage::OpenYoutube { video_id } => self.open_video(&video_id),
        }
    }

    /// `target=_blank` links: wiki pages stay in the requesting screen.
    pub(super) fn open_window_request(&mut self, screen_id: u64, raw: &str) {
        match Url::parse(raw.trim()) {
            Ok(url) => self.open_parsed(url, screen_id),
            Err(e) => tracing::warn!(%e, "window request ignored: not a url"),
        }
    }

    /// Re-reads url, history flags, title and page affordances from the renderer.
    pub(super) fn refresh_screen(&mut self, screen_id: u64) {
        if self.state.screen(screen_id).is_none() {
            return;
        }
        let web = self.web_view();
        let history = web
            .as_ref()
            .map(|w| w.history_state(screen_id))
            .unwrap_or_default();

        let title = match evaluate(web.as_ref(), screen_id, wiki::DOCUMENT_TITLE_SCRIPT) {
            Ok(title) => title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::debug!(%e, screen_id, "document title unavailable");
                None
            }
        };
        let search_available =
            evaluate_flag(web.as_ref(), screen_id, wiki::SEARCH_INPUT_PRESENT_SCRIPT);
        let toc_available = evaluate_flag(web.as_ref(), screen_id, wiki::TOC_PRESENT_SCRIPT);

        if self.preferences.get().open_video_in_app {
            if let Err(e) = evaluate(web.as_ref(), screen_id, wiki::video_link_rewrite_script()) {
                tracing::debug!(%e, screen_id, "video link rewrite failed");
            }
        }

        let is_bookmarked = title
            .as_deref()
            .map(|t| self.is_bookmarked(t))
            .unwrap_or(false);

        if let Some(screen) = self.state.screen_mut(screen_id) {
            screen.current_url = history.url;
            screen.can_go_back = history.can_go_back;
            screen.can_go_forward = history.can_go_forward;
            screen.document_title = title.clone();
            screen.search_available = search_available;
            screen.table_of_contents_available = toc_available;
            screen.is_bookmarked = is_bookmarked;
        }

        if let Some(title) = title {
            self.record_history(&title);
        }
        self.emit_state();
    }

    pub(super) fn refresh_bookmark_highlights(&mut self) {
        let titles: Vec<(u64, Option<String>)> = self
            .state
            .screens
            .iter()
            .map(|s| (s.screen_id, s.document_title.clone()))
            .collect();
        for (screen_id, title) in titles {
            let is_bookmarked = title
                .as_deref()
                .map(|t| self.is_bookmarked(t))
                .unwrap_or(false);
            if let Some(screen) = self.state.screen_mut(screen_id) {
                screen.is_bookmarked = is_bookmarked;
            }
        }
    }

    /// Compiles and installs the blocking rules. Returns whether they are active.
    pub(super) fn install_content_rules(&mut self) -> bool {
        let Some(web) = self.web_view() else {
            return false;
        };
        let rules = self.content_rule_list();
        let res = web.install_content_rules(wiki::CONTENT_RULE_LIST_ID.to_string(), rules);
        if res.ok {
            tracing::info!("content rules installed");
            true
        } else {
            let message = res.error_message.unwrap_or_default();
            tracing::warn!(message = %message, "content rules rejected");
            self.toast(format!("광고 차단에 실패하였습니다. {message}"));
            false
        }
    }

    pub(super) fn set_ad_blocking(&mut self, enabled: bool) {
        if enabled {
            if !self.install_content_rules() {
                return;
            }
        } else if let Some(web) = self.web_view() {
            web.remove_content_rules(wiki::CONTENT_RULE_LIST_ID.to_string());
        }
        self.reload_all_screens();
    }

    fn reload_all_screens(&mut self) {
        let Some(web) = self.web_view() else {
            return;
        };
        for screen in &self.state.screens {
            web.reload(screen.screen_id);
        }
    }
}
