// Coordinator: launch/deep-link routing, modals, windows and page-level commands.

use url::Url;

use super::*;
use crate::deep_link::{parse_deep_link, DeepLink, QuickAction};
use crate::web_bridge::evaluate;
use crate::wiki;

impl AppCore {
    pub(super) fn handle_launch(&mut self, url: Option<&str>, quick_action: Option<&str>) {
        let mut initial_url = self.home_url();
        if self.preferences.get().ad_block {
            self.install_content_rules();
        }

        match quick_action.map(|id| (id, QuickAction::from_identifier(id))) {
            Some((_, Some(QuickAction::Search))) => {
                self.pending_launch_search = Some(PendingSearch { text: None });
            }
            Some((_, Some(QuickAction::Bookmarks))) => self.present_bookmarks_and_history(),
            Some((_, Some(QuickAction::RandomDocument))) => {
                initial_url = wiki::RANDOM_URL.to_string();
            }
            Some((id, None)) => tracing::warn!(identifier = id, "unknown quick action ignored"),
            None => {}
        }

        if let Some(raw) = url {
            match parse_deep_link(raw) {
                Some(DeepLink::OpenUrl { url }) => match Url::parse(&url) {
                    Ok(_) => initial_url = url,
                    Err(e) => tracing::warn!(%e, "launch openURL is not a url"),
                },
                Some(DeepLink::Search { text }) => {
                    self.pending_launch_search = Some(PendingSearch {
                        text: (!text.is_empty()).then_some(text),
                    });
                }
                Some(DeepLink::OpenBookmarks) => self.present_bookmarks_and_history(),
                None => tracing::warn!("unrecognized launch url ignored"),
            }
        }

        self.load_in_screen(MAIN_SCREEN_ID, &initial_url);
    }

    pub(super) fn handle_open_url(&mut self, url: &str) {
        match parse_deep_link(url) {
            Some(link) => {
                tracing::info!(link = link.tag(), "deep link");
                self.open_deep_link(link);
            }
            None => tracing::warn!("unrecognized open url ignored"),
        }
    }

    fn open_deep_link(&mut self, link: DeepLink) {
        match link {
            DeepLink::OpenUrl { url } => self.open_url(&url),
            DeepLink::Search { text } => self.search((!text.is_empty()).then_some(text)),
            DeepLink::OpenBookmarks => self.present_bookmarks_and_history(),
        }
    }

    pub(super) fn handle_quick_action(&mut self, identifier: &str) {
        match QuickAction::from_identifier(identifier) {
            Some(QuickAction::Search) => self.search(None),
            Some(QuickAction::Bookmarks) => self.present_bookmarks_and_history(),
            Some(QuickAction::RandomDocument) => self.go_to_random_document(),
            None => tracing::warn!(identifier, "unknown quick action ignored"),
        }
    }

    pub(super) fn load_in_screen(&mut self, screen_id: u64, url: &str) {
        match self.web_view() {
            Some(web) => web.load_url(screen_id, url.to_string()),
            None => tracing::warn!(screen_id, "load requested before web view bridge attached"),
        }
    }

    /// Wiki pages load in the active screen, other web pages in the external viewer,
    /// everything else goes to the OS.
    pub(super) fn open_url(&mut self, raw: &str) {
        let url = match Url::parse(raw.trim()) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%e, "open ignored: not a url");
                return;
            }
        };
        self.open_parsed(url, self.state.active_screen_id());
    }

    pub(super) fn open_parsed(&mut self, url: Url, screen_id: u64) {
        match wiki::open_target(&url) {
            wiki::OpenTarget::InPlace => self.load_in_screen(screen_id, url.as_str()),
            wiki::OpenTarget::ExternalViewer => self.present_modal(Modal::ExternalPage {
                url: url.to_string(),
            }),
            wiki::OpenTarget::System => self.open_with_system(url.as_str()),
        }
    }

    pub(super) fn open_with_system(&mut self, url: &str) {
        let opened = self
            .system()
            .map(|system| system.open_url(url.to_string()))
            .unwrap_or(false);
        if !opened {
            tracing::warn!(scheme = url.split(':').next().unwrap_or(""), "system open failed");
        }
    }

    pub(super) fn go_to_document(&mut self, title: &str) {
        let url = wiki::document_url(title);
        self.load_in_screen(self.state.active_screen_id(), &url);
    }

    pub(super) fn go_to_random_document(&mut self) {
        self.load_in_screen(self.state.active_screen_id(), wiki::RANDOM_URL);
        self.toast("랜덤한 문서로 이동합니다.");
    }

    pub(super) fn search(&mut self, text: Option<String>) {
        let screen_id = self.state.active_screen_id();
        if let Some(text) = text {
            self.load_in_screen(screen_id, &wiki::search_url(&text));
            return;
        }

        let available = self
            .state
            .screen(screen_id)
            .is_some_and(|s| s.search_available);
        if !available {
            tracing::info!(screen_id, "search input not available on this page");
            return;
        }
        if self.state.router.modal.is_some() {
            self.state.router.modal = None;
            self.emit_state();
        }
        self.schedule(DeferredTask::FocusSearchInput { screen_id });
    }

    pub(super) fn focus_search_input(&mut self, screen_id: u64) {
        let web = self.web_view();
        if let Err(e) = evaluate(web.as_ref(), screen_id, &wiki::focus_search_input_script()) {
            tracing::warn!(%e, screen_id, "focus search input failed");
            self.toast(format!("오류가 발생하였습니다. {e}"));
        }
    }

    pub(super) fn present_modal(&mut self, modal: Modal) {
        tracing::debug!(modal = modal.tag(), "present");
        self.state.router.modal = Some(modal);
        self.emit_state();
    }

    pub(super) fn dismiss_modal(&mut self) {
        if self.state.router.modal.take().is_some() {
            self.emit_state();
        }
    }

    pub(super) fn present_bookmarks_and_history(&mut self) {
        self.reload_lists();
        self.present_modal(Modal::BookmarksAndHistory);
    }

    pub(super) fn present_table_of_contents(&mut self, screen_id: u64) {
        let web = self.web_view();
        let html = match evaluate(web.as_ref(), screen_id, &wiki::table_of_contents_script()) {
            Ok(Some(html)) => html,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(%e, screen_id, "table of contents unavailable");
                if let Some(screen) = self.state.screen_mut(screen_id) {
                    screen.table_of_contents_available = false;
                }
                self.toast(format!("오류가 발생하였습니다. {e}"));
                return;
            }
        };
        let entries = match crate::toc::parse_table_of_contents(&html) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(%e, "table of contents parse failed");
                vec![]
            }
        };
        let current_anchor = evaluate(web.as_ref(), screen_id, wiki::LOCATION_HASH_SCRIPT)
            .ok()
            .flatten()
            .filter(|hash| !hash.is_empty());
        let document_title = self
            .state
            .screen(screen_id)
            .and_then(|s| s.document_title.clone());

        self.present_modal(Modal::TableOfContents {
            screen_id,
            document_title,
            entries,
            current_anchor,
        });
    }

    pub(super) fn select_toc_entry(&mut self, anchor: &str) {
        let screen_id = match &self.state.router.modal {
            Some(Modal::TableOfContents { screen_id, .. }) => *screen_id,
            _ => self.state.active_screen_id(),
        };
        self.dismiss_modal();
        let web = self.web_view();
        if let Err(e) = evaluate(web.as_ref(), screen_id, &wiki::scroll_to_anchor_script(anchor)) {
            tracing::warn!(%e, screen_id, "scroll to anchor failed");
        }
    }

    pub(super) fn present_new_window(&mut self, url: &str) {
        let url = match Url::parse(url.trim()) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%e, "new window ignored: not a url");
                return;
            }
        };
        let screen_id = self.next_screen_id;
        self.next_screen_id += 1;
        self.state
            .screens
            .push(WebScreenState::new(screen_id, true));
        self.state
            .router
            .screen_stack
            .push(Screen::Window { screen_id });
        self.state.router.modal = None;
        self.emit_state();
        self.load_in_screen(screen_id, url.as_str());
    }

    pub(super) fn close_window(&mut self, screen_id: u64) {
        if screen_id == MAIN_SCREEN_ID {
            return;
        }
        let before = self.state.router.screen_stack.len();
        self.state
            .router
            .screen_stack
            .retain(|s| s.screen_id() != screen_id);
        if self.state.router.screen_stack.len() == before {
            return;
        }
        self.state.screens.retain(|s| s.screen_id != screen_id);
        self.deferred.cancel_screen(screen_id);
        if matches!(
            self.state.router.modal,
            Some(Modal::TableOfContents { screen_id: id, .. }) if id == screen_id
        ) {
            self.state.router.modal = None;
        }
        self.emit_state();
    }

    pub(super) fn open_video(&mut self, video_id: &str) {
        let app_url = wiki::video_app_url(video_id);
        let can_open_app = self.preferences.get().open_video_in_app
            && self
                .system()
                .is_some_and(|s| s.can_open_url(wiki::VIDEO_APP_PROBE_URL.to_string()));
        if can_open_app {
            self.open_with_system(&app_url);
        } else {
            self.present_modal(Modal::ExternalPage {
                url: wiki::video_web_url(video_id),
            });
        }
    }

    pub(super) fn find_in_page(&mut self, screen_id: u64, text: &str) {
        if text.is_empty() {
            return;
        }
        let web = self.web_view();
        if let Err(e) = evaluate(web.as_ref(), screen_id, &wiki::find_in_page_script(text)) {
            tracing::warn!(%e, screen_id, "find in page failed");
        }
    }

    pub(super) fn open_in_system_browser(&mut self, screen_id: u64) {
        let Some(url) = self
            .state
            .screen(screen_id)
            .and_then(|s| s.current_url.clone())
        else {
            return;
        };
        self.open_with_system(&url);
    }

    pub(super) fn open_wiki_settings(&mut self, screen_id: u64) {
        let web = self.web_view();
        if let Err(e) = evaluate(web.as_ref(), screen_id, &wiki::open_wiki_settings_script()) {
            tracing::warn!(%e, screen_id, "open wiki settings failed");
        }
    }
}
