mod config;
mod library;
mod navigation;
mod scheduler;
mod settings;
mod web_screen;

use std::sync::{Arc, RwLock};

use flume::{Receiver, Sender};

use crate::actions::AppAction;
use crate::lists::{BookmarkBackend, BookmarksRepository, HistoryRepository, SharedCloudStore};
use crate::preferences::{PreferenceChange, PreferenceStore};
use crate::state::{AppState, Modal, Screen, WebScreenState, MAIN_SCREEN_ID};
use crate::updates::{AppUpdate, CoreMsg, InternalEvent};
use crate::web_bridge::{SharedSystemBridge, SharedWebViewBridge, SystemBridge, WebViewBridge};

pub use scheduler::DeferredTask;
use scheduler::{DeferredTasks, TaskKey};

/// A search requested before the main screen has loaded anything.
#[derive(Debug, Clone)]
struct PendingSearch {
    text: Option<String>,
}

pub struct AppCore {
    pub state: AppState,
    rev: u64,

    update_sender: Sender<AppUpdate>,
    core_sender: Sender<CoreMsg>,
    shared_state: Arc<RwLock<AppState>>,

    data_dir: String,
    config: config::AppConfig,
    runtime: tokio::runtime::Runtime,

    preferences: PreferenceStore,
    preference_changes: Receiver<PreferenceChange>,
    bookmarks: BookmarksRepository,
    history: HistoryRepository,

    web_view: SharedWebViewBridge,
    system: SharedSystemBridge,

    deferred: DeferredTasks,
    next_screen_id: u64,
    pending_launch_search: Option<PendingSearch>,
    main_screen_finished: bool,
}

impl AppCore {
    pub fn new(
        update_sender: Sender<AppUpdate>,
        core_sender: Sender<CoreMsg>,
        data_dir: String,
        shared_state: Arc<RwLock<AppState>>,
        web_view: SharedWebViewBridge,
        system: SharedSystemBridge,
        cloud: SharedCloudStore,
    ) -> Self {
        let config = config::load_app_config(&data_dir);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .expect("tokio runtime");

        let mut preferences = PreferenceStore::load(&data_dir);
        let preference_changes = preferences.subscribe();
        let bookmarks = BookmarksRepository::in_data_dir(&data_dir, cloud);
        let history = HistoryRepository::in_data_dir(&data_dir);

        let mut state = AppState::empty();
        state.settings = preferences.get().clone();
        state.bookmark_backend = BookmarkBackend::from_preferences(preferences.get());

        let mut this = Self {
            state,
            rev: 0,
            update_sender,
            core_sender,
            shared_state,
            data_dir,
            config,
            runtime,
            preferences,
            preference_changes,
            bookmarks,
            history,
            web_view,
            system,
            deferred: DeferredTasks::default(),
            next_screen_id: MAIN_SCREEN_ID + 1,
            pending_launch_search: None,
            main_screen_finished: false,
        };

        this.ensure_lists_initialized();
        this.reload_lists();

        // Ensure FfiApp.state() has an immediately-available snapshot.
        let snapshot = this.state.clone();
        this.commit_state_snapshot(&snapshot);
        this
    }

    fn next_rev(&mut self) -> u64 {
        self.rev += 1;
        self.state.rev = self.rev;
        self.rev
    }

    fn commit_state_snapshot(&self, snapshot: &AppState) {
        match self.shared_state.write() {
            Ok(mut g) => *g = snapshot.clone(),
            Err(poison) => *poison.into_inner() = snapshot.clone(),
        }
    }

    fn emit_state(&mut self) {
        self.next_rev();
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(AppUpdate::FullState(snapshot));
    }

    fn emit_side_effect(&mut self, make: impl FnOnce(u64) -> AppUpdate) {
        let rev = self.next_rev();
        // Keep snapshot rev in sync with the update stream even though this is a side-effect update.
        let snapshot = self.state.clone();
        self.commit_state_snapshot(&snapshot);
        let _ = self.update_sender.send(make(rev));
    }

    fn toast(&mut self, msg: impl Into<String>) {
        // Kept in state until the UI clears it, so a rev-gap resync still shows it.
        self.state.toast = Some(msg.into());
        self.emit_state();
    }

    fn web_view(&self) -> Option<Arc<dyn WebViewBridge>> {
        crate::web_bridge::current(&self.web_view)
    }

    fn system(&self) -> Option<Arc<dyn SystemBridge>> {
        crate::web_bridge::current(&self.system)
    }

    /// Resolved per call so a settings toggle takes effect on the next operation.
    fn bookmark_backend(&self) -> BookmarkBackend {
        BookmarkBackend::from_preferences(self.preferences.get())
    }

    pub fn handle_message(&mut self, msg: CoreMsg) {
        match msg {
            CoreMsg::Action(ref action) => {
                // Never log `?action` directly: it carries URLs and search text.
                tracing::info!(action = action.tag(), "dispatch");
                self.handle_action(action.clone());
            }
            CoreMsg::Internal(internal) => self.handle_internal(*internal),
        }
    }

    fn handle_internal(&mut self, internal: InternalEvent) {
        match internal {
            InternalEvent::DeferredTaskFired { token, task } => self.handle_deferred(token, task),
        }
    }

    fn handle_action(&mut self, action: AppAction) {
        match action {
            // Launch / OS entry points
            AppAction::Launched { url, quick_action } => {
                self.handle_launch(url.as_deref(), quick_action.as_deref())
            }
            AppAction::HandleOpenUrl { url } => self.handle_open_url(&url),
            AppAction::HandleQuickAction { identifier } => self.handle_quick_action(&identifier),

            // Renderer events
            AppAction::NavigationStarted { screen_id } => self.navigation_started(screen_id),
            AppAction::NavigationCommitted { screen_id } => self.navigation_committed(screen_id),
            AppAction::NavigationFinished { screen_id } => self.navigation_finished(screen_id),
            AppAction::NavigationFailed { screen_id, message } => {
                self.navigation_failed(screen_id, message)
            }
            AppAction::PageMessage { screen_id, message } => {
                self.handle_page_message(screen_id, message)
            }
            AppAction::OpenWindowRequest { screen_id, url } => {
                self.open_window_request(screen_id, &url)
            }

            // Navigation
            AppAction::OpenUrl { url } => self.open_url(&url),
            AppAction::GoToDocument { title } => self.go_to_document(&title),
            AppAction::RandomDocument => self.go_to_random_document(),
            AppAction::Search { text } => self.search(text),
            AppAction::PresentBookmarksAndHistory => self.present_bookmarks_and_history(),
            AppAction::SelectListEntry { title } => {
                self.dismiss_modal();
                self.go_to_document(&title);
            }
            AppAction::ShowTableOfContents { screen_id } => {
                self.present_table_of_contents(screen_id)
            }
            AppAction::SelectTocEntry { anchor } => self.select_toc_entry(&anchor),
            AppAction::PresentSettings => self.present_modal(Modal::Settings),
            AppAction::OpenNewWindow { url } => self.present_new_window(&url),
            AppAction::CloseWindow { screen_id } => self.close_window(screen_id),
            AppAction::DismissModal => self.dismiss_modal(),

            // Browser controls
            AppAction::GoBack { screen_id } => {
                if let Some(web) = self.web_view() {
                    web.go_back(screen_id);
                }
            }
            AppAction::GoForward { screen_id } => {
                if let Some(web) = self.web_view() {
                    web.go_forward(screen_id);
                }
            }
            AppAction::Reload { screen_id } => {
                if let Some(web) = self.web_view() {
                    web.reload(screen_id);
                }
            }
            AppAction::FindInPage { screen_id, text } => self.find_in_page(screen_id, &text),
            AppAction::OpenInSystemBrowser { screen_id } => self.open_in_system_browser(screen_id),
            AppAction::OpenWikiSettings { screen_id } => self.open_wiki_settings(screen_id),

            // Lists
            AppAction::ToggleBookmark { screen_id } => self.toggle_bookmark(screen_id),
            AppAction::RemoveBookmarks { offsets } => self.remove_bookmarks(&offsets),
            AppAction::MoveBookmark { from, to } => self.move_bookmark(from, to),
            AppAction::ClearBookmarks => self.clear_bookmarks(),
            AppAction::RemoveHistoryEntries { offsets } => self.remove_history_entries(&offsets),
            AppAction::ClearHistory => self.clear_history(),
            AppAction::ExportBookmarks => self.export_bookmarks(),
            AppAction::ExportHistory => self.export_history(),
            AppAction::CloudStoreChangedExternally => {
                if self.bookmark_backend() == BookmarkBackend::Cloud {
                    self.reload_lists();
                    self.refresh_bookmark_highlights();
                    self.emit_state();
                }
            }

            // Settings
            AppAction::SetPreference { change } => self.set_preference(change),

            // UI
            AppAction::ClearToast => {
                if self.state.toast.is_some() {
                    self.state.toast = None;
                    self.emit_state();
                }
            }
        }
    }
}
