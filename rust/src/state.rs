use crate::lists::BookmarkBackend;
use crate::preferences::Preferences;
use crate::toc::TocEntry;

/// The root browser screen always exists and always has this id.
pub const MAIN_SCREEN_ID: u64 = 0;

#[derive(uniffi::Record, Clone, Debug)]
pub struct AppState {
    pub rev: u64,
    pub router: Router,
    pub screens: Vec<WebScreenState>,
    pub bookmarks: Vec<String>,
    pub history: Vec<String>,
    pub bookmark_backend: BookmarkBackend,
    pub settings: Preferences,
    pub toast: Option<String>,
}

impl AppState {
    pub fn empty() -> Self {
        Self {
            rev: 0,
            router: Router {
                default_screen: Screen::Main,
                screen_stack: vec![],
                modal: None,
            },
            screens: vec![WebScreenState::new(MAIN_SCREEN_ID, false)],
            bookmarks: vec![],
            history: vec![],
            bookmark_backend: BookmarkBackend::Local,
            settings: Preferences::default(),
            toast: None,
        }
    }

    pub fn screen(&self, screen_id: u64) -> Option<&WebScreenState> {
        self.screens.iter().find(|s| s.screen_id == screen_id)
    }

    pub fn screen_mut(&mut self, screen_id: u64) -> Option<&mut WebScreenState> {
        self.screens.iter_mut().find(|s| s.screen_id == screen_id)
    }

    /// Id of the topmost browser screen.
    pub fn active_screen_id(&self) -> u64 {
        self.router
            .screen_stack
            .last()
            .unwrap_or(&self.router.default_screen)
            .screen_id()
    }
}

#[derive(uniffi::Record, Clone, Debug, PartialEq)]
pub struct Router {
    pub default_screen: Screen,
    pub screen_stack: Vec<Screen>,
    /// At most one sheet is presented over the active screen.
    pub modal: Option<Modal>,
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum Screen {
    Main,
    Window { screen_id: u64 },
}

impl Screen {
    pub fn screen_id(&self) -> u64 {
        match self {
            Screen::Main => MAIN_SCREEN_ID,
            Screen::Window { screen_id } => *screen_id,
        }
    }
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq)]
pub enum Modal {
    BookmarksAndHistory,
    Settings,
    TableOfContents {
        screen_id: u64,
        document_title: Option<String>,
        entries: Vec<TocEntry>,
        /// `window.location.hash` at presentation time, e.g. `#s-2`.
        current_anchor: Option<String>,
    },
    /// In-app browser sheet for non-wiki web pages.
    ExternalPage { url: String },
}

impl Modal {
    pub fn tag(&self) -> &'static str {
        match self {
            Modal::BookmarksAndHistory => "BookmarksAndHistory",
            Modal::Settings => "Settings",
            Modal::TableOfContents { .. } => "TableOfContents",
            Modal::ExternalPage { .. } => "ExternalPage",
        }
    }
}

#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Loaded,
    Failed { reason: String },
}

#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct WebScreenState {
    pub screen_id: u64,
    pub phase: LoadPhase,
    pub is_loading: bool,
    pub current_url: Option<String>,
    pub document_title: Option<String>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
    pub is_bookmarked: bool,
    pub search_available: bool,
    pub table_of_contents_available: bool,
    pub shows_dismiss_button: bool,
}

impl WebScreenState {
    pub fn new(screen_id: u64, shows_dismiss_button: bool) -> Self {
        Self {
            screen_id,
            phase: LoadPhase::Idle,
            is_loading: false,
            current_url: None,
            document_title: None,
            can_go_back: false,
            can_go_forward: false,
            is_bookmarked: false,
            search_available: false,
            table_of_contents_available: false,
            shows_dismiss_button,
        }
    }

    pub fn begin_loading(&mut self) {
        self.phase = LoadPhase::Loading;
        self.is_loading = true;
    }

    pub fn finish_loading(&mut self) {
        self.phase = LoadPhase::Loaded;
        self.is_loading = false;
    }

    pub fn fail_loading(&mut self, reason: String) {
        self.phase = LoadPhase::Failed { reason };
        self.is_loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_state_has_only_the_main_screen() {
        let state = AppState::empty();
        assert_eq!(state.screens.len(), 1);
        assert_eq!(state.active_screen_id(), MAIN_SCREEN_ID);
        assert!(!state.screens[0].shows_dismiss_button);
        assert_eq!(state.router.modal, None);
    }

    #[test]
    fn active_screen_follows_stack_top() {
        let mut state = AppState::empty();
        state.screens.push(WebScreenState::new(7, true));
        state.router.screen_stack.push(Screen::Window { screen_id: 7 });
        assert_eq!(state.active_screen_id(), 7);
        assert!(state.screen(7).is_some_and(|s| s.shows_dismiss_button));
        assert!(state.screen(8).is_none());
    }

    #[test]
    fn load_phase_transitions_track_indicator() {
        let mut screen = WebScreenState::new(MAIN_SCREEN_ID, false);
        screen.begin_loading();
        assert_eq!(screen.phase, LoadPhase::Loading);
        assert!(screen.is_loading);

        screen.fail_loading("offline".into());
        assert_eq!(
            screen.phase,
            LoadPhase::Failed {
                reason: "offline".into()
            }
        );
        assert!(!screen.is_loading);

        screen.begin_loading();
        screen.finish_loading();
        assert_eq!(screen.phase, LoadPhase::Loaded);
        assert!(!screen.is_loading);
    }
}
