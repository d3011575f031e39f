use crate::preferences::PreferenceChange;
use crate::wiki::{LOCATION_HREF_CHANGED_HANDLER, OPEN_YOUTUBE_HANDLER, PUSH_STATE_CHANGED_HANDLER};

/// Messages posted by the injected user script.
#[derive(uniffi::Enum, Debug, Clone, PartialEq, Eq)]
pub enum PageMessage {
    PushStateChanged { url: Option<String> },
    LocationHrefChanged { url: Option<String> },
    OpenYoutube { video_id: String },
}

impl PageMessage {
    /// Maps a script message handler name and its string body to a message.
    pub fn from_script_message(name: &str, body: &str) -> Option<Self> {
        let body = body.trim();
        let url = (!body.is_empty()).then(|| body.to_string());
        match name {
            PUSH_STATE_CHANGED_HANDLER => Some(Self::PushStateChanged { url }),
            LOCATION_HREF_CHANGED_HANDLER => Some(Self::LocationHrefChanged { url }),
            OPEN_YOUTUBE_HANDLER if !body.is_empty() => Some(Self::OpenYoutube {
                video_id: body.to_string(),
            }),
            _ => None,
        }
    }
}

#[uniffi::export]
pub fn parse_page_message(name: String, body: String) -> Option<PageMessage> {
    PageMessage::from_script_message(&name, &body)
}

#[derive(uniffi::Enum, Debug, Clone)]
pub enum AppAction {
    // Launch / OS entry points
    Launched {
        url: Option<String>,
        quick_action: Option<String>,
    },
    HandleOpenUrl {
        url: String,
    },
    HandleQuickAction {
        identifier: String,
    },

    // Renderer events
    NavigationStarted {
        screen_id: u64,
    },
    NavigationCommitted {
        screen_id: u64,
    },
    NavigationFinished {
        screen_id: u64,
    },
    NavigationFailed {
        screen_id: u64,
        message: String,
    },
    PageMessage {
        screen_id: u64,
        message: PageMessage,
    },
    OpenWindowRequest {
        screen_id: u64,
        url: String,
    },

    // Navigation
    OpenUrl {
        url: String,
    },
    GoToDocument {
        title: String,
    },
    RandomDocument,
    Search {
        text: Option<String>,
    },
    PresentBookmarksAndHistory,
    SelectListEntry {
        title: String,
    },
    ShowTableOfContents {
        screen_id: u64,
    },
    SelectTocEntry {
        anchor: String,
    },
    PresentSettings,
    OpenNewWindow {
        url: String,
    },
    CloseWindow {
        screen_id: u64,
    },
    DismissModal,

    // Browser controls
    GoBack {
        screen_id: u64,
    },
    GoForward {
        screen_id: u64,
    },
    Reload {
        screen_id: u64,
    },
    FindInPage {
        screen_id: u64,
        text: String,
    },
    OpenInSystemBrowser {
        screen_id: u64,
    },
    OpenWikiSettings {
        screen_id: u64,
    },

    // Lists
    ToggleBookmark {
        screen_id: u64,
    },
    RemoveBookmarks {
        offsets: Vec<u32>,
    },
    MoveBookmark {
        from: u32,
        to: u32,
    },
    ClearBookmarks,
    RemoveHistoryEntries {
        offsets: Vec<u32>,
    },
    ClearHistory,
    ExportBookmarks,
    ExportHistory,
    CloudStoreChangedExternally,

    // Settings
    SetPreference {
        change: PreferenceChange,
    },

    // UI
    ClearToast,
}

impl AppAction {
    /// Log-safe action tag (never includes URLs or search text).
    pub fn tag(&self) -> &'static str {
        match self {
            // Launch / OS entry points
            AppAction::Launched { .. } => "Launched",
            AppAction::HandleOpenUrl { .. } => "HandleOpenUrl",
            AppAction::HandleQuickAction { .. } => "HandleQuickAction",

            // Renderer events
            AppAction::NavigationStarted { .. } => "NavigationStarted",
            AppAction::NavigationCommitted { .. } => "NavigationCommitted",
            AppAction::NavigationFinished { .. } => "NavigationFinished",
            AppAction::NavigationFailed { .. } => "NavigationFailed",
            AppAction::PageMessage { .. } => "PageMessage",
            AppAction::OpenWindowRequest { .. } => "OpenWindowRequest",

            // Navigation
            AppAction::OpenUrl { .. } => "OpenUrl",
            AppAction::GoToDocument { .. } => "GoToDocument",
            AppAction::RandomDocument => "RandomDocument",
            AppAction::Search { .. } => "Search",
            AppAction::PresentBookmarksAndHistory => "PresentBookmarksAndHistory",
            AppAction::SelectListEntry { .. } => "SelectListEntry",
            AppAction::ShowTableOfContents { .. } => "ShowTableOfContents",
            AppAction::SelectTocEntry { .. } => "SelectTocEntry",
            AppAction::PresentSettings => "PresentSettings",
            AppAction::OpenNewWindow { .. } => "OpenNewWindow",
            AppAction::CloseWindow { .. } => "CloseWindow",
            AppAction::DismissModal => "DismissModal",

            // Browser controls
            AppAction::GoBack { .. } => "GoBack",
            AppAction::GoForward { .. } => "GoForward",
            AppAction::Reload { .. } => "Reload",
            AppAction::FindInPage { .. } => "FindInPage",
            AppAction::OpenInSystemBrowser { .. } => "OpenInSystemBrowser",
            AppAction::OpenWikiSettings { .. } => "OpenWikiSettings",

            // Lists
            AppAction::ToggleBookmark { .. } => "ToggleBookmark",
            AppAction::RemoveBookmarks { .. } => "RemoveBookmarks",
            AppAction::MoveBookmark { .. } => "MoveBookmark",
            AppAction::ClearBookmarks => "ClearBookmarks",
            AppAction::RemoveHistoryEntries { .. } => "RemoveHistoryEntries",
            AppAction::ClearHistory => "ClearHistory",
            AppAction::ExportBookmarks => "ExportBookmarks",
            AppAction::ExportHistory => "ExportHistory",
            AppAction::CloudStoreChangedExternally => "CloudStoreChangedExternally",

            // Settings
            AppAction::SetPreference { .. } => "SetPreference",

            // UI
            AppAction::ClearToast => "ClearToast",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_messages_map_by_handler_name() {
        assert_eq!(
            PageMessage::from_script_message("pushStateChanged", "https://namu.wiki/w/A"),
            Some(PageMessage::PushStateChanged {
                url: Some("https://namu.wiki/w/A".into())
            })
        );
        assert_eq!(
            PageMessage::from_script_message("locationHrefChanged", ""),
            Some(PageMessage::LocationHrefChanged { url: None })
        );
        assert_eq!(
            PageMessage::from_script_message("openYoutube", "dQw4w9WgXcQ"),
            Some(PageMessage::OpenYoutube {
                video_id: "dQw4w9WgXcQ".into()
            })
        );
    }

    #[test]
    fn unknown_handlers_and_empty_video_ids_are_dropped() {
        assert_eq!(PageMessage::from_script_message("somethingElse", "x"), None);
        assert_eq!(PageMessage::from_script_message("openYoutube", "  "), None);
    }

    #[test]
    fn tags_do_not_leak_payloads() {
        let action = AppAction::Search {
            text: Some("private query".into()),
        };
        assert_eq!(action.tag(), "Search");
    }
}
