//! `namuviewer://` deep links and home-screen quick actions.
//!
//! Supported forms:
//! - `namuviewer://?openURL=https://namu.wiki/w/...`
//! - `namuviewer://?search=<text>`
//! - `namuviewer://bookmark`

use url::Url;

#[derive(uniffi::Enum, Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    OpenUrl { url: String },
    Search { text: String },
    OpenBookmarks,
}

impl DeepLink {
    pub fn tag(&self) -> &'static str {
        match self {
            DeepLink::OpenUrl { .. } => "OpenUrl",
            DeepLink::Search { .. } => "Search",
            DeepLink::OpenBookmarks => "OpenBookmarks",
        }
    }
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find_map(|(k, v)| if k == key { Some(v.into_owned()) } else { None })
}

/// Decodes a launch/open URL. Precedence: `openURL`, then `search`, then host `bookmark`.
#[uniffi::export]
pub fn parse_deep_link(url: &str) -> Option<DeepLink> {
    let parsed = Url::parse(url.trim()).ok()?;

    // An empty openURL carries nothing to open; let the other markers decide.
    if let Some(target) = query_value(&parsed, "openURL").filter(|v| !v.is_empty()) {
        return Some(DeepLink::OpenUrl { url: target });
    }
    if let Some(text) = query_value(&parsed, "search") {
        return Some(DeepLink::Search { text });
    }
    if parsed.host_str() == Some("bookmark") {
        return Some(DeepLink::OpenBookmarks);
    }
    None
}

pub const QUICK_ACTION_SEARCH: &str = "com.wincomi.ios.namuViewer.search";
pub const QUICK_ACTION_BOOKMARK: &str = "com.wincomi.ios.namuViewer.bookmark";
pub const QUICK_ACTION_RANDOM: &str = "com.wincomi.ios.namuViewer.random";

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    Search,
    Bookmarks,
    RandomDocument,
}

impl QuickAction {
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            QUICK_ACTION_SEARCH => Some(Self::Search),
            QUICK_ACTION_BOOKMARK => Some(Self::Bookmarks),
            QUICK_ACTION_RANDOM => Some(Self::RandomDocument),
            _ => None,
        }
    }
}
