//! namu.wiki endpoints, DOM selectors and page scripts.

use url::Url;

pub const WIKI_HOST: &str = "namu.wiki";
pub const MAIN_URL: &str = "https://namu.wiki/";
pub const RANDOM_URL: &str = "https://namu.wiki/random";

/// Front page title. Never recorded in history.
pub const HOME_DOCUMENT_TITLE: &str = "나무위키:대문";

pub const VIDEO_APP_PROBE_URL: &str = "youtube://";

// Selectors, evaluated against the live page.
const SEARCH_INPUT: &str = "document.querySelector('nav>form input[type=search]')";
const TABLE_OF_CONTENTS: &str = "document.querySelector('#toc > div')";
const WIKI_SETTINGS_BUTTON: &str = "document.getElementsByClassName('ion-ios-cog')[0]";

pub const DOCUMENT_TITLE_SCRIPT: &str =
    "document.querySelectorAll('article > div + h1 > a[href]')[0].innerText.trim()";
pub const SEARCH_INPUT_PRESENT_SCRIPT: &str =
    "document.querySelector('nav>form input[type=search]') != null";
pub const TOC_PRESENT_SCRIPT: &str = "document.querySelector('#toc > div') != null";
pub const LOCATION_HASH_SCRIPT: &str = "window.location.hash";

/// Page-to-app message handler names registered with the renderer.
pub const PUSH_STATE_CHANGED_HANDLER: &str = "pushStateChanged";
pub const LOCATION_HREF_CHANGED_HANDLER: &str = "locationHrefChanged";
pub const OPEN_YOUTUBE_HANDLER: &str = "openYoutube";

pub const CONTENT_RULE_LIST_ID: &str = "com.wincomi.ios.namuViewer.rule01";

/// Declarative content-blocking rules installed when ad blocking is on.
pub const DEFAULT_CONTENT_RULE_LIST: &str = r##"[
  {"trigger": {"url-filter": ".*", "if-domain": ["*namu.wiki"]},
   "action": {"type": "css-display-none", "selector": "#search-ad, .adsbygoogle, iframe[src*='googlesyndication']"}},
  {"trigger": {"url-filter": "googlesyndication\\.com"}, "action": {"type": "block"}},
  {"trigger": {"url-filter": "doubleclick\\.net"}, "action": {"type": "block"}},
  {"trigger": {"url-filter": "adservice\\.google\\."}, "action": {"type": "block"}}
]"##;

const FIND_IN_PAGE_HELPER: &str = r#"function _namuviewer_find_in_page(text){
var marks=document.getElementsByClassName('_namuviewer_mark');
for(var i=0;i<marks.length;i++){marks[i].style.backgroundColor='transparent';}
if(text==null||text.length==0){return 0;}
var found=0;
function walk(node){
 if(node.nodeType==3){var pos=node.data.indexOf(text);if(pos<0){return 0;}
  var span=document.createElement('span');span.className='_namuviewer_mark';span.style.backgroundColor='yellow';
  var middle=node.splitText(pos);middle.splitText(text.length);span.appendChild(middle.cloneNode(true));
  middle.parentNode.replaceChild(span,middle);found++;return 1;}
 if(node.nodeType==1&&node.childNodes&&!/^(SCRIPT|STYLE)$/i.test(node.tagName)){
  for(var c=0;c<node.childNodes.length;c++){c+=walk(node.childNodes[c]);}}
 return 0;}
walk(document.body);return found;}
"#;

const PUSH_STATE_OBSERVER: &str = r#"(function(){var push=history.pushState;
history.pushState=function(state,title,url){var r=push.apply(this,arguments);
webkit.messageHandlers.pushStateChanged.postMessage(url==null?null:String(url));return r;};})();
"#;

const LOCATION_OBSERVER: &str = r#"(function(){var last=document.location.href;
var observer=new MutationObserver(function(){if(last!=document.location.href){last=document.location.href;
webkit.messageHandlers.locationHrefChanged.postMessage(last);}});
observer.observe(document.body,{childList:true,subtree:true});})();
"#;

const VIDEO_LINK_REWRITE: &str = r#"Array.from(document.getElementsByClassName('wiki-youtube')).forEach(function(frame){
var id=frame.src.substring(frame.src.lastIndexOf('/')+1).split('?')[0];
var button=document.createElement('button');button.type='button';button.className='_namuviewer-youtube-link';
button.style.cssText='background:black;display:block;width:100%;border:0;padding:5px 5px 10px;color:red;font-weight:bold';
button.innerHTML='<img src="https://img.youtube.com/vi/'+id+'/hqdefault.jpg" style="max-width:100%"><br>&#9654; YouTube';
button.onclick=function(){webkit.messageHandlers.openYoutube.postMessage(id);};
frame.replaceWith(button);});
"#;

const AD_SLOT_STYLE: &str = r#"(function(){var style=document.createElement('style');
style.innerHTML='#search-ad { display: none; }';document.head.appendChild(style);})();
"#;

/// Script the shell injects at document end in every frame.
pub fn user_script(open_video_in_app: bool) -> String {
    let mut script = String::new();
    script.push_str(FIND_IN_PAGE_HELPER);
    script.push_str(PUSH_STATE_OBSERVER);
    script.push_str(LOCATION_OBSERVER);
    if open_video_in_app {
        script.push_str(VIDEO_LINK_REWRITE);
    }
    script.push_str(AD_SLOT_STYLE);
    script
}

/// Re-run after client-side route changes; the injected copy only sees the first DOM.
pub fn video_link_rewrite_script() -> &'static str {
    VIDEO_LINK_REWRITE
}

pub fn focus_search_input_script() -> String {
    format!("{SEARCH_INPUT}.focus()")
}

pub fn open_wiki_settings_script() -> String {
    format!("{WIKI_SETTINGS_BUTTON}.click()")
}

pub fn table_of_contents_script() -> String {
    format!("{TABLE_OF_CONTENTS}.innerHTML")
}

pub fn scroll_to_anchor_script(anchor: &str) -> String {
    format!("window.location.hash='{}'", js_string_escape(anchor))
}

pub fn find_in_page_script(text: &str) -> String {
    format!("_namuviewer_find_in_page('{}');", js_string_escape(text))
}

fn js_string_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

pub fn document_url(title: &str) -> String {
    format!("https://{WIKI_HOST}/go/{}", urlencoding::encode(title))
}

pub fn search_url(query: &str) -> String {
    format!("https://{WIKI_HOST}/Search?q={}", urlencoding::encode(query))
}

pub fn video_app_url(video_id: &str) -> String {
    format!("{VIDEO_APP_PROBE_URL}{video_id}")
}

pub fn video_web_url(video_id: &str) -> String {
    format!("http://www.youtube.com/watch?v={}", urlencoding::encode(video_id))
}

pub fn is_wiki_url(url: &Url) -> bool {
    url.host_str() == Some(WIKI_HOST)
}

fn is_web_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Where a URL opened from outside the page (deep link, settings link, new window request) goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    /// Load in the active web screen.
    InPlace,
    /// Embedded external-page viewer.
    ExternalViewer,
    /// OS generic URL handler.
    System,
}

/// Non-web schemes always go to the OS, even when the host is the wiki.
pub fn open_target(url: &Url) -> OpenTarget {
    if !is_web_scheme(url) {
        OpenTarget::System
    } else if is_wiki_url(url) {
        OpenTarget::InPlace
    } else {
        OpenTarget::ExternalViewer
    }
}

/// How a renderer-initiated navigation is handled.
#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    LinkActivated,
    Other,
}

#[derive(uniffi::Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPolicy {
    Allow,
    Cancel,
}

/// Outbound policy: user link taps stay in place only on the wiki host.
pub fn link_policy(url: &Url, kind: NavigationKind) -> (NavigationPolicy, Option<OpenTarget>) {
    if kind != NavigationKind::LinkActivated {
        return (NavigationPolicy::Allow, None);
    }
    if !is_web_scheme(url) {
        return (NavigationPolicy::Cancel, Some(OpenTarget::System));
    }
    if is_wiki_url(url) {
        (NavigationPolicy::Allow, None)
    } else {
        (NavigationPolicy::Cancel, Some(OpenTarget::ExternalViewer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn document_url_percent_encodes_title() {
        assert_eq!(
            document_url("나무위키"),
            "https://namu.wiki/go/%EB%82%98%EB%AC%B4%EC%9C%84%ED%82%A4"
        );
        assert_eq!(document_url("A/B C"), "https://namu.wiki/go/A%2FB%20C");
    }

    #[test]
    fn search_url_encodes_query() {
        assert_eq!(search_url("a&b"), "https://namu.wiki/Search?q=a%26b");
        assert_eq!(search_url(""), "https://namu.wiki/Search?q=");
    }

    #[test]
    fn open_target_routes_by_host_and_scheme() {
        assert_eq!(open_target(&url("https://namu.wiki/w/X")), OpenTarget::InPlace);
        assert_eq!(
            open_target(&url("https://example.com/")),
            OpenTarget::ExternalViewer
        );
        assert_eq!(open_target(&url("mailto:a@b.c")), OpenTarget::System);
        assert_eq!(open_target(&url("http://namu.wiki/")), OpenTarget::InPlace);
        assert_eq!(
            open_target(&url("intent://namu.wiki/w/X")),
            OpenTarget::System
        );
    }

    #[test]
    fn link_policy_only_keeps_wiki_links_in_place() {
        let tap = NavigationKind::LinkActivated;
        assert_eq!(
            link_policy(&url("https://namu.wiki/w/Y"), tap),
            (NavigationPolicy::Allow, None)
        );
        assert_eq!(
            link_policy(&url("https://en.wikipedia.org/"), tap),
            (NavigationPolicy::Cancel, Some(OpenTarget::ExternalViewer))
        );
        assert_eq!(
            link_policy(&url("tel:123"), tap),
            (NavigationPolicy::Cancel, Some(OpenTarget::System))
        );
        assert_eq!(
            link_policy(&url("https://en.wikipedia.org/"), NavigationKind::Other),
            (NavigationPolicy::Allow, None)
        );
    }

    #[test]
    fn scripts_escape_quotes() {
        assert_eq!(scroll_to_anchor_script("#s-1"), "window.location.hash='#s-1'");
        assert_eq!(
            find_in_page_script("it's"),
            "_namuviewer_find_in_page('it\\'s');"
        );
    }

    #[test]
    fn user_script_includes_video_rewrite_only_when_enabled() {
        assert!(user_script(true).contains("openYoutube"));
        assert!(!user_script(false).contains("openYoutube"));
        assert!(user_script(false).contains("pushStateChanged"));
    }
}
