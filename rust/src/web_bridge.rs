use std::sync::{Arc, RwLock};

/// Outcome of a renderer call that can fail (script evaluation, rule compilation).
#[derive(uniffi::Record, Clone, Debug, PartialEq, Eq)]
pub struct ScriptResult {
    pub ok: bool,
    /// Result coerced to a string by the platform (`"true"`, a title, an HTML fragment).
    pub value: Option<String>,
    pub error_message: Option<String>,
}

impl ScriptResult {
    pub fn success(value: Option<String>) -> Self {
        Self {
            ok: true,
            value,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            value: None,
            error_message: Some(message.into()),
        }
    }
}

#[derive(uniffi::Record, Clone, Debug, Default, PartialEq, Eq)]
pub struct RendererHistoryState {
    pub url: Option<String>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

/// The embedded web renderer, one instance per `screen_id`.
#[uniffi::export(callback_interface)]
pub trait WebViewBridge: Send + Sync + 'static {
    fn load_url(&self, screen_id: u64, url: String);
    fn go_back(&self, screen_id: u64);
    fn go_forward(&self, screen_id: u64);
    fn reload(&self, screen_id: u64);
    fn evaluate_script(&self, screen_id: u64, script: String) -> ScriptResult;
    fn history_state(&self, screen_id: u64) -> RendererHistoryState;
    fn install_content_rules(&self, identifier: String, encoded_rules: String) -> ScriptResult;
    fn remove_content_rules(&self, identifier: String);
}

/// OS-level URL handling (other apps, mail, phone, the system browser).
#[uniffi::export(callback_interface)]
pub trait SystemBridge: Send + Sync + 'static {
    fn can_open_url(&self, url: String) -> bool;
    fn open_url(&self, url: String) -> bool;
}

pub type SharedWebViewBridge = Arc<RwLock<Option<Arc<dyn WebViewBridge>>>>;
pub type SharedSystemBridge = Arc<RwLock<Option<Arc<dyn SystemBridge>>>>;

pub(crate) fn current<T: ?Sized>(slot: &RwLock<Option<Arc<T>>>) -> Option<Arc<T>> {
    match slot.read() {
        Ok(g) => g.clone(),
        Err(poison) => poison.into_inner().clone(),
    }
}

pub(crate) fn install<T: ?Sized>(slot: &RwLock<Option<Arc<T>>>, value: Arc<T>) {
    match slot.write() {
        Ok(mut g) => *g = Some(value),
        Err(poison) => *poison.into_inner() = Some(value),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("web view bridge not attached")]
    BridgeUnavailable,

    #[error("script evaluation failed: {0}")]
    Evaluation(String),
}

pub(crate) fn evaluate(
    bridge: Option<&Arc<dyn WebViewBridge>>,
    screen_id: u64,
    script: &str,
) -> Result<Option<String>, ScriptError> {
    let bridge = bridge.ok_or(ScriptError::BridgeUnavailable)?;
    let res = bridge.evaluate_script(screen_id, script.to_string());
    if res.ok {
        Ok(res.value)
    } else {
        Err(ScriptError::Evaluation(
            res.error_message
                .unwrap_or_else(|| "unknown script error".to_string()),
        ))
    }
}

/// Presence checks report `true`/`false`; anything else (including errors) counts as absent.
pub(crate) fn evaluate_flag(
    bridge: Option<&Arc<dyn WebViewBridge>>,
    screen_id: u64,
    script: &str,
) -> bool {
    match evaluate(bridge, screen_id, script) {
        Ok(Some(v)) => v.trim() == "true" || v.trim() == "1",
        Ok(None) => false,
        Err(e) => {
            tracing::debug!(%e, screen_id, "flag script failed");
            false
        }
    }
}
