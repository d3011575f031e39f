mod actions;
mod core;
mod deep_link;
mod lists;
mod logging;
mod preferences;
mod route_projection;
mod state;
mod toc;
mod updates;
mod web_bridge;
pub mod wiki;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use flume::{Receiver, Sender};
use url::Url;

pub use actions::*;
pub use deep_link::*;
pub use lists::*;
pub use preferences::*;
pub use route_projection::*;
pub use state::*;
pub use toc::*;
pub use updates::*;
pub use web_bridge::*;
pub use wiki::{NavigationKind, NavigationPolicy};

uniffi::setup_scaffolding!();

#[uniffi::export(callback_interface)]
pub trait AppReconciler: Send + Sync + 'static {
    fn reconcile(&self, update: AppUpdate);
}

#[derive(uniffi::Object)]
pub struct FfiApp {
    core_tx: Sender<CoreMsg>,
    update_rx: Receiver<AppUpdate>,
    listening: AtomicBool,
    shared_state: Arc<RwLock<AppState>>,
    web_view_bridge: SharedWebViewBridge,
    system_bridge: SharedSystemBridge,
    cloud_store: SharedCloudStore,
}

#[uniffi::export]
impl FfiApp {
    #[uniffi::constructor]
    pub fn new(data_dir: String) -> Arc<Self> {
        logging::init_logging(&data_dir);
        tracing::info!(data_dir = %data_dir, "FfiApp::new() starting");

        let (update_tx, update_rx) = flume::unbounded();
        let (core_tx, core_rx) = flume::unbounded::<CoreMsg>();
        let shared_state = Arc::new(RwLock::new(AppState::empty()));
        let web_view_bridge: SharedWebViewBridge = Arc::new(RwLock::new(None));
        let system_bridge: SharedSystemBridge = Arc::new(RwLock::new(None));
        // Until the platform attaches its cloud store, bookmarks in cloud mode live in a
        // JSON file next to the local lists.
        let fallback_cloud: Arc<dyn CloudKeyValueStore> =
            Arc::new(JsonFileKeyValueStore::in_data_dir(&data_dir));
        let cloud_store: SharedCloudStore = Arc::new(RwLock::new(fallback_cloud));

        // Actor loop thread (single threaded "app actor").
        let core_tx_for_core = core_tx.clone();
        let shared_for_core = shared_state.clone();
        let web_view_for_core = web_view_bridge.clone();
        let system_for_core = system_bridge.clone();
        let cloud_for_core = cloud_store.clone();
        thread::spawn(move || {
            let mut core = crate::core::AppCore::new(
                update_tx,
                core_tx_for_core,
                data_dir,
                shared_for_core,
                web_view_for_core,
                system_for_core,
                cloud_for_core,
            );
            while let Ok(msg) = core_rx.recv() {
                core.handle_message(msg);
            }
        });

        Arc::new(Self {
            core_tx,
            update_rx,
            listening: AtomicBool::new(false),
            shared_state,
            web_view_bridge,
            system_bridge,
            cloud_store,
        })
    }

    pub fn state(&self) -> AppState {
        match self.shared_state.read() {
            Ok(g) => g.clone(),
            Err(poison) => poison.into_inner().clone(),
        }
    }

    /// Navigation stack and modal for the current snapshot, as the shell renders them.
    pub fn mobile_route(&self) -> MobileRouteState {
        project_mobile(&self.state())
    }

    pub fn dispatch(&self, action: AppAction) {
        // Contract: never block caller.
        let _ = self.core_tx.send(CoreMsg::Action(action));
    }

    pub fn listen_for_updates(&self, reconciler: Box<dyn AppReconciler>) {
        if self
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Avoid multiple listeners that would split messages.
            return;
        }

        let rx = self.update_rx.clone();
        thread::spawn(move || {
            while let Ok(update) = rx.recv() {
                reconciler.reconcile(update);
            }
        });
    }

    pub fn set_web_view_bridge(&self, bridge: Box<dyn WebViewBridge>) {
        let bridge: Arc<dyn WebViewBridge> = Arc::from(bridge);
        web_bridge::install(&self.web_view_bridge, bridge);
    }

    pub fn set_system_bridge(&self, bridge: Box<dyn SystemBridge>) {
        let bridge: Arc<dyn SystemBridge> = Arc::from(bridge);
        web_bridge::install(&self.system_bridge, bridge);
    }

    pub fn set_cloud_store(&self, store: Box<dyn CloudKeyValueStore>) {
        let store: Arc<dyn CloudKeyValueStore> = Arc::from(store);
        match self.cloud_store.write() {
            Ok(mut slot) => *slot = store,
            Err(poison) => *poison.into_inner() = store,
        }
        self.dispatch(AppAction::CloudStoreChangedExternally);
    }

    /// Synchronous outbound-navigation decision for the renderer's policy callback.
    /// Cancelled navigations are re-routed to the external viewer or the OS.
    pub fn decide_navigation_policy(
        &self,
        screen_id: u64,
        url: String,
        kind: NavigationKind,
    ) -> NavigationPolicy {
        let parsed = match Url::parse(&url) {
            Ok(u) => u,
            Err(_) => return NavigationPolicy::Allow,
        };
        let (policy, target) = wiki::link_policy(&parsed, kind);
        if target.is_some() {
            tracing::debug!(screen_id, scheme = parsed.scheme(), "navigation re-routed");
            self.dispatch(AppAction::OpenUrl { url });
        }
        policy
    }

    /// Document-end script for every frame, reflecting the current settings.
    pub fn user_script(&self) -> String {
        wiki::user_script(self.state().settings.open_video_in_app)
    }

    pub fn content_rule_list_identifier(&self) -> String {
        wiki::CONTENT_RULE_LIST_ID.to_string()
    }
}
