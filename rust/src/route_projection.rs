use crate::{AppState, Modal, Router, Screen};

#[derive(uniffi::Record, Clone, Debug, PartialEq)]
pub struct MobileRouteState {
    pub root_screen: Screen,
    pub stack: Vec<Screen>,
    pub active_screen: Screen,
    pub can_pop: bool,
    pub modal: Option<Modal>,
}

/// Maps core router semantics to the navigation model shared by iOS and Android.
pub fn project_mobile(state: &AppState) -> MobileRouteState {
    let stack = state.router.screen_stack.clone();
    let active_screen = active_screen(&state.router);
    MobileRouteState {
        root_screen: state.router.default_screen.clone(),
        can_pop: !stack.is_empty(),
        stack,
        active_screen,
        modal: state.router.modal.clone(),
    }
}

fn active_screen(router: &Router) -> Screen {
    router
        .screen_stack
        .last()
        .cloned()
        .unwrap_or_else(|| router.default_screen.clone())
}
