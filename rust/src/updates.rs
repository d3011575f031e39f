use crate::core::DeferredTask;
use crate::state::AppState;
use crate::AppAction;

#[derive(uniffi::Enum, Clone, Debug, PartialEq, Eq)]
pub enum ExportKind {
    Bookmarks,
    History,
}

#[derive(uniffi::Enum, Clone, Debug)]
pub enum AppUpdate {
    FullState(AppState),
    /// A list export was written; the shell presents its share sheet for `path`.
    ExportReady {
        rev: u64,
        kind: ExportKind,
        path: String,
    },
}

impl AppUpdate {
    pub fn rev(&self) -> u64 {
        match self {
            AppUpdate::FullState(s) => s.rev,
            AppUpdate::ExportReady { rev, .. } => *rev,
        }
    }
}

#[derive(Debug)]
pub enum CoreMsg {
    Action(AppAction),
    Internal(Box<InternalEvent>),
}

#[derive(Debug)]
pub enum InternalEvent {
    // Deferred work scheduled on the actor runtime. Stale tokens are ignored.
    DeferredTaskFired { token: u64, task: DeferredTask },
}
