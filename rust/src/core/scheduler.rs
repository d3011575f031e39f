// Keyed, cancellable deferred work.

use std::collections::HashMap;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TaskKey {
    FocusSearch,
    SettleLocation { screen_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredTask {
    FocusSearchInput { screen_id: u64 },
    SettleLocationChange { screen_id: u64 },
}

impl DeferredTask {
    pub(crate) fn key(&self) -> TaskKey {
        match self {
            DeferredTask::FocusSearchInput { .. } => TaskKey::FocusSearch,
            DeferredTask::SettleLocationChange { screen_id } => TaskKey::SettleLocation {
                screen_id: *screen_id,
            },
        }
    }
}

/// One live token per key. Re-arming a key or cancelling it turns any in-flight firing stale.
#[derive(Debug, Default)]
pub(crate) struct DeferredTasks {
    next_token: u64,
    live: HashMap<TaskKey, u64>,
}

impl DeferredTasks {
    pub(crate) fn arm(&mut self, key: TaskKey) -> u64 {
        self.next_token += 1;
        self.live.insert(key, self.next_token);
        self.next_token
    }

    pub(crate) fn cancel(&mut self, key: TaskKey) -> bool {
        self.live.remove(&key).is_some()
    }

    pub(crate) fn cancel_screen(&mut self, screen_id: u64) {
        self.live.retain(|key, _| match key {
            TaskKey::SettleLocation { screen_id: id } => *id != screen_id,
            TaskKey::FocusSearch => true,
        });
    }

    /// Consumes the live token for `task` if `token` is still current.
    pub(crate) fn take_if_current(&mut self, task: &DeferredTask, token: u64) -> bool {
        let key = task.key();
        if self.live.get(&key) == Some(&token) {
            self.live.remove(&key);
            true
        } else {
            false
        }
    }
}

impl AppCore {
    pub(super) fn schedule(&mut self, task: DeferredTask) {
        let token = self.deferred.arm(task.key());
        let delay = self.config.deferral();
        let tx = self.core_sender.clone();
        tracing::debug!(?task, token, "deferred task scheduled");
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(CoreMsg::Internal(Box::new(
                InternalEvent::DeferredTaskFired { token, task },
            )));
        });
    }

    pub(super) fn handle_deferred(&mut self, token: u64, task: DeferredTask) {
        if !self.deferred.take_if_current(&task, token) {
            tracing::debug!(?task, token, "stale deferred task ignored");
            return;
        }
        match task {
            DeferredTask::FocusSearchInput { screen_id } => self.focus_search_input(screen_id),
            DeferredTask::SettleLocationChange { screen_id } => {
                if let Some(screen) = self.state.screen_mut(screen_id) {
                    screen.finish_loading();
                }
                self.refresh_screen(screen_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rearming_a_key_invalidates_the_older_token() {
        let mut tasks = DeferredTasks::default();
        let task = DeferredTask::SettleLocationChange { screen_id: 0 };
        let first = tasks.arm(task.key());
        let second = tasks.arm(task.key());
        assert!(!tasks.take_if_current(&task, first));
        assert!(tasks.take_if_current(&task, second));
        // Consumed: a duplicate firing is a no-op.
        assert!(!tasks.take_if_current(&task, second));
    }

    #[test]
    fn cancel_makes_firing_stale() {
        let mut tasks = DeferredTasks::default();
        let task = DeferredTask::FocusSearchInput { screen_id: 0 };
        let token = tasks.arm(task.key());
        assert!(tasks.cancel(TaskKey::FocusSearch));
        assert!(!tasks.cancel(TaskKey::FocusSearch));
        assert!(!tasks.take_if_current(&task, token));
    }

    #[test]
    fn settle_keys_are_per_screen() {
        let mut tasks = DeferredTasks::default();
        let a = DeferredTask::SettleLocationChange { screen_id: 1 };
        let b = DeferredTask::SettleLocationChange { screen_id: 2 };
        let ta = tasks.arm(a.key());
        let tb = tasks.arm(b.key());
        tasks.cancel_screen(1);
        assert!(!tasks.take_if_current(&a, ta));
        assert!(tasks.take_if_current(&b, tb));
    }

    #[test]
    fn focus_key_ignores_screen_id() {
        let focus_main = DeferredTask::FocusSearchInput { screen_id: 0 };
        let focus_window = DeferredTask::FocusSearchInput { screen_id: 4 };
        assert_eq!(focus_main.key(), focus_window.key());
    }
}
