//! Board view controller: fetch/submit lifecycles and their UI feedback.
//!
//! Methods take `&self` so a list refresh and a submission can be in flight
//! on the same task at once. Lifecycle bookkeeping sits behind a mutex that is
//! only held between awaits, and every in-flight flag is released by a drop
//! guard so cleanup runs on success, failure and cancellation alike.

use std::{
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
};

use shared::{domain::Submission, error::ValidationError};
use tracing::{debug, error, info};

use crate::{
    error::{FetchError, SubmitError},
    render::{RenderedFragment, Renderer},
    store::MessageStore,
};

pub const SUBMIT_LABEL_IDLE: &str = "投稿する";
pub const SUBMIT_LABEL_BUSY: &str = "送信中...";
pub const MISSING_INPUT_PROMPT: &str = "ユーザー名とメッセージを入力してください";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiState {
    pub is_loading: bool,
    pub is_submitting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitControl {
    pub enabled: bool,
    pub label: &'static str,
}

impl SubmitControl {
    pub const IDLE: Self = Self {
        enabled: true,
        label: SUBMIT_LABEL_IDLE,
    };
    pub const BUSY: Self = Self {
        enabled: false,
        label: SUBMIT_LABEL_BUSY,
    };
}

/// Blocking, user-facing notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    MissingInput,
    SubmitFailed(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput => f.write_str(MISSING_INPUT_PROMPT),
            Self::SubmitFailed(reason) => write!(f, "エラーが発生しました: {reason}"),
        }
    }
}

/// Display surface the controller drives. Implementations must not block on
/// the controller itself.
pub trait BoardView: Send + Sync {
    fn set_loading(&self, visible: bool);
    /// Replaces the whole list area.
    fn show_fragment(&self, fragment: &RenderedFragment);
    fn set_submit_control(&self, control: SubmitControl);
    fn reset_form(&self);
    fn notify(&self, notice: &Notice);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListOutcome {
    Rendered { count: usize },
    Failed(FetchError),
    /// A newer refresh was issued while this one was in flight; its result
    /// was discarded.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Posted { refresh: ListOutcome },
    Invalid(ValidationError),
    Busy,
    Failed(SubmitError),
}

#[derive(Debug, Default)]
struct Lifecycle {
    ui: UiState,
    latest_list: u64,
    lists_in_flight: usize,
}

fn lock(lifecycle: &Mutex<Lifecycle>) -> MutexGuard<'_, Lifecycle> {
    lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
}

struct LoadingGuard<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
    view: &'a dyn BoardView,
    generation: u64,
}

impl<'a> LoadingGuard<'a> {
    fn begin(lifecycle: &'a Mutex<Lifecycle>, view: &'a dyn BoardView) -> Self {
        let generation = {
            let mut state = lock(lifecycle);
            state.latest_list += 1;
            state.lists_in_flight += 1;
            state.ui.is_loading = true;
            state.latest_list
        };
        view.set_loading(true);
        Self {
            lifecycle,
            view,
            generation,
        }
    }

    fn is_latest(&self) -> bool {
        lock(self.lifecycle).latest_list == self.generation
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let idle = {
            let mut state = lock(self.lifecycle);
            state.lists_in_flight = state.lists_in_flight.saturating_sub(1);
            state.ui.is_loading = state.lists_in_flight > 0;
            !state.ui.is_loading
        };
        if idle {
            self.view.set_loading(false);
        }
    }
}

struct SubmitGuard<'a> {
    lifecycle: &'a Mutex<Lifecycle>,
    view: &'a dyn BoardView,
}

impl<'a> SubmitGuard<'a> {
    /// `None` while another submission holds the control.
    fn acquire(lifecycle: &'a Mutex<Lifecycle>, view: &'a dyn BoardView) -> Option<Self> {
        {
            let mut state = lock(lifecycle);
            if state.ui.is_submitting {
                return None;
            }
            state.ui.is_submitting = true;
        }
        view.set_submit_control(SubmitControl::BUSY);
        Some(Self { lifecycle, view })
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        lock(self.lifecycle).ui.is_submitting = false;
        self.view.set_submit_control(SubmitControl::IDLE);
    }
}

pub struct BoardController<S, V> {
    store: S,
    view: V,
    renderer: Renderer,
    lifecycle: Mutex<Lifecycle>,
}

impl<S: MessageStore, V: BoardView> BoardController<S, V> {
    pub fn new(store: S, view: V) -> Self {
        Self::with_renderer(store, view, Renderer::default())
    }

    pub fn with_renderer(store: S, view: V, renderer: Renderer) -> Self {
        Self {
            store,
            view,
            renderer,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    pub fn ui_state(&self) -> UiState {
        lock(&self.lifecycle).ui
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    /// Fetches the list and replaces the list area with it, or with an inline
    /// error panel. Only the most recently issued refresh is rendered.
    pub async fn activate(&self) -> ListOutcome {
        let loading = LoadingGuard::begin(&self.lifecycle, &self.view);
        let result = self.store.list_messages().await;

        if !loading.is_latest() {
            debug!(
                generation = loading.generation,
                ok = result.is_ok(),
                "discarding superseded message list"
            );
            return ListOutcome::Superseded;
        }

        match result {
            Ok(messages) => {
                let fragment = self.renderer.render_messages(&messages);
                self.view.show_fragment(&fragment);
                info!(count = messages.len(), "message list rendered");
                ListOutcome::Rendered {
                    count: messages.len(),
                }
            }
            Err(err) => {
                error!(error = %err, transport = err.is_transport(), "failed to load messages");
                self.view
                    .show_fragment(&self.renderer.render_error(err.message()));
                ListOutcome::Failed(err)
            }
        }
    }

    /// Validates and posts a message, then refreshes the list on success.
    /// The form keeps its contents when posting fails.
    pub async fn handle_submit(&self, raw_username: &str, raw_message: &str) -> SubmitOutcome {
        let submission = match Submission::new(raw_username, raw_message) {
            Ok(submission) => submission,
            Err(reason) => {
                self.view.notify(&Notice::MissingInput);
                return SubmitOutcome::Invalid(reason);
            }
        };

        let Some(submitting) = SubmitGuard::acquire(&self.lifecycle, &self.view) else {
            debug!("submission ignored while another is in flight");
            return SubmitOutcome::Busy;
        };

        let result = self
            .store
            .submit_message(submission.username(), submission.message())
            .await;

        match result {
            Ok(()) => {
                info!(username = submission.username(), "message posted");
                self.view.reset_form();
                drop(submitting);
                let refresh = self.activate().await;
                SubmitOutcome::Posted { refresh }
            }
            Err(err) => {
                error!(error = %err, transport = err.is_transport(), "failed to post message");
                self.view
                    .notify(&Notice::SubmitFailed(err.message().to_string()));
                SubmitOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
