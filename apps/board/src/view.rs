//! Terminal display surface: status lines on stderr, the rendered list on
//! stdout or in an HTML file.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use client_core::{BoardView, Notice, RenderedFragment, SubmitControl};
use tracing::{debug, error, info};

/// What the user typed, kept until a post succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub username: String,
    pub message: String,
}

pub struct TerminalView {
    output: Option<PathBuf>,
    draft: Mutex<Option<Draft>>,
    write_failure: Mutex<Option<io::Error>>,
}

impl TerminalView {
    pub fn new(output: Option<PathBuf>) -> Self {
        Self {
            output,
            draft: Mutex::new(None),
            write_failure: Mutex::new(None),
        }
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    /// The last failed page write, if any. Cleared by the call.
    pub fn take_write_failure(&self) -> Option<io::Error> {
        self.write_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    pub fn fill_form(&self, username: &str, message: &str) {
        *self.draft.lock().unwrap_or_else(PoisonError::into_inner) = Some(Draft {
            username: username.to_string(),
            message: message.to_string(),
        });
    }

    pub fn draft(&self) -> Option<Draft> {
        self.draft
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub fn page_html(fragment: &RenderedFragment) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html lang=\"ja\">\n",
            "<head><meta charset=\"utf-8\"><title>スプレッドシート掲示板</title></head>\n",
            "<body>\n",
            "<div id=\"message-list\">\n{}\n</div>\n",
            "</body>\n",
            "</html>\n",
        ),
        fragment.as_html()
    )
}

fn status_line(text: &str) {
    let _ = writeln!(io::stderr().lock(), "{text}");
}

impl BoardView for TerminalView {
    fn set_loading(&self, visible: bool) {
        if visible {
            status_line("読み込み中...");
        }
    }

    fn show_fragment(&self, fragment: &RenderedFragment) {
        match &self.output {
            Some(path) => match fs::write(path, page_html(fragment)) {
                Ok(()) => info!(path = %path.display(), "wrote message page"),
                Err(err) => {
                    error!(path = %path.display(), %err, "failed to write message page");
                    *self
                        .write_failure
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner) = Some(err);
                }
            },
            None => {
                let _ = writeln!(io::stdout().lock(), "{fragment}");
            }
        }
    }

    fn set_submit_control(&self, control: SubmitControl) {
        debug!(enabled = control.enabled, label = control.label, "submit control");
        if !control.enabled {
            status_line(control.label);
        }
    }

    fn reset_form(&self) {
        *self.draft.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn notify(&self, notice: &Notice) {
        status_line(&notice.to_string());
    }
}
