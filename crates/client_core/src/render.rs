//! Pure HTML rendering of the message list.
//!
//! Nothing here touches the network or the view; the controller hands the
//! resulting [`RenderedFragment`] to whatever display adapter is active.

use std::{cmp::Reverse, fmt};

use chrono::{FixedOffset, Offset, Utc};
use shared::domain::Message;

pub const EMPTY_PLACEHOLDER: &str = r#"<div class="no-messages">まだ投稿がありません</div>"#;
pub const ERROR_PREFIX: &str = "エラーが発生しました: ";
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M";
/// Japan Standard Time, the board's home locale.
pub const DEFAULT_DISPLAY_OFFSET_SECS: i32 = 9 * 3600;

/// Markup ready to be placed into the list area. Always built from escaped
/// user content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedFragment(String);

impl RenderedFragment {
    pub fn as_html(&self) -> &str {
        &self.0
    }

    pub fn into_html(self) -> String {
        self.0
    }
}

impl fmt::Display for RenderedFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderer {
    display_offset: FixedOffset,
}

impl Default for Renderer {
    fn default() -> Self {
        Self {
            display_offset: FixedOffset::east_opt(DEFAULT_DISPLAY_OFFSET_SECS)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl Renderer {
    pub fn new(display_offset: FixedOffset) -> Self {
        Self { display_offset }
    }

    /// `None` when the offset is outside ±24h.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::new)
    }

    pub fn render_messages(&self, messages: &[Message]) -> RenderedFragment {
        if messages.is_empty() {
            return RenderedFragment(EMPTY_PLACEHOLDER.to_string());
        }

        let html = newest_first(messages)
            .into_iter()
            .map(|message| self.render_item(message))
            .collect::<Vec<_>>()
            .join("\n");
        RenderedFragment(html)
    }

    /// Inline panel shown in place of the list when loading fails.
    pub fn render_error(&self, description: &str) -> RenderedFragment {
        RenderedFragment(format!(
            r#"<div class="error">{ERROR_PREFIX}{}</div>"#,
            escape_html(description)
        ))
    }

    /// `YYYY/MM/DD HH:MM` in the display offset. Unparseable values are shown
    /// as received.
    pub fn format_timestamp(&self, message: &Message) -> String {
        match message.posted_at() {
            Some(posted_at) => posted_at
                .with_timezone(&self.display_offset)
                .format(TIMESTAMP_FORMAT)
                .to_string(),
            None => message.timestamp.clone(),
        }
    }

    fn render_item(&self, message: &Message) -> String {
        format!(
            concat!(
                r#"<div class="message-item" data-id="{id}">"#,
                r#"<div class="message-header">"#,
                r#"<span class="username">{username}</span>"#,
                r#"<span class="timestamp">{timestamp}</span>"#,
                r#"</div>"#,
                r#"<div class="message-content">{body}</div>"#,
                r#"</div>"#,
            ),
            id = escape_html(&message.id.to_string()),
            username = escape_html(&message.username),
            timestamp = escape_html(&self.format_timestamp(message)),
            body = escape_html(&message.message),
        )
    }
}

/// Most recent first. The sort is stable, so equal timestamps keep their
/// input order; unparseable timestamps go last.
pub fn newest_first(messages: &[Message]) -> Vec<&Message> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by_cached_key(|message| Reverse(message.posted_at()));
    sorted
}

/// Escapes text for use in element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
