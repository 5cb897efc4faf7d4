//! The post type shared by every data source.
//!
//! `Item` is a single post fetched from a monitored channel.  Every source
//! implementation converts its native listing format into `Item`s so the
//! rest of the pipeline (matching, formatting, de-duplication) stays
//! source-agnostic.
//!
//! ## For contributors
//!
//! If you are adding a new data source you do **not** need to modify this
//! file unless your source exposes extra fields.  Just construct `Item`
//! values in your source's `fetch()` implementation.

/// Display string used when a post has no (or a deleted) author.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// A single post, normalised from any data source.
///
/// Items are immutable once fetched; the matcher and formatter only ever
/// borrow them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Item {
    /// Stable identifier used for de-duplication across polls.
    pub id: String,

    /// Name of the channel (subreddit, board, ...) the item came from.
    pub channel: String,

    /// Author handle.  `None` when the source reports no author.
    pub author: Option<String>,

    /// Post headline.
    pub title: String,

    /// Post body.  Link posts and title-only posts have an empty body.
    pub body: String,

    /// Absolute URL of the post.
    pub permalink: String,
}

impl Item {
    /// Title and body joined by a single space: the text keywords are
    /// matched against.
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.body)
    }

    /// The author handle, or [`DELETED_AUTHOR`] when there is none.
    pub fn display_author(&self) -> &str {
        match self.author.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => DELETED_AUTHOR,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
