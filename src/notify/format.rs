//! Fixed Slack Block Kit template for match notifications.

use serde::Serialize;

use crate::source::Item;

/// Body previews longer than this many characters are cut and suffixed
/// with [`ELLIPSIS`].
pub const PREVIEW_LEN: usize = 200;

const ELLIPSIS: &str = "...";

/// Fallback text shown by clients that cannot render blocks.
const FALLBACK_TEXT: &str = "🎯 Accountability Opportunity Detected!";
const HEADER_TEXT: &str = "New Accountability Request";
const BUTTON_TEXT: &str = "View on Reddit";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub text: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header {
        text: Text,
    },
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Text>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<Text>,
    },
    Actions {
        elements: Vec<Element>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    PlainText { text: String },
    Mrkdwn { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button { text: Text, url: String },
}

fn plain(text: impl Into<String>) -> Text {
    Text::PlainText { text: text.into() }
}

fn mrkdwn(text: impl Into<String>) -> Text {
    Text::Mrkdwn { text: text.into() }
}

fn section(text: String) -> Block {
    Block::Section {
        text: Some(mrkdwn(text)),
        fields: Vec::new(),
    }
}

/// `body` cut to [`PREVIEW_LEN`] characters, with an ellipsis only when
/// something was actually cut.
pub fn preview(body: &str) -> String {
    match body.char_indices().nth(PREVIEW_LEN) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &body[..cut]),
        None => body.to_string(),
    }
}

/// Build the notification for `item`, which matched `keywords` in
/// `channel`.  Pure: the same input always yields the same payload.
pub fn format_notification(item: &Item, keywords: &[String], channel: &str) -> NotificationPayload {
    let blocks = vec![
        Block::Header {
            text: plain(HEADER_TEXT),
        },
        Block::Section {
            text: None,
            fields: vec![
                mrkdwn(format!("*Subreddit:*\nr/{channel}")),
                mrkdwn(format!("*Author:*\nu/{}", item.display_author())),
            ],
        },
        section(format!("*Title:*\n{}", item.title)),
        section(format!("*Content Preview:*\n{}", preview(&item.body))),
        section(format!("*Matched Keywords:* {}", keywords.join(", "))),
        Block::Actions {
            elements: vec![Element::Button {
                text: plain(BUTTON_TEXT),
                url: item.permalink.clone(),
            }],
        },
    ];

    NotificationPayload {
        text: FALLBACK_TEXT.to_string(),
        blocks,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::make_item;
    use serde_json::json;

    #[test]
    fn short_body_passes_through_unchanged() {
        assert_eq!(preview(""), "");
        assert_eq!(preview("short body"), "short body");

        let exact = "x".repeat(PREVIEW_LEN);
        assert_eq!(preview(&exact), exact);
    }

    #[test]
    fn long_body_is_cut_with_ellipsis() {
        let body = "y".repeat(PREVIEW_LEN + 1);
        let cut = preview(&body);
        assert_eq!(cut, format!("{}...", "y".repeat(PREVIEW_LEN)));
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let body = "é".repeat(PREVIEW_LEN + 5);
        let cut = preview(&body);
        assert_eq!(cut.chars().count(), PREVIEW_LEN + ELLIPSIS.len());
        assert!(cut.starts_with(&"é".repeat(PREVIEW_LEN)));
    }

    #[test]
    fn payload_serializes_to_block_kit() {
        let item = make_item("abc123", "productivity", "need accountability for finals", "");
        let keywords = vec!["need accountability".to_string(), "finals".to_string()];
        let payload = format_notification(&item, &keywords, "productivity");

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["text"], FALLBACK_TEXT);
        assert_eq!(
            value["blocks"][0],
            json!({"type": "header", "text": {"type": "plain_text", "text": HEADER_TEXT}})
        );
        assert_eq!(
            value["blocks"][1]["fields"],
            json!([
                {"type": "mrkdwn", "text": "*Subreddit:*\nr/productivity"},
                {"type": "mrkdwn", "text": "*Author:*\nu/stu1"},
            ])
        );
        assert!(value["blocks"][1].get("text").is_none());
        assert_eq!(value["blocks"][2]["text"]["text"], "*Title:*\nneed accountability for finals");
        assert_eq!(value["blocks"][3]["text"]["text"], "*Content Preview:*\n");
        assert_eq!(
            value["blocks"][4]["text"]["text"],
            "*Matched Keywords:* need accountability, finals"
        );
        assert_eq!(
            value["blocks"][5],
            json!({
                "type": "actions",
                "elements": [{
                    "type": "button",
                    "text": {"type": "plain_text", "text": BUTTON_TEXT},
                    "url": "https://reddit.com/r/productivity/comments/abc123/",
                }]
            })
        );
    }

    #[test]
    fn missing_author_renders_placeholder() {
        let mut item = make_item("a", "focus", "t", "b");
        item.author = None;
        let payload = format_notification(&item, &["focus".to_string()], "focus");

        let Block::Section { fields, .. } = &payload.blocks[1] else {
            panic!("expected a fields section");
        };
        assert_eq!(fields[1], mrkdwn("*Author:*\nu/[deleted]"));
    }

    #[test]
    fn formatting_is_deterministic() {
        let item = make_item("a", "focus", "study with me", &"z".repeat(300));
        let keywords = vec!["study with me".to_string()];
        assert_eq!(
            format_notification(&item, &keywords, "focus"),
            format_notification(&item, &keywords, "focus")
        );
    }
}
