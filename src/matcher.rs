//! Case-insensitive keyword matching.

/// Matches text against a fixed, ordered list of phrases.
///
/// Phrases are lower-cased once at construction; each call only has to
/// lower-case the text.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    keywords: Vec<(String, String)>,
}

impl KeywordMatcher {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords = keywords
            .into_iter()
            .map(Into::<String>::into)
            .filter(|k| !k.trim().is_empty())
            .map(|k| {
                let normalized = k.to_lowercase();
                (k, normalized)
            })
            .collect();
        Self { keywords }
    }

    /// Every keyword contained in `text`, in keyword-list order, as
    /// configured (not lower-cased).  Empty when nothing matches.
    pub fn matches(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let text = text.to_lowercase();
        self.keywords
            .iter()
            .filter(|(_, normalized)| text.contains(normalized.as_str()))
            .map(|(original, _)| original.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
