//! Aggregation of recognized fragments into one utterance

/// Ordered transcript fragments for one voice-input request
#[derive(Debug, Clone, Default)]
pub struct TranscriptAccumulator {
    fragments: Vec<String>,
    utterance: String,
}

impl TranscriptAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment in arrival order; blank fragments are ignored
    ///
    /// Returns whether the fragment was accepted.
    pub fn push(&mut self, fragment: &str) -> bool {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return false;
        }

        self.fragments.push(fragment.to_string());
        self.utterance = self.fragments.join(" ");
        true
    }

    #[must_use]
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    /// Space-joined fragments so far
    #[must_use]
    pub fn utterance(&self) -> &str {
        &self.utterance
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Final utterance with punctuation stripped
    #[must_use]
    pub fn finish(self) -> String {
        normalize_utterance(&self.utterance)
    }
}

/// Strip punctuation and collapse whitespace
///
/// Apostrophes and hyphens inside words survive ("didn't", "well-known");
/// every other punctuation mark becomes a word break.
#[must_use]
pub fn normalize_utterance(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || c == '\'' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| word.trim_matches(|c| c == '\'' || c == '-'))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
