use serde::{Deserialize, Serialize};

/// One contiguous turn of speech by one speaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Speaker ID (the host is 0 after normalization)
    pub speaker: u32,
    /// Whitespace-normalized text, never empty
    pub text: String,
}

impl Segment {
    pub fn new(speaker: u32, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
        }
    }

    /// Number of whitespace-delimited words
    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }
}

/// A segment attributed to a literal speaker name ("Roelof Botha: ...")
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSegment {
    pub speaker: String,
    pub text: String,
}

/// Count whitespace-delimited words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
