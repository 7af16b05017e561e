pub mod header_tagged;
pub mod normalize;
pub mod paragraphs;
pub mod speaker_name;

pub use header_tagged::*;
pub use normalize::*;
pub use paragraphs::*;
pub use speaker_name::*;

use crate::error::SegmentationError;

/// Host phrase used by the Huberman Lab transcripts
pub const DEFAULT_HOST_PHRASE: &str = "Welcome to the Huberman Lab podcast";

/// How the files of one corpus are segmented, and whose speech is kept
#[derive(Debug, Clone)]
pub enum CorpusFormat {
    /// "<id> (<timestamp>):" headers with integer speaker IDs
    HeaderTagged {
        /// Phrase identifying the host; `None` skips normalization
        host_phrase: Option<String>,
        missing_host: MissingHostPolicy,
        /// Speaker whose segments are kept (after normalization)
        target_speaker: u32,
    },
    /// "Name: text" lines; only the named host is kept
    SpeakerName { host_name: String },
    /// Plain text from a single author, split on blank lines
    Paragraphs,
}

impl Default for CorpusFormat {
    fn default() -> Self {
        CorpusFormat::HeaderTagged {
            host_phrase: Some(DEFAULT_HOST_PHRASE.to_string()),
            missing_host: MissingHostPolicy::KeepUnchanged,
            target_speaker: 0,
        }
    }
}

impl CorpusFormat {
    /// Extract the target speaker's texts from one file's contents
    pub fn extract_texts(&self, text: &str) -> Result<Vec<String>, SegmentationError> {
        match self {
            CorpusFormat::HeaderTagged {
                host_phrase,
                missing_host,
                target_speaker,
            } => {
                let mut segments = parse_header_tagged(text);
                if let Some(phrase) = host_phrase {
                    segments = normalize_speakers(segments, phrase, *missing_host)?;
                }
                Ok(segments
                    .into_iter()
                    .filter(|s| s.speaker == *target_speaker)
                    .map(|s| s.text)
                    .collect())
            }
            CorpusFormat::SpeakerName { host_name } => Ok(host_paragraphs(text, host_name)),
            CorpusFormat::Paragraphs => Ok(split_paragraphs(text)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CorpusFormat::HeaderTagged { .. } => "header-tagged",
            CorpusFormat::SpeakerName { .. } => "speaker-name",
            CorpusFormat::Paragraphs => "paragraphs",
        }
    }
}

/// Lines split on `\r\n`, `\n` or a bare `\r`
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split("\r\n").flat_map(|chunk| chunk.split(['\n', '\r']))
}

/// Trim each line, drop blank ones, join with single spaces
fn join_lines<S: AsRef<str>>(lines: &[S]) -> String {
    lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPISODE: &str = "\
1 (0m0s):
Welcome to the Huberman Lab podcast, where we discuss science.

0 (0m30s):
Thanks, Andrew.

Athletic Greens (1m0s):
Sponsor read.

1 (2m0s):
Let's begin.
";

    #[test]
    fn test_split_lines_handles_every_line_ending() {
        let lines: Vec<&str> = split_lines("a\r\nb\nc\rd").collect();
        assert_eq!(lines, vec!["a", "b", "c", "d"]);

        let texts = CorpusFormat::default()
            .extract_texts(&EPISODE.replace('\n', "\r"))
            .unwrap();
        assert_eq!(texts.len(), 2);
        assert_eq!(texts[1], "Let's begin.");
    }

    #[test]
    fn test_header_tagged_keeps_normalized_host() {
        let texts = CorpusFormat::default().extract_texts(EPISODE).unwrap();

        assert_eq!(
            texts,
            vec![
                "Welcome to the Huberman Lab podcast, where we discuss science.".to_string(),
                "Let's begin.".to_string(),
            ]
        );
    }

    #[test]
    fn test_header_tagged_guest_and_strict_host() {
        let guest = CorpusFormat::HeaderTagged {
            host_phrase: Some(DEFAULT_HOST_PHRASE.to_string()),
            missing_host: MissingHostPolicy::Fail,
            target_speaker: 1,
        };
        assert_eq!(
            guest.extract_texts(EPISODE).unwrap(),
            vec!["Thanks, Andrew.".to_string()]
        );

        let strict = CorpusFormat::HeaderTagged {
            host_phrase: Some("This phrase never appears".to_string()),
            missing_host: MissingHostPolicy::Fail,
            target_speaker: 0,
        };
        assert!(strict.extract_texts(EPISODE).is_err());
    }

    #[test]
    fn test_header_tagged_without_normalization() {
        let raw = CorpusFormat::HeaderTagged {
            host_phrase: None,
            missing_host: MissingHostPolicy::Fail,
            target_speaker: 0,
        };

        assert_eq!(
            raw.extract_texts(EPISODE).unwrap(),
            vec!["Thanks, Andrew.".to_string()]
        );
    }

    #[test]
    fn test_join_lines() {
        assert_eq!(join_lines(&["  a ", "", "b", "   "]), "a b");
        assert_eq!(join_lines::<&str>(&[]), "");
    }
}
