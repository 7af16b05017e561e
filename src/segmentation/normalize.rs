use std::collections::HashMap;

use tracing::debug;

use crate::error::SegmentationError;
use crate::models::Segment;

/// What to do when no segment contains the host phrase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingHostPolicy {
    /// Return the segments with their original speaker IDs
    #[default]
    KeepUnchanged,
    /// Treat the transcript as unparsable
    Fail,
}

/// Remap speaker IDs so that the host is 0.
///
/// The host is the speaker of the first segment whose text contains
/// `host_phrase` (case-insensitive). Other speakers become 1, 2, ... in
/// first-seen order. Transcripts where the host is already 0 are returned
/// as-is.
pub fn normalize_speakers(
    segments: Vec<Segment>,
    host_phrase: &str,
    policy: MissingHostPolicy,
) -> Result<Vec<Segment>, SegmentationError> {
    if segments.is_empty() {
        return Ok(segments);
    }

    let phrase = host_phrase.to_lowercase();
    let host = segments
        .iter()
        .find(|s| s.text.to_lowercase().contains(&phrase))
        .map(|s| s.speaker);

    let host = match (host, policy) {
        (Some(host), _) => host,
        (None, MissingHostPolicy::KeepUnchanged) => {
            debug!(phrase = host_phrase, "Host phrase not found, keeping speaker IDs");
            return Ok(segments);
        }
        (None, MissingHostPolicy::Fail) => {
            return Err(SegmentationError::HostPhraseNotFound {
                phrase: host_phrase.to_string(),
            });
        }
    };

    if host == 0 {
        return Ok(segments);
    }

    let mut mapping: HashMap<u32, u32> = HashMap::from([(host, 0)]);
    let mut next_id = 1;
    for segment in &segments {
        if !mapping.contains_key(&segment.speaker) {
            mapping.insert(segment.speaker, next_id);
            next_id += 1;
        }
    }

    debug!(host, speakers = mapping.len(), "Remapped speaker IDs");

    Ok(segments
        .into_iter()
        .map(|s| Segment {
            speaker: mapping[&s.speaker],
            text: s.text,
        })
        .collect())
}
