use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::NamedSegment;

use super::{join_lines, split_lines};

/// "Name: rest of line" where Name is one to three capitalized words
static SPEAKER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z][A-Za-z'.-]+(?: [A-Z][A-Za-z'.-]+){0,2}):\s(.*)")
        .expect("speaker line pattern is valid")
});

/// Parse a speaker-name transcript into segments attributed to literal names.
///
/// Blank lines flush the current paragraph but keep the current speaker, so a
/// speaker's multi-paragraph answer yields one segment per paragraph. Text
/// before the first speaker line belongs to nobody and is dropped.
pub fn parse_speaker_named(text: &str) -> Vec<NamedSegment> {
    let mut segments = Vec::new();
    let mut speaker: Option<String> = None;
    let mut buffer: Vec<String> = Vec::new();

    for raw_line in split_lines(text) {
        let line = raw_line.trim_end();
        if line.trim().is_empty() {
            flush(&mut buffer, speaker.as_deref(), &mut segments);
            continue;
        }

        match SPEAKER_LINE.captures(line.trim_start()) {
            Some(caps) => {
                flush(&mut buffer, speaker.as_deref(), &mut segments);
                speaker = Some(caps[1].to_string());
                let rest = caps[2].trim();
                if !rest.is_empty() {
                    buffer.push(rest.to_string());
                }
            }
            None => buffer.push(line.to_string()),
        }
    }

    flush(&mut buffer, speaker.as_deref(), &mut segments);
    segments
}

fn flush(buffer: &mut Vec<String>, speaker: Option<&str>, segments: &mut Vec<NamedSegment>) {
    if buffer.is_empty() {
        return;
    }
    let text = join_lines(buffer.as_slice());
    if let (Some(speaker), false) = (speaker, text.is_empty()) {
        segments.push(NamedSegment {
            speaker: speaker.to_string(),
            text,
        });
    }
    buffer.clear();
}

/// Paragraphs spoken by `host_name` (exact match), in order
pub fn host_paragraphs(text: &str, host_name: &str) -> Vec<String> {
    parse_speaker_named(text)
        .into_iter()
        .filter(|s| s.speaker == host_name)
        .map(|s| s.text)
        .collect()
}
