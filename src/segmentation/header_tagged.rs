use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::Segment;

use super::{join_lines, split_lines};

/// "<label> (<timestamp>):", e.g. "0 (12m 3s):" or "Joovv (1h 26m 28s):"
static HEADER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<label>.+?)\s*\((?P<timestamp>[^)]*?)\):\s*$")
        .expect("header line pattern is valid")
});

/// Block currently being read
enum OpenBlock {
    /// Before the first header
    None,
    /// Integer-labelled speaker block
    Speaker { speaker: u32, lines: Vec<String> },
    /// Non-integer label (sponsor read): lines are discarded
    Discarded,
}

impl OpenBlock {
    fn close_into(self, segments: &mut Vec<Segment>) {
        if let OpenBlock::Speaker { speaker, lines } = self {
            let text = join_lines(&lines);
            if !text.is_empty() {
                segments.push(Segment::new(speaker, text));
            }
        }
    }
}

/// Parse a header-tagged transcript into segments.
///
/// A header whose label is not a non-negative integer opens a discarded block,
/// which is how embedded advertisements are dropped. Blocks whose text is empty
/// produce no segment.
pub fn parse_header_tagged(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut block = OpenBlock::None;

    for line in split_lines(text) {
        if let Some(caps) = HEADER_LINE.captures(line) {
            std::mem::replace(&mut block, OpenBlock::None).close_into(&mut segments);

            let label = caps["label"].trim();
            block = match label.parse::<u32>() {
                Ok(speaker) => OpenBlock::Speaker {
                    speaker,
                    lines: Vec::new(),
                },
                Err(_) => {
                    debug!(label, "Discarding non-speaker block");
                    OpenBlock::Discarded
                }
            };
            continue;
        }

        if let OpenBlock::Speaker { lines, .. } = &mut block {
            lines.push(line.to_string());
        }
    }

    block.close_into(&mut segments);
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_drops_ad_block() {
        let text = "0 (0m5s):\nHello there.\n\nJoovv (0m10s):\nBuy our product!\n\n1 (0m20s):\nHi back.";

        let segments = parse_header_tagged(text);

        assert_eq!(
            segments,
            vec![Segment::new(0, "Hello there."), Segment::new(1, "Hi back.")]
        );
    }

    #[test]
    fn test_parse_joins_and_normalizes_lines() {
        let text = "2 (1h 25m 6s):\n  First line  \n\n\tsecond line\n3 (1h 26m):\nreply";

        let segments = parse_header_tagged(text);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], Segment::new(2, "First line second line"));
        assert_eq!(segments[1], Segment::new(3, "reply"));
    }

    #[test]
    fn test_parse_without_headers_yields_nothing() {
        assert!(parse_header_tagged("just some text\nwith no speaker headers").is_empty());
        assert!(parse_header_tagged("").is_empty());
    }

    #[test]
    fn test_consecutive_headers_emit_only_non_empty_blocks() {
        let text = "0 (0m1s):\n1 (0m2s):\n\n0 (0m3s):\nonly this one";

        let segments = parse_header_tagged(text);

        assert_eq!(segments, vec![Segment::new(0, "only this one")]);
    }

    #[test]
    fn test_lines_before_first_header_are_ignored() {
        let text = "Episode notes\n1 (0m1s):\nhi";

        assert_eq!(parse_header_tagged(text), vec![Segment::new(1, "hi")]);
    }

    #[test]
    fn test_block_count_matches_headers() {
        let mut text = String::new();
        for i in 0..20u32 {
            text.push_str(&format!("{} ({}m {}s):\n", i % 3, i, i * 2));
            if i % 5 == 4 {
                text.push_str("   \n");
            } else {
                text.push_str(&format!("  turn number\n{}  \n", i));
            }
        }

        let segments = parse_header_tagged(&text);

        // every fifth block is blank and dropped
        assert_eq!(segments.len(), 16);
        for segment in &segments {
            assert!(segment.text.starts_with("turn number "));
        }
        assert_eq!(segments[0], Segment::new(0, "turn number 0"));
        assert_eq!(segments[4], Segment::new(2, "turn number 5"));
    }

    #[test]
    fn test_negative_label_is_not_a_speaker() {
        let text = "-1 (0m1s):\nnot kept\n0 (0m2s):\nkept";

        assert_eq!(parse_header_tagged(text), vec![Segment::new(0, "kept")]);
    }
}
