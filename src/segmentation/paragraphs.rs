use super::{join_lines, split_lines};

/// Split single-speaker plain text into paragraphs separated by blank lines
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in split_lines(text) {
        if line.trim().is_empty() {
            push_paragraph(&mut buffer, &mut paragraphs);
        } else {
            buffer.push(line);
        }
    }
    push_paragraph(&mut buffer, &mut paragraphs);

    paragraphs
}

fn push_paragraph(buffer: &mut Vec<&str>, paragraphs: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let paragraph = join_lines(buffer.as_slice());
    if !paragraph.is_empty() {
        paragraphs.push(paragraph);
    }
    buffer.clear();
}
