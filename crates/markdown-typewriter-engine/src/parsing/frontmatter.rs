/// Boundaries that open and close a header block.
const BOUNDARIES: [&str; 2] = ["---", "+++"];

/// Split an opaque header block off the start of `text`.
///
/// The first line must be a boundary and some later line must repeat it.
/// The returned header runs from the first byte through the closing
/// boundary's line break, untouched.
pub fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let first_end = text.find('\n').map_or(text.len(), |i| i + 1);
    let first = text[..first_end].trim_end_matches(['\n', '\r']);
    let Some(boundary) = BOUNDARIES.iter().find(|b| **b == first) else {
        return (None, text);
    };

    let mut pos = first_end;
    while pos < text.len() {
        let line_end = text[pos..].find('\n').map_or(text.len(), |i| pos + i + 1);
        let line = text[pos..line_end].trim_end_matches(['\n', '\r']);
        if line == *boundary {
            return (Some(&text[..line_end]), &text[line_end..]);
        }
        pos = line_end;
    }
    (None, text)
}
