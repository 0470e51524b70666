//! Line-prefix patterns shared by kind inference, the shortcut processor and
//! the visibility pass.
//!
//! All prefixes are ASCII, so byte lengths reported here equal char lengths.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::BlockKind;

/// A markdown block prefix found at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixMatch {
    pub kind: BlockKind,
    pub depth: u8,
    /// Length of the prefix, indentation included.
    pub len: usize,
}

fn task_regex() -> &'static Regex {
    static TASK: OnceLock<Regex> = OnceLock::new();
    TASK.get_or_init(|| Regex::new(r"^([ \t]*)[-*+] \[([ xX])\] ").expect("Invalid task regex"))
}

fn ordered_regex() -> &'static Regex {
    static ORDERED: OnceLock<Regex> = OnceLock::new();
    ORDERED.get_or_init(|| Regex::new(r"^([ \t]*)\d{1,9}[.)] ").expect("Invalid ordered regex"))
}

fn bullet_regex() -> &'static Regex {
    static BULLET: OnceLock<Regex> = OnceLock::new();
    BULLET.get_or_init(|| Regex::new(r"^([ \t]*)[-*+] ").expect("Invalid bullet regex"))
}

fn heading_regex() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| Regex::new(r"^(#{1,6}) ").expect("Invalid heading regex"))
}

fn quote_regex() -> &'static Regex {
    static QUOTE: OnceLock<Regex> = OnceLock::new();
    QUOTE.get_or_init(|| Regex::new(r"^> ?").expect("Invalid blockquote regex"))
}

fn rule_regex() -> &'static Regex {
    static RULE: OnceLock<Regex> = OnceLock::new();
    RULE.get_or_init(|| {
        Regex::new(r"^(?:-{3,}|\*{3,}|_{3,})[ \t]*$").expect("Invalid rule regex")
    })
}

/// Nesting depth from leading whitespace: two columns per level, a tab
/// counting as two.
pub fn depth_from_indent(indent: &str) -> u8 {
    let cols: usize = indent
        .chars()
        .map(|c| if c == '\t' { 2 } else { 1 })
        .sum();
    (cols / 2 + 1).min(6) as u8
}

/// Infer a marker-bearing kind from raw line text.
///
/// Priority: task > ordered > bullet > heading > blockquote > rule.
pub fn infer_prefix(text: &str) -> Option<PrefixMatch> {
    if let Some(caps) = task_regex().captures(text) {
        let checked = caps.get(2).is_some_and(|m| m.as_str() != " ");
        return Some(PrefixMatch {
            kind: if checked {
                BlockKind::TaskChecked
            } else {
                BlockKind::TaskUnchecked
            },
            depth: depth_from_indent(&caps[1]),
            len: caps[0].len(),
        });
    }
    if let Some(caps) = ordered_regex().captures(text) {
        return Some(PrefixMatch {
            kind: BlockKind::OrderedList,
            depth: depth_from_indent(&caps[1]),
            len: caps[0].len(),
        });
    }
    if let Some(caps) = bullet_regex().captures(text) {
        return Some(PrefixMatch {
            kind: BlockKind::BulletList,
            depth: depth_from_indent(&caps[1]),
            len: caps[0].len(),
        });
    }
    if let Some(caps) = heading_regex().captures(text) {
        return Some(PrefixMatch {
            kind: BlockKind::heading(caps[1].len() as u8),
            depth: 1,
            len: caps[0].len(),
        });
    }
    if let Some(m) = quote_regex().find(text) {
        return Some(PrefixMatch {
            kind: BlockKind::Blockquote,
            depth: 1,
            len: m.len(),
        });
    }
    if rule_regex().is_match(text) {
        return Some(PrefixMatch {
            kind: BlockKind::HorizontalRule,
            depth: 1,
            len: text.len(),
        });
    }
    None
}

/// Length of the raw prefix of `kind`'s family present at the start of `text`.
///
/// Families are matched loosely (any bullet char, any ordinal, either task
/// state) so a line keeps its tagged kind while its prefix is being edited.
pub fn raw_prefix_len(kind: BlockKind, text: &str) -> Option<usize> {
    let found = match kind {
        BlockKind::Heading(level) => heading_regex()
            .captures(text)
            .filter(|caps| caps[1].len() == usize::from(level))
            .map(|caps| caps[0].len()),
        BlockKind::BulletList => {
            if task_regex().is_match(text) {
                None
            } else {
                bullet_regex().find(text).map(|m| m.len())
            }
        }
        BlockKind::OrderedList => ordered_regex().find(text).map(|m| m.len()),
        BlockKind::TaskChecked | BlockKind::TaskUnchecked => {
            task_regex().find(text).map(|m| m.len())
        }
        BlockKind::Blockquote => quote_regex().find(text).map(|m| m.len()),
        BlockKind::HorizontalRule => rule_regex().is_match(text).then_some(text.len()),
        BlockKind::Paragraph
        | BlockKind::CodeBlock
        | BlockKind::ImageCaption
        | BlockKind::BlankLine
        | BlockKind::HtmlBlock
        | BlockKind::Gallery
        | BlockKind::TableRow => None,
    };
    found.filter(|len| *len > 0)
}

/// Canonical raw prefix shown on the active line.
///
/// List prefixes carry two spaces of indentation per level below the first.
pub fn canonical_prefix(kind: BlockKind, depth: u8, ordinal: usize) -> String {
    let indent = "  ".repeat(usize::from(depth.max(1)) - 1);
    match kind {
        BlockKind::Heading(level) => format!("{} ", "#".repeat(usize::from(level))),
        BlockKind::BulletList => format!("{indent}- "),
        BlockKind::OrderedList => format!("{indent}{ordinal}. "),
        BlockKind::TaskChecked => format!("{indent}- [x] "),
        BlockKind::TaskUnchecked => format!("{indent}- [ ] "),
        BlockKind::Blockquote => "> ".to_string(),
        BlockKind::HorizontalRule => "---".to_string(),
        BlockKind::Paragraph
        | BlockKind::CodeBlock
        | BlockKind::ImageCaption
        | BlockKind::BlankLine
        | BlockKind::HtmlBlock
        | BlockKind::Gallery
        | BlockKind::TableRow => String::new(),
    }
}

/// A bullet, ordinal or task marker opens `text`.
pub fn starts_list_item(text: &str) -> bool {
    task_regex().is_match(text) || ordered_regex().is_match(text) || bullet_regex().is_match(text)
}

fn needs_escape(text: &str) -> bool {
    infer_prefix(text).is_some()
        || text.starts_with("```")
        || text.starts_with("~~~")
        || matches!(text, "#" | "-" | "*" | "+" | ">")
}

/// Escape a paragraph line so it does not re-parse as another block.
///
/// Leading indentation is dropped. Ordinals get the backslash before their
/// `.` or `)`; every other prefix gets it in front.
pub fn escape_paragraph_line(text: &str) -> String {
    let trimmed = text.trim_start_matches([' ', '\t']);
    if !needs_escape(trimmed) {
        return trimmed.to_string();
    }
    if let Some(caps) = ordered_regex().captures(trimmed) {
        let digits = caps[0].trim_end().len() - 1;
        return format!("{}\\{}", &trimmed[..digits], &trimmed[digits..]);
    }
    format!("\\{trimmed}")
}

/// Escape heading text that would otherwise read as a second heading prefix
/// or a closing sequence.
pub fn escape_heading_text(text: &str) -> String {
    let looks_like_prefix =
        heading_regex().is_match(text) || (!text.is_empty() && text.chars().all(|c| c == '#'));
    if looks_like_prefix {
        format!("\\{text}")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_prefix_pattern_compiles() {
        assert!(task_regex().is_match("- [ ] a"));
        assert!(ordered_regex().is_match("1. a"));
        assert!(bullet_regex().is_match("- a"));
        assert!(heading_regex().is_match("# a"));
        assert!(quote_regex().is_match("> a"));
        assert!(rule_regex().is_match("---"));
    }

    #[rstest]
    #[case("- [ ] todo", BlockKind::TaskUnchecked, 1, 6)]
    #[case("  - [x] done", BlockKind::TaskChecked, 2, 8)]
    #[case("12. twelve", BlockKind::OrderedList, 1, 4)]
    #[case("1) paren", BlockKind::OrderedList, 1, 3)]
    #[case("* star", BlockKind::BulletList, 1, 2)]
    #[case("\t- tabbed", BlockKind::BulletList, 2, 3)]
    #[case("### three", BlockKind::Heading(3), 1, 4)]
    #[case("> quoted", BlockKind::Blockquote, 1, 2)]
    #[case(">tight", BlockKind::Blockquote, 1, 1)]
    #[case("---", BlockKind::HorizontalRule, 1, 3)]
    #[case("***  ", BlockKind::HorizontalRule, 1, 5)]
    fn infers_prefixes(
        #[case] text: &str,
        #[case] kind: BlockKind,
        #[case] depth: u8,
        #[case] len: usize,
    ) {
        assert_eq!(infer_prefix(text), Some(PrefixMatch { kind, depth, len }));
    }

    #[rstest]
    #[case("plain text")]
    #[case("#nospace")]
    #[case("####### seven")]
    #[case("-dash")]
    #[case("")]
    fn plain_text_infers_nothing(#[case] text: &str) {
        assert_eq!(infer_prefix(text), None);
    }

    #[test]
    fn raw_prefix_respects_heading_level() {
        assert_eq!(raw_prefix_len(BlockKind::Heading(2), "## two"), Some(3));
        assert_eq!(raw_prefix_len(BlockKind::Heading(1), "## two"), None);
    }

    #[test]
    fn bullet_prefix_does_not_claim_a_task_box() {
        assert_eq!(raw_prefix_len(BlockKind::BulletList, "- [ ] x"), None);
        assert_eq!(raw_prefix_len(BlockKind::TaskUnchecked, "- [x] x"), Some(6));
    }

    #[test]
    fn canonical_prefixes_indent_by_depth() {
        assert_eq!(canonical_prefix(BlockKind::BulletList, 1, 0), "- ");
        assert_eq!(canonical_prefix(BlockKind::OrderedList, 3, 4), "    4. ");
        assert_eq!(canonical_prefix(BlockKind::Heading(2), 1, 0), "## ");
        assert_eq!(canonical_prefix(BlockKind::Paragraph, 1, 0), "");
    }

    #[rstest]
    #[case("- not a list", "\\- not a list")]
    #[case("# not a heading", "\\# not a heading")]
    #[case("```", "\\```")]
    #[case("1986. a good year", "1986\\. a good year")]
    #[case("  indented words", "indented words")]
    #[case("just words", "just words")]
    fn paragraph_lines_are_escaped(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(escape_paragraph_line(text), expected);
    }
}
