//! Inline delimiter scanning for the visibility pass.
//!
//! Code spans are found first and masked out as raw zones, then strong,
//! strikethrough and emphasis in that order. Each matched delimiter pair is
//! masked too, so a single `*` never pairs with half of a `**`.

use std::ops::Range;
use std::sync::OnceLock;

use fancy_regex::Regex;

use crate::models::text::byte_to_char;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineStyle {
    Code,
    Strong,
    Strikethrough,
    Emphasis,
}

/// One delimiter pair, in char offsets relative to the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub style: InlineStyle,
    pub open: Range<usize>,
    pub close: Range<usize>,
}

impl InlineSpan {
    pub fn content(&self) -> Range<usize> {
        self.open.end..self.close.start
    }
}

const MASK: char = '\u{1}';

fn code_regex() -> &'static Regex {
    static CODE: OnceLock<Regex> = OnceLock::new();
    CODE.get_or_init(|| Regex::new(r"(?<!`)(`+)(?!`)(.+?)(?<!`)\1(?!`)").expect("Invalid code span regex"))
}

fn styled_regexes() -> &'static [(InlineStyle, Regex)] {
    static STYLED: OnceLock<Vec<(InlineStyle, Regex)>> = OnceLock::new();
    STYLED.get_or_init(|| {
        [
            (
                InlineStyle::Strong,
                r"(?<![*\\])\*\*(?![\s*])(.+?)(?<![\s*\\])\*\*(?!\*)",
            ),
            (
                InlineStyle::Strong,
                r"(?<![_\\\w])__(?![\s_])(.+?)(?<![\s_\\])__(?![_\w])",
            ),
            (
                InlineStyle::Strikethrough,
                r"(?<![~\\])~~(?![\s~])(.+?)(?<![\s~\\])~~(?!~)",
            ),
            (
                InlineStyle::Emphasis,
                r"(?<![*\\])\*(?![\s*])(.+?)(?<![\s*\\])\*(?!\*)",
            ),
            (
                InlineStyle::Emphasis,
                r"(?<![_\\\w])_(?![\s_])(.+?)(?<![\s_\\])_(?![_\w])",
            ),
        ]
        .into_iter()
        .map(|(style, pattern)| {
            (
                style,
                Regex::new(pattern).expect("Invalid inline delimiter regex"),
            )
        })
        .collect()
    })
}

fn mask(masked: &mut String, range: Range<usize>) {
    let filler: String = std::iter::repeat_n(MASK, range.len()).collect();
    masked.replace_range(range, &filler);
}

/// Locate every delimiter pair in `text`, sorted by opening offset.
pub fn find_inline_spans(text: &str) -> Vec<InlineSpan> {
    let mut masked = text.to_string();
    let mut found: Vec<(InlineStyle, Range<usize>, Range<usize>)> = Vec::new();

    let code: Vec<_> = code_regex()
        .captures_iter(text)
        .filter_map(Result::ok)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let content = caps.get(2)?;
            Some((whole.range(), content.range()))
        })
        .collect();
    for (whole, content) in code {
        found.push((
            InlineStyle::Code,
            whole.start..content.start,
            content.end..whole.end,
        ));
        mask(&mut masked, whole);
    }

    for (style, regex) in styled_regexes() {
        let pairs: Vec<_> = regex
            .captures_iter(&masked)
            .filter_map(Result::ok)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let content = caps.get(1)?;
                Some((whole.start()..content.start(), content.end()..whole.end()))
            })
            .collect();
        for (open, close) in pairs {
            mask(&mut masked, open.clone());
            mask(&mut masked, close.clone());
            found.push((*style, open, close));
        }
    }

    let to_chars = |r: Range<usize>| byte_to_char(text, r.start)..byte_to_char(text, r.end);
    let mut spans: Vec<InlineSpan> = found
        .into_iter()
        .map(|(style, open, close)| InlineSpan {
            style,
            open: to_chars(open),
            close: to_chars(close),
        })
        .collect();
    spans.sort_by_key(|s| s.open.start);
    spans
}
