//! Markdown in and out of the run-based document, plus the line patterns the
//! editing passes share.

pub mod delimiters;
pub mod export;
pub mod frontmatter;
pub mod import;
pub mod patterns;

pub use delimiters::{InlineSpan, InlineStyle, find_inline_spans};
pub use export::export_markdown;
pub use frontmatter::split_frontmatter;
pub use import::{Imported, import_markdown};
pub use patterns::{PrefixMatch, canonical_prefix, infer_prefix, raw_prefix_len};
