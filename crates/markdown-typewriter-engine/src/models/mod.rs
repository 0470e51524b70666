pub mod block_kind;
pub mod document;
pub mod line;
pub mod style;
pub mod tags;
pub mod text;

pub use block_kind::{BlockKind, ColumnAlignment, ExportGroup};
pub use document::{Document, EditError, Run};
pub use line::Line;
pub use style::{Color, ParagraphStyle, RunStyle, TabStop};
pub use tags::{InlineIntent, InlineIntents, RunTags, TableCell};
