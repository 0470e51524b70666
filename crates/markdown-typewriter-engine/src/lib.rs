pub mod editing;
pub mod models;
pub mod options;
pub mod parsing;
pub mod rendering;

// Re-export key types for easier usage
pub use editing::{Editor, FormattingAction, HostUpdate, Selection};
pub use models::{BlockKind, Document, EditError, Line, Run, RunTags};
pub use options::{EngineOptions, Glyphs, Theme};
pub use parsing::{Imported, export_markdown, import_markdown};
pub use rendering::{MonospaceMeasurer, TextMeasurer};
