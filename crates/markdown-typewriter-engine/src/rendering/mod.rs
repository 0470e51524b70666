//! Everything the document looks like, as opposed to what it says: glyphs,
//! ordinals, derived styles and table layout.

pub mod renumber;
pub mod styling;
pub mod table;
pub mod visibility;

pub use renumber::{ListLine, renumber};
pub use styling::{LineContext, paragraph_style, run_style};
pub use table::{MonospaceMeasurer, TableLayout, TextMeasurer, apply_table_layout, layout_columns};
pub use visibility::{PassOutcome, VisibilityPass};
