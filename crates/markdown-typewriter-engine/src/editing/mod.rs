//! # Editing session
//!
//! [`Editor`] owns one document and drives the pipeline the host calls into:
//!
//! 1. The host mutates [`Editor::document_mut`] (or calls
//!    [`Editor::replace_text`]) and reports it with
//!    [`Editor::handle_content_change`].
//! 2. Reconciliation finds the edited span, handles Enter on list items and
//!    re-infers kinds whose raw prefix was edited.
//! 3. Typing shortcuts (`# `, `- `, ```` ``` ````...) convert the caret line.
//! 4. The visibility pass swaps raw and synthetic markers, renumbers ordered
//!    lists, derives styles and lays out tables.
//! 5. Autosave is rescheduled.
//!
//! Every step threads the selection through, and the result comes back as a
//! [`HostUpdate`] when anything changed. Formatting actions from toolbar or
//! menu go through [`Editor::apply_formatting`] and end with the same pass.
//!
//! ```
//! use markdown_typewriter_engine::editing::{Editor, FormattingAction, Selection};
//! use markdown_typewriter_engine::EngineOptions;
//!
//! let mut editor = Editor::new(EngineOptions::default());
//! editor.load_markdown("# Notes\n\nsome text\n");
//! // The caret line shows its raw `# `, so "text" sits at 13..17.
//! editor.set_selection(Selection::range(13..17));
//! editor.apply_formatting(FormattingAction::ToggleBold);
//! assert_eq!(editor.current_markdown(), "# Notes\n\nsome **text**\n");
//! ```

pub mod autosave;
pub mod formatting;
pub mod patch;
pub mod reconcile;
pub mod selection;
pub mod shortcuts;
pub mod surgery;

use std::ops::Range;
use std::time::Instant;

pub use autosave::AutosaveScheduler;
pub use formatting::{FormattingAction, apply_action};
pub use patch::{HostUpdate, ReentrancyGuard};
pub use reconcile::{EditSpan, Reconciled, diff_text, reconcile};
pub use selection::{OffsetEdit, Selection, translate};
pub use shortcuts::process_shortcut;
pub use surgery::Surgery;

use crate::models::Document;
use crate::options::EngineOptions;
use crate::parsing::{export_markdown, import_markdown};
use crate::rendering::{MonospaceMeasurer, PassOutcome, TextMeasurer, VisibilityPass};

/// One document editing session.
pub struct Editor {
    options: EngineOptions,
    measurer: Box<dyn TextMeasurer>,
    document: Document,
    frontmatter: Option<String>,
    selection: Selection,
    read_only: bool,
    guard: ReentrancyGuard,
    autosave: AutosaveScheduler,
    version: u64,
}

impl Editor {
    pub fn new(options: EngineOptions) -> Self {
        let measurer = Box::new(MonospaceMeasurer::new(options.char_advance));
        Self::with_measurer(options, measurer)
    }

    /// Use the host's font metrics for table layout.
    pub fn with_measurer(options: EngineOptions, measurer: Box<dyn TextMeasurer>) -> Self {
        let autosave = AutosaveScheduler::new(options.autosave_delay());
        Self {
            options,
            measurer,
            document: Document::new(),
            frontmatter: None,
            selection: Selection::default(),
            read_only: false,
            guard: ReentrancyGuard::default(),
            autosave,
            version: 0,
        }
    }

    /// Replace the whole session with `text`. The text becomes the saved
    /// baseline and the caret moves to the start.
    pub fn load_markdown(&mut self, text: &str) {
        let imported = import_markdown(text);
        self.document = imported.document;
        self.frontmatter = imported.frontmatter;
        self.selection = Selection::caret(0);
        self.guard.reset();
        self.autosave.reset(text);
        let outcome = self.run_pass();
        log::info!(
            "loaded document: {} lines, {} chars",
            outcome.lines,
            self.document.len()
        );
    }

    pub fn current_markdown(&self) -> String {
        export_markdown(&self.document, self.frontmatter.as_deref())
    }

    pub fn mark_saved(&mut self, markdown: impl Into<String>) {
        self.autosave.mark_saved(markdown);
    }

    pub fn apply_formatting(&mut self, action: FormattingAction) -> Option<HostUpdate> {
        if self.read_only {
            log::debug!("ignoring {action:?} on a read-only document");
            return None;
        }
        let edited = apply_action(
            &mut self.document,
            &mut self.selection,
            &action,
            &self.options.glyphs,
        );
        let outcome = self.run_pass();
        if edited {
            self.autosave.schedule(Instant::now());
        }
        self.finish(edited, outcome)
    }

    /// The host already changed [`Editor::document_mut`] and set the
    /// post-edit selection; `previous` is the document before the edit.
    ///
    /// A read-only document refuses the edit: `previous` is restored and the
    /// returned update tells the host to adopt it again.
    pub fn handle_content_change(&mut self, previous: &Document) -> Option<HostUpdate> {
        if self.read_only {
            let refused = self.document != *previous;
            if refused {
                log::debug!("content change on a read-only document reverted");
                self.document = previous.clone();
                self.selection = self.selection.clamp(self.document.len());
            }
            let outcome = self.run_pass();
            return self.finish(refused, outcome);
        }
        let before = previous.text();
        let after = self.document.text();
        let edit = diff_text(&before, &after, self.selection.caret_offset());

        let mut edited = false;
        if let Some(edit) = edit {
            edited = true;
            let reconciled = reconcile(&mut self.document, &mut self.selection, previous, edit);
            if !reconciled.exited_block {
                if let Some(selection) =
                    process_shortcut(&mut self.document, &self.selection, &reconciled.inserted)
                {
                    self.selection = selection;
                }
            }
        } else {
            log::trace!("content change with identical text");
        }

        let outcome = self.run_pass();
        if edited {
            self.autosave.schedule(Instant::now());
        }
        self.finish(edited, outcome)
    }

    /// Apply a host edit reported as a replacement, then reconcile it.
    pub fn replace_text(&mut self, range: Range<usize>, text: &str) -> Option<HostUpdate> {
        if self.read_only {
            return None;
        }
        let previous = self.document.clone();
        if let Err(err) = self.document.replace_typed(range.clone(), text) {
            log::warn!("replace_text rejected: {err}");
            return None;
        }
        self.selection = Selection::caret(range.start + text.chars().count());
        let update = self.handle_content_change(&previous);
        // The document changed even if the pass had nothing left to do.
        update.or_else(|| Some(self.host_update(0, ReentrancyGuard::default())))
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamp(self.document.len());
    }

    /// Re-run the pass for the new active lines. The callback caused by
    /// adopting the last [`HostUpdate`] is ignored.
    pub fn handle_selection_change(&mut self) -> Option<HostUpdate> {
        let mut guard = self.guard;
        self.handle_selection_change_with(&mut guard)
    }

    /// Same as [`Editor::handle_selection_change`], with the guard the host
    /// took from the [`HostUpdate`] it adopted.
    pub fn handle_selection_change_with(
        &mut self,
        guard: &mut ReentrancyGuard,
    ) -> Option<HostUpdate> {
        self.guard.reset();
        if guard.take() {
            log::trace!("selection change from our own update ignored");
            return None;
        }
        let outcome = self.run_pass();
        self.finish(false, outcome)
    }

    /// Drive the autosave deadline. Returns true when a new token was issued.
    pub fn poll_autosave(&mut self, now: Instant) -> bool {
        let (document, frontmatter) = (&self.document, self.frontmatter.as_deref());
        self.autosave
            .poll(now, || export_markdown(document, frontmatter))
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.autosave.has_unsaved_changes()
    }

    pub fn autosave_token(&self) -> u64 {
        self.autosave.token()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Read-only documents show raw markers on every line.
    pub fn set_read_only(&mut self, read_only: bool) -> Option<HostUpdate> {
        if self.read_only == read_only {
            return None;
        }
        self.read_only = read_only;
        let outcome = self.run_pass();
        self.finish(false, outcome)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// For hosts that apply keystrokes themselves; report each one with
    /// [`Editor::handle_content_change`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn frontmatter(&self) -> Option<&str> {
        self.frontmatter.as_deref()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    fn run_pass(&mut self) -> PassOutcome {
        let pass = VisibilityPass {
            options: &self.options,
            measurer: self.measurer.as_ref(),
            read_only: self.read_only,
        };
        pass.run(&mut self.document, &mut self.selection)
    }

    fn finish(&mut self, edited: bool, outcome: PassOutcome) -> Option<HostUpdate> {
        if !(edited || outcome.changed) {
            return None;
        }
        let mut guard = ReentrancyGuard::default();
        if outcome.changed {
            guard.arm();
        }
        self.guard = guard;
        Some(self.host_update(outcome.mutations, guard))
    }

    fn host_update(&mut self, mutations: usize, guard: ReentrancyGuard) -> HostUpdate {
        self.version += 1;
        HostUpdate {
            document: self.document.clone(),
            selection: self.selection.clone(),
            version: self.version,
            mutations,
            guard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockKind, RunTags};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn editor(text: &str) -> Editor {
        let mut editor = Editor::new(EngineOptions::default());
        editor.load_markdown(text);
        editor
    }

    #[test]
    fn load_hides_markers_away_from_the_caret() {
        let editor = editor("intro\n\n- one\n- two\n");
        assert_eq!(editor.document().text(), "intro\n•one\n•two");
        assert_eq!(editor.current_markdown(), "intro\n\n- one\n- two\n");
        assert!(!editor.has_unsaved_changes());
    }

    #[test]
    fn typing_a_heading_shortcut() {
        let mut editor = editor("after");
        editor.replace_text(0..0, "#");
        let update = editor.replace_text(1..1, " ").expect("update");
        // The trigger is consumed, then shown again as the active raw prefix.
        assert_eq!(update.selection, Selection::caret(2));
        assert_eq!(editor.document().text(), "# after");
        assert_eq!(editor.document().lines()[0].kind(), Some(BlockKind::Heading(1)));
        assert_eq!(editor.current_markdown(), "# after\n");
    }

    #[test]
    fn engine_selection_update_is_ignored_once() {
        let mut editor = editor("- a\n\nb");
        assert_eq!(editor.document().text(), "- a\nb");
        editor.set_selection(Selection::caret(5));
        let update = editor.handle_selection_change().expect("bullet swapped in");
        assert_eq!(editor.document().text(), "•a\nb");
        assert_eq!(update.selection, Selection::caret(4));
        assert_eq!(editor.handle_selection_change(), None);
        assert_eq!(editor.handle_selection_change(), None);
    }

    #[test]
    fn read_only_ignores_formatting() {
        let mut editor = editor("text");
        editor.set_read_only(true);
        editor.set_selection(Selection::range(0..4));
        assert_eq!(editor.apply_formatting(FormattingAction::ToggleBold), None);
        assert_eq!(editor.replace_text(0..0, "x"), None);
        assert_eq!(editor.current_markdown(), "text\n");
    }

    #[test]
    fn read_only_reverts_host_edits() {
        let mut editor = editor("hello");
        editor.set_read_only(true);
        let previous = editor.document().clone();
        editor
            .document_mut()
            .insert(5, "XYZ", RunTags::block(BlockKind::Paragraph))
            .unwrap();
        editor.set_selection(Selection::caret(8));

        let update = editor.handle_content_change(&previous).expect("revert");

        assert_eq!(update.document.text(), "hello");
        assert_eq!(update.selection, Selection::caret(5));
        assert_eq!(editor.current_markdown(), "hello\n");
        assert!(!editor.poll_autosave(Instant::now() + Duration::from_secs(5)));
    }

    #[test]
    fn the_guard_travels_with_the_update() {
        let mut editor = editor("- a\n\nb");
        editor.set_selection(Selection::caret(5));
        let mut update = editor.handle_selection_change().expect("bullet swapped in");
        assert!(update.guard.is_armed());

        assert_eq!(editor.handle_selection_change_with(&mut update.guard), None);
        assert!(!update.guard.is_armed());
        // The editor's own copy was consumed along with it.
        editor.set_selection(Selection::caret(0));
        let back = editor.handle_selection_change().expect("prefix shown again");
        assert_eq!(editor.document().text(), "- a\nb");
        assert!(back.guard.is_armed());
    }

    #[test]
    fn autosave_fires_after_an_edit() {
        let mut editor = editor("a\n");
        editor.set_selection(Selection::caret(1));
        editor.replace_text(1..1, "b");
        let later = Instant::now() + Duration::from_secs(5);
        assert!(editor.poll_autosave(later));
        assert_eq!(editor.autosave_token(), 1);
        assert!(editor.has_unsaved_changes());
        let saved = editor.current_markdown();
        editor.mark_saved(saved);
        assert!(!editor.has_unsaved_changes());
    }
}
