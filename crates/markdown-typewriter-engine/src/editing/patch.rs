use super::selection::Selection;
use crate::models::Document;

/// What the host adopts, in one step, after an engine operation changed
/// something.
#[derive(Debug, Clone, PartialEq)]
pub struct HostUpdate {
    pub document: Document,
    pub selection: Selection,
    /// Incremented once per update handed to the host.
    pub version: u64,
    /// Text insertions and removals performed by the engine.
    pub mutations: usize,
    /// Armed when adopting this update will echo back as a selection change.
    /// Hand it to [`crate::Editor::handle_selection_change_with`].
    pub guard: ReentrancyGuard,
}

/// Swallows the selection-change callback the host fires in response to the
/// engine's own selection update.
///
/// Armed by a pass that changed something; the next call to
/// [`ReentrancyGuard::take`] reports it and disarms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReentrancyGuard {
    armed: bool,
}

impl ReentrancyGuard {
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn reset(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Returns true exactly once after `arm`.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.armed)
    }
}
