use std::time::{Duration, Instant};

/// Debounced "time to save" signal.
///
/// Each accepted edit reschedules the deadline under a new generation, so
/// at most one deadline is ever pending. The scheduler only flips flags; the
/// host does the writing and reports back through [`mark_saved`].
///
/// [`mark_saved`]: AutosaveScheduler::mark_saved
#[derive(Debug, Clone)]
pub struct AutosaveScheduler {
    delay: Duration,
    generation: u64,
    pending: Option<(u64, Instant)>,
    baseline: String,
    unsaved: bool,
    token: u64,
}

impl AutosaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
            baseline: String::new(),
            unsaved: false,
            token: 0,
        }
    }

    /// Cancel any pending deadline and start a new quiet period at `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.generation += 1;
        self.pending = Some((self.generation, now + self.delay));
        log::trace!("autosave generation {} scheduled", self.generation);
    }

    /// Fire the pending deadline if it has passed. Returns true when the
    /// export differs from the baseline and a new token was issued.
    pub fn poll(&mut self, now: Instant, current_markdown: impl FnOnce() -> String) -> bool {
        let Some((generation, deadline)) = self.pending else {
            return false;
        };
        if now < deadline || generation != self.generation {
            return false;
        }
        self.pending = None;
        if current_markdown() == self.baseline {
            log::debug!("autosave generation {generation}: nothing changed");
            return false;
        }
        self.unsaved = true;
        self.token += 1;
        log::debug!("autosave generation {generation}: token {}", self.token);
        true
    }

    /// The host persisted `markdown`; it becomes the new baseline.
    pub fn mark_saved(&mut self, markdown: impl Into<String>) {
        self.baseline = markdown.into();
        self.unsaved = false;
    }

    /// Forget everything, as for a freshly loaded document.
    pub fn reset(&mut self, baseline: impl Into<String>) {
        self.pending = None;
        self.generation += 1;
        self.mark_saved(baseline);
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Increments once per fired save signal.
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(800);

    fn scheduler(baseline: &str) -> AutosaveScheduler {
        let mut s = AutosaveScheduler::new(DELAY);
        s.reset(baseline);
        s
    }

    #[test]
    fn fires_once_after_the_quiet_period() {
        let t0 = Instant::now();
        let mut s = scheduler("old");
        s.schedule(t0);
        assert!(!s.poll(t0 + Duration::from_millis(799), || "new".into()));
        assert!(s.poll(t0 + DELAY, || "new".into()));
        assert!(s.has_unsaved_changes());
        assert_eq!(s.token(), 1);
        assert!(!s.poll(t0 + DELAY * 2, || "new".into()));
        assert_eq!(s.token(), 1);
    }

    #[test]
    fn rescheduling_cancels_the_earlier_deadline() {
        let t0 = Instant::now();
        let mut s = scheduler("old");
        s.schedule(t0);
        s.schedule(t0 + Duration::from_millis(500));
        assert!(!s.poll(t0 + DELAY, || "new".into()));
        assert!(s.poll(t0 + Duration::from_millis(1300), || "new".into()));
        assert_eq!(s.token(), 1);
    }

    #[test]
    fn unchanged_export_issues_no_token() {
        let t0 = Instant::now();
        let mut s = scheduler("same");
        s.schedule(t0);
        assert!(!s.poll(t0 + DELAY, || "same".into()));
        assert!(!s.has_unsaved_changes());
        assert!(!s.is_pending());
    }

    #[test]
    fn mark_saved_clears_the_flag_and_moves_the_baseline() {
        let t0 = Instant::now();
        let mut s = scheduler("old");
        s.schedule(t0);
        assert!(s.poll(t0 + DELAY, || "new".into()));
        s.mark_saved("new");
        assert!(!s.has_unsaved_changes());
        s.schedule(t0 + DELAY);
        assert!(!s.poll(t0 + DELAY * 2, || "new".into()));
    }
}
