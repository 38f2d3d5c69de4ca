//! Pending signal store
//!
//! Ordered, per-target list of signals waiting for review. At most one entry
//! exists per source directive; a newer notification from the same source
//! replaces the old entry and moves to the end.
//!
//! Disposed generations are retired: once a source's signal with sequence `n`
//! has been removed, no signal from that source with sequence `<= n` is
//! admitted again. A late duplicate delivery therefore cannot resurrect a
//! signal the user already accepted or ignored.

use itde_core::{IncomingSignal, ToolDirective};
use std::collections::HashMap;

/// Insertion-ordered pending signals, unique by source directive
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingSignalStore {
    signals: Vec<IncomingSignal>,
    retired: HashMap<ToolDirective, u64>,
}

impl PendingSignalStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending signals in arrival order
    #[must_use]
    pub fn list(&self) -> &[IncomingSignal] {
        &self.signals
    }

    /// Pending signal from `source`, if any
    #[must_use]
    pub fn get(&self, source: &ToolDirective) -> Option<&IncomingSignal> {
        self.signals.iter().find(|s| &s.source_directive == source)
    }

    /// Whether a signal from `source` is pending
    #[must_use]
    pub fn contains(&self, source: &ToolDirective) -> bool {
        self.get(source).is_some()
    }

    /// Number of pending signals
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Insert or replace the signal from `signal.source_directive`
    ///
    /// Returns `false` when the signal was dropped because an equal or newer
    /// generation from the same source is pending or already retired.
    pub fn upsert(&mut self, signal: IncomingSignal) -> bool {
        if self.is_retired(&signal) {
            return false;
        }

        if let Some(index) = self.position(&signal.source_directive) {
            if !self.signals[index].is_superseded_by(&signal) {
                return false;
            }
            self.signals.remove(index);
        }

        self.signals.push(signal);
        true
    }

    /// Remove the signal from `source`; no-op when absent
    pub fn remove(&mut self, source: &ToolDirective) -> Option<IncomingSignal> {
        let index = self.position(source)?;
        let removed = self.signals.remove(index);
        self.retire(&removed.source_directive, removed.sequence);
        Some(removed)
    }

    /// Remove the signal from `source` only if it is generation `sequence`
    ///
    /// A newer notification that superseded `sequence` stays pending. The
    /// generation is retired either way.
    pub fn remove_if_sequence(
        &mut self,
        source: &ToolDirective,
        sequence: u64,
    ) -> Option<IncomingSignal> {
        self.retire(source, sequence);

        let index = self
            .signals
            .iter()
            .position(|s| &s.source_directive == source && s.sequence == sequence)?;
        Some(self.signals.remove(index))
    }

    /// Remove every pending signal, returning them in arrival order
    pub fn clear(&mut self) -> Vec<IncomingSignal> {
        let removed = std::mem::take(&mut self.signals);
        for signal in &removed {
            self.retire(&signal.source_directive, signal.sequence);
        }
        removed
    }

    /// Replace the contents with an authoritative snapshot
    ///
    /// Retired generations in the snapshot are skipped; retirements are kept.
    pub fn resync(&mut self, snapshot: Vec<IncomingSignal>) {
        self.signals.clear();
        for signal in snapshot {
            let _ = self.upsert(signal);
        }
    }

    fn position(&self, source: &ToolDirective) -> Option<usize> {
        self.signals.iter().position(|s| &s.source_directive == source)
    }

    fn is_retired(&self, signal: &IncomingSignal) -> bool {
        self.retired
            .get(&signal.source_directive)
            .is_some_and(|&watermark| signal.sequence <= watermark)
    }

    fn retire(&mut self, source: &ToolDirective, sequence: u64) {
        let watermark = self.retired.entry(source.clone()).or_insert(sequence);
        *watermark = (*watermark).max(sequence);
    }
}
