//! Temporal label smoothing.
//!
//! Majority vote over the last few raw chord labels. A label must appear at
//! least twice in the window before it becomes the stable label, which hides
//! single-tick flicker at the cost of a few ticks of latency.

use std::collections::VecDeque;

use crate::chord::{ChordId, TEMPLATE_COUNT};
use crate::config::SMOOTHER_WINDOW;

/// Slot in the tally array used for "no chord".
const NO_CHORD_SLOT: usize = TEMPLATE_COUNT;

/// A raw or stable label: a chord, or `None` for "no chord".
pub type ChordLabel = Option<ChordId>;

/// Per-session majority-vote filter over recent raw labels.
#[derive(Debug, Clone)]
pub struct ChordSmoother {
    window_size: usize,
    history: VecDeque<ChordLabel>,
    last_stable: ChordLabel,
}

impl Default for ChordSmoother {
    fn default() -> Self {
        Self::new(SMOOTHER_WINDOW)
    }
}

impl ChordSmoother {
    /// Creates an empty smoother. A window size of 0 is treated as 1.
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            history: VecDeque::with_capacity(window_size + 1),
            last_stable: None,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last_stable(&self) -> ChordLabel {
        self.last_stable
    }

    /// Forgets the window and the stable label.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_stable = None;
    }

    /// Records a raw label and returns the label to report.
    ///
    /// With fewer than two labels in the window the input is returned as is.
    /// Otherwise the most frequent label wins; among equal counts the one
    /// whose first appearance in the window is earliest wins. A winner seen at
    /// least twice becomes the new stable label, and the stable label is
    /// always what gets returned.
    pub fn push(&mut self, label: ChordLabel) -> ChordLabel {
        self.history.push_back(label);
        if self.history.len() > self.window_size {
            self.history.pop_front();
        }

        if self.history.len() < 2 {
            return label;
        }

        let mut counts = [0u32; TEMPLATE_COUNT + 1];
        for entry in &self.history {
            counts[slot(*entry)] += 1;
        }
        let max_count = counts.iter().copied().max().unwrap_or(0);

        // Chronological scan: the first entry holding the max count is the
        // label that appeared earliest among the tied ones.
        let winner = self
            .history
            .iter()
            .copied()
            .find(|entry| counts[slot(*entry)] == max_count);

        if let Some(winner) = winner {
            if max_count >= 2 {
                self.last_stable = winner;
            }
        }
        self.last_stable
    }
}

fn slot(label: ChordLabel) -> usize {
    label.map_or(NO_CHORD_SLOT, |id| id.index())
}
