//! Frame sequence for the moving-average animation.
//!
//! Each window profile becomes one frame. A frame carries the profile, its
//! difference from the mean of all earlier profiles, and the earlier profiles
//! themselves for drawing as faded traces. The running mean is a value that
//! the iterator threads from one frame to the next.

pub mod palette;
pub mod render;

use std::iter::FusedIterator;

use crate::aggregate::{Mean, MonthlyValues, WindowProfile, MONTHS};

pub use render::{render_gif, RenderOptions};

/// Per-month running mean of the profiles seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CumulativeMean {
    months: [Mean; MONTHS],
}

impl CumulativeMean {
    /// True until a profile with at least one defined month was absorbed.
    pub fn is_empty(&self) -> bool {
        self.months.iter().all(|m| m.count() == 0)
    }

    pub fn mean(&self) -> MonthlyValues {
        self.months.map(|m| m.value())
    }

    /// `values - mean` per month, or `None` before any profile was absorbed.
    /// Months undefined on either side stay undefined.
    pub fn diff(&self, values: &MonthlyValues) -> Option<MonthlyValues> {
        if self.is_empty() {
            return None;
        }

        let mean = self.mean();
        let mut diff = [None; MONTHS];
        for (idx, slot) in diff.iter_mut().enumerate() {
            *slot = values[idx].zip(mean[idx]).map(|(v, m)| v - m);
        }

        Some(diff)
    }

    /// Returns the state with `values` added. Gaps do not count.
    #[must_use]
    pub fn absorb(mut self, values: &MonthlyValues) -> Self {
        for (mean, value) in self.months.iter_mut().zip(values) {
            if let Some(v) = value {
                mean.push(*v);
            }
        }

        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub label: String,
    pub profile: MonthlyValues,
    /// Difference from the mean of all previous frames; `None` on the first.
    pub diff: Option<MonthlyValues>,
    /// Profiles of all previous frames, oldest first.
    pub faded: Vec<MonthlyValues>,
}

/// Lazy, single-pass frame sequence over window profiles in order.
#[derive(Debug)]
pub struct Frames {
    profiles: std::vec::IntoIter<WindowProfile>,
    state: CumulativeMean,
    archive: Vec<MonthlyValues>,
}

pub fn frames(profiles: Vec<WindowProfile>) -> Frames {
    Frames {
        profiles: profiles.into_iter(),
        state: CumulativeMean::default(),
        archive: Vec::new(),
    }
}

impl Iterator for Frames {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let profile = self.profiles.next()?;

        // Compare first, then absorb: a window never sees itself in its baseline.
        let diff = self.state.diff(&profile.values);
        self.state = self.state.absorb(&profile.values);

        let frame = Frame {
            label: profile.label(),
            profile: profile.values,
            diff,
            faded: self.archive.clone(),
        };
        self.archive.push(profile.values);

        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.profiles.size_hint()
    }
}

impl ExactSizeIterator for Frames {}

impl FusedIterator for Frames {}

// -- Tests -------------------------------------------------------------------
