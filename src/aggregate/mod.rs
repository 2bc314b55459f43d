//! Monthly and windowed temperature averages.

pub mod monthly;
pub mod window;

pub use monthly::{monthly_aggregates, MonthlyAggregate};
pub use window::{sliding_windows, window_profiles, year_span, Window, WindowProfile};

pub const MONTHS: usize = 12;

/// One value per calendar month, January first. `None` marks a month without
/// data.
pub type MonthlyValues = [Option<f64>; MONTHS];

/// Running arithmetic mean.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

// -- Tests -------------------------------------------------------------------
