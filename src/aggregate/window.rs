use std::fmt;

use super::{Mean, MonthlyAggregate, MonthlyValues, MONTHS};

/// Inclusive span of consecutive years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: i32,
    pub end: i32,
}

impl Window {
    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Windows of `length` years starting at `first` and advancing by `step`,
/// stopping before a window would extend past `last`. Empty when the span is
/// shorter than one window.
pub fn sliding_windows(first: i32, last: i32, length: i32, step: i32) -> Vec<Window> {
    if length < 1 || step < 1 || last - first + 1 < length {
        return vec![];
    }

    (first..=last - length + 1)
        .step_by(step as usize)
        .map(|start| Window {
            start,
            end: start + length - 1,
        })
        .collect()
}

/// First and last year with at least one aggregate.
pub fn year_span(aggregates: &[MonthlyAggregate]) -> Option<(i32, i32)> {
    let first = aggregates.iter().map(|a| a.year).min()?;
    let last = aggregates.iter().map(|a| a.year).max()?;

    Some((first, last))
}

/// Climatological monthly profile of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowProfile {
    pub window: Window,
    pub values: MonthlyValues,
}

impl WindowProfile {
    pub fn label(&self) -> String {
        self.window.label()
    }
}

/// Averages all aggregates inside `window` by calendar month, pooling years
/// and grid cells. Months without data stay `None`.
pub fn window_profile(aggregates: &[MonthlyAggregate], window: Window) -> WindowProfile {
    let mut means = [Mean::default(); MONTHS];

    for a in aggregates.iter().filter(|a| window.contains(a.year)) {
        if let Some(mean) = (a.month as usize)
            .checked_sub(1)
            .and_then(|idx| means.get_mut(idx))
        {
            mean.push(a.temperature);
        }
    }

    WindowProfile {
        window,
        values: means.map(|m| m.value()),
    }
}

pub fn window_profiles(aggregates: &[MonthlyAggregate], windows: &[Window]) -> Vec<WindowProfile> {
    windows
        .iter()
        .map(|w| window_profile(aggregates, *w))
        .collect()
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(year: i32, month: u32, temperature: f64) -> MonthlyAggregate {
        MonthlyAggregate {
            year,
            month,
            latitude: 48.0,
            longitude: 18.0,
            temperature,
        }
    }

    #[test]
    fn should_count_windows() {
        for (first, last, length) in [(1940, 2024, 10), (1940, 1959, 10), (2000, 2000, 1), (1940, 1949, 10)] {
            let windows = sliding_windows(first, last, length, 1);
            assert_eq!(windows.len() as i32, last - first - length + 2);
        }

        assert!(sliding_windows(1940, 1948, 10, 1).is_empty());
    }

    #[test]
    fn should_label_windows_in_order() {
        let windows = sliding_windows(1940, 2024, 10, 1);

        assert_eq!(windows.first().unwrap().label(), "1940-1949");
        assert_eq!(windows.last().unwrap().label(), "2015-2024");
        assert!(windows.windows(2).all(|w| w[0].start < w[1].start));
        assert!(windows.iter().all(|w| w.label() == format!("{}-{}", w.start, w.start + 9)));
    }

    #[test]
    fn should_step_windows() {
        let windows = sliding_windows(1940, 1959, 10, 10);

        assert_eq!(windows.iter().map(Window::label).collect::<Vec<_>>(), vec!["1940-1949", "1950-1959"]);
    }

    #[test]
    fn should_pool_years_and_cells_by_month() {
        let aggregates = vec![
            aggregate(1939, 1, 100.0),
            aggregate(1940, 1, 1.0),
            aggregate(1941, 1, 3.0),
            aggregate(1941, 6, 20.0),
            aggregate(1942, 1, 100.0),
        ];

        let profile = window_profile(&aggregates, Window { start: 1940, end: 1941 });

        assert_eq!(profile.values[0], Some(2.0));
        assert_eq!(profile.values[5], Some(20.0));
        assert_eq!(profile.values[1], None);
        assert_eq!(profile.values.iter().filter(|v| v.is_some()).count(), 2);
    }

    #[test]
    fn should_span_available_years() {
        let aggregates = vec![aggregate(1951, 1, 0.0), aggregate(1943, 2, 0.0)];

        assert_eq!(year_span(&aggregates), Some((1943, 1951)));
        assert_eq!(year_span(&[]), None);
    }
}
