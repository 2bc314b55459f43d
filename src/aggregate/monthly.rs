use std::collections::BTreeMap;

use ordered_float::OrderedFloat;

use super::Mean;
use crate::reading::Observation;

/// Mean temperature of one grid cell in one month of one year.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthlyAggregate {
    pub year: i32,
    pub month: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub temperature: f64,
}

type CellMonth = (i32, u32, OrderedFloat<f64>, OrderedFloat<f64>);

/// Groups observations by (year, month, latitude, longitude) and averages each
/// bucket. Observations without a temperature are ignored; a bucket with none
/// left produces no aggregate. Output is sorted by the grouping key.
pub fn monthly_aggregates(observations: &[Observation]) -> Vec<MonthlyAggregate> {
    let mut buckets: BTreeMap<CellMonth, Mean> = BTreeMap::new();

    for obs in observations {
        let Some(temperature) = obs.temperature else {
            continue;
        };
        let key = (
            obs.year(),
            obs.month(),
            OrderedFloat(obs.latitude),
            OrderedFloat(obs.longitude),
        );
        buckets.entry(key).or_default().push(temperature);
    }

    buckets
        .into_iter()
        .filter_map(|((year, month, lat, lon), mean)| {
            mean.value().map(|temperature| MonthlyAggregate {
                year,
                month,
                latitude: lat.into_inner(),
                longitude: lon.into_inner(),
                temperature,
            })
        })
        .collect()
}

// -- Tests -------------------------------------------------------------------
