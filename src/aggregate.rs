//! # Aggregation
//!
//! Pure chart-data computation. One pass over a record list produces
//! every view at once; nothing is cached between calls, so the bundle is
//! always a function of exactly the list it was given.
//!
//! Records with an absent or empty field simply do not contribute to the
//! views keyed on that field. Nothing here can fail.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::records::{Dimension, Record};

/// Ranking views keep the ten heaviest labels.
pub const TOP_N: usize = 10;

/// Labels with their counts, in a meaningful order: first-seen for the
/// category views, descending count for the rankings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryCounts {
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

impl CategoryCounts {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Mean metric values per distinct end year, years ascending. A year
/// with no contributing records for a metric emits 0 for that metric
/// rather than a gap, so every vector stays aligned with `years`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    pub years: Vec<i32>,
    pub intensity: Vec<f64>,
    pub likelihood: Vec<f64>,
    pub relevance: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateBundle {
    pub regions: CategoryCounts,
    pub topics: CategoryCounts,
    pub sectors: CategoryCounts,
    pub swot: CategoryCounts,
    pub top_countries: CategoryCounts,
    pub top_cities: CategoryCounts,
    pub metrics_over_time: TimeSeries,
}

/// Compute every aggregate view from a record list. Deterministic:
/// the same list in the same order yields the same bundle, including
/// tie-break order in the rankings.
pub fn aggregate(records: &[Record]) -> AggregateBundle {
    let mut regions = Counter::default();
    let mut topics = Counter::default();
    let mut sectors = Counter::default();
    let mut swot = Counter::default();
    let mut countries = Counter::default();
    let mut cities = Counter::default();
    let mut years: BTreeMap<i32, YearAccumulator> = BTreeMap::new();

    for record in records {
        if let Some(region) = record.text_field(Dimension::Region) {
            regions.bump(region);
        }
        if let Some(topic) = record.text_field(Dimension::Topic) {
            topics.bump(topic);
        }
        if let Some(sector) = record.text_field(Dimension::Sector) {
            sectors.bump(sector);
        }
        if let Some(label) = record.text_field(Dimension::Swot) {
            swot.bump(label);
        }
        if let Some(country) = record.text_field(Dimension::Country) {
            countries.bump(country);
        }
        if let Some(city) = record.text_field(Dimension::City) {
            cities.bump(city);
        }

        if let Some(year) = record.end_year {
            let accumulator = years.entry(year).or_default();
            accumulator.intensity.add(record.intensity);
            accumulator.likelihood.add(record.likelihood);
            accumulator.relevance.add(record.relevance);
        }
    }

    AggregateBundle {
        regions: regions.into_counts(),
        topics: topics.into_counts(),
        sectors: sectors.into_counts(),
        swot: swot.into_counts(),
        top_countries: countries.into_top(TOP_N),
        top_cities: cities.into_top(TOP_N),
        metrics_over_time: into_series(years),
    }
}

/// Counting pass that remembers first-seen label order.
#[derive(Default)]
struct Counter {
    index: HashMap<String, usize>,
    labels: Vec<String>,
    counts: Vec<u64>,
}

impl Counter {
    fn bump(&mut self, label: &str) {
        match self.index.get(label) {
            Some(&position) => self.counts[position] += 1,
            None => {
                self.index.insert(label.to_string(), self.labels.len());
                self.labels.push(label.to_string());
                self.counts.push(1);
            }
        }
    }

    fn into_counts(self) -> CategoryCounts {
        CategoryCounts {
            labels: self.labels,
            counts: self.counts,
        }
    }

    fn into_top(self, n: usize) -> CategoryCounts {
        let mut order: Vec<usize> = (0..self.labels.len()).collect();
        // stable sort keeps first-seen order between equal counts
        order.sort_by(|&a, &b| self.counts[b].cmp(&self.counts[a]));
        order.truncate(n);

        CategoryCounts {
            labels: order.iter().map(|&i| self.labels[i].clone()).collect(),
            counts: order.iter().map(|&i| self.counts[i]).collect(),
        }
    }
}

#[derive(Default)]
struct MetricAccumulator {
    sum: f64,
    count: u64,
}

impl MetricAccumulator {
    fn add(&mut self, value: Option<f64>) {
        if let Some(value) = value {
            self.sum += value;
            self.count += 1;
        }
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Default)]
struct YearAccumulator {
    intensity: MetricAccumulator,
    likelihood: MetricAccumulator,
    relevance: MetricAccumulator,
}

fn into_series(years: BTreeMap<i32, YearAccumulator>) -> TimeSeries {
    let mut series = TimeSeries::default();

    for (year, accumulator) in years {
        series.years.push(year);
        series.intensity.push(accumulator.intensity.mean());
        series.likelihood.push(accumulator.likelihood.mean());
        series.relevance.push(accumulator.relevance.mean());
    }

    series
}
