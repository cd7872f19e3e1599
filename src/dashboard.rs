//! # Dashboard
//!
//! Filter state and the fetch/recompute cycle behind the charts.
//!
//! Every filter change bumps a generation counter and hands back a
//! [`FetchTicket`]. Records fetched for a ticket are applied only if the
//! ticket is still current, so a slow response from an older filter set
//! can never overwrite newer data. The ticket doubles as a cancellation
//! token: drivers check staleness before and after awaiting the fetch.
//!
//! The controller is a plain value passed by reference; there is no
//! shared global holding the active filters.

use anyhow::Result;
use tracing::error;

use crate::aggregate::{AggregateBundle, aggregate};
use crate::records::{Dimension, FilterSet, Record, Selection};

/// Anything that can resolve a filter set to its matching records: the
/// store itself, or the REST API from the outside.
pub trait RecordSource {
    fn fetch(
        &self,
        filters: &FilterSet,
    ) -> impl Future<Output = Result<Vec<Record>>> + Send;
}

/// Receipt for one pending fetch. Stale tickets are ignored on apply.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    generation: u64,
    pub filters: FilterSet,
}

#[derive(Debug, Default)]
pub struct Dashboard {
    filters: FilterSet,
    records: Vec<Record>,
    aggregates: AggregateBundle,
    generation: u64,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn aggregates(&self) -> &AggregateBundle {
        &self.aggregates
    }

    /// Ticket for the initial load (or any forced reload) of the current
    /// filter set.
    pub fn refresh(&mut self) -> FetchTicket {
        self.begin_fetch()
    }

    /// Replace one dimension's selection and start a new fetch. The
    /// previous fetch, if any, is left to finish and die stale.
    pub fn set_filter(&mut self, dimension: Dimension, selection: Selection) -> FetchTicket {
        self.filters.apply(dimension, selection);
        self.begin_fetch()
    }

    /// Restore every dimension to "no restriction" in one step: exactly
    /// one fetch, not one per dimension.
    pub fn reset_filters(&mut self) -> FetchTicket {
        self.filters = FilterSet::default();
        self.begin_fetch()
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Install a fetch result and recompute every aggregate view from
    /// scratch. Returns false without touching anything if the ticket
    /// has been superseded.
    pub fn apply(&mut self, ticket: &FetchTicket, records: Vec<Record>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }

        self.records = records;
        self.aggregates = aggregate(&self.records);
        true
    }

    /// Distinct non-empty values seen for a dimension across the loaded
    /// records, ascending. Years sort numerically, everything else
    /// lexicographically.
    pub fn available_options(&self, dimension: Dimension) -> Vec<String> {
        if dimension == Dimension::EndYear {
            let mut years: Vec<i32> = self.records.iter().filter_map(|r| r.end_year).collect();
            years.sort_unstable();
            years.dedup();
            return years.into_iter().map(|year| year.to_string()).collect();
        }

        let mut values: Vec<&str> = self
            .records
            .iter()
            .filter_map(|record| record.text_field(dimension))
            .collect();
        values.sort_unstable();
        values.dedup();
        values.into_iter().map(str::to_string).collect()
    }

    fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
            filters: self.filters.clone(),
        }
    }
}

/// Drive one fetch to completion and apply it. On transport failure the
/// error is logged and the previous bundle stays on display; there is no
/// retry. Returns whether the dashboard was updated.
pub async fn refresh<S: RecordSource>(
    dashboard: &mut Dashboard,
    source: &S,
    ticket: FetchTicket,
) -> bool {
    if !dashboard.is_current(&ticket) {
        return false;
    }

    match source.fetch(&ticket.filters).await {
        Ok(records) => dashboard.apply(&ticket, records),
        Err(e) => {
            error!("Failed to fetch records: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedSource {
        records: Vec<Record>,
    }

    impl RecordSource for FixedSource {
        async fn fetch(&self, filters: &FilterSet) -> Result<Vec<Record>> {
            Ok(self
                .records
                .iter()
                .filter(|record| filters.matches(record))
                .cloned()
                .collect())
        }
    }

    struct FailingSource;

    impl RecordSource for FailingSource {
        async fn fetch(&self, _filters: &FilterSet) -> Result<Vec<Record>> {
            Err(anyhow!("connection refused"))
        }
    }

    fn sample_records() -> Vec<Record> {
        vec![
            Record {
                region: Some("Asia".to_string()),
                country: Some("India".to_string()),
                end_year: Some(2020),
                ..Record::default()
            },
            Record {
                region: Some("Europe".to_string()),
                country: Some("Germany".to_string()),
                end_year: Some(2017),
                ..Record::default()
            },
            Record {
                region: Some("Asia".to_string()),
                country: Some("China".to_string()),
                city: Some("".to_string()),
                ..Record::default()
            },
        ]
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut dashboard = Dashboard::new();

        let stale = dashboard.refresh();
        let current = dashboard.set_filter(Dimension::Region, Selection::Text("Asia".into()));

        assert!(!dashboard.apply(&stale, sample_records()));
        assert!(dashboard.records().is_empty());

        assert!(dashboard.apply(&current, sample_records()));
        assert_eq!(dashboard.records().len(), 3);
    }

    #[test]
    fn test_late_response_cannot_overwrite_newer_data() {
        let mut dashboard = Dashboard::new();

        let older = dashboard.set_filter(Dimension::Region, Selection::Text("Asia".into()));
        let newer = dashboard.reset_filters();

        assert!(dashboard.apply(&newer, sample_records()));
        assert!(!dashboard.apply(&older, Vec::new()));
        assert_eq!(dashboard.records().len(), 3);
    }

    #[test]
    fn test_apply_recomputes_aggregates() {
        let mut dashboard = Dashboard::new();

        let ticket = dashboard.refresh();
        dashboard.apply(&ticket, sample_records());

        assert_eq!(dashboard.aggregates().regions.labels, ["Asia", "Europe"]);
        assert_eq!(dashboard.aggregates().regions.counts, [2, 1]);
    }

    #[test]
    fn test_reset_restores_every_dimension_in_one_ticket() {
        let mut dashboard = Dashboard::new();
        dashboard.set_filter(Dimension::Region, Selection::Text("Asia".into()));
        dashboard.set_filter(Dimension::EndYear, Selection::Year(2020));

        let ticket = dashboard.reset_filters();

        assert!(dashboard.filters().is_unrestricted());
        assert!(ticket.filters.is_unrestricted());
        assert!(dashboard.is_current(&ticket));
    }

    #[test]
    fn test_available_options_sorted_distinct_non_empty() {
        let mut dashboard = Dashboard::new();
        let ticket = dashboard.refresh();
        dashboard.apply(&ticket, sample_records());

        assert_eq!(dashboard.available_options(Dimension::Region), ["Asia", "Europe"]);
        assert_eq!(
            dashboard.available_options(Dimension::Country),
            ["China", "Germany", "India"]
        );
        // the record with an empty city contributes nothing
        assert!(dashboard.available_options(Dimension::City).is_empty());
    }

    #[test]
    fn test_year_options_sort_numerically() {
        let mut dashboard = Dashboard::new();
        let ticket = dashboard.refresh();
        dashboard.apply(
            &ticket,
            vec![
                Record {
                    end_year: Some(2025),
                    ..Record::default()
                },
                Record {
                    end_year: Some(998),
                    ..Record::default()
                },
                Record {
                    end_year: Some(2025),
                    ..Record::default()
                },
            ],
        );

        assert_eq!(dashboard.available_options(Dimension::EndYear), ["998", "2025"]);
    }

    #[tokio::test]
    async fn test_refresh_applies_matching_records() {
        let source = FixedSource {
            records: sample_records(),
        };
        let mut dashboard = Dashboard::new();

        let ticket = dashboard.set_filter(Dimension::Region, Selection::Text("Asia".into()));
        assert!(refresh(&mut dashboard, &source, ticket).await);

        assert_eq!(dashboard.records().len(), 2);
        assert_eq!(dashboard.aggregates().regions.labels, ["Asia"]);
    }

    #[tokio::test]
    async fn test_reset_then_options_match_the_full_list() {
        let source = FixedSource {
            records: sample_records(),
        };
        let mut dashboard = Dashboard::new();

        let filtered = dashboard.set_filter(Dimension::Region, Selection::Text("Asia".into()));
        refresh(&mut dashboard, &source, filtered).await;

        let reset = dashboard.reset_filters();
        refresh(&mut dashboard, &source, reset).await;

        for dimension in Dimension::ALL {
            let mut expected: Vec<String> = match dimension {
                Dimension::EndYear => {
                    let mut years: Vec<i32> =
                        sample_records().iter().filter_map(|r| r.end_year).collect();
                    years.sort_unstable();
                    years.dedup();
                    years.into_iter().map(|y| y.to_string()).collect()
                }
                _ => sample_records()
                    .iter()
                    .filter_map(|r| r.text_field(dimension).map(str::to_string))
                    .collect(),
            };
            expected.sort();
            expected.dedup();

            assert_eq!(dashboard.available_options(dimension), expected);
        }
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_previous_bundle() {
        let mut dashboard = Dashboard::new();
        let ticket = dashboard.refresh();
        dashboard.apply(&ticket, sample_records());
        let before = dashboard.aggregates().clone();

        let ticket = dashboard.set_filter(Dimension::Region, Selection::Text("Asia".into()));
        assert!(!refresh(&mut dashboard, &FailingSource, ticket).await);

        assert_eq!(dashboard.aggregates(), &before);
        assert_eq!(dashboard.records().len(), 3);
    }

    #[tokio::test]
    async fn test_refresh_skips_a_superseded_ticket() {
        let source = FixedSource {
            records: sample_records(),
        };
        let mut dashboard = Dashboard::new();

        let superseded = dashboard.refresh();
        let _newer = dashboard.set_filter(Dimension::Region, Selection::Text("Asia".into()));

        assert!(!refresh(&mut dashboard, &source, superseded).await);
        assert!(dashboard.records().is_empty());
    }
}
