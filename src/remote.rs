use anyhow::Result;
use reqwest::Client;

use crate::dashboard::RecordSource;
use crate::records::{FilterSet, Record};

/// Presentation-side record source: queries the REST API the same way a
/// browser dashboard does. Restricted dimensions become query
/// parameters; sentinel dimensions are simply omitted.
pub struct RemoteRecords {
    base_url: String,
    client: Client,
}

impl RemoteRecords {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: Client::new(),
        }
    }
}

impl RecordSource for RemoteRecords {
    async fn fetch(&self, filters: &FilterSet) -> Result<Vec<Record>> {
        let response = self
            .client
            .get(format!("{}/api/data", self.base_url))
            .query(&query_params(filters))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}

fn query_params(filters: &FilterSet) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if let Some(year) = filters.end_year {
        params.push(("year", year.to_string()));
    }

    let text_params = [
        ("topic", &filters.topic),
        ("sector", &filters.sector),
        ("region", &filters.region),
        ("pestle", &filters.pestle),
        ("source", &filters.source),
        ("swot", &filters.swot),
        ("country", &filters.country),
        ("city", &filters.city),
    ];

    for (name, selected) in text_params {
        if let Some(value) = selected {
            params.push((name, value.clone()));
        }
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Dimension, Selection};

    #[test]
    fn test_sentinel_dimensions_are_omitted() {
        assert!(query_params(&FilterSet::default()).is_empty());
    }

    #[test]
    fn test_wire_names_for_year_and_pest() {
        let mut filters = FilterSet::default();
        filters.apply(Dimension::EndYear, Selection::Year(2020));
        filters.apply(Dimension::Pestle, Selection::Text("Economic".to_string()));

        assert_eq!(
            query_params(&filters),
            [
                ("year", "2020".to_string()),
                ("pestle", "Economic".to_string()),
            ]
        );
    }
}
