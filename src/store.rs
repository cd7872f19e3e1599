//! # Record Store
//!
//! Meilisearch index holding the imported records.
//!
//! ## Schema
//! - One index for all records
//! - Documents are the loose [`Record`] shape plus a dense `id` primary key
//!   assigned at import time
//! - Every filter dimension is a filterable attribute
//!
//! ## Retrieval
//! The dashboard only ever asks for exact-equality matches, so a fetch is
//! the documents route with a conjunctive filter expression. No ranking,
//! no pagination: the whole matching set comes back in one call.

use std::sync::Arc;

use meilisearch_sdk::{
    client::Client, documents::DocumentsQuery, errors::Error, settings::Settings,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::dashboard::RecordSource;
use crate::records::{FilterSet, Record};

pub const RECORD_INDEX: &str = "records";
pub const RECORD_ID: &str = "id";

pub const FILTERABLE_FIELDS: [&str; 9] = [
    "end_year", "topic", "sector", "region", "pestle", "source", "swot", "country", "city",
];

/// Upper bound on one retrieval. Far above the dataset size; the
/// documents route needs an explicit limit.
const FETCH_LIMIT: usize = 100_000;

#[derive(Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: u32,
    #[serde(flatten)]
    pub record: Record,
}

/// Build the store client and push index settings. An unreachable store
/// is logged and tolerated: the server keeps listening and later queries
/// surface the failure per request.
pub async fn init_store(meili_url: &str, meili_admin_key: &str) -> Arc<Client> {
    let client =
        Arc::new(Client::new(meili_url, Some(meili_admin_key)).expect("Store misconfigured!"));

    match apply_settings(&client).await {
        Ok(()) => info!("Record index settings applied"),
        Err(e) => error!("Record store unreachable, continuing without it: {e}"),
    }

    client
}

pub async fn apply_settings(client: &Client) -> Result<(), Error> {
    client
        .index(RECORD_INDEX)
        .set_settings(&init_settings())
        .await?;

    Ok(())
}

fn init_settings() -> Settings {
    Settings::new().with_filterable_attributes(FILTERABLE_FIELDS)
}

/// Insert-many. Ids are dense positions in the file, so re-importing
/// replaces rather than duplicates. Waits for the store to finish before
/// reporting the count.
pub async fn insert_records(client: &Client, records: Vec<Record>) -> Result<usize, Error> {
    let stored: Vec<StoredRecord> = records
        .into_iter()
        .enumerate()
        .map(|(id, record)| StoredRecord {
            id: id as u32,
            record,
        })
        .collect();

    client
        .index(RECORD_INDEX)
        .add_or_replace(&stored, Some(RECORD_ID))
        .await?
        .wait_for_completion(client, None, None)
        .await?;

    Ok(stored.len())
}

/// Exact-match retrieval for a filter set.
pub async fn fetch_records(client: &Client, filters: &FilterSet) -> Result<Vec<Record>, Error> {
    let index = client.index(RECORD_INDEX);
    let expression = filter_expression(filters);

    let mut query = DocumentsQuery::new(&index);
    query.with_limit(FETCH_LIMIT);
    if !expression.is_empty() {
        query.with_filter(&expression);
    }

    let results = query.execute::<StoredRecord>().await?;

    Ok(results
        .results
        .into_iter()
        .map(|stored| stored.record)
        .collect())
}

/// Conjunction of equality clauses, one per restricted dimension. Empty
/// when the filter set is unrestricted.
pub fn filter_expression(filters: &FilterSet) -> String {
    let mut clauses = Vec::new();

    if let Some(year) = filters.end_year {
        clauses.push(format!("end_year = {year}"));
    }

    let text_fields = [
        ("topic", &filters.topic),
        ("sector", &filters.sector),
        ("region", &filters.region),
        ("pestle", &filters.pestle),
        ("source", &filters.source),
        ("swot", &filters.swot),
        ("country", &filters.country),
        ("city", &filters.city),
    ];

    for (field, selected) in text_fields {
        if let Some(value) = selected {
            clauses.push(format!("{field} = {}", quoted(value)));
        }
    }

    clauses.join(" AND ")
}

fn quoted(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// The store seen through the dashboard's fetch seam.
pub struct StoreRecords {
    client: Arc<Client>,
}

impl StoreRecords {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }
}

impl RecordSource for StoreRecords {
    async fn fetch(&self, filters: &FilterSet) -> anyhow::Result<Vec<Record>> {
        Ok(fetch_records(&self.client, filters).await?)
    }
}
