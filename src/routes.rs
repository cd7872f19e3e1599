use std::{fs::read_to_string, sync::Arc};

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::AppError,
    records::{FilterSet, Record},
    state::AppState,
    store::{apply_settings, fetch_records, insert_records},
};

pub const ALL: &str = "all";

/// Query parameters for `GET /api/data`. Absent or `"all"` means no
/// restriction on that dimension.
#[derive(Deserialize, Default)]
pub struct DataQuery {
    pub year: Option<String>,
    pub topic: Option<String>,
    pub sector: Option<String>,
    pub region: Option<String>,
    pub pestle: Option<String>,
    pub source: Option<String>,
    pub swot: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

impl DataQuery {
    pub fn into_filters(self) -> Result<FilterSet, AppError> {
        Ok(FilterSet {
            end_year: parse_year(self.year)?,
            topic: selected(self.topic),
            sector: selected(self.sector),
            region: selected(self.region),
            pestle: selected(self.pestle),
            source: selected(self.source),
            swot: selected(self.swot),
            country: selected(self.country),
            city: selected(self.city),
        })
    }
}

fn selected(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.is_empty() && value != ALL)
}

fn parse_year(raw: Option<String>) -> Result<Option<i32>, AppError> {
    match selected(raw) {
        None => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|_| AppError::MalformedPayload),
    }
}

pub async fn data_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DataQuery>,
) -> Result<Json<Vec<Record>>, AppError> {
    let filters = params.into_filters()?;
    let records = fetch_records(&state.meili_client, &filters).await?;

    Ok(Json(records))
}

/// One-shot bulk load of the configured dataset file into the store.
pub async fn import_handler(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    let raw = read_to_string(&state.config.dataset_path)?;
    let records: Vec<Record> = serde_json::from_str(&raw)?;

    // settings first so a fresh index is filterable before it has documents
    apply_settings(&state.meili_client).await?;
    let inserted = insert_records(&state.meili_client, records).await?;

    info!("Imported {inserted} records from {}", state.config.dataset_path);
    Ok(format!("{inserted} documents were inserted successfully."))
}
