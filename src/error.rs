use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Store error: {0}")]
    Store(#[from] meilisearch_sdk::errors::Error),

    #[error("Dataset error: {0}")]
    Dataset(#[from] std::io::Error),

    #[error("Dataset parse error: {0}")]
    DatasetParse(#[from] serde_json::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            AppError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Dataset { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::DatasetParse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
