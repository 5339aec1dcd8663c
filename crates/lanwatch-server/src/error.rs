//! Error types for the lanwatch server, with their HTTP mapping.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use lanwatch_core::LanwatchError;
use lanwatch_discover::DiscoverError;
use lanwatch_registry::RegistryError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Discover(#[from] DiscoverError),

    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Configuration error: {0}")]
    Config(#[from] LanwatchError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Discover(DiscoverError::InvalidRange { .. }) => StatusCode::BAD_REQUEST,
            Self::ScanInProgress => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
