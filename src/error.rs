//! Global error handling module for the Movie Scraper API
//!
//! This module provides a unified error type for route handlers and converts
//! it into the plain-text responses the API exposes. Error details are logged
//! server-side and never sent to the client.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::parser::schema::ExtractError;
use crate::scraper::ScraperError;

/// Body sent for a missing `url` parameter
pub const MISSING_URL_MESSAGE: &str = "URL is required";
/// Body sent for every scrape failure
pub const FAILURE_MESSAGE: &str = "Something went wrong";

/// Application-wide error type that unifies all error sources
#[derive(Debug, Error)]
pub enum AppError {
    /// A required query parameter was absent
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Fetching the page failed (network, HTTP status, browser)
    #[error("Scraping error: {0}")]
    Scraping(#[from] ScraperError),

    /// The page could not be turned into a record
    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_) => StatusCode::BAD_REQUEST,
            AppError::Scraping(_) | AppError::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the message sent to the client
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::MissingParameter(_) => MISSING_URL_MESSAGE,
            AppError::Scraping(_) | AppError::Extraction(_) => FAILURE_MESSAGE,
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("{}", self);
        }
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.user_message())
    }
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
