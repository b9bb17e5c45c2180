//! Data models for the Movie Scraper API
//!
//! This module contains the request bodies and response envelopes used by the
//! routes. Scraped records live in the parser module and are re-exported here.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use utoipa::{IntoParams, ToSchema};

// Re-export parser models for convenience
pub use crate::parser::pagination::{PageLink, PaginationSummary};
pub use crate::parser::schema::NamedLink;
pub use crate::parser::{
    DetailRecord, EpisodeInfo, EpisodeLink, EpisodeStatus, ListingRecord, Rating, Server,
    WatchRecord,
};

/// Query string carrying the page to scrape
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct UrlQuery {
    /// Absolute URL of the page on the target site
    pub url: Option<String>,
}

/// Body of the search endpoint
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SearchRequest {
    /// Search keyword
    #[serde(default)]
    pub movie: String,
    /// "Last" link taken from a previous pagination summary
    pub last: Option<String>,
    /// "First" link taken from a previous pagination summary
    pub first: Option<String>,
    /// Page number, wins over both links
    #[serde(default, deserialize_with = "deserialize_page")]
    #[schema(value_type = Option<u32>)]
    pub page: Option<u32>,
}

/// Body of the movie list endpoint
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ListRequest {
    pub last: Option<String>,
    pub first: Option<String>,
    #[serde(default, deserialize_with = "deserialize_page")]
    #[schema(value_type = Option<u32>)]
    pub page: Option<u32>,
}

/// Accept the page number as a JSON number or a numeric string
fn deserialize_page<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PageValue {
        Number(u32),
        Text(String),
    }

    match Option::<PageValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PageValue::Number(n)) => Ok(Some(n)),
        Some(PageValue::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(PageValue::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid page number: {s:?}"))),
    }
}

/// Home page blocks
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HomeListing {
    /// Latest additions
    pub latest: Vec<ListingRecord>,
    /// Most viewed
    pub top_view: Vec<ListingRecord>,
}

/// A page of movies with its reconstructed paginator
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct MoviePage {
    pub movies: Vec<ListingRecord>,
    /// `{}` when the page has no paginator
    #[serde(serialize_with = "serialize_pagination")]
    #[schema(value_type = Object)]
    pub pagination: Option<PaginationSummary>,
}

impl MoviePage {
    /// No movies and no pagination
    pub fn empty() -> Self {
        Self {
            movies: Vec::new(),
            pagination: None,
        }
    }
}

fn serialize_pagination<S>(pagination: &Option<PaginationSummary>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::SerializeMap;

    match pagination {
        Some(summary) => summary.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

/// Health check payload
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
}

impl HealthStatus {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_full_body() {
        let body: SearchRequest = serde_json::from_str(
            r#"{"movie": "dune", "last": "L", "first": "F", "page": 2}"#,
        )
        .unwrap();
        assert_eq!(body.movie, "dune");
        assert_eq!(body.last.as_deref(), Some("L"));
        assert_eq!(body.first.as_deref(), Some("F"));
        assert_eq!(body.page, Some(2));
    }

    #[test]
    fn test_page_as_string() {
        let body: ListRequest = serde_json::from_str(r#"{"page": "3"}"#).unwrap();
        assert_eq!(body.page, Some(3));

        let body: ListRequest = serde_json::from_str(r#"{"page": ""}"#).unwrap();
        assert_eq!(body.page, None);

        assert!(serde_json::from_str::<ListRequest>(r#"{"page": "three"}"#).is_err());
    }

    #[test]
    fn test_list_request_empty_body() {
        let body: ListRequest = serde_json::from_str("{}").unwrap();
        assert!(body.last.is_none());
        assert!(body.first.is_none());
        assert!(body.page.is_none());
    }

    #[test]
    fn test_empty_movie_page_serialization() {
        let json = serde_json::to_string(&MoviePage::empty()).unwrap();
        assert_eq!(json, r#"{"movies":[],"pagination":{}}"#);
    }

    #[test]
    fn test_home_listing_serialization() {
        let home = HomeListing {
            latest: Vec::new(),
            top_view: Vec::new(),
        };
        let json = serde_json::to_value(&home).unwrap();
        assert_eq!(json, serde_json::json!({"latest": [], "topView": []}));
    }

    #[test]
    fn test_health_status() {
        let health = HealthStatus::healthy();
        assert_eq!(health.status, "healthy");
        assert!(!health.timestamp.is_empty());
    }
}
