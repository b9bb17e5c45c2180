//! Constants module for the Movie Scraper API
//!
//! Contains endpoint URL builders that use the base URL from configuration,
//! plus the resolution rules for paginated search and list targets.

/// URL builder functions for all endpoints
pub mod endpoints {
    /// Home page URL
    pub fn home(base_url: &str) -> String {
        base_url.to_string()
    }

    /// Search URL with query parameter
    pub fn search(base_url: &str, query: &str) -> String {
        format!("{}/?s={}", base_url, urlencoding::encode(query))
    }

    /// Search URL for a given result page
    pub fn search_page(base_url: &str, query: &str, page: u32) -> String {
        format!("{}/page/{}/?s={}", base_url, page, urlencoding::encode(query))
    }

    /// Full movie list URL
    pub fn movie_list(base_url: &str) -> String {
        format!("{}/movies/", base_url)
    }

    /// Movie list URL for a given page
    pub fn movie_list_page(base_url: &str, page: u32) -> String {
        format!("{}/movies/page/{}/", base_url, page)
    }
}

/// Pick the target URL for a paginated request.
///
/// Overrides are applied in order `last`, `first`, `page`, each one
/// replacing the previous value, so a page number beats both links and
/// `first` beats `last`.
pub fn resolve_paginated_url(
    default_url: String,
    last: Option<&str>,
    first: Option<&str>,
    page_url: Option<String>,
) -> String {
    let mut url = default_url;
    if let Some(last) = last.filter(|s| !s.is_empty()) {
        url = last.to_string();
    }
    if let Some(first) = first.filter(|s| !s.is_empty()) {
        url = first.to_string();
    }
    if let Some(page_url) = page_url {
        url = page_url;
    }
    url
}
