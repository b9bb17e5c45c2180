//! Movie Scraper API Library
//!
//! This library provides functionality for scraping movie listings, detail
//! pages and streaming pages from a movies-list themed site and exposing them
//! through REST API endpoints.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod parser;
pub mod routes;
pub mod scraper;
