//! API Routes module for the Movie Scraper API
//!
//! This module contains all HTTP route handlers. The `/movies`,
//! `/detail-movies` and `/api/*` routes extract in strict mode; `/watch-movies`
//! and the `/api/v2/*` routes extract leniently.

use std::sync::Arc;

use actix_web::{web, HttpResponse, Responder};
use tracing::info;
use utoipa::OpenApi;

use crate::config::Config;
use crate::constants::{endpoints, resolve_paginated_url};
use crate::error::{AppError, AppResult};
use crate::models::{
    DetailRecord, EpisodeLink, HealthStatus, HomeListing, ListRequest, ListingRecord, MoviePage,
    NamedLink, PageLink, PaginationSummary, Rating, SearchRequest, Server, UrlQuery, WatchRecord,
};
use crate::parser::schema::ExtractionMode;
use crate::parser::{
    parse_detail, parse_home, parse_list_page, parse_movie_cards, parse_search_page, parse_watch,
};
use crate::scraper::PageFetcher;

/// Application state shared across handlers
pub struct AppState {
    pub config: Config,
    pub fetcher: Arc<dyn PageFetcher>,
}

/// Fetch a page through the configured fetcher
async fn fetch_page(data: &AppState, url: &str) -> AppResult<String> {
    info!("Fetching URL: {}", url);
    let html = data.fetcher.fetch_html(url).await?;
    info!("Fetched {} bytes of HTML", html.len());
    Ok(html)
}

/// Pull the required `url` query parameter
fn required_url(query: &UrlQuery) -> AppResult<&str> {
    match query.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(AppError::MissingParameter("url")),
    }
}

/// GET / - Greeting
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("Hello World")
}

/// GET /health - Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "service",
    responses((status = 200, description = "Service is up", body = HealthStatus))
)]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthStatus::healthy())
}

/// GET /movies - Movie tiles of any listing page
///
/// Query parameter: url (required) - listing page to scrape
#[utoipa::path(
    get,
    path = "/api/movies",
    tag = "movies",
    params(UrlQuery),
    responses(
        (status = 200, description = "Movie tiles in page order", body = Vec<ListingRecord>),
        (status = 400, description = "URL is required", body = String),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn get_movies(
    data: web::Data<AppState>,
    query: web::Query<UrlQuery>,
) -> AppResult<HttpResponse> {
    let url = required_url(&query)?;
    let html = fetch_page(&data, url).await?;
    let movies = parse_movie_cards(&html, url, ExtractionMode::Strict)?;
    info!("Parsed {} movies", movies.len());
    Ok(HttpResponse::Ok().json(movies))
}

/// GET /api/v2/movies - Latest and most viewed movies from the home page
#[utoipa::path(
    get,
    path = "/api/v2/movies",
    tag = "movies",
    responses(
        (status = 200, description = "Home page blocks", body = HomeListing),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn get_home_movies(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let url = endpoints::home(&data.config.base_url);
    let html = fetch_page(&data, &url).await?;
    let home = parse_home(&html, &url, ExtractionMode::Lenient)?;
    info!(
        "Parsed {} latest and {} top-view movies",
        home.latest.len(),
        home.top_view.len()
    );
    Ok(HttpResponse::Ok().json(home))
}

async fn scrape_detail(data: &AppState, query: &UrlQuery, mode: ExtractionMode) -> AppResult<HttpResponse> {
    let url = required_url(query)?;
    let html = fetch_page(data, url).await?;
    let detail = parse_detail(&html, mode)?;
    Ok(HttpResponse::Ok().json(detail))
}

/// GET /api/detail-movie - Detail page of a title (strict extraction)
#[utoipa::path(
    get,
    path = "/api/detail-movie",
    tag = "movies",
    params(UrlQuery),
    responses(
        (status = 200, description = "Title metadata", body = DetailRecord),
        (status = 400, description = "URL is required", body = String),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn get_detail_movie(
    data: web::Data<AppState>,
    query: web::Query<UrlQuery>,
) -> AppResult<HttpResponse> {
    scrape_detail(&data, &query, ExtractionMode::Strict).await
}

/// GET /api/v2/detail-movie - Detail page of a title (lenient extraction)
#[utoipa::path(
    get,
    path = "/api/v2/detail-movie",
    tag = "movies",
    params(UrlQuery),
    responses(
        (status = 200, description = "Title metadata", body = DetailRecord),
        (status = 400, description = "URL is required", body = String),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn get_detail_movie_v2(
    data: web::Data<AppState>,
    query: web::Query<UrlQuery>,
) -> AppResult<HttpResponse> {
    scrape_detail(&data, &query, ExtractionMode::Lenient).await
}

async fn scrape_watch(data: &AppState, query: &UrlQuery, mode: ExtractionMode) -> AppResult<HttpResponse> {
    let url = required_url(query)?;
    let html = fetch_page(data, url).await?;
    let watch = parse_watch(&html, mode)?;
    info!("Parsed {} servers", watch.servers.len());
    Ok(HttpResponse::Ok().json(watch))
}

/// GET /api/watch-movie - Streaming page (strict extraction)
#[utoipa::path(
    get,
    path = "/api/watch-movie",
    tag = "movies",
    params(UrlQuery),
    responses(
        (status = 200, description = "Servers and metadata", body = WatchRecord),
        (status = 400, description = "URL is required", body = String),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn get_watch_movie(
    data: web::Data<AppState>,
    query: web::Query<UrlQuery>,
) -> AppResult<HttpResponse> {
    scrape_watch(&data, &query, ExtractionMode::Strict).await
}

/// GET /watch-movies - Streaming page, tolerating pages without a rating block
#[utoipa::path(
    get,
    path = "/watch-movies",
    tag = "movies",
    params(UrlQuery),
    responses(
        (status = 200, description = "Servers and metadata", body = WatchRecord),
        (status = 400, description = "URL is required", body = String),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn get_watch_movies(
    data: web::Data<AppState>,
    query: web::Query<UrlQuery>,
) -> AppResult<HttpResponse> {
    scrape_watch(&data, &query, ExtractionMode::Lenient).await
}

/// GET /api/v2/watch-movie - Streaming page (lenient extraction)
#[utoipa::path(
    get,
    path = "/api/v2/watch-movie",
    tag = "movies",
    params(UrlQuery),
    responses(
        (status = 200, description = "Servers and metadata", body = WatchRecord),
        (status = 400, description = "URL is required", body = String),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn get_watch_movie_v2(
    data: web::Data<AppState>,
    query: web::Query<UrlQuery>,
) -> AppResult<HttpResponse> {
    scrape_watch(&data, &query, ExtractionMode::Lenient).await
}

async fn scrape_search(data: &AppState, body: &SearchRequest, mode: ExtractionMode) -> AppResult<HttpResponse> {
    let base_url = &data.config.base_url;
    let url = resolve_paginated_url(
        endpoints::search(base_url, &body.movie),
        body.last.as_deref(),
        body.first.as_deref(),
        body.page.map(|page| endpoints::search_page(base_url, &body.movie, page)),
    );
    info!("Searching for {:?}", body.movie);

    let html = fetch_page(data, &url).await?;
    let page = parse_search_page(&html, &url, mode)?;
    info!("Found {} movies", page.movies.len());
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/search-movies - Search results with pagination
#[utoipa::path(
    post,
    path = "/api/search-movies",
    tag = "movies",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching movies", body = MoviePage),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn search_movies(
    data: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> AppResult<HttpResponse> {
    scrape_search(&data, &body, ExtractionMode::Strict).await
}

/// POST /api/v2/search-movies - Search results with pagination (lenient)
#[utoipa::path(
    post,
    path = "/api/v2/search-movies",
    tag = "movies",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Matching movies", body = MoviePage),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn search_movies_v2(
    data: web::Data<AppState>,
    body: web::Json<SearchRequest>,
) -> AppResult<HttpResponse> {
    scrape_search(&data, &body, ExtractionMode::Lenient).await
}

async fn scrape_list(data: &AppState, body: &ListRequest, mode: ExtractionMode) -> AppResult<HttpResponse> {
    let base_url = &data.config.base_url;
    let url = resolve_paginated_url(
        endpoints::movie_list(base_url),
        body.last.as_deref(),
        body.first.as_deref(),
        body.page.map(|page| endpoints::movie_list_page(base_url, page)),
    );

    let html = fetch_page(data, &url).await?;
    let page = parse_list_page(&html, &url, mode)?;
    info!("Parsed {} movies", page.movies.len());
    Ok(HttpResponse::Ok().json(page))
}

/// POST /api/list-movies - Full movie list with pagination
#[utoipa::path(
    post,
    path = "/api/list-movies",
    tag = "movies",
    request_body = ListRequest,
    responses(
        (status = 200, description = "Movies on the requested page", body = MoviePage),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn list_movies(
    data: web::Data<AppState>,
    body: web::Json<ListRequest>,
) -> AppResult<HttpResponse> {
    scrape_list(&data, &body, ExtractionMode::Strict).await
}

/// POST /api/v2/list-movies - Full movie list with pagination (lenient)
#[utoipa::path(
    post,
    path = "/api/v2/list-movies",
    tag = "movies",
    request_body = ListRequest,
    responses(
        (status = 200, description = "Movies on the requested page", body = MoviePage),
        (status = 500, description = "Something went wrong", body = String)
    )
)]
pub async fn list_movies_v2(
    data: web::Data<AppState>,
    body: web::Json<ListRequest>,
) -> AppResult<HttpResponse> {
    scrape_list(&data, &body, ExtractionMode::Lenient).await
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Movie Scraper API",
        version = "0.1.0",
        description = "API for scraping movie listings, details and streaming servers",
        license(name = "MIT")
    ),
    paths(
        health_check,
        get_movies,
        get_home_movies,
        get_detail_movie,
        get_detail_movie_v2,
        get_watch_movies,
        get_watch_movie,
        get_watch_movie_v2,
        search_movies,
        search_movies_v2,
        list_movies,
        list_movies_v2
    ),
    components(
        schemas(
            ListingRecord,
            DetailRecord,
            WatchRecord,
            Rating,
            NamedLink,
            Server,
            EpisodeLink,
            PaginationSummary,
            PageLink,
            MoviePage,
            HomeListing,
            SearchRequest,
            ListRequest,
            HealthStatus
        )
    ),
    tags(
        (name = "movies", description = "Movie scraping endpoints"),
        (name = "service", description = "Service status")
    )
)]
pub struct ApiDoc;

/// Configure API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/health", web::get().to(health_check))
        .route("/movies", web::get().to(get_movies))
        .route("/detail-movies", web::get().to(get_detail_movie))
        .route("/watch-movies", web::get().to(get_watch_movies))
        .service(
            web::scope("/api/v2")
                .route("/movies", web::get().to(get_home_movies))
                .route("/detail-movie", web::get().to(get_detail_movie_v2))
                .route("/watch-movie", web::get().to(get_watch_movie_v2))
                .route("/search-movies", web::post().to(search_movies_v2))
                .route("/list-movies", web::post().to(list_movies_v2)),
        )
        .service(
            web::scope("/api")
                .route("/movies", web::get().to(get_movies))
                .route("/detail-movie", web::get().to(get_detail_movie))
                .route("/watch-movie", web::get().to(get_watch_movie))
                .route("/search-movies", web::post().to(search_movies))
                .route("/list-movies", web::post().to(list_movies)),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::fixtures::*;
    use crate::scraper::ScraperError;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const BASE: &str = "https://site.test";

    /// Serves canned pages and records every requested URL
    #[derive(Default)]
    struct FixtureFetcher {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl FixtureFetcher {
        fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        async fn fetch_html(&self, url: &str) -> Result<String, ScraperError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or(ScraperError::HttpError(404))
        }
    }

    fn state(fetcher: Arc<FixtureFetcher>) -> web::Data<AppState> {
        let config = Config::from_lookup(|key| (key == "BASE_URL").then(|| BASE.to_string())).unwrap();
        web::Data::new(AppState { config, fetcher })
    }

    fn query_url(path: &str, url: &str) -> String {
        format!("{}?url={}", path, urlencoding::encode(url))
    }

    #[actix_rt::test]
    async fn test_index_greeting() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(Arc::new(FixtureFetcher::default())))
                .configure(configure_routes),
        )
        .await;
        let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(actix_test::read_body(resp).await, "Hello World");
    }

    #[actix_rt::test]
    async fn test_movies_requires_url() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(Arc::new(FixtureFetcher::default())))
                .configure(configure_routes),
        )
        .await;
        for path in ["/movies", "/api/movies", "/detail-movies", "/api/v2/watch-movie?url="] {
            let resp = actix_test::call_service(&app, actix_test::TestRequest::get().uri(path).to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", path);
            assert_eq!(actix_test::read_body(resp).await, "URL is required");
        }
    }

    #[actix_rt::test]
    async fn test_movies_returns_flat_array() {
        let page_url = "https://site.test/genre/action/";
        let fetcher = Arc::new(FixtureFetcher::default().with_page(page_url, LISTING_PAGE));
        let app = actix_test::init_service(App::new().app_data(state(fetcher)).configure(configure_routes)).await;

        let req = actix_test::TestRequest::get().uri(&query_url("/movies", page_url)).to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        let movies = body.as_array().unwrap();
        assert_eq!(movies.len(), 3);
        assert_eq!(movies[0]["title"], "Dune: Part Two");
        assert_eq!(movies[1]["episodeInfo"]["status"], "OnGoing");
    }

    #[actix_rt::test]
    async fn test_fetch_failure_is_generic_500() {
        let app = actix_test::init_service(
            App::new()
                .app_data(state(Arc::new(FixtureFetcher::default())))
                .configure(configure_routes),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri(&query_url("/api/detail-movie", "https://site.test/missing/"))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(actix_test::read_body(resp).await, "Something went wrong");
    }

    #[actix_rt::test]
    async fn test_watch_page_without_rating() {
        let page_url = "https://site.test/movie/no-rating/watch/";
        let html = r#"<iframe id="iframe-embed" src="https://player.test/e/nr"></iframe>
            <div class="mvic-info"><div class="mvic-tagline2"><h3>No Rating</h3></div></div>
            <div id="server-list"><div class="server-wrapper">
                <div class="server" data-iframe="https://player.test/e/nr"></div>
                <div class="server-title"><small>Server 1</small></div>
            </div></div>"#;
        let fetcher = Arc::new(FixtureFetcher::default().with_page(page_url, html));
        let app = actix_test::init_service(App::new().app_data(state(fetcher)).configure(configure_routes)).await;

        for path in ["/watch-movies", "/api/v2/watch-movie"] {
            let req = actix_test::TestRequest::get().uri(&query_url(path, page_url)).to_request();
            let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
            assert_eq!(body["title"], "No Rating", "{}", path);
            assert_eq!(body["mainServer"], "https://player.test/e/nr");
            assert_eq!(body["servers"][0]["description"], "Server 1");
            assert!(body["rating"]["value"].is_null());
        }

        let req = actix_test::TestRequest::get()
            .uri(&query_url("/api/watch-movie", page_url))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_rt::test]
    async fn test_relative_tile_links_resolve_against_page() {
        let page_url = "https://site.test/genre/drama/";
        let html = r#"<div class="movies-list-wrap"><div class="tab-content"><div class="movies-list-full">
            <div class="ml-item"><a href="/movie/past-lives/" data-url="/ajax/pl"><img src="/p/past-lives.jpg" /></a></div>
        </div></div></div>"#;
        let fetcher = Arc::new(FixtureFetcher::default().with_page(page_url, html));
        let app = actix_test::init_service(App::new().app_data(state(fetcher)).configure(configure_routes)).await;

        let req = actix_test::TestRequest::get().uri(&query_url("/movies", page_url)).to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["imageUrl"], "https://site.test/p/past-lives.jpg");
        assert_eq!(body[0]["detailUrl"], "https://site.test/movie/past-lives/");
    }

    #[actix_rt::test]
    async fn test_detail_and_watch_routes() {
        let detail_url = "https://site.test/movie/dune-part-two/";
        let watch_url = "https://site.test/movie/dune-part-two/watch/";
        let fetcher = Arc::new(
            FixtureFetcher::default()
                .with_page(detail_url, DETAIL_PAGE)
                .with_page(watch_url, WATCH_PAGE),
        );
        let app = actix_test::init_service(App::new().app_data(state(fetcher)).configure(configure_routes)).await;

        let req = actix_test::TestRequest::get()
            .uri(&query_url("/api/v2/detail-movie", detail_url))
            .to_request();
        let detail: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(detail["title"], "Dune: Part Two");
        assert_eq!(detail["releaseDate"], "2024-02-27");
        assert_eq!(detail["genres"][1]["name"], "Sci-Fi");

        let req = actix_test::TestRequest::get()
            .uri(&query_url("/api/watch-movie", watch_url))
            .to_request();
        let watch: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(watch["mainServer"], "https://player.test/e/abc");
        assert_eq!(watch["episodes"][1]["number"], "2");
    }

    #[actix_rt::test]
    async fn test_home_movies_uses_base_url() {
        let fetcher = Arc::new(FixtureFetcher::default().with_page(BASE, HOME_PAGE));
        let app = actix_test::init_service(
            App::new()
                .app_data(state(fetcher.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::get().uri("/api/v2/movies").to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["latest"].as_array().unwrap().len(), 2);
        assert_eq!(body["topView"][0]["title"], "Top One");
        assert_eq!(*fetcher.requested.lock().unwrap(), vec![BASE.to_string()]);
    }

    #[actix_rt::test]
    async fn test_search_page_overrides_first_and_last() {
        let page_url = "https://site.test/page/2/?s=dune";
        let fetcher = Arc::new(FixtureFetcher::default().with_page(page_url, LISTING_PAGE));
        let app = actix_test::init_service(
            App::new()
                .app_data(state(fetcher.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = actix_test::TestRequest::post()
            .uri("/api/search-movies")
            .set_json(serde_json::json!({"movie": "dune", "last": "L", "first": "F", "page": 2}))
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["movies"].as_array().unwrap().len(), 3);
        assert_eq!(body["pagination"]["currentPage"], 1);
        assert_eq!(*fetcher.requested.lock().unwrap(), vec![page_url.to_string()]);
    }

    #[actix_rt::test]
    async fn test_search_no_results() {
        let search_url = "https://site.test/?s=zzzz";
        let fetcher = Arc::new(FixtureFetcher::default().with_page(search_url, NO_RESULTS_PAGE));
        let app = actix_test::init_service(App::new().app_data(state(fetcher)).configure(configure_routes)).await;

        let req = actix_test::TestRequest::post()
            .uri("/api/v2/search-movies")
            .set_json(serde_json::json!({"movie": "zzzz"}))
            .to_request();
        let body: serde_json::Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body, serde_json::json!({"movies": [], "pagination": {}}));
    }

    #[actix_rt::test]
    async fn test_list_movies_precedence() {
        let fetcher = Arc::new(
            FixtureFetcher::default()
                .with_page("https://site.test/movies/", LISTING_PAGE)
                .with_page("https://site.test/movies/page/87/", LISTING_PAGE)
                .with_page("https://site.test/movies/page/5/", LISTING_PAGE),
        );
        let app = actix_test::init_service(
            App::new()
                .app_data(state(fetcher.clone()))
                .configure(configure_routes),
        )
        .await;

        let bodies = [
            serde_json::json!({}),
            serde_json::json!({"last": "https://site.test/movies/page/87/"}),
            serde_json::json!({"last": "https://site.test/movies/page/87/", "first": "https://site.test/movies/"}),
            serde_json::json!({"first": "https://site.test/movies/", "page": "5"}),
        ];
        for body in bodies {
            let req = actix_test::TestRequest::post()
                .uri("/api/v2/list-movies")
                .set_json(body)
                .to_request();
            let resp = actix_test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        assert_eq!(
            *fetcher.requested.lock().unwrap(),
            vec![
                "https://site.test/movies/".to_string(),
                "https://site.test/movies/page/87/".to_string(),
                "https://site.test/movies/".to_string(),
                "https://site.test/movies/page/5/".to_string(),
            ]
        );
    }

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/api/v2/search-movies"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/movies"));
        assert!(paths.iter().any(|p| p.as_str() == "/watch-movies"));
    }
}
