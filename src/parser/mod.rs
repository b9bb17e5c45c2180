//! Parser module for extracting structured data from HTML
//!
//! This module turns pages of the movies-list theme into listing, detail and
//! watch records. Every page is described by a field table from [`schema`]
//! and read with [`schema::extract_fields`]; pagination lives in
//! [`pagination`].

pub mod pagination;
pub mod schema;

use reqwest::Url;
use scraper::{ElementRef, Html};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

use crate::models::{HomeListing, MoviePage};
use pagination::extract_pagination;
use schema::{
    digits_only, element_text, extract_fields, extract_links, resolve_url, select_all, select_first,
    ExtractError, ExtractionMode, FieldSpec, NamedLink, Source, Transform,
};

/// Movie tiles of the main tabbed grid on arbitrary listing pages
pub const LISTING_CARDS: &str = ".movies-list-wrap .tab-content .movies-list-full .ml-item";
/// Movie tiles on search and movie list pages
pub const GRID_CARDS: &str = ".movies-list-wrap .movies-list-full .ml-item";
/// Latest-movies block on the home page
pub const LATEST_CARDS: &str = ".movies-list-wrap.mlw-latestmovie .ml-item";
/// Most-viewed block on the home page
pub const TOP_VIEW_CARDS: &str = ".movies-list-wrap.mlw-topview .ml-item";
/// Heading whose text reports an empty search
pub const NO_RESULTS_HEADING: &str = ".movies-list-wrap .ml-title-page h1";
/// Text of that heading when nothing matched
pub const NO_RESULTS_TEXT: &str = "nothing found";
/// Episode badge on a tile
const EPISODE_BADGE: &str = "span.mli-eps";

const LISTING_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("imageUrl", "img", Source::AttrOr("src", "data-original"), Transform::None).required(),
    FieldSpec::new("detailUrl", "a[data-url]", Source::Attr("href"), Transform::None),
    FieldSpec::new("quality", "span.mli-quality", Source::Text, Transform::Trim),
    FieldSpec::new("rating", "span.mli-rating", Source::Text, Transform::LeadingDigits),
    FieldSpec::new("durationMinutes", "span.mli-durasi", Source::Text, Transform::LeadingDigits),
    FieldSpec::new("title", "span.mli-info h2", Source::Text, Transform::Trim),
];

const DETAIL_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("title", "h3[itemprop=\"name\"]", Source::Attr("content"), Transform::None),
    FieldSpec::new("image", "#mv-info .mvic-thumb img", Source::AttrOr("src", "data-original"), Transform::None),
    FieldSpec::new("trailer", "#iframe-trailer", Source::Attr("src"), Transform::None),
    FieldSpec::new("ratingCount", "#mv-info span[itemprop=\"ratingCount\"]", Source::Text, Transform::Trim),
    FieldSpec::new("ratingValue", "#mv-info span[itemprop=\"ratingValue\"]", Source::Text, Transform::Trim),
    FieldSpec::new("synopsis", "#mv-info .mvic-desc .desc", Source::FirstParagraph, Transform::Trim),
    FieldSpec::new("duration", "#mv-info span[itemprop=\"duration\"]", Source::Text, Transform::LeadingDigits),
    FieldSpec::new("releaseDate", "#mv-info meta[itemprop=\"datePublished\"]", Source::Attr("content"), Transform::Trim),
    FieldSpec::new("href", "#mv-info a[title]", Source::Attr("href"), Transform::None),
];

const DETAIL_QUALITY: &str = "#mv-info .mvici-right span.quality a";
const DETAIL_COUNTRIES: &str = "#mv-info .mvici-left span[itemprop=\"contentLocation\"] a";
const DETAIL_GENRES: &str = "#mv-info .mvici-left span[itemprop=\"genre\"] a";
const DETAIL_ACTORS: &str = "#mv-info .mvici-left span[itemprop=\"actors\"] a";
const DETAIL_DIRECTORS: &str = "#mv-info .mvici-left span[itemprop=\"director\"] a";

const WATCH_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("title", ".mvic-info .mvic-tagline2 h3", Source::Text, Transform::Trim),
    FieldSpec::new("mainServer", "#iframe-embed", Source::Attr("src"), Transform::None),
    FieldSpec::new("ratingCount", ".mvic-info span[itemprop=\"ratingCount\"]", Source::Text, Transform::Trim).required(),
    FieldSpec::new("ratingValue", ".mvic-info span[itemprop=\"ratingValue\"]", Source::Text, Transform::Trim).required(),
    FieldSpec::new("synopsis", ".mvic-desc .desc", Source::FirstParagraph, Transform::Trim),
];

const WATCH_SERVERS: &str = "#server-list .server-wrapper";
const SERVER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("description", ".server-title small", Source::Text, Transform::Trim),
    FieldSpec::new("src", ".server", Source::Attr("data-iframe"), Transform::None),
];
const WATCH_ACTORS: &str = ".mvic-info span[itemprop=\"actors\"] a";
const WATCH_DIRECTORS: &str = ".mvic-info span[itemprop=\"director\"] a";
const WATCH_EPISODE_LIST: &str = "#list-eps";
const WATCH_EPISODES: &str = "#list-eps .les-content a";

/// Airing state of a series tile
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub enum EpisodeStatus {
    OnGoing,
    Completed,
}

/// Whether a tile is a single movie or an episode of a series
///
/// Serialized as `{"isEpisode": false}` or
/// `{"isEpisode": true, "episodeNumber": ..., "status": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum EpisodeInfo {
    Movie,
    Episode {
        number: Option<String>,
        status: EpisodeStatus,
    },
}

impl Serialize for EpisodeInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            EpisodeInfo::Movie => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("isEpisode", &false)?;
                map.end()
            }
            EpisodeInfo::Episode { number, status } => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("isEpisode", &true)?;
                map.serialize_entry("episodeNumber", number)?;
                map.serialize_entry("status", status)?;
                map.end()
            }
        }
    }
}

/// One movie tile from a grid view
#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListingRecord {
    /// From img src (or data-original)
    pub image_url: Option<String>,
    /// From a[data-url] href
    pub detail_url: Option<String>,
    /// From span.mli-quality
    pub quality: Option<String>,
    /// Digits of span.mli-rating
    pub rating: Option<String>,
    /// Digits of span.mli-durasi
    pub duration_minutes: Option<String>,
    /// From span.mli-info h2
    pub title: Option<String>,
    /// From span.mli-eps
    #[schema(value_type = Object)]
    pub episode_info: EpisodeInfo,
}

/// Rating block of detail and watch pages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Rating {
    pub count: Option<String>,
    pub value: Option<String>,
}

/// Full metadata of a title's info page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub title: Option<String>,
    pub image: Option<String>,
    pub trailer: Option<String>,
    pub rating: Rating,
    /// First paragraph of the description only
    pub synopsis: Option<String>,
    pub duration: Option<String>,
    pub quality: Vec<NamedLink>,
    pub release_date: Option<String>,
    pub countries: Vec<NamedLink>,
    pub genres: Vec<NamedLink>,
    pub actors: Vec<NamedLink>,
    pub directors: Vec<NamedLink>,
    /// Canonical link of the title
    pub href: Option<String>,
}

/// An embeddable server on the watch page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Server {
    pub description: Option<String>,
    pub src: Option<String>,
}

/// An episode button on the watch page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct EpisodeLink {
    pub src: Option<String>,
    /// Number as displayed on the button
    pub number: String,
}

/// Streaming page metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchRecord {
    pub title: Option<String>,
    pub main_server: Option<String>,
    pub servers: Vec<Server>,
    pub rating: Rating,
    pub synopsis: Option<String>,
    pub actors: Vec<NamedLink>,
    pub directors: Vec<NamedLink>,
    /// Present only for series pages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episodes: Option<Vec<EpisodeLink>>,
}

/// Read the episode badge of a tile
///
/// The second whitespace-separated token decides the status: `ON` means the
/// series is still airing, anything else is treated as completed.
fn parse_episode_badge(badge: ElementRef<'_>) -> Result<EpisodeInfo, ExtractError> {
    let text = element_text(badge);
    let status = match text.split_whitespace().nth(1) {
        Some("ON") => EpisodeStatus::OnGoing,
        _ => EpisodeStatus::Completed,
    };
    let number = match select_first(badge, "i")? {
        Some(i) => Some(element_text(i).trim().to_string()),
        None => Some(digits_only(&text)).filter(|n| !n.is_empty()),
    };
    Ok(EpisodeInfo::Episode { number, status })
}

fn parse_listing_card(
    card: ElementRef<'_>,
    base: Option<&Url>,
    mode: ExtractionMode,
) -> Result<ListingRecord, ExtractError> {
    let mut values = extract_fields(card, LISTING_FIELDS, mode)?;
    let episode_info = match select_first(card, EPISODE_BADGE)? {
        Some(badge) => parse_episode_badge(badge)?,
        None => EpisodeInfo::Movie,
    };

    Ok(ListingRecord {
        image_url: values.take("imageUrl").map(|v| resolve_url(base, v)),
        detail_url: values.take("detailUrl").map(|v| resolve_url(base, v)),
        quality: values.take("quality"),
        rating: values.take("rating"),
        duration_minutes: values.take("durationMinutes"),
        title: values.take("title"),
        episode_info,
    })
}

fn parse_cards(
    document: &Html,
    cards: &'static str,
    page_url: &str,
    mode: ExtractionMode,
) -> Result<Vec<ListingRecord>, ExtractError> {
    let base = Url::parse(page_url).ok();
    select_all(document.root_element(), cards)?
        .into_iter()
        .map(|card| parse_listing_card(card, base.as_ref(), mode))
        .collect()
}

/// Parse the movie tiles of a listing page
///
/// Extracts every `.ml-item` inside the main tabbed grid, in document order.
/// Image and detail links are resolved against `page_url`.
pub fn parse_movie_cards(html: &str, page_url: &str, mode: ExtractionMode) -> Result<Vec<ListingRecord>, ExtractError> {
    let document = Html::parse_document(html);
    parse_cards(&document, LISTING_CARDS, page_url, mode)
}

/// Parse the latest and most-viewed blocks of the home page
pub fn parse_home(html: &str, page_url: &str, mode: ExtractionMode) -> Result<HomeListing, ExtractError> {
    let document = Html::parse_document(html);
    Ok(HomeListing {
        latest: parse_cards(&document, LATEST_CARDS, page_url, mode)?,
        top_view: parse_cards(&document, TOP_VIEW_CARDS, page_url, mode)?,
    })
}

/// Whether a search page reports that nothing matched
pub fn has_no_results_marker(document: &Html) -> Result<bool, ExtractError> {
    Ok(select_all(document.root_element(), NO_RESULTS_HEADING)?
        .into_iter()
        .any(|h| element_text(h).to_lowercase().contains(NO_RESULTS_TEXT)))
}

/// Parse a search results page
///
/// When the "nothing found" heading is present the result is empty with no
/// pagination, whatever else the page contains.
pub fn parse_search_page(html: &str, page_url: &str, mode: ExtractionMode) -> Result<MoviePage, ExtractError> {
    let document = Html::parse_document(html);
    if has_no_results_marker(&document)? {
        return Ok(MoviePage::empty());
    }
    Ok(MoviePage {
        movies: parse_cards(&document, GRID_CARDS, page_url, mode)?,
        pagination: extract_pagination(&document)?,
    })
}

/// Parse a paginated movie list page
pub fn parse_list_page(html: &str, page_url: &str, mode: ExtractionMode) -> Result<MoviePage, ExtractError> {
    let document = Html::parse_document(html);
    Ok(MoviePage {
        movies: parse_cards(&document, GRID_CARDS, page_url, mode)?,
        pagination: extract_pagination(&document)?,
    })
}

/// Parse a title's detail page
pub fn parse_detail(html: &str, mode: ExtractionMode) -> Result<DetailRecord, ExtractError> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut values = extract_fields(root, DETAIL_FIELDS, mode)?;

    Ok(DetailRecord {
        title: values.take("title"),
        image: values.take("image"),
        trailer: values.take("trailer"),
        rating: Rating {
            count: values.take("ratingCount"),
            value: values.take("ratingValue"),
        },
        synopsis: values.take("synopsis"),
        duration: values.take("duration"),
        quality: extract_links(root, DETAIL_QUALITY)?,
        release_date: values.take("releaseDate"),
        countries: extract_links(root, DETAIL_COUNTRIES)?,
        genres: extract_links(root, DETAIL_GENRES)?,
        actors: extract_links(root, DETAIL_ACTORS)?,
        directors: extract_links(root, DETAIL_DIRECTORS)?,
        href: values.take("href"),
    })
}

/// Parse a streaming page
pub fn parse_watch(html: &str, mode: ExtractionMode) -> Result<WatchRecord, ExtractError> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let mut values = extract_fields(root, WATCH_FIELDS, mode)?;

    let servers = select_all(root, WATCH_SERVERS)?
        .into_iter()
        .map(|wrapper| -> Result<Server, ExtractError> {
            let mut server = extract_fields(wrapper, SERVER_FIELDS, mode)?;
            Ok(Server {
                description: server.take("description"),
                src: server.take("src"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let episodes = match select_first(root, WATCH_EPISODE_LIST)? {
        Some(_) => Some(
            select_all(root, WATCH_EPISODES)?
                .into_iter()
                .map(|a| EpisodeLink {
                    src: a
                        .value()
                        .attr("data-iframe")
                        .or_else(|| a.value().attr("href"))
                        .map(str::to_string),
                    number: element_text(a).trim().to_string(),
                })
                .collect(),
        ),
        None => None,
    };

    Ok(WatchRecord {
        title: values.take("title"),
        main_server: values.take("mainServer"),
        servers,
        rating: Rating {
            count: values.take("ratingCount"),
            value: values.take("ratingValue"),
        },
        synopsis: values.take("synopsis"),
        actors: extract_links(root, WATCH_ACTORS)?,
        directors: extract_links(root, WATCH_DIRECTORS)?,
        episodes,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! HTML snippets shaped like the live theme, shared with route tests.

    /// Page the listing fixtures are pretended to be fetched from
    pub const PAGE_URL: &str = "https://site.test/movies/";

    pub const LISTING_PAGE: &str = r#"
    <html>
    <body>
        <div class="movies-list-wrap">
            <div class="ml-title ml-title-page"><h1>Latest Movies</h1></div>
            <div class="tab-content">
                <div class="movies-list movies-list-full">
                    <div class="ml-item">
                        <a href="https://site.test/movie/dune-part-two/" data-url="https://site.test/ajax/dune" class="ml-mask">
                            <span class="mli-quality">HD</span>
                            <img data-original="https://img.test/dune.jpg" class="lazy thumb mli-thumb" />
                            <span class="mli-info"><h2>Dune: Part Two</h2></span>
                        </a>
                        <span class="mli-rating"><i class="fa fa-star"></i> 8</span>
                        <span class="mli-durasi">166 min</span>
                    </div>
                    <div class="ml-item">
                        <a href="https://site.test/tv/the-bear/" data-url="https://site.test/ajax/bear" class="ml-mask">
                            <span class="mli-eps">Eps ON <i>8</i></span>
                            <img src="https://img.test/bear.jpg" />
                            <span class="mli-info"><h2>The Bear</h2></span>
                        </a>
                        <span class="mli-rating">Rating: 9</span>
                    </div>
                    <div class="ml-item">
                        <a href="https://site.test/tv/chernobyl/" data-url="https://site.test/ajax/chernobyl" class="ml-mask">
                            <span class="mli-eps">Eps END <i>5</i></span>
                            <img src="https://img.test/chernobyl.jpg" />
                            <span class="mli-info"><h2>Chernobyl</h2></span>
                        </a>
                    </div>
                </div>
            </div>
        </div>
        <div id="pagination">
            <nav>
                <ul class="pagination">
                    <li class="active"><span>1</span></li>
                    <li><a href="https://site.test/movies/page/2/">2</a></li>
                    <li><a href="https://site.test/movies/page/3/">3</a></li>
                    <li><a href="https://site.test/movies/page/2/">»</a></li>
                    <li><a href="https://site.test/movies/page/87/">Last »</a></li>
                </ul>
            </nav>
        </div>
    </body>
    </html>
    "#;

    pub const NO_RESULTS_PAGE: &str = r#"
    <html>
    <body>
        <div class="movies-list-wrap">
            <div class="ml-title ml-title-page"><h1>Nothing Found</h1></div>
            <div class="movies-list movies-list-full">
                <div class="ml-item"><img src="https://img.test/suggested.jpg" /></div>
            </div>
        </div>
        <div id="pagination"><ul class="pagination"><li class="active"><span>1</span></li></ul></div>
    </body>
    </html>
    "#;

    pub const HOME_PAGE: &str = r#"
    <html>
    <body>
        <div class="movies-list-wrap mlw-topview">
            <div class="movies-list movies-list-full">
                <div class="ml-item"><img src="https://img.test/top1.jpg" /><span class="mli-info"><h2>Top One</h2></span></div>
            </div>
        </div>
        <div class="movies-list-wrap mlw-latestmovie">
            <div class="movies-list movies-list-full">
                <div class="ml-item"><img src="https://img.test/new1.jpg" /><span class="mli-info"><h2>New One</h2></span></div>
                <div class="ml-item"><img src="https://img.test/new2.jpg" /><span class="mli-info"><h2>New Two</h2></span></div>
            </div>
        </div>
    </body>
    </html>
    "#;

    pub const DETAIL_PAGE: &str = r#"
    <html>
    <body>
        <div id="mv-info">
            <a href="https://site.test/movie/dune-part-two/watch/" title="Dune: Part Two" class="thumb mvi-cover"></a>
            <div class="mvi-content">
                <div class="mvic-thumb"><img src="https://img.test/dune-poster.jpg" /></div>
                <div class="mvic-desc">
                    <h3 itemprop="name" content="Dune: Part Two">Dune: Part Two</h3>
                    <div class="desc">
                        <p>Paul Atreides unites with the Fremen.</p>
                        <p>Read more on the wiki.</p>
                    </div>
                    <div class="mvic-info">
                        <div class="mvici-left">
                            <p><strong>Genre: </strong>
                                <span itemprop="genre"><a href="https://site.test/genre/action/">Action</a></span>
                                <span itemprop="genre"><a href="https://site.test/genre/sci-fi/">Sci-Fi</a></span>
                            </p>
                            <p><strong>Actors: </strong>
                                <span itemprop="actors"><a href="https://site.test/cast/timothee/">Timothée Chalamet</a></span>
                                <span itemprop="actors"><a href="https://site.test/cast/zendaya/">Zendaya</a></span>
                            </p>
                            <p><strong>Director: </strong>
                                <span itemprop="director"><a href="https://site.test/director/villeneuve/">Denis Villeneuve</a></span>
                            </p>
                            <p><strong>Country: </strong>
                                <span itemprop="contentLocation"><a href="https://site.test/country/usa/">USA</a></span>
                            </p>
                        </div>
                        <div class="mvici-right">
                            <p><strong>Duration:</strong> <span itemprop="duration">166 min</span></p>
                            <p><strong>Quality:</strong> <span class="quality"><a href="https://site.test/quality/hd/">HD</a></span></p>
                            <p><strong>Release:</strong> <meta itemprop="datePublished" content="2024-02-27" /></p>
                            <p><strong>IMDb:</strong>
                                <span itemprop="ratingValue">8.6</span>/10 (<span itemprop="ratingCount">512000</span> votes)
                            </p>
                        </div>
                    </div>
                </div>
            </div>
        </div>
        <iframe id="iframe-trailer" src="https://www.youtube.com/embed/Way9Dexny3w"></iframe>
    </body>
    </html>
    "#;

    pub const WATCH_PAGE: &str = r##"
    <html>
    <body>
        <div id="media-player"><iframe id="iframe-embed" src="https://player.test/e/abc"></iframe></div>
        <div id="server-list">
            <div class="server-wrapper">
                <div class="server" data-iframe="https://player.test/e/abc"></div>
                <div class="server-title"><small>Server 1 - HD</small></div>
            </div>
            <div class="server-wrapper">
                <div class="server" data-iframe="https://mirror.test/v/xyz"></div>
                <div class="server-title"><small>Server 2 - SD</small></div>
            </div>
        </div>
        <div id="list-eps">
            <div class="les-content">
                <a href="#" data-iframe="https://player.test/e/ep1">1</a>
                <a href="#" data-iframe="https://player.test/e/ep2">2</a>
            </div>
        </div>
        <div class="mvic-desc">
            <div class="desc"><p>A chef returns home.</p><p>Second paragraph.</p></div>
            <div class="mvic-info">
                <div class="mvic-tagline2"><h3>The Bear Season 1</h3></div>
                <span itemprop="ratingValue">8.5</span>
                <span itemprop="ratingCount">1200</span>
                <span itemprop="actors"><a href="https://site.test/cast/jeremy/">Jeremy Allen White</a></span>
                <span itemprop="director"><a href="https://site.test/director/storer/">Christopher Storer</a></span>
            </div>
        </div>
    </body>
    </html>
    "##;
}
