//! Paginator reconstruction.
//!
//! The site's paginator is a flat `<li>` list. Each item is classified once
//! into a [`PaginatorItem`], then a single fold over the sequence produces the
//! [`PaginationSummary`]. The summary is positional: it assumes the theme
//! renders First, Prev, the page numbers, Next and Last in that order.

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::schema::{digits_only, element_text, select_all, select_first, ExtractError};

/// Paginator items in document order
pub const PAGINATOR_ITEMS: &str = "#pagination ul.pagination li";

/// One classified paginator entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginatorItem {
    First { href: Option<String> },
    Prev { href: Option<String> },
    Page { number: u32, active: bool, href: Option<String> },
    Next { href: Option<String> },
    Last { href: Option<String> },
    /// Ellipsis or anything unrecognised
    Other,
}

/// Availability and target of a First/Last control
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct PageLink {
    pub present: bool,
    pub href: Option<String>,
}

/// Navigation state reconstructed from the paginator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationSummary {
    /// Number of the active item
    pub current_page: u32,
    /// Number of the first page item after any First/Prev controls
    pub start_page: u32,
    /// Page links plus the active page
    pub total_visible_count: u32,
    pub is_next: bool,
    pub is_prev: bool,
    pub first: PageLink,
    pub last: PageLink,
}

/// Classify a paginator entry from its text, active flag and link.
pub fn classify_item(text: &str, active: bool, href: Option<String>) -> PaginatorItem {
    let label = text.trim().to_lowercase();

    // "« First" and "Last »" carry arrows too, so the words win
    if label.contains("first") {
        return PaginatorItem::First { href };
    }
    if label.contains("last") {
        return PaginatorItem::Last { href };
    }
    if label.contains("next") || label.contains('»') {
        return PaginatorItem::Next { href };
    }
    if label.contains("prev") || label.contains('«') {
        return PaginatorItem::Prev { href };
    }

    match digits_only(&label).parse::<u32>() {
        Ok(number) => PaginatorItem::Page { number, active, href },
        Err(_) => PaginatorItem::Other,
    }
}

fn classify_element(li: ElementRef<'_>) -> Result<PaginatorItem, ExtractError> {
    let active = li.value().classes().any(|c| c == "active");
    let href = select_first(li, "a")?
        .and_then(|a| a.value().attr("href"))
        .map(str::to_string);
    Ok(classify_item(&element_text(li), active, href))
}

#[derive(Default)]
struct Fold {
    start_index: usize,
    numbers_started: bool,
    current_page: Option<u32>,
    page_links: u32,
    is_next: bool,
    is_prev: bool,
    first: PageLink,
    last: PageLink,
}

/// Derive the navigation summary from classified items.
pub fn summarize(items: &[PaginatorItem]) -> PaginationSummary {
    let fold = items.iter().fold(Fold::default(), |mut acc, item| {
        match item {
            PaginatorItem::First { href } => {
                if !acc.numbers_started {
                    acc.start_index += 1;
                }
                acc.first = PageLink {
                    present: true,
                    href: href.clone(),
                };
            }
            PaginatorItem::Prev { .. } => {
                if !acc.numbers_started {
                    acc.start_index += 1;
                }
                acc.is_prev = true;
            }
            PaginatorItem::Page { number, active, .. } => {
                acc.numbers_started = true;
                if *active {
                    acc.current_page.get_or_insert(*number);
                } else {
                    acc.page_links += 1;
                }
            }
            PaginatorItem::Next { .. } => acc.is_next = true,
            PaginatorItem::Last { href } => {
                acc.last = PageLink {
                    present: true,
                    href: href.clone(),
                };
            }
            PaginatorItem::Other => {}
        }
        acc
    });

    let current_page = fold.current_page.unwrap_or(1);
    let start_page = if current_page == 1 {
        1
    } else {
        match items.get(fold.start_index) {
            Some(PaginatorItem::Page { number, .. }) => *number,
            _ => current_page,
        }
    };

    PaginationSummary {
        current_page,
        start_page,
        total_visible_count: fold.page_links + 1,
        is_next: fold.is_next,
        is_prev: fold.is_prev,
        first: fold.first,
        last: fold.last,
    }
}

/// Classify the paginator items of a document, `None` when there is no paginator.
pub fn paginator_items(document: &Html) -> Result<Option<Vec<PaginatorItem>>, ExtractError> {
    let lis = select_all(document.root_element(), PAGINATOR_ITEMS)?;
    if lis.is_empty() {
        return Ok(None);
    }
    lis.into_iter()
        .map(classify_element)
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

/// Reconstruct pagination for a document
pub fn extract_pagination(document: &Html) -> Result<Option<PaginationSummary>, ExtractError> {
    Ok(paginator_items(document)?.map(|items| summarize(&items)))
}
