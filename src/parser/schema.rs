//! Declarative field extraction.
//!
//! Pages are described as tables of [`FieldSpec`] entries and read by a
//! single interpreter, [`extract_fields`], instead of hand-written selector
//! chains per page.

use std::collections::HashMap;

use reqwest::Url;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Errors raised while extracting fields from a document
#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    /// A selector in a schema table failed to parse
    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector {
        selector: &'static str,
        reason: String,
    },

    /// A required element was absent under strict extraction
    #[error("Required field {field} not found (selector {selector:?})")]
    MissingField {
        field: &'static str,
        selector: &'static str,
    },
}

/// How missing elements are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// A missing `required` field fails the whole extraction
    Strict,
    /// Every missing field becomes `None`
    Lenient,
}

/// Where a field's raw value comes from
#[derive(Debug, Clone, Copy)]
pub enum Source {
    /// Concatenated text of the element
    Text,
    /// Text of the first `<p>` inside the element
    FirstParagraph,
    /// Value of an attribute
    Attr(&'static str),
    /// Value of an attribute, or of a fallback attribute when absent
    AttrOr(&'static str, &'static str),
}

/// Post-processing applied to a raw value
#[derive(Debug, Clone, Copy)]
pub enum Transform {
    None,
    Trim,
    /// Trim, then drop everything before the first digit ("Rating: 7.5" -> "7.5")
    LeadingDigits,
}

/// One entry of an extraction table
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub selector: &'static str,
    pub source: Source,
    pub transform: Transform,
    pub required: bool,
}

impl FieldSpec {
    pub const fn new(name: &'static str, selector: &'static str, source: Source, transform: Transform) -> Self {
        Self {
            name,
            selector,
            source,
            transform,
            required: false,
        }
    }

    /// Mark the field as required under strict extraction
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// A `{name, href}` pair read from an anchor
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct NamedLink {
    /// Anchor text
    pub name: String,
    /// Anchor href
    pub href: Option<String>,
}

/// Extracted values keyed by field name
#[derive(Debug, Default)]
pub struct FieldValues(HashMap<&'static str, Option<String>>);

impl FieldValues {
    /// Take a value out, leaving `None` behind
    pub fn take(&mut self, name: &str) -> Option<String> {
        debug_assert!(self.0.contains_key(name), "unknown field {name:?}");
        self.0.get_mut(name).and_then(Option::take)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.as_deref())
    }
}

/// Parse a selector from a schema table
pub fn selector(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::InvalidSelector {
        selector: css,
        reason: format!("{:?}", e),
    })
}

/// All elements under `scope` matching `css`, in document order
pub fn select_all<'a>(scope: ElementRef<'a>, css: &'static str) -> Result<Vec<ElementRef<'a>>, ExtractError> {
    let sel = selector(css)?;
    Ok(scope.select(&sel).collect())
}

/// First element under `scope` matching `css`
pub fn select_first<'a>(scope: ElementRef<'a>, css: &'static str) -> Result<Option<ElementRef<'a>>, ExtractError> {
    let sel = selector(css)?;
    Ok(scope.select(&sel).next())
}

/// Concatenated text content of an element
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}

/// Strip every non-digit character
pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Trim and drop the non-digit prefix, keeping the rest as written
pub fn leading_digits(text: &str) -> String {
    text.trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .to_string()
}

/// Resolve a possibly relative link against the page it was found on.
///
/// Empty values and values that cannot be joined are returned unchanged.
pub fn resolve_url(base: Option<&Url>, value: String) -> String {
    if value.is_empty() {
        return value;
    }
    match base.map(|base| base.join(&value)) {
        Some(Ok(url)) => url.to_string(),
        _ => value,
    }
}

fn read_source(el: ElementRef<'_>, source: Source) -> Option<String> {
    match source {
        Source::Text => Some(element_text(el)),
        Source::FirstParagraph => {
            let p = Selector::parse("p").ok()?;
            el.select(&p).next().map(element_text)
        }
        Source::Attr(name) => el.value().attr(name).map(str::to_string),
        Source::AttrOr(name, fallback) => el
            .value()
            .attr(name)
            .filter(|v| !v.is_empty())
            .or_else(|| el.value().attr(fallback))
            .map(str::to_string),
    }
}

fn apply_transform(value: String, transform: Transform) -> String {
    match transform {
        Transform::None => value,
        Transform::Trim => value.trim().to_string(),
        Transform::LeadingDigits => leading_digits(&value),
    }
}

/// Run one field spec against `scope`
///
/// Strict extraction only fails when a required element is absent; an element
/// that is present but lacks the attribute yields `None`.
pub fn extract_field(
    scope: ElementRef<'_>,
    spec: &FieldSpec,
    mode: ExtractionMode,
) -> Result<Option<String>, ExtractError> {
    let element = select_first(scope, spec.selector)?;

    if element.is_none() && spec.required && mode == ExtractionMode::Strict {
        return Err(ExtractError::MissingField {
            field: spec.name,
            selector: spec.selector,
        });
    }
    Ok(element
        .and_then(|el| read_source(el, spec.source))
        .map(|raw| apply_transform(raw, spec.transform)))
}

/// Run an extraction table against `scope`
pub fn extract_fields(
    scope: ElementRef<'_>,
    fields: &[FieldSpec],
    mode: ExtractionMode,
) -> Result<FieldValues, ExtractError> {
    let mut values = HashMap::with_capacity(fields.len());
    for spec in fields {
        values.insert(spec.name, extract_field(scope, spec, mode)?);
    }
    Ok(FieldValues(values))
}

/// Read every anchor matching `css` as a `{name, href}` pair
pub fn extract_links(scope: ElementRef<'_>, css: &'static str) -> Result<Vec<NamedLink>, ExtractError> {
    Ok(select_all(scope, css)?
        .into_iter()
        .map(|a| NamedLink {
            name: element_text(a).trim().to_string(),
            href: a.value().attr("href").map(str::to_string),
        })
        .collect())
}
