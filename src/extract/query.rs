//! Document query layer
//!
//! Thin wrapper over `scraper` that answers the four questions the record
//! extractor asks of a page or container: the first match's text, one of its
//! attributes, its serialized markup, or every match in document order.
//!
//! Each primitive has two forms. The `try_*` form returns an explicit
//! `Result<Option<_>, SelectorError>` so callers and tests can see why a
//! value is missing. The plain form never fails: an unusable selector is
//! logged and answered with the "not found" value, so one bad selector
//! cannot abort the rest of an extraction.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// A selector that could not be compiled
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("invalid selector '{selector}': {reason}")]
    Invalid { selector: String, reason: String },
}

/// A parsed, queryable HTML page
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document. Malformed markup is repaired by the
    /// HTML5 parser rather than rejected.
    pub fn parse(body: &str) -> Self {
        Self {
            html: Html::parse_document(body),
        }
    }

    /// The `<html>` element; queries against it search the whole page
    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document").finish_non_exhaustive()
    }
}

/// Compiles a CSS selector
pub fn compile(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|e| SelectorError::Invalid {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Text content of an element with runs of whitespace collapsed and the ends trimmed
pub fn normalized_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn first_text(node: ElementRef<'_>, selector: &Selector) -> Option<String> {
    node.select(selector).next().map(normalized_text)
}

pub(crate) fn first_attribute(
    node: ElementRef<'_>,
    selector: &Selector,
    attribute: &str,
) -> Option<String> {
    node.select(selector)
        .next()
        .and_then(|element| element.value().attr(attribute))
        .map(str::to_string)
}

pub(crate) fn first_markup(node: ElementRef<'_>, selector: &Selector) -> Option<String> {
    node.select(selector).next().map(|element| element.html())
}

pub fn try_query_text(
    node: ElementRef<'_>,
    selector: &str,
) -> Result<Option<String>, SelectorError> {
    Ok(first_text(node, &compile(selector)?))
}

pub fn try_query_attribute(
    node: ElementRef<'_>,
    selector: &str,
    attribute: &str,
) -> Result<Option<String>, SelectorError> {
    Ok(first_attribute(node, &compile(selector)?, attribute))
}

pub fn try_query_markup(
    node: ElementRef<'_>,
    selector: &str,
) -> Result<Option<String>, SelectorError> {
    Ok(first_markup(node, &compile(selector)?))
}

pub fn try_query_all<'a>(
    node: ElementRef<'a>,
    selector: &str,
) -> Result<Vec<ElementRef<'a>>, SelectorError> {
    let compiled = compile(selector)?;
    Ok(node.select(&compiled).collect())
}

/// First matching descendant's normalized text, or `""`
pub fn query_text(node: ElementRef<'_>, selector: &str) -> String {
    absorb(try_query_text(node, selector)).unwrap_or_default()
}

/// First matching descendant's `attribute` value, or `""` when either the
/// element or the attribute is missing
pub fn query_attribute(node: ElementRef<'_>, selector: &str, attribute: &str) -> String {
    absorb(try_query_attribute(node, selector, attribute)).unwrap_or_default()
}

/// First matching descendant serialized as HTML, or `""`
pub fn query_markup(node: ElementRef<'_>, selector: &str) -> String {
    absorb(try_query_markup(node, selector)).unwrap_or_default()
}

/// Every matching descendant in document order; empty on no match or a bad selector
pub fn query_all<'a>(node: ElementRef<'a>, selector: &str) -> Vec<ElementRef<'a>> {
    match try_query_all(node, selector) {
        Ok(nodes) => nodes,
        Err(e) => {
            tracing::warn!("{}", e);
            Vec::new()
        }
    }
}

fn absorb(result: Result<Option<String>, SelectorError>) -> Option<String> {
    result.unwrap_or_else(|e| {
        tracing::warn!("{}", e);
        None
    })
}
