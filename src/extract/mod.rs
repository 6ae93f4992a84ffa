//! Declarative extraction engine
//!
//! This module contains everything that runs against an already fetched page:
//! - The document query layer (text, attribute, markup and all-matches queries)
//! - Extraction rules and the ordered field map
//! - The record extractor that applies a field map to every container

mod query;
mod record;
mod rule;

pub use query::{
    compile, normalized_text, query_all, query_attribute, query_markup, query_text,
    try_query_all, try_query_attribute, try_query_markup, try_query_text, Document,
    SelectorError,
};
pub use record::{extract_page, extract_records, PageExtraction, Record};
pub use rule::{ExtractMode, ExtractionRule, FieldMap};
