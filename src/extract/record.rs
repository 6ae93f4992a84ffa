//! Record extractor
//!
//! Turns one page into zero or more flat records: every element matched by
//! the container selector becomes one record, and every field of the field
//! map is evaluated against that container only.
//!
//! # Failure Handling
//!
//! | Condition | Result |
//! |-----------|--------|
//! | Container selector matches nothing | No records, page reported as empty |
//! | Container selector does not compile | No records, warning logged |
//! | Field selector does not compile | Field is `""` in every record, warning logged once |
//! | Field selector matches nothing in a container | Field is `""` in that record |
//! | Attribute missing on the matched element | Field is `""` in that record |

use crate::extract::query::{
    compile, first_attribute, first_markup, first_text, Document, SelectorError,
};
use crate::extract::rule::{ExtractMode, ExtractionRule, FieldMap};
use scraper::{ElementRef, Selector};
use std::ops::Index;

/// One extracted item: field name → value, in field-map order
///
/// Values are never absent. A field that could not be resolved holds `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Index<&str> for Record {
    type Output = str;

    fn index(&self, name: &str) -> &str {
        match self.get(name) {
            Some(value) => value,
            None => panic!("record has no field named '{}'", name),
        }
    }
}

/// Outcome of extracting one page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    /// Records in container discovery order
    pub records: Vec<Record>,

    /// Number of elements the container selector matched
    pub containers_found: usize,

    /// Set when the container selector itself could not be compiled
    pub container_error: Option<SelectorError>,

    /// Field evaluations that fell back to `""` because of a selector error
    pub field_errors: usize,
}

impl PageExtraction {
    /// True when the page yielded no containers at all
    pub fn is_empty(&self) -> bool {
        self.containers_found == 0
    }
}

/// A field map with every selector compiled once per page
struct CompiledField<'m> {
    name: &'m str,
    rule: &'m ExtractionRule,
    selector: Result<Selector, SelectorError>,
}

fn compile_fields(field_map: &FieldMap) -> Vec<CompiledField<'_>> {
    field_map
        .iter()
        .map(|(name, rule)| {
            let selector = compile(&rule.selector);
            if let Err(e) = &selector {
                tracing::warn!("Field '{}' will be empty: {}", name, e);
            }
            CompiledField {
                name,
                rule,
                selector,
            }
        })
        .collect()
}

/// Evaluates one field against one container
///
/// `Ok(None)` means the selector is fine but nothing matched.
fn evaluate(
    container: ElementRef<'_>,
    field: &CompiledField<'_>,
) -> Result<Option<String>, SelectorError> {
    let selector = field.selector.as_ref().map_err(Clone::clone)?;
    Ok(match &field.rule.mode {
        ExtractMode::Text => first_text(container, selector),
        ExtractMode::Attribute(attribute) => first_attribute(container, selector, attribute),
        ExtractMode::Markup => first_markup(container, selector),
    })
}

/// Extracts every container on a page, with diagnostics
///
/// # Arguments
///
/// * `document` - The parsed page
/// * `container_selector` - Selects one element per item
/// * `field_map` - Rules evaluated relative to each container, in order
///
/// # Returns
///
/// One record per container in document order, plus the container count
/// and any selector errors seen along the way
pub fn extract_page(
    document: &Document,
    container_selector: &str,
    field_map: &FieldMap,
) -> PageExtraction {
    let containers = match compile(container_selector) {
        Ok(selector) => document.root().select(&selector).collect::<Vec<_>>(),
        Err(e) => {
            tracing::warn!("Container selector unusable, page yields nothing: {}", e);
            return PageExtraction {
                container_error: Some(e),
                ..PageExtraction::default()
            };
        }
    };

    tracing::debug!(
        "Found {} containers with selector: {}",
        containers.len(),
        container_selector
    );

    let fields = compile_fields(field_map);
    let mut field_errors = 0;

    let records = containers
        .iter()
        .enumerate()
        .map(|(index, container)| {
            let values = fields
                .iter()
                .map(|field| {
                    let value = match evaluate(*container, field) {
                        Ok(value) => value.unwrap_or_default(),
                        Err(e) => {
                            tracing::debug!(
                                "Container {}: field '{}' defaulted to empty: {}",
                                index + 1,
                                field.name,
                                e
                            );
                            field_errors += 1;
                            String::new()
                        }
                    };
                    (field.name.to_string(), value)
                })
                .collect();
            Record { fields: values }
        })
        .collect();

    PageExtraction {
        records,
        containers_found: containers.len(),
        container_error: None,
        field_errors,
    }
}

/// Extracts one record per container, in container discovery order
///
/// # Example
///
/// ```
/// use sumi_sift::extract::{extract_records, Document, ExtractionRule, FieldMap};
///
/// let doc = Document::parse(r#"<ul><li><b>A</b></li><li><b>B</b></li></ul>"#);
/// let fields = FieldMap::new().with_field("name", ExtractionRule::text("b"));
/// let records = extract_records(&doc, "li", &fields);
/// assert_eq!(records.len(), 2);
/// assert_eq!(&records[1]["name"], "B");
/// ```
pub fn extract_records(
    document: &Document,
    container_selector: &str,
    field_map: &FieldMap,
) -> Vec<Record> {
    extract_page(document, container_selector, field_map).records
}
