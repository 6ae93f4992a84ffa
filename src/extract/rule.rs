//! Extraction rules and the ordered field map built from them
use std::fmt;

/// How a field's value is pulled out of the first element its selector matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractMode {
    /// Normalized text content
    Text,

    /// Value of the named attribute
    Attribute(String),

    /// Serialized outer HTML
    Markup,
}

impl fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Attribute(name) => write!(f, "attribute[{}]", name),
            Self::Markup => write!(f, "markup"),
        }
    }
}

/// A selector, evaluated relative to a container, plus the mode used to read the match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRule {
    pub selector: String,
    pub mode: ExtractMode,
}

impl ExtractionRule {
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            mode: ExtractMode::Text,
        }
    }

    pub fn attribute(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            mode: ExtractMode::Attribute(attribute.into()),
        }
    }

    pub fn markup(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            mode: ExtractMode::Markup,
        }
    }
}

/// Ordered mapping from unique field name to rule
///
/// Insertion order is the record schema and the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: Vec<(String, ExtractionRule)>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, replacing the rule in place if the name already exists.
    /// Returns the previous rule for that name, if any.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        rule: ExtractionRule,
    ) -> Option<ExtractionRule> {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, rule)),
            None => {
                self.fields.push((name, rule));
                None
            }
        }
    }

    /// Builder form of [`FieldMap::insert`]
    pub fn with_field(mut self, name: impl Into<String>, rule: ExtractionRule) -> Self {
        self.insert(name, rule);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ExtractionRule> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, rule)| rule)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ExtractionRule)> {
        self.fields.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ExtractionRule)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (S, ExtractionRule)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (name, rule) in iter {
            map.insert(name, rule);
        }
        map
    }
}
