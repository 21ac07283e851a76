use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, thiserror::Error)]
pub enum PtsError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PtsError {
    pub fn not_found(what: &str, id: impl fmt::Display) -> Self {
        PtsError::NotFound(format!("{what} {id} does not exist"))
    }
}

pub type Result<T> = std::result::Result<T, PtsError>;

/// Field errors for a list payload, one map per submitted item.
///
/// Serializes either as `{"non_field_errors": [...]}` when the payload as a
/// whole is unusable, or as a list with one `{field: [messages]}` object per
/// item (empty object for items that passed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    non_field: Vec<String>,
    items: Vec<BTreeMap<String, Vec<String>>>,
}

impl ValidationErrors {
    pub fn new(item_count: usize) -> Self {
        Self { non_field: Vec::new(), items: vec![BTreeMap::new(); item_count] }
    }

    pub fn non_field(message: impl Into<String>) -> Self {
        Self { non_field: vec![message.into()], items: Vec::new() }
    }

    pub fn add(&mut self, index: usize, field: &str, message: impl Into<String>) {
        if index >= self.items.len() {
            self.items.resize(index + 1, BTreeMap::new());
        }
        self.items[index].entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.non_field.is_empty() && self.items.iter().all(BTreeMap::is_empty)
    }

    /// Messages recorded for `field` of the item at `index`.
    pub fn field(&self, index: usize, field: &str) -> &[String] {
        self.items.get(index).and_then(|m| m.get(field)).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field
    }

    pub fn to_json(&self) -> Value {
        if !self.non_field.is_empty() {
            return json!({ "non_field_errors": self.non_field });
        }
        Value::Array(
            self.items
                .iter()
                .map(|fields| {
                    let map: Map<String, Value> =
                        fields.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
                    Value::Object(map)
                })
                .collect(),
        )
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<ValidationErrors> for PtsError {
    fn from(errors: ValidationErrors) -> Self {
        PtsError::Validation(errors)
    }
}
