use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// APPLICATION STATE SNAPSHOT
// ============================================================================

/// Every classroom collection (students, scores, attendance, ...) keyed by name.
/// Replaced wholesale on each successful sync, never merged field by field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataState {
    collections: BTreeMap<String, Vec<Value>>,
}

impl DataState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the array-valued fields of a JSON object; scalars such as a
    /// stray `status` field are not collections and are skipped
    pub fn from_object(object: Map<String, Value>) -> Self {
        let mut collections = BTreeMap::new();
        for (name, value) in object {
            match value {
                Value::Array(records) => {
                    collections.insert(name, records);
                }
                other => {
                    log::debug!("⏭️ Skipping non-collection field '{}' ({})", name, kind_of(&other));
                }
            }
        }
        Self { collections }
    }

    pub fn with_collection(mut self, name: &str, records: Vec<Value>) -> Self {
        self.collections.insert(name.to_string(), records);
        self
    }

    pub fn set_collection(&mut self, name: &str, records: Vec<Value>) {
        self.collections.insert(name.to_string(), records);
    }

    /// No collections at all. A state holding empty collections is not empty.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn collection(&self, name: &str) -> &[Value] {
        self.collections
            .get(name)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(|name| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.collections
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn record_count(&self) -> usize {
        self.collections.values().map(|records| records.len()).sum()
    }

    pub fn students(&self) -> &[Value] {
        self.collection("students")
    }

    /// Student whose `code` or `id` equals `code_or_id` (compared as strings,
    /// the sheet stores numeric codes as numbers)
    pub fn find_student(&self, code_or_id: &str) -> Option<&Value> {
        let wanted = code_or_id.trim();
        if wanted.is_empty() {
            return None;
        }
        self.students().iter().find(|student| {
            ["code", "id"].iter().any(|field| {
                student
                    .get(field)
                    .and_then(scalar_to_string)
                    .map(|value| value == wanted)
                    .unwrap_or(false)
            })
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
