//! Embedding normalization.
//!
//! Embeddings reach us from several producers: straight from the embedding
//! API as arrays, round-tripped through the database as JSON text, or wrapped
//! in an object. `RawEmbedding` names those shapes and [`normalize`] turns any
//! of them into a plain vector, or `None` when nothing usable is there.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Property checked before scanning the rest of a wrapped embedding
const CONVENTIONAL_KEY: &str = "embedding";

/// An embedding as stored, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawEmbedding {
    /// Numeric array; `null` elements are kept as NaN (absent component)
    Vector(Vec<f32>),
    /// Text that should hold a JSON-encoded embedding
    Encoded(String),
    /// Object carrying the vector in one of its properties
    Wrapped(Map<String, Value>),
    Unrecognized(Value),
}

impl From<Value> for RawEmbedding {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Encoded(text),
            Value::Object(map) => Self::Wrapped(map),
            Value::Array(items) => match numeric_sequence(&items) {
                Some(values) => Self::Vector(values),
                None => Self::Unrecognized(Value::Array(items)),
            },
            other => Self::Unrecognized(other),
        }
    }
}

impl From<RawEmbedding> for Value {
    fn from(raw: RawEmbedding) -> Self {
        match raw {
            RawEmbedding::Vector(values) => Value::Array(
                values
                    .into_iter()
                    .map(|x| {
                        serde_json::Number::from_f64(x as f64)
                            .map(Value::Number)
                            .unwrap_or(Value::Null)
                    })
                    .collect(),
            ),
            RawEmbedding::Encoded(text) => Value::String(text),
            RawEmbedding::Wrapped(map) => Value::Object(map),
            RawEmbedding::Unrecognized(value) => value,
        }
    }
}

impl From<Vec<f32>> for RawEmbedding {
    fn from(values: Vec<f32>) -> Self {
        Self::Vector(values)
    }
}

/// Read a JSON array as a vector.
///
/// Every element must be a number or `null`, and at least one must be a number.
fn numeric_sequence(items: &[Value]) -> Option<Vec<f32>> {
    let mut seen_number = false;

    let values = items
        .iter()
        .map(|item| match item {
            Value::Number(n) => {
                seen_number = true;
                n.as_f64().map(|x| x as f32)
            }
            Value::Null => Some(f32::NAN),
            _ => None,
        })
        .collect::<Option<Vec<f32>>>()?;

    seen_number.then_some(values)
}

/// Normalize one stored embedding into a non-empty vector.
///
/// Never fails on malformed input: undecodable text, empty arrays and objects
/// without a numeric property all yield `None`.
pub fn normalize(raw: &RawEmbedding) -> Option<Vec<f32>> {
    match raw {
        RawEmbedding::Encoded(text) => {
            let value: Value = serde_json::from_str(text).ok()?;
            match RawEmbedding::from(value) {
                // only one level of encoding is unwrapped
                RawEmbedding::Encoded(_) => None,
                decoded => normalize(&decoded),
            }
        }
        RawEmbedding::Vector(values) => (!values.is_empty()).then(|| values.clone()),
        RawEmbedding::Wrapped(map) => from_wrapped(map),
        RawEmbedding::Unrecognized(_) => None,
    }
}

fn from_wrapped(map: &Map<String, Value>) -> Option<Vec<f32>> {
    map.get(CONVENTIONAL_KEY)
        .into_iter()
        .chain(
            map.iter()
                .filter(|(key, _)| key.as_str() != CONVENTIONAL_KEY)
                .map(|(_, value)| value),
        )
        .find_map(|value| match value {
            Value::Array(items) => numeric_sequence(items).filter(|v| !v.is_empty()),
            _ => None,
        })
}

/// Normalize a batch, silently dropping records without a usable vector.
pub fn normalize_all<'a, I>(records: I) -> Vec<Vec<f32>>
where
    I: IntoIterator<Item = &'a RawEmbedding>,
{
    records.into_iter().filter_map(normalize).collect()
}
