//! FHIR JSON format

use crate::error::{FormatError, Result};
use crate::format::Format;
use crate::object::{self, ObjectTree, ObjectView};
use crate::tree::{Scalar, TreeElement};
use serde_json::{Map, Number, Value};

/// JSON format over `serde_json::Value`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl Format for JsonFormat {
    type Document = Value;

    fn write(&self, tree: &TreeElement) -> Result<Value> {
        object::write_document(tree)
    }

    fn read(&self, document: &Value) -> Result<TreeElement> {
        object::read_document(document)
    }
}

/// Parse number text without going through a float
fn number(text: &str) -> Result<Number> {
    serde_json::from_str::<Number>(text).map_err(FormatError::from)
}

impl ObjectTree for Value {
    fn null() -> Self {
        Value::Null
    }

    fn string(text: &str) -> Self {
        Value::String(text.to_string())
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        Ok(match scalar {
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(text) => Value::Number(number(text)?),
            Scalar::String(s) | Scalar::Lexical(s) => Value::String(s.clone()),
        })
    }

    fn array(items: Vec<Self>) -> Self {
        Value::Array(items)
    }

    fn object(entries: Vec<(String, Self)>) -> Self {
        Value::Object(entries.into_iter().collect::<Map<_, _>>())
    }

    fn view(&self) -> ObjectView<'_, Self> {
        match self {
            Value::Null => ObjectView::Null,
            Value::Bool(b) => ObjectView::Scalar(Scalar::Bool(*b)),
            Value::Number(n) => ObjectView::Scalar(Scalar::Number(n.to_string())),
            Value::String(s) => ObjectView::Scalar(Scalar::String(s.clone())),
            Value::Array(items) => ObjectView::Array(items),
            Value::Object(map) => {
                ObjectView::Object(map.iter().map(|(k, v)| (k.as_str(), v)).collect())
            }
        }
    }
}
