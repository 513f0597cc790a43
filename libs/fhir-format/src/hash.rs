//! Plain ordered hash format
//!
//! Same key layout as FHIR JSON but with native scalars: integers as `i64`
//! and every other number as a [`DecimalValue`] holding its exact text.

use crate::error::{FormatError, Result};
use crate::format::Format;
use crate::object::{self, ObjectTree, ObjectView};
use crate::tree::{Scalar, TreeElement};
use ferrum_models::DecimalValue;
use indexmap::IndexMap;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub enum HashValue {
    Null,
    Bool(bool),
    Integer(i64),
    Decimal(DecimalValue),
    String(String),
    List(Vec<HashValue>),
    Map(IndexMap<String, HashValue>),
}

impl HashValue {
    pub fn get(&self, key: &str) -> Option<&HashValue> {
        match self {
            Self::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[HashValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric value of a number, `None` when it does not fit a [`Decimal`]
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::Decimal(d) => d.to_decimal(),
            Self::Integer(i) => Some(Decimal::from(*i)),
            _ => None,
        }
    }
}

/// Hash format over [`HashValue`]
#[derive(Debug, Clone, Copy, Default)]
pub struct HashFormat;

impl Format for HashFormat {
    type Document = HashValue;

    fn write(&self, tree: &TreeElement) -> Result<HashValue> {
        object::write_document(tree)
    }

    fn read(&self, document: &HashValue) -> Result<TreeElement> {
        object::read_document(document)
    }
}

// Integers only when the text is their canonical form (`-0` stays a decimal).
fn number(text: &str) -> Result<HashValue> {
    if let Ok(i) = text.parse::<i64>() {
        if i.to_string() == text {
            return Ok(HashValue::Integer(i));
        }
    }
    text.parse::<DecimalValue>()
        .map(HashValue::Decimal)
        .map_err(|_| FormatError::InvalidContent {
            path: text.to_string(),
            message: "not a decimal number".to_string(),
        })
}

impl ObjectTree for HashValue {
    fn null() -> Self {
        HashValue::Null
    }

    fn string(text: &str) -> Self {
        HashValue::String(text.to_string())
    }

    fn from_scalar(scalar: &Scalar) -> Result<Self> {
        match scalar {
            Scalar::Bool(b) => Ok(HashValue::Bool(*b)),
            Scalar::Number(text) => number(text),
            Scalar::String(s) | Scalar::Lexical(s) => Ok(HashValue::String(s.clone())),
        }
    }

    fn array(items: Vec<Self>) -> Self {
        HashValue::List(items)
    }

    fn object(entries: Vec<(String, Self)>) -> Self {
        HashValue::Map(entries.into_iter().collect())
    }

    fn view(&self) -> ObjectView<'_, Self> {
        match self {
            HashValue::Null => ObjectView::Null,
            HashValue::Bool(b) => ObjectView::Scalar(Scalar::Bool(*b)),
            HashValue::Integer(i) => ObjectView::Scalar(Scalar::Number(i.to_string())),
            HashValue::Decimal(d) => ObjectView::Scalar(Scalar::Number(d.as_str().to_string())),
            HashValue::String(s) => ObjectView::Scalar(Scalar::String(s.clone())),
            HashValue::List(items) => ObjectView::Array(items),
            HashValue::Map(map) => {
                ObjectView::Object(map.iter().map(|(k, v)| (k.as_str(), v)).collect())
            }
        }
    }
}
