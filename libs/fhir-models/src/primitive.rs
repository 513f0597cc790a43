//! FHIR primitive types
//!
//! Every primitive has a lexical space (checked when a value is parsed from
//! text) and a value space held by [`PrimitiveValue`]. Decimals keep their
//! lexical form, so `1.50`, `1.0e3` and `-0.0` are written back unchanged
//! whatever their precision.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// FHIR R4 primitive datatypes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Integer,
    UnsignedInt,
    PositiveInt,
    Decimal,
    String,
    Code,
    Id,
    Markdown,
    Uri,
    Url,
    Canonical,
    Oid,
    Uuid,
    Base64Binary,
    Date,
    DateTime,
    Instant,
    Time,
    Xhtml,
}

/// Type code → primitive type
static PRIMITIVES_BY_CODE: phf::Map<&'static str, PrimitiveType> = phf_map! {
    "boolean" => PrimitiveType::Boolean,
    "integer" => PrimitiveType::Integer,
    "unsignedInt" => PrimitiveType::UnsignedInt,
    "positiveInt" => PrimitiveType::PositiveInt,
    "decimal" => PrimitiveType::Decimal,
    "string" => PrimitiveType::String,
    "code" => PrimitiveType::Code,
    "id" => PrimitiveType::Id,
    "markdown" => PrimitiveType::Markdown,
    "uri" => PrimitiveType::Uri,
    "url" => PrimitiveType::Url,
    "canonical" => PrimitiveType::Canonical,
    "oid" => PrimitiveType::Oid,
    "uuid" => PrimitiveType::Uuid,
    "base64Binary" => PrimitiveType::Base64Binary,
    "date" => PrimitiveType::Date,
    "dateTime" => PrimitiveType::DateTime,
    "instant" => PrimitiveType::Instant,
    "time" => PrimitiveType::Time,
    "xhtml" => PrimitiveType::Xhtml,
};

/// How a primitive is carried in formats with native scalars (JSON, hash)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Boolean,
    Number,
    Text,
}

const DATE: &str = r"([0-9]([0-9]([0-9][1-9]|[1-9]0)|[1-9]00)|[1-9]000)";
const TIME: &str = r"([01][0-9]|2[0-3]):[0-5][0-9]:([0-5][0-9]|60)(\.[0-9]+)?";
const ZONE: &str = r"(Z|(\+|-)((0[0-9]|1[0-3]):[0-5][0-9]|14:00))";

static LEXICAL_PATTERNS: Lazy<HashMap<PrimitiveType, Regex>> = Lazy::new(|| {
    let month_day = r"(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1]))?)?";
    let full_date = r"-(0[1-9]|1[0-2])-(0[1-9]|[1-2][0-9]|3[0-1])";

    let patterns = [
        (PrimitiveType::Boolean, "true|false".to_string()),
        (PrimitiveType::Integer, "[0]|[-+]?[1-9][0-9]*".to_string()),
        (PrimitiveType::UnsignedInt, "[0]|([1-9][0-9]*)".to_string()),
        (PrimitiveType::PositiveInt, r"\+?[1-9][0-9]*".to_string()),
        (
            PrimitiveType::Decimal,
            r"-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?".to_string(),
        ),
        (PrimitiveType::String, r"[ \r\n\t\S]+".to_string()),
        (PrimitiveType::Code, r"[^\s]+(\s[^\s]+)*".to_string()),
        (PrimitiveType::Id, r"[A-Za-z0-9\-\.]{1,64}".to_string()),
        (PrimitiveType::Uri, r"\S*".to_string()),
        (PrimitiveType::Url, r"\S*".to_string()),
        (PrimitiveType::Canonical, r"\S*".to_string()),
        (
            PrimitiveType::Oid,
            r"urn:oid:[0-2](\.(0|[1-9][0-9]*))+".to_string(),
        ),
        (
            PrimitiveType::Uuid,
            r"urn:uuid:[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}".to_string(),
        ),
        (
            PrimitiveType::Base64Binary,
            r"(\s*([0-9a-zA-Z\+/=]){4}\s*)+".to_string(),
        ),
        (PrimitiveType::Date, format!("{DATE}{month_day}")),
        (
            PrimitiveType::DateTime,
            format!("{DATE}(-(0[1-9]|1[0-2])(-(0[1-9]|[1-2][0-9]|3[0-1])(T{TIME}{ZONE})?)?)?"),
        ),
        (PrimitiveType::Instant, format!("{DATE}{full_date}T{TIME}{ZONE}")),
        (PrimitiveType::Time, TIME.to_string()),
        (PrimitiveType::Xhtml, r"[\s\S]+".to_string()),
    ];

    patterns
        .into_iter()
        .map(|(ty, pattern)| {
            let anchored = format!("^(?:{pattern})$");
            let regex = Regex::new(&anchored).expect("invalid built-in lexical pattern");
            (ty, regex)
        })
        .collect()
});

impl PrimitiveType {
    /// Look up a primitive type by its FHIR type code
    pub fn from_code(code: &str) -> Option<Self> {
        PRIMITIVES_BY_CODE.get(code).copied()
    }

    /// The FHIR type code (`dateTime`, `base64Binary`, ...)
    pub fn code(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::UnsignedInt => "unsignedInt",
            Self::PositiveInt => "positiveInt",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Code => "code",
            Self::Id => "id",
            Self::Markdown => "markdown",
            Self::Uri => "uri",
            Self::Url => "url",
            Self::Canonical => "canonical",
            Self::Oid => "oid",
            Self::Uuid => "uuid",
            Self::Base64Binary => "base64Binary",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::Instant => "instant",
            Self::Time => "time",
            Self::Xhtml => "xhtml",
        }
    }

    pub fn scalar_kind(self) -> ScalarKind {
        match self {
            Self::Boolean => ScalarKind::Boolean,
            Self::Integer | Self::UnsignedInt | Self::PositiveInt | Self::Decimal => {
                ScalarKind::Number
            }
            _ => ScalarKind::Text,
        }
    }

    /// Check `text` against the lexical space of this type
    pub fn is_lexically_valid(self, text: &str) -> bool {
        LEXICAL_PATTERNS
            .get(&self)
            .map_or(true, |pattern| pattern.is_match(text))
    }

    /// Parse the canonical text form of a value of this type.
    pub fn parse(self, text: &str) -> Result<PrimitiveValue> {
        let invalid = || Error::InvalidPrimitive {
            type_code: self.code().to_string(),
            value: text.to_string(),
        };

        if !self.is_lexically_valid(text) {
            return Err(invalid());
        }

        match self {
            Self::Boolean => Ok(PrimitiveValue::Boolean(text == "true")),
            Self::Integer => text
                .parse::<i32>()
                .map(|v| PrimitiveValue::Integer(v.into()))
                .map_err(|_| invalid()),
            Self::UnsignedInt => text
                .parse::<i32>()
                .ok()
                .filter(|v| *v >= 0)
                .map(|v| PrimitiveValue::Integer(v.into()))
                .ok_or_else(invalid),
            Self::PositiveInt => text
                .parse::<i32>()
                .ok()
                .filter(|v| *v >= 1)
                .map(|v| PrimitiveValue::Integer(v.into()))
                .ok_or_else(invalid),
            Self::Decimal => text.parse().map(PrimitiveValue::Decimal),
            Self::Date | Self::DateTime | Self::Instant => {
                if has_valid_calendar_date(text) {
                    Ok(PrimitiveValue::Text(text.to_string()))
                } else {
                    Err(invalid())
                }
            }
            _ => Ok(PrimitiveValue::Text(text.to_string())),
        }
    }

    /// Check that an already-typed value belongs to the value space of this type
    pub fn accepts(self, value: &PrimitiveValue) -> bool {
        match (self, value) {
            (Self::Boolean, PrimitiveValue::Boolean(_)) => true,
            (Self::Integer, PrimitiveValue::Integer(v)) => i32::try_from(*v).is_ok(),
            (Self::UnsignedInt, PrimitiveValue::Integer(v)) => {
                i32::try_from(*v).is_ok_and(|v| v >= 0)
            }
            (Self::PositiveInt, PrimitiveValue::Integer(v)) => {
                i32::try_from(*v).is_ok_and(|v| v >= 1)
            }
            (Self::Decimal, PrimitiveValue::Decimal(_)) => true,
            (ty, PrimitiveValue::Text(text)) if ty.scalar_kind() == ScalarKind::Text => {
                ty.is_lexically_valid(text)
            }
            _ => false,
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Check the calendar validity of the date part (rejects `2021-02-30`)
fn has_valid_calendar_date(text: &str) -> bool {
    if text.len() < 10 {
        return true;
    }
    NaiveDate::parse_from_str(&text[..10], "%Y-%m-%d").is_ok()
}

/// A `decimal` in its lexical form.
///
/// The text is the value: two decimals are equal when they are written the
/// same way. [`DecimalValue::to_decimal`] gives a number for arithmetic when
/// it fits in a [`Decimal`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    text: String,
}

impl DecimalValue {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Numeric value, `None` when it exceeds the range or precision of [`Decimal`]
    pub fn to_decimal(&self) -> Option<Decimal> {
        let parsed = if self.text.contains(['e', 'E']) {
            Decimal::from_scientific(&self.text)
        } else {
            Decimal::from_str_exact(&self.text)
        };
        parsed.ok()
    }
}

impl FromStr for DecimalValue {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        if !PrimitiveType::Decimal.is_lexically_valid(text) {
            return Err(Error::InvalidPrimitive {
                type_code: PrimitiveType::Decimal.code().to_string(),
                value: text.to_string(),
            });
        }
        Ok(Self {
            text: text.to_string(),
        })
    }
}

impl From<Decimal> for DecimalValue {
    fn from(value: Decimal) -> Self {
        Self {
            text: value.to_string(),
        }
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A primitive value in its value space
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Boolean(bool),
    /// `integer`, `unsignedInt` and `positiveInt`
    Integer(i64),
    Decimal(DecimalValue),
    /// Every text-carried type (strings, codes, uris, dates, ...)
    Text(String),
}

impl PrimitiveValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<&DecimalValue> {
        match self {
            Self::Decimal(d) => Some(d),
            _ => None,
        }
    }
}

/// Canonical text form
impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Decimal(d) => write!(f, "{}", d),
            Self::Text(s) => f.write_str(s),
        }
    }
}
