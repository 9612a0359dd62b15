//! Typed field values.

use serde::{Deserialize, Serialize, Serializer};

/// Declared type of an extracted field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Trimmed match, verbatim.
    #[default]
    String,
    /// Float, thousands separators stripped.
    Number,
    /// `true`, `yes`, `up`, `active`, `enabled` are true; any other match is false.
    Boolean,
}

/// Tokens that coerce to `true`.
const TRUTHY: &[&str] = &["true", "yes", "up", "active", "enabled"];

/// One extracted value.
///
/// `Absent` means the pattern did not match or the match could not be
/// coerced to the declared type. It is never folded into a default.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    /// A `string` field's trimmed capture.
    Text(String),
    /// A `number` field that parsed as a float.
    Number(f64),
    /// A `boolean` field; see [`FieldType::Boolean`].
    Bool(bool),
    /// Nothing matched, or the match did not coerce.
    #[default]
    Absent,
}

impl FieldValue {
    /// Coerce a trimmed capture to `ty`.
    pub fn coerce(raw: &str, ty: FieldType) -> Self {
        let raw = raw.trim();
        match ty {
            FieldType::String => FieldValue::Text(raw.to_string()),
            FieldType::Number => raw
                .replace(',', "")
                .parse::<f64>()
                .map(FieldValue::Number)
                .unwrap_or(FieldValue::Absent),
            FieldType::Boolean => {
                FieldValue::Bool(TRUTHY.iter().any(|t| raw.eq_ignore_ascii_case(t)))
            }
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Number(n) => serializer.serialize_f64(*n),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::Absent => serializer.serialize_none(),
        }
    }
}
