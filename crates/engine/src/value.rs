//! Stored field values and write-time coercion.
//!
//! Every value written into an instance is coerced against the declared
//! [`FieldType`] of its field, so downstream code can rely on the stored
//! variant matching the schema. Numbers are `rust_decimal::Decimal`,
//! never `f64`.

use std::str::FromStr;

use labreq_catalog::FieldType;
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use time::macros::format_description;
use time::Date;

// ──────────────────────────────────────────────
// FieldData
// ──────────────────────────────────────────────

/// The value held by one field slot of an instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldData {
    #[default]
    Empty,
    Text(String),
    Number(Decimal),
    Bool(bool),
    Date(Date),
}

impl FieldData {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldData::Empty => "Empty",
            FieldData::Text(_) => "Text",
            FieldData::Number(_) => "Number",
            FieldData::Bool(_) => "Bool",
            FieldData::Date(_) => "Date",
        }
    }

    /// True for `Empty` and for text that is blank after trimming.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldData::Empty => true,
            FieldData::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Canonical string form used for dependency comparison.
    ///
    /// Returns `None` for empty values.
    pub fn compare_string(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(match self {
            FieldData::Text(s) => s.trim().to_string(),
            FieldData::Number(d) => d.normalize().to_string(),
            FieldData::Bool(b) => b.to_string(),
            FieldData::Date(d) => format_date(d),
            FieldData::Empty => return None,
        })
    }

    /// Human-readable form for review screens.
    pub fn display_string(&self) -> String {
        match self {
            FieldData::Empty => String::new(),
            FieldData::Text(s) => s.clone(),
            FieldData::Number(d) => d.normalize().to_string(),
            FieldData::Bool(true) => "Yes".to_string(),
            FieldData::Bool(false) => "No".to_string(),
            FieldData::Date(d) => format_date(d),
        }
    }

    /// JSON form used in payloads.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            FieldData::Empty => serde_json::Value::Null,
            FieldData::Text(s) => serde_json::Value::String(s.clone()),
            FieldData::Number(d) => {
                let text = d.normalize().to_string();
                match text.parse::<serde_json::Number>() {
                    Ok(n) => serde_json::Value::Number(n),
                    Err(_) => serde_json::Value::String(text),
                }
            }
            FieldData::Bool(b) => serde_json::Value::Bool(*b),
            FieldData::Date(d) => serde_json::Value::String(format_date(d)),
        }
    }
}

impl Serialize for FieldData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

pub(crate) fn format_date(date: &Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// String form of a catalog dependency value, comparable with
/// [`FieldData::compare_string`].
pub fn json_compare_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(
            parse_decimal(&n.to_string())
                .map(|d| d.normalize().to_string())
                .unwrap_or_else(|| n.to_string()),
        ),
        other => Some(other.to_string()),
    }
}

// ──────────────────────────────────────────────
// Coercion
// ──────────────────────────────────────────────

/// Coerce raw input to the stored representation for `field_type`.
///
/// - Number: JSON numbers or numeric strings; anything unparseable is `Empty`.
/// - Boolean: strict. Only JSON `true` or the string `"true"` are true.
/// - Date: `YYYY-MM-DD` (a trailing time part is ignored); otherwise `Empty`.
/// - Text and select types: strings as given, scalars stringified.
///
/// `null` is `Empty` for every type.
pub fn coerce(field_type: FieldType, raw: &serde_json::Value) -> FieldData {
    if raw.is_null() {
        return FieldData::Empty;
    }
    match field_type {
        FieldType::Number => {
            let parsed = match raw {
                serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
                serde_json::Value::String(s) => parse_decimal(s),
                _ => None,
            };
            match parsed {
                Some(n) => FieldData::Number(n),
                None => {
                    if !matches!(raw, serde_json::Value::String(s) if s.trim().is_empty()) {
                        tracing::debug!(input = %raw, "number input discarded: not a decimal in range");
                    }
                    FieldData::Empty
                }
            }
        }
        FieldType::Boolean => FieldData::Bool(match raw {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }),
        FieldType::Date => match raw {
            serde_json::Value::String(s) => parse_date(s)
                .map(FieldData::Date)
                .unwrap_or(FieldData::Empty),
            _ => FieldData::Empty,
        },
        FieldType::ShortText | FieldType::LongText | FieldType::SingleSelect => match raw {
            serde_json::Value::String(s) if s.is_empty() => FieldData::Empty,
            serde_json::Value::String(s) => FieldData::Text(s.clone()),
            serde_json::Value::Number(n) => FieldData::Text(n.to_string()),
            serde_json::Value::Bool(b) => FieldData::Text(b.to_string()),
            _ => FieldData::Empty,
        },
    }
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

fn parse_date(s: &str) -> Option<Date> {
    let s = s.trim();
    let day = s.get(..10)?;
    if s.len() > 10 && !s[10..].starts_with('T') && !s[10..].starts_with(' ') {
        return None;
    }
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn number_coercion() {
        assert_eq!(
            coerce(FieldType::Number, &json!(" 12.50 ")),
            FieldData::Number(Decimal::from_str("12.50").unwrap())
        );
        assert_eq!(
            coerce(FieldType::Number, &json!(3)),
            FieldData::Number(Decimal::from(3))
        );
        assert_eq!(coerce(FieldType::Number, &json!("abc")), FieldData::Empty);
        assert_eq!(coerce(FieldType::Number, &json!("")), FieldData::Empty);
        assert_eq!(coerce(FieldType::Number, &json!(true)), FieldData::Empty);
    }

    #[test]
    fn out_of_range_numbers_are_empty() {
        assert_eq!(coerce(FieldType::Number, &json!(1e300)), FieldData::Empty);
        assert_eq!(coerce(FieldType::Number, &json!("1e40")), FieldData::Empty);
        assert_eq!(
            coerce(FieldType::Number, &json!("2.5e3")),
            FieldData::Number(Decimal::from(2500))
        );
    }

    #[test]
    fn boolean_coercion_is_strict() {
        assert_eq!(coerce(FieldType::Boolean, &json!(true)), FieldData::Bool(true));
        assert_eq!(coerce(FieldType::Boolean, &json!("TRUE")), FieldData::Bool(true));
        assert_eq!(coerce(FieldType::Boolean, &json!("yes")), FieldData::Bool(false));
        assert_eq!(coerce(FieldType::Boolean, &json!(1)), FieldData::Bool(false));
        assert_eq!(coerce(FieldType::Boolean, &json!(null)), FieldData::Empty);
    }

    #[test]
    fn date_coercion() {
        let d = coerce(FieldType::Date, &json!("2024-03-09"));
        assert_eq!(d.compare_string().as_deref(), Some("2024-03-09"));
        let with_time = coerce(FieldType::Date, &json!("2024-03-09T10:00:00Z"));
        assert_eq!(with_time, d);
        assert_eq!(coerce(FieldType::Date, &json!("09/03/2024")), FieldData::Empty);
        assert_eq!(coerce(FieldType::Date, &json!("2024-02-30")), FieldData::Empty);
    }

    #[test]
    fn text_coercion_stringifies_scalars() {
        assert_eq!(
            coerce(FieldType::ShortText, &json!(42)),
            FieldData::Text("42".into())
        );
        assert_eq!(
            coerce(FieldType::SingleSelect, &json!("deep")),
            FieldData::Text("deep".into())
        );
        assert_eq!(coerce(FieldType::LongText, &json!("")), FieldData::Empty);
        assert_eq!(coerce(FieldType::LongText, &json!(["a"])), FieldData::Empty);
    }

    #[test]
    fn compare_strings_normalize() {
        let n = FieldData::Number(Decimal::from_str("10.50").unwrap());
        assert_eq!(n.compare_string().as_deref(), Some("10.5"));
        assert_eq!(json_compare_string(&json!(10.5)).as_deref(), Some("10.5"));
        assert_eq!(json_compare_string(&json!(" surface ")).as_deref(), Some("surface"));
        assert_eq!(FieldData::Text("   ".into()).compare_string(), None);
        assert_eq!(FieldData::Bool(false).compare_string().as_deref(), Some("false"));
    }

    #[test]
    fn json_and_display_forms() {
        let n = FieldData::Number(Decimal::from_str("2.0").unwrap());
        assert_eq!(n.to_json(), json!(2));
        assert_eq!(FieldData::Bool(true).display_string(), "Yes");
        assert_eq!(FieldData::Empty.to_json(), serde_json::Value::Null);
        assert_eq!(serde_json::to_value(FieldData::Text("x".into())).unwrap(), json!("x"));
    }
}
