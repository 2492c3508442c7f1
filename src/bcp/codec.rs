//! Conversion between raw field text and typed values.
//!
//! An empty field is NULL. A field holding a single NUL character is the
//! empty string, which is how bcp tells the two apart in character files.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::bcp::types::{Field, TypeTag, Value};
use crate::error::{Error, Result};

/// Marker bcp uses for an empty (non-NULL) string.
pub const EMPTY_STRING_MARKER: &str = "\0";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATETIME_OFFSET_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %:z";

/// Decode one raw field value according to the field's type tag.
pub fn decode_field(raw: &str, field: &Field) -> Result<Value> {
    if raw.is_empty() {
        return Ok(Value::Null);
    }
    if raw == EMPTY_STRING_MARKER {
        return Ok(Value::String(String::new()));
    }

    let decode_error = || Error::Decode {
        field: field.name.clone(),
        type_tag: field.type_tag.to_string(),
        value: raw.to_string(),
    };

    match &field.type_tag {
        TypeTag::DateTime | TypeTag::DateTim4 | TypeTag::DateTime2 | TypeTag::DateTimeOffset => {
            parse_timestamp(raw).map(Value::DateTime).ok_or_else(decode_error)
        }
        TypeTag::TinyInt | TypeTag::SmallInt | TypeTag::Int | TypeTag::BigInt => {
            raw.trim().parse::<i64>().map(Value::Int).map_err(|_| decode_error())
        }
        TypeTag::Flt4 | TypeTag::Flt8 => {
            raw.trim().parse::<f64>().map(Value::Float).map_err(|_| decode_error())
        }
        TypeTag::Bit => Ok(Value::Bool(raw == "1")),
        TypeTag::Other(_) => Ok(Value::String(raw.to_string())),
    }
}

/// Encode a value as the raw text a character-mode data file carries.
pub fn encode_value(value: &Value, field: &Field) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if s.is_empty() => EMPTY_STRING_MARKER.to_string(),
        Value::String(s) => s.clone(),
        Value::Int(n) => n.to_string(),
        Value::Float(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => "0".to_string(),
        Value::DateTime(dt) => match field.type_tag {
            TypeTag::DateTimeOffset => dt.format(DATETIME_OFFSET_FORMAT).to_string(),
            _ => dt.naive_utc().format(DATETIME_FORMAT).to_string(),
        },
    }
}

/// Parse the timestamp layouts bcp writes. Values without an offset are UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    let utc = FixedOffset::east_opt(0)?;

    if let Ok(dt) = DateTime::parse_from_str(raw, DATETIME_OFFSET_FORMAT) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT) {
        return Some(utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    DateTime::parse_from_rfc3339(raw).ok().or_else(|| {
        raw.parse::<DateTime<Utc>>().ok().map(|dt| dt.with_timezone(&utc))
    })
}
