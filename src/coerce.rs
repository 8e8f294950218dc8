//! Conversions between node text and scalar values
//!
//! Reading is permissive: bad integers become 0 and bad dates become [`Value::Null`].
//! Kolab clients in the wild write all sorts of things, and refusing them would make their objects unreadable.

use chrono::{TimeZone, Utc};

use crate::date;
use crate::error::{FormatError, FormatResult};
use crate::schema::ValueType;
use crate::value::Value;

/// Convert the text of a node into a value of the given scalar type
pub fn load_scalar(value_type: &ValueType, text: &str) -> FormatResult<Value> {
    let value = match value_type {
        ValueType::String | ValueType::Color => Value::String(text.to_string()),
        ValueType::Integer => Value::Integer(parse_leading_int(text)),
        ValueType::Boolean => Value::Boolean(is_truthy(text)),
        ValueType::Date => date::decode_date(text).map(Value::Date).unwrap_or(Value::Null),
        ValueType::DateTime => date::decode_datetime(text).map(Value::DateTime).unwrap_or(Value::Null),
        ValueType::DateOrDateTime => date::decode_date_or_datetime(text),
        ValueType::Composite(_) | ValueType::Multiple(_) => {
            return Err(FormatError::InvalidSchema(format!("{:?} is not a scalar type", value_type)));
        },
    };
    Ok(value)
}

/// Convert a value into the text of a node of the given scalar type.
///
/// Strings handed over for typed fields are kept verbatim, unless they are dates that can be normalized.
pub fn encode_scalar(field: &str, value_type: &ValueType, value: &Value) -> FormatResult<String> {
    let text = match (value_type, value) {
        (_, Value::Map(_)) | (_, Value::List(_)) => {
            return Err(FormatError::invalid_value(field, format!("a {} cannot be written as a scalar", value.kind())));
        },
        (_, Value::Null) => String::new(),

        (ValueType::Boolean, Value::Boolean(b)) => bool_text(*b),
        (ValueType::Boolean, Value::String(s)) => bool_text(is_truthy(s)),
        (ValueType::Boolean, Value::Integer(i)) => bool_text(*i != 0),

        (ValueType::Integer, Value::Boolean(b)) => if *b { "1".to_string() } else { "0".to_string() },

        (ValueType::Date, Value::String(s)) => match date::decode_date(s) {
            Some(d) => date::encode_date(&d),
            None => s.clone(),
        },
        (ValueType::Date, Value::DateTime(dt)) => date::encode_date(&dt.date_naive()),

        (ValueType::DateTime, Value::String(s)) => match date::decode_datetime(s) {
            Some(dt) => date::encode_datetime(&dt),
            None => s.clone(),
        },
        (ValueType::DateTime, Value::Date(d)) => match d.and_hms_opt(0, 0, 0) {
            Some(midnight) => date::encode_datetime(&Utc.from_utc_datetime(&midnight)),
            None => date::encode_date(d),
        },

        (ValueType::DateOrDateTime, Value::String(s)) => match date::decode_date_or_datetime(s) {
            Value::Date(d) => date::encode_date(&d),
            Value::DateTime(dt) => date::encode_datetime(&dt),
            _ => s.clone(),
        },

        (ValueType::Integer, Value::Date(_)) | (ValueType::Integer, Value::DateTime(_))
        | (ValueType::Boolean, Value::Date(_)) | (ValueType::Boolean, Value::DateTime(_)) => {
            return Err(FormatError::invalid_value(field, format!("a {} cannot be written as {:?}", value.kind(), value_type)));
        },

        (ValueType::Composite(_), _) | (ValueType::Multiple(_), _) => {
            return Err(FormatError::InvalidSchema(format!("{} is not a scalar field", field)));
        },

        // Everything else is written in its natural form
        (_, Value::String(s)) => s.clone(),
        (_, Value::Integer(i)) => i.to_string(),
        (_, Value::Boolean(b)) => bool_text(*b),
        (_, Value::Date(d)) => date::encode_date(d),
        (_, Value::DateTime(dt)) => date::encode_datetime(dt),
    };
    Ok(text)
}

/// Only the empty string and the literal `false` are false
pub fn is_truthy(text: &str) -> bool {
    !(text.is_empty() || text == "false")
}

fn bool_text(b: bool) -> String {
    if b { "true".to_string() } else { "false".to_string() }
}

/// Read the leading decimal integer of a text, the way loosely typed clients do.
/// `"42abc"` is 42, `"abc"` is 0, overflowing values saturate
pub fn parse_leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let mut result: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        let digit = i64::from(b - b'0');
        result = result.saturating_mul(10);
        result = if negative { result.saturating_sub(digit) } else { result.saturating_add(digit) };
    }
    result
}
