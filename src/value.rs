//! Text-protocol value codec: per-variant SQL escaping and field-type keyed
//! decoding of row data.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::consts::field_types;
use crate::error::{Error, Result};

/// A decoded column value, also the input shape for SQL escaping.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
    Duration(Duration),
    Decimal(BigDecimal),
    Seq(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }
}

/// Translate the escape set to backslash form. Under NO_BACKSLASH_ESCAPES
/// only the quote is doubled.
pub fn escape_string(s: &str, no_backslash_escapes: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if no_backslash_escapes {
            if ch == '\'' {
                out.push_str("''");
            } else {
                out.push(ch);
            }
            continue;
        }
        match ch {
            '\0' => out.push_str("\\0"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_bytes(data: &[u8], binary_prefix: bool) -> String {
    let mut out = String::with_capacity(data.len() * 2 + 12);
    if binary_prefix {
        out.push_str("_binary ");
    }
    out.push_str("X'");
    for b in data {
        out.push_str(&format!("{b:02X}"));
    }
    out.push('\'');
    out
}

fn escape_float(f: f64) -> Result<String> {
    if !f.is_finite() {
        return Err(Error::programming(format!("{f} can not be used with MySQL")));
    }
    let mut s = format!("{f:?}");
    if !s.contains(['e', 'E']) {
        s.push_str("e0");
    }
    Ok(s)
}

fn escape_duration(d: &Duration) -> String {
    let negative = d < &Duration::zero();
    let abs = if negative { -*d } else { *d };
    let seconds = abs.num_seconds();
    let micros = abs.num_microseconds().map(|us| us % 1_000_000).unwrap_or(0);
    let sign = if negative { "-" } else { "" };
    if micros != 0 {
        format!(
            "'{}{:02}:{:02}:{:02}.{:06}'",
            sign,
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60,
            micros
        )
    } else {
        format!(
            "'{}{:02}:{:02}:{:02}'",
            sign,
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        )
    }
}

fn escape_datetime(dt: &NaiveDateTime) -> String {
    if dt.time().nanosecond() != 0 {
        format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S%.6f"))
    } else {
        format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S"))
    }
}

fn escape_time(t: &NaiveTime) -> String {
    if t.nanosecond() != 0 {
        format!("'{}'", t.format("%H:%M:%S%.6f"))
    } else {
        format!("'{}'", t.format("%H:%M:%S"))
    }
}

/// Render a value as a text-protocol SQL literal.
pub fn escape(value: &Value, no_backslash_escapes: bool, binary_prefix: bool) -> Result<String> {
    let out = match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        Value::Float(f) => escape_float(*f)?,
        Value::Str(s) => format!("'{}'", escape_string(s, no_backslash_escapes)),
        Value::Bytes(b) => escape_bytes(b, binary_prefix),
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::DateTime(dt) => escape_datetime(dt),
        Value::Time(t) => escape_time(t),
        Value::Duration(d) => escape_duration(d),
        Value::Decimal(d) => d.to_string(),
        Value::Seq(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(escape(item, no_backslash_escapes, binary_prefix)?);
            }
            format!("({})", parts.join(","))
        }
        Value::Map(entries) => {
            let mut parts = Vec::with_capacity(entries.len());
            for (_, item) in entries {
                parts.push(escape(item, no_backslash_escapes, binary_prefix)?);
            }
            format!("({})", parts.join(","))
        }
    };
    Ok(out)
}

fn raw(data: &[u8], as_text: bool) -> Value {
    if as_text {
        Value::Str(String::from_utf8_lossy(data).into_owned())
    } else {
        Value::Bytes(data.to_vec())
    }
}

fn decode_int(text: &str, data: &[u8], as_text: bool) -> Value {
    if let Ok(n) = text.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(n) = text.parse::<u64>() {
        return Value::UInt(n);
    }
    raw(data, as_text)
}

fn decode_duration(text: &str) -> Option<Duration> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut parts = body.splitn(3, ':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds_part = parts.next()?;
    let (seconds, micros) = match seconds_part.split_once('.') {
        Some((s, frac)) => {
            let mut frac = frac.to_string();
            while frac.len() < 6 {
                frac.push('0');
            }
            (s.parse::<i64>().ok()?, frac[..6].parse::<i64>().ok()?)
        }
        None => (seconds_part.parse::<i64>().ok()?, 0),
    };
    let total = Duration::hours(hours)
        + Duration::minutes(minutes)
        + Duration::seconds(seconds)
        + Duration::microseconds(micros);
    Some(if negative { -total } else { total })
}

/// Decode one text-protocol column value.
///
/// `as_text` is the per-column plan fixed at field-list time: whether the
/// bytes should be decoded into a string (connection encoding) or passed
/// through (binary column or `use_unicode` off).
pub fn decode_text(type_code: u8, as_text: bool, data: &[u8]) -> Value {
    use field_types::*;

    // Numeric and temporal values are ASCII regardless of the column charset.
    let text = std::str::from_utf8(data).ok();

    match type_code {
        NULL => Value::Null,
        TINY | SHORT | LONG | LONGLONG | INT24 | YEAR => match text {
            Some(t) => decode_int(t, data, as_text),
            None => raw(data, as_text),
        },
        FLOAT | DOUBLE => match text.and_then(|t| t.parse::<f64>().ok()) {
            Some(f) => Value::Float(f),
            None => raw(data, as_text),
        },
        DECIMAL | NEWDECIMAL => match text.and_then(|t| BigDecimal::from_str(t).ok()) {
            Some(d) => Value::Decimal(d),
            None => raw(data, as_text),
        },
        DATE | NEWDATE => match text.and_then(|t| NaiveDate::parse_from_str(t, "%Y-%m-%d").ok()) {
            Some(d) => Value::Date(d),
            // zero dates and other invalid values fall back to the raw text
            None => raw(data, true),
        },
        DATETIME | TIMESTAMP => {
            match text.and_then(|t| NaiveDateTime::parse_from_str(t, "%Y-%m-%d %H:%M:%S%.f").ok()) {
                Some(dt) => Value::DateTime(dt),
                None => raw(data, true),
            }
        }
        TIME => match text.and_then(decode_duration) {
            Some(d) => Value::Duration(d),
            None => raw(data, true),
        },
        BIT => Value::Bytes(data.to_vec()),
        _ => raw(data, as_text),
    }
}
