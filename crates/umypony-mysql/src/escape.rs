//! Literal escaping for MySQL text-protocol SQL.
//!
//! A `ConverterTable` is an ordered list of `(Kind, Converter)` pairs. The
//! first entry whose kind accepts a value's kind renders it; values no
//! entry accepts come back untouched as `Escaped::Unmatched` and the
//! caller decides what to do with them.

use std::sync::{Arc, LazyLock};

use chrono::{NaiveDateTime, NaiveTime, Timelike};
use umypony_core::{Kind, Value};

/// Renders one value as SQL literal text.
pub type Converter = fn(&Value, Kind) -> String;

static DEFAULT_TABLE: LazyLock<Arc<ConverterTable>> =
    LazyLock::new(|| Arc::new(ConverterTable::mysql_defaults()));

/// Ordered kind -> converter table.
///
/// Read-only once built; share it behind an `Arc`.
#[derive(Clone)]
pub struct ConverterTable {
    entries: Vec<(Kind, Converter)>,
}

impl std::fmt::Debug for ConverterTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(kind, _)| kind))
            .finish()
    }
}

impl ConverterTable {
    /// Build a table from entries in lookup order.
    pub fn new(entries: Vec<(Kind, Converter)>) -> Self {
        Self { entries }
    }

    /// A table with no entries; every value comes back unmatched.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The process-wide default table, built on first use.
    pub fn default_table() -> Arc<Self> {
        Arc::clone(&DEFAULT_TABLE)
    }

    /// The MySQL default converters.
    ///
    /// `DateTime` precedes `Date` so datetimes keep their time part.
    pub fn mysql_defaults() -> Self {
        Self::empty()
            .with(Kind::Null, null_literal)
            .with(Kind::Bool, bool_literal)
            .with(Kind::Integer, integer_literal)
            .with(Kind::Float, float_literal)
            .with(Kind::Decimal, decimal_literal)
            .with(Kind::Text, quote_text)
            .with(Kind::Binary, hex_literal)
            .with(Kind::DateTime, datetime_literal)
            .with(Kind::Date, date_literal)
            .with(Kind::Time, time_literal)
            .with(Kind::Uuid, hex_literal)
            .with(Kind::Json, json_literal)
    }

    /// Append an entry after the existing ones.
    #[must_use]
    pub fn with(mut self, kind: Kind, converter: Converter) -> Self {
        self.entries.push((kind, converter));
        self
    }

    pub fn entries(&self) -> &[(Kind, Converter)] {
        &self.entries
    }

    /// The first entry accepting `value`, in table order.
    pub fn lookup(&self, value: &Value) -> Option<(Kind, Converter)> {
        self.entries
            .iter()
            .find(|(kind, _)| kind.matches(value))
            .copied()
    }
}

/// Outcome of escaping one value.
#[derive(Debug, Clone, PartialEq)]
pub enum Escaped<'a> {
    /// Literal text produced by a converter
    Literal(String),
    /// No converter accepted the value
    Unmatched(&'a Value),
}

impl Escaped<'_> {
    pub fn is_literal(&self) -> bool {
        matches!(self, Escaped::Literal(_))
    }

    /// The text to splice into SQL; unmatched values use their plain
    /// `Display` form with no quoting.
    pub fn into_text(self) -> String {
        match self {
            Escaped::Literal(text) => text,
            Escaped::Unmatched(value) => value.to_string(),
        }
    }
}

/// Escape `value` with the first converter in `table` that accepts it.
pub fn escape<'a>(value: &'a Value, table: &ConverterTable) -> Escaped<'a> {
    match table.lookup(value) {
        Some((kind, convert)) => Escaped::Literal(convert(value, kind)),
        None => Escaped::Unmatched(value),
    }
}

/// Escape a string for use inside single quotes.
///
/// Uses MySQL backslash escapes, so the session must not run with
/// `NO_BACKSLASH_ESCAPES`.
pub fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('\'');
    for ch in s.chars() {
        match ch {
            '\0' => result.push_str("\\0"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '\x1a' => result.push_str("\\Z"), // Ctrl+Z
            _ => result.push(ch),
        }
    }
    result.push('\'');
    result
}

/// Escape bytes as a hex literal.
pub fn escape_bytes(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 2 + 3);
    result.push_str("X'");
    for byte in data {
        result.push_str(&format!("{byte:02X}"));
    }
    result.push('\'');
    result
}

pub fn null_literal(_value: &Value, _kind: Kind) -> String {
    "NULL".to_string()
}

pub fn bool_literal(value: &Value, kind: Kind) -> String {
    match value {
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        other => integer_literal(other, kind),
    }
}

pub fn integer_literal(value: &Value, _kind: Kind) -> String {
    match value.as_i64() {
        Some(i) => i.to_string(),
        None => value.to_string(),
    }
}

pub fn float_literal(value: &Value, _kind: Kind) -> String {
    match value {
        Value::Float(f) => finite_or_bound(f64::from(*f), || f.to_string()),
        Value::Double(f) => finite_or_bound(*f, || f.to_string()),
        other => other.to_string(),
    }
}

/// `text` for finite floats; NaN is `NULL` and infinities clamp to
/// `±1e308`. `text` formats at the value's own width.
fn finite_or_bound(f: f64, text: impl FnOnce() -> String) -> String {
    if f.is_nan() {
        "NULL".to_string()
    } else if f.is_infinite() {
        if f.is_sign_positive() { "1e308" } else { "-1e308" }.to_string()
    } else {
        text()
    }
}

/// Decimals unquoted; anything else in the slot is quoted as text.
pub fn decimal_literal(value: &Value, _kind: Kind) -> String {
    match value {
        Value::Decimal(d) => d.to_string(),
        other => quote_text(other, Kind::Text),
    }
}

/// The value's own text, unquoted.
pub fn plain_literal(value: &Value, _kind: Kind) -> String {
    value.to_string()
}

/// The value's text, quoted and escaped.
pub fn quote_text(value: &Value, _kind: Kind) -> String {
    match value.as_str() {
        Some(s) => escape_string(s),
        None => escape_string(&value.to_string()),
    }
}

pub fn hex_literal(value: &Value, _kind: Kind) -> String {
    match value {
        Value::Bytes(b) => escape_bytes(b),
        Value::Uuid(u) => escape_bytes(u.as_bytes()),
        other => quote_text(other, Kind::Text),
    }
}

pub fn date_literal(value: &Value, kind: Kind) -> String {
    match value {
        Value::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Value::Timestamp(_) => datetime_literal(value, kind),
        other => quote_text(other, Kind::Text),
    }
}

pub fn datetime_literal(value: &Value, _kind: Kind) -> String {
    match value {
        Value::Timestamp(ts) => format!("'{}'", format_datetime(ts)),
        other => quote_text(other, Kind::Text),
    }
}

pub fn time_literal(value: &Value, _kind: Kind) -> String {
    match value {
        Value::Time(t) => format!("'{}'", format_time(t)),
        other => quote_text(other, Kind::Text),
    }
}

pub fn json_literal(value: &Value, _kind: Kind) -> String {
    match value {
        Value::Json(j) => escape_string(&j.to_string()),
        other => quote_text(other, Kind::Text),
    }
}

fn format_datetime(ts: &NaiveDateTime) -> String {
    format!("{} {}", ts.date().format("%Y-%m-%d"), format_time(&ts.time()))
}

fn format_time(t: &NaiveTime) -> String {
    let micros = t.nanosecond() / 1_000;
    if micros == 0 {
        t.format("%H:%M:%S").to_string()
    } else {
        format!("{}.{micros:06}", t.format("%H:%M:%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn defaults() -> Arc<ConverterTable> {
        ConverterTable::default_table()
    }

    fn literal(value: Value) -> String {
        escape(&value, &defaults()).into_text()
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("hello"), "'hello'");
        assert_eq!(escape_string("it's"), "'it\\'s'");
        assert_eq!(escape_string("a\\b"), "'a\\\\b'");
        assert_eq!(escape_string("say \"hi\""), "'say \\\"hi\\\"'");
        assert_eq!(escape_string("line\nbreak\r"), "'line\\nbreak\\r'");
        assert_eq!(escape_string("nul\0z\x1a"), "'nul\\0z\\Z'");
    }

    #[test]
    fn test_null_and_numbers_unquoted() {
        assert_eq!(literal(Value::Null), "NULL");
        assert_eq!(literal(Value::Int(-5)), "-5");
        assert_eq!(literal(Value::BigInt(9_007_199_254_740_993)), "9007199254740993");
        assert_eq!(literal(Value::Double(2.5)), "2.5");
        assert_eq!(literal(Value::Decimal(Decimal::new(1025, 2))), "10.25");
        assert_eq!(literal(Value::Bool(true)), "1");
        assert_eq!(literal(Value::Bool(false)), "0");
    }

    #[test]
    fn test_floats_keep_their_own_width() {
        assert_eq!(literal(Value::Float(0.1)), "0.1");
        assert_eq!(literal(Value::Float(-2.75)), "-2.75");
        assert_eq!(literal(Value::Double(0.1)), "0.1");
    }

    #[test]
    fn test_decimal_from_untrusted_input_stays_numeric() {
        let value: Value = serde_json::from_str(r#"{"Decimal":"-0.005"}"#).expect("deserialize");
        assert_eq!(literal(value), "-0.005");

        let injected = serde_json::from_str::<Value>(r#"{"Decimal":"0 OR 1=1; DROP TABLE users"}"#);
        assert!(injected.is_err());

        let odd = ConverterTable::empty().with(Kind::Any, decimal_literal);
        assert_eq!(escape(&Value::from("1; DROP"), &odd).into_text(), "'1; DROP'");
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(literal(Value::Double(f64::NAN)), "NULL");
        assert_eq!(literal(Value::Float(f32::INFINITY)), "1e308");
        assert_eq!(literal(Value::Double(f64::NEG_INFINITY)), "-1e308");
    }

    #[test]
    fn test_text_binary_and_uuid() {
        assert_eq!(literal(Value::from("O'Brien")), "'O\\'Brien'");
        assert_eq!(literal(Value::Bytes(vec![0x00, 0xAB])), "X'00AB'");
        let id = uuid::Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        assert_eq!(literal(Value::Uuid(id)), "X'0123456789ABCDEF0123456789ABCDEF'");
        assert_eq!(literal(serde_json::json!({"k": "v'"}).into()), r#"'{\"k\":\"v\'\"}'"#);
    }

    #[test]
    fn test_temporal_literals() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid date");
        let ts = date.and_hms_micro_opt(7, 5, 3, 120).expect("valid datetime");
        let whole = date.and_hms_opt(23, 59, 59).expect("valid datetime");

        assert_eq!(literal(Value::Date(date)), "'2024-03-09'");
        assert_eq!(literal(Value::Timestamp(ts)), "'2024-03-09 07:05:03.000120'");
        assert_eq!(literal(Value::Timestamp(whole)), "'2024-03-09 23:59:59'");
        assert_eq!(literal(Value::Time(ts.time())), "'07:05:03.000120'");
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let table = ConverterTable::empty()
            .with(Kind::Integer, plain_literal)
            .with(Kind::Bool, bool_literal);
        // Integer accepts Bool and comes first.
        assert_eq!(escape(&Value::Bool(true), &table).into_text(), "true");

        let table = ConverterTable::empty()
            .with(Kind::Bool, bool_literal)
            .with(Kind::Integer, plain_literal);
        assert_eq!(escape(&Value::Bool(true), &table).into_text(), "1");
    }

    #[test]
    fn test_date_slot_accepts_datetime() {
        let table = ConverterTable::empty().with(Kind::Date, date_literal);
        let ts = NaiveDate::from_ymd_opt(2020, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .expect("valid datetime");
        assert_eq!(
            escape(&Value::Timestamp(ts), &table),
            Escaped::Literal("'2020-01-02 03:04:05'".into())
        );
    }

    #[test]
    fn test_unmatched_value_returned_unchanged() {
        let raw = Value::Raw("CURRENT_TIMESTAMP".into());
        let escaped = escape(&raw, &defaults());
        assert_eq!(escaped, Escaped::Unmatched(&raw));
        assert!(!escaped.is_literal());
        assert_eq!(escaped.into_text(), "CURRENT_TIMESTAMP");

        let empty = ConverterTable::empty();
        let text = Value::from("x'y");
        assert_eq!(escape(&text, &empty), Escaped::Unmatched(&text));
    }

    #[test]
    fn test_any_slot_catches_everything() {
        let table = ConverterTable::empty()
            .with(Kind::Text, quote_text)
            .with(Kind::Any, quote_text);
        assert_eq!(escape(&Value::Raw("x".into()), &table).into_text(), "'x'");
        assert_eq!(format!("{table:?}"), "[Text, Any]");
    }

    #[test]
    fn test_default_table_is_shared() {
        assert!(Arc::ptr_eq(&defaults(), &ConverterTable::default_table()));
        assert_eq!(defaults().entries().len(), 12);
    }
}
