// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB Line Protocol encoder.
//!
//! Line Protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp
//! ```
//!
//! Tags and fields are emitted in byte-wise key order so that the same
//! point always produces the same line. The encoder performs no unit
//! conversion on the timestamp; callers pass it already scaled to the
//! configured precision.

use crate::error::SerializationError;
use std::collections::BTreeMap;
use std::fmt;

/// Tag set of a point. `BTreeMap` keeps keys unique and byte-wise sorted.
pub type TagSet = BTreeMap<String, String>;

/// Field set of a point. A `None` value is an absent field and is skipped
/// on encoding.
pub type FieldSet = BTreeMap<String, Option<FieldValue>>;

/// A value that can be stored in an InfluxDB field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// Boolean value.
    Boolean(bool),
    /// UTF-8 string.
    String(String),
}

impl FieldValue {
    /// Format this value for Line Protocol.
    ///
    /// - Integer: suffixed with `i` (e.g., `42i`)
    /// - Float: decimal form (e.g., `3.5`)
    /// - Boolean: `t` or `f`
    /// - String: quoted with double quotes, inner quotes escaped
    pub fn to_line_protocol(&self) -> String {
        match self {
            FieldValue::Integer(v) => format!("{}i", v),
            FieldValue::Float(v) => format!("{}", v),
            FieldValue::Boolean(v) => {
                if *v {
                    "t".to_string()
                } else {
                    "f".to_string()
                }
            }
            FieldValue::String(v) => format!("\"{}\"", escape_string(v)),
        }
    }

    /// Whether this value may be written. NaN and infinite floats may not.
    pub fn is_finite(&self) -> bool {
        match self {
            FieldValue::Float(v) => v.is_finite(),
            _ => true,
        }
    }

    /// Numeric view used by field filters; `None` for strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Integer(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Boolean(v) => Some(if *v { 1.0 } else { 0.0 }),
            FieldValue::String(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_line_protocol())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// One observation to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    /// Measurement name.
    pub measurement: String,
    /// Tags (indexed, for filtering).
    pub tags: TagSet,
    /// Fields (actual data).
    pub fields: FieldSet,
    /// Timestamp in the configured precision.
    pub timestamp: Option<i64>,
}

impl Point {
    /// Create a point with no tags, fields or timestamp.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: TagSet::new(),
            fields: FieldSet::new(),
            timestamp: None,
        }
    }

    /// Add a tag.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), Some(value.into()));
        self
    }

    /// Set the timestamp.
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// True when at least one field carries a value.
    pub fn has_fields(&self) -> bool {
        self.fields.values().any(Option::is_some)
    }

    /// Encode this point as a single line.
    pub fn to_line(&self) -> Result<String, SerializationError> {
        encode_line(&self.measurement, &self.tags, &self.fields, self.timestamp)
    }
}

/// Encode a point as a Line Protocol line.
///
/// Fails without emitting anything if no field carries a value, if a float
/// field is NaN or infinite, or if the measurement, a tag key or value, a
/// field key or a string value contains a newline.
pub fn encode_line(
    measurement: &str,
    tags: &TagSet,
    fields: &FieldSet,
    timestamp: Option<i64>,
) -> Result<String, SerializationError> {
    reject_newline(measurement, measurement)?;
    for (key, value) in tags {
        reject_newline(key, key)?;
        reject_newline(key, value)?;
    }
    for key in fields.keys() {
        reject_newline(key, key)?;
    }

    let mut line = escape_metadata(measurement);
    for (key, value) in tags {
        line.push(',');
        line.push_str(&escape_metadata(key));
        line.push('=');
        line.push_str(&escape_metadata(value));
    }

    let mut emitted = 0usize;
    for (key, value) in fields {
        let Some(value) = value else {
            continue;
        };
        if !value.is_finite() {
            return Err(SerializationError::NonFiniteField { key: key.clone() });
        }
        if let FieldValue::String(s) = value {
            reject_newline(key, s)?;
        }

        line.push(if emitted == 0 { ' ' } else { ',' });
        line.push_str(&escape_metadata(key));
        line.push('=');
        line.push_str(&value.to_line_protocol());
        emitted += 1;
    }

    if emitted == 0 {
        return Err(SerializationError::NoFields {
            measurement: measurement.to_string(),
        });
    }

    if let Some(ts) = timestamp {
        line.push(' ');
        line.push_str(&ts.to_string());
    }

    Ok(line)
}

/// A newline anywhere in a line would split it into two on the wire.
fn reject_newline(key: &str, text: &str) -> Result<(), SerializationError> {
    if text.contains('\n') {
        return Err(SerializationError::NewlineInValue {
            key: key.to_string(),
        });
    }
    Ok(())
}

/// Escape a measurement name, tag key, tag value or field key.
/// Spaces and commas are escaped with a backslash.
fn escape_metadata(s: &str) -> String {
    s.replace(' ', "\\ ").replace(',', "\\,")
}

/// Escape a string field value. Double quotes are escaped with a backslash.
fn escape_string(s: &str) -> String {
    s.replace('"', "\\\"")
}
