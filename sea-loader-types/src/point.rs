use crate::{Field, LogicalPoint, Tag, TagValue, Value};
pub use time::OffsetDateTime as Timestamp;

/// Canonical display format for Timestamp.
pub const TIMESTAMP_FORMAT: &[time::format_description::FormatItem<'static>] =
    time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

#[derive(Debug, Clone, PartialEq)]
/// A point as produced by a simulator, before encoding.
///
/// Keys and values are kept in parallel vectors; their order is the order in which
/// they will appear after a round trip through the codec.
pub struct Point {
    measurement: String,
    timestamp: Timestamp,
    tag_keys: Vec<String>,
    tag_values: Vec<Value>,
    field_keys: Vec<String>,
    field_values: Vec<Value>,
}

impl Default for Point {
    fn default() -> Self {
        Self::new("", Timestamp::UNIX_EPOCH)
    }
}

impl Point {
    pub fn new<S: Into<String>>(measurement: S, timestamp: Timestamp) -> Self {
        Self {
            measurement: measurement.into(),
            timestamp,
            tag_keys: Vec::new(),
            tag_values: Vec::new(),
            field_keys: Vec::new(),
            field_values: Vec::new(),
        }
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn tag_keys(&self) -> &[String] {
        &self.tag_keys
    }

    pub fn tag_values(&self) -> &[Value] {
        &self.tag_values
    }

    pub fn field_keys(&self) -> &[String] {
        &self.field_keys
    }

    pub fn field_values(&self) -> &[Value] {
        &self.field_values
    }

    pub fn set_measurement<S: Into<String>>(&mut self, measurement: S) {
        self.measurement = measurement.into();
    }

    pub fn set_timestamp(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    pub fn append_tag<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.tag_keys.push(key.into());
        self.tag_values.push(value.into());
    }

    pub fn append_field<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.field_keys.push(key.into());
        self.field_values.push(value.into());
    }

    /// Builder-style [`Point::append_tag`].
    pub fn with_tag<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.append_tag(key, value);
        self
    }

    /// Builder-style [`Point::append_field`].
    pub fn with_field<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.append_field(key, value);
        self
    }

    /// Clear everything but keep the allocations, so that a simulator can reuse the point.
    pub fn reset(&mut self) {
        self.measurement.clear();
        self.timestamp = Timestamp::UNIX_EPOCH;
        self.tag_keys.clear();
        self.tag_values.clear();
        self.field_keys.clear();
        self.field_values.clear();
    }
}

impl From<LogicalPoint> for Point {
    fn from(point: LogicalPoint) -> Self {
        let timestamp = point.timestamp_utc();
        let LogicalPoint {
            measurement,
            tags,
            fields,
            ..
        } = point;
        let mut ret = Point::new(measurement, timestamp);
        for Tag { key, value } in tags {
            match value {
                TagValue::String(v) => ret.append_tag(key, v),
                TagValue::Float32(v) => ret.append_tag(key, v),
            }
        }
        for Field { key, value } in fields {
            ret.append_field(key, value);
        }
        ret
    }
}
