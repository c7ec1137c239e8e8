use crate::Timestamp;
use std::fmt::Display;

#[cfg(feature = "serde")]
use serde::Serialize;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
/// A decoded point. This is what batches carry to the workers.
pub struct LogicalPoint {
    pub measurement: String,
    /// Nanoseconds since Unix epoch, UTC
    pub timestamp: i64,
    pub tags: Vec<Tag>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Tag {
    pub key: String,
    pub value: TagValue,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
/// A tag value is either a string or a 32-bit float. Nothing else can be encoded.
pub enum TagValue {
    String(String),
    Float32(f32),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Field {
    pub key: String,
    pub value: f64,
}

impl LogicalPoint {
    pub fn new<S: Into<String>>(measurement: S, timestamp: i64) -> Self {
        Self {
            measurement: measurement.into(),
            timestamp,
            tags: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn timestamp_utc(&self) -> Timestamp {
        Timestamp::UNIX_EPOCH + time::Duration::nanoseconds(self.timestamp)
    }

    /// Find the first tag with the given key.
    pub fn tag(&self, key: &str) -> Option<&TagValue> {
        self.tags.iter().find(|t| t.key == key).map(|t| &t.value)
    }

    /// Find the first field with the given key.
    pub fn field(&self, key: &str) -> Option<f64> {
        self.fields.iter().find(|f| f.key == key).map(|f| f.value)
    }

    pub fn with_tag<K: Into<String>, V: Into<TagValue>>(mut self, key: K, value: V) -> Self {
        self.tags.push(Tag::new(key, value));
        self
    }

    pub fn with_field<K: Into<String>>(mut self, key: K, value: f64) -> Self {
        self.fields.push(Field::new(key, value));
        self
    }
}

impl Tag {
    pub fn new<K: Into<String>, V: Into<TagValue>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Field {
    pub fn new<K: Into<String>>(key: K, value: f64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

impl TagValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Float32(_) => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::String(_) => None,
            Self::Float32(v) => Some(*v),
        }
    }
}

impl Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<f32> for TagValue {
    fn from(v: f32) -> Self {
        Self::Float32(v)
    }
}
