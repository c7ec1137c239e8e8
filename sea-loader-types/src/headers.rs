use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::Serialize;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
/// Describes the shape of a generated stream. Optional; the loader does not need it.
pub struct DataHeaders {
    /// Type name of each tag, in the same order as `tag_keys`
    pub tag_types: Vec<String>,
    pub tag_keys: Vec<String>,
    /// Measurement name -> field keys
    pub field_keys: BTreeMap<String, Vec<String>>,
}

impl DataHeaders {
    pub fn field_keys_of(&self, measurement: &str) -> &[String] {
        self.field_keys
            .get(measurement)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }
}
