use std::str::Utf8Error;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameErr {
    #[error("Utf8Error: {0}")]
    Utf8Error(#[source] Utf8Error),
    #[error("IO Error: {0}")]
    IoError(#[source] std::io::Error),
    #[error("Not Enough Bytes: the file might be truncated.")]
    NotEnoughBytes,
    #[error("Frame of {0} bytes exceeds the limit")]
    FrameTooLarge(u64),
    #[error("Malformed frame: {0}")]
    Malformed(&'static str),
    #[error("Unknown tag value type {0}")]
    UnknownTagType(u8),
    #[error("Tag `{key}` has unsupported type {type_name}; only string and f32 tags are supported")]
    UnsupportedTagType { key: String, type_name: &'static str },
    #[error("Field `{key}` has unsupported type {type_name}; cannot convert to f64")]
    UnsupportedFieldType { key: String, type_name: &'static str },
    #[error("Timestamp out of range")]
    TimestampOutOfRange,
    #[error("Tag or field keys and values are not of the same length")]
    LengthMismatch,
}

impl FrameErr {
    /// Encoding errors mean the data source is malformed.
    pub fn is_encode_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedTagType { .. }
                | Self::UnsupportedFieldType { .. }
                | Self::TimestampOutOfRange
                | Self::LengthMismatch
        )
    }
}
