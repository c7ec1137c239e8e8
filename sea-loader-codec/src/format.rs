//! The SeaLoader frame format is a self-describing binary encoding of one point.
//! A frame stream is simply frames written back to back, without any header.
//!
//! ```ignore
//! +---+---+---+---+---+---+---+---+--------~--------+
//! |   length of payload (u64)     |     payload     |
//! +---+---+---+---+---+---+---+---+--------~--------+
//! ```
//!
//! The payload is an offset table. It begins with a reference to the point table:
//!
//! ```ignore
//! Point:
//! +-------------+-------------+-----------+-------------+
//! | measurement |  timestamp  |  tags     |  fields     |
//! |    ref      |  i64 (ns)   |  ref      |  ref        |
//! +-------------+-------------+-----------+-------------+
//!
//! String:            Vector:
//! +-----+----~----+  +-------+-----+-----+-----+
//! | len |  UTF-8  |  | count | ref | ref | ... |
//! +-----+----~----+  +-------+-----+-----+-----+
//!
//! Tag:
//! +-----+------+---------+---------------------------+
//! | key | type | padding | value                     |
//! | ref |  u8  | 3 bytes | ref (string) / f32 (bits) |
//! +-----+------+---------+---------------------------+
//!
//! Field:
//! +-----+-------+
//! | key | value |
//! | ref |  f64  |
//! +-----+-------+
//! ```
//!
//! A ref is a u32 holding the forward distance from the ref itself to the object.
//! The payload is built back to front, so referenced objects always come later in the buffer.
//!
//! All numbers are encoded in little endian.

use crate::{BuilderPool, FrameBuilder, FrameErr};
use sea_loader_types::{Field, LogicalPoint, Point, Tag, TagValue, Value};

/// Size of the length prefix.
pub const PREFIX_SIZE: usize = 8;
/// Largest payload the encoder produces and the reader accepts by default.
pub const MAX_FRAME_SIZE: u64 = 64 << 20;

pub const TAG_TYPE_STRING: u8 = 1;
pub const TAG_TYPE_FLOAT32: u8 = 2;

const POINT_TABLE_SIZE: usize = 20;
const TAG_TABLE_SIZE: usize = 12;
const FIELD_TABLE_SIZE: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
/// One encoded point: the length prefix followed by the payload.
pub struct Frame {
    bytes: Vec<u8>,
}

/// A zero-copy reader over an encoded payload.
#[derive(Debug, Clone, Copy)]
pub struct PointView<'a> {
    buf: &'a [u8],
    table: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct TagView<'a> {
    buf: &'a [u8],
    table: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    buf: &'a [u8],
    table: usize,
}

/// A tag value that has been written, but not yet referenced.
enum TagSlot {
    String(u32),
    Float32(f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagValueView<'a> {
    String(&'a str),
    Float32(f32),
}

impl Frame {
    /// Wrap an already framed buffer, checking that the prefix matches.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, FrameErr> {
        if bytes.len() < PREFIX_SIZE {
            return Err(FrameErr::NotEnoughBytes);
        }
        let len = u64::from_le_bytes(read_array(&bytes, 0)?);
        if len != (bytes.len() - PREFIX_SIZE) as u64 {
            return Err(FrameErr::Malformed("length prefix mismatch"));
        }
        Ok(Self { bytes })
    }

    pub fn payload(&self) -> &[u8] {
        &self.bytes[PREFIX_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Total size, including the prefix.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty. An encoded point never is, but [`Frame::from_bytes`]
    /// accepts a bare zero length prefix.
    pub fn is_empty(&self) -> bool {
        self.payload().is_empty()
    }

    pub fn view(&self) -> Result<PointView<'_>, FrameErr> {
        PointView::new(self.payload())
    }

    pub fn decode(&self) -> Result<LogicalPoint, FrameErr> {
        decode(self.payload())
    }
}

/// Encode a point with a builder from the global pool.
pub fn encode(point: &Point) -> Result<Frame, FrameErr> {
    encode_with(BuilderPool::global(), point)
}

/// Encode a point with a builder from the given pool.
/// The builder is returned to the pool on every path, after the frame has been copied out.
///
/// A point whose payload would exceed [`MAX_FRAME_SIZE`] is rejected with
/// [`FrameErr::FrameTooLarge`] before anything is built.
pub fn encode_with(pool: &BuilderPool, point: &Point) -> Result<Frame, FrameErr> {
    let size = payload_size(point);
    if size > MAX_FRAME_SIZE {
        return Err(FrameErr::FrameTooLarge(size));
    }
    let mut builder = pool.acquire();
    build_point(&mut builder, point)?;
    let payload = builder.finished_bytes();
    debug_assert_eq!(payload.len() as u64, size);
    let mut bytes = Vec::with_capacity(PREFIX_SIZE + payload.len());
    bytes.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    bytes.extend_from_slice(payload);
    Ok(Frame { bytes })
}

/// Exact size of the payload of `point`, null tags and fields excluded.
/// The builder adds no padding, so this is just the sum of the objects.
pub fn payload_size(point: &Point) -> u64 {
    let string = |s: &str| 4 + s.len() as u64;
    let mut size = 4 + POINT_TABLE_SIZE as u64 + string(point.measurement());

    size += 4;
    for (key, value) in point.tag_keys().iter().zip(point.tag_values().iter()) {
        size += match value {
            Value::Null => continue,
            Value::String(s) => string(s),
            _ => 0,
        };
        size += 4 + TAG_TABLE_SIZE as u64 + string(key);
    }

    size += 4;
    for (key, value) in point.field_keys().iter().zip(point.field_values().iter()) {
        if !value.is_null() {
            size += 4 + FIELD_TABLE_SIZE as u64 + string(key);
        }
    }
    size
}

/// Write the payload of `point` into an empty builder.
pub fn build_point(b: &mut FrameBuilder, point: &Point) -> Result<(), FrameErr> {
    debug_assert!(b.is_empty());
    let timestamp: i64 = point
        .timestamp()
        .unix_timestamp_nanos()
        .try_into()
        .map_err(|_| FrameErr::TimestampOutOfRange)?;
    if point.tag_keys().len() != point.tag_values().len()
        || point.field_keys().len() != point.field_values().len()
    {
        return Err(FrameErr::LengthMismatch);
    }

    // We are prepending, so go in reverse to keep the original order
    let mut tags = Vec::with_capacity(point.tag_keys().len());
    for (key, value) in point
        .tag_keys()
        .iter()
        .zip(point.tag_values().iter())
        .rev()
    {
        let slot = match value {
            Value::Null => continue,
            Value::String(s) => TagSlot::String(b.create_string(s)),
            Value::Float32(v) => TagSlot::Float32(*v),
            other => {
                return Err(FrameErr::UnsupportedTagType {
                    key: key.to_owned(),
                    type_name: other.type_name(),
                })
            }
        };
        let key = b.create_string(key);
        let value_type = match slot {
            TagSlot::String(string) => {
                b.prepend_ref(string);
                TAG_TYPE_STRING
            }
            TagSlot::Float32(v) => {
                b.prepend_f32(v);
                TAG_TYPE_FLOAT32
            }
        };
        b.prepend_bytes(&[value_type, 0, 0, 0]);
        b.prepend_ref(key);
        tags.push(b.offset());
    }
    let tags = b.create_ref_vector(&tags);

    let mut fields = Vec::with_capacity(point.field_keys().len());
    for (key, value) in point
        .field_keys()
        .iter()
        .zip(point.field_values().iter())
        .rev()
    {
        if value.is_null() {
            continue;
        }
        let value = value.as_f64().ok_or_else(|| FrameErr::UnsupportedFieldType {
            key: key.to_owned(),
            type_name: value.type_name(),
        })?;
        let key = b.create_string(key);
        b.prepend_f64(value);
        b.prepend_ref(key);
        fields.push(b.offset());
    }
    let fields = b.create_ref_vector(&fields);

    let measurement = b.create_string(point.measurement());
    b.prepend_ref(fields);
    b.prepend_ref(tags);
    b.prepend_i64(timestamp);
    b.prepend_ref(measurement);
    let root = b.offset();
    b.finish(root);
    Ok(())
}

/// Decode a payload (without the length prefix) into an owned point.
pub fn decode(payload: &[u8]) -> Result<LogicalPoint, FrameErr> {
    PointView::new(payload)?.to_logical()
}

fn read_array<const N: usize>(buf: &[u8], pos: usize) -> Result<[u8; N], FrameErr> {
    match buf.get(pos..pos + N) {
        Some(slice) => {
            let mut ret = [0u8; N];
            ret.copy_from_slice(slice);
            Ok(ret)
        }
        None => Err(FrameErr::Malformed("offset out of bounds")),
    }
}

fn read_u32(buf: &[u8], pos: usize) -> Result<u32, FrameErr> {
    Ok(u32::from_le_bytes(read_array(buf, pos)?))
}

/// Follow the ref stored at `pos`.
fn deref(buf: &[u8], pos: usize) -> Result<usize, FrameErr> {
    let rel = read_u32(buf, pos)? as usize;
    if rel == 0 {
        return Err(FrameErr::Malformed("null reference"));
    }
    let target = pos + rel;
    if target >= buf.len() {
        return Err(FrameErr::Malformed("reference out of bounds"));
    }
    Ok(target)
}

fn read_str(buf: &[u8], pos: usize) -> Result<&str, FrameErr> {
    let len = read_u32(buf, pos)? as usize;
    let bytes = buf
        .get(pos + 4..pos + 4 + len)
        .ok_or(FrameErr::Malformed("string out of bounds"))?;
    std::str::from_utf8(bytes).map_err(FrameErr::Utf8Error)
}

fn check_table(buf: &[u8], pos: usize, size: usize) -> Result<(), FrameErr> {
    if pos + size > buf.len() {
        Err(FrameErr::Malformed("table out of bounds"))
    } else {
        Ok(())
    }
}

/// Returns the position of the first element ref and the element count.
fn read_vector(buf: &[u8], pos: usize) -> Result<(usize, usize), FrameErr> {
    let count = read_u32(buf, pos)? as usize;
    check_table(buf, pos + 4, count * 4)?;
    Ok((pos + 4, count))
}

impl<'a> PointView<'a> {
    /// Validate the point table; nested objects are validated lazily on access.
    pub fn new(buf: &'a [u8]) -> Result<Self, FrameErr> {
        let table = deref(buf, 0)?;
        check_table(buf, table, POINT_TABLE_SIZE)?;
        Ok(Self { buf, table })
    }

    pub fn measurement(&self) -> Result<&'a str, FrameErr> {
        read_str(self.buf, deref(self.buf, self.table)?)
    }

    pub fn timestamp(&self) -> i64 {
        i64::from_le_bytes(
            read_array(self.buf, self.table + 4).expect("Point table has been checked"),
        )
    }

    fn tags_vector(&self) -> Result<(usize, usize), FrameErr> {
        read_vector(self.buf, deref(self.buf, self.table + 12)?)
    }

    fn fields_vector(&self) -> Result<(usize, usize), FrameErr> {
        read_vector(self.buf, deref(self.buf, self.table + 16)?)
    }

    pub fn tags_len(&self) -> Result<usize, FrameErr> {
        Ok(self.tags_vector()?.1)
    }

    pub fn fields_len(&self) -> Result<usize, FrameErr> {
        Ok(self.fields_vector()?.1)
    }

    pub fn tag(&self, i: usize) -> Result<TagView<'a>, FrameErr> {
        let (start, count) = self.tags_vector()?;
        if i >= count {
            return Err(FrameErr::Malformed("tag index out of bounds"));
        }
        let table = deref(self.buf, start + i * 4)?;
        check_table(self.buf, table, TAG_TABLE_SIZE)?;
        Ok(TagView {
            buf: self.buf,
            table,
        })
    }

    pub fn field(&self, i: usize) -> Result<FieldView<'a>, FrameErr> {
        let (start, count) = self.fields_vector()?;
        if i >= count {
            return Err(FrameErr::Malformed("field index out of bounds"));
        }
        let table = deref(self.buf, start + i * 4)?;
        check_table(self.buf, table, FIELD_TABLE_SIZE)?;
        Ok(FieldView {
            buf: self.buf,
            table,
        })
    }

    /// Find a tag by key, scanning linearly.
    pub fn find_tag(&self, key: &str) -> Result<Option<TagValueView<'a>>, FrameErr> {
        for i in 0..self.tags_len()? {
            let tag = self.tag(i)?;
            if tag.key()? == key {
                return Ok(Some(tag.value()?));
            }
        }
        Ok(None)
    }

    pub fn to_logical(&self) -> Result<LogicalPoint, FrameErr> {
        let tags_len = self.tags_len()?;
        let fields_len = self.fields_len()?;
        let mut point = LogicalPoint {
            measurement: self.measurement()?.to_owned(),
            timestamp: self.timestamp(),
            tags: Vec::with_capacity(tags_len),
            fields: Vec::with_capacity(fields_len),
        };
        for i in 0..tags_len {
            let tag = self.tag(i)?;
            point.tags.push(Tag {
                key: tag.key()?.to_owned(),
                value: match tag.value()? {
                    TagValueView::String(s) => TagValue::String(s.to_owned()),
                    TagValueView::Float32(v) => TagValue::Float32(v),
                },
            });
        }
        for i in 0..fields_len {
            let field = self.field(i)?;
            point.fields.push(Field {
                key: field.key()?.to_owned(),
                value: field.value(),
            });
        }
        Ok(point)
    }
}

impl<'a> TagView<'a> {
    pub fn key(&self) -> Result<&'a str, FrameErr> {
        read_str(self.buf, deref(self.buf, self.table)?)
    }

    pub fn value_type(&self) -> u8 {
        self.buf[self.table + 4]
    }

    pub fn value(&self) -> Result<TagValueView<'a>, FrameErr> {
        match self.value_type() {
            TAG_TYPE_STRING => Ok(TagValueView::String(read_str(
                self.buf,
                deref(self.buf, self.table + 8)?,
            )?)),
            TAG_TYPE_FLOAT32 => Ok(TagValueView::Float32(f32::from_le_bytes(read_array(
                self.buf,
                self.table + 8,
            )?))),
            other => Err(FrameErr::UnknownTagType(other)),
        }
    }
}

impl<'a> FieldView<'a> {
    pub fn key(&self) -> Result<&'a str, FrameErr> {
        read_str(self.buf, deref(self.buf, self.table)?)
    }

    pub fn value(&self) -> f64 {
        f64::from_le_bytes(read_array(self.buf, self.table + 4).expect("Field table has been checked"))
    }
}

impl TagValueView<'_> {
    /// The string form used for hashing and grouping.
    pub fn to_key_string(&self) -> String {
        match self {
            Self::String(s) => (*s).to_owned(),
            Self::Float32(v) => v.to_string(),
        }
    }
}
