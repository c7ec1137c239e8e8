use sea_loader_types::{LogicalPoint, PointIndexer};

const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x01000193;

/// 32-bit FNV-1a.
pub fn fnv1a32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// The value of the tag named `meta_field`, as a string. A float32 tag is rendered in decimal.
///
/// If the key appears more than once, the last one wins.
pub fn meta_field_value(point: &LogicalPoint, meta_field: &str) -> Option<String> {
    point
        .tags
        .iter()
        .rev()
        .find(|tag| tag.key == meta_field)
        .map(|tag| tag.value.to_string())
}

/// The channel a point belongs to in meta-field mode: `fnv1a32(value) % num_channels`.
/// Returns `None` if the point does not carry the meta field, in which case the default index stands.
pub fn meta_field_index(point: &LogicalPoint, meta_field: &str, num_channels: usize) -> Option<usize> {
    assert!(num_channels > 0);
    let value = meta_field_value(point, meta_field)?;
    Some(fnv1a32(value.as_bytes()) as usize % num_channels)
}

/// Sends everything to channel 0. This is the default when there is only one channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstantIndexer;

/// Cycles through the channels, one point at a time.
#[derive(Debug, Clone)]
pub struct RoundRobinIndexer {
    num_channels: usize,
    next: usize,
}

/// Hashes the value of a tag, so that points of the same series always land on the same channel.
/// Points without the tag go to channel 0.
#[derive(Debug, Clone)]
pub struct TagHashIndexer {
    key: String,
    num_channels: usize,
}

impl PointIndexer for ConstantIndexer {
    fn get_index(&mut self, _: &LogicalPoint) -> usize {
        0
    }
}

impl RoundRobinIndexer {
    pub fn new(num_channels: usize) -> Self {
        assert!(num_channels > 0, "There must be at least one channel");
        Self {
            num_channels,
            next: 0,
        }
    }
}

impl PointIndexer for RoundRobinIndexer {
    fn get_index(&mut self, _: &LogicalPoint) -> usize {
        let index = self.next;
        self.next = (self.next + 1) % self.num_channels;
        index
    }
}

impl TagHashIndexer {
    pub fn new<S: Into<String>>(key: S, num_channels: usize) -> Self {
        assert!(num_channels > 0, "There must be at least one channel");
        Self {
            key: key.into(),
            num_channels,
        }
    }
}

impl PointIndexer for TagHashIndexer {
    fn get_index(&mut self, item: &LogicalPoint) -> usize {
        meta_field_index(item, &self.key, self.num_channels).unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fnv1a32() {
        assert_eq!(fnv1a32(b""), 0x811c9dc5);
        assert_eq!(fnv1a32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a32(b"foobar"), 0xbf9cf968);
    }

    #[test]
    fn test_meta_field_index() {
        let point = LogicalPoint::new("cpu", 0)
            .with_tag("hostname", "host_1")
            .with_tag("rack", 12.5f32);
        assert_eq!(
            meta_field_index(&point, "hostname", 7),
            Some(fnv1a32(b"host_1") as usize % 7)
        );
        assert_eq!(
            meta_field_index(&point, "rack", 7),
            Some(fnv1a32(b"12.5") as usize % 7)
        );
        assert_eq!(meta_field_index(&point, "region", 7), None);
        assert_eq!(meta_field_index(&point, "hostname", 1), Some(0));
    }

    #[test]
    fn test_last_tag_wins() {
        let point = LogicalPoint::new("cpu", 0)
            .with_tag("device", "a")
            .with_tag("device", "b");
        assert_eq!(meta_field_value(&point, "device").as_deref(), Some("b"));
    }

    #[test]
    fn test_indexers() {
        let point = LogicalPoint::new("cpu", 0).with_tag("hostname", "host_1");
        let mut rr = RoundRobinIndexer::new(3);
        let indices: Vec<_> = (0..7).map(|_| rr.get_index(&point)).collect();
        assert_eq!(indices, [0, 1, 2, 0, 1, 2, 0]);

        let mut hash = TagHashIndexer::new("hostname", 5);
        let expected = fnv1a32(b"host_1") as usize % 5;
        assert_eq!(hash.get_index(&point), expected);
        assert_eq!(hash.get_index(&LogicalPoint::new("cpu", 0)), 0);

        assert_eq!(ConstantIndexer.get_index(&point), 0);

        let mut closure = |p: &LogicalPoint| p.tags.len();
        assert_eq!(closure.get_index(&point), 1);
    }
}
