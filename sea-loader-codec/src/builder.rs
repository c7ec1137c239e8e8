use std::{
    ops::{Deref, DerefMut},
    sync::Mutex,
};

pub const DEFAULT_BUILDER_CAPACITY: usize = 1024;
/// Builders beyond this number are dropped instead of being returned to the pool.
pub const MAX_POOLED_BUILDERS: usize = 256;
/// A builder that grew beyond this is dropped instead of being returned to the pool.
pub const MAX_POOLED_CAPACITY: usize = 1 << 20;

lazy_static::lazy_static! {
    static ref BUILDER_POOL: BuilderPool = BuilderPool::new();
}

/// A byte buffer that grows from back to front.
///
/// Everything is prepended, so an object always sits in front of the objects it refers to.
/// Positions are tracked as offsets from the end of the buffer, which stay valid when the buffer grows.
pub struct FrameBuilder {
    buf: Vec<u8>,
    head: usize,
}

/// A thread-safe pool of [`FrameBuilder`]s.
#[derive(Debug, Default)]
pub struct BuilderPool {
    builders: Mutex<Vec<FrameBuilder>>,
}

/// A builder checked out of a [`BuilderPool`]. It is reset and returned on drop.
#[derive(Debug)]
pub struct PooledBuilder<'a> {
    pool: &'a BuilderPool,
    builder: Option<FrameBuilder>,
}

impl std::fmt::Debug for FrameBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FrameBuilder(len = {}, capacity = {})",
            self.len(),
            self.buf.len()
        )
    }
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BUILDER_CAPACITY)
    }
}

impl FrameBuilder {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0; capacity],
            head: capacity,
        }
    }

    /// Number of bytes written so far. This is also the offset of the latest object.
    pub fn len(&self) -> usize {
        self.buf.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Offset (from the end) of whatever was prepended last.
    ///
    /// # Panics
    ///
    /// Panics if the buffer no longer fits in a ref. The encoder bounds the payload well below that.
    pub fn offset(&self) -> u32 {
        u32::try_from(self.len()).expect("Frame too large for a u32 ref")
    }

    /// Discard the content but keep the allocation.
    pub fn reset(&mut self) {
        self.head = self.buf.len();
    }

    fn reserve(&mut self, size: usize) {
        if self.head >= size {
            return;
        }
        let used = self.len();
        let capacity = std::cmp::max(self.buf.len() * 2, used + size).max(64);
        let mut buf = vec![0; capacity];
        buf[capacity - used..].copy_from_slice(&self.buf[self.head..]);
        self.buf = buf;
        self.head = capacity - used;
    }

    pub fn prepend_bytes(&mut self, bytes: &[u8]) {
        self.reserve(bytes.len());
        self.head -= bytes.len();
        self.buf[self.head..self.head + bytes.len()].copy_from_slice(bytes);
    }

    pub fn prepend_u8(&mut self, v: u8) {
        self.prepend_bytes(&[v]);
    }

    pub fn prepend_u32(&mut self, v: u32) {
        self.prepend_bytes(&v.to_le_bytes());
    }

    pub fn prepend_i64(&mut self, v: i64) {
        self.prepend_bytes(&v.to_le_bytes());
    }

    pub fn prepend_f32(&mut self, v: f32) {
        self.prepend_bytes(&v.to_le_bytes());
    }

    pub fn prepend_f64(&mut self, v: f64) {
        self.prepend_bytes(&v.to_le_bytes());
    }

    /// Prepend a reference to an object previously built at `target`.
    /// The stored value is the forward distance from the reference to the object.
    pub fn prepend_ref(&mut self, target: u32) {
        let at = self.offset() + 4;
        assert!(target <= self.offset(), "Reference to unwritten object");
        self.prepend_u32(at - target);
    }

    /// Returns the offset of the string object.
    pub fn create_string(&mut self, s: &str) -> u32 {
        self.prepend_bytes(s.as_bytes());
        self.prepend_u32(s.len() as u32);
        self.offset()
    }

    /// Prepend a vector of references. `refs` must be given in reverse of the desired order.
    /// Returns the offset of the vector object.
    pub fn create_ref_vector(&mut self, refs: &[u32]) -> u32 {
        for r in refs.iter() {
            self.prepend_ref(*r);
        }
        self.prepend_u32(refs.len() as u32);
        self.offset()
    }

    /// Prepend the root reference. The buffer is ready after this.
    pub fn finish(&mut self, root: u32) {
        self.prepend_ref(root);
    }

    pub fn finished_bytes(&self) -> &[u8] {
        &self.buf[self.head..]
    }
}

impl BuilderPool {
    pub fn new() -> Self {
        Default::default()
    }

    /// The process-wide pool used by [`crate::encode`].
    pub fn global() -> &'static BuilderPool {
        &BUILDER_POOL
    }

    /// Check out a builder. It is exclusively owned until the guard is dropped.
    pub fn acquire(&self) -> PooledBuilder<'_> {
        let builder = self
            .builders
            .lock()
            .expect("Failed to lock BuilderPool")
            .pop()
            .unwrap_or_default();
        PooledBuilder {
            pool: self,
            builder: Some(builder),
        }
    }

    /// Number of idle builders.
    pub fn idle(&self) -> usize {
        self.builders
            .lock()
            .expect("Failed to lock BuilderPool")
            .len()
    }

    fn release(&self, mut builder: FrameBuilder) {
        if builder.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        builder.reset();
        // never panic here; we may be unwinding already
        if let Ok(mut builders) = self.builders.lock() {
            if builders.len() < MAX_POOLED_BUILDERS {
                builders.push(builder);
            }
        }
    }
}

impl Deref for PooledBuilder<'_> {
    type Target = FrameBuilder;

    fn deref(&self) -> &Self::Target {
        self.builder.as_ref().expect("Builder already released")
    }
}

impl DerefMut for PooledBuilder<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.builder.as_mut().expect("Builder already released")
    }
}

impl Drop for PooledBuilder<'_> {
    fn drop(&mut self) {
        if let Some(builder) = self.builder.take() {
            self.pool.release(builder);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_prepend() {
        let mut b = FrameBuilder::new(4);
        b.prepend_u8(3);
        b.prepend_u8(2);
        b.prepend_u8(1);
        assert_eq!(b.finished_bytes(), &[1, 2, 3]);
        // grows past the initial capacity
        b.prepend_u32(0x0a0b0c0d);
        assert_eq!(b.finished_bytes(), &[0x0d, 0x0c, 0x0b, 0x0a, 1, 2, 3]);
        assert_eq!(b.len(), 7);
        assert!(b.capacity() >= 7);

        b.reset();
        assert!(b.is_empty());
        b.prepend_bytes(b"hi");
        assert_eq!(b.finished_bytes(), b"hi");
    }

    #[test]
    fn test_ref() {
        let mut b = FrameBuilder::new(0);
        let s = b.create_string("abc");
        assert_eq!(s, 7);
        b.prepend_u32(0xffff_ffff); // padding between the ref and its target
        b.finish(s);
        let bytes = b.finished_bytes();
        // root ref at 0 points 8 bytes forward, past the padding
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 8);
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 3);
        assert_eq!(&bytes[12..], b"abc");
    }

    #[test]
    fn test_pool() {
        let pool = BuilderPool::new();
        assert_eq!(pool.idle(), 0);
        {
            let mut a = pool.acquire();
            let mut b = pool.acquire();
            a.prepend_u8(1);
            b.prepend_u8(2);
            assert_eq!(a.finished_bytes(), &[1]);
            assert_eq!(b.finished_bytes(), &[2]);
        }
        assert_eq!(pool.idle(), 2);
        let a = pool.acquire();
        assert!(a.is_empty());
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_pool_drops_grown_builders() {
        let pool = BuilderPool::new();
        {
            let mut b = pool.acquire();
            b.prepend_bytes(&vec![0; MAX_POOLED_CAPACITY + 1]);
            assert!(b.capacity() > MAX_POOLED_CAPACITY);
        }
        assert_eq!(pool.idle(), 0);
        {
            let mut b = pool.acquire();
            b.prepend_bytes(&vec![0; 4096]);
        }
        assert_eq!(pool.idle(), 1);
    }
}
