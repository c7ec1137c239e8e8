use sea_loader_types::{Batch, BatchFactory, LogicalPoint};

/// A batch of decoded points, in the order they were appended.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PointBatch {
    points: Vec<LogicalPoint>,
}

/// Creates [`PointBatch`]es with room for `capacity` points.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointBatchFactory {
    capacity: usize,
}

impl PointBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub fn points(&self) -> &[LogicalPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<LogicalPoint> {
        self.points
    }
}

impl Batch for PointBatch {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn append(&mut self, item: LogicalPoint) {
        self.points.push(item);
    }
}

impl PointBatchFactory {
    /// `capacity` is only a hint; it is usually the batch size.
    pub fn new(capacity: usize) -> Self {
        Self { capacity }
    }
}

impl BatchFactory for PointBatchFactory {
    type Batch = PointBatch;

    fn new_batch(&self) -> PointBatch {
        PointBatch::with_capacity(self.capacity)
    }
}
