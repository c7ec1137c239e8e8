use crate::LogicalPoint;

/// An ordered accumulator of points. The scanner owns a batch until it is sent to a worker.
pub trait Batch: Send + 'static {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append(&mut self, item: LogicalPoint);
}

/// Creates empty batches.
pub trait BatchFactory {
    type Batch: Batch;

    fn new_batch(&self) -> Self::Batch;
}

/// Maps a point to a channel index in `[0, num_channels)`.
pub trait PointIndexer {
    fn get_index(&mut self, item: &LogicalPoint) -> usize;
}

impl<F> PointIndexer for F
where
    F: FnMut(&LogicalPoint) -> usize,
{
    fn get_index(&mut self, item: &LogicalPoint) -> usize {
        self(item)
    }
}
