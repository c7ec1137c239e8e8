use crate::Batch;

/// Translates batches into writes against a target store. Each worker owns one processor.
pub trait Processor: Send {
    type Batch: Batch;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Called once on the worker thread before the first batch.
    fn init(&mut self, _worker: usize, _do_load: bool, _hash_workers: bool) {}

    /// Returns the number of metrics and rows written.
    /// If `do_load` is false, the batch should be consumed without touching the store.
    fn process_batch(&mut self, batch: Self::Batch, do_load: bool)
        -> Result<(u64, u64), Self::Error>;

    /// Called once on the worker thread after the last batch.
    fn close(&mut self, _do_load: bool) {}
}
