use std::collections::{HashMap, VecDeque};

use crate::{meta_field_index, meta_field_value, DuplexChannel, TrySendError};
use sea_loader_types::{
    Batch, BatchFactory, DataSource, LoadErr, LoadResult, LogicalPoint, PointIndexer,
};

/// Counters of one scan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    /// Items read from the source.
    pub items_read: u64,
    /// Batches handed over to a channel.
    pub batches_sent: u64,
    /// Batches that had to wait in a pending queue before being handed over.
    pub batches_queued: u64,
}

/// Reads a [`DataSource`] and distributes its points over a set of channels, in batches.
///
/// A scan never stops early unless the item limit is reached or an error occurs. Every point
/// read ends up in exactly one batch, and every non-empty batch is handed over before the scan
/// returns. Within one channel, batches arrive in the order they were produced.
pub struct Scanner<'a, F: BatchFactory> {
    factory: &'a F,
    channels: &'a [DuplexChannel<F::Batch>],
    batch_size: usize,
    limit: u64,
    stats: ScanStats,
}

impl<F: BatchFactory> std::fmt::Debug for Scanner<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("channels", &self.channels.len())
            .field("batch_size", &self.batch_size)
            .field("limit", &self.limit)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Policy A: stream the source straight into the channels.
///
/// Each point goes to the channel chosen by `indexer`, unless `meta_field` is set and the point
/// carries that tag, in which case the tag value is hashed. A full batch is sent with a blocking
/// send, so one stalled worker stalls the whole scan. Use a single shared channel if one worker
/// is much slower than the rest.
///
/// `limit == 0` means no limit. Returns the number of items read.
pub fn scan_without_flow_control<S, I, F>(
    source: S,
    indexer: &mut I,
    factory: &F,
    channels: &[DuplexChannel<F::Batch>],
    batch_size: usize,
    limit: u64,
    meta_field: Option<&str>,
) -> LoadResult<u64, S::Error>
where
    S: DataSource,
    I: PointIndexer + ?Sized,
    F: BatchFactory,
{
    let mut scanner = Scanner::new(factory, channels, batch_size, limit);
    scanner.scan_without_flow_control(source, indexer, meta_field)?;
    Ok(scanner.stats().items_read)
}

/// Policy B: group the whole source by the value of `meta_field`, then distribute.
///
/// Points lacking the tag are grouped under the empty string. Each group is cut into batches
/// in arrival order, and full batches go to the channels round-robin. A batch that cannot be
/// sent right away waits in that channel's pending queue. All queues are drained before
/// this returns.
///
/// `limit == 0` means no limit. Returns the number of items read.
pub fn scan_with_batching_meta_fields<S, F>(
    source: S,
    factory: &F,
    channels: &[DuplexChannel<F::Batch>],
    batch_size: usize,
    limit: u64,
    meta_field: &str,
) -> LoadResult<u64, S::Error>
where
    S: DataSource,
    F: BatchFactory,
{
    let mut scanner = Scanner::new(factory, channels, batch_size, limit);
    scanner.scan_with_batching_meta_fields(source, meta_field)?;
    Ok(scanner.stats().items_read)
}

impl<'a, F: BatchFactory> Scanner<'a, F> {
    pub fn new(
        factory: &'a F,
        channels: &'a [DuplexChannel<F::Batch>],
        batch_size: usize,
        limit: u64,
    ) -> Self {
        Self {
            factory,
            channels,
            batch_size,
            limit,
            stats: Default::default(),
        }
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    fn check<E: std::error::Error>(&self) -> LoadResult<(), E> {
        if self.batch_size == 0 {
            return Err(LoadErr::BatchSizeZero);
        }
        if self.channels.is_empty() {
            return Err(LoadErr::NoChannel);
        }
        Ok(())
    }

    /// Read the next item, unless the limit has been reached.
    fn next_item<S: DataSource>(
        &mut self,
        source: &mut S,
    ) -> LoadResult<Option<LogicalPoint>, S::Error> {
        if self.limit > 0 && self.stats.items_read >= self.limit {
            log::debug!("Item limit {} reached", self.limit);
            return Ok(None);
        }
        let item = source.next_item().map_err(LoadErr::Backend)?;
        if item.is_some() {
            self.stats.items_read += 1;
        }
        Ok(item)
    }

    fn new_batches(&self) -> Vec<F::Batch> {
        self.channels
            .iter()
            .map(|_| self.factory.new_batch())
            .collect()
    }

    /// See [`scan_without_flow_control`].
    pub fn scan_without_flow_control<S, I>(
        &mut self,
        mut source: S,
        indexer: &mut I,
        meta_field: Option<&str>,
    ) -> LoadResult<(), S::Error>
    where
        S: DataSource,
        I: PointIndexer + ?Sized,
    {
        self.check::<S::Error>()?;
        let num_channels = self.channels.len();
        let mut batches = self.new_batches();

        while let Some(item) = self.next_item(&mut source)? {
            let mut idx = indexer.get_index(&item);
            if let Some(meta_field) = meta_field {
                if let Some(i) = meta_field_index(&item, meta_field, num_channels) {
                    idx = i;
                }
            }
            assert!(
                idx < num_channels,
                "Indexer returned {idx} but there are only {num_channels} channels"
            );

            batches[idx].append(item);
            if batches[idx].len() >= self.batch_size {
                let batch = std::mem::replace(&mut batches[idx], self.factory.new_batch());
                self.send::<S::Error>(idx, batch)?;
            }
        }

        for (idx, batch) in batches.into_iter().enumerate() {
            if !batch.is_empty() {
                self.send::<S::Error>(idx, batch)?;
            }
        }
        log::debug!("Scan finished: {:?}", self.stats);
        Ok(())
    }

    /// See [`scan_with_batching_meta_fields`].
    pub fn scan_with_batching_meta_fields<S>(
        &mut self,
        mut source: S,
        meta_field: &str,
    ) -> LoadResult<(), S::Error>
    where
        S: DataSource,
    {
        self.check::<S::Error>()?;
        let num_channels = self.channels.len();

        let mut groups: HashMap<String, Vec<LogicalPoint>> = HashMap::new();
        while let Some(item) = self.next_item(&mut source)? {
            let key = meta_field_value(&item, meta_field).unwrap_or_default();
            groups.entry(key).or_default().push(item);
        }
        log::debug!(
            "Read {} items into {} groups by `{meta_field}`",
            self.stats.items_read,
            groups.len()
        );
        if self.stats.items_read > 0 && groups.len() == 1 && groups.contains_key("") {
            log::warn!("No point carries the meta field `{meta_field}`");
        }

        let mut filling = self.new_batches();
        let mut pending: Vec<VecDeque<F::Batch>> =
            self.channels.iter().map(|_| VecDeque::new()).collect();
        let mut idx = 0;

        for points in groups.into_values() {
            let mut points = points.into_iter().peekable();
            while points.peek().is_some() {
                // a batch is never left full, so there is always room
                let room = self.batch_size - filling[idx].len();
                for point in points.by_ref().take(room) {
                    filling[idx].append(point);
                }
                if filling[idx].len() >= self.batch_size {
                    let batch = std::mem::replace(&mut filling[idx], self.factory.new_batch());
                    self.send_or_queue::<S::Error>(idx, batch, &mut pending)?;
                    idx = (idx + 1) % num_channels;
                }
            }
        }

        for (idx, batch) in filling.into_iter().enumerate() {
            if !batch.is_empty() {
                self.send_or_queue::<S::Error>(idx, batch, &mut pending)?;
            }
        }

        // everything left must be delivered before we report completion
        for (idx, queue) in pending.iter_mut().enumerate() {
            if !queue.is_empty() {
                log::debug!("Draining {} pending batches of channel {idx}", queue.len());
            }
            while let Some(batch) = queue.pop_front() {
                self.send::<S::Error>(idx, batch)?;
            }
        }
        log::debug!("Scan finished: {:?}", self.stats);
        Ok(())
    }

    fn send<E: std::error::Error>(&mut self, idx: usize, batch: F::Batch) -> LoadResult<(), E> {
        let channel = &self.channels[idx];
        channel.poll_completions();
        channel
            .send_to_worker(batch)
            .map_err(|_| LoadErr::WorkerDead(idx))?;
        self.stats.batches_sent += 1;
        Ok(())
    }

    /// Send right away if the channel has no backlog and fewer than `capacity` batches in flight,
    /// otherwise queue.
    /// Every call first moves whatever fits from the pending queues into the channels.
    fn send_or_queue<E: std::error::Error>(
        &mut self,
        idx: usize,
        batch: F::Batch,
        pending: &mut [VecDeque<F::Batch>],
    ) -> LoadResult<(), E> {
        for (i, queue) in pending.iter_mut().enumerate() {
            self.flush_pending::<E>(i, queue)?;
        }

        if pending[idx].is_empty() && self.channels[idx].has_capacity() {
            match self.channels[idx].try_send_to_worker(batch) {
                Ok(()) => {
                    self.stats.batches_sent += 1;
                    return Ok(());
                }
                Err(TrySendError::Full(batch)) => pending[idx].push_back(batch),
                Err(TrySendError::Disconnected(_)) => return Err(LoadErr::WorkerDead(idx)),
            }
        } else {
            pending[idx].push_back(batch);
        }
        self.stats.batches_queued += 1;
        Ok(())
    }

    /// Account for the batches the worker(s) finished, then move batches from the front of the
    /// pending queue into the channel while it has spare capacity.
    fn flush_pending<E: std::error::Error>(
        &mut self,
        idx: usize,
        queue: &mut VecDeque<F::Batch>,
    ) -> LoadResult<(), E> {
        let channel = &self.channels[idx];
        let freed = channel.poll_completions();
        if freed > 0 {
            log::trace!("Channel {idx}: {freed} batches completed");
        }
        while channel.has_capacity() {
            let batch = match queue.pop_front() {
                Some(batch) => batch,
                None => break,
            };
            match channel.try_send_to_worker(batch) {
                Ok(()) => self.stats.batches_sent += 1,
                Err(TrySendError::Full(batch)) => {
                    queue.push_front(batch);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => return Err(LoadErr::WorkerDead(idx)),
            }
        }
        Ok(())
    }
}
