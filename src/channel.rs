use flume::{bounded, unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};

pub use flume::{SendError, TrySendError};

/// Create a duplex channel whose forward queue holds at most `queue_len` batches.
///
/// The forward path carries batches from the scanner to the worker(s). The return path carries
/// one completion token per processed batch, which tells the scanner that capacity has been freed.
///
/// A batch is in flight from the moment it is sent until its completion token is polled.
/// The channel has spare capacity while fewer than `queue_len` batches are in flight.
///
/// # Panics
///
/// Panics if `queue_len` is 0.
pub fn duplex_channel<B>(queue_len: usize) -> (DuplexChannel<B>, WorkerChannel<B>) {
    assert!(queue_len > 0, "Channel capacity cannot be less than 1");
    let (to_worker, from_scanner) = bounded(queue_len);
    let (to_scanner, from_worker) = unbounded();
    (
        DuplexChannel {
            to_worker,
            from_worker,
            capacity: queue_len,
            in_flight: AtomicUsize::new(0),
        },
        WorkerChannel {
            from_scanner,
            to_scanner,
        },
    )
}

/// The scanner's half of a duplex channel.
pub struct DuplexChannel<B> {
    to_worker: Sender<B>,
    from_worker: Receiver<()>,
    capacity: usize,
    in_flight: AtomicUsize,
}

/// The worker's half of a duplex channel. It can be cloned, in which case the workers
/// share one queue and a batch is received by exactly one of them.
pub struct WorkerChannel<B> {
    from_scanner: Receiver<B>,
    to_scanner: Sender<()>,
}

impl<B> DuplexChannel<B> {
    /// Send a batch, blocking while the queue is full.
    /// Fails only if every worker has hung up, returning the batch.
    pub fn send_to_worker(&self, batch: B) -> Result<(), SendError<B>> {
        self.to_worker.send(batch)?;
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send a batch if there is room in the queue; otherwise hand the batch back.
    pub fn try_send_to_worker(&self, batch: B) -> Result<(), TrySendError<B>> {
        self.to_worker.try_send(batch)?;
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Whether fewer than `capacity` batches are in flight. Only as fresh as the last
    /// [`DuplexChannel::poll_completions`].
    pub fn has_capacity(&self) -> bool {
        self.in_flight() < self.capacity
    }

    /// Collect the completion tokens sent back by the worker(s) since the last poll.
    /// Returns the number of batches finished in the meantime. Never blocks.
    pub fn poll_completions(&self) -> usize {
        let done = self.from_worker.try_iter().count();
        if done > 0 {
            let prev = self.in_flight.fetch_sub(done, Ordering::Relaxed);
            assert!(prev >= done, "More completions than batches sent");
        }
        done
    }

    /// Batches sent but not yet reported as processed: queued or being worked on.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Number of batches waiting in the forward queue.
    pub fn len(&self) -> usize {
        self.to_worker.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_worker.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether every worker has hung up.
    pub fn is_disconnected(&self) -> bool {
        self.to_worker.is_disconnected()
    }
}

impl<B> WorkerChannel<B> {
    /// Wait for the next batch. Returns `None` once the scanner has hung up and the queue is drained.
    pub fn recv(&self) -> Option<B> {
        self.from_scanner.recv().ok()
    }

    /// Tell the scanner that one batch has been processed.
    pub fn send_to_scanner(&self) {
        // the scanner stops listening once it is done; it is not an error
        self.to_scanner.send(()).ok();
    }
}

impl<B> Clone for WorkerChannel<B> {
    fn clone(&self) -> Self {
        Self {
            from_scanner: self.from_scanner.clone(),
            to_scanner: self.to_scanner.clone(),
        }
    }
}

impl<B> std::fmt::Debug for DuplexChannel<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplexChannel")
            .field("len", &self.len())
            .field("in_flight", &self.in_flight())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<B> std::fmt::Debug for WorkerChannel<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerChannel")
            .field("pending", &self.from_scanner.len())
            .finish()
    }
}
