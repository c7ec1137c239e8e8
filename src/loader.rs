use flume::{Receiver, RecvTimeoutError};
use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use crate::{duplex_channel, LoaderOptions, ScanPolicy, ScanStats, Scanner, WorkerChannel};
use sea_loader_types::{runtime_error, BatchFactory, DataSource, LoadResult, PointIndexer, Processor};

/// Runs a scan against a pool of worker threads, one [`Processor`] per worker.
#[derive(Debug, Clone)]
pub struct Loader {
    options: LoaderOptions,
}

/// Outcome of [`Loader::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadSummary {
    pub workers: usize,
    pub items_read: u64,
    pub batches: u64,
    pub metrics: u64,
    pub rows: u64,
    pub elapsed: Duration,
    pub scan: ScanStats,
}

#[derive(Debug, Default)]
struct Counters {
    batches: AtomicU64,
    metrics: AtomicU64,
    rows: AtomicU64,
}

impl Loader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoaderOptions {
        &self.options
    }

    /// Scan `source` to the end (or to the item limit), and wait for every worker to finish.
    ///
    /// `make_processor` is called once per worker, with the worker number, on the calling thread.
    /// `indexer` is only consulted when the workers are hashed; a single shared channel makes it moot.
    ///
    /// Errors of the source are returned as [`sea_loader_types::LoadErr::Backend`]. The first error
    /// of a processor is returned as [`sea_loader_types::LoadErr::Runtime`], after all workers stopped.
    pub fn run<S, F, I, P, M>(
        &self,
        source: S,
        factory: &F,
        mut indexer: I,
        mut make_processor: M,
    ) -> LoadResult<LoadSummary, S::Error>
    where
        S: DataSource,
        F: BatchFactory,
        I: PointIndexer,
        P: Processor<Batch = F::Batch> + 'static,
        M: FnMut(usize) -> P,
    {
        let options = &self.options;
        options.validate::<S::Error>()?;

        let (channels, worker_channels): (Vec<_>, Vec<_>) = (0..options.num_channels())
            .map(|_| duplex_channel(options.channel_capacity()))
            .unzip();
        let counters = Arc::new(Counters::default());
        let start = Instant::now();

        let mut workers = Vec::with_capacity(options.workers());
        for i in 0..options.workers() {
            let channel = worker_channels[i % worker_channels.len()].clone();
            let worker = spawn_worker(
                i,
                make_processor(i),
                channel,
                counters.clone(),
                options.do_load(),
                options.hash_workers(),
            )
            .map_err(runtime_error::<S::Error, _>)?;
            workers.push(worker);
        }
        // only the workers hold the receiving ends now
        drop(worker_channels);
        log::debug!(
            "Started {} workers on {} channels",
            workers.len(),
            channels.len()
        );

        let (stop, stopped) = flume::bounded(1);
        let reporter = match options.reporting_period() {
            Some(period) => Some(
                spawn_reporter(period, counters.clone(), stopped)
                    .map_err(runtime_error::<S::Error, _>)?,
            ),
            None => None,
        };

        let mut scanner = Scanner::new(factory, &channels, options.batch_size(), options.limit());
        let scanned = match options.scan_policy() {
            ScanPolicy::Direct { meta_field } => {
                scanner.scan_without_flow_control(source, &mut indexer, meta_field)
            }
            ScanPolicy::GroupByMetaField { meta_field } => {
                scanner.scan_with_batching_meta_fields(source, meta_field)
            }
        };
        let scan = *scanner.stats();
        // hang up, so that the workers stop after the last batch
        drop(channels);

        let mut failure = None;
        for (i, worker) in workers.into_iter().enumerate() {
            match worker.join() {
                Ok(Ok(())) => (),
                Ok(Err(err)) => {
                    log::error!("Worker {i} failed: {err}");
                    if failure.is_none() {
                        failure = Some(err);
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        drop(stop);
        if let Some(reporter) = reporter {
            if let Err(panic) = reporter.join() {
                std::panic::resume_unwind(panic);
            }
        }

        if let Some(err) = failure {
            return Err(runtime_error(err));
        }
        scanned?;

        let summary = LoadSummary {
            workers: options.workers(),
            items_read: scan.items_read,
            batches: counters.batches.load(Ordering::Acquire),
            metrics: counters.metrics.load(Ordering::Acquire),
            rows: counters.rows.load(Ordering::Acquire),
            elapsed: start.elapsed(),
            scan,
        };
        log::info!("{summary}");
        Ok(summary)
    }
}

fn spawn_worker<P: Processor + 'static>(
    i: usize,
    mut processor: P,
    channel: WorkerChannel<P::Batch>,
    counters: Arc<Counters>,
    do_load: bool,
    hash_workers: bool,
) -> std::io::Result<JoinHandle<Result<(), P::Error>>> {
    std::thread::Builder::new()
        .name(format!("worker-{i}"))
        .spawn(move || {
            processor.init(i, do_load, hash_workers);
            let mut work = || -> Result<(), P::Error> {
                while let Some(batch) = channel.recv() {
                    let (metrics, rows) = processor.process_batch(batch, do_load)?;
                    counters.metrics.fetch_add(metrics, Ordering::AcqRel);
                    counters.rows.fetch_add(rows, Ordering::AcqRel);
                    counters.batches.fetch_add(1, Ordering::AcqRel);
                    channel.send_to_scanner();
                }
                Ok(())
            };
            let result = work();
            processor.close(do_load);
            log::debug!("Worker {i} finished");
            result
        })
}

fn spawn_reporter(
    period: Duration,
    counters: Arc<Counters>,
    stopped: Receiver<()>,
) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("reporter".to_owned())
        .spawn(move || {
            let start = Instant::now();
            let mut prev_time = start;
            let mut prev_metrics = 0;
            let mut prev_rows = 0;
            while let Err(RecvTimeoutError::Timeout) = stopped.recv_timeout(period) {
                let now = Instant::now();
                let metrics = counters.metrics.load(Ordering::Acquire);
                let rows = counters.rows.load(Ordering::Acquire);
                let took = (now - prev_time).as_secs_f64();
                let overall = (now - start).as_secs_f64();
                log::info!(
                    "{:.2} metrics/sec (total {metrics}, overall {:.2} metrics/sec); {:.2} rows/sec (total {rows})",
                    (metrics - prev_metrics) as f64 / took,
                    metrics as f64 / overall,
                    (rows - prev_rows) as f64 / took,
                );
                prev_time = now;
                prev_metrics = metrics;
                prev_rows = rows;
            }
        })
}

impl LoadSummary {
    pub fn metric_rate(&self) -> f64 {
        rate(self.metrics, self.elapsed)
    }

    pub fn row_rate(&self) -> f64 {
        rate(self.rows, self.elapsed)
    }
}

fn rate(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

impl Display for LoadSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "loaded {} metrics in {:.3}sec with {} workers (mean rate {:.2} metrics/sec)",
            self.metrics,
            self.elapsed.as_secs_f64(),
            self.workers,
            self.metric_rate()
        )?;
        if self.rows > 0 {
            write!(
                f,
                "; loaded {} rows (mean rate {:.2} rows/sec)",
                self.rows,
                self.row_rate()
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_summary() {
        let summary = LoadSummary {
            workers: 2,
            items_read: 10,
            batches: 5,
            metrics: 100,
            rows: 10,
            elapsed: Duration::from_secs(2),
            scan: Default::default(),
        };
        assert_eq!(summary.metric_rate(), 50.0);
        assert_eq!(summary.row_rate(), 5.0);
        assert_eq!(
            summary.to_string(),
            "loaded 100 metrics in 2.000sec with 2 workers (mean rate 50.00 metrics/sec); loaded 10 rows (mean rate 5.00 rows/sec)"
        );
        assert_eq!(rate(1, Duration::ZERO), 0.0);
    }
}
