mod util;
use util::*;

use sea_loader::{
    FrameReader, FrameWriter, LoadErr, Loader, LoaderOptions, LogicalPoint, Point, PointBatch,
    PointBatchFactory, Processor, RoundRobinIndexer, TagHashIndexer,
};
use std::{
    collections::{HashMap, HashSet},
    fs::File,
    io::{BufWriter, Error, ErrorKind},
    sync::{Arc, Mutex},
    time::Duration,
};

// cargo test --test loader -- --nocapture

type Seen = Arc<Mutex<Vec<(usize, LogicalPoint)>>>;

/// Remembers which worker got which point.
#[derive(Debug, Default)]
struct Recorder {
    worker: usize,
    seen: Seen,
    delay: Option<Duration>,
    fail_at: Option<i64>,
    closed: Arc<Mutex<Vec<usize>>>,
}

impl Processor for Recorder {
    type Batch = PointBatch;
    type Error = Error;

    fn init(&mut self, worker: usize, _: bool, _: bool) {
        self.worker = worker;
    }

    fn process_batch(&mut self, batch: PointBatch, do_load: bool) -> Result<(u64, u64), Error> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if batch
            .points()
            .iter()
            .any(|p| Some(p.timestamp) == self.fail_at)
        {
            return Err(Error::new(ErrorKind::Other, "cannot write"));
        }
        if !do_load {
            return Ok((0, 0));
        }
        let metrics = batch.points().iter().map(|p| p.fields.len() as u64).sum();
        let rows = batch.points().len() as u64;
        let mut seen = self.seen.lock().expect("Failed to lock Seen");
        for point in batch.into_points() {
            seen.push((self.worker, point));
        }
        Ok((metrics, rows))
    }

    fn close(&mut self, _: bool) {
        self.closed
            .lock()
            .expect("Failed to lock closed")
            .push(self.worker);
    }
}

fn hosts(num_hosts: usize, rounds: usize) -> Vec<LogicalPoint> {
    let mut points = Vec::new();
    for r in 0..rounds {
        for h in 0..num_hosts {
            let i = (r * num_hosts + h) as i64;
            points.push(
                point(i, "hostname", Some(&format!("host_{h}"))).with_field("usage_system", 1.0),
            );
        }
    }
    points
}

fn options() -> LoaderOptions {
    let mut options = LoaderOptions::new();
    options.set_reporting_period(None);
    options
}

#[test]
fn shared_channel() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut options = options();
    options.set_workers(4).set_batch_size(10).set_channel_capacity(2);
    let seen = Seen::default();
    let closed = Arc::new(Mutex::new(Vec::new()));

    let summary = Loader::new(options).run(
        VecSource::new(hosts(10, 100)),
        &PointBatchFactory::new(10),
        RoundRobinIndexer::new(1),
        |_| Recorder {
            seen: seen.clone(),
            closed: closed.clone(),
            ..Default::default()
        },
    )?;

    assert_eq!(summary.items_read, 1000);
    assert_eq!(summary.rows, 1000);
    assert_eq!(summary.metrics, 2000);
    assert_eq!(summary.batches, 100);
    assert_eq!(summary.workers, 4);
    assert_eq!(seen.lock().unwrap().len(), 1000);
    let mut closed = closed.lock().unwrap().clone();
    closed.sort();
    assert_eq!(closed, [0, 1, 2, 3]);

    Ok(())
}

#[test]
fn hashed_meta_field() -> anyhow::Result<()> {
    let mut options = options();
    options
        .set_workers(4)
        .set_hash_workers(true)
        .set_batch_size(7)
        .set_channel_capacity(4)
        .set_batched_inserts(true)
        .set_meta_field_index("hostname");
    let seen = Seen::default();

    let summary = Loader::new(options).run(
        VecSource::new(hosts(20, 50)),
        &PointBatchFactory::new(7),
        RoundRobinIndexer::new(4),
        |_| Recorder {
            seen: seen.clone(),
            ..Default::default()
        },
    )?;
    assert_eq!(summary.items_read, 1000);

    // every host sticks to one worker
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1000);
    let mut workers: HashMap<String, HashSet<usize>> = HashMap::new();
    for (worker, point) in seen.iter() {
        let host = point.tag("hostname").expect("tagged").to_string();
        workers.entry(host).or_default().insert(*worker);
    }
    assert_eq!(workers.len(), 20);
    assert!(workers.values().all(|w| w.len() == 1));

    Ok(())
}

#[test]
fn grouped_with_slow_worker() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut options = options();
    options
        .set_workers(2)
        .set_hash_workers(true)
        .set_batch_size(5)
        .set_channel_capacity(1)
        .set_batched_inserts(true)
        .set_flow_control(true)
        .set_meta_field_index("hostname")
        .set_reporting_period(Some(Duration::from_millis(10)));
    let seen = Seen::default();

    let summary = Loader::new(options).run(
        VecSource::new(hosts(5, 40)),
        &PointBatchFactory::new(5),
        TagHashIndexer::new("hostname", 2),
        |i| Recorder {
            seen: seen.clone(),
            delay: if i == 0 {
                Some(Duration::from_millis(2))
            } else {
                None
            },
            ..Default::default()
        },
    )?;

    // nothing is lost in the pending queues
    assert_eq!(summary.items_read, 200);
    assert_eq!(summary.rows, 200);
    assert_eq!(summary.batches, 40);
    assert_eq!(summary.scan.batches_sent, 40);

    // a host's batches alternate between the workers, but each worker sees them in arrival order
    let seen = seen.lock().unwrap();
    let mut last: HashMap<(usize, String), i64> = HashMap::new();
    for (worker, point) in seen.iter() {
        let host = point.tag("hostname").expect("tagged").to_string();
        if let Some(prev) = last.insert((*worker, host), point.timestamp) {
            assert!(prev < point.timestamp);
        }
    }

    Ok(())
}

#[test]
fn worker_failure() {
    for hash_workers in [false, true] {
        let mut options = options();
        options
            .set_workers(2)
            .set_hash_workers(hash_workers)
            .set_batch_size(3);
        let closed = Arc::new(Mutex::new(Vec::new()));

        let res = Loader::new(options).run(
            VecSource::new(hosts(4, 50)),
            &PointBatchFactory::new(3),
            RoundRobinIndexer::new(2),
            |_| Recorder {
                fail_at: Some(42),
                closed: closed.clone(),
                ..Default::default()
            },
        );
        match res {
            Err(LoadErr::Runtime(err)) => assert_eq!(err.to_string(), "cannot write"),
            other => panic!("Unexpected {other:?}"),
        }
        // every worker is closed, failed or not
        assert_eq!(closed.lock().unwrap().len(), 2);
    }
}

#[test]
fn dry_run() -> anyhow::Result<()> {
    let mut options = options();
    options.set_workers(2).set_batch_size(8).set_do_load(false);

    let summary = Loader::new(options).run(
        VecSource::new(hosts(3, 10)),
        &PointBatchFactory::new(8),
        RoundRobinIndexer::new(1),
        |_| Recorder::default(),
    )?;
    assert_eq!(summary.items_read, 30);
    assert_eq!(summary.batches, 4);
    assert_eq!(summary.metrics, 0);
    assert_eq!(summary.rows, 0);

    Ok(())
}

#[test]
fn invalid_options() {
    let mut options = options();
    options.set_workers(0);
    let res = Loader::new(options).run(
        VecSource::new(hosts(1, 1)),
        &PointBatchFactory::new(1),
        RoundRobinIndexer::new(1),
        |_| -> Recorder { panic!("No worker should be created") },
    );
    assert!(matches!(res, Err(LoadErr::NoWorker)));
}

#[test]
fn from_frame_file() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let path = temp_file("from_frame_file")?;
    let mut writer = FrameWriter::new(BufWriter::new(File::create(&path)?));
    for point in hosts(10, 30) {
        writer.write(&Point::from(point))?;
    }
    writer.end()?;

    let mut options = options();
    options
        .set_workers(3)
        .set_hash_workers(true)
        .set_batch_size(16)
        .set_limit(250);
    let seen = Seen::default();

    let summary = Loader::new(options).run(
        FrameReader::open(&path)?,
        &PointBatchFactory::new(16),
        TagHashIndexer::new("hostname", 3),
        |_| Recorder {
            seen: seen.clone(),
            ..Default::default()
        },
    )?;
    assert_eq!(summary.items_read, 250);
    assert_eq!(summary.rows, 250);
    assert_eq!(summary.metrics, 500);

    let mut timestamps: Vec<_> = seen.lock().unwrap().iter().map(|(_, p)| p.timestamp).collect();
    timestamps.sort();
    assert_eq!(timestamps, (0..250).collect::<Vec<i64>>());

    std::fs::remove_file(path)?;
    Ok(())
}
