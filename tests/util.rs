use sea_loader::{
    duplex_channel, DataSource, DuplexChannel, LogicalPoint, PointBatch, Timestamp,
    WorkerChannel,
};
use std::{convert::Infallible, fs::OpenOptions, path::PathBuf};

/// Serves points from memory.
pub struct VecSource(std::vec::IntoIter<LogicalPoint>);

impl VecSource {
    #[allow(dead_code)]
    pub fn new(points: Vec<LogicalPoint>) -> Self {
        Self(points.into_iter())
    }
}

impl DataSource for VecSource {
    type Error = Infallible;

    fn next_item(&mut self) -> Result<Option<LogicalPoint>, Infallible> {
        Ok(self.0.next())
    }
}

/// A point with timestamp `i`, tagged with `key=value` unless `value` is `None`.
#[allow(dead_code)]
pub fn point(i: i64, key: &str, value: Option<&str>) -> LogicalPoint {
    let point = LogicalPoint::new("cpu", i).with_field("usage_user", i as f64);
    match value {
        Some(value) => point.with_tag(key, value),
        None => point,
    }
}

#[allow(dead_code)]
pub fn channels(
    n: usize,
    queue_len: usize,
) -> (Vec<DuplexChannel<PointBatch>>, Vec<WorkerChannel<PointBatch>>) {
    (0..n).map(|_| duplex_channel(queue_len)).unzip()
}

/// Receive everything until the scanner hangs up.
#[allow(dead_code)]
pub fn drain(worker: &WorkerChannel<PointBatch>) -> Vec<PointBatch> {
    let mut batches = Vec::new();
    while let Some(batch) = worker.recv() {
        batches.push(batch);
        worker.send_to_scanner();
    }
    batches
}

#[allow(dead_code)]
pub fn timestamps(batch: &PointBatch) -> Vec<i64> {
    batch.points().iter().map(|p| p.timestamp).collect()
}

#[allow(dead_code)]
pub fn temp_file(name: &str) -> Result<PathBuf, std::io::Error> {
    let path = std::env::temp_dir().join(format!(
        "{name}-{}-{}",
        std::process::id(),
        Timestamp::now_utc().unix_timestamp_nanos()
    ));
    let _file = OpenOptions::new()
        .read(true)
        .write(true)
        .create_new(true)
        .open(&path)?;

    Ok(path)
}
