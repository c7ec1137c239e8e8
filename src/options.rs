use std::time::Duration;

use sea_loader_types::{LoadErr, LoadResult};

pub const DEFAULT_BATCH_SIZE: usize = 10_000;
pub const DEFAULT_REPORTING_PERIOD: Duration = Duration::from_secs(10);

/// Options of a [`crate::Loader`].
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    workers: usize,
    batch_size: usize,
    limit: u64,
    channel_capacity: usize,
    hash_workers: bool,
    batched_inserts: bool,
    meta_field_index: Option<String>,
    flow_control: bool,
    do_load: bool,
    reporting_period: Option<Duration>,
}

/// Which scanning policy a set of options resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPolicy<'a> {
    /// Stream, with the meta field override if set.
    Direct { meta_field: Option<&'a str> },
    /// Group everything by the meta field first.
    GroupByMetaField { meta_field: &'a str },
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            batch_size: DEFAULT_BATCH_SIZE,
            limit: 0,
            channel_capacity: 1,
            hash_workers: false,
            batched_inserts: false,
            meta_field_index: None,
            flow_control: false,
            do_load: true,
            reporting_period: Some(DEFAULT_REPORTING_PERIOD),
        }
    }
}

impl LoaderOptions {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of worker threads. Default 1.
    pub fn set_workers(&mut self, v: usize) -> &mut Self {
        self.workers = v;
        self
    }
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Points per batch. Default 10000.
    pub fn set_batch_size(&mut self, v: usize) -> &mut Self {
        self.batch_size = v;
        self
    }
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Stop after reading this many points. 0 means no limit.
    pub fn set_limit(&mut self, v: u64) -> &mut Self {
        self.limit = v;
        self
    }
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Batches each channel can hold before the scanner has to wait. Default 1.
    pub fn set_channel_capacity(&mut self, v: usize) -> &mut Self {
        self.channel_capacity = v;
        self
    }
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// If set, every worker gets its own channel and points are routed to a specific worker.
    /// Otherwise all workers share one channel, and take whichever batch comes next.
    pub fn set_hash_workers(&mut self, v: bool) -> &mut Self {
        self.hash_workers = v;
        self
    }
    pub fn hash_workers(&self) -> bool {
        self.hash_workers
    }

    /// Route points by the value of the meta field, so that one meta field value
    /// always lands on the same worker. Requires [`LoaderOptions::set_meta_field_index`].
    pub fn set_batched_inserts(&mut self, v: bool) -> &mut Self {
        self.batched_inserts = v;
        self
    }
    pub fn batched_inserts(&self) -> bool {
        self.batched_inserts
    }

    /// The tag key used in batched inserts mode.
    pub fn set_meta_field_index<S: Into<String>>(&mut self, v: S) -> &mut Self {
        self.meta_field_index = Some(v.into());
        self
    }
    pub fn meta_field_index(&self) -> Option<&str> {
        self.meta_field_index.as_deref()
    }

    /// In batched inserts mode, group the whole input by the meta field before dispatching.
    /// This keeps every meta field value contiguous, at the cost of holding the input in memory.
    pub fn set_flow_control(&mut self, v: bool) -> &mut Self {
        self.flow_control = v;
        self
    }
    pub fn flow_control(&self) -> bool {
        self.flow_control
    }

    /// If false, batches are consumed but nothing is written. Default true.
    pub fn set_do_load(&mut self, v: bool) -> &mut Self {
        self.do_load = v;
        self
    }
    pub fn do_load(&self) -> bool {
        self.do_load
    }

    /// Log the throughput periodically. `None` disables it. Default 10 seconds.
    pub fn set_reporting_period(&mut self, v: Option<Duration>) -> &mut Self {
        self.reporting_period = v;
        self
    }
    pub fn reporting_period(&self) -> Option<Duration> {
        self.reporting_period
    }

    /// Number of channels between the scanner and the workers.
    pub fn num_channels(&self) -> usize {
        if self.hash_workers {
            self.workers
        } else {
            1
        }
    }

    pub fn validate<E: std::error::Error>(&self) -> LoadResult<(), E> {
        if self.workers == 0 {
            return Err(LoadErr::NoWorker);
        }
        if self.batch_size == 0 {
            return Err(LoadErr::BatchSizeZero);
        }
        if self.channel_capacity == 0 {
            return Err(LoadErr::ChannelCapacityZero);
        }
        if self.batched_inserts && self.meta_field_index.is_none() {
            return Err(LoadErr::MetaFieldNotSet);
        }
        Ok(())
    }

    /// Resolve the scanning policy. Call [`LoaderOptions::validate`] first.
    pub fn scan_policy(&self) -> ScanPolicy<'_> {
        match (self.batched_inserts, self.meta_field_index()) {
            (true, Some(meta_field)) if self.flow_control => {
                ScanPolicy::GroupByMetaField { meta_field }
            }
            (true, Some(meta_field)) => ScanPolicy::Direct {
                meta_field: Some(meta_field),
            },
            _ => ScanPolicy::Direct { meta_field: None },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_validate() {
        let mut options = LoaderOptions::new();
        assert!(options.validate::<Infallible>().is_ok());
        assert_eq!(options.num_channels(), 1);
        assert_eq!(options.scan_policy(), ScanPolicy::Direct { meta_field: None });

        options.set_workers(4).set_hash_workers(true);
        assert_eq!(options.num_channels(), 4);

        options.set_batched_inserts(true);
        assert!(matches!(
            options.validate::<Infallible>(),
            Err(LoadErr::MetaFieldNotSet)
        ));
        options.set_meta_field_index("hostname");
        assert!(options.validate::<Infallible>().is_ok());
        assert_eq!(
            options.scan_policy(),
            ScanPolicy::Direct {
                meta_field: Some("hostname")
            }
        );
        options.set_flow_control(true);
        assert_eq!(
            options.scan_policy(),
            ScanPolicy::GroupByMetaField {
                meta_field: "hostname"
            }
        );

        options.set_batch_size(0);
        let err = options.validate::<Infallible>().unwrap_err();
        assert!(matches!(err, LoadErr::BatchSizeZero));
        assert!(err.is_config_error());
        options.set_batch_size(1).set_channel_capacity(0);
        assert!(matches!(
            options.validate::<Infallible>(),
            Err(LoadErr::ChannelCapacityZero)
        ));
        options.set_channel_capacity(1).set_workers(0);
        assert!(matches!(
            options.validate::<Infallible>(),
            Err(LoadErr::NoWorker)
        ));
    }
}
