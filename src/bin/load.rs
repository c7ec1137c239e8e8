//! Replays a frame stream into a pool of workers. The workers here only count what they receive,
//! so this measures the throughput of the pipeline itself.
//!
//! ```ignore
//! generate --hosts 100 | load --workers 4 --batch-size 1000
//! load --file cpu.bin --workers 8 --hash-workers --batched-inserts --meta-field-index hostname
//! ```
use anyhow::Result;
use clap::Parser;
use sea_loader::{
    Loader, LoaderOptions, PointBatch, PointBatchFactory, Processor, RoundRobinIndexer,
};
use std::{convert::Infallible, time::Duration};

#[derive(Debug, Parser)]
struct Args {
    #[clap(long, env = "LOAD_FILE", help = "Read frames from this file; stdin if not set")]
    file: Option<String>,
    #[clap(long, env = "LOAD_WORKERS", help = "Number of workers", default_value = "1")]
    workers: usize,
    #[clap(long, help = "Points per batch", default_value = "10000")]
    batch_size: usize,
    #[clap(long, help = "Stop after this many points; 0 means no limit", default_value = "0")]
    limit: u64,
    #[clap(long, help = "Batches each channel can hold", default_value = "1")]
    channel_capacity: usize,
    #[clap(long, help = "Give every worker its own channel")]
    hash_workers: bool,
    #[clap(long, help = "Route points by the value of the meta field")]
    batched_inserts: bool,
    #[clap(long, help = "The tag key to route by in batched inserts mode")]
    meta_field_index: Option<String>,
    #[clap(long, help = "Group the whole input by the meta field before dispatching")]
    flow_control: bool,
    #[clap(long, help = "Read and batch the input, but do not process it")]
    no_load: bool,
    #[clap(long, help = "Seconds between progress reports; 0 disables them", default_value = "10")]
    reporting_period: u64,
}

/// Counts fields as metrics and points as rows.
#[derive(Debug, Default)]
struct CountingProcessor {
    worker: usize,
    batches: u64,
}

impl Processor for CountingProcessor {
    type Batch = PointBatch;
    type Error = Infallible;

    fn init(&mut self, worker: usize, _: bool, _: bool) {
        self.worker = worker;
    }

    fn process_batch(&mut self, batch: PointBatch, do_load: bool) -> Result<(u64, u64), Infallible> {
        self.batches += 1;
        if !do_load {
            return Ok((0, 0));
        }
        let metrics = batch.points().iter().map(|p| p.fields.len() as u64).sum();
        Ok((metrics, batch.points().len() as u64))
    }

    fn close(&mut self, _: bool) {
        log::debug!("Worker {} processed {} batches", self.worker, self.batches);
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut options = LoaderOptions::new();
    options
        .set_workers(args.workers)
        .set_batch_size(args.batch_size)
        .set_limit(args.limit)
        .set_channel_capacity(args.channel_capacity)
        .set_hash_workers(args.hash_workers)
        .set_batched_inserts(args.batched_inserts)
        .set_flow_control(args.flow_control)
        .set_do_load(!args.no_load)
        .set_reporting_period(match args.reporting_period {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        });
    if let Some(meta_field) = args.meta_field_index {
        options.set_meta_field_index(meta_field);
    }

    let loader = Loader::new(options);
    let factory = PointBatchFactory::new(args.batch_size);
    let indexer = RoundRobinIndexer::new(loader.options().num_channels().max(1));
    let make_processor = |_| CountingProcessor::default();

    let summary = match args.file {
        Some(file) => {
            let source = sea_loader::FrameReader::open(file)?;
            loader.run(source, &factory, indexer, make_processor)?
        }
        None => {
            let source = sea_loader::FrameReader::stdin();
            loader.run(source, &factory, indexer, make_processor)?
        }
    };
    println!("{summary}");

    Ok(())
}
