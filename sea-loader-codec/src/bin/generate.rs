//! Generates a CPU-only devops data set as a frame stream.
//!
//! ```ignore
//! generate --hosts 10 --start 2016-01-01T00:00:00Z --end 2016-01-02T00:00:00Z --interval 10s > cpu.bin
//! ```
use anyhow::{anyhow, Result};
use clap::Parser;
use sea_loader_codec::FrameWriter;
use sea_loader_types::{DataHeaders, Point, Simulator, Timestamp};
use std::{
    fs::File,
    io::{BufWriter, Write},
    time::Duration,
};

const MEASUREMENT: &str = "cpu";
const REGIONS: &[&str] = &[
    "us-east-1",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-central-1",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-northeast-1",
    "sa-east-1",
];
const FIELDS: &[&str] = &[
    "usage_user",
    "usage_system",
    "usage_idle",
    "usage_nice",
    "usage_iowait",
    "usage_irq",
    "usage_softirq",
    "usage_steal",
    "usage_guest",
    "usage_guest_nice",
];

#[derive(Debug, Parser)]
struct Args {
    #[clap(long, help = "Write to this file; stdout if not set")]
    file: Option<String>,
    #[clap(long, help = "Number of hosts to simulate", default_value = "1")]
    hosts: u64,
    #[clap(long, value_parser = parse_timestamp, help = "Start of the time window, RFC 3339", default_value = "2016-01-01T00:00:00Z")]
    start: Timestamp,
    #[clap(long, value_parser = parse_timestamp, help = "End of the time window, RFC 3339", default_value = "2016-01-02T00:00:00Z")]
    end: Timestamp,
    #[clap(long, value_parser = parse_duration, help = "Period between two readings. e.g. 10s, 100ms", default_value = "10s")]
    interval: Duration,
    #[clap(long, help = "Stop after this many points; 0 means no limit", default_value = "0")]
    limit: u64,
    #[clap(long, help = "Emit all points of one host before moving on to the next")]
    batch_host_points: bool,
    #[clap(long, help = "Seed of the random walk", default_value = "123")]
    seed: u64,
}

fn parse_duration(src: &str) -> Result<Duration> {
    if let Some(s) = src.strip_suffix("ms") {
        Ok(Duration::from_millis(s.parse()?))
    } else if let Some(s) = src.strip_suffix('s') {
        Ok(Duration::from_secs(s.parse()?))
    } else if let Some(s) = src.strip_suffix('m') {
        Ok(Duration::from_secs(s.parse::<u64>()? * 60))
    } else {
        Err(anyhow!("Failed to parse {} as Duration", src))
    }
}

fn parse_timestamp(src: &str) -> Result<Timestamp> {
    // RFC 3339 in UTC only, which is what we print anyway
    let src = src
        .strip_suffix('Z')
        .ok_or_else(|| anyhow!("Expected a UTC timestamp ending with Z"))?;
    let format = time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    Ok(time::PrimitiveDateTime::parse(src, format)?.assume_utc())
}

struct Host {
    hostname: String,
    region: &'static str,
    rack: f32,
    usage: Vec<f64>,
}

/// Each host carries a random walk of cpu usage, bounded in [0, 100].
struct CpuOnlySimulator {
    rng: fastrand::Rng,
    hosts: Vec<Host>,
    start: Timestamp,
    interval: Duration,
    epochs: u64,
    epoch: u64,
    host_index: usize,
    made_points: u64,
    max_points: u64,
    batch_host_points: bool,
}

impl Host {
    fn new(rng: &fastrand::Rng, i: usize) -> Self {
        Self {
            hostname: format!("host_{i}"),
            region: REGIONS[rng.usize(..REGIONS.len())],
            rack: rng.u32(0..100) as f32,
            usage: FIELDS.iter().map(|_| rng.f64() * 100.0).collect(),
        }
    }

    fn tick(&mut self, rng: &fastrand::Rng) {
        for v in self.usage.iter_mut() {
            *v = (*v + (rng.f64() - 0.5) * 2.0).clamp(0.0, 100.0);
        }
    }
}

impl CpuOnlySimulator {
    fn new(args: &Args) -> Result<Self> {
        if args.end <= args.start {
            return Err(anyhow!("End must be after start"));
        }
        if args.interval.is_zero() {
            return Err(anyhow!("Interval cannot be zero"));
        }
        let rng = fastrand::Rng::with_seed(args.seed);
        let hosts = (0..args.hosts as usize)
            .map(|i| Host::new(&rng, i))
            .collect();
        let window = (args.end - args.start).whole_nanoseconds() as u128;
        let epochs = (window / args.interval.as_nanos()) as u64;
        let mut max_points = epochs * args.hosts;
        if args.limit > 0 && args.limit < max_points {
            max_points = args.limit;
        }
        Ok(Self {
            rng,
            hosts,
            start: args.start,
            interval: args.interval,
            epochs,
            epoch: 0,
            host_index: 0,
            made_points: 0,
            max_points,
            batch_host_points: args.batch_host_points,
        })
    }

    fn timestamp(&self) -> Timestamp {
        self.start + self.interval * self.epoch as u32
    }

    fn populate(&mut self, point: &mut Point) {
        let ts = self.timestamp();
        let host = &self.hosts[self.host_index];
        point.reset();
        point.set_measurement(MEASUREMENT);
        point.set_timestamp(ts);
        point.append_tag("hostname", host.hostname.as_str());
        point.append_tag("region", host.region);
        point.append_tag("rack", host.rack);
        for (key, value) in FIELDS.iter().zip(host.usage.iter()) {
            point.append_field(*key, *value);
        }
        self.made_points += 1;
    }
}

impl Simulator for CpuOnlySimulator {
    fn finished(&self) -> bool {
        self.made_points >= self.max_points || self.hosts.is_empty()
    }

    fn next(&mut self, point: &mut Point) -> bool {
        if self.finished() {
            return false;
        }
        if self.batch_host_points {
            // walk through every epoch of one host, then move on
            if self.epoch == self.epochs {
                self.epoch = 0;
                self.host_index += 1;
                if self.host_index == self.hosts.len() {
                    return false;
                }
            }
            let rng = &self.rng;
            self.hosts[self.host_index].tick(rng);
            self.populate(point);
            self.epoch += 1;
        } else {
            if self.host_index == self.hosts.len() {
                self.host_index = 0;
                self.epoch += 1;
                if self.epoch == self.epochs {
                    return false;
                }
                let rng = &self.rng;
                for host in self.hosts.iter_mut() {
                    host.tick(rng);
                }
            }
            self.populate(point);
            self.host_index += 1;
        }
        true
    }

    fn headers(&self) -> DataHeaders {
        DataHeaders {
            tag_types: vec!["string".to_owned(), "string".to_owned(), "float32".to_owned()],
            tag_keys: vec!["hostname".to_owned(), "region".to_owned(), "rack".to_owned()],
            field_keys: [(
                MEASUREMENT.to_owned(),
                FIELDS.iter().map(|s| s.to_string()).collect(),
            )]
            .into_iter()
            .collect(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut sim = CpuOnlySimulator::new(&args)?;
    log::info!("{}", serde_json::to_string(&sim.headers())?);

    let output: Box<dyn Write> = match &args.file {
        Some(file) => Box::new(File::create(file)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = FrameWriter::new(BufWriter::new(output));
    let mut point = Point::default();

    while sim.next(&mut point) {
        writer.write(&point)?;
    }

    log::info!(
        "Generated {} points ({} bytes).",
        writer.frames_written(),
        writer.bytes_written()
    );
    writer.end()?;

    Ok(())
}
