//! This program decodes a binary SeaLoader frame stream and output as plain text.
//!
//! Example `log` format:
//!
//! ```ignore
//! [2016-01-01T00:00:00.0 | cpu] hostname=host_0 region=eu-west-1 | usage_user=58 usage_system=2
//! ```
//!
//! Example `ndjson` format:
//!
//! ```ignore
//! {"measurement":"cpu","timestamp":1451606400000000000,"tags":[{"key":"hostname","value":"host_0"}],"fields":[{"key":"usage_user","value":58.0}]}
//! ```
use anyhow::Result;
use clap::Parser;
use sea_loader_codec::FrameReader;
use sea_loader_types::{DataSource, LogicalPoint, TIMESTAMP_FORMAT};
use std::{io::Read, str::FromStr};

#[derive(Parser)]
struct Args {
    #[clap(long, help = "Decode this file; read from stdin if not set")]
    file: Option<String>,
    #[clap(long, help = "If set, skip printing the tags and fields")]
    header_only: bool,
    #[clap(long, help = "The output format", default_value = "log")]
    format: Format,
    #[clap(long, help = "Stop after this many points; 0 means no limit", default_value = "0")]
    limit: u64,
}

#[derive(Clone)]
enum Format {
    Log,
    Ndjson,
}

fn main() -> Result<()> {
    env_logger::init();

    let Args {
        file,
        header_only,
        format,
        limit,
    } = Args::parse();

    match file {
        Some(file) => decode(FrameReader::open(file)?, header_only, format, limit),
        None => decode(FrameReader::stdin(), header_only, format, limit),
    }
}

fn decode<R: Read>(
    mut source: FrameReader<R>,
    header_only: bool,
    format: Format,
    limit: u64,
) -> Result<()> {
    let mut count = 0u64;
    while let Some(point) = source.next_item()? {
        match format {
            Format::Log => print_log(&point, header_only)?,
            Format::Ndjson => {
                if header_only {
                    println!(
                        "{}",
                        serde_json::json!({
                            "measurement": point.measurement,
                            "timestamp": point.timestamp,
                        })
                    );
                } else {
                    println!("{}", serde_json::to_string(&point)?);
                }
            }
        }
        count += 1;
        if limit > 0 && count >= limit {
            break;
        }
    }
    log::info!("Decoded {count} points.");

    Ok(())
}

fn print_log(point: &LogicalPoint, header_only: bool) -> Result<()> {
    print!(
        "[{} | {}]",
        point.timestamp_utc().format(TIMESTAMP_FORMAT)?,
        point.measurement,
    );
    if !header_only {
        for tag in point.tags.iter() {
            print!(" {}={}", tag.key, tag.value);
        }
        print!(" |");
        for field in point.fields.iter() {
            print!(" {}={}", field.key, field.value);
        }
    }
    println!();
    Ok(())
}

impl FromStr for Format {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "log" => Ok(Self::Log),
            "ndjson" => Ok(Self::Ndjson),
            _ => Err("Invalid Format"),
        }
    }
}
