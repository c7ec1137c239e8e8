use sea_loader_types::{Point, Timestamp};
use std::{fs::OpenOptions, path::PathBuf};

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

#[allow(dead_code)]
pub fn cpu_point(i: usize) -> Point {
    Point::new(
        "cpu",
        Timestamp::from_unix_timestamp(1_451_606_400 + i as i64).expect("in range"),
    )
    .with_tag("hostname", format!("host_{}", i % 10))
    .with_tag("region", "eu-west-1")
    .with_tag("rack", (i % 4) as f32)
    .with_field("usage_user", i as f64)
    .with_field("usage_system", (i * 2) as i64)
    .with_field("usage_idle", 0.5f32)
}
