use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use filelog::{FileSink, Level};
use log::info;

#[derive(Parser)]
#[command(name = "filelog-bench")]
#[command(about = "Drive a rotating file sink from several producer threads")]
struct Cli {
    /// Log path without extension (files become <base>.log or <base>_NNN.log)
    #[arg(long, default_value = "./bench-logs/app")]
    base: PathBuf,

    /// Number of producer threads
    #[arg(long, default_value_t = 4)]
    producers: usize,

    /// Records submitted by each producer
    #[arg(long, default_value_t = 100_000)]
    records: u64,

    /// Rotate after this many lines (0 disables)
    #[arg(long, default_value_t = 0)]
    max_lines: u64,

    /// Rotate after this many bytes (0 disables)
    #[arg(long, default_value_t = 0)]
    max_size: u64,

    /// Rotate and archive on day change
    #[arg(long)]
    daily: bool,

    /// Keep rolled-over files as numbered siblings
    #[arg(long)]
    keep_old_files: bool,

    /// Writer queue capacity
    #[arg(long, default_value_t = filelog::config::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let sink = FileSink::builder(&cli.base)
        .rotate_lines(cli.max_lines)
        .rotate_size(cli.max_size)
        .rotate_daily(cli.daily)
        .keep_old_files(cli.keep_old_files)
        .queue_capacity(cli.queue_capacity)
        .build()
        .with_context(|| format!("open sink at {}", cli.base.display()))?;

    info!(
        "submitting {} records from {} producers to {}",
        cli.records * cli.producers as u64,
        cli.producers,
        cli.base.display()
    );

    let started = Instant::now();
    let producers: Vec<_> = (0..cli.producers)
        .map(|id| {
            let handle = sink.handle();
            let records = cli.records;
            thread::spawn(move || -> filelog::Result<()> {
                let source = format!("producer-{id}");
                for seq in 0..records {
                    handle.log(Level::Info, &source, format!("record {seq}"))?;
                }
                Ok(())
            })
        })
        .collect();

    for producer in producers {
        producer
            .join()
            .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;
    }
    let handle = sink.handle();
    sink.close().context("close sink")?;
    let elapsed = started.elapsed();

    let stats = handle.stats();
    let rate = stats.records_written as f64 / elapsed.as_secs_f64();
    println!(
        "records_written={} files_opened={} errors={} elapsed={:.3}s rate={:.0}/s",
        stats.records_written,
        stats.files_opened,
        stats.errors,
        elapsed.as_secs_f64(),
        rate
    );
    Ok(())
}
