//! Logging system demonstration
//!
//! Emits the kind of events a scan and a conversion batch produce so the
//! output formats can be compared side by side.
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_convert=trace"
//! ```

use bridge_traits::logging::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, strip_path, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, instrument, warn, Instrument};

const FILES: &[&str] = &[
    "/storage/emulated/0/Music/Alpha.ncm",
    "/storage/emulated/0/Music/Beta.ncm",
    "/storage/emulated/0/Music/Gamma.ncm",
];

#[tokio::main]
async fn main() -> core_runtime::Result<()> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_logger_sink(Arc::new(ConsoleLogger::default()));
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config)?;
    info!(format = ?format, "Logging initialized");

    scan()
        .instrument(info_span!("scan", scan_id = "demo-scan"))
        .await;
    batch()
        .instrument(info_span!("batch", batch_id = "demo-batch"))
        .await;

    Ok(())
}

async fn scan() {
    info!("Scan started");
    for path in FILES {
        debug!(file = %strip_path(path), "Staged for metadata");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    info!(entry_count = FILES.len(), "Scan completed");
}

async fn batch() {
    info!(total = FILES.len(), "Batch started");
    for (index, path) in FILES.iter().enumerate() {
        convert_file(index, path).await;
    }
    info!(success_count = 2, failure_count = 1, "Batch completed");
}

#[instrument(skip(path), fields(file = %strip_path(path)))]
async fn convert_file(index: usize, path: &str) {
    tokio::time::sleep(Duration::from_millis(5)).await;
    if index == 1 {
        warn!(class = "output_not_found", "Conversion failed");
    } else {
        info!("Converted");
    }
}
