// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB metrics reporter CLI
//!
//! Command-line companion for the reporter library.
//!
//! # Usage
//!
//! ```bash
//! # Write an example configuration
//! metrics-influxdb gen-config -o reporter.yaml
//!
//! # Check a configuration file
//! metrics-influxdb validate -c reporter.yaml
//!
//! # Ship Line Protocol lines read from stdin
//! printf 'cpu,host=a usage=0.5\n' | metrics-influxdb pipe -c reporter.yaml
//!
//! # Report an external snapshot summary once
//! metrics-influxdb send-summary -c reporter.yaml summary.json
//! ```

use clap::{Parser, Subcommand};
use metrics_influxdb::buffer::create_batches;
use metrics_influxdb::summary::parse_summary;
use metrics_influxdb::{
    Client, FlushMode, FnMetric, Precision, Protocol, Reporter, ReporterConfig, TagSet, Transport,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// InfluxDB metrics reporter
#[derive(Parser, Debug)]
#[command(name = "metrics-influxdb")]
#[command(about = "Ship metrics to InfluxDB over UDP or HTTP")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate example configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "reporter.yaml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Send Line Protocol lines read from stdin
    Pipe {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Report every metric of a JSON snapshot summary once
    SendSummary {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,

        /// Summary file
        summary: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.command {
        Commands::GenConfig { output } => cmd_gen_config(output),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Pipe { config } => cmd_pipe(config).await,
        Commands::SendSummary { config, summary } => cmd_send_summary(config, summary).await,
    }
}

fn cmd_gen_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = ReporterConfig {
        precision: Some(Precision::Milliseconds),
        tags: TagSet::from([("service".to_string(), "example".to_string())]),
        skip_idle_metrics: true,
        schedule_interval_ms: Some(10_000),
        ..ReporterConfig::http("127.0.0.1", "telemetry")
    };

    let content = format!(
        r#"# InfluxDB reporter configuration
# Generated by metrics-influxdb gen-config
#
# protocol: udp | http | https (port defaults to 8089 for udp, 8086 otherwise)
# precision: n | u | ms | s | m | h
# consistency: one | quorum | all | any

{}"#,
        config.to_yaml()?
    );

    std::fs::write(&output, content)?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    match ReporterConfig::from_file(&config_path) {
        Ok(config) => {
            println!("Configuration valid!");
            println!();
            println!("Endpoint: {}://{}:{}", config.protocol, config.host, config.port());
            if config.protocol != Protocol::Udp {
                println!("Database: {}", config.database.as_deref().unwrap_or("-"));
            }
            println!("Precision: {}", config.precision());
            println!("Batch size: {}", config.batch_size);
            if let Some(interval) = config.schedule_interval() {
                println!("Schedule: every {:?}", interval);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_pipe(config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = ReporterConfig::from_file(&config_path)?;
    let client = Client::from_config(&config)?;

    let mut lines = Vec::new();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = stdin.next_line().await? {
        let line = line.trim_end();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }

    let total = lines.len();
    let outcomes = client
        .write_batches(create_batches(lines, config.batch_size))
        .await;
    let failures = outcomes.iter().filter(|o| o.is_err()).count();
    for error in outcomes.iter().filter_map(|o| o.as_ref().err()) {
        eprintln!("Delivery failed: {}", error);
    }

    println!(
        "Sent {} line(s) in {} delivery unit(s), {} failed",
        total,
        outcomes.len(),
        failures
    );
    if failures > 0 {
        std::process::exit(1);
    }
    Ok(())
}

async fn cmd_send_summary(
    config_path: PathBuf,
    summary_path: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ReporterConfig::from_file(&config_path)?;
    config.schedule_interval_ms = None;

    let snapshots = parse_summary(&std::fs::read_to_string(&summary_path)?)?;

    let failures = Arc::new(AtomicUsize::new(0));
    let failed = Arc::clone(&failures);
    let reporter = Reporter::builder(config)
        .on_transport_error(move |e| {
            eprintln!("Delivery failed: {}", e);
            failed.fetch_add(1, Ordering::SeqCst);
        })
        .build()?;

    for (key, snapshot) in snapshots {
        reporter.add_metric(key, Arc::new(FnMetric::new(move || snapshot.clone())));
    }

    let report = reporter.report(FlushMode::Immediate);
    println!(
        "Reported {} metric(s) as {} point(s)",
        reporter.metric_keys().len(),
        report.points
    );
    report.wait().await;

    if failures.load(Ordering::SeqCst) > 0 {
        std::process::exit(1);
    }
    Ok(())
}
