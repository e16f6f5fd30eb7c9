use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use mpprofile::config::DEFAULT_OUTPUT;
use mpprofile::utils::TagStats;
use mpprofile::{CrawlConfig, EmitMode, MpRecord, WebScraper};

#[derive(Parser)]
#[command(name = "mpprofile")]
#[command(
    about = "Crawls theyworkforyou.com and members.parliament.uk MP profiles and tags them from their speeches",
    long_about = None
)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        short = 'o',
        long = "output",
        value_name = "PATH",
        default_value = DEFAULT_OUTPUT,
        help = "JSON file to write records to (overwritten)"
    )]
    output: PathBuf,

    #[arg(
        long,
        value_enum,
        default_value = "final",
        help = "Write one record per MP, or a snapshot after every event page"
    )]
    emit: Emit,

    #[arg(
        long,
        default_value_t = 8,
        help = "Maximum number of pages processed at once",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    concurrency: u16,

    #[arg(
        long,
        help = "Stop scheduling MP profiles after this many",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_profiles: Option<u32>,

    #[arg(long, help = "User-Agent header sent with every request")]
    user_agent: Option<String>,

    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30,
        help = "Per-request timeout in seconds",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    timeout: u64,

    #[arg(long, help = "Print the JSON schema of an output record and exit")]
    schema: bool,
}

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
enum Emit {
    Final,
    PerEvent,
}

impl From<Emit> for EmitMode {
    fn from(emit: Emit) -> Self {
        match emit {
            Emit::Final => EmitMode::Final,
            Emit::PerEvent => EmitMode::PerEvent,
        }
    }
}

impl Cli {
    fn crawl_config(&self) -> CrawlConfig {
        let defaults = CrawlConfig::default();
        CrawlConfig {
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent.clone()),
            concurrency: self.concurrency as usize,
            timeout: Duration::from_secs(self.timeout),
            emit: self.emit.clone().into(),
            max_profiles: self.max_profiles.map(|m| m as usize),
            ..defaults
        }
    }
}

fn serialize_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            log::error!("Error serializing to JSON: {}", e);
            process::exit(1);
        }
    }
}

fn write_records(path: &Path, records: &[MpRecord]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    writer.flush()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    if cli.schema {
        serialize_json(&schemars::schema_for!(Vec<MpRecord>));
        return;
    }

    let scraper = WebScraper::new(cli.crawl_config()).unwrap_or_else(|e| {
        log::error!("Error creating scraper: {}", e);
        process::exit(1);
    });

    let seeds = scraper
        .config()
        .seeds
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    log::info!("Crawling MP profiles from {}...", seeds);

    let outcome = scraper.crawl().await.unwrap_or_else(|e| {
        log::error!("Error crawling: {}", e);
        process::exit(1);
    });

    write_records(&cli.output, &outcome.records).unwrap_or_else(|e| {
        log::error!("Error writing {}: {}", cli.output.display(), e);
        process::exit(1);
    });

    log::info!(
        "Wrote {} record(s) to {}",
        outcome.records.len(),
        cli.output.display()
    );

    print!("{}", outcome.stats);
    print!("{}", TagStats::from_records(&outcome.records));
}
