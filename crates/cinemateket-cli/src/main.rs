use std::process;

use chrono::NaiveDate;
use cinemateket::utils::ProgrammeStats;
use cinemateket::{BASE_URL, DateRange, FetcherConfig, ProgramFetcher};
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "cinemateket")]
#[command(about = "Print the Cinemateket film programme for a date range", long_about = None)]
struct Cli {
    #[arg(
        short = 'l',
        long = "log-level",
        value_enum,
        default_value = "info",
        global = true,
        help = "Set the logging level"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        default_value = BASE_URL,
        global = true,
        help = "Base URL of the site to scrape"
    )]
    base_url: String,

    #[command(subcommand)]
    command: Commands,
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
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every screening in the date range, ordered by day and time
    Program {
        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            help = "First day of the programme",
            value_parser = parse_date,
        )]
        from: NaiveDate,

        #[arg(
            long,
            value_name = "YYYY-MM-DD",
            help = "Last day of the programme (defaults to --from)",
            value_parser = parse_date,
        )]
        to: Option<NaiveDate>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,

        #[arg(long, help = "Group the text output by film series")]
        by_series: bool,
    },
    /// List the films that have screenings in the date range
    Films {
        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        from: NaiveDate,

        #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_date)]
        to: Option<NaiveDate>,

        #[arg(
            short = 'o',
            long = "output",
            value_enum,
            default_value = "text",
            help = "Output format"
        )]
        format: OutputFormat,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| e.to_string())
}

fn date_range(from: NaiveDate, to: Option<NaiveDate>) -> DateRange {
    let Some(to) = to else {
        return DateRange::single(from);
    };
    DateRange::new(from, to).unwrap_or_else(|e| {
        log::error!("Invalid args: {e}");
        process::exit(1);
    })
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

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.clone().into())
        .init();

    let fetcher = ProgramFetcher::with_config(FetcherConfig {
        base_url: cli.base_url.clone(),
        ..Default::default()
    })
    .unwrap_or_else(|e| {
        log::error!("Error creating fetcher: {}", e);
        process::exit(1);
    });

    match cli.command {
        Commands::Program {
            from,
            to,
            format,
            by_series,
        } => {
            let range = date_range(from, to);
            log::info!(
                "Fetching programme {} – {} ({} day(s)) from {}...",
                range.start(),
                range.end(),
                range.days(),
                cli.base_url
            );

            let programme = fetcher.fetch_programme(range).await.unwrap_or_else(|e| {
                log::error!("Error fetching programme: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&programme),
                OutputFormat::Text if programme.screenings.is_empty() => {
                    println!("No screenings between {} and {}.", range.start(), range.end());
                }
                OutputFormat::Text => {
                    if by_series {
                        for series in &programme.series {
                            println!("{}", series);
                        }
                    } else {
                        print!("{}", programme);
                    }
                    print!("{}", ProgrammeStats::from_screenings(&programme.screenings));
                }
            }
        }

        Commands::Films { from, to, format } => {
            let range = date_range(from, to);

            let films = fetcher.fetch_films(range).await.unwrap_or_else(|e| {
                log::error!("Error fetching films: {}", e);
                process::exit(1);
            });

            match format {
                OutputFormat::Json => serialize_json(&films),
                OutputFormat::Text => {
                    if films.is_empty() {
                        println!("No films to display.");
                    }
                    for (i, film) in films.iter().enumerate() {
                        println!("{:>3}. {}", i + 1, film);
                    }
                }
            }
        }
    }
}
