use anyhow::Context;
use clap::{Parser, ValueEnum};
use crawlscope::config::AnalyzerConfig;
use crawlscope::export::{self, FlatRow};
use crawlscope::parser::{self, ParsedSource};
use crawlscope::reports::{self, AllReports};
use crawlscope::verify;
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    Summary,
    Urls,
    UrlDetails,
    Bots,
    StatusCodes,
    Ips,
    CrawlFrequency,
    Raw,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Table,
}

#[derive(Parser, Debug)]
#[command(name = "crawlscope", version, about = "Bot-aware access log reports")]
struct Cli {
    /// Input files (`-` for stdin). May be repeated.
    #[arg(required = false)]
    input: Vec<String>,

    /// Report to print
    #[arg(long, short = 'r', value_enum, default_value_t = Report::Summary)]
    report: Report,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Comma separated columns for table output (defaults depend on the report)
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// JSON config file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Override the verified crawler range endpoint
    #[arg(long, env = "CRAWLSCOPE_RANGES_URL")]
    ranges_url: Option<String>,

    /// Do not fetch crawler ranges; nothing is reported as verified
    #[arg(long, default_value_t = false)]
    no_verify: bool,

    /// Parser threads (defaults to CPU count)
    #[arg(long)]
    threads: Option<usize>,

    /// Log filter used when RUST_LOG is unset (e.g. warn, debug)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn init_parallelism(threads: usize) {
    let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
}

fn load_config(cli: &Cli) -> anyhow::Result<AnalyzerConfig> {
    let mut cfg = match &cli.config {
        Some(p) => AnalyzerConfig::from_json_file(p).with_context(|| format!("loading {}", p.display()))?,
        None => AnalyzerConfig::default(),
    };
    if let Some(url) = &cli.ranges_url {
        cfg.ranges_url = url.clone();
    }
    if cli.no_verify {
        cfg.verify_bots = false;
    }
    if cli.threads.is_some() {
        cfg.threads = cli.threads;
    }
    Ok(cfg)
}

fn read_sources(paths: &[String]) -> anyhow::Result<Vec<Vec<u8>>> {
    let mut out = Vec::with_capacity(paths.len());
    for p in paths {
        if p == "-" {
            let mut buf = Vec::new();
            io::stdin().lock().read_to_end(&mut buf).context("reading stdin")?;
            out.push(buf);
        } else {
            out.push(std::fs::read(p).with_context(|| format!("reading {p}"))?);
        }
    }
    Ok(out)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn emit<R: FlatRow + Serialize>(rows: &[R], format: Format, fields: &[String], defaults: &[&str]) -> anyhow::Result<()> {
    match format {
        Format::Json => print_json(&rows),
        Format::Table => {
            let cols: Vec<String> = if fields.is_empty() {
                defaults.iter().map(|s| s.to_string()).collect()
            } else {
                fields.to_vec()
            };
            print!("{}", export::render_table(&cols, &export::project(rows, &cols)));
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);
    let cfg = load_config(&cli)?;
    init_parallelism(cfg.thread_count());
    if verify::install_global(cfg.range_cache()).is_err() {
        tracing::warn!("verified range cache already initialised; config ignored");
    }

    let inputs = if cli.input.is_empty() { vec!["-".to_string()] } else { cli.input.clone() };
    let sources = read_sources(&inputs)?;
    let ParsedSource { records, errors } = parser::parse_sources(&sources, verify::global());
    eprintln!("files={} records={} errors={}", inputs.len(), records.len(), errors);

    let (format, fields) = (cli.format, cli.fields.as_slice());
    match cli.report {
        Report::Summary => match reports::summary(&records) {
            Some(s) => print_json(&s)?,
            None => println!("{{}}"),
        },
        Report::Urls => emit(&reports::urls_report(&records), format, fields, export::URL_FIELDS)?,
        Report::UrlDetails => {
            let rows = reports::urls_detail_report(&records);
            emit(&rows, format, fields, export::URL_DETAIL_FIELDS)?;
            if format == Format::Table {
                eprintln!("bots: {}", reports::bot_names(&rows).join(", "));
            }
        }
        Report::Bots => emit(&reports::bots_report(&records), format, fields, export::BOT_FIELDS)?,
        Report::StatusCodes => emit(&reports::status_codes_report(&records), format, fields, export::STATUS_FIELDS)?,
        Report::Ips => emit(&reports::ips_report(&records), format, fields, export::IP_FIELDS)?,
        Report::CrawlFrequency => {
            emit(&reports::crawl_frequency_report(&records), format, fields, export::CRAWL_FIELDS)?
        }
        Report::Raw => emit(&records, format, fields, export::RAW_FIELDS)?,
        Report::All => print_json(&AllReports::build(&records))?,
    }
    Ok(())
}
