use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use eia_trends::api::routes;
use eia_trends::{Client, Completion, FetchOptions, Metric};
use eia_trends::{normalize, stats, storage, viz};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "eia-trends",
    version,
    about = "Fetch, store, visualize & summarize EIA energy statistics"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch data (and optionally save, plot, and print stats).
    Get(GetArgs),
}

#[derive(ValueEnum, Clone, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    Customers,
    Price,
    Revenue,
    Sales,
}

impl From<MetricArg> for Metric {
    fn from(m: MetricArg) -> Self {
        match m {
            MetricArg::Customers => Metric::Customers,
            MetricArg::Price => Metric::Price,
            MetricArg::Revenue => Metric::Revenue,
            MetricArg::Sales => Metric::Sales,
        }
    }
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Data route, relative to the API base (default: retail sales).
    #[arg(long, default_value = routes::RETAIL_SALES)]
    route: String,
    /// State codes separated by comma or semicolon (e.g., CO,TX or US). Empty = all.
    #[arg(short, long)]
    states: Option<String>,
    /// Sector codes separated by comma or semicolon (e.g., RES,COM). Empty = all sectors.
    #[arg(long)]
    sectors: Option<String>,
    /// First period to include (YYYY-MM).
    #[arg(long)]
    start: Option<String>,
    /// Last period to include (YYYY-MM).
    #[arg(long)]
    end: Option<String>,
    /// Records per page request.
    #[arg(long, default_value_t = 5000)]
    page_size: u64,
    /// Attempts per page before giving up.
    #[arg(long, default_value_t = 3)]
    max_retries: u32,
    /// Retry backoff base in milliseconds (attempt n waits n times this).
    #[arg(long, default_value_t = 1000)]
    retry_backoff_ms: u64,
    /// Courtesy delay between page requests in milliseconds.
    #[arg(long, default_value_t = 1000)]
    page_delay_ms: u64,
    /// Metric used for --plot and --stats.
    #[arg(long, value_enum, default_value = "customers")]
    metric: MetricArg,
    /// Save results to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Additionally write one CSV per sector next to --out.
    #[arg(long, default_value_t = false)]
    split_sectors: bool,
    /// Create a chart at the given path (.svg or .png).
    #[arg(long)]
    plot: Option<PathBuf>,
    /// Width of the plot (default 1000).
    #[arg(long, default_value_t = 1000)]
    width: u32,
    /// Height of the plot (default 600).
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Print grouped statistics to stdout.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_ascii_uppercase())
        .filter(|x| !x.is_empty())
        .collect()
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Get(args) => cmd_get(args),
    }
}

fn cmd_get(args: GetArgs) -> Result<()> {
    let client = Client::from_env()?;

    let mut opts = FetchOptions::retail_sales();
    if let Some(states) = args.states.as_deref() {
        opts = opts.with_states(parse_list(states));
    }
    if let Some(sectors) = args.sectors.as_deref() {
        opts = opts.with_sectors(parse_list(sectors));
    }
    opts.start = args.start.clone();
    opts.end = args.end.clone();
    opts.page_size = args.page_size;
    opts.max_retries = args.max_retries;
    opts.retry_backoff = Duration::from_millis(args.retry_backoff_ms);
    opts.page_delay = Duration::from_millis(args.page_delay_ms);

    let report = client.fetch_all(&args.route, &opts)?;
    if let Completion::Incomplete {
        next_offset,
        attempts,
        error,
    } = &report.completion
    {
        eprintln!(
            "warning: fetch incomplete; page at offset {} failed after {} attempts ({}); keeping {} rows",
            next_offset,
            attempts,
            error,
            report.rows.len()
        );
    }

    let table = normalize::observations(&report.rows);
    let metric: Metric = args.metric.into();

    if let Some(path) = args.out.as_ref() {
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(&table, path)?,
            "json" => storage::save_json(&table, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!("Saved {} rows to {}", table.len(), path.display());

        if args.split_sectors {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("energy_data");
            let written = storage::save_sector_csvs(&table, dir, stem)?;
            eprintln!("Wrote {} per-sector files", written.len());
        }
    }

    if let Some(plot_path) = args.plot.as_ref() {
        viz::plot_lines(&table, metric, plot_path, args.width, args.height)?;
        eprintln!("Wrote plot to {}", plot_path.display());
    }

    if args.stats {
        let summaries = stats::grouped_summary(&table, metric);
        for s in summaries {
            println!(
                "{} • {}  count={} missing={}  min={} max={} mean={} median={}",
                s.key.state_id,
                s.key.sector_id,
                s.count,
                s.missing,
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean),
                fmt_opt(s.median)
            );
        }
    }

    Ok(())
}
