use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use pcapfeed_core::{
    FilterError, IngestConfig, IngestError, IngestReport, SessionError, Terminal, ingest_file,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("PCAPFEED_BUILD_COMMIT"),
    ", built ",
    env!("PCAPFEED_BUILD_DATE"),
    ")"
);

const EXIT_FATAL: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "pcapfeed")]
#[command(version, long_version = LONG_VERSION)]
#[command(
    about = "Offline packet ingestion for pcap/pcapng traces with bounded in-flight packets.",
    long_about = None,
    after_help = "Examples:\n  pcapfeed ingest capture.pcap -o report.json\n  pcapfeed ingest 'traces/*.pcapng' --stdout --pretty\n  pcapfeed ingest capture.pcap --max-pending 200 --stdout"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest one trace file and write a JSON report.
    Ingest(IngestArgs),
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Path (or glob matching exactly one file) to a .pcap or .pcapng trace
    input: PathBuf,

    /// BPF filter expression applied before decoding
    #[arg(long, value_name = "EXPR")]
    filter: Option<String>,

    /// Maximum packets in flight before intake blocks
    #[arg(long, value_name = "N")]
    max_pending: Option<usize>,

    /// Packet buffer capacity in bytes
    #[arg(long, value_name = "BYTES")]
    buffer_size: Option<usize>,

    /// TOML config file; command line flags take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output report path (JSON)
    #[arg(short = 'o', long, required_unless_present = "stdout")]
    report: Option<PathBuf>,

    /// Write JSON report to stdout
    #[arg(long, conflicts_with = "report")]
    stdout: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Suppress non-error output
    #[arg(long, conflicts_with = "verbose")]
    quiet: bool,

    /// Debug-level logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest(args) => {
            init_tracing(args.verbose, args.quiet);
            cmd_ingest(args)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(err.code)
        }
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("warn,pcapfeed=debug,pcapfeed_core=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
    code: u8,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
            code: EXIT_FAILURE,
        }
    }

    fn fatal(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            code: EXIT_FATAL,
            ..Self::new(message, hint)
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

impl From<IngestError> for CliError {
    fn from(err: IngestError) -> Self {
        let message = err.to_string();
        match &err {
            IngestError::Session(SessionError::Open { .. }) => CliError::fatal(
                message,
                Some("check that the file is a readable .pcap or .pcapng trace".to_string()),
            ),
            IngestError::Session(SessionError::Filter {
                source: FilterError::Unsupported,
                ..
            }) => CliError::new(
                message,
                Some("rebuild with `--features bpf` or drop --filter".to_string()),
            ),
            IngestError::Session(SessionError::Filter { .. }) => CliError::new(
                message,
                Some("filters use libpcap syntax, e.g. 'udp port 53'".to_string()),
            ),
            IngestError::Session(SessionError::UnsupportedLinktype(_)) => CliError::new(
                message,
                Some("supported link types: Ethernet, Linux SLL, PPP, raw IP".to_string()),
            ),
            IngestError::Config(_) => CliError::new(
                message,
                Some("check --max-pending, --buffer-size and the config file".to_string()),
            ),
            IngestError::Io(_) | IngestError::ConsumerPanicked => CliError::new(message, None),
        }
    }
}

fn cmd_ingest(args: IngestArgs) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&args.input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;

    let report = if args.stdout {
        None
    } else {
        Some(args.report.clone().ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };
    if let Some(report_path) = report.as_ref() {
        ensure_distinct_output(report_path, &input_abs)?;
    }

    let config = load_config(&args)?;
    debug!(?config, "effective configuration");

    let rep = ingest_file(&resolved_input, &config)?;
    let json = serialize_report(&rep, args.pretty)?;

    match report {
        None => print!("{}", json),
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            if !args.quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if let Terminal::ReadError { message } = &rep.terminal {
        return Err(CliError::new(
            format!("trace read failed after {} packets: {}", rep.receiver.packets, message),
            Some("the report covers the packets read before the fault".to_string()),
        ));
    }
    if !args.quiet {
        eprintln!(
            "Packets {}, bytes {}",
            rep.receiver.packets, rep.receiver.bytes
        );
    }
    Ok(())
}

fn load_config(args: &IngestArgs) -> Result<IngestConfig, CliError> {
    let mut config = match args.config.as_ref() {
        Some(path) => IngestConfig::load(path).map_err(|err| {
            CliError::new(
                err.to_string(),
                Some("see `pcapfeed ingest --help` for the recognised keys".to_string()),
            )
        })?,
        None => IngestConfig::default(),
    };
    if let Some(filter) = args.filter.as_ref() {
        config.bpf_filter = Some(filter.clone());
    }
    if let Some(max_pending) = args.max_pending {
        config.max_pending_packets = max_pending;
    }
    if let Some(buffer_size) = args.buffer_size {
        config.buffer_size = buffer_size;
    }
    config.validate().map_err(IngestError::from)?;
    Ok(config)
}

fn ensure_distinct_output(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    // A directory that does not exist yet cannot hold the input.
    if let Some(parent) = report_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Ok(());
        }
    }
    let report_abs = report_path
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose()
        .with_context(|| format!("Failed to resolve output path: {}", report_path.display()))?;
    if let Some(report_dir) = report_abs {
        let report_target = report_dir.join(
            report_path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid report path"))?,
        );
        if report_target == input_abs {
            return Err(CliError::new(
                format!(
                    "report path must differ from input: {}",
                    report_path.display()
                ),
                Some("choose a different output path".to_string()),
            ));
        }
    }
    Ok(())
}

fn serialize_report(rep: &IngestReport, pretty: bool) -> Result<String, CliError> {
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::fatal(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    if !input.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {}{}",
                pattern,
                matches.len(),
                listed,
                more
            ),
            Some("pass a single trace file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
