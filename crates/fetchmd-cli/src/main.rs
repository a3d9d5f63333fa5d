//! fetchmd CLI - fetch HTML through the SSRF-safe pipeline
//!
//! Picks exactly one input (URL, `--file`, or piped stdin), loads it with
//! the configured budget and writes the HTML to stdout.

use clap::Parser;
use fetchmd::{
    resolve_input, FetchBudget, FetchClient, InputSource, DEFAULT_MAX_BYTES,
    DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT_MS,
};
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "FETCHMD_LOG";

/// fetchmd - fetch web pages safely for markdown conversion
#[derive(Parser, Debug)]
#[command(name = "fetchmd")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:
  fetchmd https://example.com              Fetch a URL
  fetchmd --file page.html                 Read a local HTML file
  curl -s https://example.com | fetchmd    Read HTML from stdin")]
struct Cli {
    /// URL to fetch (https only)
    url: Option<String>,

    /// Read HTML from a local file
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_MS)]
    timeout_ms: u64,

    /// Maximum response size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BYTES)]
    max_bytes: u64,

    /// Maximum number of redirects to follow
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    max_redirects: u32,

    /// Custom User-Agent header
    #[arg(long)]
    user_agent: Option<String>,
}

impl Cli {
    fn budget(&self) -> FetchBudget {
        FetchBudget::default()
            .with_timeout_ms(self.timeout_ms)
            .with_max_bytes(self.max_bytes)
            .with_max_redirects(self.max_redirects)
    }

    /// Resolve the single input source
    fn input(&self, stdin_is_tty: bool) -> Result<InputSource, &'static str> {
        let mut sources = Vec::new();
        if let Some(url) = &self.url {
            sources.push(InputSource::Url(url.clone()));
        }
        if let Some(file) = &self.file {
            sources.push(InputSource::File(file.clone()));
        }
        if sources.is_empty() && !stdin_is_tty {
            sources.push(InputSource::Stdin);
        }

        match sources.len() {
            0 => Err("No input provided. Pass a URL, use --file, or pipe HTML via stdin."),
            1 => Ok(sources.remove(0)),
            _ => Err("Ambiguous input. Provide exactly one of: URL argument, --file, or stdin."),
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let source = match cli.input(io::stdin().is_terminal()) {
        Ok(source) => source,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            std::process::exit(1);
        }
    };

    let budget = cli.budget();
    debug!(input = %source, ?budget, "Starting fetchmd");
    let mut builder = FetchClient::builder().budget(budget);
    if let Some(ua) = cli.user_agent {
        builder = builder.user_agent(ua);
    }
    let client = builder.build();

    match resolve_input(&source, &client, None).await {
        Ok(html) => writeln_safe(&html),
        Err(e) => {
            eprintln!("fetchmd: Error processing {}: {}", source, e);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
