//! oxterm debug harness.
//!
//! Replays a captured PTY byte stream (file or stdin) through the
//! terminal core and dumps the resulting grid, title, and responses.
//! Useful for diffing escape handling against other terminals and for
//! reproducing parser bugs outside a windowing stack.

use anyhow::{Context, Result};
use clap::Parser;
use core_config::Config;
use core_term::Terminal;
use std::cell::RefCell;
use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "oxterm", version, about = "oxterm core replay harness")]
struct Args {
    /// Byte stream to replay (stdin when omitted).
    pub path: Option<PathBuf>,
    /// Grid width.
    #[arg(long, default_value_t = 80)]
    pub cols: usize,
    /// Grid height.
    #[arg(long, default_value_t = 24)]
    pub rows: usize,
    /// Configuration file (`oxterm.toml` discovery is the embedder's
    /// job; the harness takes an explicit path).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Feed the stream one byte at a time to exercise resumability.
    #[arg(long)]
    pub byte_at_a_time: bool,
    /// Write logs to a file instead of stderr (the grid dump stays on
    /// stdout either way).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// Install the tracing subscriber. With `--log-file` the writer is a
/// non-blocking file appender; the returned guard must stay alive
/// until exit so buffered lines are flushed.
fn configure_logging(log_file: Option<&PathBuf>) -> Option<WorkerGuard> {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
            let name = path.file_name().map_or_else(
                || std::ffi::OsString::from("oxterm.log"),
                std::ffi::OsStr::to_os_string,
            );
            let file_appender = tracing_appender::rolling::never(
                dir.unwrap_or_else(|| std::path::Path::new(".")),
                name,
            );
            let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
            builder.with_writer(nb_writer).init();
            Some(guard)
        }
        None => {
            builder.with_writer(std::io::stderr).init();
            None
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging(args.log_file.as_ref());
    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => Config::default(),
    };

    let bytes = match &args.path {
        Some(path) => {
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?
        }
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf).context("reading stdin")?;
            buf
        }
    };

    let mut term = Terminal::with_config(args.cols, args.rows, &config)?;
    term.load_default_modules(&config);

    let responses = Rc::new(RefCell::new(Vec::new()));
    let sink = responses.clone();
    term.connect_response(move |b| sink.borrow_mut().extend_from_slice(b));
    let bell_count = Rc::new(RefCell::new(0u32));
    let bells = bell_count.clone();
    term.connect_bell(move || *bells.borrow_mut() += 1);

    info!(len = bytes.len(), cols = args.cols, rows = args.rows, "replaying stream");
    if args.byte_at_a_time {
        for byte in &bytes {
            term.write(std::slice::from_ref(byte));
        }
    } else {
        term.write(&bytes);
    }

    let (cols, _) = term.get_size();
    println!("┌{}┐", "─".repeat(cols));
    for row in term.screen_text() {
        println!("│{row}│");
    }
    println!("└{}┘", "─".repeat(cols));

    if !term.get_title().is_empty() {
        println!("title: {}", term.get_title());
    }
    let scrollback_count = term.scrollback_count();
    let cursor = term.get_cursor();
    println!(
        "cursor: ({}, {}){}  altscreen: {}  scrollback: {}",
        cursor.x,
        cursor.y,
        if cursor.wrap_pending() { " +wrap" } else { "" },
        term.is_altscreen(),
        scrollback_count,
    );
    let responses = responses.borrow();
    if !responses.is_empty() {
        println!("responses: {:?}", String::from_utf8_lossy(&responses));
    }
    let bells = *bell_count.borrow();
    if bells > 0 {
        println!("bells: {bells}");
    }
    Ok(())
}
