//! Trellis CLI.
//!
//! Loads a JSON document into a headless page, initializes its widgets and
//! optionally replays an interaction script against it.
//!
//! # Commands
//!
//! - `trellis run <DOCUMENT> [--script <SCRIPT>] [--wait <MS>]`: replay a
//!   script and print the resulting tree
//! - `trellis check <DOCUMENT>`: report which components were initialized
//!
//! # Environment Variables
//!
//! See the [`config`](trellis_runtime::config) module for available
//! configuration options.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use trellis_runtime::config::Config;
use trellis_runtime::driver;
use trellis_runtime::page::Page;
use trellis_runtime::script;
use trellis_runtime::types::WidgetSignal;

/// Trellis - headless runtime for accessible UI widgets.
#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
ENVIRONMENT VARIABLES:
    TRELLIS_TOAST_DURATION_MS        Default toast lifetime (default: 3000)
    TRELLIS_TOAST_ERROR_DURATION_MS  Error toast lifetime (default: 5000)
    TRELLIS_SIDEBAR_BREAKPOINT       Sidebar breakpoint in px (default: 768)
    TRELLIS_VIEWPORT_WIDTH           Initial viewport width (default: 1024)
    TRELLIS_LOCATION                 Initial location path (default: /)

EXAMPLES:
    # List the widgets a page would get
    trellis check page.json

    # Replay a script and print the final tree
    trellis run page.json --script steps.json --wait 5000
")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a page, replay a script against it and print the tree.
    Run {
        /// JSON document: one element tree or an array of them.
        document: PathBuf,

        /// JSON array of interaction steps.
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Milliseconds to let pass after the script, running timers.
        #[arg(short, long, default_value_t = 0)]
        wait: u64,
    },

    /// Initialize a page and report the components found.
    Check {
        /// JSON document: one element tree or an array of them.
        document: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let config = Config::from_env().context("Failed to load configuration")?;
    debug!(?config, "configuration loaded");

    match cli.command {
        Command::Run {
            document,
            script,
            wait,
        } => {
            // Pages are single-threaded; a current-thread runtime keeps them
            // on this thread.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to create tokio runtime")?;
            runtime.block_on(run_page(config, document, script, wait))
        }
        Command::Check { document } => run_check(config, &document),
    }
}

async fn run_page(
    config: Config,
    document: PathBuf,
    script_path: Option<PathBuf>,
    wait: u64,
) -> Result<()> {
    let markup = script::load_document(&document)
        .with_context(|| format!("Failed to load document {}", document.display()))?;
    let mut page = Page::from_markup(config, &markup)?;
    page.start();

    if let Some(path) = script_path {
        let steps = script::load_script(&path)
            .with_context(|| format!("Failed to load script {}", path.display()))?;
        info!(steps = steps.len(), "replaying script");
        script::play(&mut page, &steps)
            .await
            .context("Script step failed")?;
    }
    if wait > 0 {
        let fired = driver::run_for(&mut page, Duration::from_millis(wait)).await;
        debug!(fired, "timers run while waiting");
    }

    print!("{}", page.doc().outline(page.doc().body()));
    Ok(())
}

fn run_check(config: Config, document: &Path) -> Result<()> {
    let markup = script::load_document(document)
        .with_context(|| format!("Failed to load document {}", document.display()))?;
    let mut page = Page::from_markup(config, &markup)?;

    let found: Rc<RefCell<BTreeMap<String, usize>>> = Rc::default();
    let sink = Rc::clone(&found);
    let _signals = page.bus().signals.subscribe_fn(move |_cx, signal: &WidgetSignal| {
        if let WidgetSignal::Initialized { component, .. } = signal {
            *sink.borrow_mut().entry(component.clone()).or_default() += 1;
        }
    });
    let total = page.start();

    for (component, count) in found.borrow().iter() {
        println!("{component}: {count}");
    }
    println!("{total} component(s) initialized");
    Ok(())
}

/// Initializes the tracing subscriber for logging.
///
/// Logs go to stderr so the printed tree can be piped.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}
