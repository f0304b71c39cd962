//! bookdrill - Search books and drill into their authors
//!
//! An interactive console application that searches the Google Books catalog,
//! looks up authors on Wikipedia, caches every response on disk, and can chart
//! the categories and ratings of what it found.

use std::io;
use std::panic;
use std::process;

use clap::Parser;
use crossterm::{execute, terminal::disable_raw_mode, terminal::LeaveAlternateScreen};
use tracing::info;

use bookdrill::cache::ResponseCache;
use bookdrill::chart::{ChartSink, TerminalChartViewer, TextChartSink};
use bookdrill::cli::{Cli, StartupConfig};
use bookdrill::data::{
    BooksClient, FileSeedSource, ListicleSeedSource, RecommendationSeed, ReferenceClient,
    SeedSource,
};
use bookdrill::logging;
use bookdrill::navigation::{Console, Navigator};
use bookdrill::search::SearchOrchestrator;
use bookdrill::store::RecordStore;

/// Sets up a panic hook that restores the terminal before printing the panic message.
/// The chart viewer runs in raw mode on the alternate screen.
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match StartupConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
    };

    logging::init(config.verbose)?;
    setup_panic_hook();
    info!(data_dir = %config.data_dir.display(), "starting");

    // Results are per run; caches persist across runs
    let store = RecordStore::open(&config.database_path())?;
    store.initialize_schema()?;

    let books = BooksClient::new(config.timeout)?
        .with_api_key(config.api_key.clone())
        .with_max_results(config.max_results);
    let references = ReferenceClient::new(config.timeout)?;
    let mut orchestrator = SearchOrchestrator::new(
        ResponseCache::load(&config.data_dir, Box::new(books)),
        ResponseCache::load(&config.data_dir, Box::new(references)),
        store,
    );

    let seed_source: Box<dyn SeedSource> = match &config.seed_file {
        Some(path) => Box::new(FileSeedSource::new(path)),
        None => Box::new(ListicleSeedSource::new(config.timeout)?),
    };
    let mut seed = RecommendationSeed::new(seed_source);

    let mut charts: Box<dyn ChartSink> = if config.text_charts {
        Box::new(TextChartSink::new(io::stdout()))
    } else {
        Box::new(TerminalChartViewer::new())
    };

    let console = Console::new(io::stdin().lock(), io::stdout());
    let mut navigator = Navigator::new(&mut orchestrator, &mut seed, charts.as_mut(), console);
    navigator.run().await?;

    Ok(())
}
