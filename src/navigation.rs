//! Interactive console navigation
//!
//! The session is a small state machine driven by line input:
//!
//! ```text
//! Root ──"inspired"──▶ InspiredList ──index──┐
//!  │                                         ▼
//!  └──────────── search term ─────────▶ Results ─▶ Visualize? ─yes─▶ Menu
//!                                                     │no             │1/2/no
//!                                                     ▼               ▼
//!                                    Root ◀─"back"── AuthorDrillDown ◀┘
//! ```
//!
//! Each nested prompt returns a [`Flow`] so "exit" unwinds every level in one
//! step and "back" lands on the root prompt. The post-search flow lives in
//! [`Navigator::explore`] and is shared by both entry points.

use std::fmt::Display;
use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{debug, warn};

use crate::chart::ChartSink;
use crate::data::{BookRow, RecommendationSeed, ReferenceRow, NO_SUBTITLE};
use crate::search::SearchOrchestrator;

const ROOT_PROMPT: &str =
    "Enter a book search term, 'inspired' for recommendations, or 'exit' to quit: ";
const INSPIRED_PROMPT: &str = "Enter the number of a title to search for it: ";
const VISUALIZE_PROMPT: &str = "Would you like to visualize these results? (yes/no): ";
const MENU_PROMPT: &str = "Choose a chart (1, 2) or 'no' to skip: ";
const DRILL_DOWN_PROMPT: &str =
    "Enter a result number to look up its author, 'back' for a new search, or 'exit' to quit: ";

/// Errors that end the session
///
/// Only console I/O ends a session. Search, store and chart failures are
/// reported at the prompt and the session carries on.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Console I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// Signal returned by every state to its caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the next state of the current sub-flow
    Continue,
    /// Unwind to the root prompt
    Root,
    /// End the session
    Exit,
}

/// Line-oriented prompt and output
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Writes `message` and reads one trimmed line; `None` at end of input
    ///
    /// Bytes that are not UTF-8 are replaced rather than rejected, so they
    /// reach the caller as ordinary unrecognized input.
    pub fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{message}")?;
        self.output.flush()?;

        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&line).trim().to_string()))
    }

    pub fn say(&mut self, line: impl Display) -> io::Result<()> {
        writeln!(self.output, "{line}")
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// Lowercased form used to match commands
fn command(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Parses a 1-based choice into a 0-based index, if within `1..=len`
pub fn parse_index(input: &str, len: usize) -> Option<usize> {
    match input.trim().parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Some(n - 1),
        _ => None,
    }
}

/// Outcome of the recommendation list
enum Pick {
    Term(String),
    Flow(Flow),
}

/// Drives one interactive session
pub struct Navigator<'a, R, W> {
    orchestrator: &'a mut SearchOrchestrator,
    seed: &'a mut RecommendationSeed,
    charts: &'a mut dyn ChartSink,
    console: Console<R, W>,
}

impl<'a, R: BufRead, W: Write> Navigator<'a, R, W> {
    pub fn new(
        orchestrator: &'a mut SearchOrchestrator,
        seed: &'a mut RecommendationSeed,
        charts: &'a mut dyn ChartSink,
        console: Console<R, W>,
    ) -> Self {
        Self {
            orchestrator,
            seed,
            charts,
            console,
        }
    }

    /// Hands back the console, e.g. to inspect what was written
    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    /// Runs root prompts until the user exits or input ends
    pub async fn run(&mut self) -> Result<(), NavigationError> {
        while self.root().await? != Flow::Exit {}
        self.console.say("Goodbye!")?;
        Ok(())
    }

    /// One pass of the root prompt
    async fn root(&mut self) -> Result<Flow, NavigationError> {
        let Some(input) = self.console.prompt(ROOT_PROMPT)? else {
            return Ok(Flow::Exit);
        };

        match command(&input).as_str() {
            "" => Ok(Flow::Root),
            "exit" => Ok(Flow::Exit),
            "inspired" => match self.inspired().await? {
                Pick::Term(term) => self.explore(&term).await,
                Pick::Flow(flow) => Ok(flow),
            },
            _ => self.explore(&input).await,
        }
    }

    /// Shows the recommendation list and waits for a valid choice
    async fn inspired(&mut self) -> Result<Pick, NavigationError> {
        let titles = match self.seed.titles().await {
            Ok(titles) => titles.to_vec(),
            Err(e) => {
                warn!(error = %e, "recommendation list unavailable");
                self.console
                    .say(format!("Could not load recommendations: {e}"))?;
                return Ok(Pick::Flow(Flow::Root));
            }
        };
        if titles.is_empty() {
            self.console.say("No recommendations are available right now.")?;
            return Ok(Pick::Flow(Flow::Root));
        }

        self.console.say("Need some inspiration? Try one of these:")?;
        for (i, title) in titles.iter().enumerate() {
            self.console.say(format!("[{}] {}", i + 1, title))?;
        }

        loop {
            let Some(input) = self.console.prompt(INSPIRED_PROMPT)? else {
                return Ok(Pick::Flow(Flow::Exit));
            };
            if command(&input) == "exit" {
                return Ok(Pick::Flow(Flow::Exit));
            }
            match parse_index(&input, titles.len()) {
                Some(index) => return Ok(Pick::Term(titles[index].clone())),
                None => self.console.say(format!(
                    "Invalid choice. Please enter a number between 1 and {}.",
                    titles.len()
                ))?,
            }
        }
    }

    /// Search, optional visualization, then author drill-down for `term`
    pub async fn explore(&mut self, term: &str) -> Result<Flow, NavigationError> {
        let search = match self.orchestrator.search_books(term).await {
            Ok(search) => search,
            Err(e) => {
                warn!(term, error = %e, "book search failed");
                self.console
                    .say(format!("Search for \"{term}\" failed: {e}"))?;
                return Ok(Flow::Root);
            }
        };
        let results = search.rows;
        if results.is_empty() {
            let message = if search.fetched == 0 {
                format!("No books found for \"{term}\".")
            } else {
                format!(
                    "All {} books found for \"{term}\" are already stored under another search.",
                    search.fetched
                )
            };
            self.console.say(message)?;
            return Ok(Flow::Root);
        }

        self.show_books(term, &results)?;

        if self.visualize_prompt(term)? == Flow::Exit {
            return Ok(Flow::Exit);
        }
        self.drill_down(&results).await
    }

    /// Yes/no question, leading into the chart menu on "yes"
    fn visualize_prompt(&mut self, term: &str) -> Result<Flow, NavigationError> {
        loop {
            let Some(input) = self.console.prompt(VISUALIZE_PROMPT)? else {
                return Ok(Flow::Exit);
            };
            match command(&input).as_str() {
                "yes" => return self.visualize_menu(term),
                "no" => return Ok(Flow::Continue),
                "exit" => return Ok(Flow::Exit),
                _ => self.console.say("Invalid input. Please enter 'yes' or 'no'.")?,
            }
        }
    }

    fn visualize_menu(&mut self, term: &str) -> Result<Flow, NavigationError> {
        self.console.say("1) Bar chart of book categories")?;
        self.console.say("2) Scatter plot of average rating vs. rating count")?;
        self.console.say("no) Skip visualization")?;

        loop {
            let Some(input) = self.console.prompt(MENU_PROMPT)? else {
                return Ok(Flow::Exit);
            };
            match command(&input).as_str() {
                "1" => {
                    self.show_category_chart(term)?;
                    return Ok(Flow::Continue);
                }
                "2" => {
                    self.show_rating_chart(term)?;
                    return Ok(Flow::Continue);
                }
                "no" => return Ok(Flow::Continue),
                "exit" => return Ok(Flow::Exit),
                _ => self.console.say("Invalid input. Please enter 1, 2, or 'no'.")?,
            }
        }
    }

    fn show_category_chart(&mut self, term: &str) -> Result<(), NavigationError> {
        let outcome = match self.orchestrator.category_counts(term) {
            Ok(counts) => self
                .charts
                .bar_chart(&format!("Book categories for \"{term}\""), &counts)
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = outcome {
            warn!(term, error = %e, "category chart failed");
            self.console.say(format!("Could not show chart: {e}"))?;
        }
        Ok(())
    }

    fn show_rating_chart(&mut self, term: &str) -> Result<(), NavigationError> {
        let outcome = match self.orchestrator.rating_info(term) {
            Ok(points) => self
                .charts
                .scatter_plot(&format!("Ratings for \"{term}\""), &points)
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(e) = outcome {
            warn!(term, error = %e, "rating chart failed");
            self.console.say(format!("Could not show chart: {e}"))?;
        }
        Ok(())
    }

    /// Repeated author lookups over one result set
    async fn drill_down(&mut self, results: &[BookRow]) -> Result<Flow, NavigationError> {
        loop {
            let Some(input) = self.console.prompt(DRILL_DOWN_PROMPT)? else {
                return Ok(Flow::Exit);
            };
            match command(&input).as_str() {
                "exit" => return Ok(Flow::Exit),
                "back" => return Ok(Flow::Root),
                _ => {}
            }

            let Some(index) = parse_index(&input, results.len()) else {
                self.console.say(format!(
                    "Invalid input. Please enter a number between 1 and {}, 'back', or 'exit'.",
                    results.len()
                ))?;
                continue;
            };

            let book = &results[index];
            if !book.has_author() {
                self.console
                    .say(format!("\"{}\" has no listed author.", book.title))?;
                continue;
            }

            debug!(author = %book.author, "author drill-down");
            match self.orchestrator.search_author_references(&book.author).await {
                Ok(rows) => self.show_references(&book.author, &rows)?,
                Err(e) => {
                    warn!(author = %book.author, error = %e, "author lookup failed");
                    self.console
                        .say(format!("Lookup for {} failed: {e}", book.author))?;
                }
            }
        }
    }

    fn show_books(&mut self, term: &str, results: &[BookRow]) -> io::Result<()> {
        self.console.say(format!("Books for \"{term}\":"))?;
        for (i, book) in results.iter().enumerate() {
            let heading = if book.subtitle == NO_SUBTITLE {
                book.title.clone()
            } else {
                format!("{}: {}", book.title, book.subtitle)
            };
            self.console.say(format!(
                "[{}] {} by {} ({})",
                i + 1,
                heading,
                book.author,
                book.published_date
            ))?;
        }
        Ok(())
    }

    fn show_references(&mut self, author: &str, rows: &[ReferenceRow]) -> io::Result<()> {
        if rows.is_empty() {
            return self
                .console
                .say(format!("No Wikipedia pages found for {author}."));
        }
        self.console.say(format!("Wikipedia pages for {author}:"))?;
        for (i, row) in rows.iter().enumerate() {
            self.console
                .say(format!("[{}] {}: {}", i + 1, row.title, row.url))?;
        }
        Ok(())
    }
}
