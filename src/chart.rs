//! Chart rendering for search aggregates
//!
//! Two sinks implement [`ChartSink`]: a full-screen ratatui viewer that closes
//! on any key, and a plain-text renderer for terminals where an alternate
//! screen is unwelcome.

use std::io::{self, Write};

use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame, Terminal,
};
use thiserror::Error;

use crate::data::{CategoryCount, RatingPoint};

/// Highest average rating the books API reports
const MAX_RATING: f64 = 5.0;

/// Errors that can occur while showing a chart
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Terminal error: {0}")]
    Io(#[from] io::Error),
}

/// Accepts chart series and shows them to the user
pub trait ChartSink {
    /// Bar chart of book count per category
    fn bar_chart(&mut self, title: &str, counts: &[CategoryCount]) -> Result<(), ChartError>;

    /// Scatter plot of average rating against rating count, labelled by title
    fn scatter_plot(&mut self, title: &str, points: &[RatingPoint]) -> Result<(), ChartError>;
}

/// Full-screen chart viewer on the alternate screen
#[derive(Debug, Default)]
pub struct TerminalChartViewer;

impl TerminalChartViewer {
    pub fn new() -> Self {
        Self
    }

    /// Draws until a key is pressed, then restores the terminal
    fn show(&self, draw: &dyn Fn(&mut Frame)) -> Result<(), ChartError> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;

        let result = run_viewer(draw);

        // Restore even if drawing failed
        let restored = disable_raw_mode().and_then(|_| execute!(io::stdout(), LeaveAlternateScreen));
        result?;
        restored?;
        Ok(())
    }
}

fn run_viewer(draw: &dyn Fn(&mut Frame)) -> Result<(), ChartError> {
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    loop {
        terminal.draw(|frame| draw(frame))?;
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(()),
            // Anything else (resize, mouse) just redraws
            _ => {}
        }
    }
}

impl ChartSink for TerminalChartViewer {
    fn bar_chart(&mut self, title: &str, counts: &[CategoryCount]) -> Result<(), ChartError> {
        self.show(&|frame| render_category_chart(frame, title, counts))
    }

    fn scatter_plot(&mut self, title: &str, points: &[RatingPoint]) -> Result<(), ChartError> {
        self.show(&|frame| render_rating_chart(frame, title, points))
    }
}

/// Renders the category bar chart into the whole frame
pub fn render_category_chart(frame: &mut Frame, title: &str, counts: &[CategoryCount]) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(area);

    let bar_count = counts.len().max(1) as u16;
    let bar_width = (chunks[0].width.saturating_sub(2) / bar_count)
        .saturating_sub(1)
        .clamp(3, 16);

    let bars: Vec<Bar> = counts
        .iter()
        .map(|c| {
            Bar::default()
                .value(c.count)
                .label(Line::from(truncate(&c.category, bar_width as usize)))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .title(format!(" {title} "))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow));

    frame.render_widget(chart, chunks[0]);
    frame.render_widget(close_hint(), chunks[1]);
}

/// Renders the rating scatter plot with a title legend underneath
pub fn render_rating_chart(frame: &mut Frame, title: &str, points: &[RatingPoint]) {
    let area = frame.area();
    let legend_height = (points.len() as u16 + 2).min(area.height / 2);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(legend_height),
            Constraint::Length(1),
        ])
        .split(area);

    let data: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.average_rating, p.rating_count as f64))
        .collect();
    let max_count = points.iter().map(|p| p.rating_count).max().unwrap_or(0).max(1) as f64;

    let dataset = Dataset::default()
        .name("books")
        .marker(Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(Color::Cyan))
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .title(format!(" {title} "))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .x_axis(
            Axis::default()
                .title("Average rating")
                .bounds([0.0, MAX_RATING])
                .labels(vec![Span::raw("0"), Span::raw("2.5"), Span::raw("5")]),
        )
        .y_axis(
            Axis::default()
                .title("Ratings")
                .bounds([0.0, max_count * 1.1])
                .labels(vec![Span::raw("0"), Span::raw(format!("{}", max_count as i64))]),
        );

    let legend: Vec<Line> = points
        .iter()
        .map(|p| {
            Line::from(vec![
                Span::styled(
                    format!("{:>4.1} {:>7}  ", p.average_rating, p.rating_count),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(p.title.clone()),
            ])
        })
        .collect();
    let legend = Paragraph::new(legend).block(
        Block::default()
            .title(" Titles ")
            .borders(Borders::ALL)
            .title_style(Style::default().add_modifier(Modifier::BOLD)),
    );

    frame.render_widget(chart, chunks[0]);
    frame.render_widget(legend, chunks[1]);
    frame.render_widget(close_hint(), chunks[2]);
}

fn close_hint() -> Paragraph<'static> {
    Paragraph::new(Span::styled(
        "Press any key to close",
        Style::default().fg(Color::DarkGray),
    ))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Writes charts as plain text lines
pub struct TextChartSink<W: Write> {
    out: W,
}

impl<W: Write> TextChartSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChartSink for TextChartSink<W> {
    fn bar_chart(&mut self, title: &str, counts: &[CategoryCount]) -> Result<(), ChartError> {
        writeln!(self.out, "{title}")?;
        let width = counts.iter().map(|c| c.category.chars().count()).max().unwrap_or(0);
        for c in counts {
            let bar = "#".repeat(c.count.min(60) as usize);
            writeln!(self.out, "  {:<width$}  {bar} {}", c.category, c.count)?;
        }
        Ok(())
    }

    fn scatter_plot(&mut self, title: &str, points: &[RatingPoint]) -> Result<(), ChartError> {
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "  {:>6} {:>8}  Title", "Rating", "Count")?;
        for p in points {
            writeln!(
                self.out,
                "  {:>6.1} {:>8}  {}",
                p.average_rating, p.rating_count, p.title
            )?;
        }
        Ok(())
    }
}
