pub mod palette;

use std::io;

use crossterm::{
    cursor::Show,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use itertools::Itertools;
use ratatui::{
    backend::Backend,
    buffer::{Buffer, Cell},
    layout::{Position, Rect},
    style::{Color, Style},
    Terminal,
};
use unicode_width::UnicodeWidthStr;

use crate::config::{Config, WpmSettings};
use crate::error::WpmError;
use crate::gauss::{confidence_interval, prediction_interval};
use crate::histogram::histogram;
use crate::layout::{word_wrap, QuoteLayout};
use crate::quotes::Quote;
use crate::stats::RaceResults;
use crate::util::wpm_to_cpm;

pub use palette::{ColorMode, Palette};

pub const MIN_ROWS: u16 = 12;
pub const MIN_COLS: u16 = 20;

/// First screen row of the quote. Row 0 is the header.
const QUOTE_ROW: usize = 2;

pub const HELP: &str = "Start typing, hit SPACE/ARROWS to browse or ESC to quit.";

/// Raw mode and the alternate screen, restored when dropped.
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn acquire() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(err) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
    }
}

/// Joins header fields with single spaces, dropping fields from the end
/// until the result fits in `width` columns, then pads it to exactly `width`.
pub fn fit_header(fields: &[String], width: usize) -> String {
    let mut text = String::new();
    for count in (1..=fields.len()).rev() {
        text = fields[..count].iter().join(" ");
        if text.width() <= width {
            break;
        }
    }

    let mut fitted: String = text
        .chars()
        .scan(0, |used, c| {
            *used += unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            (*used <= width).then_some(c)
        })
        .collect();
    let pad = width.saturating_sub(fitted.width());
    fitted.extend(std::iter::repeat(' ').take(pad));
    fitted
}

/// Statistics for the quote on screen, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteSummary {
    pub wpm_line: String,
    pub acc_line: String,
    pub histogram: Option<HistogramLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramLine {
    pub min: f64,
    pub max: f64,
    pub plot: String,
}

/// Formats min/avg/max, standard deviation and the confidence and
/// prediction intervals of earlier results. Needs at least two results.
pub fn quote_summary(
    results: &RaceResults,
    confidence_level: f64,
    cpm: bool,
    histogram_slots: Option<usize>,
) -> Option<QuoteSummary> {
    if results.len() < 2 {
        return None;
    }
    let extremals = results.extremals()?;

    let alpha = 1.0 - confidence_level;
    let samples = results.len();
    let percent = (100.0 * confidence_level).round() as u32;

    let (wpm_avg, acc_avg) = results.averages();
    let (wpm_sd, acc_sd) = results.stddevs();
    let (wpm_ci0, wpm_ci1) = confidence_interval(wpm_avg, wpm_sd, samples, alpha);
    let (wpm_pi0, wpm_pi1) = prediction_interval(wpm_avg, wpm_sd, alpha);
    let (acc_ci0, acc_ci1) = confidence_interval(acc_avg, acc_sd, samples, alpha);
    let (acc_pi0, acc_pi1) = prediction_interval(acc_avg, acc_sd, alpha);

    let unit = if cpm { "cpm" } else { "wpm" };
    let speed = |wpm: f64| if cpm { wpm_to_cpm(wpm) } else { wpm };

    let wpm_line = format!(
        "{unit} {:5.1} min {:5.1} avg {:5.1} max {:5.1} sd {percent:2}% ci [{:5.1}-{:5.1}] [{:5.1}-{:5.1}] pi (n={samples})",
        speed(extremals.wpm_min),
        speed(wpm_avg),
        speed(extremals.wpm_max),
        speed(wpm_sd),
        speed(wpm_ci0),
        speed(wpm_ci1),
        speed(wpm_pi0),
        speed(wpm_pi1),
    );
    let acc_line = format!(
        "acc {:5.1} min {:5.1} avg {:5.1} max {:5.1} sd {percent:2}% ci [{:5.1} {:5.1}] [{:5.1} {:5.1}] pi (n={samples})",
        100.0 * extremals.acc_min,
        100.0 * acc_avg,
        100.0 * extremals.acc_max,
        100.0 * acc_sd,
        100.0 * acc_ci0,
        100.0 * acc_ci1,
        100.0 * acc_pi0,
        100.0 * acc_pi1,
    );

    let histogram = histogram_slots.map(|slots| HistogramLine {
        min: extremals.wpm_min,
        max: extremals.wpm_max,
        plot: histogram(&results.wpms(), slots).plot(),
    });

    Some(QuoteSummary {
        wpm_line,
        acc_line,
        histogram,
    })
}

/// Everything the screen needs to know about the quote it shows.
#[derive(Debug, Clone, Default)]
struct QuoteView {
    chars: Vec<char>,
    author: String,
    title: String,
    columns: usize,
    layout: QuoteLayout,
}

/// Draws the race onto a terminal.
///
/// All drawing goes to an off-screen canvas that persists between frames,
/// so a keystroke only has to touch the cells it changes. [`Screen::refresh`]
/// pushes the canvas to the terminal, which in turn only writes the cells
/// that differ from the previous frame. Drawing outside the canvas is
/// silently clipped.
pub struct Screen<B: Backend> {
    terminal: Terminal<B>,
    canvas: Buffer,
    palette: Palette,
    settings: WpmSettings,
    cursor: Position,
    quote: QuoteView,
    /// Row below the credit line where the prompt and help go.
    cheight: usize,
    /// Whether the browse and score screens need to be drawn again.
    redraw: bool,
}

impl<B: Backend> Screen<B> {
    pub fn new(terminal: Terminal<B>, palette: Palette, config: &Config) -> Result<Self, WpmError> {
        let size = terminal.size()?;
        if size.height < MIN_ROWS {
            return Err(WpmError::DisplayTooSmall {
                dimension: "lines",
                required: MIN_ROWS,
                actual: size.height,
            });
        }
        if size.width < MIN_COLS {
            return Err(WpmError::DisplayTooSmall {
                dimension: "columns",
                required: MIN_COLS,
                actual: size.width,
            });
        }

        let mut screen = Self {
            terminal,
            canvas: Buffer::empty(Rect::new(0, 0, size.width, size.height)),
            palette,
            settings: config.wpm,
            cursor: Position::ORIGIN,
            quote: QuoteView::default(),
            cheight: 0,
            redraw: true,
        };
        screen.clear();
        Ok(screen)
    }

    pub fn rows(&self) -> usize {
        self.canvas.area.height as usize
    }

    pub fn columns(&self) -> usize {
        self.canvas.area.width as usize
    }

    pub fn cursor(&self) -> (u16, u16) {
        (self.cursor.x, self.cursor.y)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn needs_redraw(&self) -> bool {
        self.redraw
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    pub fn backend_mut(&mut self) -> &mut B {
        self.terminal.backend_mut()
    }

    /// Number of histogram buckets that fit the current width.
    pub fn histogram_slots(&self) -> usize {
        self.columns() / 4
    }

    /// Text of row `y` on the canvas, for inspection.
    pub fn row_text(&self, y: u16) -> String {
        (0..self.canvas.area.width)
            .filter_map(|x| self.canvas.cell((x, y)))
            .map(Cell::symbol)
            .collect()
    }

    /// Style of the canvas cell at `(x, y)`.
    pub fn style_at(&self, x: u16, y: u16) -> Option<Style> {
        self.canvas.cell((x, y)).map(|cell| {
            Style::new()
                .fg(cell.fg)
                .bg(cell.bg)
                .add_modifier(cell.modifier)
        })
    }

    fn cell(&mut self, x: usize, y: usize) -> Option<&mut Cell> {
        let x = u16::try_from(x).ok()?;
        let y = u16::try_from(y).ok()?;
        self.canvas.cell_mut((x, y))
    }

    /// Writes `text` at `(x, y)`, clipped at the right edge.
    pub fn addstr(&mut self, x: usize, y: usize, text: &str, style: Style) {
        self.put_chars(x, y, text.chars(), style);
    }

    fn put_chars(&mut self, x: usize, y: usize, chars: impl Iterator<Item = char>, style: Style) {
        for (col, c) in (x..self.columns()).zip(chars) {
            if let Some(cell) = self.cell(col, y) {
                cell.set_char(if c.is_control() { ' ' } else { c });
                restyle(cell, style);
            }
        }
    }

    /// Changes the style of `len` cells starting at `(x, y)`.
    pub fn chgat(&mut self, x: usize, y: usize, len: usize, style: Style) {
        for col in x..x.saturating_add(len).min(self.columns()) {
            if let Some(cell) = self.cell(col, y) {
                restyle(cell, style);
            }
        }
    }

    /// Blanks row `y` from column `x` to the right edge.
    pub fn clear_row(&mut self, x: usize, y: usize) {
        let background = self.palette.background;
        for col in x..self.columns() {
            if let Some(cell) = self.cell(col, y) {
                cell.set_char(' ');
                restyle(cell, background);
            }
        }
    }

    pub fn set_cursor(&mut self, x: usize, y: usize) {
        if x < self.columns() && y < self.rows() {
            self.cursor = Position::new(x as u16, y as u16);
        }
    }

    /// Blanks the whole canvas and marks the screen for a full redraw.
    pub fn clear(&mut self) {
        let background = self.palette.background;
        for cell in self.canvas.content.iter_mut() {
            cell.set_char(' ');
            restyle(cell, background);
        }
        self.redraw = true;
    }

    /// Pushes the canvas to the terminal.
    pub fn refresh(&mut self) -> io::Result<()> {
        let canvas = &self.canvas;
        let cursor = self.cursor;
        self.terminal.draw(|frame| {
            let area = frame.area().intersection(canvas.area);
            let buf = frame.buffer_mut();
            for y in area.top()..area.bottom() {
                for x in area.left()..area.right() {
                    if let (Some(dst), Some(src)) = (buf.cell_mut((x, y)), canvas.cell((x, y))) {
                        *dst = src.clone();
                    }
                }
            }
            frame.set_cursor_position(cursor);
        })?;
        Ok(())
    }

    /// Adopts the terminal's new size, relaying out the quote.
    pub fn resize(&mut self) -> io::Result<()> {
        let size = self.terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        self.terminal.resize(area)?;
        self.terminal.clear()?;
        self.canvas = Buffer::empty(area);
        self.cursor = Position::ORIGIN;
        self.relayout();
        self.clear();
        Ok(())
    }

    /// Lays out a new quote for the current width.
    pub fn set_quote(&mut self, quote: &Quote) {
        self.quote = QuoteView {
            chars: quote.text.chars().collect(),
            author: quote.author.clone(),
            title: quote.title.clone(),
            ..QuoteView::default()
        };
        self.relayout();
    }

    fn relayout(&mut self) {
        let columns = self.settings.quote_width(self.columns());
        let text: String = self.quote.chars.iter().collect();
        self.quote.columns = columns;
        self.quote.layout = QuoteLayout::new(&text, columns.saturating_sub(1));
        self.cheight = 0;
    }

    pub fn layout(&self) -> &QuoteLayout {
        &self.quote.layout
    }

    fn quote_cell(&self, offset: usize) -> (usize, usize) {
        let (x, y) = self.quote.layout.coords(offset);
        (x, QUOTE_ROW + y)
    }

    pub fn update_header(&mut self, text: &str) {
        let status = self.palette.status;
        let line = fit_header(&[text.to_string()], self.columns());
        self.addstr(0, 0, &line, status);
        self.chgat(0, 0, self.columns(), status);
    }

    pub fn update_quote(&mut self, style: Style) {
        let lines: Vec<_> = self.quote.layout.lines().collect();
        for (row, range) in lines.into_iter().enumerate() {
            let chars: Vec<char> = self.quote.chars[range].to_vec();
            self.put_chars(0, QUOTE_ROW + row, chars.into_iter(), style);
        }
    }

    /// Draws the credit line right-aligned under the quote.
    pub fn update_author(&mut self) {
        self.cheight = 4 + self.quote.layout.height();
        if self.quote.author.is_empty() && self.quote.title.is_empty() {
            return;
        }
        let credit = format!("- {}, {}", self.quote.author, self.quote.title);
        let right = self.quote.columns.saturating_sub(10);
        let width = self.quote.columns / 2;
        self.cheight += self.right_column(self.cheight - 1, right, width, &credit);
    }

    fn right_column(&mut self, y: usize, right: usize, width: usize, text: &str) -> usize {
        let author = self.palette.author;
        let chars: Vec<char> = text.chars().collect();
        let lengths = word_wrap(text, width);

        let mut start = 0;
        for (row, &length) in lengths.iter().enumerate() {
            if let Some(x) = right.checked_sub(length) {
                let line = chars[start..start + length].iter().copied();
                self.put_chars(x, y + row, line, author);
            }
            start += length + 1;
        }
        lengths.len()
    }

    pub fn update_prompt(&mut self, prompt: &str, style: Style) {
        self.clear_row(0, self.cheight);
        self.addstr(0, self.cheight, prompt, style);
    }

    pub fn show_help(&mut self) {
        self.cheight += 1;
        let prompt = self.palette.prompt;
        self.clear_row(0, self.cheight);
        self.addstr(0, self.cheight, HELP, prompt);
    }

    pub fn show_stats(&mut self, summary: Option<&QuoteSummary>) {
        let Some(summary) = summary else {
            return;
        };
        let correct = self.palette.correct;

        self.cheight += 2;
        self.addstr(0, self.cheight, &summary.wpm_line, correct);
        self.cheight += 1;
        self.addstr(0, self.cheight, &summary.acc_line, correct);
        self.cheight += 1;

        if let Some(histogram) = &summary.histogram {
            self.show_histogram(histogram);
        }
    }

    fn show_histogram(&mut self, histogram: &HistogramLine) {
        let prompt = self.palette.prompt;
        let len = histogram.plot.chars().count();
        let x = (self.columns().saturating_sub(len) / 2).saturating_sub(1);

        self.cheight += 2;
        if let Some(left) = x.checked_sub(6) {
            self.addstr(left, self.cheight, &format!("{:5.1}", histogram.min), prompt);
        }
        self.addstr(x + len + 1, self.cheight, &format!("{:5.1}", histogram.max), prompt);
        self.addstr(x, self.cheight, &histogram.plot, prompt);
    }

    /// The idle screen between races.
    pub fn show_browser(&mut self, head: &str, summary: Option<&QuoteSummary>) {
        if !self.redraw {
            return;
        }
        self.update_header(head);
        self.update_quote(self.palette.quote);
        self.update_author();
        self.show_help();
        self.show_stats(summary);
        self.set_cursor(0, QUOTE_ROW);
        self.redraw = false;
    }

    /// The recap after a race, with the score figure highlighted.
    pub fn show_score(
        &mut self,
        head: &str,
        score: &str,
        figure: &str,
        summary: Option<&QuoteSummary>,
    ) {
        if !self.redraw {
            return;
        }
        self.update_header(head);
        self.update_quote(self.palette.correct);
        self.update_author();

        self.update_prompt(score, self.palette.prompt);
        if let Some(x) = score.find(figure) {
            if score.chars().count() < self.columns() {
                let x = score[..x].chars().count();
                self.chgat(x, self.cheight, figure.chars().count(), self.palette.score);
            }
        }

        self.show_help();
        self.show_stats(summary);
        self.set_cursor(0, QUOTE_ROW);
        self.redraw = false;
    }

    /// Recolors the quote between offset `from` and the cursor. Characters
    /// before `position` are correct, the next `incorrect` are wrong, and the
    /// character under the cursor goes back to the plain quote style.
    pub fn highlight_progress(&mut self, from: usize, position: usize, incorrect: usize) {
        let end = (position + incorrect).min(self.quote.chars.len());
        for offset in from..end {
            let style = if offset < position {
                self.palette.correct
            } else {
                self.palette.incorrect
            };
            let (x, y) = self.quote_cell(offset);
            self.chgat(x, y, 1, style);
        }

        if end < self.quote.chars.len() {
            // Separators stripped at a line break are not drawn with the quote.
            let style = if self.quote.layout.is_line_break(end) {
                self.palette.background
            } else {
                self.palette.quote
            };
            let (x, y) = self.quote_cell(end);
            self.chgat(x, y, 1, style);
        }
    }

    /// Incremental update while typing.
    pub fn show_keystroke(
        &mut self,
        head: &str,
        from: usize,
        position: usize,
        incorrect: usize,
        typed: &str,
        rejected: bool,
    ) {
        self.update_header(head);
        self.highlight_progress(from, position, incorrect);

        let style = if rejected {
            self.palette.incorrect
        } else {
            self.palette.prompt
        };
        self.update_prompt(&format!("> {typed}"), style);

        let (x, y) = self.quote_cell(position + incorrect);
        self.set_cursor(x.min(self.quote.columns.saturating_sub(1)), y);
    }

    /// Redraws a race in progress from scratch, after a resize.
    pub fn rerender_race(&mut self, head: &str, position: usize, incorrect: usize, typed: &str) {
        self.clear();
        self.update_header(head);
        self.update_quote(self.palette.quote);
        self.update_author();
        self.show_keystroke(head, 0, position, incorrect, typed, false);
    }
}

/// Replaces a cell's style outright instead of layering on top of it.
fn restyle(cell: &mut Cell, style: Style) {
    cell.fg = style.fg.unwrap_or(Color::Reset);
    cell.bg = style.bg.unwrap_or(Color::Reset);
    cell.modifier = style.add_modifier;
}
