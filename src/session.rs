//! The interactive loop: reads keys, drives the race and keeps the screen
//! and the stats file in step with it.

use std::path::PathBuf;
use std::time::Instant;

use log::{debug, info, warn};
use ratatui::backend::Backend;

use crate::config::Config;
use crate::error::{Result, WpmError};
use crate::input::Key;
use crate::quotes::RandomIterator;
use crate::race::{Direction, KeyOutcome, Mode, RaceResult, RaceState};
use crate::runtime::{KeyEventSource, Runner, Step, Ticker};
use crate::stats::{Stats, RECENT_RACES};
use crate::ui::{fit_header, quote_summary, QuoteSummary, Screen};
use crate::util::wpm_to_cpm;

/// Knobs that shape a session but never change during it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub cpm: bool,
    pub confidence_level: f64,
    pub histogram: bool,
    pub tab_spaces: Option<usize>,
    /// Where results are saved. `None` keeps them in memory only.
    pub stats_path: Option<PathBuf>,
}

impl SessionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cpm: false,
            confidence_level: config.wpm.confidence_level,
            histogram: config.wpm.histogram,
            tab_spaces: None,
            stats_path: None,
        }
    }
}

/// Outcome of the last finished race, for the score screen.
#[derive(Debug, Clone, Copy)]
struct Score {
    wpm: f64,
    beat_average: bool,
}

pub struct Session<B: Backend, E: KeyEventSource, T: Ticker> {
    screen: Screen<B>,
    race: RaceState,
    quotes: RandomIterator,
    stats: Stats,
    options: SessionOptions,
    runner: Runner<E, T>,
    /// Average WPM of the last few races under the current tag.
    average: f64,
    score: Option<Score>,
    /// Quote offset up to which the screen shows typing progress.
    drawn: usize,
}

impl<B: Backend, E: KeyEventSource, T: Ticker> Session<B, E, T> {
    pub fn new(
        mut screen: Screen<B>,
        quotes: RandomIterator,
        stats: Stats,
        options: SessionOptions,
        runner: Runner<E, T>,
    ) -> Self {
        let quote = quotes.current().clone();
        screen.set_quote(&quote);
        let race = RaceState::new(quote).with_tab_spaces(options.tab_spaces);
        let average = stats.average(stats.tag(), Some(RECENT_RACES));

        Self {
            screen,
            race,
            quotes,
            stats,
            options,
            runner,
            average,
            score: None,
            drawn: 0,
        }
    }

    pub fn screen(&self) -> &Screen<B> {
        &self.screen
    }

    pub fn race(&self) -> &RaceState {
        &self.race
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn into_stats(self) -> Stats {
        self.stats
    }

    /// Starts with the quote `id`, failing if the database has no such quote.
    pub fn jump_to(&mut self, id: i64) -> Result<()> {
        if self.quotes.quotes().from_id(id).is_none() {
            return Err(WpmError::TextIdNotFound(id));
        }
        self.quotes.put_to_front(&[id]);
        self.load_current();
        Ok(())
    }

    /// Moves every quote matching `term` to the front of the rotation.
    pub fn search(&mut self, term: &str) -> Result<()> {
        let ids = self.quotes.quotes().search(term);
        if ids.is_empty() {
            return Err(WpmError::NoSearchMatch(term.to_string()));
        }
        info!("{} quotes match {term:?}", ids.len());
        self.quotes.put_to_front(&ids);
        self.load_current();
        Ok(())
    }

    /// Runs until the user quits or the input closes. Results are saved after
    /// every race and once more on the way out.
    pub fn run(&mut self) -> Result<()> {
        info!(
            "session started with {} quotes from `{}`, tag `{}`",
            self.quotes.len(),
            self.quotes.database(),
            self.stats.tag()
        );

        loop {
            self.render(Instant::now())?;

            let keep_going = match self.runner.step() {
                Step::Tick => true,
                Step::Closed => {
                    debug!("input closed");
                    false
                }
                Step::Key(key) => self.dispatch(key, Instant::now())?,
            };

            if !keep_going {
                self.save_stats();
                info!("session ended after {} recorded races", self.stats.len());
                return Ok(());
            }
        }
    }

    /// Applies one key. Returns `false` when the session should end.
    pub fn dispatch(&mut self, key: Key, now: Instant) -> Result<bool> {
        let was_typing = self.race.mode() == Mode::Typing;
        let outcome = self.race.handle_key(key, now);

        match outcome {
            KeyOutcome::Quit => return Ok(false),
            KeyOutcome::Ignored => {}
            KeyOutcome::Resize => {
                self.screen.resize()?;
                if self.race.mode() == Mode::Typing {
                    self.rerender_race(now);
                }
            }
            KeyOutcome::Navigate(direction) => {
                match direction {
                    Direction::Next => self.quotes.next(),
                    Direction::Previous => self.quotes.previous(),
                };
                self.load_current();
            }
            KeyOutcome::Abandoned => {
                info!("abandoned race on quote {}", self.race.quote().id);
                self.drawn = 0;
                self.screen.clear();
            }
            KeyOutcome::Dismissed => self.screen.clear(),
            KeyOutcome::Finished(result) => {
                self.finish(result);
                self.screen.clear();
            }
            KeyOutcome::Correct
            | KeyOutcome::Incorrect
            | KeyOutcome::Rejected
            | KeyOutcome::Corrected => {
                if was_typing {
                    self.show_keystroke(now, outcome == KeyOutcome::Rejected);
                } else {
                    info!("race started on quote {}", self.race.quote().id);
                    self.rerender_race(now);
                }
            }
        }

        Ok(true)
    }

    fn load_current(&mut self) {
        let quote = self.quotes.current().clone();
        debug!("showing quote {}", quote.id);
        self.screen.set_quote(&quote);
        self.race.reset(quote);
        self.drawn = 0;
        self.screen.clear();
    }

    fn finish(&mut self, result: RaceResult) {
        let beat_average = result.wpm > self.average;
        self.stats.add(
            result.wpm,
            result.accuracy,
            result.text_id,
            self.quotes.database(),
        );
        self.save_stats();
        self.average = self.stats.average(self.stats.tag(), Some(RECENT_RACES));
        self.score = Some(Score {
            wpm: result.wpm,
            beat_average,
        });
        self.drawn = 0;

        info!(
            "finished quote {} at {:.1} wpm, {:.1}% accuracy in {:.2}s",
            result.text_id,
            result.wpm,
            100.0 * result.accuracy,
            result.elapsed.as_secs_f64()
        );
    }

    fn save_stats(&self) {
        let Some(path) = &self.options.stats_path else {
            return;
        };
        if let Err(err) = self.stats.save(path) {
            warn!("{err}");
        }
    }

    fn speed(&self, wpm: f64) -> f64 {
        if self.options.cpm {
            wpm_to_cpm(wpm)
        } else {
            wpm
        }
    }

    fn unit(&self) -> &'static str {
        if self.options.cpm {
            "cpm"
        } else {
            "wpm"
        }
    }

    /// The status line, losing fields from the right when the screen is narrow.
    pub fn header(&self, now: Instant) -> String {
        let unit = self.unit();
        let fields = [
            format!("{:5.1} {unit}", self.speed(self.race.wpm(now))),
            format!("{:4.1} cps", self.race.cps(now)),
            format!("{:5.2}s", self.race.elapsed(now).as_secs_f64()),
            format!("{:5.1}% acc", 100.0 * self.race.accuracy()),
            format!("{:5.1} avg {unit}", self.speed(self.average)),
            format!("- {}", self.stats.tag()),
        ];
        fit_header(&fields, self.screen.columns())
    }

    fn quote_summary(&self) -> Option<QuoteSummary> {
        let results = self
            .stats
            .text_id_results(self.stats.tag(), self.race.quote().id);
        let slots = self
            .options
            .histogram
            .then(|| self.screen.histogram_slots());
        quote_summary(
            &results,
            self.options.confidence_level,
            self.options.cpm,
            slots,
        )
    }

    fn render(&mut self, now: Instant) -> Result<()> {
        let head = self.header(now);

        match self.race.mode() {
            Mode::Browsing => {
                if self.screen.needs_redraw() {
                    let summary = self.quote_summary();
                    self.screen.show_browser(&head, summary.as_ref());
                }
            }
            Mode::Finished => {
                if self.screen.needs_redraw() {
                    let summary = self.quote_summary();
                    let score = self.score.unwrap_or(Score {
                        wpm: 0.0,
                        beat_average: false,
                    });
                    let figure = format!("{:.1}", self.speed(score.wpm));
                    let message = format!(
                        "You scored {figure} {}{}",
                        self.unit().to_uppercase(),
                        if score.beat_average { "!" } else { "." }
                    );
                    self.screen
                        .show_score(&head, &message, &figure, summary.as_ref());
                }
            }
            Mode::Typing => self.screen.update_header(&head),
        }

        self.screen.refresh()?;
        Ok(())
    }

    fn show_keystroke(&mut self, now: Instant, rejected: bool) {
        let head = self.header(now);
        let cursor = self.race.cursor();
        self.screen.show_keystroke(
            &head,
            self.drawn.min(cursor),
            self.race.position(),
            self.race.incorrect(),
            self.race.edit_buffer(),
            rejected,
        );
        self.drawn = cursor;
    }

    fn rerender_race(&mut self, now: Instant) {
        let head = self.header(now);
        self.screen.rerender_race(
            &head,
            self.race.position(),
            self.race.incorrect(),
            self.race.edit_buffer(),
        );
        self.drawn = self.race.cursor();
    }
}
