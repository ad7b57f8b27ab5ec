//! The typing state machine for a single quote.
//!
//! A race moves `Browsing -> Typing -> Finished` and back to `Browsing`.
//! Keys are fed in through [`RaceState::handle_key`], which reports what
//! happened as a [`KeyOutcome`] so the caller can decide what to redraw,
//! persist or navigate to. The clock is passed in explicitly.

use crate::input::{Key, SpecialKey};
use crate::quotes::Quote;
use log::debug;
use std::time::{Duration, Instant};

const MAX_WPM: f64 = 999.0;
const MAX_CPS: f64 = 99.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Mode {
    Browsing,
    Typing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Score of a completed race.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaceResult {
    pub wpm: f64,
    pub accuracy: f64,
    pub text_id: i64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyOutcome {
    /// The key means nothing in the current mode.
    Ignored,
    Correct,
    Incorrect,
    /// A wrong key with no room left in the quote to show it.
    Rejected,
    /// Backspace removed a pending error or a typed character.
    Corrected,
    /// The last character was typed. Reported once per race.
    Finished(RaceResult),
    /// The caller should load another quote and [`RaceState::reset`].
    Navigate(Direction),
    /// A race in progress was dropped without a score.
    Abandoned,
    /// The score screen was closed.
    Dismissed,
    Quit,
    Resize,
}

#[derive(Debug, Clone)]
pub struct RaceState {
    quote: Quote,
    chars: Vec<char>,
    position: usize,
    incorrect: usize,
    total_incorrect: usize,
    edit_buffer: String,
    start: Option<Instant>,
    stop: Option<Instant>,
    mode: Mode,
    tab_spaces: Option<usize>,
}

impl RaceState {
    pub fn new(quote: Quote) -> Self {
        let chars = quote.text.chars().collect();
        Self {
            quote,
            chars,
            position: 0,
            incorrect: 0,
            total_incorrect: 0,
            edit_buffer: String::new(),
            start: None,
            stop: None,
            mode: Mode::Browsing,
            tab_spaces: None,
        }
    }

    /// Expands every tab keystroke into `spaces` spaces.
    pub fn with_tab_spaces(mut self, spaces: Option<usize>) -> Self {
        self.tab_spaces = spaces;
        self
    }

    /// Starts over in `Browsing` with `quote`.
    pub fn reset(&mut self, quote: Quote) {
        *self = Self::new(quote).with_tab_spaces(self.tab_spaces);
    }

    fn restart(&mut self) {
        self.reset(self.quote.clone());
    }

    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn incorrect(&self) -> usize {
        self.incorrect
    }

    pub fn total_incorrect(&self) -> usize {
        self.total_incorrect
    }

    pub fn edit_buffer(&self) -> &str {
        &self.edit_buffer
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Offset of the cursor: everything typed so far, right or wrong.
    pub fn cursor(&self) -> usize {
        self.position + self.incorrect
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            (Some(start), None) => now.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    pub fn wpm(&self, now: Instant) -> f64 {
        if self.position == 0 {
            return 0.0;
        }
        let secs = self.elapsed(now).as_secs_f64();
        ((60.0 * self.position as f64 / 5.0) / secs).min(MAX_WPM)
    }

    pub fn cps(&self, now: Instant) -> f64 {
        if self.position == 0 {
            return 0.0;
        }
        let secs = self.elapsed(now).as_secs_f64();
        (self.position as f64 / secs).min(MAX_CPS)
    }

    pub fn accuracy(&self) -> f64 {
        let n = self.chars.len() as f64;
        match n + self.total_incorrect as f64 {
            total if total > 0.0 => n / total,
            _ => 1.0,
        }
    }

    pub fn handle_key(&mut self, key: Key, now: Instant) -> KeyOutcome {
        let outcome = match (self.mode, key) {
            (_, Key::Special(SpecialKey::Resize)) => KeyOutcome::Resize,
            (_, Key::Special(SpecialKey::Interrupt)) => KeyOutcome::Quit,

            (Mode::Browsing, Key::Special(SpecialKey::Escape)) => KeyOutcome::Quit,
            (Mode::Finished, Key::Special(SpecialKey::Escape)) => {
                self.restart();
                KeyOutcome::Dismissed
            }
            (Mode::Typing, Key::Special(SpecialKey::Escape)) => {
                self.restart();
                KeyOutcome::Abandoned
            }

            (Mode::Browsing | Mode::Finished, Key::Special(SpecialKey::ArrowLeft)) => {
                KeyOutcome::Navigate(Direction::Previous)
            }
            (Mode::Browsing | Mode::Finished, Key::Special(SpecialKey::ArrowRight))
            | (Mode::Browsing | Mode::Finished, Key::Printable(' ')) => {
                KeyOutcome::Navigate(Direction::Next)
            }

            (Mode::Typing, Key::Special(SpecialKey::Backspace)) => self.backspace(),
            (_, Key::Special(_)) => KeyOutcome::Ignored,

            (Mode::Browsing, Key::Printable(c)) => {
                self.start = Some(now);
                self.mode = Mode::Typing;
                self.type_key(c, now)
            }
            (Mode::Finished, Key::Printable(c)) => {
                // Any other key on the score screen retries the same quote.
                self.restart();
                self.start = Some(now);
                self.mode = Mode::Typing;
                self.type_key(c, now)
            }
            (Mode::Typing, Key::Printable(c)) => self.type_key(c, now),
        };

        debug!(
            "{:?} -> {:?} ({} position {} incorrect {})",
            key, outcome, self.mode, self.position, self.incorrect
        );
        outcome
    }

    fn type_key(&mut self, c: char, now: Instant) -> KeyOutcome {
        match (c, self.tab_spaces) {
            ('\t', Some(spaces)) if spaces > 0 => {
                let mut outcome = KeyOutcome::Ignored;
                for _ in 0..spaces {
                    outcome = self.type_char(' ', now);
                    if matches!(outcome, KeyOutcome::Finished(_) | KeyOutcome::Rejected) {
                        break;
                    }
                }
                outcome
            }
            _ => self.type_char(c, now),
        }
    }

    fn type_char(&mut self, c: char, now: Instant) -> KeyOutcome {
        if self.incorrect == 0 && self.chars.get(self.position) == Some(&c) {
            self.position += 1;

            if c == ' ' || c == '\n' {
                self.edit_buffer.clear();
            } else {
                self.edit_buffer.push(c);
            }

            if self.position == self.chars.len() {
                return KeyOutcome::Finished(self.finish(now));
            }
            return KeyOutcome::Correct;
        }

        if self.cursor() >= self.chars.len() {
            return KeyOutcome::Rejected;
        }

        self.incorrect += 1;
        self.total_incorrect += 1;
        self.edit_buffer.push(if c == '\n' { ' ' } else { c });
        KeyOutcome::Incorrect
    }

    fn backspace(&mut self) -> KeyOutcome {
        let outcome = if self.incorrect > 0 {
            self.incorrect -= 1;
            KeyOutcome::Corrected
        } else if !self.edit_buffer.is_empty() {
            self.position -= 1;
            KeyOutcome::Corrected
        } else {
            KeyOutcome::Ignored
        };
        self.edit_buffer.pop();
        outcome
    }

    fn finish(&mut self, now: Instant) -> RaceResult {
        self.stop = Some(now);
        self.mode = Mode::Finished;
        RaceResult {
            wpm: self.wpm(now),
            accuracy: self.accuracy(),
            text_id: self.quote.id,
            elapsed: self.elapsed(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn quote(text: &str) -> Quote {
        Quote {
            author: "Someone".into(),
            title: "Something".into(),
            text: text.into(),
            id: 7,
        }
    }

    fn press(race: &mut RaceState, keys: &str, now: Instant) -> Vec<KeyOutcome> {
        keys.chars()
            .map(|c| race.handle_key(Key::Printable(c), now))
            .collect()
    }

    fn backspace(race: &mut RaceState, now: Instant) -> KeyOutcome {
        race.handle_key(Key::Special(SpecialKey::Backspace), now)
    }

    fn finished(outcomes: &[KeyOutcome]) -> usize {
        outcomes
            .iter()
            .filter(|o| matches!(o, KeyOutcome::Finished(_)))
            .count()
    }

    #[test]
    fn test_typing_cat_finishes_once() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("cat"));

        let outcomes = press(&mut race, "cat", now);

        assert_eq!(race.position(), 3);
        assert_eq!(race.mode(), Mode::Finished);
        assert_eq!(race.accuracy(), 1.0);
        assert_eq!(finished(&outcomes), 1);
    }

    #[test]
    fn test_correcting_a_typo() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("cat"));

        let mut outcomes = press(&mut race, "cx", now);
        assert_eq!(race.incorrect(), 1);
        assert_eq!(race.edit_buffer(), "cx");
        outcomes.push(backspace(&mut race, now));
        outcomes.extend(press(&mut race, "at", now));

        assert_eq!(race.total_incorrect(), 1);
        assert_eq!(race.accuracy(), 0.75);
        assert_eq!(race.mode(), Mode::Finished);
        assert_eq!(finished(&outcomes), 1);
        assert_matches!(
            outcomes.last(),
            Some(KeyOutcome::Finished(RaceResult { accuracy, text_id: 7, .. })) if *accuracy == 0.75
        );
    }

    #[test]
    fn test_first_key_starts_the_race() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("cat"));
        assert_eq!(race.mode(), Mode::Browsing);
        assert_eq!(race.elapsed(now), Duration::ZERO);

        assert_eq!(race.handle_key(Key::Printable('x'), now), KeyOutcome::Incorrect);

        assert_eq!(race.mode(), Mode::Typing);
        assert_eq!(race.elapsed(now + Duration::from_secs(2)), Duration::from_secs(2));
    }

    #[test]
    fn test_backspace_restores_state() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("hello world"));
        press(&mut race, "h", now);
        let (position, incorrect, edit) =
            (race.position(), race.incorrect(), race.edit_buffer().to_string());

        press(&mut race, "ell", now);
        for _ in 0..3 {
            assert_eq!(backspace(&mut race, now), KeyOutcome::Corrected);
        }

        assert_eq!(race.position(), position);
        assert_eq!(race.incorrect(), incorrect);
        assert_eq!(race.edit_buffer(), edit);
    }

    #[test]
    fn test_total_incorrect_is_monotonic() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("abc"));
        press(&mut race, "xy", now);
        backspace(&mut race, now);
        backspace(&mut race, now);
        assert_eq!(race.incorrect(), 0);
        assert_eq!(race.total_incorrect(), 2);
        assert!(race.accuracy() < 1.0 && race.accuracy() > 0.0);
    }

    #[test]
    fn test_backspace_stops_at_word_boundary() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("ab cd"));
        press(&mut race, "ab ", now);
        assert_eq!(race.edit_buffer(), "");
        assert_eq!(backspace(&mut race, now), KeyOutcome::Ignored);
        assert_eq!(race.position(), 3);
    }

    #[test]
    fn test_errors_are_rejected_past_the_end() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("abc"));
        let outcomes = press(&mut race, "axyz", now);

        assert_eq!(
            outcomes,
            vec![
                KeyOutcome::Correct,
                KeyOutcome::Incorrect,
                KeyOutcome::Incorrect,
                KeyOutcome::Rejected
            ]
        );
        assert_eq!(race.cursor(), race.len());
        assert_eq!(race.total_incorrect(), 2);
    }

    #[test]
    fn test_correct_key_is_wrong_while_errors_pending() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("abc"));
        press(&mut race, "ax", now);
        assert_eq!(race.handle_key(Key::Printable('b'), now), KeyOutcome::Incorrect);
        assert_eq!(race.position(), 1);
    }

    #[test]
    fn test_newline_is_shown_as_space_when_wrong() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("ab"));
        press(&mut race, "a\n", now);
        assert_eq!(race.edit_buffer(), "a ");
    }

    #[test]
    fn test_newline_in_text_is_a_word_boundary() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("ab\ncd"));
        press(&mut race, "ab\n", now);
        assert_eq!(race.position(), 3);
        assert_eq!(race.edit_buffer(), "");
    }

    #[test]
    fn test_tab_expands_to_spaces() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("a    b")).with_tab_spaces(Some(4));
        press(&mut race, "a\t", now);
        assert_eq!(race.position(), 5);
        assert_eq!(race.incorrect(), 0);
    }

    #[test]
    fn test_tab_without_expansion_is_a_plain_key() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("a\tb"));
        press(&mut race, "a\tb", now);
        assert_eq!(race.mode(), Mode::Finished);
    }

    #[test]
    fn test_escape_abandons_race() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("abc"));
        press(&mut race, "ab", now);
        assert_eq!(
            race.handle_key(Key::Special(SpecialKey::Escape), now),
            KeyOutcome::Abandoned
        );
        assert_eq!(race.mode(), Mode::Browsing);
        assert_eq!(race.position(), 0);
        assert_eq!(race.quote().id, 7);
    }

    #[test]
    fn test_escape_while_browsing_quits() {
        let mut race = RaceState::new(quote("abc"));
        assert_eq!(
            race.handle_key(Key::Special(SpecialKey::Escape), Instant::now()),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn test_interrupt_quits_from_any_mode() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("abc"));
        press(&mut race, "a", now);
        assert_eq!(
            race.handle_key(Key::Special(SpecialKey::Interrupt), now),
            KeyOutcome::Quit
        );
    }

    #[test]
    fn test_navigation_only_outside_typing() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("abc"));
        assert_eq!(
            race.handle_key(Key::Printable(' '), now),
            KeyOutcome::Navigate(Direction::Next)
        );
        assert_eq!(
            race.handle_key(Key::Special(SpecialKey::ArrowLeft), now),
            KeyOutcome::Navigate(Direction::Previous)
        );

        press(&mut race, "a", now);
        assert_eq!(
            race.handle_key(Key::Special(SpecialKey::ArrowRight), now),
            KeyOutcome::Ignored
        );
    }

    #[test]
    fn test_finished_screen_navigates_dismisses_or_retries() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("ab"));
        press(&mut race, "ab", now);
        assert_eq!(
            race.handle_key(Key::Special(SpecialKey::ArrowRight), now),
            KeyOutcome::Navigate(Direction::Next)
        );

        assert_eq!(race.handle_key(Key::Printable('a'), now), KeyOutcome::Correct);
        assert_eq!(race.mode(), Mode::Typing);
        assert_eq!(race.position(), 1);

        press(&mut race, "b", now);
        assert_eq!(
            race.handle_key(Key::Special(SpecialKey::Escape), now),
            KeyOutcome::Dismissed
        );
        assert_eq!(race.mode(), Mode::Browsing);
    }

    #[test]
    fn test_finished_race_ignores_backspace() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("ab"));
        press(&mut race, "ab", now);
        assert_eq!(backspace(&mut race, now), KeyOutcome::Ignored);
        assert_eq!(race.position(), 2);
    }

    #[test]
    fn test_speed_formulas() {
        let start = Instant::now();
        let mut race = RaceState::new(quote("cat"));
        press(&mut race, "ca", start);
        race.handle_key(Key::Printable('t'), start + Duration::from_secs(6));

        let later = start + Duration::from_secs(60);
        assert!((race.wpm(later) - 6.0).abs() < 1e-9);
        assert!((race.cps(later) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_speed_is_clamped() {
        let now = Instant::now();
        let mut race = RaceState::new(quote("cat"));
        press(&mut race, "cat", now);
        assert_eq!(race.wpm(now), 999.0);
        assert_eq!(race.cps(now), 99.0);
    }

    #[test]
    fn test_speed_before_typing_is_zero() {
        let race = RaceState::new(quote("cat"));
        let now = Instant::now();
        assert_eq!(race.wpm(now), 0.0);
        assert_eq!(race.cps(now), 0.0);
        assert_eq!(race.accuracy(), 1.0);
    }

    #[test]
    fn test_invariants_hold_under_random_typing() {
        let now = Instant::now();
        let text = "the quick brown fox";
        let mut race = RaceState::new(quote(text));
        let keys = "thw\u{8}e qx\u{8}\u{8}uick zzzzzzzzzzzzzzzzzzzzzzzz\u{8}\u{8}";

        let mut last_total = 0;
        for c in keys.chars() {
            let key = match c {
                '\u{8}' => Key::Special(SpecialKey::Backspace),
                c => Key::Printable(c),
            };
            race.handle_key(key, now);
            assert!(race.position() <= race.len());
            assert!(race.cursor() <= race.len());
            assert!(race.total_incorrect() >= last_total);
            last_total = race.total_incorrect();
        }
    }
}
