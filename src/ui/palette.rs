use ratatui::style::{Color, Modifier, Style};

use crate::config::{ColorPair, Colors, Config};

/// How many colors the terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ColorMode {
    Monochrome,
    Basic,
    Extended,
}

impl ColorMode {
    /// Picks the mode from the `--monochrome` flag and `$TERM`.
    pub fn detect(monochrome: bool, term: Option<&str>) -> Self {
        match (monochrome, term) {
            (true, _) => ColorMode::Monochrome,
            (false, Some(term)) if term.ends_with("256color") => ColorMode::Extended,
            _ => ColorMode::Basic,
        }
    }

    pub fn from_env(monochrome: bool) -> Self {
        Self::detect(monochrome, std::env::var("TERM").ok().as_deref())
    }
}

/// Styles for every element the screen draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub author: Style,
    pub background: Style,
    pub correct: Style,
    pub incorrect: Style,
    pub prompt: Style,
    pub quote: Style,
    pub score: Style,
    pub status: Style,
}

impl Palette {
    pub fn new(mode: ColorMode, config: &Config) -> Self {
        match mode {
            ColorMode::Extended => Self::from_colors(&config.xterm_256color, Color::Indexed),
            ColorMode::Basic => Self::from_colors(&config.xterm_colors, ansi).emphasized(),
            ColorMode::Monochrome => {
                let mut palette = Self::from_colors(&config.monochrome, ansi).emphasized();
                // Without color, errors and the score need to stand out on their own.
                palette.incorrect = palette.incorrect.add_modifier(Modifier::REVERSED);
                palette.score = palette.score.add_modifier(Modifier::REVERSED);
                palette
            }
        }
    }

    fn from_colors(colors: &Colors, color: fn(u8) -> Color) -> Self {
        let pair = |p: ColorPair| Style::new().fg(color(p.fg())).bg(color(p.bg()));
        let background = color(colors.background);

        Self {
            author: pair(colors.author),
            background: Style::new().fg(background).bg(background),
            correct: pair(colors.correct),
            incorrect: pair(colors.incorrect),
            prompt: pair(colors.prompt),
            quote: pair(colors.quote),
            score: pair(colors.score),
            status: pair(colors.status),
        }
    }

    /// Makes the few available colors easier to tell apart.
    fn emphasized(mut self) -> Self {
        self.correct = self.correct.add_modifier(Modifier::DIM);
        self.incorrect = self
            .incorrect
            .add_modifier(Modifier::UNDERLINED | Modifier::BOLD);
        self.quote = self.quote.add_modifier(Modifier::BOLD);
        self.status = self.status.add_modifier(Modifier::BOLD);
        self
    }
}

/// Maps the 16 ANSI color indices to their named colors.
fn ansi(index: u8) -> Color {
    match index {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        7 => Color::Gray,
        8 => Color::DarkGray,
        9 => Color::LightRed,
        10 => Color::LightGreen,
        11 => Color::LightYellow,
        12 => Color::LightBlue,
        13 => Color::LightMagenta,
        14 => Color::LightCyan,
        15 => Color::White,
        n => Color::Indexed(n),
    }
}
