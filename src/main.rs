use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::tty::IsTty;
use log::{error, info, warn};
use ratatui::{backend::CrosstermBackend, Terminal};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::{
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    process::ExitCode,
};
use wpm::{
    app_dirs::AppDirs,
    config::{ConfigStore, FileConfigStore},
    quotes::Quotes,
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    session::{Session, SessionOptions},
    stats::{Stats, UNSPECIFIED_TAG},
    ui::{ColorMode, Palette, Screen, TerminalGuard},
    Result,
};

/// measure your typing speed against a database of quotes
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type famous quotes as fast as you can. Every finished race is scored in words per minute and saved, so you can track your progress per keyboard or any other tag."
)]
pub struct Cli {
    /// load quotes from a JSON file of [{author, title, text, id}]
    #[clap(long, value_name = "FILE", conflicts_with = "load")]
    load_json: Option<PathBuf>,

    /// load a plain text file as a single quote
    #[clap(long, value_name = "FILE")]
    load: Option<PathBuf>,

    /// file results under this tag, e.g. the keyboard you are using
    #[clap(long, visible_alias = "keyboard")]
    tag: Option<String>,

    /// print a table of your results per tag and exit
    #[clap(long)]
    stats: bool,

    /// where results are kept (default: ~/.wpm.csv)
    #[clap(long, value_name = "FILE")]
    stats_file: Option<PathBuf>,

    /// start with the quote with this text id
    #[clap(long, conflicts_with = "search")]
    id: Option<i64>,

    /// start with the quotes whose author, title or text contain TERM
    #[clap(long, value_name = "TERM")]
    search: Option<String>,

    /// draw without colors
    #[clap(long)]
    monochrome: bool,

    /// type N spaces for every tab key press
    #[clap(long, value_name = "N")]
    tabs: Option<usize>,

    /// show speeds in characters per minute instead of words per minute
    #[clap(long)]
    cpm: bool,

    /// use this configuration file instead of the default one
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    fn load_quotes(&self) -> Result<Quotes> {
        let quotes = match (&self.load_json, &self.load) {
            (Some(path), _) => Quotes::load_json(path)?,
            (None, Some(path)) => Quotes::load_text(path)?,
            (None, None) => Quotes::load_default()?,
        };
        Ok(quotes)
    }

    fn config_store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        }
    }

    fn stats_path(&self) -> Option<PathBuf> {
        self.stats_file.clone().or_else(AppDirs::stats_path)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("wpm: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }

    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = OpenOptions::new().create(true).append(true).open(&path) {
        let _ = WriteLogger::init(LevelFilter::Info, log_config, log_file);
    }
}

fn load_stats(cli: &Cli, stats_path: Option<&PathBuf>) -> Result<Stats> {
    let mut stats = match stats_path {
        Some(path) => {
            let (stats, quarantined) = Stats::load_or_quarantine(path)?;
            if let Some(old) = quarantined {
                eprintln!(
                    "wpm: could not read {}, moved it to {} and started a new one",
                    path.display(),
                    old.display()
                );
            }
            stats
        }
        None => {
            warn!("no place to keep results, they will not be saved");
            Stats::new(UNSPECIFIED_TAG)
        }
    };

    if let Some(tag) = &cli.tag {
        stats.set_tag(tag.as_str());
    }
    Ok(stats)
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config_store().load()?;
    let stats_path = cli.stats_path();
    let stats = load_stats(&cli, stats_path.as_ref())?;

    if cli.stats {
        print!("{}", stats.summary_table());
        return Ok(());
    }

    let quotes = cli.load_quotes()?;
    info!("using {} quotes from `{}`", quotes.len(), quotes.database());

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let options = SessionOptions {
        cpm: cli.cpm,
        tab_spaces: cli.tabs,
        stats_path,
        ..SessionOptions::from_config(&config)
    };
    let color_mode = ColorMode::from_env(cli.monochrome);
    info!("drawing with {color_mode} palette");
    let palette = Palette::new(color_mode, &config);

    // Restored on every way out of this function, before errors are printed.
    let _guard = TerminalGuard::acquire()?;

    let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    let screen = Screen::new(terminal, palette, &config)?;
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::from_millis(config.terminal.window_timeout),
    );

    let mut session = Session::new(screen, quotes.random_iterator(), stats, options, runner);
    if let Some(id) = cli.id {
        session.jump_to(id)?;
    }
    if let Some(term) = &cli.search {
        session.search(term)?;
    }

    session.run()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["wpm"]);

        assert!(cli.load_json.is_none());
        assert!(cli.load.is_none());
        assert!(cli.tag.is_none());
        assert!(!cli.stats);
        assert!(cli.id.is_none());
        assert!(cli.search.is_none());
        assert!(!cli.monochrome);
        assert!(cli.tabs.is_none());
        assert!(!cli.cpm);
    }

    #[test]
    fn test_cli_quote_sources() {
        let cli = Cli::parse_from(["wpm", "--load-json", "poems.json"]);
        assert_eq!(cli.load_json, Some(PathBuf::from("poems.json")));

        let cli = Cli::parse_from(["wpm", "--load", "notes.txt"]);
        assert_eq!(cli.load, Some(PathBuf::from("notes.txt")));
    }

    #[test]
    fn test_cli_load_options_conflict() {
        let result = Cli::try_parse_from(["wpm", "--load-json", "a.json", "--load", "b.txt"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_id_and_search_conflict() {
        let result = Cli::try_parse_from(["wpm", "--id", "3", "--search", "love"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_tag_and_keyboard_alias() {
        let cli = Cli::parse_from(["wpm", "--tag", "ergodox"]);
        assert_eq!(cli.tag.as_deref(), Some("ergodox"));

        let cli = Cli::parse_from(["wpm", "--keyboard", "model-m"]);
        assert_eq!(cli.tag.as_deref(), Some("model-m"));
    }

    #[test]
    fn test_cli_display_flags() {
        let cli = Cli::parse_from(["wpm", "--monochrome", "--cpm", "--tabs", "4"]);
        assert!(cli.monochrome);
        assert!(cli.cpm);
        assert_eq!(cli.tabs, Some(4));
    }

    #[test]
    fn test_cli_stats_file_overrides_default() {
        let cli = Cli::parse_from(["wpm", "--stats", "--stats-file", "/tmp/races.csv"]);
        assert!(cli.stats);
        assert_eq!(cli.stats_path(), Some(PathBuf::from("/tmp/races.csv")));
    }

    #[test]
    fn test_cli_negative_id_is_accepted() {
        let cli = Cli::parse_from(["wpm", "--id=-1"]);
        assert_eq!(cli.id, Some(-1));
    }

    #[test]
    fn test_cli_loads_default_quotes() {
        let cli = Cli::parse_from(["wpm"]);
        let quotes = cli.load_quotes().unwrap();
        assert_eq!(quotes.database(), "default");
    }

    #[test]
    fn test_cli_missing_quote_file_is_an_error() {
        let cli = Cli::parse_from(["wpm", "--load", "/definitely/not/here.txt"]);
        assert!(cli.load_quotes().is_err());
    }

    #[test]
    fn test_load_stats_applies_tag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("races.csv");
        let cli = Cli::parse_from(["wpm", "--tag", "laptop"]);

        let stats = load_stats(&cli, Some(&path)).unwrap();
        assert_eq!(stats.tag(), "laptop");
        assert!(stats.is_empty());
    }
}
