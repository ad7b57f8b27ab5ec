//! Quote databases and the shuffled, bidirectional order they are raced in.

use include_dir::{include_dir, Dir};
use itertools::Itertools;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

static DATA_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/data");

const DEFAULT_FILE: &str = "quotes.json";
pub const DEFAULT_DATABASE: &str = "default";

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("could not read quote file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("quote database `{database}` is not valid JSON: {source}")]
    Json {
        database: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("the built-in quote database is missing")]
    MissingDefault,
    #[error("quote database `{0}` contains no quotes")]
    Empty(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quote {
    pub author: String,
    pub title: String,
    pub text: String,
    pub id: i64,
}

impl Quote {
    /// Number of characters to type.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn matches(&self, needle: &str) -> bool {
        [&self.author, &self.title, &self.text]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

#[derive(Deserialize)]
struct QuoteEntry {
    #[serde(default)]
    author: String,
    #[serde(default)]
    title: String,
    text: String,
    id: Option<i64>,
}

/// A named collection of quotes.
#[derive(Debug, Clone)]
pub struct Quotes {
    quotes: Vec<Quote>,
    database: String,
}

impl Quotes {
    /// Builds a collection, dropping duplicates and quotes without text.
    pub fn new(quotes: Vec<Quote>, database: impl Into<String>) -> Result<Self, QuoteError> {
        let database = database.into();
        let quotes: Vec<Quote> = quotes
            .into_iter()
            .filter(|q| !q.text.trim().is_empty())
            .unique()
            .collect();

        if quotes.is_empty() {
            return Err(QuoteError::Empty(database));
        }

        Ok(Self { quotes, database })
    }

    pub fn load_default() -> Result<Self, QuoteError> {
        let json = DATA_DIR
            .get_file(DEFAULT_FILE)
            .and_then(|file| file.contents_utf8())
            .ok_or(QuoteError::MissingDefault)?;
        Self::from_json(json, DEFAULT_DATABASE)
    }

    /// Parses `[{"author", "title", "text", "id"}]`. Entries without an id
    /// are numbered by their position in the file.
    pub fn from_json(json: &str, database: &str) -> Result<Self, QuoteError> {
        let entries: Vec<QuoteEntry> =
            serde_json::from_str(json).map_err(|source| QuoteError::Json {
                database: database.to_string(),
                source,
            })?;

        let quotes = entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Quote {
                author: entry.author,
                title: entry.title,
                text: entry.text,
                id: entry.id.unwrap_or(index as i64),
            })
            .collect();

        Self::new(quotes, database)
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self, QuoteError> {
        let path = path.as_ref();
        let json = read(path)?;
        let quotes = Self::from_json(&json, &database_name(path))?;
        info!("loaded {} quotes from {}", quotes.len(), path.display());
        Ok(quotes)
    }

    /// Loads a whole text file as a single quote.
    pub fn load_text<P: AsRef<Path>>(path: P) -> Result<Self, QuoteError> {
        let path = path.as_ref();
        let text = read(path)?.replace('\r', "").trim_end().to_string();
        let quote = Quote {
            author: String::new(),
            title: String::new(),
            text,
            id: 0,
        };
        Self::new(vec![quote], database_name(path))
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quote> {
        self.quotes.iter()
    }

    pub fn from_id(&self, id: i64) -> Option<&Quote> {
        self.quotes.iter().find(|q| q.id == id)
    }

    /// Ids of quotes whose author, title or text contain `term`, ignoring case.
    pub fn search(&self, term: &str) -> Vec<i64> {
        let needle = term.to_lowercase();
        self.quotes
            .iter()
            .filter(|q| q.matches(&needle))
            .map(|q| q.id)
            .collect()
    }

    pub fn random_iterator(self) -> RandomIterator {
        RandomIterator::new(self, StdRng::from_entropy())
    }
}

fn read(path: &Path) -> Result<String, QuoteError> {
    fs::read_to_string(path).map_err(|source| QuoteError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn database_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string())
}

/// Walks a quote collection in shuffled order, in either direction.
///
/// Wrapping past the last quote reshuffles, so every quote is seen once per
/// pass.
#[derive(Debug)]
pub struct RandomIterator {
    quotes: Quotes,
    order: Vec<usize>,
    index: usize,
    rng: StdRng,
}

impl RandomIterator {
    pub fn new(quotes: Quotes, mut rng: StdRng) -> Self {
        let mut order: Vec<usize> = (0..quotes.len()).collect();
        order.shuffle(&mut rng);
        Self {
            quotes,
            order,
            index: 0,
            rng,
        }
    }

    pub fn current(&self) -> &Quote {
        &self.quotes.quotes[self.order[self.index]]
    }

    pub fn next(&mut self) -> &Quote {
        self.index = (self.index + 1) % self.order.len();
        if self.index == 0 {
            self.order.shuffle(&mut self.rng);
        }
        self.current()
    }

    pub fn previous(&mut self) -> &Quote {
        let len = self.order.len();
        self.index = (self.index + len - 1) % len;
        self.current()
    }

    /// Restarts the iteration with the given quotes first, in database order,
    /// followed by the rest shuffled.
    pub fn put_to_front(&mut self, ids: &[i64]) {
        let (front, mut back): (Vec<usize>, Vec<usize>) = (0..self.quotes.len())
            .partition(|&index| ids.contains(&self.quotes.quotes[index].id));
        back.shuffle(&mut self.rng);

        self.order = front.into_iter().chain(back).collect();
        self.index = 0;
    }

    pub fn database(&self) -> &str {
        self.quotes.database()
    }

    pub fn quotes(&self) -> &Quotes {
        &self.quotes
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
