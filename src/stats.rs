//! Race history persisted as headerless CSV rows:
//! `race,wpm,accuracy,rank,racers,text_id,timestamp,database,tag`.

use crate::util::{mean, std_dev};
use chrono::{NaiveDateTime, Utc};
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const UNSPECIFIED_TAG: &str = "Unspecified";

/// How many of the most recent races the running average covers.
pub const RECENT_RACES: usize = 10;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("could not read stats file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("could not write stats file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("could not replace stats file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not move unreadable stats file {path} aside: {source}")]
    Quarantine {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
    const READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&ts.format(WRITE_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&text, READ_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// One finished race, as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceRecord {
    pub race: u64,
    pub wpm: f64,
    pub accuracy: f64,
    pub rank: u32,
    pub racers: u32,
    pub text_id: i64,
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    pub database: String,
    pub tag: String,
}

/// Lowest and highest scores among a set of races.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremals {
    pub wpm_min: f64,
    pub wpm_max: f64,
    pub acc_min: f64,
    pub acc_max: f64,
}

/// A filtered view over recorded races.
#[derive(Debug, Clone)]
pub struct RaceResults<'a> {
    records: Vec<&'a RaceRecord>,
}

impl<'a> RaceResults<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a RaceRecord> + '_ {
        self.records.iter().copied()
    }

    pub fn wpms(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.wpm).collect()
    }

    pub fn accuracies(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.accuracy).collect()
    }

    /// Mean WPM and accuracy, zero when there are no races.
    pub fn averages(&self) -> (f64, f64) {
        (
            mean(&self.wpms()).unwrap_or(0.0),
            mean(&self.accuracies()).unwrap_or(0.0),
        )
    }

    /// Sample standard deviations of WPM and accuracy, zero below two races.
    pub fn stddevs(&self) -> (f64, f64) {
        (
            std_dev(&self.wpms()).unwrap_or(0.0),
            std_dev(&self.accuracies()).unwrap_or(0.0),
        )
    }

    pub fn extremals(&self) -> Option<Extremals> {
        let (wpm_min, wpm_max) = self.wpms().into_iter().minmax().into_option()?;
        let (acc_min, acc_max) = self.accuracies().into_iter().minmax().into_option()?;
        Some(Extremals {
            wpm_min,
            wpm_max,
            acc_min,
            acc_max,
        })
    }
}

/// One line of the `--stats` table.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub tag: String,
    pub label: String,
    pub wpm_avg: f64,
    pub wpm_sd: f64,
    pub acc_avg: f64,
    pub acc_sd: f64,
}

/// All recorded races plus the tag new races are filed under.
#[derive(Debug, Clone, Default)]
pub struct Stats {
    tag: String,
    records: Vec<RaceRecord>,
}

impl Stats {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            records: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn set_tag(&mut self, tag: impl Into<String>) {
        self.tag = tag.into();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records a race under the current tag, timestamped now.
    pub fn add(&mut self, wpm: f64, accuracy: f64, text_id: i64, database: &str) {
        self.push(RaceRecord {
            race: 0,
            wpm,
            accuracy,
            rank: 1,
            racers: 1,
            text_id,
            timestamp: Utc::now().naive_utc(),
            database: database.to_string(),
            tag: self.tag.clone(),
        });
    }

    pub fn push(&mut self, record: RaceRecord) {
        self.records.push(record);
    }

    /// Races filed under `tag`, limited to the last `last_n` when given.
    pub fn results(&self, tag: &str, last_n: Option<usize>) -> RaceResults<'_> {
        let mut records: Vec<&RaceRecord> =
            self.records.iter().filter(|r| r.tag == tag).collect();
        if let Some(n) = last_n {
            let skip = records.len().saturating_sub(n);
            records.drain(..skip);
        }
        RaceResults { records }
    }

    pub fn text_id_results(&self, tag: &str, text_id: i64) -> RaceResults<'_> {
        RaceResults {
            records: self
                .records
                .iter()
                .filter(|r| r.tag == tag && r.text_id == text_id)
                .collect(),
        }
    }

    /// Average WPM of the matching races, zero when there are none.
    pub fn average(&self, tag: &str, last_n: Option<usize>) -> f64 {
        self.results(tag, last_n).averages().0
    }

    pub fn tags(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.tag.as_str())
            .sorted()
            .dedup()
            .collect()
    }

    /// Per tag: all races, then the last 10, 100 and 1000 when there are
    /// that many.
    pub fn summary(&self) -> Vec<SummaryRow> {
        let mut rows = Vec::new();

        for tag in self.tags() {
            let count = self.results(tag, None).len();

            for last_n in [None, Some(10), Some(100), Some(1000)] {
                if last_n.is_some_and(|n| count < n) {
                    continue;
                }

                let results = self.results(tag, last_n);
                let (wpm_avg, acc_avg) = results.averages();
                let (wpm_sd, acc_sd) = results.stddevs();
                rows.push(SummaryRow {
                    tag: tag.to_string(),
                    label: match last_n {
                        None => count.to_string(),
                        Some(n) => format!("n-{n}"),
                    },
                    wpm_avg,
                    wpm_sd,
                    acc_avg: 100.0 * acc_avg,
                    acc_sd: 100.0 * acc_sd,
                });
            }
        }

        rows
    }

    pub fn summary_table(&self) -> String {
        let rows = self.summary();
        let width = rows
            .iter()
            .map(|r| r.tag.chars().count())
            .max()
            .unwrap_or(0)
            .max(11);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<width$}   Games    WPM avg stddev     Accuracy avg stddev",
            "Tag"
        );
        let _ = writeln!(out, "{}", "-".repeat(width + 50));
        for row in rows {
            let _ = writeln!(
                out,
                "{:<width$}   {:>5}      {:5.1}  {:5.1}            {:4.1}% {:5.1}%",
                row.tag, row.label, row.wpm_avg, row.wpm_sd, row.acc_avg, row.acc_sd
            );
        }
        out
    }

    /// Writes every race in time order, renumbered from 1. The file is
    /// written next to `path` first and then renamed over it.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), StatsError> {
        let path = path.as_ref();
        let tmp = tmp_path(path);
        let write_err = |source| StatsError::Write {
            path: tmp.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StatsError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .map_err(write_err)?;

        let ordered = self.records.iter().sorted_by_key(|r| r.timestamp);
        for (index, record) in ordered.enumerate() {
            let row = RaceRecord {
                race: index as u64 + 1,
                ..record.clone()
            };
            writer.serialize(row).map_err(write_err)?;
        }
        writer.flush().map_err(|source| StatsError::Io {
            path: tmp.clone(),
            source,
        })?;
        drop(writer);

        fs::rename(&tmp, path).map_err(|source| StatsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("saved {} races to {}", self.records.len(), path.display());
        Ok(())
    }

    /// Reads a stats file. The current tag becomes the tag of the last row.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StatsError> {
        let path = path.as_ref();
        let read_err = |source| StatsError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(read_err)?;

        let records = reader
            .deserialize::<RaceRecord>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(read_err)?;

        let tag = records
            .last()
            .map(|r| r.tag.clone())
            .unwrap_or_else(|| UNSPECIFIED_TAG.to_string());

        Ok(Self { tag, records })
    }

    /// Loads `path`, starting fresh when it does not exist. A file that
    /// cannot be read is renamed to `<path>.old`, whose location is returned
    /// alongside an empty store.
    pub fn load_or_quarantine<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Self, Option<PathBuf>), StatsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok((Self::new(UNSPECIFIED_TAG), None));
        }

        match Self::load(path) {
            Ok(stats) => {
                info!("loaded {} races from {}", stats.len(), path.display());
                Ok((stats, None))
            }
            Err(err) => {
                let old = old_path(path);
                warn!("{err}; moving it to {}", old.display());
                fs::rename(path, &old).map_err(|source| StatsError::Quarantine {
                    path: path.to_path_buf(),
                    source,
                })?;
                Ok((Self::new(UNSPECIFIED_TAG), Some(old)))
            }
        }
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn tmp_path(path: &Path) -> PathBuf {
    with_suffix(path, ".tmp")
}

pub fn old_path(path: &Path) -> PathBuf {
    with_suffix(path, ".old")
}
