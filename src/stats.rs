//! Reading the Markov statistics file.
//!
//! The file keeps John the Ripper's `--markov` stats layout, one record per
//! line:
//!
//! ```text
//! 27=proba1[97]          start weight of 'a' is 27
//! 85=proba2[97*256+114]  weight of 'r' following 'a' is 85
//! ```
//!
//! Code points are not limited to 255 even though the bigram key is written
//! as `first*256+second`; both numbers are read as they are.
use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::{Path, PathBuf},
    str::FromStr,
};

use log::info;

use crate::{
    errors::{Error, Result},
    model::{Model, ModelBuilder, Probability},
};

/// Directory holding the statistics file inside a rules directory
pub const STATS_DIR: &str = "Markov";

/// Name of the statistics file
pub const STATS_FILE: &str = "markov_stats.txt";

const UNIGRAM_TAG: &str = "=proba1[";
const BIGRAM_TAG: &str = "=proba2[";
const BIGRAM_SEPARATOR: &str = "*256+";

/// A single line of the statistics file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Record {
    /// `<probability>=proba1[<code point>]`
    Unigram {
        symbol: char,
        probability: Probability,
    },
    /// `<probability>=proba2[<code point 1>*256+<code point 2>]`
    Bigram {
        prev: char,
        next: char,
        probability: Probability,
    },
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unigram {
                symbol,
                probability,
            } => write!(f, "{}{}{}]", probability, UNIGRAM_TAG, *symbol as u32),
            Self::Bigram {
                prev,
                next,
                probability,
            } => write!(
                f,
                "{}{}{}{}{}]",
                probability, BIGRAM_TAG, *prev as u32, BIGRAM_SEPARATOR, *next as u32
            ),
        }
    }
}

impl FromStr for Record {
    type Err = Error;

    /// Parses one non-empty, already trimmed record.
    fn from_str(s: &str) -> Result<Self> {
        parse_record(s).map_err(Error::MalformedStatistics)
    }
}

fn parse_probability(s: &str) -> std::result::Result<Probability, String> {
    s.parse()
        .map_err(|e| format!("invalid probability '{}': {}", s, e))
}

fn parse_code_point(s: &str) -> std::result::Result<char, String> {
    let value: u32 = s
        .parse()
        .map_err(|e| format!("invalid code point '{}': {}", s, e))?;
    char::from_u32(value).ok_or_else(|| format!("code point {} is not a character", value))
}

fn parse_record(line: &str) -> std::result::Result<Record, String> {
    if let Some((probability, rest)) = line.split_once(UNIGRAM_TAG) {
        let code_point = rest
            .strip_suffix(']')
            .ok_or_else(|| format!("unterminated unigram record '{}'", line))?;
        return Ok(Record::Unigram {
            symbol: parse_code_point(code_point)?,
            probability: parse_probability(probability)?,
        });
    }

    if let Some((probability, rest)) = line.split_once(BIGRAM_TAG) {
        let key = rest
            .strip_suffix(']')
            .ok_or_else(|| format!("unterminated bigram record '{}'", line))?;
        let (prev, next) = key
            .split_once(BIGRAM_SEPARATOR)
            .ok_or_else(|| format!("bigram key '{}' lacks '{}'", key, BIGRAM_SEPARATOR))?;
        return Ok(Record::Bigram {
            prev: parse_code_point(prev)?,
            next: parse_code_point(next)?,
            probability: parse_probability(probability)?,
        });
    }

    Err(format!("unrecognised record '{}'", line))
}

/// Path of the statistics file inside a rules directory.
pub fn stats_path<P: AsRef<Path>>(rules_dir: P) -> PathBuf {
    rules_dir.as_ref().join(STATS_DIR).join(STATS_FILE)
}

/// Builds a model from the statistics file of a rules directory.
///
/// # Arguments
/// * `rules_dir` - Directory containing `Markov/markov_stats.txt`
///
/// # Errors
/// Returns `Error::Io` if the file is missing or unreadable, and
/// `Error::MalformedStatistics` if any record cannot be parsed. No partial
/// model is returned.
pub fn build_model<P: AsRef<Path>>(rules_dir: P) -> Result<Model> {
    Model::from_file(stats_path(rules_dir))
}

impl Model {
    /// Builds a model from a statistics file.
    ///
    /// # Errors
    /// Same as [`build_model`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading Markov statistics from {}", path.display());
        let model = Self::from_reader(BufReader::new(File::open(path)?))?;
        let summary = model.summary();
        info!(
            "Loaded {} characters and {} transitions",
            summary.characters, summary.transitions
        );
        Ok(model)
    }

    /// Builds a model from statistics records, one per line.
    ///
    /// Blank lines are ignored. Input that is not valid UTF-8 is reported as
    /// malformed rather than as an I/O failure.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut builder = ModelBuilder::new();

        for (i, line) in reader.lines().enumerate() {
            let line_number = i + 1;
            let line = match line {
                Ok(line) => line,
                Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                    return Err(Error::malformed(line_number, e));
                }
                Err(e) => return Err(e.into()),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match parse_record(line).map_err(|msg| Error::malformed(line_number, msg))? {
                Record::Unigram {
                    symbol,
                    probability,
                } => {
                    builder.add_unigram(symbol, probability);
                }
                Record::Bigram {
                    prev,
                    next,
                    probability,
                } => {
                    builder
                        .add_bigram(prev, next, probability)
                        .map_err(|e| match e {
                            Error::MalformedStatistics(msg) => Error::malformed(line_number, msg),
                            e => e,
                        })?;
                }
            }
        }

        Ok(builder.finish())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_reader(s.as_bytes())
    }
}
