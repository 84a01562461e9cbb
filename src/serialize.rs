//! Utilities for input/output.
//!
//! Streams guesses as plain lines or JSON lines, and stores cursors as JSON so
//! an interrupted session can be resumed.
use std::{
    collections::BTreeMap,
    io::{self, Read, Write},
};

use serde_json::Deserializer;

use crate::{
    cursor::{Cursor, Guess},
    errors::{Error, Result},
    model::Level,
};

/// How guesses are written.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// The guess alone, one per line; guesses holding a line break are
    /// refused
    #[default]
    Plain,
    /// `{"guess":...,"level":...}`, one object per line
    Json,
}

/// Writes guesses to a writer, one per line.
///
/// # Arguments
///
/// * `guesses` - Guesses to write, usually a `Session`
/// * `writer` - Destination
/// * `format` - Line format
///
/// # Returns
///
/// The number of guesses written, or an `io::Error` if writing or
/// serialization fails. In plain format a guess containing `\n` or `\r`
/// fails with `io::ErrorKind::InvalidData`, since it would read back as two
/// lines.
pub fn stream_write_guesses<I, W>(guesses: I, writer: &mut W, format: OutputFormat) -> io::Result<usize>
where
    I: IntoIterator<Item = Guess>,
    W: Write + ?Sized,
{
    let mut count = 0;
    for guess in guesses {
        match format {
            OutputFormat::Plain => {
                if guess.guess.contains(['\n', '\r']) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!(
                            "guess {:?} contains a line break, use JSON output",
                            guess.guess
                        ),
                    ));
                }
                writer.write_all(guess.guess.as_bytes())?
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut *writer, &guess).map_err(io::Error::other)?
            }
        }
        writer.write_all(b"\n")?;
        count += 1;
    }
    writer.flush()?;

    Ok(count)
}

/// Reads guesses written with [`OutputFormat::Json`].
///
/// Each item is either a parsed guess or an `io::Error` if parsing fails.
pub fn stream_read_guesses<R: Read>(reader: R) -> impl Iterator<Item = io::Result<Guess>> {
    Deserializer::from_reader(reader)
        .into_iter()
        .map(|result| result.map_err(io::Error::other))
}

/// Counts the guesses of a JSON-lines stream by level.
///
/// # Returns
///
/// A map from level to number of guesses, or the first read or parse error.
pub fn level_histogram<R: Read>(reader: R) -> io::Result<BTreeMap<Level, usize>> {
    let mut histogram = BTreeMap::new();
    for guess in stream_read_guesses(reader) {
        *histogram.entry(guess?.level).or_insert(0) += 1;
    }
    Ok(histogram)
}

/// Writes a cursor as pretty-printed JSON.
pub fn save_cursor<W: Write>(cursor: &Cursor, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, cursor)
        .map_err(|e| Error::cursor(format!("Failed to serialize cursor: {}", e)))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Reads a cursor written by [`save_cursor`].
///
/// The cursor is not checked against any model here; `Session::from_cursor`
/// does that.
pub fn load_cursor<R: Read>(reader: R) -> Result<Cursor> {
    serde_json::from_reader(reader)
        .map_err(|e| Error::cursor(format!("Failed to parse cursor JSON: {}", e)))
}
