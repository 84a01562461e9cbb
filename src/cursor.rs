//! Per-session traversal state.
//!
//! A [`Cursor`] holds the level bounds of one enumeration request and the
//! position reached so far. It is plain data: it serialises to JSON so a
//! session can be stopped after any guess and picked up later against the
//! same model.
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    errors::{Error, Result},
    model::{Level, Model},
};

/// Where a cursor stands in the enumeration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Position {
    /// Nothing produced yet
    Start,
    /// Last guess produced, with its level
    At { path: Vec<char>, level: Level },
    /// No guess left, ever
    Exhausted,
}

/// A produced candidate string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guess {
    pub guess: String,
    pub level: Level,
}

/// Bounds and position of one enumeration session.
///
/// # Invariants
/// - `min_level <= max_level`
/// - `max_length`, when set, is at least 1
/// - in `Position::At`, `level` is the level of `path` and lies within the
///   bounds
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    min_level: Level,
    max_level: Level,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_length: Option<usize>,
    pub(crate) position: Position,
}

impl Cursor {
    /// Creates a cursor enumerating guesses with a level in
    /// `[min_level, max_level]`.
    ///
    /// # Errors
    /// Returns `Error::InvalidRange` if `min_level > max_level`, if the model
    /// has no characters, or if the band reaches
    /// [`Model::endless_from`] and would never run out of guesses.
    pub fn new(model: &Model, min_level: Level, max_level: Level) -> Result<Self> {
        Self::with_limits(model, min_level, max_level, None)
    }

    /// Like [`Cursor::new`], also keeping guesses to at most `max_length`
    /// characters when a limit is given.
    ///
    /// A length limit makes every band finite, including bands over
    /// zero-weight cycles such as `a→a` with weight 0.
    ///
    /// # Errors
    /// Returns `Error::InvalidRange` for the cases of [`Cursor::new`] and for
    /// a `max_length` of 0.
    pub fn with_limits(
        model: &Model,
        min_level: Level,
        max_level: Level,
        max_length: Option<usize>,
    ) -> Result<Self> {
        let cursor = Self {
            min_level,
            max_level,
            max_length,
            position: Position::Start,
        };
        cursor.check_limits(model)?;
        Ok(cursor)
    }

    /// Lowest level a guess may have.
    pub fn min_level(&self) -> Level {
        self.min_level
    }

    /// Highest level a guess may have.
    pub fn max_level(&self) -> Level {
        self.max_level
    }

    /// Length limit in characters, if any.
    pub fn max_length(&self) -> Option<usize> {
        self.max_length
    }

    /// Position reached so far.
    pub fn position(&self) -> &Position {
        &self.position
    }

    /// Whether every guess of the band has been produced.
    pub fn is_exhausted(&self) -> bool {
        self.position == Position::Exhausted
    }

    /// Whether `level` lies within the bounds, both inclusive.
    pub fn contains(&self, level: Level) -> bool {
        (self.min_level..=self.max_level).contains(&level)
    }

    /// Checks that this cursor can continue against `model`.
    ///
    /// Used when a cursor comes back from storage: the bounds must still hold
    /// and the stored path must be spelled by the model with the stored
    /// level.
    ///
    /// # Errors
    /// Returns `Error::InvalidRange` for broken bounds and `Error::Cursor` for
    /// a path the model does not know.
    pub fn validate(&self, model: &Model) -> Result<()> {
        self.check_limits(model)?;

        let Position::At { path, level } = &self.position else {
            return Ok(());
        };
        if path.is_empty() {
            return Err(Error::cursor("stored path is empty"));
        }
        if self.max_length.is_some_and(|limit| path.len() > limit) {
            return Err(Error::cursor(format!(
                "stored path has {} characters, above the limit of {:?}",
                path.len(),
                self.max_length
            )));
        }
        let expected = path_level(model, path).ok_or_else(|| {
            Error::cursor(format!(
                "path '{}' cannot be spelled by the model",
                path.iter().collect::<String>()
            ))
        })?;
        if expected != *level {
            return Err(Error::cursor(format!(
                "stored level {} does not match computed level {}",
                level, expected
            )));
        }
        if !self.contains(expected) {
            return Err(Error::cursor(format!(
                "stored level {} is outside [{}, {}]",
                expected, self.min_level, self.max_level
            )));
        }
        Ok(())
    }

    fn check_limits(&self, model: &Model) -> Result<()> {
        if self.min_level > self.max_level {
            return Err(Error::invalid_range(format!(
                "min level {} is above max level {}",
                self.min_level, self.max_level
            )));
        }
        if self.max_length == Some(0) {
            return Err(Error::invalid_range("max length must be at least 1"));
        }
        if model.is_empty() {
            return Err(Error::invalid_range("the model has no characters"));
        }
        if let (None, Some(endless)) = (self.max_length, model.endless_from()) {
            if endless <= self.max_level {
                return Err(Error::invalid_range(format!(
                    "zero-weight cycles give infinitely many guesses from level {} up, \
                     set a max length or keep max level below {}",
                    endless, endless
                )));
            }
        }
        Ok(())
    }
}

/// Level of `path`: start weight of its first character plus the weight of
/// every transition along it.
///
/// Returns `None` if any character or transition is unknown to the model.
pub fn path_level(model: &Model, path: &[char]) -> Option<Level> {
    let start = Level::from(model.start_probability(*path.first()?)?);
    path.iter().tuple_windows().try_fold(start, |level, (&prev, &next)| {
        model
            .transition(prev, next)
            .map(|probability| level + Level::from(probability))
    })
}
