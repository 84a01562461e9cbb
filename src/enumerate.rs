//! Ranked enumeration of guesses within a level band.
//!
//! Guesses are the paths of an implicit trie: the root's children are the
//! start characters in load order, and the children of a character are its
//! transitions in load order. Enumeration is a depth-first pre-order walk of
//! that trie which
//!
//! - prunes a node and its whole subtree as soon as its level exceeds
//!   `max_level` (weights are unsigned, so levels never decrease on descent),
//! - emits a node when its level is at least `min_level`,
//! - stops descending at `max_length` characters when a limit is set.
//!
//! Siblings are ordered by load order and not by weight, so pruning one
//! sibling never prunes the next one, at any depth. Each call resumes from
//! the path stored in the cursor; no other state is kept between calls.
use std::{iter::FusedIterator, mem};

use log::debug;

use crate::{
    cursor::{Cursor, Guess, Position},
    errors::Result,
    model::{Level, Model},
};

/// Outcome of moving sideways in the trie.
enum Widen {
    /// Moved to an in-range node
    Found,
    /// Moved to a node below `min_level`; search continues beneath it
    Descend,
    /// No sibling left at any depth
    Exhausted,
}

/// Advances `cursor` to the next guess of its band.
///
/// Returns `None` once the band holds no further guess; the cursor is then
/// exhausted and every later call returns `None` again.
///
/// The cursor must come from [`Cursor::new`] on this model, or have passed
/// [`Cursor::validate`] against it. A cursor from another model ends up
/// exhausted.
pub fn next_guess(model: &Model, cursor: &mut Cursor) -> Option<Guess> {
    let position = mem::replace(&mut cursor.position, Position::Exhausted);
    let walker = Walker {
        model,
        cursor: &*cursor,
    };

    let (mut path, mut level) = match position {
        Position::Exhausted => return None,
        Position::Start => {
            let head = model.head()?;
            let level = Level::from(model.start_probability(head)?);
            if walker.cursor.contains(level) {
                return Some(settle(cursor, vec![head], level));
            }
            (vec![head], level)
        }
        Position::At { path, level } => (path, level),
    };

    if walker.advance(&mut path, &mut level) {
        Some(settle(cursor, path, level))
    } else {
        debug!(
            "Band [{}, {}] exhausted",
            cursor.min_level(),
            cursor.max_level()
        );
        None
    }
}

fn settle(cursor: &mut Cursor, path: Vec<char>, level: Level) -> Guess {
    let guess = Guess {
        guess: path.iter().collect(),
        level,
    };
    cursor.position = Position::At { path, level };
    guess
}

struct Walker<'a> {
    model: &'a Model,
    cursor: &'a Cursor,
}

impl Walker<'_> {
    /// Moves from the current node to the next emitted node in pre-order.
    fn advance(&self, path: &mut Vec<char>, level: &mut Level) -> bool {
        loop {
            if self.dig_deeper(path, level) {
                return true;
            }
            match self.dig_wider(path, level) {
                Widen::Found => return true,
                Widen::Descend => continue,
                Widen::Exhausted => return false,
            }
        }
    }

    /// Goes from `a` to `aa` to `aaa`, taking the first child that is not
    /// pruned at each step, until a node reaches `min_level`.
    ///
    /// Returns `false` without emitting when the current node has no child
    /// left to visit; `path` then ends on the deepest node reached.
    fn dig_deeper(&self, path: &mut Vec<char>, level: &mut Level) -> bool {
        loop {
            if *level > self.cursor.max_level() {
                return false;
            }
            if self
                .cursor
                .max_length()
                .is_some_and(|limit| path.len() >= limit)
            {
                return false;
            }
            let Some(&last) = path.last() else {
                return false;
            };
            let Some((next, next_level)) =
                self.first_fitting(last, self.model.first_child(last), *level)
            else {
                return false;
            };

            path.push(next);
            *level = next_level;
            if next_level >= self.cursor.min_level() {
                return true;
            }
        }
    }

    /// Replaces the last character of `path` by its next sibling that is not
    /// pruned, backing up one level each time a parent runs out of children.
    fn dig_wider(&self, path: &mut Vec<char>, level: &mut Level) -> Widen {
        loop {
            let Some(last) = path.pop() else {
                return Widen::Exhausted;
            };

            let Some(&parent) = path.last() else {
                return self.next_start(last, path, level);
            };

            let Some(probability) = self.model.transition(parent, last) else {
                return Widen::Exhausted;
            };
            *level -= Level::from(probability);

            let sibling = self.model.child_sibling_after(parent, last);
            if let Some((next, next_level)) = self.first_fitting(parent, sibling, *level) {
                path.push(next);
                *level = next_level;
                return self.classify(next_level);
            }
        }
    }

    /// Moves along the top-level chain after `last`, skipping characters
    /// whose start weight alone exceeds `max_level`.
    fn next_start(&self, last: char, path: &mut Vec<char>, level: &mut Level) -> Widen {
        let found = std::iter::successors(self.model.top_sibling_after(last), |&c| {
            self.model.top_sibling_after(c)
        })
        .find_map(|c| {
            let start = Level::from(self.model.start_probability(c)?);
            (start <= self.cursor.max_level()).then_some((c, start))
        });

        match found {
            Some((start_char, start_level)) => {
                path.push(start_char);
                *level = start_level;
                self.classify(start_level)
            }
            None => Widen::Exhausted,
        }
    }

    /// First child of `parent`, scanning from `from` in load order, whose
    /// level stays within `max_level`.
    fn first_fitting(&self, parent: char, from: Option<char>, base: Level) -> Option<(char, Level)> {
        std::iter::successors(from, |&c| self.model.child_sibling_after(parent, c)).find_map(|c| {
            let candidate = base + Level::from(self.model.transition(parent, c)?);
            (candidate <= self.cursor.max_level()).then_some((c, candidate))
        })
    }

    fn classify(&self, level: Level) -> Widen {
        if self.cursor.contains(level) {
            Widen::Found
        } else {
            Widen::Descend
        }
    }
}

/// An enumeration session over a shared model.
///
/// Iterating yields every guess whose level lies in the cursor's band, each
/// exactly once, in a fixed order. The model is only read, so any number of
/// sessions may run over the same model at once.
#[derive(Debug)]
pub struct Session<'m> {
    model: &'m Model,
    cursor: Cursor,
}

impl<'m> Session<'m> {
    /// Starts a session over `[min_level, max_level]`.
    ///
    /// # Errors
    /// Returns `Error::InvalidRange` if `min_level > max_level`, if the model
    /// is empty, or if the band holds infinitely many guesses (see
    /// [`Model::endless_from`]).
    pub fn new(model: &'m Model, min_level: Level, max_level: Level) -> Result<Self> {
        Ok(Self {
            model,
            cursor: Cursor::new(model, min_level, max_level)?,
        })
    }

    /// Continues from a cursor, fresh or restored from storage.
    ///
    /// # Errors
    /// Returns the error of [`Cursor::validate`].
    pub fn from_cursor(model: &'m Model, cursor: Cursor) -> Result<Self> {
        cursor.validate(model)?;
        debug!(
            "Session over [{}, {}] at {:?}",
            cursor.min_level(),
            cursor.max_level(),
            cursor.position()
        );
        Ok(Self { model, cursor })
    }

    /// Cursor at the last guess produced, ready to be saved.
    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Ends the session, keeping its position.
    pub fn into_cursor(self) -> Cursor {
        self.cursor
    }
}

impl Iterator for Session<'_> {
    type Item = Guess;

    fn next(&mut self) -> Option<Guess> {
        next_guess(self.model, &mut self.cursor)
    }
}

impl FusedIterator for Session<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Error, model::ModelBuilder};

    fn scenario() -> Model {
        let mut builder = ModelBuilder::new();
        builder.add_unigram('a', 0).add_unigram('b', 5);
        builder.add_bigram('a', 'a', 0).unwrap();
        builder.add_bigram('a', 'b', 3).unwrap();
        builder.finish()
    }

    fn collect(model: &Model, cursor: Cursor) -> Vec<(String, Level)> {
        Session::from_cursor(model, cursor)
            .unwrap()
            .map(|g| (g.guess, g.level))
            .collect()
    }

    #[test]
    fn scenario_with_two_character_limit() {
        let model = scenario();
        let cursor = Cursor::with_limits(&model, 0, 3, Some(2)).unwrap();
        assert_eq!(
            collect(&model, cursor),
            vec![
                ("a".to_owned(), 0),
                ("aa".to_owned(), 0),
                ("ab".to_owned(), 3)
            ]
        );
    }

    #[test]
    fn exhaustion_is_permanent() {
        let model = scenario();
        let mut cursor = Cursor::with_limits(&model, 0, 3, Some(2)).unwrap();
        while next_guess(&model, &mut cursor).is_some() {}
        assert!(cursor.is_exhausted());
        let before = cursor.clone();
        for _ in 0..3 {
            assert_eq!(next_guess(&model, &mut cursor), None);
        }
        assert_eq!(cursor, before);
    }

    #[test]
    fn zero_band_with_zero_start() {
        let mut builder = ModelBuilder::new();
        builder.add_unigram('x', 0);
        let model = builder.finish();
        let mut session = Session::new(&model, 0, 0).unwrap();
        assert_eq!(
            session.next(),
            Some(Guess {
                guess: "x".to_owned(),
                level: 0
            })
        );
        assert_eq!(session.next(), None);
        assert!(session.cursor().is_exhausted());
    }

    #[test]
    fn first_guess_may_be_deep_when_start_is_below_band() {
        let mut builder = ModelBuilder::new();
        builder.add_unigram('a', 1).add_unigram('b', 2);
        builder.add_bigram('a', 'b', 2).unwrap();
        builder.add_bigram('b', 'a', 1).unwrap();
        let model = builder.finish();
        let cursor = Cursor::with_limits(&model, 3, 4, Some(3)).unwrap();
        assert_eq!(
            collect(&model, cursor),
            vec![
                ("ab".to_owned(), 3),
                ("aba".to_owned(), 4),
                ("ba".to_owned(), 3)
            ]
        );
    }

    #[test]
    fn pruned_first_child_does_not_hide_its_siblings() {
        let mut builder = ModelBuilder::new();
        builder.add_unigram('a', 0);
        builder.add_bigram('a', 'x', 9).unwrap();
        builder.add_unigram('x', 0);
        builder.add_bigram('a', 'y', 1).unwrap();
        builder.add_unigram('y', 0);
        let model = builder.finish();
        let cursor = Cursor::with_limits(&model, 0, 3, Some(2)).unwrap();
        let guesses: Vec<String> = collect(&model, cursor).into_iter().map(|(g, _)| g).collect();
        assert_eq!(guesses, vec!["a", "ay", "x", "y"]);
    }

    #[test]
    fn heavy_start_character_does_not_end_the_band() {
        let mut builder = ModelBuilder::new();
        builder.add_unigram('a', 0).add_unigram('z', 9).add_unigram('b', 1);
        let model = builder.finish();
        let cursor = Cursor::new(&model, 0, 2).unwrap();
        let guesses: Vec<String> = collect(&model, cursor).into_iter().map(|(g, _)| g).collect();
        assert_eq!(guesses, vec!["a", "b"]);
    }

    #[test]
    fn heavy_head_is_skipped() {
        let mut builder = ModelBuilder::new();
        builder.add_unigram('z', 9).add_unigram('a', 0);
        builder.add_bigram('z', 'a', 0).unwrap();
        let model = builder.finish();
        let cursor = Cursor::new(&model, 0, 2).unwrap();
        let guesses: Vec<String> = collect(&model, cursor).into_iter().map(|(g, _)| g).collect();
        assert_eq!(guesses, vec!["a"]);
    }

    #[test]
    fn band_above_every_guess_is_empty() {
        let model = scenario();
        let cursor = Cursor::with_limits(&model, 100, 200, Some(3)).unwrap();
        assert!(collect(&model, cursor).is_empty());
    }

    #[test]
    fn scenario_without_length_limit_is_rejected() {
        let model = scenario();
        assert!(matches!(
            Session::new(&model, 0, 3),
            Err(Error::InvalidRange(_))
        ));
    }

    #[test]
    fn session_rejects_inverted_bounds() {
        let model = scenario();
        assert!(matches!(
            Session::new(&model, 3, 2),
            Err(Error::InvalidRange(_))
        ));
    }
}
