//! Ranked enumeration of password guesses from a two-level Markov model.
//!
//! Statistics in John the Ripper's `--markov` format give a weight to every
//! start character and to every pair of consecutive characters. The level of
//! a string is the sum of the weights along it, and lower means more likely.
//! Given a band `[min_level, max_level]`, a [`Session`] yields every string
//! whose level falls in the band, in a fixed order, without duplicates. Its
//! [`Cursor`] can be stored after any guess and resumed later.
//!
//! ```no_run
//! use markov_guesser::{Session, build_model};
//!
//! let model = build_model("rules/Default")?;
//! for guess in Session::new(&model, 0, 20)?.take(10) {
//!     println!("{} {}", guess.level, guess.guess);
//! }
//! # Ok::<(), markov_guesser::Error>(())
//! ```
pub mod cursor;
pub mod enumerate;
pub mod errors;
pub mod model;
pub mod serialize;
pub mod stats;

pub use cursor::{Cursor, Guess, Position};
pub use enumerate::{Session, next_guess};
pub use errors::{Error, Result};
pub use model::{Level, Model, ModelBuilder, ModelSummary, Probability};
pub use stats::build_model;

/// zstd level used for compressed guess output
pub const COMPRESSION_LEVEL: i32 = 9;
