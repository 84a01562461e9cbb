#![allow(dead_code)]

use markov_guesser::{Level, Model, stats::Record};
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

/// Statistics text for a small random model.
///
/// Characters come from `abcdef` in a shuffled load order; some transitions
/// point at characters that never get a start record.
pub fn random_stats(seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut alphabet: Vec<char> = "abcdef".chars().collect();
    alphabet.shuffle(&mut rng);
    let declared = rng.random_range(1..=4);
    let targets: Vec<char> = "abcdefg".chars().collect();

    let mut lines = Vec::new();
    for &symbol in &alphabet[..declared] {
        lines.push(
            Record::Unigram {
                symbol,
                probability: rng.random_range(0..6),
            }
            .to_string(),
        );
        let mut children = targets.clone();
        children.shuffle(&mut rng);
        for &next in &children {
            if rng.random_bool(0.6) {
                lines.push(
                    Record::Bigram {
                        prev: symbol,
                        next,
                        probability: rng.random_range(0..6),
                    }
                    .to_string(),
                );
            }
        }
    }
    lines.join("\n")
}

/// Random band and length limit for a random model.
pub fn random_band(seed: u64) -> (Level, Level, usize) {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    let min = rng.random_range(0..10);
    let max = min + rng.random_range(0..10);
    (min, max, rng.random_range(1..=4))
}

/// Every string of at most `max_length` characters the model can spell,
/// in pre-order, kept when its level lies in `[min, max]`.
pub fn brute_force(model: &Model, min: Level, max: Level, max_length: usize) -> Vec<(String, Level)> {
    let mut out = Vec::new();
    for c in model.characters() {
        let level = Level::from(model.start_probability(c).unwrap());
        visit(model, &mut vec![c], level, min, max, max_length, &mut out);
    }
    out
}

fn visit(
    model: &Model,
    path: &mut Vec<char>,
    level: Level,
    min: Level,
    max: Level,
    max_length: usize,
    out: &mut Vec<(String, Level)>,
) {
    if (min..=max).contains(&level) {
        out.push((path.iter().collect(), level));
    }
    if path.len() == max_length {
        return;
    }
    let last = *path.last().unwrap();
    let children: Vec<_> = model.node(last).unwrap().children().collect();
    for (next, probability) in children {
        path.push(next);
        visit(model, path, level + Level::from(probability), min, max, max_length, out);
        path.pop();
    }
}
