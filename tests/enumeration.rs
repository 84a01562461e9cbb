mod common;

use std::{collections::HashSet, sync::mpsc, thread, time::Duration};

use markov_guesser::{Cursor, Error, Guess, Level, Model, ModelBuilder, Session};

fn run(model: &Model, min: Level, max: Level, max_length: usize) -> Vec<(String, Level)> {
    let cursor = Cursor::with_limits(model, min, max, Some(max_length)).unwrap();
    Session::from_cursor(model, cursor)
        .unwrap()
        .map(|g| (g.guess, g.level))
        .collect()
}

#[test]
fn enumeration_matches_brute_force_reference() {
    for seed in 0..300 {
        let model: Model = common::random_stats(seed).parse().unwrap();
        let (min, max, max_length) = common::random_band(seed);

        let expected = common::brute_force(&model, min, max, max_length);
        let actual = run(&model, min, max, max_length);
        assert_eq!(
            actual, expected,
            "seed {} band [{}, {}] length {}",
            seed, min, max, max_length
        );
    }
}

#[test]
fn every_guess_is_in_band_and_unique() {
    for seed in 0..300 {
        let model: Model = common::random_stats(seed).parse().unwrap();
        let (min, max, max_length) = common::random_band(seed);

        let guesses = run(&model, min, max, max_length);
        let mut seen = HashSet::new();
        for (guess, level) in &guesses {
            assert!((min..=max).contains(level), "{} at level {}", guess, level);
            assert!(guess.chars().count() <= max_length);
            assert!(seen.insert(guess.clone()), "{} produced twice", guess);
        }
    }
}

#[test]
fn fresh_sessions_repeat_the_same_sequence() {
    for seed in 0..50 {
        let model: Model = common::random_stats(seed).parse().unwrap();
        let (min, max, max_length) = common::random_band(seed);
        assert_eq!(
            run(&model, min, max, max_length),
            run(&model, min, max, max_length)
        );
    }
}

#[test]
fn documented_scenario() {
    let model: Model = "0=proba1[97]\n5=proba1[98]\n0=proba2[97*256+97]\n3=proba2[97*256+98]"
        .parse()
        .unwrap();
    assert_eq!(
        run(&model, 0, 3, 2),
        vec![
            ("a".to_owned(), 0),
            ("aa".to_owned(), 0),
            ("ab".to_owned(), 3),
        ]
    );
}

#[test]
fn heavy_edge_prunes_an_endless_subtree() {
    // b→b costs nothing, so the subtree under "ab" never ends; only pruning
    // at "ab" lets the session terminate without a length limit.
    let mut builder = ModelBuilder::new();
    builder.add_unigram('a', 0).add_unigram('b', 9);
    builder.add_bigram('a', 'b', 5).unwrap();
    builder.add_bigram('b', 'b', 0).unwrap();
    builder.add_bigram('a', 'c', 1).unwrap();
    builder.add_unigram('c', 4);
    let model = builder.finish();

    let guesses: Vec<String> = Session::new(&model, 0, 3)
        .unwrap()
        .map(|g| g.guess)
        .collect();
    assert_eq!(guesses, vec!["a", "ac"]);
}

#[test]
fn zero_weight_cycle_without_length_limit_is_rejected() {
    let model: Model = "0=proba1[97]\n0=proba2[97*256+97]\n5=proba1[98]"
        .parse()
        .unwrap();
    assert_eq!(model.endless_from(), Some(0));
    assert!(matches!(Session::new(&model, 1, 3), Err(Error::InvalidRange(_))));
    assert!(matches!(Session::new(&model, 0, 0), Err(Error::InvalidRange(_))));
}

#[test]
fn zero_weight_cycle_with_length_limit_terminates() {
    let model: Model = "0=proba1[97]\n0=proba2[97*256+97]\n5=proba1[98]"
        .parse()
        .unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let cursor = Cursor::with_limits(&model, 1, 3, Some(6)).unwrap();
        let guesses: Vec<Guess> = Session::from_cursor(&model, cursor).unwrap().collect();
        let _ = tx.send(guesses);
    });

    let guesses = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("enumeration did not finish");
    assert!(guesses.is_empty());
}

#[test]
fn zero_weight_cycle_above_the_band_is_accepted() {
    let model: Model = "0=proba1[97]\n4=proba1[98]\n0=proba2[98*256+98]\n1=proba2[97*256+98]"
        .parse()
        .unwrap();
    assert_eq!(model.endless_from(), Some(1));

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let guesses: Vec<String> = Session::new(&model, 0, 0).unwrap().map(|g| g.guess).collect();
        let _ = tx.send(guesses);
    });
    let guesses = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("enumeration did not finish");
    assert_eq!(guesses, vec!["a"]);
}

#[test]
fn zero_band_yields_single_zero_character() {
    let model: Model = "0=proba1[120]\n1=proba2[120*256+120]".parse().unwrap();
    let mut session = Session::new(&model, 0, 0).unwrap();
    assert_eq!(session.next().map(|g| (g.guess, g.level)), Some(("x".to_owned(), 0)));
    assert_eq!(session.next(), None);
    assert_eq!(session.next(), None);
}

#[test]
fn narrow_band_only_keeps_exact_levels() {
    for seed in 0..100 {
        let model: Model = common::random_stats(seed).parse().unwrap();
        let (min, _, max_length) = common::random_band(seed);
        let guesses = run(&model, min, min, max_length);
        assert!(guesses.iter().all(|(_, level)| *level == min));
        assert_eq!(guesses, common::brute_force(&model, min, min, max_length));
    }
}

#[test]
fn characters_without_start_record_never_appear() {
    let model: Model = "1=proba1[97]\n0=proba2[97*256+122]\n1=proba2[97*256+97]"
        .parse()
        .unwrap();
    let guesses: Vec<String> = run(&model, 0, 10, 3).into_iter().map(|(g, _)| g).collect();
    assert_eq!(guesses, vec!["a", "aa", "aaa"]);
}

#[test]
fn sessions_share_one_model_across_threads() {
    let model: Model = common::random_stats(7).parse().unwrap();
    let bands = [(0, 4), (5, 9), (10, 14)];
    let expected: Vec<_> = bands.iter().map(|&(min, max)| run(&model, min, max, 4)).collect();

    let actual: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = bands
            .iter()
            .map(|&(min, max)| {
                let model = &model;
                scope.spawn(move || run(model, min, max, 4))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(actual, expected);
}

#[test]
fn invalid_sessions_are_rejected() {
    let model: Model = "0=proba1[97]".parse().unwrap();
    assert!(matches!(Session::new(&model, 2, 1), Err(Error::InvalidRange(_))));

    let empty: Model = "".parse().unwrap();
    assert!(empty.is_empty());
    assert!(matches!(Session::new(&empty, 0, 1), Err(Error::InvalidRange(_))));
}
