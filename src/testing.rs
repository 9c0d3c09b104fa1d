// Helpers shared by the unit tests
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::factor_types::factor_trait::{Assignment, Factor, Identity};
use crate::factor_types::factor_type::FactorType;
use crate::maxsum::communication_adapter::CommunicationAdapter;
use crate::maxsum::errors::FactorResult;
use crate::maxsum::operator::Operator;

pub const TOLERANCE: f64 = 1e-9;
pub const CROSS_CHECK_RUNS: usize = 300;
pub const MAX_NEIGHBORS: usize = 10;

// Identity given to factors under test, neighbors are 0..n
pub const TESTED: usize = 1000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Captures every send instead of delivering it
pub struct RecordingAdapter<T> {
    sent: Vec<(f64, T, T)>,
}

impl<T: Identity> RecordingAdapter<T> {
    pub fn new() -> Self {
        RecordingAdapter { sent: Vec::new() }
    }

    pub fn sent(&self) -> &[(f64, T, T)] {
        &self.sent
    }

    // Last message sent to `recipient`
    pub fn sent_to(&self, recipient: &T) -> Option<f64> {
        self.sent
            .iter()
            .rev()
            .find(|(_, _, to)| to == recipient)
            .map(|(message, _, _)| *message)
    }
}

impl<T: Identity> CommunicationAdapter<T> for RecordingAdapter<T> {
    fn send(&mut self, message: f64, sender: &T, recipient: &T) -> FactorResult<()> {
        self.sent.push((message, sender.clone(), recipient.clone()));
        Ok(())
    }
}

// Equal infinities (and NaNs) count as equal
pub fn is_close(actual: f64, expected: f64) -> bool {
    actual == expected
        || (actual.is_nan() && expected.is_nan())
        || (actual - expected).abs() <= TOLERANCE
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        is_close(actual, expected),
        "expected {}, got {}",
        expected,
        actual
    );
}

pub fn assert_all_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
    for (index, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            is_close(*a, *e),
            "message to neighbor {}: expected {:?}, got {:?}",
            index,
            expected,
            actual
        );
    }
}

// Links neighbors 0..n
pub fn link<F: Factor<usize>>(factor: &mut F, n_neighbors: usize) {
    for neighbor in 0..n_neighbors {
        factor.add_neighbor(neighbor);
    }
}

// Feeds `messages[i]` from neighbor i, runs the factor and returns what it sent to each
// neighbor 0..n
pub fn run_with_messages<F: Factor<usize>>(factor: &mut F, messages: &[f64]) -> Vec<f64> {
    for (neighbor, message) in messages.iter().enumerate() {
        factor.receive(*message, &neighbor).unwrap();
    }
    let mut adapter = RecordingAdapter::new();
    factor.run(&mut adapter).unwrap();
    (0..messages.len())
        .map(|neighbor| {
            adapter
                .sent_to(&neighbor)
                .unwrap_or_else(|| panic!("nothing sent to neighbor {}", neighbor))
        })
        .collect()
}

// Checks a specialized factor against a tabular one built for the same function, on random
// incoming messages and random assignments. `build` returns (specialized, reference) linked to
// neighbors 0..n.
pub fn cross_check<B>(seed: u64, mut build: B)
where
    B: FnMut(Operator, usize, &mut ChaCha8Rng) -> (FactorType<usize>, FactorType<usize>),
{
    init_logging();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..CROSS_CHECK_RUNS {
        let n_neighbors = rng.random_range(1..=MAX_NEIGHBORS);
        let messages: Vec<f64> = (0..n_neighbors)
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();
        let assignment: Assignment<usize> = (0..n_neighbors)
            .map(|neighbor| (neighbor, rng.random_bool(0.5)))
            .collect();

        for operator in [Operator::Maximize, Operator::Minimize] {
            let (mut specific, mut reference) = build(operator, n_neighbors, &mut rng);

            let expected = run_with_messages(&mut reference, &messages);
            let actual = run_with_messages(&mut specific, &messages);
            assert_all_close(&actual, &expected);

            assert_close(
                specific.evaluate(&assignment).unwrap(),
                reference.evaluate(&assignment).unwrap(),
            );
        }
    }
}

// Checks that a factor built under Maximize with every potential negated (`sign` = -1) mirrors
// the same factor built under Minimize: negated messages in give negated messages out, and
// every assignment evaluates to the negated value. `build` gets identical random draws for
// both operators and must multiply its potentials by `sign`.
pub fn duality_check<B>(seed: u64, mut build: B)
where
    B: FnMut(Operator, f64, usize, &mut ChaCha8Rng) -> FactorType<usize>,
{
    init_logging();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..CROSS_CHECK_RUNS {
        let n_neighbors = rng.random_range(1..=MAX_NEIGHBORS);
        let messages: Vec<f64> = (0..n_neighbors)
            .map(|_| rng.random_range(-1.0..1.0))
            .collect();
        let negated: Vec<f64> = messages.iter().map(|message| -message).collect();
        let assignment: Assignment<usize> = (0..n_neighbors)
            .map(|neighbor| (neighbor, rng.random_bool(0.5)))
            .collect();
        let build_seed: u64 = rng.random();

        let mut minimize = build(
            Operator::Minimize,
            1.,
            n_neighbors,
            &mut ChaCha8Rng::seed_from_u64(build_seed),
        );
        let mut maximize = build(
            Operator::Maximize,
            -1.,
            n_neighbors,
            &mut ChaCha8Rng::seed_from_u64(build_seed),
        );

        let expected: Vec<f64> = run_with_messages(&mut minimize, &messages)
            .into_iter()
            .map(|message| -message)
            .collect();
        assert_all_close(&run_with_messages(&mut maximize, &negated), &expected);

        assert_close(
            maximize.evaluate(&assignment).unwrap(),
            -minimize.evaluate(&assignment).unwrap(),
        );
    }
}
