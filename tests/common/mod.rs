use std::ops::RangeInclusive;

use lazytreap::{AggregateKind, ImplicitTreap};
use proptest::prelude::*;

/// Something to perform in one round of tests
///
/// Indices are raw draws; they are folded into the current length when the
/// round is played, so every round is valid whatever came before it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RoundAction {
    Insert { index: usize, value: i64 },
    Delete { index: usize },
    Add { a: usize, b: usize, delta: i64 },
    Reverse { a: usize, b: usize },
    Query { a: usize, b: usize, kind: AggregateKind },
    Kth { index: usize },
}

/// The result after one round of querying
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RoundResult {
    Empty,
    Value(i64),
}

pub fn kind_strategy() -> impl Strategy<Value = AggregateKind> {
    prop_oneof![
        Just(AggregateKind::Sum),
        Just(AggregateKind::Min),
        Just(AggregateKind::Max),
    ]
}

pub fn round_action_strategy() -> impl Strategy<Value = RoundAction> {
    let index = 0..10_000usize;
    prop_oneof![
        3 => (index.clone(), -1000..1000i64)
            .prop_map(|(index, value)| RoundAction::Insert { index, value }),
        1 => index.clone().prop_map(|index| RoundAction::Delete { index }),
        2 => (index.clone(), index.clone(), -100..100i64)
            .prop_map(|(a, b, delta)| RoundAction::Add { a, b, delta }),
        2 => (index.clone(), index.clone())
            .prop_map(|(a, b)| RoundAction::Reverse { a, b }),
        2 => (index.clone(), index.clone(), kind_strategy())
            .prop_map(|(a, b, kind)| RoundAction::Query { a, b, kind }),
        1 => index.prop_map(|index| RoundAction::Kth { index }),
    ]
}

/// Fold two raw draws into an inclusive range inside `0..len`
pub fn fold_range(a: usize, b: usize, len: usize) -> Option<RangeInclusive<usize>> {
    if len == 0 {
        return None;
    }
    let (a, b) = (a % len, b % len);
    Some(a.min(b)..=a.max(b))
}

/// Brute-force aggregate over a slice
pub fn naive_query(values: &[i64], kind: AggregateKind) -> i64 {
    match kind {
        AggregateKind::Sum => values.iter().sum(),
        AggregateKind::Min => values.iter().copied().min().unwrap_or(i64::MAX),
        AggregateKind::Max => values.iter().copied().max().unwrap_or(i64::MIN),
    }
}

/// Play one round on the reference `Vec`
pub fn play_model(model: &mut Vec<i64>, action: RoundAction) -> RoundResult {
    let len = model.len();
    match action {
        RoundAction::Insert { index, value } => {
            model.insert(index % (len + 1), value);
            RoundResult::Empty
        }
        RoundAction::Delete { index } if len > 0 => RoundResult::Value(model.remove(index % len)),
        RoundAction::Add { a, b, delta } => {
            if let Some(range) = fold_range(a, b, len) {
                model[range].iter_mut().for_each(|value| *value += delta);
            }
            RoundResult::Empty
        }
        RoundAction::Reverse { a, b } => {
            if let Some(range) = fold_range(a, b, len) {
                model[range].reverse();
            }
            RoundResult::Empty
        }
        RoundAction::Query { a, b, kind } => match fold_range(a, b, len) {
            Some(range) => RoundResult::Value(naive_query(&model[range], kind)),
            None => RoundResult::Empty,
        },
        RoundAction::Kth { index } if len > 0 => RoundResult::Value(model[index % len]),
        RoundAction::Delete { .. } | RoundAction::Kth { .. } => RoundResult::Empty,
    }
}

/// Play the same round on the treap
pub fn play_treap(treap: &mut ImplicitTreap<i64>, action: RoundAction) -> RoundResult {
    let len = treap.len();
    match action {
        RoundAction::Insert { index, value } => {
            treap.insert_at(index % (len + 1), value).unwrap();
            RoundResult::Empty
        }
        RoundAction::Delete { index } if len > 0 => {
            RoundResult::Value(treap.erase_at(index % len).unwrap())
        }
        RoundAction::Add { a, b, delta } => {
            if let Some(range) = fold_range(a, b, len) {
                treap.range_add(range, delta).unwrap();
            }
            RoundResult::Empty
        }
        RoundAction::Reverse { a, b } => {
            if let Some(range) = fold_range(a, b, len) {
                treap.range_reverse(range).unwrap();
            }
            RoundResult::Empty
        }
        RoundAction::Query { a, b, kind } => match fold_range(a, b, len) {
            Some(range) => RoundResult::Value(treap.range_query(range, kind).unwrap()),
            None => RoundResult::Empty,
        },
        RoundAction::Kth { index } if len > 0 => {
            RoundResult::Value(treap.kth_element(index % len + 1).unwrap())
        }
        RoundAction::Delete { .. } | RoundAction::Kth { .. } => RoundResult::Empty,
    }
}

/// Run `actions` against both the treap and the reference, failing on the
/// first divergence
pub fn check_consistency_proptest(
    seed: u64,
    initial: &[i64],
    actions: &[RoundAction],
) -> Result<(), TestCaseError> {
    let mut model = initial.to_vec();
    let mut treap = ImplicitTreap::<i64>::builder()
        .seed(seed)
        .build_from(initial.iter().copied());

    for (round, &action) in actions.iter().enumerate() {
        let expected = play_model(&mut model, action);
        let found = play_treap(&mut treap, action);
        prop_assert_eq!(found, expected, "round {}: {:?}", round, action);
        prop_assert_eq!(treap.len(), model.len());
        treap.assert_invariants();
    }
    prop_assert_eq!(treap.to_vec(), model);
    Ok(())
}
