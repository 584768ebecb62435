//! Proptest strategies for key layouts

use std::collections::BTreeSet;

use proptest::prelude::*;

/// Sorted, distinct, positive ids spread sparsely over `1..=max`
pub fn sparse_ids_strategy(max: i64, count: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::btree_set(1..=max, 1..=count)
        .prop_map(|ids: BTreeSet<i64>| ids.into_iter().collect())
}

/// Ids plus a halt position within them
pub fn ids_with_halt_strategy() -> impl Strategy<Value = (Vec<i64>, usize)> {
    sparse_ids_strategy(5_000, 120)
        .prop_flat_map(|ids| {
            let len = ids.len();
            (Just(ids), 0..len)
        })
}
