mod common;

use std::sync::Arc;

use common::*;
use proptest::prelude::*;

use tasker_bulk::cursor::MemoryCursorBackend;
use tasker_bulk::driver::callback;
use tasker_bulk::{FetchContext, QueryArgs, Record};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Property: halting anywhere and resuming visits every record exactly once, in order
    #[test]
    fn halt_and_resume_visits_each_record_once(
        (ids, halt_at) in ids_with_halt_strategy(),
        page_size in 1i64..25,
    ) {
        let store = store_with_posts(ids.iter().copied());
        let backend = Arc::new(MemoryCursorBackend::new());
        let args = QueryArgs::new().with("posts_per_page", page_size);
        let halt_key = ids[halt_at];

        let (first, second, watermark) = runtime().block_on(async {
            let mut first = Vec::new();
            let outcome = task_for("prop", store.clone(), backend.clone())
                .with_stepping(64)
                .run(
                    "post",
                    args.clone(),
                    callback::from_fn(|record: &Record, _: &FetchContext| {
                        if record.ordering_key() == halt_key {
                            return false;
                        }
                        first.push(record.ordering_key());
                        true
                    }),
                )
                .await
                .unwrap();

            let mut second = Vec::new();
            task_for("prop", store.clone(), backend.clone())
                .with_stepping(64)
                .run(
                    "post",
                    args.clone(),
                    callback::from_fn(|record: &Record, _: &FetchContext| {
                        second.push(record.ordering_key());
                    }),
                )
                .await
                .unwrap();
            (first, second, outcome.watermark())
        });

        prop_assert_eq!(&first[..], &ids[..halt_at]);
        // Empty windows before the halting record may have moved the watermark past the previous id
        let floor = if halt_at == 0 { 0 } else { ids[halt_at - 1] };
        prop_assert!(watermark >= floor && watermark < halt_key);
        let mut all = first;
        all.extend(second);
        prop_assert_eq!(all, ids);
    }

    /// Property: the number of fetches is bounded by windows plus pages, however sparse the ids
    #[test]
    fn skip_ahead_terminates(ids in sparse_ids_strategy(200_000, 40), stepping in 100i64..5_000) {
        let store = store_with_posts(ids.iter().copied());
        let max_id = *ids.last().unwrap();

        let (seen, windows) = runtime().block_on(async {
            let mut seen = Vec::new();
            let outcome = task_for("prop_sparse", store.clone(), Arc::new(MemoryCursorBackend::new()))
                .with_stepping(stepping)
                .run(
                    "post",
                    QueryArgs::new(),
                    callback::from_fn(|record: &Record, _: &FetchContext| {
                        seen.push(record.ordering_key());
                    }),
                )
                .await
                .unwrap();
            (seen, outcome.summary().windows)
        });

        prop_assert_eq!(seen, ids.clone());
        let bound = (max_id / stepping) as u64 + ids.len() as u64 + 1;
        prop_assert!(windows <= bound, "{} windows for bound {}", windows, bound);
    }
}
