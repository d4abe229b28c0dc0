//! Property tests for demand accounting and recordings.

mod common;

use common::Probe;
use proptest::prelude::*;
use relay::{
    replay, Completion, Demand, Never, PassthroughSubject, PublisherExt, Record, Recording,
    Sequence,
};

proptest! {
    #[test]
    fn prop_never_exceeds_granted_demand(
        items in prop::collection::vec(any::<i32>(), 0..50),
        demand in 0usize..60,
    ) {
        let source: Sequence<i32> = items.iter().copied().collect();
        let probe = Probe::subscribe(&source, Demand::max(demand));

        let expected = demand.min(items.len());
        prop_assert_eq!(probe.values(), items[..expected].to_vec());
        let finished = probe.completion() == Some(Completion::Finished);
        prop_assert_eq!(finished, demand >= items.len());
    }

    #[test]
    fn prop_incremental_demand_matches_bulk(
        items in prop::collection::vec(any::<u8>(), 0..40),
        steps in prop::collection::vec(0usize..5, 1..20),
    ) {
        let source: Sequence<u8> = items.iter().copied().collect();
        let probe = Probe::subscribe(&source.map(|v| v as u32), Demand::NONE);

        let mut granted = 0usize;
        for step in steps {
            probe.request(Demand::max(step));
            granted += step;
            let delivered = probe.values().len();
            prop_assert_eq!(delivered, granted.min(items.len()));
        }
    }

    #[test]
    fn prop_filter_fills_demand_with_matches(
        items in prop::collection::vec(0i32..100, 0..50),
        demand in 0usize..30,
    ) {
        let source: Sequence<i32> = items.iter().copied().collect();
        let probe = Probe::subscribe(&source.filter(|v| v % 3 == 0), Demand::max(demand));

        let matches: Vec<i32> = items.iter().copied().filter(|v| v % 3 == 0).collect();
        let expected = demand.min(matches.len());
        prop_assert_eq!(probe.values(), matches[..expected].to_vec());
    }

    #[test]
    fn prop_drop_while_is_monotonic(
        items in prop::collection::vec(0i32..10, 0..40),
        threshold in 0i32..10,
    ) {
        let source: Sequence<i32> = items.iter().copied().collect();
        let probe = Probe::subscribe(
            &source.drop_while(move |v| *v < threshold),
            Demand::Unlimited,
        );

        let expected: Vec<i32> = items.iter().copied().skip_while(|v| *v < threshold).collect();
        prop_assert_eq!(probe.values(), expected);
    }

    #[test]
    fn prop_merge_keeps_each_source_ordered(
        pattern in prop::collection::vec(any::<bool>(), 0..60),
    ) {
        let left = PassthroughSubject::<(bool, usize), Never>::new();
        let right = PassthroughSubject::<(bool, usize), Never>::new();
        let probe = Probe::subscribe(&left.clone().merge(right.clone()), Demand::Unlimited);

        for (i, goes_left) in pattern.iter().enumerate() {
            if *goes_left {
                left.send((true, i));
            } else {
                right.send((false, i));
            }
        }

        let values = probe.values();
        prop_assert_eq!(values.len(), pattern.len());
        for side in [true, false] {
            let order: Vec<usize> = values.iter().filter(|(s, _)| *s == side).map(|(_, i)| *i).collect();
            prop_assert!(order.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn prop_recording_round_trip(
        items in prop::collection::vec(any::<i64>(), 0..30),
        failure in prop::option::of("[a-z_]{1,12}"),
    ) {
        let record = Record::<i64, String>::build(|r| {
            for item in &items {
                r.receive(*item);
            }
            r.receive_completion(match &failure {
                Some(error) => Completion::Failed(error.clone()),
                None => Completion::Finished,
            });
        });

        let json = record.recording().to_json().unwrap();
        let decoded = Recording::<i64, String>::from_json(&json).unwrap();
        prop_assert_eq!(decoded.to_json().unwrap(), json);

        let framed = Recording::<i64, String>::from_bytes(&decoded.to_bytes().unwrap()).unwrap();
        prop_assert_eq!(&framed, record.recording());

        let probe = Probe::subscribe(&replay(framed), Demand::Unlimited);
        prop_assert_eq!(probe.values(), items);
        let expected = match failure {
            Some(error) => Completion::Failed(error),
            None => Completion::Finished,
        };
        prop_assert_eq!(probe.completion(), Some(expected));
    }

    #[test]
    fn prop_demand_addition_saturates(a in any::<usize>(), b in any::<usize>()) {
        let sum = Demand::max(a) + Demand::max(b);
        match a.checked_add(b) {
            Some(total) => prop_assert_eq!(sum, Demand::max(total)),
            None => prop_assert!(sum.is_unlimited()),
        }
        prop_assert!((Demand::max(a) + Demand::Unlimited).is_unlimited());
    }
}
