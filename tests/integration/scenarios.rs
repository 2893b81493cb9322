use std::time::Duration;

use bytes::Bytes;
use prioq_core::ErrorKind;
use prioq_services::{DequeueOptions, EnqueueOptions};

use crate::*;

// ── Core scenarios ────────────────────────────────────────────────────────────

#[test]
fn test_more_urgent_message_leaves_first() {
    let engine = engine();
    engine.enqueue("root", "k1", Bytes::from_static(b"\x01"), 0).unwrap();
    engine.enqueue("root", "k2", Bytes::from_static(b"\x02"), 1).unwrap();

    let out = engine.dequeue("root", 1).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].meta(), "k1");
    assert_eq!(out[0].payload().as_ref(), b"\x01");
    assert_eq!(out[0].priority(), 0);
}

#[test]
fn test_batch_comes_back_in_priority_order() {
    let engine = engine();
    for p in [4, 3, 2, 1, 0] {
        engine.enqueue("root", format!("p{p}"), Bytes::new(), p).unwrap();
    }

    let out = engine.dequeue("root", 5).unwrap();
    let priorities: Vec<i32> = out.iter().map(|m| m.priority()).collect();
    assert_eq!(priorities, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_unknown_topic_dequeues_empty() {
    let engine = engine();
    let out = engine.dequeue("unknown-topic", 3).unwrap();
    assert!(out.is_empty());
    // Polling must not create the topic.
    assert!(engine.active_topics().is_empty());
}

#[test]
fn test_hundred_thousand_single_dequeues() {
    const TOTAL: usize = 100_000;
    let engine = engine();
    for i in 0..TOTAL {
        engine
            .enqueue("root", "m", Bytes::new(), (i % 5) as i32)
            .unwrap();
    }

    let out = drain(&engine, "root");
    assert_eq!(out.len(), TOTAL);
    assert_unique(&ids(&out));
    assert!(out.windows(2).all(|w| w[0].priority() <= w[1].priority()));
    assert!(engine.dequeue("root", 1).unwrap().is_empty());
}

// ── Ordering properties ───────────────────────────────────────────────────────

#[test]
fn test_urgent_lane_drains_before_later_lanes() {
    let engine = engine();
    let order = [3, 0, 2, 0, 1, 3, 0, 2];
    for (i, p) in order.iter().enumerate() {
        engine.enqueue("root", format!("m{i}"), Bytes::new(), *p).unwrap();
    }

    let out = engine.dequeue("root", order.len() as i64).unwrap();
    let priorities: Vec<i32> = out.iter().map(|m| m.priority()).collect();
    assert_eq!(priorities, vec![0, 0, 0, 1, 2, 2, 3, 3]);
}

#[test]
fn test_equal_priority_is_fifo() {
    let engine = engine();
    for i in 0..20 {
        engine.enqueue("root", format!("m{i}"), Bytes::new(), 7).unwrap();
    }

    let out = drain(&engine, "root");
    let ids = ids(&out);
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids out of order: {ids:?}");
    assert_eq!(metas(&out)[0], "m0");
}

#[test]
fn test_count_bounds_batch() {
    let engine = engine();
    for _ in 0..3 {
        engine.enqueue("root", "m", Bytes::new(), 0).unwrap();
    }

    assert_eq!(engine.dequeue("root", 2).unwrap().len(), 2);
    // Asking for more than is resident returns what is there.
    assert_eq!(engine.dequeue("root", 10).unwrap().len(), 1);
    assert!(engine.dequeue("root", 10).unwrap().is_empty());
}

#[test]
fn test_drained_topic_is_empty_not_error() {
    let engine = engine();
    engine.enqueue("root", "m", Bytes::new(), 0).unwrap();
    engine.dequeue("root", 1).unwrap();

    assert!(engine.dequeue("root", 1).unwrap().is_empty());
    let stats = engine.topic_stats("root").unwrap();
    assert_eq!(stats.ready, 0);
    assert_eq!(stats.last_id, 1);
}

#[test]
fn test_topics_are_isolated() {
    let engine = engine();
    engine.enqueue("a", "from-a", Bytes::new(), 5).unwrap();
    engine.enqueue("b", "from-b", Bytes::new(), 0).unwrap();

    let out = engine.dequeue("a", 10).unwrap();
    assert_eq!(metas(&out), vec!["from-a"]);
    assert_eq!(engine.topic_stats("b").unwrap().ready, 1);
}

#[test]
fn test_ids_increase_per_topic() {
    let engine = engine();
    let a1 = engine.enqueue("a", "m", Bytes::new(), 0).unwrap();
    let a2 = engine.enqueue("a", "m", Bytes::new(), 0).unwrap();
    let b1 = engine.enqueue("b", "m", Bytes::new(), 0).unwrap();
    assert!(a2 > a1);
    assert_eq!(b1, 1);
}

// ── Validation ────────────────────────────────────────────────────────────────

#[test]
fn test_rejected_requests_leave_state_untouched() {
    let engine = bounded_engine(4, 2, 9);

    let err = engine.enqueue("", "m", Bytes::new(), 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = engine.enqueue("root", "m", Bytes::new(), -1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = engine.enqueue("root", "m", Bytes::new(), 10).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let err = engine
        .enqueue("root", "m", Bytes::from_static(b"12345"), 0)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PayloadTooLarge);

    // None of the above created the topic.
    assert!(engine.active_topics().is_empty());

    engine.enqueue("root", "m", Bytes::from_static(b"1234"), 9).unwrap();
    engine.enqueue("root", "m", Bytes::new(), 0).unwrap();
    let err = engine.enqueue("root", "m", Bytes::new(), 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueueFull);
    assert_eq!(engine.topic_stats("root").unwrap().ready, 2);

    assert_eq!(engine.counters().enqueued, 2);
    assert_eq!(engine.counters().rejected, 5);
}

#[test]
fn test_non_positive_count_is_invalid() {
    let engine = engine();
    for count in [0, -3] {
        let err = engine.dequeue("root", count).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_full_topic_accepts_again_after_dequeue() {
    let engine = bounded_engine(0, 1, i32::MAX);
    engine.enqueue("root", "a", Bytes::new(), 0).unwrap();
    assert!(engine.enqueue("root", "b", Bytes::new(), 0).is_err());

    engine.dequeue("root", 1).unwrap();
    engine.enqueue("root", "b", Bytes::new(), 0).unwrap();
}

// ── Delays and leases ─────────────────────────────────────────────────────────

#[test]
fn test_delayed_message_waits_for_its_time() {
    let engine = engine();
    let opts = EnqueueOptions {
        deliver_after: Duration::from_millis(100),
    };
    engine
        .enqueue_at("root", "later".into(), Bytes::new(), 0, opts, 1_000)
        .unwrap();
    engine
        .enqueue_at("root", "now".into(), Bytes::new(), 5, EnqueueOptions::default(), 1_000)
        .unwrap();

    let out = engine
        .dequeue_at("root", 10, DequeueOptions::default(), 1_050)
        .unwrap();
    assert_eq!(metas(&out), vec!["now"]);

    let out = engine
        .dequeue_at("root", 10, DequeueOptions::default(), 1_100)
        .unwrap();
    assert_eq!(metas(&out), vec!["later"]);
}

#[test]
fn test_acked_lease_is_gone_for_good() {
    let engine = engine();
    engine.enqueue("root", "job", Bytes::new(), 0).unwrap();

    let lease = DequeueOptions {
        lease: Duration::from_millis(50),
    };
    let out = engine.dequeue_at("root", 1, lease, 1_000).unwrap();
    let id = out[0].id();
    engine.ack_at("root", id, 1_010).unwrap();

    engine.sweep_at(10_000);
    assert!(engine
        .dequeue_at("root", 1, DequeueOptions::default(), 10_000)
        .unwrap()
        .is_empty());

    let err = engine.ack_at("root", id, 10_000).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_expired_lease_redelivers_in_id_order() {
    let engine = engine();
    for i in 0..3 {
        engine.enqueue("root", format!("m{i}"), Bytes::new(), 0).unwrap();
    }

    let lease = DequeueOptions {
        lease: Duration::from_millis(50),
    };
    let first = engine.dequeue_at("root", 1, lease, 1_000).unwrap();
    assert_eq!(first[0].meta(), "m0");

    let released = engine.sweep_at(1_050);
    assert_eq!(released.expired, 1);

    // m0 slots back in ahead of m1.
    let out = engine
        .dequeue_at("root", 3, DequeueOptions::default(), 1_050)
        .unwrap();
    assert_eq!(metas(&out), vec!["m0", "m1", "m2"]);
    assert_eq!(out[0].id(), first[0].id());
    assert_eq!(engine.topic_stats("root").unwrap().redelivered, 1);

    let err = engine.ack_at("root", first[0].id(), 1_060).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_nack_can_retag_and_delay() {
    let engine = engine();
    engine.enqueue("root", "attempt-1", Bytes::new(), 2).unwrap();

    let lease = DequeueOptions {
        lease: Duration::from_secs(30),
    };
    let out = engine.dequeue_at("root", 1, lease, 1_000).unwrap();
    engine
        .nack_at(
            "root",
            out[0].id(),
            Some("attempt-2".into()),
            Duration::from_millis(200),
            1_100,
        )
        .unwrap();

    assert!(engine
        .dequeue_at("root", 1, DequeueOptions::default(), 1_200)
        .unwrap()
        .is_empty());

    let again = engine
        .dequeue_at("root", 1, DequeueOptions::default(), 1_300)
        .unwrap();
    assert_eq!(again[0].meta(), "attempt-2");
    assert_eq!(again[0].id(), out[0].id());
    assert_eq!(again[0].priority(), 2);
}

#[test]
fn test_settling_unknown_topic_is_not_found() {
    let engine = engine();
    assert_eq!(engine.ack("ghost", 1).unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(
        engine
            .nack("ghost", 1, None, Duration::ZERO)
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        engine.topic_stats("ghost").unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_leased_messages_count_toward_resident_limit() {
    let engine = bounded_engine(0, 1, i32::MAX);
    engine.enqueue("root", "a", Bytes::new(), 0).unwrap();

    let lease = DequeueOptions {
        lease: Duration::from_secs(30),
    };
    engine.dequeue_with("root", 1, lease).unwrap();

    let err = engine.enqueue("root", "b", Bytes::new(), 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::QueueFull);
}
