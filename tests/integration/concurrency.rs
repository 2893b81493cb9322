use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use prioq_core::Message;
use prioq_services::DequeueOptions;

use crate::*;

/// Competing consumers on one topic never see the same message twice, and
/// together they see every message.
#[test]
fn test_competing_consumers_get_each_message_once() {
    const TOTAL: usize = 20_000;
    const CONSUMERS: usize = 8;

    let engine = engine();
    for i in 0..TOTAL {
        engine
            .enqueue("root", "m", Bytes::new(), (i % 4) as i32)
            .unwrap();
    }

    let barrier = Arc::new(Barrier::new(CONSUMERS));
    let handles: Vec<_> = (0..CONSUMERS)
        .map(|n| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let mut got = Vec::new();
                loop {
                    let batch = engine.dequeue("root", 1 + (n as i64 % 3)).unwrap();
                    if batch.is_empty() {
                        return got;
                    }
                    got.extend(batch.iter().map(Message::id));
                }
            })
        })
        .collect();

    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert_eq!(all.len(), TOTAL);
    assert_unique(&all);
    all.sort_unstable();
    assert_eq!(all, (1..=TOTAL as u64).collect::<Vec<_>>());
}

/// Producers and consumers running at once lose nothing.
#[test]
fn test_producers_and_consumers_interleave() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 5_000;
    const TOTAL: usize = PRODUCERS * PER_PRODUCER;

    let engine = engine();
    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let engine = engine.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    engine
                        .enqueue("jobs", format!("p{p}-{i}"), Bytes::new(), (i % 3) as i32)
                        .unwrap();
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut got = Vec::new();
                let mut idle = 0;
                while idle < 200 {
                    let batch = engine.dequeue("jobs", 16).unwrap();
                    if batch.is_empty() {
                        idle += 1;
                        thread::sleep(Duration::from_micros(200));
                    } else {
                        idle = 0;
                        got.extend(batch.iter().map(Message::id));
                    }
                }
                got
            })
        })
        .collect();

    for p in producers {
        p.join().unwrap();
    }
    let mut all: Vec<u64> = consumers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.extend(ids(&drain(&engine, "jobs")));

    assert_eq!(all.len(), TOTAL);
    assert_unique(&all);
}

/// Producers from many threads touching a brand new topic all land in it.
#[test]
fn test_first_touch_race_keeps_every_message() {
    const THREADS: usize = 16;

    let engine = engine();
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let engine = engine.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                engine.enqueue("fresh", "m", Bytes::new(), 0).unwrap()
            })
        })
        .collect();

    let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=THREADS as u64).collect::<Vec<_>>());
    assert_eq!(engine.active_topics().len(), 1);
    assert_eq!(engine.topic_stats("fresh").unwrap().ready, THREADS);
}

/// Leased consumers racing with the sweeper: every message is acked once.
#[test]
fn test_leases_survive_concurrent_sweeps() {
    const TOTAL: usize = 2_000;

    let engine = engine();
    for _ in 0..TOTAL {
        engine.enqueue("work", "m", Bytes::new(), 0).unwrap();
    }

    let sweeper = {
        let engine = engine.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                engine.sweep();
                thread::sleep(Duration::from_micros(100));
            }
        })
    };

    let lease = DequeueOptions {
        lease: Duration::from_secs(60),
    };
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || {
                let mut acked = Vec::new();
                loop {
                    let batch = engine.dequeue_with("work", 8, lease).unwrap();
                    if batch.is_empty() {
                        return acked;
                    }
                    for msg in batch {
                        engine.ack("work", msg.id()).unwrap();
                        acked.push(msg.id());
                    }
                }
            })
        })
        .collect();

    let all: Vec<u64> = consumers
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    sweeper.join().unwrap();

    assert_eq!(all.len(), TOTAL);
    assert_unique(&all);
    let stats = engine.topic_stats("work").unwrap();
    assert_eq!((stats.ready, stats.leased), (0, 0));
    assert_eq!(engine.counters().acked, TOTAL as u64);
}
