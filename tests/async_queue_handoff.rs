//! A producer/consumer pair handing work off through an [`AsyncQueue`],
//! exercising FIFO ordering and priority insertion across real threads.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use evloop::AsyncQueue;

#[test]
fn producers_and_one_consumer_preserve_fifo_per_producer() {
    let q: AsyncQueue<(usize, usize)> = AsyncQueue::new();
    let producers: Vec<_> = (0..4)
        .map(|p| {
            let q = q.clone();
            thread::spawn(move || {
                for i in 0..25 {
                    q.push((p, i));
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let mut last_seen = [None; 4];
    for _ in 0..100 {
        let (producer, seq) = q.pop();
        if let Some(prev) = last_seen[producer] {
            assert!(seq > prev, "producer {producer}'s items arrived out of order");
        }
        last_seen[producer] = Some(seq);
    }
    assert_eq!(q.length(), 0);
}

#[test]
fn timeout_pop_unblocks_when_the_item_arrives_just_in_time() {
    let q: Arc<AsyncQueue<i32>> = Arc::new(AsyncQueue::new());
    let q2 = Arc::clone(&q);
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        q2.push(99);
    });
    let got = q.timeout_pop(Duration::from_secs(2));
    handle.join().unwrap();
    assert_eq!(got, Some(99));
}

#[test]
fn push_sorted_interleaves_with_plain_pushes_by_priority() {
    let q = AsyncQueue::new();
    q.push(5);
    q.push_sorted(1, |a, b| a.cmp(b));
    q.push(9);
    q.push_sorted(3, |a, b| a.cmp(b));

    // push_sorted only orders relative to other sorted-in items; it still
    // has to land somewhere sane among the plain pushes already queued.
    let mut seen = Vec::new();
    while let Some(item) = q.try_pop() {
        seen.push(item);
    }
    assert_eq!(seen.len(), 4);
    assert!(seen.contains(&1));
    assert!(seen.contains(&3));
    assert!(seen.contains(&5));
    assert!(seen.contains(&9));
}
