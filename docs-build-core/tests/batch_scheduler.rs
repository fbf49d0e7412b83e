use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use docs_build_core::batch::{BatchPartialFailure, BoundedBatchScheduler, FailedItem};

/// Tracks how many workers are active and the highest value seen.
#[derive(Default)]
struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
    starts: Mutex<Vec<usize>>,
}

impl Gauge {
    fn enter(&self, index: usize) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.starts.lock().unwrap().push(index);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn limit_two_over_five_items_with_a_slow_second_item() {
    let gauge = Gauge::default();
    let delays_ms = [10u64, 150, 10, 10, 10];

    let report = BoundedBatchScheduler::new(2)
        .run(delays_ms.to_vec(), |delay, index| {
            let gauge = &gauge;
            async move {
                gauge.enter(index);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                gauge.leave();
                Ok::<usize, String>(index * 10)
            }
        })
        .await;

    assert!(gauge.peak.load(Ordering::SeqCst) <= 2, "more than 2 in flight");
    assert_eq!(*gauge.starts.lock().unwrap(), vec![0, 1, 2, 3, 4]);

    assert_eq!(report.len(), 5);
    let indices: Vec<usize> = report.tasks().iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    assert_eq!(report.success_count(), 5);

    assert_eq!(report.completion_order().len(), 5);
    assert_eq!(report.completion_order().last(), Some(&1), "slow item settles last");

    let values = report.into_result().unwrap();
    assert_eq!(values, vec![0, 10, 20, 30, 40]);
}

#[tokio::test]
async fn one_failure_does_not_stop_the_batch() {
    let items: Vec<&str> = vec!["a.htm", "b.htm", "broken.htm", "d.htm", "e.htm", "f.htm"];

    let report = BoundedBatchScheduler::new(3)
        .run(items, |name, _| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if name.starts_with("broken") {
                Err(format!("server refused {name}"))
            } else {
                Ok(name.len())
            }
        })
        .await;

    assert_eq!(report.len(), 6);
    assert_eq!(report.success_count(), 5);
    let failures: Vec<(usize, &String)> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, 2);
    for task in report.tasks() {
        assert_eq!(task.is_success(), task.index != 2, "index {}", task.index);
    }

    let err = report.into_result().unwrap_err();
    assert_eq!(
        err,
        BatchPartialFailure {
            total: 6,
            failed: vec![FailedItem {
                index: 2,
                reason: "server refused broken.htm".to_string()
            }],
        }
    );
    assert_eq!(err.to_string(), "1 of 6 batch items failed");
}

#[tokio::test]
async fn limit_one_is_strictly_sequential() {
    let gauge = Gauge::default();
    let report = BoundedBatchScheduler::new(1)
        .run(vec![30u64, 5, 20, 1], |delay, index| {
            let gauge = &gauge;
            async move {
                gauge.enter(index);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                gauge.leave();
                Ok::<_, String>(())
            }
        })
        .await;

    assert_eq!(gauge.peak.load(Ordering::SeqCst), 1);
    assert_eq!(*gauge.starts.lock().unwrap(), vec![0, 1, 2, 3]);
    assert_eq!(report.completion_order(), &[0, 1, 2, 3]);
}

#[tokio::test]
async fn limit_above_item_count_fans_out_fully() {
    let gauge = Gauge::default();
    let report = BoundedBatchScheduler::new(16)
        .run(vec![(); 4], |_, index| {
            let gauge = &gauge;
            async move {
                gauge.enter(index);
                tokio::time::sleep(Duration::from_millis(40)).await;
                gauge.leave();
                Ok::<_, String>(index)
            }
        })
        .await;

    assert_eq!(gauge.peak.load(Ordering::SeqCst), 4);
    assert_eq!(report.success_count(), 4);
}

#[tokio::test]
async fn empty_input_completes_immediately() {
    let calls = AtomicUsize::new(0);
    let report = BoundedBatchScheduler::new(4)
        .run(Vec::<u8>::new(), |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), String>(()) }
        })
        .await;

    assert!(report.is_empty());
    assert!(report.completion_order().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(report.into_result().unwrap(), Vec::<()>::new());
}

#[test]
fn zero_limit_is_treated_as_one() {
    assert_eq!(BoundedBatchScheduler::new(0).limit(), 1);
}
