//! AsyncHistogram integration tests

use crossbeam::channel;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use mailbox_metrics::clock::SystemClock;
use mailbox_metrics::executor::{Executor, InlineExecutor, PoolExecutor};
use mailbox_metrics::metrics::{
    AsyncHistogram, SlidingWindowReservoir, Snapshot, UniformReservoir,
};

const TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
struct Stats {
    snapshot: Snapshot,
    count: i64,
    min: i64,
    max: i64,
    mean: f64,
    std_dev: f64,
}

fn collect(histogram: &AsyncHistogram) -> Stats {
    let (snap_tx, snap_rx) = channel::bounded(1);
    histogram.get_snapshot(move |s, _| {
        let _ = snap_tx.send(s);
    });
    let (count_tx, count_rx) = channel::bounded(1);
    histogram.get_count(move |v, _| {
        let _ = count_tx.send(v);
    });
    let (min_tx, min_rx) = channel::bounded(1);
    histogram.get_min(move |v, _| {
        let _ = min_tx.send(v);
    });
    let (max_tx, max_rx) = channel::bounded(1);
    histogram.get_max(move |v, _| {
        let _ = max_tx.send(v);
    });
    let (mean_tx, mean_rx) = channel::bounded(1);
    histogram.get_mean(move |v, _| {
        let _ = mean_tx.send(v);
    });
    let (sd_tx, sd_rx) = channel::bounded(1);
    histogram.get_std_dev(move |v, _| {
        let _ = sd_tx.send(v);
    });

    Stats {
        snapshot: snap_rx.recv_timeout(TIMEOUT).unwrap(),
        count: count_rx.recv_timeout(TIMEOUT).unwrap(),
        min: min_rx.recv_timeout(TIMEOUT).unwrap(),
        max: max_rx.recv_timeout(TIMEOUT).unwrap(),
        mean: mean_rx.recv_timeout(TIMEOUT).unwrap(),
        std_dev: sd_rx.recv_timeout(TIMEOUT).unwrap(),
    }
}

#[test]
fn test_one_through_five() {
    let histogram = AsyncHistogram::new(Arc::new(InlineExecutor::new()));
    for v in 1..=5 {
        histogram.update(v);
    }

    let stats = collect(&histogram);
    assert_eq!(stats.count, 5);
    assert_eq!(stats.min, 1);
    assert_eq!(stats.max, 5);
    assert!((stats.mean - 3.0).abs() < 1e-12);
    assert!((stats.std_dev - 2.5_f64.sqrt()).abs() < 1e-12);
    assert_eq!(stats.snapshot.median(), 3.0);
    assert_eq!(stats.snapshot.size(), 5);
}

#[test]
fn test_empty_histogram_reports_zero() {
    let histogram = AsyncHistogram::new(Arc::new(InlineExecutor::new()));
    let stats = collect(&histogram);

    assert_eq!(stats.count, 0);
    assert_eq!(stats.min, 0);
    assert_eq!(stats.max, 0);
    assert_eq!(stats.mean, 0.0);
    assert_eq!(stats.std_dev, 0.0);
    assert_eq!(stats.snapshot.median(), 0.0);
    assert_eq!(stats.snapshot.p999(), 0.0);
}

#[test]
fn test_percentile_ordering_on_random_samples() {
    let executor: Arc<dyn Executor> = Arc::new(PoolExecutor::new(2).unwrap());
    let mut rng = rand::rng();

    for round in 0..20 {
        let histogram = AsyncHistogram::with_reservoir(
            executor.clone(),
            UniformReservoir::new(256),
            Arc::new(SystemClock::new()),
        );

        let samples = rng.random_range(1..2_000);
        for _ in 0..samples {
            histogram.update(rng.random_range(-10_000..10_000));
        }

        let stats = collect(&histogram);
        let s = &stats.snapshot;
        assert_eq!(stats.count, samples, "round {round}");
        assert!(s.p75() <= s.p95(), "round {round}");
        assert!(s.p95() <= s.p98(), "round {round}");
        assert!(s.p98() <= s.p99(), "round {round}");
        assert!(s.p99() <= s.p999(), "round {round}");
        assert!(s.p999() <= stats.max as f64, "round {round}");
        assert!(stats.min as f64 <= stats.mean, "round {round}");
        assert!(stats.mean <= stats.max as f64, "round {round}");
        assert!(s.size() <= 256, "round {round}");
    }
}

#[test]
fn test_sliding_window_forgets_old_values() {
    let histogram = AsyncHistogram::with_reservoir(
        Arc::new(InlineExecutor::new()),
        SlidingWindowReservoir::new(4),
        Arc::new(SystemClock::new()),
    );
    for v in [100, 200, 1, 2, 3, 4] {
        histogram.update(v);
    }

    let stats = collect(&histogram);
    assert_eq!(stats.snapshot.values(), &[1, 2, 3, 4]);
    // Running statistics still cover every value
    assert_eq!(stats.count, 6);
    assert_eq!(stats.max, 200);
}
