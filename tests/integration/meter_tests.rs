//! AsyncMeter integration tests

use crossbeam::channel;
use std::sync::Arc;
use std::time::Duration;

use mailbox_metrics::clock::ManualClock;
use mailbox_metrics::executor::{Executor, InlineExecutor, WorkerExecutor};
use mailbox_metrics::metrics::{AsyncMeter, Ewma, TimeUnit, TICK_INTERVAL};

const TIMEOUT: Duration = Duration::from_secs(10);

fn inline_meter(clock: &Arc<ManualClock>, unit: TimeUnit) -> AsyncMeter {
    AsyncMeter::with_clock(Arc::new(InlineExecutor::new()), clock.clone(), unit)
}

fn one_minute(meter: &AsyncMeter) -> f64 {
    let (tx, rx) = channel::bounded(1);
    meter.one_minute_rate(move |rate, _| {
        let _ = tx.send(rate);
    });
    rx.recv_timeout(TIMEOUT).unwrap()
}

fn mean(meter: &AsyncMeter) -> f64 {
    let (tx, rx) = channel::bounded(1);
    meter.mean_rate(move |rate, _| {
        let _ = tx.send(rate);
    });
    rx.recv_timeout(TIMEOUT).unwrap()
}

fn count(meter: &AsyncMeter) -> i64 {
    let (tx, rx) = channel::bounded(1);
    meter.get_count(move |count, _| {
        let _ = tx.send(count);
    });
    rx.recv_timeout(TIMEOUT).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn test_mark_then_idle_decay() {
    let clock = Arc::new(ManualClock::new());
    let meter = inline_meter(&clock, TimeUnit::Seconds);

    meter.mark_n(5);
    assert_eq!(count(&meter), 5);

    clock.set(6_000_000_000);
    let seeded = one_minute(&meter);
    assert_close(seeded, 1.0);
    assert_close(mean(&meter), 5.0 / 6.0);

    // No further marks: every later tick pulls the rate toward zero
    clock.advance(TICK_INTERVAL);
    let decayed = one_minute(&meter);
    assert!(decayed < seeded && decayed > 0.0, "decayed to {decayed}");
    assert_close(decayed, seeded * (1.0 - Ewma::one_minute().alpha()));
}

#[test]
fn test_one_decay_step_per_interval() {
    let clock = Arc::new(ManualClock::new());
    let meter = inline_meter(&clock, TimeUnit::Seconds);

    // First ever tick seeds the instantaneous rate exactly
    meter.mark_n(10);
    clock.advance(TICK_INTERVAL);
    let first = one_minute(&meter);
    assert_close(first, 2.0);

    // Next tick moves strictly between the old rate and the new instant rate
    meter.mark_n(50);
    clock.advance(TICK_INTERVAL);
    let second = one_minute(&meter);
    let instant = 10.0;
    assert!(second > first && second < instant, "second rate {second}");
    assert_close(second, first + Ewma::one_minute().alpha() * (instant - first));
}

#[test]
fn test_idle_period_catches_up_all_ticks() {
    let clock = Arc::new(ManualClock::new());
    let meter = inline_meter(&clock, TimeUnit::Seconds);

    meter.mark_n(3);
    clock.advance(TICK_INTERVAL);
    assert_close(one_minute(&meter), 0.6);

    clock.advance(Duration::from_secs(60));
    let after_minute = one_minute(&meter);
    assert!((after_minute - 0.220_727_664_702_865_6).abs() < 1e-6);
}

#[test]
fn test_mean_rate_zero_without_events() {
    let clock = Arc::new(ManualClock::new());
    let meter = inline_meter(&clock, TimeUnit::Seconds);
    assert_eq!(mean(&meter), 0.0);

    clock.advance(Duration::from_secs(30));
    assert_eq!(mean(&meter), 0.0);
}

#[test]
fn test_mean_rate_after_single_mark() {
    let clock = Arc::new(ManualClock::new());
    let meter = inline_meter(&clock, TimeUnit::Seconds);

    clock.advance(Duration::from_secs(2));
    meter.mark_n(4);
    assert_close(mean(&meter), 2.0);
}

#[test]
fn test_rates_in_configured_unit() {
    let clock = Arc::new(ManualClock::new());
    let meter = inline_meter(&clock, TimeUnit::Minutes);
    assert_eq!(meter.rate_unit(), TimeUnit::Minutes);

    meter.mark_n(5);
    clock.set(6_000_000_000);
    assert_close(mean(&meter), 50.0);
    assert_close(one_minute(&meter), 60.0);
}

#[test]
fn test_worker_backed_meter_snapshot() {
    let worker = Arc::new(WorkerExecutor::spawn("meter-test").unwrap());
    let clock = Arc::new(ManualClock::new());
    let meter = AsyncMeter::with_clock(worker.clone(), clock.clone(), TimeUnit::Seconds);

    for _ in 0..100 {
        meter.mark();
    }
    clock.advance(Duration::from_secs(10));

    let (tx, rx) = channel::bounded(1);
    meter.get_snapshot(move |snapshot, at| {
        let _ = tx.send((snapshot, at));
    });
    let (snapshot, at) = rx.recv_timeout(TIMEOUT).unwrap();

    assert_eq!(snapshot.count, 100);
    assert_close(snapshot.mean_rate, 10.0);
    assert!(snapshot.one_minute_rate > 0.0);
    assert!(snapshot.five_minute_rate > snapshot.one_minute_rate);
    assert!(snapshot.fifteen_minute_rate > snapshot.five_minute_rate);
    assert_eq!(at.timestamp(), 10);

    worker.shutdown(TIMEOUT);
}
