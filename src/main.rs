//! Mailbox Metrics - Demo driver
//!
//! Drives a counter, meter and histogram from several producer threads on
//! the configured executor and logs what they report.

use anyhow::{Context, Result};
use crossbeam::channel;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

use mailbox_metrics::clock::SystemClock;
use mailbox_metrics::executor::Executor;
use mailbox_metrics::metrics::{AsyncCounter, AsyncHistogram, AsyncMeter};
use mailbox_metrics::{Config, VERSION};

const PRODUCERS: usize = 4;
const EVENTS_PER_PRODUCER: i64 = 10_000;

fn main() -> Result<()> {
    // Optional config path; defaults apply without one
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {:?}", path))?,
        None => Config::default(),
    };

    mailbox_metrics::util::init_tracing(&config.logging)?;

    info!(
        version = VERSION,
        executor = ?config.executor.kind,
        rate_unit = %config.metrics.rate_unit,
        "Starting mailbox metrics demo"
    );

    let executor = config.executor.build()?;
    let clock = Arc::new(SystemClock::new());

    let requests = AsyncCounter::with_clock(executor.clone(), clock.clone());
    let events = AsyncMeter::with_clock(executor.clone(), clock.clone(), config.metrics.rate_unit);
    let latency = AsyncHistogram::with_boxed_reservoir(
        executor.clone(),
        config.metrics.build_reservoir(),
        clock,
    );

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|id| {
            let requests = requests.clone();
            let events = events.clone();
            let latency = latency.clone();
            thread::Builder::new()
                .name(format!("producer-{id}"))
                .spawn(move || {
                    for i in 0..EVENTS_PER_PRODUCER {
                        requests.increment();
                        events.mark();
                        latency.update((i * 7 + id as i64 * 13) % 1_000);
                    }
                })
        })
        .collect::<std::io::Result<_>>()
        .context("Failed to spawn producer thread")?;

    for producer in producers {
        if producer.join().is_err() {
            warn!("Producer thread panicked");
        }
    }

    let (tx, rx) = channel::unbounded::<String>();

    let t = tx.clone();
    requests.get_count(move |count, at| {
        let _ = t.send(format!("requests count={count} at={at}"));
    });

    let t = tx.clone();
    events.get_snapshot(move |snapshot, at| {
        let _ = t.send(format!(
            "events count={} m1={:.2} m5={:.2} m15={:.2} mean={:.2} per {} at={at}",
            snapshot.count,
            snapshot.one_minute_rate,
            snapshot.five_minute_rate,
            snapshot.fifteen_minute_rate,
            snapshot.mean_rate,
            snapshot.rate_unit,
        ));
    });

    let t = tx.clone();
    latency.get_snapshot(move |snapshot, at| {
        let _ = t.send(format!(
            "latency samples={} median={:.1} p95={:.1} p99={:.1} p999={:.1} at={at}",
            snapshot.size(),
            snapshot.median(),
            snapshot.p95(),
            snapshot.p99(),
            snapshot.p999(),
        ));
    });

    let t = tx;
    latency.get_std_dev(move |std_dev, at| {
        let _ = t.send(format!("latency std_dev={std_dev:.2} at={at}"));
    });

    for _ in 0..4 {
        match rx.recv_timeout(config.executor.stop_timeout()) {
            Ok(line) => info!("{line}"),
            Err(_) => {
                warn!("Timed out waiting for metric readings");
                break;
            }
        }
    }

    executor.shutdown(config.executor.stop_timeout());
    info!(
        stop_timeout_ms = config.executor.stop_timeout().as_millis() as u64,
        "Demo finished"
    );
    Ok(())
}
