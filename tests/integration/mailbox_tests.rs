//! Mailbox integration tests

use crossbeam::channel::{self, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use mailbox_metrics::executor::{Executor, InlineExecutor, PoolExecutor, WorkerExecutor};
use mailbox_metrics::mailbox::{Handler, Mailbox};

const PRODUCERS: usize = 8;
const PER_PRODUCER: u64 = 2_000;

enum Message {
    Step { producer: usize, seq: u64 },
    Report(Sender<Report>),
}

#[derive(Debug)]
struct Report {
    handled: u64,
    overlaps: usize,
    out_of_order: usize,
}

/// Handler that notices if two drains ever enter it at once
struct ExclusiveCounter {
    busy: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
    handled: u64,
    last_seq: HashMap<usize, u64>,
    out_of_order: usize,
}

impl ExclusiveCounter {
    fn new() -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            overlaps: Arc::new(AtomicUsize::new(0)),
            handled: 0,
            last_seq: HashMap::new(),
            out_of_order: 0,
        }
    }
}

impl Handler<Message> for ExclusiveCounter {
    fn handle(&mut self, message: Message) -> anyhow::Result<()> {
        if self.busy.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }

        match message {
            Message::Step { producer, seq } => {
                if let Some(&last) = self.last_seq.get(&producer) {
                    if seq <= last {
                        self.out_of_order += 1;
                    }
                }
                self.last_seq.insert(producer, seq);
                self.handled += 1;
                if seq % 64 == 0 {
                    thread::yield_now();
                }
            }
            Message::Report(reply) => {
                let _ = reply.send(Report {
                    handled: self.handled,
                    overlaps: self.overlaps.load(Ordering::SeqCst),
                    out_of_order: self.out_of_order,
                });
            }
        }

        self.busy.store(false, Ordering::SeqCst);
        Ok(())
    }
}

fn hammer(executor: Arc<dyn Executor>) -> Report {
    let mailbox = Mailbox::named("exclusive", executor, ExclusiveCounter::new());

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let mailbox = mailbox.clone();
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    mailbox.send(Message::Step { producer, seq });
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    let (tx, rx) = channel::bounded(1);
    mailbox.send(Message::Report(tx));
    rx.recv_timeout(Duration::from_secs(30)).unwrap()
}

#[test]
fn test_exclusive_on_pool() {
    let report = hammer(Arc::new(PoolExecutor::new(4).unwrap()));
    assert_eq!(report.overlaps, 0);
    assert_eq!(report.out_of_order, 0);
    assert_eq!(report.handled, PRODUCERS as u64 * PER_PRODUCER);
}

#[test]
fn test_exclusive_on_worker() {
    let worker = Arc::new(WorkerExecutor::spawn("mailbox-test").unwrap());
    let report = hammer(worker.clone());
    assert_eq!(report.overlaps, 0);
    assert_eq!(report.out_of_order, 0);
    assert_eq!(report.handled, PRODUCERS as u64 * PER_PRODUCER);
    assert!(worker.stop_timeout(Duration::from_secs(5)));
}

#[test]
fn test_exclusive_on_inline() {
    // Producers drain on their own threads, so the flag is what keeps them apart
    let report = hammer(Arc::new(InlineExecutor::new()));
    assert_eq!(report.overlaps, 0);
    assert_eq!(report.out_of_order, 0);
    assert_eq!(report.handled, PRODUCERS as u64 * PER_PRODUCER);
}

#[test]
fn test_failing_messages_do_not_block_later_ones() {
    let pool: Arc<dyn Executor> = Arc::new(PoolExecutor::new(2).unwrap());
    let (tx, rx) = channel::unbounded();

    let mailbox = Mailbox::new(pool, move |n: u32| -> anyhow::Result<()> {
        if n % 3 == 0 {
            anyhow::bail!("multiple of three: {n}");
        }
        if n % 5 == 0 {
            panic!("multiple of five: {n}");
        }
        tx.send(n)?;
        Ok(())
    });

    for n in 1..=30 {
        mailbox.send(n);
    }

    let expected: Vec<u32> = (1..=30).filter(|n| n % 3 != 0 && n % 5 != 0).collect();
    let received: Vec<u32> = expected
        .iter()
        .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(received, expected);
}

#[test]
fn test_stopped_executor_drops_messages() {
    let worker = Arc::new(WorkerExecutor::spawn("stopped-mailbox").unwrap());
    assert!(worker.stop_timeout(Duration::from_secs(5)));

    let (tx, rx) = channel::unbounded();
    let mailbox = Mailbox::new(worker, move |n: u8| -> anyhow::Result<()> {
        tx.send(n)?;
        Ok(())
    });
    mailbox.send(1);

    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}
