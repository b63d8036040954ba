//! Integration tests for the dispatch scheduler under paused time.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::test_utils::RecordingTransport;
use crate::types::{Payload, SubscriberId};

use super::pacing::DispatchConfig;
use super::scheduler::Dispatcher;

fn recipients(n: i64) -> Vec<SubscriberId> {
    (0..n).map(SubscriberId).collect()
}

fn config() -> DispatchConfig {
    DispatchConfig::new().with_rate_limit(30, Duration::from_secs(1))
}

/// `MakeWriter` that accumulates formatted log lines for assertions.
#[derive(Clone, Default)]
struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test(start_paused = true)]
async fn hundred_recipients_are_paced_across_windows() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));
    let base = Instant::now();

    dispatcher.enqueue(recipients(100), Payload::new("new trip"), None);
    tokio::time::sleep(Duration::from_secs(10)).await;

    let attempts = transport.attempts();
    assert_eq!(attempts.len(), 100);

    // Attempt instants are non-decreasing and batch into window-sized
    // groups one window apart.
    let mut batches: HashMap<Instant, usize> = HashMap::new();
    let mut last = base;
    for attempt in &attempts {
        assert!(attempt.at >= last);
        last = attempt.at;
        *batches.entry(attempt.at).or_default() += 1;
    }
    let mut sizes: Vec<(Instant, usize)> = batches.into_iter().collect();
    sizes.sort();
    assert_eq!(
        sizes,
        vec![
            (base, 30),
            (base + Duration::from_secs(1), 30),
            (base + Duration::from_secs(2), 30),
            (base + Duration::from_secs(3), 10),
        ]
    );

    // No sliding window holds more than the limit.
    for (start, _) in &sizes {
        let in_window: usize = attempts
            .iter()
            .filter(|a| a.at >= *start && a.at < *start + Duration::from_secs(1))
            .count();
        assert!(in_window <= 30);
    }

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn enqueue_does_not_block_and_sends_happen_later() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    dispatcher.enqueue(recipients(30), Payload::new("new trip"), None);
    // Nothing has been delivered yet: the enqueue only handed the request
    // to the scheduler.
    assert!(transport.attempts().is_empty());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.attempts().len(), 30);

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn interleaved_enqueues_keep_arrival_order() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    dispatcher.enqueue(recipients(45), Payload::new("first"), None);
    dispatcher.enqueue(recipients(45), Payload::new("second"), None);
    tokio::time::sleep(Duration::from_secs(10)).await;

    let attempts = transport.attempts();
    assert_eq!(attempts.len(), 90);

    let first_last = attempts
        .iter()
        .filter(|a| a.payload.as_str() == "first")
        .map(|a| a.at)
        .max()
        .unwrap();
    let second_first = attempts
        .iter()
        .filter(|a| a.payload.as_str() == "second")
        .map(|a| a.at)
        .min()
        .unwrap();
    assert!(first_last <= second_first);

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn one_failing_recipient_does_not_block_the_rest() {
    let transport = Arc::new(RecordingTransport::new());
    transport.fail_for(SubscriberId(5));
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    dispatcher.enqueue(recipients(10), Payload::new("new trip"), None);
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Every recipient was attempted exactly once, including those after
    // the failing one.
    assert_eq!(transport.attempted_recipients(), recipients(10));

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failure_is_relayed_once_to_the_notify_target() {
    let transport = Arc::new(RecordingTransport::new());
    transport.fail_for(SubscriberId(5));
    let target = SubscriberId(99);
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    dispatcher.enqueue(recipients(10), Payload::new("trip cancelled"), Some(target));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(transport.attempts_to(target), 1);
    let relay = transport
        .attempts()
        .into_iter()
        .find(|a| a.recipient == target)
        .unwrap();
    assert!(relay.payload.as_str().contains("5"));

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn failing_relay_target_is_swallowed() {
    let transport = Arc::new(RecordingTransport::new());
    transport.fail_for(SubscriberId(5));
    let target = SubscriberId(99);
    transport.fail_for(target);
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    dispatcher.enqueue(recipients(10), Payload::new("new trip"), Some(target));
    tokio::time::sleep(Duration::from_secs(1)).await;

    // The relay was attempted once and its failure went nowhere further.
    assert_eq!(transport.attempts_to(target), 1);
    assert_eq!(transport.attempts().len(), 11);

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn delivery_failure_is_logged_as_a_warning() {
    let logs = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_writer(logs.clone())
        .without_time()
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let transport = Arc::new(RecordingTransport::new());
    transport.fail_for(SubscriberId(5));
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    dispatcher.enqueue(recipients(10), Payload::new("new trip"), None);
    tokio::time::sleep(Duration::from_secs(1)).await;

    let contents = logs.contents();
    assert!(contents.contains("notification delivery failed"));
    assert!(contents.contains("unreachable"));

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn no_sends_without_failures_reach_the_notify_target() {
    let transport = Arc::new(RecordingTransport::new());
    let target = SubscriberId(99);
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    dispatcher.enqueue(recipients(10), Payload::new("new trip"), Some(target));
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(transport.attempts_to(target), 0);

    dispatcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_drops_jobs_still_waiting() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    // Two batches: one due immediately, one a window later.
    dispatcher.enqueue(recipients(60), Payload::new("new trip"), None);
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(transport.attempts().len(), 30);

    dispatcher.shutdown().await;
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(transport.attempts().len(), 30);
}

#[tokio::test(start_paused = true)]
async fn empty_recipient_list_is_a_no_op() {
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = Dispatcher::spawn(config(), Arc::clone(&transport));

    dispatcher.enqueue(Vec::new(), Payload::new("new trip"), None);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(transport.attempts().is_empty());

    dispatcher.shutdown().await;
}
