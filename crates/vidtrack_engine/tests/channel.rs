use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;
use vidtrack_core::{ChannelStatus, ProgressNotification, ReconnectPolicy};
use vidtrack_engine::{
    channel_address, ChannelError, ChannelEvent, ChannelSettings, Connection, EngineEvent,
    EventSink, NotificationChannel, Sleeper, Transport, OUTBOUND_CAPACITY,
};

const DELAY: Duration = Duration::from_millis(3000);

enum Script {
    /// Connect attempt fails.
    Refuse,
    /// Connect succeeds, yields these frames, then the server closes.
    Serve(Vec<&'static str>),
    /// Connect succeeds, yields these frames, then stays open.
    Hold(Vec<&'static str>),
}

struct FakeTransport {
    script: Mutex<VecDeque<Script>>,
    addresses: Mutex<Vec<String>>,
    sent: Arc<Mutex<Vec<String>>>,
    cancel_when_done: CancellationToken,
}

impl FakeTransport {
    fn new(script: Vec<Script>, cancel_when_done: CancellationToken) -> Self {
        Self {
            script: Mutex::new(script.into()),
            addresses: Mutex::new(Vec::new()),
            sent: Arc::new(Mutex::new(Vec::new())),
            cancel_when_done,
        }
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, address: &Url) -> Result<Box<dyn Connection>, ChannelError> {
        self.addresses.lock().unwrap().push(address.to_string());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Refuse) => Err(ChannelError::Connect("refused".to_string())),
            Some(Script::Serve(frames)) => Ok(Box::new(FakeConnection::new(
                frames,
                false,
                self.sent.clone(),
            ))),
            Some(Script::Hold(frames)) => Ok(Box::new(FakeConnection::new(
                frames,
                true,
                self.sent.clone(),
            ))),
            None => {
                self.cancel_when_done.cancel();
                std::future::pending().await
            }
        }
    }
}

struct FakeConnection {
    frames: VecDeque<String>,
    hold_open: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

impl FakeConnection {
    fn new(frames: Vec<&'static str>, hold_open: bool, sent: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            frames: frames.into_iter().map(str::to_string).collect(),
            hold_open,
            sent,
        }
    }
}

#[async_trait::async_trait]
impl Connection for FakeConnection {
    async fn recv(&mut self) -> Option<Result<String, ChannelError>> {
        if let Some(frame) = self.frames.pop_front() {
            return Some(Ok(frame));
        }
        if self.hold_open {
            std::future::pending::<()>().await;
        }
        None
    }

    async fn send(&mut self, text: String) -> Result<(), ChannelError> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

#[async_trait::async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn channel_events(&self) -> Vec<ChannelEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::Channel(event) => Some(event.clone()),
                _ => None,
            })
            .collect()
    }

    fn reconnects(&self) -> Vec<(u32, Duration)> {
        self.channel_events()
            .into_iter()
            .filter_map(|event| match event {
                ChannelEvent::ReconnectScheduled { attempt, delay } => Some((attempt, delay)),
                _ => None,
            })
            .collect()
    }

    fn notifications(&self) -> Vec<ProgressNotification> {
        self.channel_events()
            .into_iter()
            .filter_map(|event| match event {
                ChannelEvent::Notification(notification) => Some(notification),
                _ => None,
            })
            .collect()
    }

    fn statuses(&self) -> Vec<ChannelStatus> {
        self.channel_events()
            .into_iter()
            .filter_map(|event| match event {
                ChannelEvent::StatusChanged(status) => Some(status),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn settings() -> ChannelSettings {
    let counter = Arc::new(Mutex::new(0_u32));
    let mut settings = ChannelSettings::new(Url::parse("http://localhost:8000").unwrap());
    settings.reconnect = ReconnectPolicy::Fixed(DELAY);
    settings.client_id = Arc::new(move || {
        let mut n = counter.lock().unwrap();
        *n += 1;
        format!("client-{n}")
    });
    settings
}

async fn run_script(script: Vec<Script>) -> (Arc<FakeTransport>, Arc<RecordingSleeper>, TestSink) {
    let cancel = CancellationToken::new();
    let transport = Arc::new(FakeTransport::new(script, cancel.clone()));
    let sleeper = Arc::new(RecordingSleeper::default());
    let sink = TestSink::default();
    let channel = NotificationChannel::new(settings(), transport.clone(), sleeper.clone());
    let (_outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

    tokio::time::timeout(
        Duration::from_secs(5),
        channel.run(&sink, outbound_rx, cancel),
    )
    .await
    .expect("channel run finished");

    (transport, sleeper, sink)
}

#[tokio::test]
async fn n_closures_schedule_n_reconnects_with_fixed_delay() {
    let (transport, sleeper, sink) = run_script(vec![
        Script::Refuse,
        Script::Refuse,
        Script::Serve(vec![]),
        Script::Refuse,
    ])
    .await;

    // Two refusals, one server-side close, one more refusal.
    assert_eq!(sink.reconnects(), vec![(1, DELAY), (2, DELAY), (1, DELAY), (2, DELAY)]);
    assert_eq!(*sleeper.delays.lock().unwrap(), vec![DELAY; 4]);
    // Initial connect plus one per reconnect.
    assert_eq!(transport.addresses.lock().unwrap().len(), 5);
}

#[tokio::test]
async fn every_connection_gets_a_fresh_client_id() {
    let (transport, _sleeper, _sink) = run_script(vec![Script::Refuse, Script::Refuse]).await;

    let addresses = transport.addresses.lock().unwrap().clone();
    assert_eq!(
        addresses,
        vec![
            "ws://localhost:8000/ws/client-1".to_string(),
            "ws://localhost:8000/ws/client-2".to_string(),
            "ws://localhost:8000/ws/client-3".to_string(),
        ]
    );
}

#[tokio::test]
async fn status_walks_through_lifecycle() {
    let (_transport, _sleeper, sink) = run_script(vec![Script::Serve(vec![])]).await;

    assert_eq!(
        sink.statuses(),
        vec![
            ChannelStatus::Connecting,
            ChannelStatus::Open,
            ChannelStatus::Reconnecting,
            ChannelStatus::Connecting,
            ChannelStatus::Closed,
        ]
    );
    assert!(sink
        .channel_events()
        .contains(&ChannelEvent::Error(ChannelError::ClosedByPeer)));
}

#[tokio::test]
async fn only_progress_frames_are_delivered() {
    let (_transport, _sleeper, sink) = run_script(vec![Script::Serve(vec![
        "You sent: hello",
        r#"{"echo":"hello"}"#,
        r#"{"process_id":"abc123","progress":42,"status":"running"}"#,
        r#"{"process_id":"abc123","status":"bogus"}"#,
        r#"{"process_id":"abc123","progress":100,"status":"completed","download_url":"/files/out.mp4"}"#,
    ])])
    .await;

    assert_eq!(
        sink.notifications(),
        vec![
            ProgressNotification::running("abc123", 42),
            ProgressNotification::completed("abc123", Some("/files/out.mp4".to_string())),
        ]
    );
}

async fn wait_until(mut ready: impl FnMut() -> bool) {
    for _ in 0..200 {
        if ready() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn outbound_text_reaches_the_live_connection() {
    let cancel = CancellationToken::new();
    let transport = Arc::new(FakeTransport::new(
        vec![Script::Hold(vec![])],
        cancel.clone(),
    ));
    let sleeper = Arc::new(RecordingSleeper::default());
    let channel = NotificationChannel::new(settings(), transport.clone(), sleeper.clone());
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

    let sink = Arc::new(TestSink::default());
    let run_sink = sink.clone();
    let run_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        channel.run(run_sink.as_ref(), outbound_rx, run_cancel).await;
    });

    wait_until(|| sink.statuses().contains(&ChannelStatus::Open)).await;
    outbound_tx.try_send("ping".to_string()).unwrap();
    wait_until(|| !transport.sent.lock().unwrap().is_empty()).await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(*transport.sent.lock().unwrap(), vec!["ping".to_string()]);
    // Explicit close: no reconnect was ever scheduled.
    assert!(sink.reconnects().is_empty());
    assert_eq!(sink.statuses().last(), Some(&ChannelStatus::Closed));
}

#[tokio::test]
async fn frames_queued_while_disconnected_are_not_replayed() {
    let cancel = CancellationToken::new();
    let transport = Arc::new(FakeTransport::new(
        vec![Script::Refuse, Script::Refuse, Script::Hold(vec![])],
        cancel.clone(),
    ));
    let sleeper = Arc::new(RecordingSleeper::default());
    let channel = NotificationChannel::new(settings(), transport.clone(), sleeper.clone());
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

    // Fill the queue before any connection exists; the overflow is refused.
    let mut refused = 0;
    for n in 0..OUTBOUND_CAPACITY + 10 {
        if outbound_tx.try_send(format!("stale-{n}")).is_err() {
            refused += 1;
        }
    }
    assert_eq!(refused, 10);

    let sink = Arc::new(TestSink::default());
    let run_sink = sink.clone();
    let run_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        channel.run(run_sink.as_ref(), outbound_rx, run_cancel).await;
    });

    wait_until(|| sink.statuses().contains(&ChannelStatus::Open)).await;
    outbound_tx.try_send("fresh".to_string()).unwrap();
    wait_until(|| !transport.sent.lock().unwrap().is_empty()).await;
    cancel.cancel();
    task.await.unwrap();

    assert_eq!(transport.addresses.lock().unwrap().len(), 3);
    assert_eq!(*transport.sent.lock().unwrap(), vec!["fresh".to_string()]);
}

#[tokio::test]
async fn explicit_close_stops_reconnecting() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let transport = Arc::new(FakeTransport::new(vec![Script::Refuse], cancel.clone()));
    let sleeper = Arc::new(RecordingSleeper::default());
    let channel = NotificationChannel::new(settings(), transport.clone(), sleeper.clone());
    let sink = TestSink::default();
    let (_outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

    channel.run(&sink, outbound_rx, cancel).await;

    assert!(transport.addresses.lock().unwrap().is_empty());
    assert!(sleeper.delays.lock().unwrap().is_empty());
    assert_eq!(sink.statuses().last(), Some(&ChannelStatus::Closed));
}

#[test]
fn address_follows_server_scheme() {
    let http = Url::parse("http://localhost:8000").unwrap();
    let https = Url::parse("https://videos.example.com").unwrap();
    assert_eq!(
        channel_address(&http, "/ws/", "1700000000000-0").unwrap().as_str(),
        "ws://localhost:8000/ws/1700000000000-0"
    );
    assert_eq!(
        channel_address(&https, "ws", "abc").unwrap().as_str(),
        "wss://videos.example.com/ws/abc"
    );
    assert!(matches!(
        channel_address(&Url::parse("ftp://example.com").unwrap(), "/ws/", "abc"),
        Err(ChannelError::InvalidAddress(_))
    ));
}
