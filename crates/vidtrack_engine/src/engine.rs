use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info};
use tokio::sync::mpsc as async_mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use vidtrack_core::{LocalId, SelectedFile};

use crate::channel::{
    ChannelSettings, NotificationChannel, Sleeper, TokioSleeper, Transport, TungsteniteTransport,
    OUTBOUND_CAPACITY,
};
use crate::sink::ChannelEventSink;
use crate::upload::{ReqwestUploader, UploadSettings, Uploader};
use crate::EngineEvent;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub upload: UploadSettings,
    pub channel: ChannelSettings,
}

enum EngineCommand {
    Upload { local_id: LocalId, file: SelectedFile },
    Send(String),
}

/// Bridge between the single-threaded dispatcher and the tokio runtime.
///
/// Commands go in over a std channel; upload results and channel events come
/// back the same way, in the order they happened.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    cancel: CancellationToken,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> io::Result<Self> {
        let uploader = Arc::new(ReqwestUploader::new(config.upload));
        Self::with_parts(
            config.channel,
            uploader,
            Arc::new(TungsteniteTransport),
            Arc::new(TokioSleeper),
        )
    }

    pub fn with_parts(
        channel: ChannelSettings,
        uploader: Arc<dyn Uploader>,
        transport: Arc<dyn Transport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = CancellationToken::new();

        let channel = NotificationChannel::new(channel, transport, sleeper);
        let channel_cancel = cancel.clone();

        thread::spawn(move || {
            let (outbound_tx, outbound_rx) = async_mpsc::channel(OUTBOUND_CAPACITY);
            let sink = ChannelEventSink::new(event_tx.clone());
            runtime.spawn(async move {
                channel.run(&sink, outbound_rx, channel_cancel).await;
            });

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Upload { local_id, file } => {
                        let uploader = uploader.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = uploader.upload(&file).await;
                            let _ = event_tx.send(EngineEvent::UploadCompleted { local_id, result });
                        });
                    }
                    EngineCommand::Send(text) => match outbound_tx.try_send(text) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            engine_debug!("Outbound queue full; dropping frame");
                        }
                        Err(TrySendError::Closed(_)) => {
                            engine_debug!("Channel task gone; dropping outbound frame");
                        }
                    },
                }
            }

            engine_info!("Engine handle dropped; shutting down runtime");
            runtime.shutdown_timeout(Duration::from_secs(1));
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            cancel,
        })
    }

    pub fn upload(&self, local_id: LocalId, file: SelectedFile) {
        let _ = self.cmd_tx.send(EngineCommand::Upload { local_id, file });
    }

    /// Queue a text frame for the live channel.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Send(text.into()));
    }

    /// Close the channel for good; no reconnect follows.
    pub fn close_channel(&self) {
        self.cancel.cancel();
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
