//! The single event-stream connection to the testing agent.
//!
//! `connect` spawns one reader and one writer task. The reader forwards text
//! frames and lifecycle changes into the caller's queue; the writer drains an
//! unbounded channel so [`ConnectionManager::send`] never blocks. There is
//! no reconnect: once the stream closes, the session stays disconnected
//! until the user connects again.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::dispatcher::CommandSink;
use crate::errors::ConnectionError;
use crate::protocol::Command;
use crate::session::ConnectionEvent;

#[derive(Default)]
pub struct ConnectionManager {
    ready: Arc<AtomicBool>,
    closing: Arc<AtomicBool>,
    outbound: Option<mpsc::UnboundedSender<Message>>,
    reader: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the stream to `endpoint` and start forwarding into `events`.
    ///
    /// Any previous connection is closed first. `Opened` is queued once the
    /// handshake completes.
    pub async fn connect<E>(
        &mut self,
        endpoint: &str,
        events: mpsc::UnboundedSender<E>,
    ) -> Result<(), ConnectionError>
    where
        E: From<ConnectionEvent> + Send + 'static,
    {
        self.close();

        let (stream, _) =
            connect_async(endpoint)
                .await
                .map_err(|e| ConnectionError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    message: e.to_string(),
                })?;
        info!(%endpoint, "event stream connected");

        let (mut write, mut read) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let ready = Arc::new(AtomicBool::new(true));
        let closing = Arc::new(AtomicBool::new(false));
        let _ = events.send(E::from(ConnectionEvent::Opened));

        let writer_ready = ready.clone();
        let writer_events = events.clone();
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let is_close = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    writer_ready.store(false, Ordering::SeqCst);
                    let _ = writer_events.send(E::from(ConnectionEvent::TransportError(
                        e.to_string(),
                    )));
                    break;
                }
                if is_close {
                    break;
                }
            }
        });

        let reader_ready = ready.clone();
        let reader_closing = closing.clone();
        let reader = tokio::spawn(async move {
            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => {
                        if events
                            .send(E::from(ConnectionEvent::Message(text.to_string())))
                            .is_err()
                        {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => debug!("ignoring non-text frame"),
                    Some(Err(e)) => {
                        if !reader_closing.load(Ordering::SeqCst) {
                            let _ = events
                                .send(E::from(ConnectionEvent::TransportError(e.to_string())));
                        }
                        break;
                    }
                }
            }
            reader_ready.store(false, Ordering::SeqCst);
            if !reader_closing.load(Ordering::SeqCst) {
                warn!("event stream closed by remote");
                let _ = events.send(E::from(ConnectionEvent::Closed));
            }
        });

        self.ready = ready;
        self.closing = closing;
        self.outbound = Some(outbound_tx);
        self.reader = Some(reader);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && self.outbound.is_some()
    }

    /// Serialize and enqueue `command`. False when not ready.
    pub fn send(&self, command: &Command) -> bool {
        if !self.is_ready() {
            return false;
        }
        let frame = match command.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(command = command.name(), error = %e, "failed to serialize command");
                return false;
            }
        };
        self.outbound
            .as_ref()
            .is_some_and(|tx| tx.send(Message::Text(frame)).is_ok())
    }

    /// Close the stream on purpose. No `Closed` event is queued.
    pub fn close(&mut self) {
        self.closing.store(true, Ordering::SeqCst);
        self.ready.store(false, Ordering::SeqCst);
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Message::Close(None));
        }
        // The writer exits on its own after flushing the close frame.
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl CommandSink for ConnectionManager {
    fn is_ready(&self) -> bool {
        ConnectionManager::is_ready(self)
    }

    fn send(&self, command: &Command) -> bool {
        ConnectionManager::send(self, command)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_manager_is_not_ready() {
        let manager = ConnectionManager::new();
        assert!(!manager.is_ready());
    }

    #[test]
    fn test_send_when_not_ready_returns_false() {
        let manager = ConnectionManager::new();
        assert!(!manager.send(&Command::Design {}));
    }

    #[test]
    fn test_close_without_connection_is_noop() {
        let mut manager = ConnectionManager::new();
        manager.close();
        manager.close();
        assert!(!manager.is_ready());
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (tx, _rx) = mpsc::unbounded_channel::<ConnectionEvent>();
        let mut manager = ConnectionManager::new();
        let err = manager
            .connect(&format!("ws://127.0.0.1:{port}/ws"), tx)
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectionError::ConnectFailed { .. }));
        assert!(!manager.is_ready());
    }
}
