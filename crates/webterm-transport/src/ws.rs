//! WebSocket connector backed by tokio-tungstenite.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use webterm_core::{Endpoint, Error, InboundFrame, Result};

use crate::socket::{ConnectionId, Connector, Socket, SocketEvent};
use crate::transport::TransportEvent;

/// Opens one tokio task per socket and reports its events on a channel.
#[derive(Debug, Clone)]
pub struct WsConnector {
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl WsConnector {
    /// Create a connector reporting to `events`.
    pub fn new(events: mpsc::UnboundedSender<TransportEvent>) -> Self {
        Self { events }
    }
}

impl Connector for WsConnector {
    fn connect(&mut self, endpoint: &Endpoint, id: ConnectionId) -> Result<Box<dyn Socket>> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let url = endpoint.url().to_string();
        let events = self.events.clone();

        tokio::spawn(async move {
            run_socket(url, id, outbound_rx, events).await;
        });

        Ok(Box::new(WsSocket {
            outbound: outbound_tx,
        }))
    }
}

#[derive(Debug)]
enum Outbound {
    Text(String),
    Close,
}

/// Client side of a socket task.
///
/// Dropping it ends the task as well: the task stops once the outbound
/// channel closes.
#[derive(Debug)]
struct WsSocket {
    outbound: mpsc::UnboundedSender<Outbound>,
}

impl Socket for WsSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.outbound
            .send(Outbound::Text(text))
            .map_err(|_| Error::Connection("socket task has exited".to_string()))
    }

    fn close(&mut self) {
        let _ = self.outbound.send(Outbound::Close);
    }
}

async fn run_socket(
    url: String,
    id: ConnectionId,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let report = |event: SocketEvent| {
        let _ = events.send(TransportEvent::socket(id, event));
    };

    debug!("Socket {} connecting to {}", id, url);
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            report(SocketEvent::Error(e.to_string()));
            report(SocketEvent::Closed);
            return;
        }
    };
    report(SocketEvent::Opened);

    let (mut sink, mut stream) = stream.split();
    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        report(SocketEvent::Error(e.to_string()));
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!("Socket {} closing", id);
                    if let Err(e) = sink.close().await {
                        debug!("Socket {} close handshake failed: {}", id, e);
                    }
                    break;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Binary(bytes))) => {
                    report(SocketEvent::Frame(InboundFrame::Binary(bytes)));
                }
                Some(Ok(Message::Text(text))) => {
                    report(SocketEvent::Frame(InboundFrame::Text(text)));
                }
                Some(Ok(Message::Close(frame))) => {
                    debug!("Socket {} closed by server: {:?}", id, frame);
                    break;
                }
                // Ping/pong are answered by tungstenite itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Socket {} read error: {}", id, e);
                    report(SocketEvent::Error(e.to_string()));
                    break;
                }
                None => break,
            },
        }
    }

    report(SocketEvent::Closed);
}
