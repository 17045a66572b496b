//! `tokio-tungstenite` implementation of the transport traits.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::{Connection, ConnectionId, Incoming, Listener, TransportError};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Accepts pose-sync WebSocket connections on a TCP port.
pub struct WebSocketListener {
    tcp: TcpListener,
}

impl WebSocketListener {
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self, TransportError> {
        let tcp = TcpListener::bind(addr).await?;
        tracing::info!(addr = %tcp.local_addr()?, "pose listener bound");
        Ok(Self { tcp })
    }
}

impl Listener for WebSocketListener {
    type Incoming = WebSocketIncoming;

    async fn accept(&mut self) -> Result<WebSocketIncoming, TransportError> {
        let (stream, peer) = self.tcp.accept().await?;
        Ok(WebSocketIncoming { stream, peer })
    }

    fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.tcp.local_addr()
    }
}

/// A TCP peer waiting for its WebSocket upgrade.
pub struct WebSocketIncoming {
    stream: TcpStream,
    peer: SocketAddr,
}

impl Incoming for WebSocketIncoming {
    type Conn = WebSocketConnection;

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    async fn upgrade(self, timeout: Duration) -> Result<WebSocketConnection, TransportError> {
        let peer = self.peer;
        let ws = tokio::time::timeout(timeout, tokio_tungstenite::accept_async(self.stream))
            .await
            .map_err(|_| TransportError::HandshakeTimeout {
                peer,
                after: timeout,
            })?
            .map_err(|source| TransportError::Handshake { peer, source })?;

        let id = ConnectionId::new(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(%id, %peer, "upgraded pose connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            peer,
            sink,
            stream,
        })
    }
}

/// A single upgraded connection, split into its write and read halves.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    stream: SplitStream<WebSocketStream<TcpStream>>,
}

impl Connection for WebSocketConnection {
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        while let Some(frame) = self.stream.next().await {
            match frame.map_err(TransportError::Receive)? {
                Message::Text(text) => return Ok(Some(text.as_bytes().to_vec())),
                Message::Binary(data) => return Ok(Some(data.to_vec())),
                Message::Close(_) => return Ok(None),
                // tungstenite answers pings itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn send(&mut self, text: &str) -> Result<(), TransportError> {
        self.sink
            .send(Message::Text(text.into()))
            .await
            .map_err(TransportError::Send)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
