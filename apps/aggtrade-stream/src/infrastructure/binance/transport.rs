//! WebSocket Transport
//!
//! `tokio-tungstenite` adapter for the [`Connector`] / [`Connection`] ports.
//! TLS is provided by rustls with webpki roots.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::application::ports::{Connection, Connector, Frame, TransportError};
use crate::domain::connection::{CLOSE_NORMAL, CloseInfo};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens WebSocket connections with `tokio-tungstenite`.
#[derive(Debug, Default, Clone)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    /// Create a new connector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Connection>, TransportError> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        Ok(Box::new(TungsteniteConnection { stream }))
    }
}

/// An established `tokio-tungstenite` connection.
pub struct TungsteniteConnection {
    stream: WsStream,
}

#[async_trait]
impl Connection for TungsteniteConnection {
    async fn recv(&mut self) -> Option<Result<Frame, TransportError>> {
        loop {
            match self.stream.next().await? {
                Ok(msg) => {
                    if let Some(frame) = frame_from_message(msg) {
                        return Some(Ok(frame));
                    }
                }
                Err(e) => return Some(Err(TransportError::Io(e.to_string()))),
            }
        }
    }

    async fn send(&mut self, frame: Frame) -> Result<(), TransportError> {
        // An explicit pong replaces the one tungstenite would queue on its own,
        // so each ping still gets exactly one answer.
        self.stream
            .send(message_from_frame(frame))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream
            .close(Some(CloseFrame {
                code: CloseCode::from(CLOSE_NORMAL),
                reason: "".into(),
            }))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;

        // Drain until the peer echoes the close and the stream ends.
        while let Some(Ok(_)) = self.stream.next().await {}

        Ok(())
    }
}

fn frame_from_message(msg: Message) -> Option<Frame> {
    match msg {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Binary(data) => Some(Frame::Binary(data.to_vec())),
        Message::Ping(data) => Some(Frame::Ping(data.to_vec())),
        Message::Pong(data) => Some(Frame::Pong(data.to_vec())),
        Message::Close(close) => Some(Frame::Close(
            close.map(|c| CloseInfo::new(u16::from(c.code), c.reason.as_str())),
        )),
        Message::Frame(_) => None,
    }
}

fn message_from_frame(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data.into()),
        Frame::Ping(data) => Message::Ping(data.into()),
        Frame::Pong(data) => Message::Pong(data.into()),
        Frame::Close(close) => Message::Close(close.map(|c| CloseFrame {
            code: CloseCode::from(c.code),
            reason: c.reason.into(),
        })),
    }
}
