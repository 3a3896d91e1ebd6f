use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite};
use tracing::debug;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("construction server is unreachable")]
    Unreachable,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ClientError {
    pub fn from_tungstenite(err: tungstenite::Error) -> Self {
        let is_connect = match &err {
            tungstenite::Error::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        };
        if is_connect {
            Self::Unreachable
        } else {
            Self::Other(err.into())
        }
    }
}

/// Connection lifecycle states for the one live connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// No connection yet, or the previous one is fully torn down.
    Idle,
    /// Dialing the server.
    Connecting,
    /// Transport is up and the request payload has been sent.
    Open,
    /// Closed by either side; a new submission may dial again.
    Closed,
}

/// The duplex connection for the current submission, split so the pump can
/// read while a stop frame goes out the write half.
pub struct Link {
    pub(crate) write: SplitSink<WsStream, tungstenite::Message>,
    pub(crate) read: SplitStream<WsStream>,
}

impl Link {
    /// Dial `url` and submit `payload` as the first frame once the
    /// transport reports open.
    pub(crate) async fn open<T: Serialize>(url: &str, payload: &T) -> Result<Self, ClientError> {
        debug!(%url, "connecting");
        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(ClientError::from_tungstenite)?;
        let (write, read) = ws_stream.split();
        let mut link = Self { write, read };
        link.send_json(payload).await?;
        debug!("connection open, request submitted");
        Ok(link)
    }

    /// Serialize and send one outbound frame.
    pub(crate) async fn send_json<T: Serialize>(&mut self, value: &T) -> Result<(), ClientError> {
        let json = serde_json::to_string(value).map_err(|e| ClientError::Other(e.into()))?;
        self.write
            .send(tungstenite::Message::Text(json.into()))
            .await
            .map_err(ClientError::from_tungstenite)
    }

    /// Send the close frame. Safe to call after the peer already closed.
    pub(crate) async fn close(&mut self) {
        let _ = self.write.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- ClientError display --

    #[test]
    fn unreachable_display() {
        let err = ClientError::Unreachable;
        assert_eq!(err.to_string(), "construction server is unreachable");
    }

    #[test]
    fn other_display_is_transparent() {
        let err = ClientError::Other(anyhow::anyhow!("something broke"));
        assert_eq!(err.to_string(), "something broke");
    }

    #[test]
    fn from_anyhow() {
        let err: ClientError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, ClientError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }

    // -- from_tungstenite: connection-kind IO errors → Unreachable --

    #[test]
    fn from_tungstenite_connection_refused() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = tungstenite::Error::Io(io);
        assert!(matches!(
            ClientError::from_tungstenite(err),
            ClientError::Unreachable
        ));
    }

    #[test]
    fn from_tungstenite_connection_reset() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = tungstenite::Error::Io(io);
        assert!(matches!(
            ClientError::from_tungstenite(err),
            ClientError::Unreachable
        ));
    }

    // -- from_tungstenite: everything else → Other --

    #[test]
    fn from_tungstenite_io_other_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err = tungstenite::Error::Io(io);
        assert!(matches!(
            ClientError::from_tungstenite(err),
            ClientError::Other(_)
        ));
    }

    #[test]
    fn from_tungstenite_non_io_variant() {
        let err = tungstenite::Error::ConnectionClosed;
        assert!(matches!(
            ClientError::from_tungstenite(err),
            ClientError::Other(_)
        ));
    }
}
