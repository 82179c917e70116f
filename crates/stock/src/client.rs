//! WebSocket client for the stock push channel.
//!
//! [`StockFeedClient`] holds the endpoint configuration. Call
//! [`StockFeedClient::connect`] to establish a live
//! [`StockConnection`] over WebSocket.

use tokio_tungstenite::{connect_async, MaybeTlsStream};

/// Raw WebSocket stream type used by the push channel.
pub type StockStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Configuration handle for the stock push endpoint.
#[derive(Debug, Clone)]
pub struct StockFeedClient {
    ws_url: String,
}

/// A live WebSocket connection to the push endpoint.
pub struct StockConnection {
    /// Unique client ID sent during the WebSocket handshake.
    pub client_id: String,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: StockStream,
}

impl StockFeedClient {
    /// * `ws_url` - WebSocket endpoint, e.g. `ws://host:3000/ws/stock`.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect to the push endpoint.
    ///
    /// Generates a unique `client_id` (UUID v4) and appends it as a query
    /// parameter so server-side logs can correlate the subscription.
    pub async fn connect(&self) -> Result<StockConnection, StockClientError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let separator = if self.ws_url.contains('?') { '&' } else { '?' };
        let url = format!("{}{separator}client_id={client_id}", self.ws_url);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            StockClientError::Connection(format!(
                "Failed to connect to stock feed at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(
            client_id = %client_id,
            "Connected to stock feed at {}",
            self.ws_url,
        );

        Ok(StockConnection {
            client_id,
            ws_stream,
        })
    }
}

/// Errors that can occur when working with the push-channel client.
#[derive(Debug, thiserror::Error)]
pub enum StockClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an already-established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}
