//! Push-channel frame processing loop.
//!
//! Reads raw frames from a stock feed connection, parses them into typed
//! [`StockMessage`] variants and forwards every `stock_changed` payload to
//! the bounded update queue drained by the listener's applier task.

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::client::StockClientError;
use crate::messages::{parse_message, StockChangedData, StockMessage};

/// Why a processing session ended without a protocol error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server sent a close frame.
    Closed,
    /// The stream ended without a close frame.
    Exhausted,
    /// The update queue's receiver is gone; the listener is shutting down.
    QueueClosed,
}

/// Process frames until the connection closes or fails.
///
/// Each text frame is parsed via [`parse_message`]. Malformed frames are
/// logged and skipped; they never end the session. When the queue is full
/// this waits, so a slow applier throttles reads from the socket instead
/// of dropping updates.
pub async fn process_messages<S>(
    stream: &mut S,
    updates: &mpsc::Sender<StockChangedData>,
) -> Result<SessionEnd, StockClientError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if let Some(data) = handle_text_message(&text) {
                    if updates.send(data).await.is_err() {
                        return Ok(SessionEnd::QueueClosed);
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::trace!("Ignoring binary frame on stock feed");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Stock feed closed by server");
                return Ok(SessionEnd::Closed);
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                return Err(StockClientError::Protocol(e.to_string()));
            }
        }
    }

    Ok(SessionEnd::Exhausted)
}

/// Parse a single text frame, returning the stock update it carries.
fn handle_text_message(text: &str) -> Option<StockChangedData> {
    match parse_message(text) {
        Ok(StockMessage::StockChanged(data)) => {
            tracing::debug!(
                key = %data.key(),
                quantity = data.quantity,
                timestamp = %data.timestamp,
                "Stock changed",
            );
            Some(data)
        }
        Ok(StockMessage::Heartbeat(data)) => {
            tracing::trace!(server_time = ?data.server_time, "Stock feed heartbeat");
            None
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                raw_message = %text,
                "Failed to parse stock feed message",
            );
            None
        }
    }
}
