//! Push-channel message types and parser.
//!
//! The backend sends JSON text frames with the shape
//! `{"type": "<kind>", "data": {...}}`. This module deserializes them
//! into a strongly-typed [`StockMessage`] enum.

use serde::Deserialize;

use evdealer_core::availability::StockKey;
use evdealer_core::types::{DbId, Timestamp};

/// All known push-channel message types.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum StockMessage {
    /// On-hand quantity changed for one (version, color).
    #[serde(rename = "stock_changed")]
    StockChanged(StockChangedData),

    /// Keep-alive from the server.
    #[serde(rename = "heartbeat")]
    Heartbeat(HeartbeatData),
}

/// Payload for `stock_changed` messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct StockChangedData {
    pub version_id: DbId,
    pub color_id: DbId,
    /// New on-hand quantity. Negative values fail to parse and are skipped.
    pub quantity: u32,
    /// When the backend applied the change; used for last-write-wins.
    pub timestamp: Timestamp,
}

impl StockChangedData {
    pub fn key(&self) -> StockKey {
        StockKey::new(self.version_id, self.color_id)
    }
}

/// Payload for `heartbeat` messages.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatData {
    #[serde(default)]
    pub server_time: Option<Timestamp>,
}

/// Parse a push-channel text frame into a typed enum.
///
/// Returns `Err` for malformed JSON or unknown `type` values.
/// Callers should log and continue.
pub fn parse_message(text: &str) -> Result<StockMessage, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_stock_changed() {
        let msg = parse_message(
            r#"{"type":"stock_changed","data":{"version_id":1,"color_id":10,"quantity":3,"timestamp":"2026-10-18T08:00:00Z"}}"#,
        )
        .unwrap();

        assert_matches!(msg, StockMessage::StockChanged(data) => {
            assert_eq!(data.key(), StockKey::new(1, 10));
            assert_eq!(data.quantity, 3);
        });
    }

    #[test]
    fn parses_heartbeat_without_time() {
        let msg = parse_message(r#"{"type":"heartbeat","data":{}}"#).unwrap();
        assert_matches!(msg, StockMessage::Heartbeat(h) if h.server_time.is_none());
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let result = parse_message(
            r#"{"type":"stock_changed","data":{"version_id":1,"color_id":10,"quantity":-1,"timestamp":"2026-10-18T08:00:00Z"}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_timestamp_is_rejected() {
        let result = parse_message(
            r#"{"type":"stock_changed","data":{"version_id":1,"color_id":10,"quantity":1}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(parse_message(r#"{"type":"price_changed","data":{}}"#).is_err());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(parse_message("not json").is_err());
    }
}
