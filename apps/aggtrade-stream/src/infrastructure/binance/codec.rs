//! Stream Codec Module
//!
//! Decodes Binance aggregate trade payloads into [`TradeEvent`]s.
//!
//! Text and binary data frames carry the same JSON object. Decoding is a
//! pure transform: a malformed payload yields a [`DecodeError`] and never
//! affects the connection.

use crate::application::ports::WireDecoder;
use crate::domain::trade::{DecodeError, DecodeErrorKind, TradeEvent};

use super::messages::{AGG_TRADE_EVENT, AggTradeMessage};

/// JSON codec for the aggregate trade stream.
#[derive(Debug, Default, Clone)]
pub struct AggTradeCodec;

impl AggTradeCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a raw payload.
    ///
    /// # Errors
    ///
    /// Returns `DecodeErrorKind::Malformed` if the payload is not JSON or a
    /// required field is missing or mistyped, and
    /// `DecodeErrorKind::UnexpectedEventType` if the event is not an
    /// aggregate trade.
    pub fn decode(&self, payload: &[u8]) -> Result<TradeEvent, DecodeError> {
        let msg: AggTradeMessage = serde_json::from_slice(payload)
            .map_err(|e| DecodeError::new(payload, DecodeErrorKind::Malformed(e.to_string())))?;

        if msg.event_type != AGG_TRADE_EVENT {
            return Err(DecodeError::new(
                payload,
                DecodeErrorKind::UnexpectedEventType(msg.event_type),
            ));
        }

        Ok(msg.into())
    }
}

impl WireDecoder for AggTradeCodec {
    fn decode(&self, payload: &[u8]) -> Result<TradeEvent, DecodeError> {
        Self::decode(self, payload)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    const HAPPY: &str = r#"{"e":"aggTrade","E":1700000000001,"s":"BTCUSDT","a":1,"p":"65000.10","q":"0.5","f":10,"l":12,"T":1700000000000,"m":false,"M":true}"#;

    #[test]
    fn decode_happy_path() {
        let codec = AggTradeCodec::new();
        let event = codec.decode(HAPPY.as_bytes()).unwrap();

        assert_eq!(event.symbol, "BTCUSDT");
        assert_eq!(event.price, "65000.10");
        assert_eq!(event.quantity, "0.5");
        assert_eq!(event.aggregate_trade_id, 1);
        assert_eq!(event.first_trade_id, 10);
        assert_eq!(event.last_trade_id, 12);
        assert_eq!(event.trade_time_millis, 1_700_000_000_000);
        assert_eq!(event.event_time_millis, 1_700_000_000_001);
        assert!(!event.is_buyer_maker);
    }

    #[test]
    fn decode_preserves_trailing_zeros() {
        let codec = AggTradeCodec::new();
        let json = HAPPY.replace("65000.10", "65000.10000000");
        let event = codec.decode(json.as_bytes()).unwrap();
        assert_eq!(event.price, "65000.10000000");
    }

    #[test_case(b"not json" ; "non json text")]
    #[test_case(b"" ; "empty payload")]
    #[test_case(b"[]" ; "json array")]
    #[test_case(b"{\"e\":\"aggTrade\"}" ; "missing fields")]
    #[test_case(b"{\"e\":\"aggTrade\",\"E\":1,\"s\":\"BTCUSDT\",\"a\":1,\"p\":65000.1,\"q\":\"1\",\"f\":1,\"l\":1,\"T\":1,\"m\":true}" ; "numeric price")]
    #[test_case(&[0xff, 0xfe, 0x00] ; "invalid utf8")]
    fn decode_rejects_malformed(payload: &[u8]) {
        let codec = AggTradeCodec::new();
        let err = codec.decode(payload).unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::Malformed(_)), "{err}");
    }

    #[test]
    fn decode_rejects_other_event_types() {
        let codec = AggTradeCodec::new();
        let json = HAPPY.replace("aggTrade", "trade");
        let err = codec.decode(json.as_bytes()).unwrap_err();
        assert_eq!(
            err.kind,
            DecodeErrorKind::UnexpectedEventType("trade".to_string())
        );
        assert!(err.payload.contains("\"trade\""));
    }

    proptest! {
        #[test]
        fn decode_keeps_price_and_quantity_exact(
            symbol in "[A-Z]{2,10}",
            price in "[0-9]{1,12}\\.[0-9]{1,8}",
            quantity in "[0-9]{1,8}(\\.[0-9]{1,8})?",
        ) {
            let json = format!(
                r#"{{"e":"aggTrade","E":1,"s":"{symbol}","a":2,"p":"{price}","q":"{quantity}","f":3,"l":4,"T":5,"m":true,"M":true}}"#
            );
            let event = AggTradeCodec::new().decode(json.as_bytes()).unwrap();
            prop_assert_eq!(event.symbol, symbol);
            prop_assert_eq!(event.price, price);
            prop_assert_eq!(event.quantity, quantity);
        }

        #[test]
        fn decode_never_panics(payload in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = AggTradeCodec::new().decode(&payload);
        }
    }
}
