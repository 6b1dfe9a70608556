//! Binance WebSocket Message Types
//!
//! Wire format for the raw aggregate trade stream (`<symbol>@aggTrade`).
//! Field names map one-to-one onto Binance's single-letter JSON keys.
//!
//! # References
//!
//! - [Aggregate Trade Streams](https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams#aggregate-trade-streams)

use serde::Deserialize;

use crate::domain::trade::TradeEvent;

/// Event type carried by every aggregate trade payload.
pub const AGG_TRADE_EVENT: &str = "aggTrade";

/// Aggregate trade message as sent by Binance.
///
/// ```json
/// {
///   "e": "aggTrade", "E": 1672515782136, "s": "BNBBTC", "a": 12345,
///   "p": "0.001", "q": "100", "f": 100, "l": 105, "T": 1672515782136,
///   "m": true, "M": true
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AggTradeMessage {
    /// Event type (always "aggTrade")
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time (epoch milliseconds)
    #[serde(rename = "E")]
    pub event_time: i64,

    /// Symbol (e.g., "BTCUSDT")
    #[serde(rename = "s")]
    pub symbol: String,

    /// Aggregate trade ID
    #[serde(rename = "a")]
    pub aggregate_trade_id: u64,

    /// Price, kept as the venue's decimal string
    #[serde(rename = "p")]
    pub price: String,

    /// Quantity, kept as the venue's decimal string
    #[serde(rename = "q")]
    pub quantity: String,

    /// First trade ID
    #[serde(rename = "f")]
    pub first_trade_id: u64,

    /// Last trade ID
    #[serde(rename = "l")]
    pub last_trade_id: u64,

    /// Trade time (epoch milliseconds)
    #[serde(rename = "T")]
    pub trade_time: i64,

    /// Is the buyer the market maker?
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,

    /// Ignore
    #[serde(rename = "M", default)]
    pub ignore: Option<bool>,
}

impl From<AggTradeMessage> for TradeEvent {
    fn from(msg: AggTradeMessage) -> Self {
        Self {
            symbol: msg.symbol,
            price: msg.price,
            quantity: msg.quantity,
            aggregate_trade_id: msg.aggregate_trade_id,
            first_trade_id: msg.first_trade_id,
            last_trade_id: msg.last_trade_id,
            event_time_millis: msg.event_time,
            trade_time_millis: msg.trade_time,
            is_buyer_maker: msg.is_buyer_maker,
        }
    }
}
