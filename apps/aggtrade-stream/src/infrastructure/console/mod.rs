//! Console Trade Table
//!
//! Renders trades as fixed-width table rows (symbol, price, quantity, ISO-8601
//! trade time) and connection changes as short status lines.

use std::io::{self, Write};

use chrono::SecondsFormat;

use crate::domain::connection::ConnectionState;
use crate::domain::trade::TradeEvent;

const SYMBOL_WIDTH: usize = 12;
const PRICE_WIDTH: usize = 18;
const QUANTITY_WIDTH: usize = 18;

/// Writes trade rows and status lines to any [`Write`] target.
#[derive(Debug)]
pub struct TradeTable<W: Write> {
    out: W,
    header_written: bool,
}

impl TradeTable<io::Stdout> {
    /// Table rendering to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TradeTable<W> {
    /// Create a table writing to `out`.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
        }
    }

    /// Render one trade row, preceded by the header on first use.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn render_trade(&mut self, trade: &TradeEvent) -> io::Result<()> {
        if !self.header_written {
            writeln!(
                self.out,
                "{:<SYMBOL_WIDTH$} {:>PRICE_WIDTH$} {:>QUANTITY_WIDTH$} tradeTime",
                "symbol", "price", "quantity"
            )?;
            self.header_written = true;
        }

        let trade_time = trade.trade_time().map_or_else(
            || trade.trade_time_millis.to_string(),
            |t| t.to_rfc3339_opts(SecondsFormat::Millis, true),
        );

        writeln!(
            self.out,
            "{:<SYMBOL_WIDTH$} {:>PRICE_WIDTH$} {:>QUANTITY_WIDTH$} {trade_time}",
            trade.symbol, trade.price, trade.quantity
        )?;
        self.out.flush()
    }

    /// Render a status line for states an operator cares about.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn render_status(&mut self, state: ConnectionState) -> io::Result<()> {
        let Some(line) = status_line(state) else {
            return Ok(());
        };
        // Re-print the header after an outage so rows stay labelled.
        self.header_written = false;
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    /// Consume the table and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

const fn status_line(state: ConnectionState) -> Option<&'static str> {
    match state {
        ConnectionState::Connecting => Some("Connecting..."),
        ConnectionState::Open => Some("Connected"),
        ConnectionState::Closed => Some("Disconnected"),
        ConnectionState::Reconnecting => Some("Reconnecting..."),
        ConnectionState::Idle | ConnectionState::Closing => None,
    }
}
