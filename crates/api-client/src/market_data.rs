use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing;

/// A single real-time quote update. Quotes are keyed by contract id; the
/// caller resolves ids to symbols via `TradovateClient::find_contract`.
#[derive(Debug, Clone)]
pub struct QuoteEvent {
    pub contract_id: i64,
    pub timestamp: Option<DateTime<Utc>>,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub last: Option<Decimal>,
    pub bid_size: Option<Decimal>,
    pub ask_size: Option<Decimal>,
    pub total_volume: Option<Decimal>,
}

// --- WebSocket Deserialization Structs ---
#[derive(Debug, Deserialize)]
struct WsEnvelope {
    #[serde(default)]
    e: Option<String>,
    #[serde(default)]
    d: Option<WsPayload>,
    #[serde(default)]
    s: Option<u16>,
    #[serde(default)]
    i: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WsPayload {
    #[serde(default)]
    quotes: Vec<WsQuote>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsQuote {
    contract_id: i64,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    bid: Option<Decimal>,
    #[serde(default)]
    ask: Option<Decimal>,
    #[serde(default)]
    last: Option<Decimal>,
    #[serde(default)]
    bid_size: Option<Decimal>,
    #[serde(default)]
    ask_size: Option<Decimal>,
    #[serde(default)]
    total_volume: Option<Decimal>,
}

impl From<WsQuote> for QuoteEvent {
    fn from(quote: WsQuote) -> Self {
        Self {
            contract_id: quote.contract_id,
            timestamp: quote.timestamp,
            bid: quote.bid,
            ask: quote.ask,
            last: quote.last,
            bid_size: quote.bid_size,
            ask_size: quote.ask_size,
            total_volume: quote.total_volume,
        }
    }
}

/// The streaming capability of a session: a handle on the market-data
/// WebSocket endpoint, authorized with the session's md token.
///
/// Built per session on demand; a session without a stream behaves exactly
/// like one with a stream as far as the registry is concerned.
pub struct MarketDataStream {
    ws_url: String,
    md_token: String,
}

impl MarketDataStream {
    pub(crate) fn new(ws_url: String, md_token: String) -> Self {
        Self { ws_url, md_token }
    }

    /// Subscribes to real-time quotes for the given symbols and returns a
    /// channel Receiver of updates.
    ///
    /// A background task owns the connection: it authorizes, subscribes,
    /// and re-runs the whole handshake after a disconnect. The task exits
    /// once the receiver is dropped.
    pub fn subscribe_quotes(&self, symbols: &[String]) -> mpsc::Receiver<QuoteEvent> {
        let (tx, rx) = mpsc::channel(1024);
        let url = self.ws_url.clone();
        let token = self.md_token.clone();
        let symbols = symbols.to_vec();

        tokio::spawn(async move {
            loop {
                match connect_async(url.as_str()).await {
                    Ok((mut stream, _)) => {
                        tracing::info!("[MD] WebSocket connection established.");

                        let authorize = json!({
                            "op": "authorize",
                            "data": { "mdAccessToken": token }
                        });
                        if stream
                            .send(Message::Text(authorize.to_string()))
                            .await
                            .is_err()
                        {
                            tracing::warn!("[MD] Failed to send authorize frame.");
                        } else {
                            let mut subscribed = true;
                            for symbol in &symbols {
                                let subscribe = json!({
                                    "op": "md/subscribeQuote",
                                    "data": { "symbol": symbol }
                                });
                                if stream
                                    .send(Message::Text(subscribe.to_string()))
                                    .await
                                    .is_err()
                                {
                                    subscribed = false;
                                    break;
                                }
                            }

                            if subscribed {
                                while let Some(msg) = stream.next().await {
                                    match msg {
                                        Ok(Message::Text(text)) => {
                                            if let Ok(envelope) =
                                                serde_json::from_str::<WsEnvelope>(&text)
                                            {
                                                if envelope.s == Some(200) {
                                                    tracing::debug!(id = ?envelope.i, "[MD] Request acknowledged.");
                                                }
                                                if envelope.e.as_deref() == Some("md") {
                                                    if let Some(payload) = envelope.d {
                                                        for quote in payload.quotes {
                                                            if tx
                                                                .send(QuoteEvent::from(quote))
                                                                .await
                                                                .is_err()
                                                            {
                                                                // Receiver dropped; we are done.
                                                                return;
                                                            }
                                                        }
                                                    }
                                                }
                                            }
                                        }
                                        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                                        Ok(Message::Close(frame)) => {
                                            tracing::info!("[MD] Connection closed: {:?}", frame);
                                            break;
                                        }
                                        Err(e) => {
                                            tracing::error!(error = %e, "[MD] WebSocket message error.");
                                            break;
                                        }
                                        _ => {}
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "[MD] WebSocket connection error.");
                    }
                }

                if tx.is_closed() {
                    return;
                }
                tracing::warn!("[MD] Disconnected. Reconnecting in 5s...");
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            }
        });

        rx
    }
}
