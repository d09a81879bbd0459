//! Binance REST client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use super::{BinanceError, BinanceSigner};
use crate::application::ports::{ExchangeError, ExchangePort, TradeAck};
use crate::config::ExchangeConfig;
use crate::domain::order_execution::{Order, OrderType};
use crate::domain::shared::ExchangeOrderId;

const ORDER_ENDPOINT: &str = "/api/v3/order";
// Lowercase: `HeaderName` rejects uppercase static names.
const API_KEY_HEADER: &str = "x-mbx-apikey";

/// Order acknowledgment body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewOrderResponse {
    order_id: i64,
    #[serde(default)]
    status: String,
}

/// Error body, e.g. `{"code":-1013,"msg":"Filter failure: LOT_SIZE"}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    code: i64,
    msg: String,
}

/// Client for the Binance spot testnet.
///
/// The order id is sent as `newClientOrderId`, so the exchange rejects a
/// second submission of the same order.
#[derive(Debug)]
pub struct BinanceTestnetClient {
    http: Client,
    base_url: String,
    signer: BinanceSigner,
    recv_window_ms: u64,
    timeout_ms: u64,
}

impl BinanceTestnetClient {
    /// Build the client from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BinanceError::Config`] if the credentials or base URL are
    /// unusable.
    pub fn new(config: &ExchangeConfig) -> Result<Self, BinanceError> {
        let signer = BinanceSigner::new(config.api_key.clone(), &config.api_secret)?;

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(signer.api_key())
            .map_err(|e| BinanceError::Config(format!("invalid API key header: {e}")))?;
        headers.insert(API_KEY_HEADER, api_key);

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers)
            .build()
            .map_err(|e| BinanceError::Config(format!("failed to build HTTP client: {e}")))?;

        Url::parse(&config.base_url)
            .map_err(|e| BinanceError::Config(format!("invalid base URL '{}': {e}", config.base_url)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signer,
            recv_window_ms: config.recv_window_ms,
            timeout_ms: config.timeout_ms,
        })
    }

    /// Order parameters, unsigned.
    fn order_params(&self, order: &Order) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", order.symbol().to_string()),
            ("side", order.side().as_str().to_string()),
            ("type", order.order_type().as_str().to_string()),
            ("quantity", order.quantity().normalize().to_string()),
            ("newClientOrderId", order.id().to_string()),
        ];
        if order.order_type() == OrderType::Limit {
            params.push(("timeInForce", "GTC".to_string()));
            params.push(("price", order.price().normalize().to_string()));
        }
        params.push(("recvWindow", self.recv_window_ms.to_string()));
        params.push(("timestamp", chrono::Utc::now().timestamp_millis().to_string()));
        params
    }

    /// Build the signed request URL. The signature covers the encoded query
    /// exactly as sent.
    fn signed_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Url, BinanceError> {
        let mut url = Url::parse_with_params(&format!("{}{endpoint}", self.base_url), params)
            .map_err(|e| BinanceError::Config(e.to_string()))?;
        let signature = self.signer.sign(url.query().unwrap_or_default());
        url.query_pairs_mut().append_pair("signature", &signature);
        Ok(url)
    }

    async fn place_order(&self, order: &Order) -> Result<NewOrderResponse, BinanceError> {
        let url = self.signed_url(ORDER_ENDPOINT, &self.order_params(order))?;

        let response = self.http.post(url).send().await.map_err(|e| {
            if e.is_timeout() {
                BinanceError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                BinanceError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                BinanceError::Timeout {
                    timeout_ms: self.timeout_ms,
                }
            } else {
                BinanceError::Network(e.to_string())
            }
        })?;

        if status != StatusCode::OK {
            return Err(http_error(status, body));
        }

        serde_json::from_str(&body).map_err(|e| BinanceError::Decode(format!("{e}: {body}")))
    }
}

fn http_error(status: StatusCode, body: String) -> BinanceError {
    match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(error) => BinanceError::Http {
            status: status.as_u16(),
            code: Some(error.code),
            message: error.msg,
        },
        Err(_) => BinanceError::Http {
            status: status.as_u16(),
            code: None,
            message: body,
        },
    }
}

#[async_trait]
impl ExchangePort for BinanceTestnetClient {
    async fn execute_trade(&self, order: &Order) -> Result<TradeAck, ExchangeError> {
        match self.place_order(order).await {
            Ok(ack) => {
                tracing::info!(
                    order_id = %order.id(),
                    exchange_order_id = ack.order_id,
                    status = %ack.status,
                    "Binance accepted order"
                );
                Ok(TradeAck {
                    exchange_order_id: ExchangeOrderId::new(ack.order_id.to_string()),
                    status: ack.status,
                })
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id(), error = %e, "Binance order failed");
                Err(e.into())
            }
        }
    }
}
