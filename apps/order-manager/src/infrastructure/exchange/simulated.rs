//! Simulated exchange.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::application::ports::{ExchangeError, ExchangePort, TradeAck};
use crate::config::ExchangeConfig;
use crate::domain::order_execution::Order;
use crate::domain::shared::ExchangeOrderId;

/// Exchange that fills every order locally after an optional delay.
#[derive(Debug)]
pub struct SimulatedExchange {
    latency: Duration,
    next_id: AtomicU64,
}

impl SimulatedExchange {
    /// Create a simulated exchange answering after `latency`.
    #[must_use]
    pub const fn new(latency: Duration) -> Self {
        Self {
            latency,
            next_id: AtomicU64::new(1),
        }
    }

    /// Create from the exchange configuration.
    #[must_use]
    pub const fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(Duration::from_millis(config.simulated_latency_ms))
    }
}

#[async_trait]
impl ExchangePort for SimulatedExchange {
    async fn execute_trade(&self, order: &Order) -> Result<TradeAck, ExchangeError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            order_id = %order.id(),
            symbol = %order.symbol(),
            side = order.side().as_str(),
            quantity = %order.quantity(),
            "Simulated fill"
        );

        Ok(TradeAck {
            exchange_order_id: ExchangeOrderId::new(format!("SIM-{n}")),
            status: "FILLED".to_string(),
        })
    }
}
