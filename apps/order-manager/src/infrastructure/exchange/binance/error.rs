//! Binance adapter errors.

use crate::application::ports::ExchangeError;

/// Binance API error codes for rejected credentials.
const AUTH_ERROR_CODES: [i64; 2] = [-2014, -2015];

/// Errors from the Binance REST client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BinanceError {
    /// Non-success HTTP status.
    #[error("Binance returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Binance error code, when the body carried one.
        code: Option<i64>,
        /// Error message or raw body.
        message: String,
    },

    /// No response within the client timeout.
    #[error("Binance request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Connection-level failure.
    #[error("Binance request failed: {0}")]
    Network(String),

    /// Successful status but unreadable body.
    #[error("Failed to decode Binance response: {0}")]
    Decode(String),

    /// Client could not be built.
    #[error("Invalid Binance client configuration: {0}")]
    Config(String),
}

impl From<BinanceError> for ExchangeError {
    fn from(error: BinanceError) -> Self {
        match error {
            BinanceError::Http {
                status: 401 | 403, message, ..
            } => Self::Unauthorized { message },
            BinanceError::Http {
                code: Some(code), message, ..
            } if AUTH_ERROR_CODES.contains(&code) => Self::Unauthorized { message },
            BinanceError::Http {
                status: 400..=499,
                code,
                message,
            } => Self::Rejected { code, message },
            BinanceError::Http { status, message, .. } => Self::Unavailable {
                message: format!("HTTP {status}: {message}"),
            },
            BinanceError::Timeout { timeout_ms } => Self::Timeout { timeout_ms },
            BinanceError::Network(message) | BinanceError::Config(message) => {
                Self::Unavailable { message }
            }
            BinanceError::Decode(message) => Self::InvalidResponse { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn http(status: u16, code: Option<i64>) -> BinanceError {
        BinanceError::Http {
            status,
            code,
            message: "boom".to_string(),
        }
    }

    #[test_case(http(401, None), "unauthorized" ; "401")]
    #[test_case(http(403, None), "unauthorized" ; "403")]
    #[test_case(http(400, Some(-2015)), "unauthorized" ; "invalid api key code")]
    #[test_case(http(400, Some(-1013)), "rejected" ; "filter failure")]
    #[test_case(http(429, None), "rejected" ; "rate limited")]
    #[test_case(http(503, None), "unavailable" ; "server error")]
    #[test_case(BinanceError::Timeout { timeout_ms: 10 }, "timeout" ; "timeout")]
    #[test_case(BinanceError::Network("reset".into()), "unavailable" ; "network")]
    #[test_case(BinanceError::Decode("bad json".into()), "invalid_response" ; "decode")]
    fn maps_to_exchange_error(error: BinanceError, kind: &str) {
        assert_eq!(ExchangeError::from(error).kind(), kind);
    }

    #[test]
    fn rejection_keeps_binance_code() {
        let mapped = ExchangeError::from(http(400, Some(-2010)));
        assert_eq!(
            mapped,
            ExchangeError::Rejected {
                code: Some(-2010),
                message: "boom".to_string()
            }
        );
    }
}
