//! HMAC-SHA256 request signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::BinanceError;

type HmacSha256 = Hmac<Sha256>;

/// Signs query strings with the account's API secret.
#[derive(Clone)]
pub struct BinanceSigner {
    api_key: String,
    mac: HmacSha256,
}

impl BinanceSigner {
    /// Key the signer.
    ///
    /// # Errors
    ///
    /// Returns [`BinanceError::Config`] if the secret cannot key the MAC.
    pub fn new(api_key: impl Into<String>, api_secret: &str) -> Result<Self, BinanceError> {
        let mac = HmacSha256::new_from_slice(api_secret.as_bytes())
            .map_err(|e| BinanceError::Config(format!("invalid API secret: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            mac,
        })
    }

    /// Hex-encoded signature of `query`.
    #[must_use]
    pub fn sign(&self, query: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Value for the API key header.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for BinanceSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceSigner")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}
