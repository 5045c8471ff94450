//! HMAC-SHA256 request signing for the Binance API.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::BrokerError;

type HmacSha256 = Hmac<Sha256>;

/// Sign a query string with HMAC-SHA256.
///
/// Returns the hex-encoded signature to append as `&signature=<sig>`.
pub fn sign(query_string: &str, secret_key: &str) -> Result<String, BrokerError> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| BrokerError::Auth(format!("bad secret key: {e}")))?;
    mac.update(query_string.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}
