use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

/// Unit an amount in an error is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountUnit {
    /// Bitcoin satoshis.
    Sat,
    /// Rootstock wei.
    Wei,
}

impl std::fmt::Display for AmountUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AmountUnit::Sat => write!(f, "sat"),
            AmountUnit::Wei => write!(f, "wei"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PowPegError {
    #[error("Amount below minimum of {minimum} {unit}")]
    AmountBelowMin { minimum: u128, unit: AmountUnit },

    #[error("Not enough funds: short by {shortfall} {unit}")]
    NotEnoughFunds { shortfall: u128, unit: AmountUnit },

    #[error("Invalid address: {}", .0.join(", "))]
    InvalidAddress(Vec<String>),

    #[error("API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        payload: Option<Value>,
    },

    #[error("Signer error: {0}")]
    Signer(String),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Btc(#[from] chain_btc::error::BtcError),

    #[error(transparent)]
    Rsk(#[from] chain_rsk::error::RskError),
}

impl PowPegError {
    /// API error without status or payload.
    pub fn api(message: impl Into<String>) -> Self {
        PowPegError::Api {
            message: message.into(),
            status: None,
            payload: None,
        }
    }

    pub fn timeout(ms: u64) -> Self {
        Self::api(format!("request timed out after {ms}ms"))
    }
}

impl From<reqwest::Error> for PowPegError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return PowPegError::api("Request timed out");
        }
        match e.status() {
            Some(status) => PowPegError::Api {
                message: "Server error".into(),
                status: Some(status.as_u16()),
                payload: None,
            },
            None => PowPegError::api("No response from server"),
        }
    }
}

pub type Result<T> = std::result::Result<T, PowPegError>;

/// Await a collaborator call, failing with [`PowPegError::timeout`] once
/// `limit` elapses.
pub(crate) async fn timed<T>(
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| PowPegError::timeout(limit.as_millis().try_into().unwrap_or(u64::MAX)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_amount_below_min() {
        let err = PowPegError::AmountBelowMin {
            minimum: 500_000,
            unit: AmountUnit::Sat,
        };
        assert_eq!(err.to_string(), "Amount below minimum of 500000 sat");
    }

    #[test]
    fn display_not_enough_funds() {
        let err = PowPegError::NotEnoughFunds {
            shortfall: 42,
            unit: AmountUnit::Wei,
        };
        assert_eq!(err.to_string(), "Not enough funds: short by 42 wei");
    }

    #[test]
    fn display_invalid_address_lists_all() {
        let err = PowPegError::InvalidAddress(vec!["abc".into(), "def".into()]);
        assert_eq!(err.to_string(), "Invalid address: abc, def");
    }

    #[test]
    fn timeout_is_api_error() {
        match PowPegError::timeout(250) {
            PowPegError::Api {
                message,
                status,
                payload,
            } => {
                assert_eq!(message, "request timed out after 250ms");
                assert!(status.is_none());
                assert!(payload.is_none());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn timed_call_fails_after_limit() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(1u8)
        };
        let err = timed(Duration::from_millis(10), slow).await.unwrap_err();
        assert_eq!(err.to_string(), "API error: request timed out after 10ms");

        let fast = async { Ok(2u8) };
        assert_eq!(timed(Duration::from_millis(10), fast).await.unwrap(), 2);
    }

    #[test]
    fn chain_errors_convert() {
        let err: PowPegError = chain_rsk::error::RskError::UnsupportedChain(1).into();
        assert_eq!(err.to_string(), "unsupported chain: 1");
    }
}
