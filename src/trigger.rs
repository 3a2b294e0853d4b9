//! One-time run confirmation tokens
//!
//! A scan writes to the content store, so the binary refuses to start one
//! unless it is given a token issued earlier by `--issue-token`. Tokens are
//! bound to the configuration they were issued for, expire after a TTL and
//! can be redeemed exactly once.

use crate::backfill::Pipeline;
use crate::config::Config;
use crate::output::Reporter;
use crate::state::Outcome;
use crate::storage::{ContentStore, StorageError, TokenLedger};
use crate::BackfillError;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::time::Duration;
use thiserror::Error;

/// Reasons a confirmation token is refused
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Unknown confirmation token")]
    Unknown,

    #[error("Confirmation token was already used")]
    AlreadyUsed,

    #[error("Confirmation token expired (issued at {issued_at})")]
    Expired { issued_at: DateTime<Utc> },

    #[error("Confirmation token was issued for a different configuration")]
    ConfigChanged,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for token operations
pub type TokenResult<T> = std::result::Result<T, TokenError>;

/// Issues and stores a new confirmation token
///
/// The token is the hex SHA-256 of the configuration hash, the current time
/// in nanoseconds and the process id.
pub fn issue_token(ledger: &mut dyn TokenLedger, config_hash: &str) -> TokenResult<String> {
    let issued_at = Utc::now();

    let mut hasher = Sha256::new();
    hasher.update(config_hash.as_bytes());
    hasher.update(
        issued_at
            .timestamp_nanos_opt()
            .unwrap_or_else(|| issued_at.timestamp_micros())
            .to_le_bytes(),
    );
    hasher.update(std::process::id().to_le_bytes());
    let token = hex::encode(hasher.finalize());

    ledger.insert_token(&token, config_hash, issued_at)?;
    tracing::debug!("Issued confirmation token at {}", issued_at);

    Ok(token)
}

/// Redeems a confirmation token for a run with the given configuration
///
/// # Errors
///
/// * `Unknown` - The token was never issued
/// * `AlreadyUsed` - The token was redeemed before
/// * `Expired` - The token is older than `ttl`
/// * `ConfigChanged` - The configuration changed since the token was issued
pub fn redeem_token(
    ledger: &mut dyn TokenLedger,
    token: &str,
    config_hash: &str,
    ttl: Duration,
) -> TokenResult<()> {
    let record = ledger.get_token(token)?.ok_or(TokenError::Unknown)?;

    if record.consumed_at.is_some() {
        return Err(TokenError::AlreadyUsed);
    }

    let now = Utc::now();
    let age = now.signed_duration_since(record.issued_at);
    // A token from the future (clock skew) is treated as fresh
    if age.to_std().map(|age| age > ttl).unwrap_or(false) {
        return Err(TokenError::Expired {
            issued_at: record.issued_at,
        });
    }

    if record.config_hash != config_hash {
        return Err(TokenError::ConfigChanged);
    }

    // Another process may have redeemed it since the lookup
    if !ledger.consume_token(token, now)? {
        return Err(TokenError::AlreadyUsed);
    }

    Ok(())
}

/// Runs a scan gated by a confirmation token
///
/// The pipeline and its preconditions are checked before the token is
/// redeemed, so a run that cannot start leaves the token usable.
pub async fn run_confirmed<S>(
    config: &Config,
    config_hash: &str,
    token: &str,
    store: &mut S,
    reporter: &mut dyn Reporter,
) -> Result<Vec<Outcome>, BackfillError>
where
    S: ContentStore + TokenLedger,
{
    let pipeline = Pipeline::new(config)?;

    redeem_token(
        store,
        token,
        config_hash,
        Duration::from_secs(config.trigger.token_ttl_secs),
    )?;
    tracing::info!("Confirmation token accepted");

    pipeline.run(store, reporter).await
}
