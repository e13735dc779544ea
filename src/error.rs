use crate::store::StoreError;
use thiserror::Error;

/// Caller-visible error taxonomy.
///
/// Every codec or store failure surfaces as one of these kinds; raw
/// transport errors never cross the public API. [`Error::StoreUnavailable`]
/// is the only kind that may warrant a caller-side retry — the others are
/// terminal for the presented credentials.
#[derive(Debug, Error)]
pub enum Error {
    #[error("token expired")]
    TokenExpired,
    #[error("token malformed")]
    TokenMalformed,
    #[error("invalid token signature")]
    TokenInvalidSignature,
    #[error("refresh key does not match an active session")]
    RefreshKeyInvalid,
    #[error("session store unavailable")]
    StoreUnavailable(#[from] StoreError),
    #[error("invalid key length")]
    InvalidKeyLength,
}
