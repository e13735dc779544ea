pub mod access;
pub mod refresh;

pub use access::{AccessClaims, AccessTokenCodec};
pub use refresh::{RefreshClaims, RefreshTokenCodec};
