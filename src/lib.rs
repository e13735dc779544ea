//! Session lifecycle for HTTP services: mint a signed access token bound to
//! a server-side session record, hand out an opaque encrypted refresh token,
//! and guarantee that a stale refresh token cannot resurrect a retired
//! session.
//!
//! The crate exposes four operations through [`SessionManager`]: create,
//! validate, refresh and invalidate. Persistence goes through the
//! [`store::SessionStore`] trait; [`store::RedisSessionStore`] is the
//! production backend and [`store::MemorySessionStore`] backs tests and
//! embedded use.

pub mod config;
pub mod error;
pub mod session;
pub mod store;
pub mod token;

pub use config::SessionConfig;
pub use error::Error;
pub use session::{Identity, SessionManager, SessionRecord, TokenPair, DEFAULT_SLOT};
