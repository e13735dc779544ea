//! End-to-end lifecycle coverage over the in-memory store: issue, validate,
//! rotate, revoke, and the cross-checks that bind the two credentials.

use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;

use sesio::store::MemorySessionStore;
use sesio::{Error, Identity, SessionConfig, SessionManager};

const SIGNING_KEY: &[u8] = b"lifecycle-test-signing-key";
const ENCRYPTION_KEY: &[u8] = b"0123456789abcdef0123456789abcdef";
const ENCRYPTION_IV: &[u8] = b"fedcba9876543210";

fn manager(validity: Duration) -> Result<SessionManager> {
    let config = SessionConfig::new(
        SIGNING_KEY.to_vec(),
        ENCRYPTION_KEY.to_vec(),
        ENCRYPTION_IV.to_vec(),
    )?
    .with_validity(validity);
    Ok(SessionManager::new(
        config,
        Arc::new(MemorySessionStore::new()),
    )?)
}

#[tokio::test]
async fn create_then_validate_returns_matching_record() -> Result<()> {
    let manager = manager(Duration::minutes(10))?;

    let pair = manager.create("user-1", "operator", None).await?;
    let record = manager.validate_access_token(&pair.access_token).await?;

    assert_eq!(record.identity_id, "user-1");
    assert_eq!(record.role, "operator");
    assert_eq!(record.slot, "default");
    assert_eq!(record.expires_at, pair.expires_at);

    // The view the middleware collaborator puts into request scope.
    let identity = Identity::from(&record);
    assert_eq!(identity.identity_id, "user-1");
    assert_eq!(identity.session_id, record.id);
    Ok(())
}

#[tokio::test]
async fn refresh_rotates_the_session_id() -> Result<()> {
    let manager = manager(Duration::minutes(10))?;

    let pair = manager.create("user-1", "operator", None).await?;
    let old = manager.validate_access_token(&pair.access_token).await?;

    let rotated = manager.refresh(&pair.refresh_token, &pair.access_token).await?;
    let new = manager.validate_access_token(&rotated.access_token).await?;

    assert_ne!(new.id, old.id);
    assert_eq!(new.identity_id, "user-1");
    assert_eq!(new.role, "operator");

    // The superseded access token can no longer be refreshed: the index
    // now points at the rotated session.
    assert!(matches!(
        manager.refresh(&pair.refresh_token, &pair.access_token).await,
        Err(Error::RefreshKeyInvalid)
    ));
    Ok(())
}

#[tokio::test]
async fn refresh_rejects_credentials_from_different_slots() -> Result<()> {
    let manager = manager(Duration::minutes(10))?;

    let phone = manager.create("user-1", "operator", Some("phone")).await?;
    let laptop = manager.create("user-1", "operator", Some("laptop")).await?;

    // Refresh token from one slot, access token from the other.
    assert!(matches!(
        manager.refresh(&phone.refresh_token, &laptop.access_token).await,
        Err(Error::RefreshKeyInvalid)
    ));

    // The right pairing still works.
    assert!(manager.refresh(&phone.refresh_token, &phone.access_token).await.is_ok());
    Ok(())
}

#[tokio::test]
async fn refresh_rejects_credentials_across_identities() -> Result<()> {
    let manager = manager(Duration::minutes(10))?;

    let alice = manager.create("alice", "operator", None).await?;
    let mallory = manager.create("mallory", "operator", None).await?;

    assert!(matches!(
        manager.refresh(&mallory.refresh_token, &alice.access_token).await,
        Err(Error::RefreshKeyInvalid)
    ));
    Ok(())
}

#[tokio::test]
async fn tampered_access_token_is_invalid_signature() -> Result<()> {
    let manager = manager(Duration::minutes(10))?;
    let pair = manager.create("user-1", "operator", None).await?;

    let sig_start = pair
        .access_token
        .rfind('.')
        .map(|dot| dot + 1)
        .unwrap_or_default();
    let mut bytes = pair.access_token.clone().into_bytes();
    let pos = sig_start + 2;
    bytes[pos] = if bytes[pos] == b'A' { b'B' } else { b'A' };
    let tampered = String::from_utf8(bytes)?;

    assert!(matches!(
        manager.validate_access_token(&tampered).await,
        Err(Error::TokenInvalidSignature)
    ));
    Ok(())
}

#[tokio::test]
async fn garbage_refresh_token_is_malformed() -> Result<()> {
    let manager = manager(Duration::minutes(10))?;
    let pair = manager.create("user-1", "operator", None).await?;

    assert!(matches!(
        manager.refresh("definitely not a token", &pair.access_token).await,
        Err(Error::TokenMalformed)
    ));
    Ok(())
}

#[tokio::test]
async fn expired_access_token_still_refreshes() -> Result<()> {
    // Negative validity: tokens and records are expired on arrival, but the
    // index entry survives, which is exactly the refresh window.
    let manager = manager(Duration::seconds(-5))?;
    let pair = manager.create("user-1", "operator", None).await?;

    assert!(matches!(
        manager.validate_access_token(&pair.access_token).await,
        Err(Error::TokenExpired)
    ));

    let rotated = manager.refresh(&pair.refresh_token, &pair.access_token).await?;
    assert_ne!(rotated.access_token, pair.access_token);
    Ok(())
}

#[tokio::test]
async fn invalidate_one_retires_only_that_session() -> Result<()> {
    let manager = manager(Duration::minutes(10))?;

    let phone = manager.create("user-1", "operator", Some("phone")).await?;
    let laptop = manager.create("user-1", "operator", Some("laptop")).await?;

    let phone_record = manager.validate_access_token(&phone.access_token).await?;
    assert!(manager.invalidate(&phone_record.id).await?);

    assert!(matches!(
        manager.validate_access_token(&phone.access_token).await,
        Err(Error::TokenExpired)
    ));
    // The refresh window closes with the session.
    assert!(matches!(
        manager.refresh(&phone.refresh_token, &phone.access_token).await,
        Err(Error::RefreshKeyInvalid)
    ));
    assert!(manager.validate_access_token(&laptop.access_token).await.is_ok());

    // Second delete of the same session is a no-op.
    assert!(!manager.invalidate(&phone_record.id).await?);
    Ok(())
}

#[tokio::test]
async fn invalidate_all_retires_every_slot() -> Result<()> {
    let manager = manager(Duration::minutes(10))?;

    let slots = ["phone", "laptop", "tv"];
    let mut pairs = Vec::new();
    for slot in slots {
        pairs.push(manager.create("user-1", "operator", Some(slot)).await?);
    }

    manager.invalidate_all("user-1").await?;

    for pair in &pairs {
        assert!(matches!(
            manager.validate_access_token(&pair.access_token).await,
            Err(Error::TokenExpired)
        ));
        // The index is gone too, so nothing can be refreshed back to life.
        assert!(matches!(
            manager.refresh(&pair.refresh_token, &pair.access_token).await,
            Err(Error::RefreshKeyInvalid)
        ));
    }

    // Idempotent on an identity with no sessions left.
    manager.invalidate_all("user-1").await?;
    Ok(())
}
