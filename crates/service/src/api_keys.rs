//! API key issue/verify. Keys look like `sk_{token}`; only a SHA-256 digest
//! is stored, so the plaintext is shown exactly once at issue time.

use sea_orm::DatabaseConnection;
use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use common::token::generate_token;
use models::api_key;

use crate::errors::ServiceError;

const KEY_PREFIX: &str = "sk_";
const KEY_TOKEN_LEN: usize = 40;

/// Hex SHA-256 of the full plaintext key.
pub fn digest(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct IssuedKey {
    pub record: api_key::Model,
    pub plaintext: String,
}

/// Issue a new key for a user. The plaintext leaves this function once and is
/// never persisted.
pub async fn issue(db: &DatabaseConnection, user_id: Uuid, label: &str) -> Result<IssuedKey, ServiceError> {
    let plaintext = format!("{KEY_PREFIX}{}", generate_token(KEY_TOKEN_LEN));
    let record = api_key::create(db, user_id, &digest(&plaintext), label).await?;
    Ok(IssuedKey { record, plaintext })
}

/// Resolve a presented key to its active record. Returns None for unknown,
/// revoked or malformed keys.
pub async fn authenticate(db: &DatabaseConnection, presented: &str) -> Result<Option<api_key::Model>, ServiceError> {
    if !presented.starts_with(KEY_PREFIX) {
        return Ok(None);
    }
    let found = api_key::find_active_by_digest(db, &digest(presented)).await?;
    if let Some(record) = &found {
        // last_used_at is advisory; a failed touch must not fail the request
        if let Err(e) = api_key::touch_last_used(db, record.id).await {
            warn!(api_key_id = %record.id, error = %e, "failed to touch api key");
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic_hex() {
        let a = digest("sk_abc");
        let b = digest("sk_abc");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(digest("sk_abc"), digest("sk_abd"));
    }

    #[tokio::test]
    async fn issue_and_authenticate_round_trip() -> Result<(), anyhow::Error> {
        if std::env::var("SKIP_DB_TESTS").is_ok() {
            return Ok(());
        }
        let db = match crate::test_support::get_db().await {
            Ok(db) => db,
            Err(e) => {
                eprintln!("skip: {}", e);
                return Ok(());
            }
        };

        let u = models::user::create(&db, &format!("keys_{}@example.com", Uuid::new_v4()), "Key Owner")
            .await?;
        let issued = issue(&db, u.id, "ci").await?;
        assert!(issued.plaintext.starts_with("sk_"));

        let found = authenticate(&db, &issued.plaintext).await?;
        assert_eq!(found.map(|k| k.user_id), Some(u.id));

        // unknown and malformed keys resolve to None
        assert!(authenticate(&db, "sk_doesnotexist").await?.is_none());
        assert!(authenticate(&db, "bearer-style").await?.is_none());

        models::user::hard_delete(&db, u.id).await?;
        Ok(())
    }
}
