//! Identity provider interface and the credential handling shared by the
//! bundled backends.

use std::future::Future;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::watch;

use super::{DocumentStore, from_document, to_document};
use crate::constants::{CREDENTIALS_COLLECTION, MEMBERS_COLLECTION};
use crate::error::{UntetheredError, UntetheredResult};
use crate::member::Member;

/// A signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub uid: String,
    pub email: String,
}

/// Whether a session survives the process that created it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persistence {
    /// Forgotten when the process exits.
    Session,
    #[default]
    Durable,
}

/// Profile fields stored on the member record at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
}

pub trait IdentityProvider: Send + Sync {
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = UntetheredResult<Session>> + Send;

    /// Create an identity and its member record, then sign in as it.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: Profile,
    ) -> impl Future<Output = UntetheredResult<Session>> + Send;

    fn sign_out(&self) -> impl Future<Output = UntetheredResult<()>> + Send;

    /// Applies to sessions started after the call.
    fn set_persistence(&self, persistence: Persistence) -> UntetheredResult<()>;

    fn current_session(&self) -> Option<Session>;

    /// Subscribe to session changes. Dropping the subscription unsubscribes.
    fn subscribe(&self) -> SessionSubscription;
}

/// Stream of session changes.
pub struct SessionSubscription {
    rx: watch::Receiver<Option<Session>>,
}

impl SessionSubscription {
    pub(crate) fn new(rx: watch::Receiver<Option<Session>>) -> Self {
        SessionSubscription { rx }
    }

    pub fn current(&self) -> Option<Session> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. Returns `None` once the provider is gone.
    pub async fn changed(&mut self) -> Option<Option<Session>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Credential {
    uid: String,
    salt: String,
    password_hash: String,
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn credential_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Register `email` in the credentials collection and write its member record.
pub(crate) async fn register<S: DocumentStore>(
    store: &S,
    email: &str,
    password: &str,
    profile: Profile,
) -> UntetheredResult<Session> {
    let key = credential_key(email);
    if store.get(CREDENTIALS_COLLECTION, &key).await?.is_some() {
        return Err(UntetheredError::Auth(format!(
            "an account already exists for {key}"
        )));
    }

    let uid = uuid::Uuid::new_v4().to_string();
    let salt = uuid::Uuid::new_v4().simple().to_string();
    let credential = Credential {
        uid: uid.clone(),
        password_hash: hash_password(&salt, password),
        salt,
    };
    store
        .set(CREDENTIALS_COLLECTION, &key, to_document(&credential)?)
        .await?;

    let member = Member {
        uid: uid.clone(),
        display_name: profile.display_name,
        email: Some(email.trim().to_string()),
        phone_number: profile.phone_number,
    };
    store
        .set(MEMBERS_COLLECTION, &uid, member.to_document()?)
        .await?;

    tracing::info!(uid = %uid, "registered new member");

    Ok(Session {
        uid,
        email: email.trim().to_string(),
    })
}

/// Check `password` against the stored credential for `email`.
pub(crate) async fn authenticate<S: DocumentStore>(
    store: &S,
    email: &str,
    password: &str,
) -> UntetheredResult<Session> {
    let key = credential_key(email);
    let invalid = || UntetheredError::Auth("invalid email or password".into());

    let document = store
        .get(CREDENTIALS_COLLECTION, &key)
        .await?
        .ok_or_else(invalid)?;
    let credential: Credential = from_document(document)?;

    if hash_password(&credential.salt, password) != credential.password_hash {
        return Err(invalid());
    }

    Ok(Session {
        uid: credential.uid,
        email: email.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_depends_on_salt() {
        assert_ne!(hash_password("a", "secret"), hash_password("b", "secret"));
        assert_eq!(hash_password("a", "secret"), hash_password("a", "secret"));
        assert_eq!(hash_password("a", "secret").len(), 64);
    }

    #[test]
    fn test_credential_key_normalizes_email() {
        assert_eq!(credential_key("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn test_persistence_serde() {
        assert_eq!(serde_json::to_string(&Persistence::Durable).unwrap(), "\"durable\"");
        let p: Persistence = serde_json::from_str("\"session\"").unwrap();
        assert_eq!(p, Persistence::Session);
    }
}
