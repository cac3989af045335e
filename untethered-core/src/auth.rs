//! Sign-up / sign-in forms and the resolved current viewer.

use crate::backend::{DocumentStore, IdentityProvider, Profile, Session};
use crate::constants::MIN_PASSWORD_LEN;
use crate::error::{UntetheredError, UntetheredResult, ValidationError};
use crate::goal::GoalStore;
use crate::member::Member;

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::Required("Email"));
        }
        if self.password != self.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::PasswordTooShort(MIN_PASSWORD_LEN));
        }
        Ok(())
    }

    /// Validate, then create the identity and its member record.
    pub async fn submit<I: IdentityProvider>(self, identity: &I) -> UntetheredResult<Session> {
        self.validate()?;
        let profile = Profile {
            display_name: self.display_name.filter(|n| !n.trim().is_empty()),
            phone_number: self.phone_number.filter(|p| !p.trim().is_empty()),
        };
        identity.sign_up(&self.email, &self.password, profile).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.email.trim().is_empty() {
            return Err(ValidationError::Required("Email"));
        }
        if self.password.is_empty() {
            return Err(ValidationError::Required("Password"));
        }
        Ok(())
    }

    pub async fn submit<I: IdentityProvider>(self, identity: &I) -> UntetheredResult<Session> {
        self.validate()?;
        identity.sign_in(&self.email, &self.password).await
    }
}

/// The signed-in member together with their profile, if one could be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub session: Session,
    pub member: Option<Member>,
}

impl Viewer {
    /// Look up the profile for `session`. A failed lookup leaves `member`
    /// empty rather than failing.
    pub async fn resolve<B: DocumentStore>(store: &GoalStore<B>, session: Session) -> Self {
        let member = match store.member(&session.uid).await {
            Ok(member) => member,
            Err(e) => {
                tracing::warn!(uid = %session.uid, "could not load member profile: {e}");
                None
            }
        };
        Viewer { session, member }
    }

    /// Resolve the provider's current session, or fail when signed out.
    pub async fn require<B: DocumentStore + IdentityProvider>(
        backend: &B,
        store: &GoalStore<B>,
    ) -> UntetheredResult<Self> {
        let session = backend
            .current_session()
            .ok_or_else(|| UntetheredError::Auth("not signed in".into()))?;
        Ok(Self::resolve(store, session).await)
    }

    pub fn uid(&self) -> &str {
        &self.session.uid
    }

    pub fn email(&self) -> &str {
        &self.session.email
    }

    /// Name shown on calendar bookings.
    pub fn display_name(&self) -> String {
        self.member
            .as_ref()
            .and_then(|m| m.display_name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                if self.session.email.is_empty() {
                    "Unknown".to_string()
                } else {
                    self.session.email.clone()
                }
            })
    }

    /// Short name credited on shared resources.
    pub fn handle(&self) -> String {
        self.member
            .as_ref()
            .and_then(Member::handle)
            .or_else(|| {
                self.session
                    .email
                    .split('@')
                    .next()
                    .filter(|local| !local.is_empty())
                    .map(String::from)
            })
            .unwrap_or_else(|| "Anonymous".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use std::sync::Arc;

    fn form(password: &str, confirm: &str) -> SignUpForm {
        SignUpForm {
            email: "ada@example.com".into(),
            password: password.into(),
            confirm_password: confirm.into(),
            display_name: Some("Ada".into()),
            phone_number: None,
        }
    }

    #[test]
    fn test_sign_up_validation() {
        assert_eq!(form("secret", "secret").validate(), Ok(()));
        assert_eq!(
            form("secret", "secreT").validate(),
            Err(ValidationError::PasswordMismatch)
        );
        assert_eq!(
            form("short", "short").validate(),
            Err(ValidationError::PasswordTooShort(6))
        );

        let mut no_email = form("secret", "secret");
        no_email.email = "  ".into();
        assert_eq!(no_email.validate(), Err(ValidationError::Required("Email")));
    }

    #[test]
    fn test_sign_in_validation() {
        let empty = SignInForm::default();
        assert_eq!(empty.validate(), Err(ValidationError::Required("Email")));

        let no_password = SignInForm {
            email: "ada@example.com".into(),
            password: String::new(),
        };
        assert_eq!(no_password.validate(), Err(ValidationError::Required("Password")));
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_backend() {
        let backend = MemoryBackend::new();
        backend.fail_next(1);
        let result = form("a", "b").submit(&backend).await;
        assert!(matches!(result, Err(UntetheredError::Validation(_))));
        assert!(backend.current_session().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_resolves_viewer_profile() {
        let backend = Arc::new(MemoryBackend::new());
        let store = GoalStore::new(backend.clone());

        form("secret", "secret").submit(backend.as_ref()).await.unwrap();
        let viewer = Viewer::require(backend.as_ref(), &store).await.unwrap();

        assert_eq!(viewer.display_name(), "Ada");
        assert_eq!(viewer.handle(), "Ada");
        assert_eq!(viewer.member.as_ref().map(|m| m.uid.as_str()), Some(viewer.uid()));
    }

    #[tokio::test]
    async fn test_require_fails_when_signed_out() {
        let backend = Arc::new(MemoryBackend::new());
        let store = GoalStore::new(backend.clone());
        assert!(matches!(
            Viewer::require(backend.as_ref(), &store).await,
            Err(UntetheredError::Auth(_))
        ));
    }

    #[test]
    fn test_viewer_name_fallbacks() {
        let viewer = Viewer {
            session: Session {
                uid: "u1".into(),
                email: "grace@example.com".into(),
            },
            member: None,
        };
        assert_eq!(viewer.display_name(), "grace@example.com");
        assert_eq!(viewer.handle(), "grace");

        let anonymous = Viewer {
            session: Session {
                uid: "u2".into(),
                email: String::new(),
            },
            member: None,
        };
        assert_eq!(anonymous.display_name(), "Unknown");
        assert_eq!(anonymous.handle(), "Anonymous");
    }
}
