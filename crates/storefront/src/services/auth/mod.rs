//! Authentication session store.
//!
//! Caches the signed-in customer and the session cookies in client-local
//! storage so a restart resumes the session instantly; [`AuthStore::hydrate`]
//! then confirms it with `auth/me/`.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use loopstore_core::Email;

use crate::api::{ApiClient, ApiError, User};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::session::{StoredSession, keys};
use crate::storage::{Storage, StorageExt};

/// Minimum password length accepted at registration.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Observable cache of the signed-in customer.
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthStoreInner>,
}

struct AuthStoreInner {
    state: watch::Sender<Option<User>>,
    storage: Arc<dyn Storage>,
    api: ApiClient,
}

impl AuthStore {
    /// Open the store with the cached user and session cookies, if any.
    ///
    /// Nothing is verified yet; call [`hydrate`](Self::hydrate) for that.
    #[must_use]
    pub fn open(storage: Arc<dyn Storage>, api: ApiClient) -> Self {
        let user = storage.load::<User>(keys::USER).unwrap_or_else(|e| {
            warn!(error = %e, "Discarding unreadable cached user");
            None
        });

        match storage.load::<StoredSession>(keys::SESSION) {
            Ok(Some(session)) => api.restore_session_cookies(&session.cookies),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Discarding unreadable session cookies"),
        }

        Self {
            inner: Arc::new(AuthStoreInner {
                state: watch::Sender::new(user),
                storage,
                api,
            }),
        }
    }

    /// Whether a customer is signed in (according to the local cache).
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    /// The cached customer.
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().clone()
    }

    /// Receive the session state after every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.inner.state.subscribe()
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Confirm the cached session with `auth/me/`.
    ///
    /// A confirmed profile replaces the cache. A rejected session (401/403)
    /// or an unreachable API clears it. Any other failure leaves it as is.
    #[instrument(skip(self))]
    pub async fn hydrate(&self) -> Option<User> {
        match self.inner.api.me().await {
            Ok(user) => {
                debug!(user_id = %user.id, "Session confirmed");
                self.sign_in(user);
            }
            Err(e) if e.is_auth_failure() => {
                debug!("Session rejected, clearing cached user");
                self.forget_user();
                self.inner.api.clear_session_cookies();
                self.remove_persisted(keys::SESSION);
            }
            Err(e) if e.is_network() => {
                warn!(error = %e, "API unreachable, clearing cached user");
                self.forget_user();
            }
            Err(e) => warn!(error = %e, "Could not confirm session, keeping cache"),
        }
        self.current_user()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address,
    /// `AuthError::InvalidCredentials` if the API rejects the credentials, or
    /// `AuthError::Api` for other failures. The store is unchanged on error.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let user = self
            .inner
            .api
            .login(&email, password)
            .await
            .map_err(credentials_error)?;

        info!(user_id = %user.id, "Signed in");
        Ok(self.confirm(user).await)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `AuthError::WeakPassword` (fewer
    /// than 8 characters), or `AuthError::Api` if the API rejects the
    /// registration. The store is unchanged on error.
    #[instrument(skip(self, email, password, first_name, last_name))]
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;

        let user = self
            .inner
            .api
            .register(&email, password, first_name, last_name)
            .await?;

        info!(user_id = %user.id, "Registered");
        Ok(self.confirm(user).await)
    }

    /// Sign out.
    ///
    /// The local session is dropped before the API is told, so
    /// [`is_authenticated`](Self::is_authenticated) is `false` immediately.
    /// The `auth/logout/` call is best effort.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Storage` if the persisted session could not be
    /// removed (it would be restored on the next start).
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.inner.state.send_replace(None);
        clear_sentry_user();
        let removed = self
            .inner
            .storage
            .remove(keys::USER)
            .and_then(|()| self.inner.storage.remove(keys::SESSION));

        if let Err(e) = self.inner.api.logout().await {
            warn!(error = %e, "Server-side logout failed");
        }
        self.inner.api.clear_session_cookies();

        info!("Signed out");
        removed.map_err(AuthError::from)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Cache a freshly authenticated profile, then prefer `auth/me/`'s view.
    async fn confirm(&self, user: User) -> User {
        self.sign_in(user.clone());
        match self.inner.api.me().await {
            Ok(confirmed) => {
                self.sign_in(confirmed.clone());
                confirmed
            }
            Err(e) => {
                debug!(error = %e, "Profile reconciliation failed, keeping login response");
                user
            }
        }
    }

    fn sign_in(&self, user: User) {
        set_sentry_user(&user.id, Some(user.email.as_str()));
        if let Err(e) = self.inner.storage.save(keys::USER, &user) {
            warn!(error = %e, "Failed to persist user");
        }
        self.persist_session();
        self.inner
            .state
            .send_if_modified(|current| replace_if_changed(current, Some(user)));
    }

    fn forget_user(&self) {
        clear_sentry_user();
        self.remove_persisted(keys::USER);
        self.inner
            .state
            .send_if_modified(|current| replace_if_changed(current, None));
    }

    fn persist_session(&self) {
        let Some(cookies) = self.inner.api.session_cookies() else {
            return;
        };
        if let Err(e) = self
            .inner
            .storage
            .save(keys::SESSION, &StoredSession { cookies })
        {
            warn!(error = %e, "Failed to persist session cookies");
        }
    }

    fn remove_persisted(&self, key: &str) {
        if let Err(e) = self.inner.storage.remove(key) {
            warn!(error = %e, key, "Failed to remove persisted session data");
        }
    }
}

fn replace_if_changed(current: &mut Option<User>, next: Option<User>) -> bool {
    if *current == next {
        return false;
    }
    *current = next;
    true
}

/// Map a rejected login onto `InvalidCredentials`.
///
/// The API answers bad credentials with 400, 401 or 403 depending on the
/// authentication backend.
fn credentials_error(error: ApiError) -> AuthError {
    match error.status() {
        Some(400 | 401 | 403) => AuthError::InvalidCredentials,
        _ => AuthError::Api(error),
    }
}

fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;
    use crate::storage::MemoryStorage;

    fn api(server: &MockServer) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: url::Url::parse(&format!("{}/api/", server.uri())).unwrap(),
            timeout: Duration::from_secs(5),
            cache_ttl: None,
        })
        .unwrap()
    }

    fn user_json() -> serde_json::Value {
        json!({"id": 9, "email": "ola@example.com", "first_name": "Ola", "last_name": "K"})
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password(&secret("short")).is_err());
        assert!(validate_password(&secret("long enough")).is_ok());
    }

    #[test]
    fn test_credentials_error_mapping() {
        assert!(matches!(
            credentials_error(ApiError::Unauthorized),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            credentials_error(ApiError::Status {
                status: 400,
                message: "Invalid email or password.".to_string()
            }),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            credentials_error(ApiError::Status {
                status: 502,
                message: String::new()
            }),
            AuthError::Api(_)
        ));
    }

    #[tokio::test]
    async fn test_login_caches_and_persists_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(user_json())
                    .insert_header("set-cookie", "sessionid=s3cr3t; Path=/; HttpOnly"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .mount(&server)
            .await;

        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let auth = AuthStore::open(Arc::clone(&storage), api(&server));
        assert!(!auth.is_authenticated());

        let user = auth
            .login(" Ola@Example.com ", &secret("password123"))
            .await
            .unwrap();
        assert_eq!(user.first_name, "Ola");
        assert!(auth.is_authenticated());

        let cached: User = storage.load(keys::USER).unwrap().unwrap();
        assert_eq!(cached, user);
        let session: StoredSession = storage.load(keys::SESSION).unwrap().unwrap();
        assert!(session.cookies.contains("sessionid=s3cr3t"));
    }

    #[tokio::test]
    async fn test_failed_login_leaves_store() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
            )
            .mount(&server)
            .await;

        let auth = AuthStore::open(Arc::new(MemoryStorage::new()), api(&server));
        let err = auth
            .login("ola@example.com", &secret("wrongpass"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!auth.is_authenticated());

        let err = auth.login("not-an-email", &secret("x")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn test_hydrate_rejected_session_clears_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set_raw(keys::USER, &user_json().to_string()).unwrap();

        let auth = AuthStore::open(Arc::clone(&storage), api(&server));
        assert!(auth.is_authenticated());

        assert!(auth.hydrate().await.is_none());
        assert!(!auth.is_authenticated());
        assert!(storage.get_raw(keys::USER).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_hydrate_server_error_keeps_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/me/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        storage.set_raw(keys::USER, &user_json().to_string()).unwrap();

        let auth = AuthStore::open(storage, api(&server));
        assert!(auth.hydrate().await.is_some());
    }

    #[tokio::test]
    async fn test_register_rejects_short_password_locally() {
        let server = MockServer::start().await;
        let auth = AuthStore::open(Arc::new(MemoryStorage::new()), api(&server));
        let err = auth
            .register("new@example.com", &secret("1234"), "New", "User")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
