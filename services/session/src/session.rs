//! Session management: credential lifecycle and authentication state
//!
//! [`SessionManager`] owns the current [`Session`] and is the only thing that
//! mutates it. Views read it through [`SessionManager::snapshot`] or subscribe
//! to changes with [`SessionManager::subscribe`]. Every transition is
//! published as a single update, so subscribers never observe a half-applied
//! change (for example a cleared access token with a surviving refresh token).
//!
//! Operations never fail from the caller's point of view: missing
//! credentials, invalid tokens and transport errors all resolve into a state
//! transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::CredentialStore;
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};

use crate::client::AuthApi;
use crate::config::ApiConfig;
use crate::error::{SessionError, SessionResult};
use crate::jwt;
use crate::models::{
    AccountActivation, AuthStatus, EmailResetConfirm, LoginCredentials, NewUser,
    PasswordResetConfirm, RequestOutcome, Session, User,
};

/// Store key holding the access token
pub const ACCESS_KEY: &str = "access";
/// Store key holding the refresh token
pub const REFRESH_KEY: &str = "refresh";

/// Session manager for handling the client's authentication state
#[derive(Clone)]
pub struct SessionManager {
    api: AuthApi,
    store: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<Session>>,
    // Held for the whole of each public operation so operations never interleave
    op_lock: Arc<Mutex<()>>,
}

impl SessionManager {
    /// Create a new session manager, restoring any persisted credentials
    pub fn new(api: AuthApi, store: Arc<dyn CredentialStore>) -> Self {
        let access = read_credential(store.as_ref(), ACCESS_KEY);
        let refresh = read_credential(store.as_ref(), REFRESH_KEY);

        info!(
            "Restored session (access: {}, refresh: {})",
            presence(&access),
            presence(&refresh)
        );

        let (state, _) = watch::channel(Session::restore(access, refresh));

        Self {
            api,
            store,
            state: Arc::new(state),
            op_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create a session manager persisting to the configured session file
    pub fn from_config(config: ApiConfig) -> SessionResult<Self> {
        let store = common::FileStore::open(&config.session_file)?;
        let api = AuthApi::new(config)?;
        Ok(Self::new(api, Arc::new(store)))
    }

    /// Current session state
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Receiver notified on every session change
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Current authentication flag
    pub fn status(&self) -> AuthStatus {
        self.state.borrow().status
    }

    /// Current access token, for building authenticated requests
    pub fn access(&self) -> Option<String> {
        self.state.borrow().access.clone()
    }

    /// Current user profile
    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    /// Expiry of the access token, when it is a JWT with an `exp` claim
    pub fn access_expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.borrow().access.as_deref().and_then(jwt::expires_at)
    }

    /// Decide whether the stored credentials still authenticate the user
    ///
    /// Verifies the access token; falls back to a silent refresh when there
    /// is no access token or the API rejects it.
    pub async fn check_authenticated(&self) -> AuthStatus {
        let _guard = self.op_lock.lock().await;
        self.verify_or_refresh().await;
        self.status()
    }

    /// Obtain a new token pair with the stored refresh token
    ///
    /// On success the new pair is published with the status reset to
    /// [`AuthStatus::Unknown`] and the generation bumped, then the new access
    /// token is verified once. Any failure clears the session.
    pub async fn refresh_tokens(&self) -> AuthStatus {
        let _guard = self.op_lock.lock().await;
        self.refresh().await;
        self.status()
    }

    /// Fetch the profile of the authenticated user
    ///
    /// Never changes the authentication status.
    pub async fn load_user(&self) -> Option<User> {
        let _guard = self.op_lock.lock().await;
        self.fetch_user().await;
        self.user()
    }

    /// Exchange credentials for a token pair
    pub async fn login(&self, email: &str, password: &str) -> AuthStatus {
        let _guard = self.op_lock.lock().await;
        info!("Login attempt for user: {}", email);

        let credentials = LoginCredentials {
            email: email.to_string(),
            password: password.to_string(),
        };

        match self.api.login(&credentials).await {
            Ok(response) => {
                self.persist(Some(response.access.clone()), Some(response.refresh.clone()))
                    .await;
                self.state.send_modify(|session| {
                    session.access = Some(response.access);
                    session.refresh = Some(response.refresh);
                    session.status = AuthStatus::Authenticated;
                    session.user = Some(response.profile);
                });
                info!("Login succeeded for user: {}", email);

                self.fetch_user().await;
            }
            Err(e) => {
                warn!("Login failed for user {}: {}", email, e);
                self.clear().await;
            }
        }

        self.status()
    }

    /// Forget every credential and the user profile
    pub async fn logout(&self) {
        let _guard = self.op_lock.lock().await;
        info!("Logging out");
        self.clear().await;
    }

    /// Request a password reset email
    pub async fn password_reset(&self, email: &str) -> RequestOutcome {
        let _guard = self.op_lock.lock().await;
        let result = self.api.reset_password(email).await;
        self.record_outcome("Password reset", result)
    }

    /// Apply a new password with the uid/token pair from the reset email
    pub async fn password_reset_confirm(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
        re_new_password: &str,
    ) -> RequestOutcome {
        let _guard = self.op_lock.lock().await;
        let confirm = PasswordResetConfirm {
            uid: uid.to_string(),
            token: token.to_string(),
            new_password: new_password.to_string(),
            re_new_password: re_new_password.to_string(),
        };
        let result = self.api.reset_password_confirm(&confirm).await;
        self.record_outcome("Password reset confirmation", result)
    }

    /// Request a reset of the account email, which is also the login name
    pub async fn email_reset(&self, email: &str) -> RequestOutcome {
        let _guard = self.op_lock.lock().await;
        let result = self.api.reset_email(email).await;
        self.record_outcome("Email reset", result)
    }

    /// Apply a new account email with the uid/token pair from the reset message
    pub async fn email_reset_confirm(
        &self,
        uid: &str,
        token: &str,
        new_email: &str,
        re_new_email: &str,
    ) -> RequestOutcome {
        let _guard = self.op_lock.lock().await;
        let confirm = EmailResetConfirm {
            uid: uid.to_string(),
            token: token.to_string(),
            new_email: new_email.to_string(),
            re_new_email: re_new_email.to_string(),
        };
        let result = self.api.reset_email_confirm(&confirm).await;
        self.record_outcome("Email reset confirmation", result)
    }

    /// Register a new account. The account stays inactive until activated
    pub async fn sign_up(
        &self,
        username: &str,
        email: &str,
        password: &str,
        re_password: &str,
    ) -> RequestOutcome {
        let _guard = self.op_lock.lock().await;
        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            re_password: re_password.to_string(),
        };
        let result = self.api.create_user(&new_user).await;
        self.record_outcome("Sign-up", result)
    }

    /// Activate an account with the uid/token pair from the activation email
    pub async fn activate(&self, uid: &str, token: &str) -> RequestOutcome {
        let _guard = self.op_lock.lock().await;
        let activation = AccountActivation {
            uid: uid.to_string(),
            token: token.to_string(),
        };
        let result = self.api.activate(&activation).await;
        self.record_outcome("Activation", result)
    }

    async fn verify_or_refresh(&self) {
        let Some(access) = self.access() else {
            info!("No access token stored, attempting refresh");
            self.refresh().await;
            return;
        };

        match self.api.verify(&access).await {
            Ok(()) => {
                info!("Access token is valid, user authenticated");
                self.authenticate();
                self.fetch_user().await;
            }
            Err(e) => {
                warn!("Access token verification failed: {}", e);
                self.refresh().await;
            }
        }
    }

    async fn refresh(&self) {
        let stored = self.state.borrow().refresh.clone();
        let Some(refresh) = stored else {
            info!("No refresh token stored, session is unauthenticated");
            self.clear().await;
            return;
        };

        let tokens = match self.api.refresh(&refresh).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Token refresh failed: {}", e);
                self.clear().await;
                return;
            }
        };

        let access = tokens.access;
        let refresh = tokens.refresh.unwrap_or(refresh);
        self.persist(Some(access.clone()), Some(refresh.clone())).await;

        let mut generation = 0;
        self.state.send_modify(|session| {
            session.access = Some(access.clone());
            session.refresh = Some(refresh);
            session.status = AuthStatus::Unknown;
            session.user = None;
            session.generation += 1;
            generation = session.generation;
        });
        info!("Tokens refreshed, session generation {}", generation);

        // Re-validate once with the new pair. A failure here clears the
        // session instead of refreshing again.
        match self.api.verify(&access).await {
            Ok(()) => {
                self.authenticate();
                self.fetch_user().await;
            }
            Err(e) => {
                warn!("Refreshed access token was rejected: {}", e);
                self.clear().await;
            }
        }
    }

    async fn fetch_user(&self) {
        let result = match self.access() {
            Some(access) => self.api.profile(&access).await,
            None => Err(SessionError::MissingCredential(ACCESS_KEY)),
        };

        match result {
            Ok(user) => {
                info!("Loaded profile for {}", user.display_name());
                self.state.send_modify(|session| session.user = Some(user));
            }
            Err(e) => {
                warn!("Failed to load user profile: {}", e);
                self.state.send_modify(|session| session.user = None);
            }
        }
    }

    fn authenticate(&self) {
        self.state.send_modify(|session| {
            if !session.authenticate() {
                warn!("Refusing to mark a session without access token as authenticated");
            }
        });
    }

    async fn clear(&self) {
        self.persist(None, None).await;
        self.state.send_modify(Session::clear);
    }

    fn record_outcome(&self, action: &str, result: SessionResult<()>) -> RequestOutcome {
        let outcome = match result {
            Ok(()) => {
                info!("{} request succeeded", action);
                RequestOutcome::Succeeded
            }
            Err(e) => {
                warn!("{} request failed: {}", action, e);
                RequestOutcome::Failed
            }
        };

        self.state
            .send_modify(|session| session.last_request = Some(outcome));
        outcome
    }

    /// Mirror the credentials into the store. Store failures are logged; the
    /// in-memory session stays authoritative for this process.
    ///
    /// Store implementations may block on disk I/O, so the writes run on the
    /// blocking pool.
    async fn persist(&self, access: Option<String>, refresh: Option<String>) {
        let store = Arc::clone(&self.store);

        let written = tokio::task::spawn_blocking(move || {
            for (key, value) in [(ACCESS_KEY, access), (REFRESH_KEY, refresh)] {
                let result = match value.as_deref() {
                    Some(value) => store.set(key, value),
                    None => store.remove(key),
                };
                if let Err(e) = result {
                    error!("Failed to persist {} token: {}", key, e);
                }
            }
        })
        .await;

        if let Err(e) = written {
            error!("Credential store task failed: {}", e);
        }
    }
}

fn read_credential(store: &dyn CredentialStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(e) => {
            error!("Failed to read {} token from store: {}", key, e);
            None
        }
    }
}

fn presence(value: &Option<String>) -> &'static str {
    if value.is_some() { "present" } else { "absent" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{MemoryStore, StoreError, StoreResult};

    /// Reads succeed, writes always fail
    struct FailingStore(MemoryStore);

    impl CredentialStore for FailingStore {
        fn get(&self, key: &str) -> StoreResult<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("read-only filesystem")))
        }

        fn remove(&self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::other("read-only filesystem")))
        }
    }

    // Nothing listens on the discard port, so any request fails fast
    fn offline_manager(store: Arc<dyn CredentialStore>) -> SessionManager {
        let api = AuthApi::new(ApiConfig::with_api_url("http://127.0.0.1:9"))
            .expect("client builds");
        SessionManager::new(api, store)
    }

    fn failing_store() -> Arc<FailingStore> {
        Arc::new(FailingStore(MemoryStore::with_entries([
            (ACCESS_KEY, "A1"),
            (REFRESH_KEY, "R1"),
        ])))
    }

    #[test]
    fn test_new_restores_persisted_credentials() {
        let store = Arc::new(MemoryStore::with_entries([
            (ACCESS_KEY, "A1"),
            (REFRESH_KEY, "R1"),
        ]));
        let manager = offline_manager(store);

        let session = manager.snapshot();
        assert_eq!(session.access.as_deref(), Some("A1"));
        assert_eq!(session.refresh.as_deref(), Some("R1"));
        assert_eq!(session.status, AuthStatus::Unknown);
        assert_eq!(session.user, None);
    }

    #[test]
    fn test_new_treats_empty_values_as_absent() {
        let store = Arc::new(MemoryStore::with_entries([(ACCESS_KEY, "")]));
        let manager = offline_manager(store);
        assert_eq!(manager.access(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_memory_and_store() {
        let store = Arc::new(MemoryStore::with_entries([
            (ACCESS_KEY, "A1"),
            (REFRESH_KEY, "R1"),
        ]));
        let manager = offline_manager(store.clone());

        manager.logout().await;

        let session = manager.snapshot();
        assert_eq!(session.access, None);
        assert_eq!(session.refresh, None);
        assert_eq!(session.user, None);
        assert_eq!(session.status, AuthStatus::Unauthenticated);
        assert_eq!(manager.status(), AuthStatus::Unauthenticated);
        assert_eq!(store.get(ACCESS_KEY).unwrap(), None);
        assert_eq!(store.get(REFRESH_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_clears_memory_when_store_rejects_writes() {
        let store = failing_store();
        let manager = offline_manager(store.clone());
        assert_eq!(manager.access().as_deref(), Some("A1"));

        manager.logout().await;

        let session = manager.snapshot();
        assert_eq!(session.access, None);
        assert_eq!(session.refresh, None);
        assert_eq!(session.status, AuthStatus::Unauthenticated);
        // The write failed, so the old pair is still on disk
        assert_eq!(store.get(ACCESS_KEY).unwrap().as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn test_failed_check_clears_memory_when_store_rejects_writes() {
        let manager = offline_manager(failing_store());

        assert_eq!(
            manager.check_authenticated().await,
            AuthStatus::Unauthenticated
        );
        let session = manager.snapshot();
        assert_eq!(session.access, None);
        assert_eq!(session.refresh, None);
        assert_eq!(session.user, None);
    }

    #[tokio::test]
    async fn test_unreachable_api_fails_closed() {
        let store = Arc::new(MemoryStore::with_entries([
            (ACCESS_KEY, "A1"),
            (REFRESH_KEY, "R1"),
        ]));
        let manager = offline_manager(store.clone());

        assert_eq!(
            manager.check_authenticated().await,
            AuthStatus::Unauthenticated
        );
        assert_eq!(manager.access(), None);
        assert_eq!(store.get(REFRESH_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_user_without_access_clears_user() {
        let manager = offline_manager(Arc::new(MemoryStore::new()));
        assert_eq!(manager.load_user().await, None);
        assert_eq!(manager.status(), AuthStatus::Unknown);
    }

    #[tokio::test]
    async fn test_failed_reset_only_records_outcome() {
        let store = Arc::new(MemoryStore::with_entries([(ACCESS_KEY, "A1")]));
        let manager = offline_manager(store);

        let outcome = manager.password_reset("u@x.com").await;

        assert_eq!(outcome, RequestOutcome::Failed);
        let session = manager.snapshot();
        assert_eq!(session.last_request, Some(RequestOutcome::Failed));
        assert_eq!(session.access.as_deref(), Some("A1"));
        assert_eq!(session.status, AuthStatus::Unknown);
    }
}
