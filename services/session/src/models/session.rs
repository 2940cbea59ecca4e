//! Session model and related functionality

use serde::{Deserialize, Serialize};

use super::User;

/// Tri-state authentication flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Not yet checked since start-up or since the last token refresh
    #[default]
    Unknown,
    /// The access token was accepted by the API
    Authenticated,
    /// No usable credentials
    Unauthenticated,
}

impl AuthStatus {
    /// `None` while unknown, otherwise whether the session is authenticated
    pub fn as_bool(self) -> Option<bool> {
        match self {
            AuthStatus::Unknown => None,
            AuthStatus::Authenticated => Some(true),
            AuthStatus::Unauthenticated => Some(false),
        }
    }
}

/// Outcome of an account request that does not touch credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    Succeeded,
    Failed,
}

impl RequestOutcome {
    pub fn is_success(self) -> bool {
        self == RequestOutcome::Succeeded
    }
}

/// In-memory session state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub status: AuthStatus,
    pub user: Option<User>,
    /// Outcome of the last reset, sign-up or activation request
    pub last_request: Option<RequestOutcome>,
    /// Bumped each time a refreshed token pair is published
    pub generation: u64,
}

impl Session {
    /// Session restored from persisted credentials, status not yet checked
    pub fn restore(access: Option<String>, refresh: Option<String>) -> Self {
        Self {
            access,
            refresh,
            ..Self::default()
        }
    }

    /// Drop every credential and the profile, leaving the session unauthenticated
    pub fn clear(&mut self) {
        self.access = None;
        self.refresh = None;
        self.user = None;
        self.status = AuthStatus::Unauthenticated;
    }

    /// Mark the session authenticated. Refuses without an access token
    pub fn authenticate(&mut self) -> bool {
        if self.access.is_none() {
            return false;
        }
        self.status = AuthStatus::Authenticated;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_starts_unknown() {
        let session = Session::restore(Some("A1".to_string()), None);
        assert_eq!(session.status, AuthStatus::Unknown);
        assert_eq!(session.status.as_bool(), None);
        assert_eq!(session.generation, 0);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut session = Session::restore(Some("A1".to_string()), Some("R1".to_string()));
        session.user = Some(User::default());
        assert!(session.authenticate());

        session.clear();

        assert_eq!(session.access, None);
        assert_eq!(session.refresh, None);
        assert_eq!(session.user, None);
        assert_eq!(session.status, AuthStatus::Unauthenticated);
    }

    #[test]
    fn test_authenticate_requires_access() {
        let mut session = Session::restore(None, Some("R1".to_string()));
        assert!(!session.authenticate());
        assert_eq!(session.status, AuthStatus::Unknown);
    }
}
