//! Small value types used by the identity service API.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Whether a local user or identity is signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoginStatus {
    NotLoggedIn,
    LoggedIn,
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "NotLoggedIn"),
            Self::LoggedIn => write!(f, "LoggedIn"),
        }
    }
}

/// Credentials a caller passes to [`login`](crate::IdentityService::login).
///
/// The implicit grant collects the real credentials in the browser, so
/// the provider never looks at these. They are kept in memory per slot
/// after a successful login so [`auto_login`](crate::IdentityService::auto_login)
/// can repeat the request.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    /// Credential type, e.g. `"implicit"`.
    pub kind: String,
    /// Login hint (user name, email), may be empty.
    pub id: String,
    /// Opaque token. Sensitive.
    pub token: String,
}

impl LoginCredentials {
    /// Credentials of the given kind with no id or token.
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Privileges a host may ask about before letting a user do something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserPrivilege {
    CanPlay,
    CanPlayOnline,
    CanCommunicateOnline,
    CanUseUserGeneratedContent,
}
