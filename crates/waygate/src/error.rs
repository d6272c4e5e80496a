//! Unified error type for the identity service.

use std::time::Duration;

use waygate_protocol::{LocalSlot, ProtocolError};

/// Everything that can go wrong in a login, logout, or identity query.
///
/// None of these are fatal: after any of them the service is back to
/// `Idle` and ready for the next call. The type is `Clone + PartialEq`
/// because a copy travels inside every failed
/// [`IdentityEvent`](crate::IdentityEvent).
///
/// Messages never contain credentials or the anti-forgery token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Another login is still waiting for its completion.
    #[error("a login is already in progress for {0}")]
    AlreadyLoggingIn(LocalSlot),

    /// The slot is outside `0..max_local_slots`.
    #[error("invalid local slot {slot} (expected fewer than {max})")]
    InvalidSlot { slot: LocalSlot, max: u32 },

    /// Endpoint, redirect URL, or client id is missing or unusable.
    #[error("missing or invalid provider configuration: {0}")]
    MissingConfiguration(String),

    /// Logout of a slot nobody is signed in on.
    #[error("no account registered for {0}")]
    NoAccountForSlot(LocalSlot),

    /// Auto-login for a slot that has never completed a login.
    #[error("no cached credentials for {0}")]
    NoCachedCredentials(LocalSlot),

    /// The completion payload could not be turned into an account.
    #[error("could not parse login results: {0}")]
    ParseFailure(String),

    /// The completion echoed a different anti-forgery token than the one
    /// this attempt sent out.
    #[error("anti-forgery token mismatch")]
    AntiForgeryMismatch,

    /// The provider reported that the user did not finish logging in.
    #[error("provider reported an unsuccessful login")]
    ProviderRejected,

    /// No completion arrived within the timeout budget.
    #[error("login timed out after {0:?}")]
    Timeout(Duration),

    /// The provider has no such concept (user privileges).
    #[error("not implemented by this provider: {0}")]
    NotImplemented(&'static str),

    /// The login presenter could not show the authorization URL.
    #[error("login presenter failed: {0}")]
    Presenter(String),

    /// The service was called re-entrantly through a shared handle, from
    /// inside one of its own callbacks.
    #[error("identity service is busy with another call")]
    ServiceBusy,
}

impl IdentityError {
    /// A stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyLoggingIn(_) => "already_logging_in",
            Self::InvalidSlot { .. } => "invalid_slot",
            Self::MissingConfiguration(_) => "missing_configuration",
            Self::NoAccountForSlot(_) => "no_account_for_slot",
            Self::NoCachedCredentials(_) => "no_cached_credentials",
            Self::ParseFailure(_) => "parse_failure",
            Self::AntiForgeryMismatch => "anti_forgery_mismatch",
            Self::ProviderRejected => "provider_rejected",
            Self::Timeout(_) => "timeout",
            Self::NotImplemented(_) => "not_implemented",
            Self::Presenter(_) => "presenter_failed",
            Self::ServiceBusy => "service_busy",
        }
    }

    /// Returns `true` for the errors that end a pending attempt without a
    /// more specific cause (bad payload, wrong token, provider said no).
    pub fn is_completion_failure(&self) -> bool {
        matches!(
            self,
            Self::ParseFailure(_) | Self::AntiForgeryMismatch | Self::ProviderRejected
        )
    }
}

impl From<ProtocolError> for IdentityError {
    fn from(err: ProtocolError) -> Self {
        Self::ParseFailure(err.to_string())
    }
}
