//! Login and logout notifications.
//!
//! Results of logins are asynchronous: `login` only says the request was
//! accepted, and the outcome arrives ticks later. Anyone interested
//! subscribes to the service's broadcast channel and receives an
//! [`IdentityEvent`] per outcome.

use tokio::sync::broadcast;
use waygate_protocol::{LocalSlot, UniquePlayerId};

use crate::IdentityError;

/// Default number of events a slow subscriber may fall behind by before
/// it starts missing the oldest ones.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Something that happened to a local user's login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    /// A login finished (or was refused outright).
    LoginStatusChanged {
        slot: LocalSlot,
        /// Set on success.
        player_id: Option<UniquePlayerId>,
        success: bool,
        /// Set on failure.
        error: Option<IdentityError>,
    },

    /// A logout finished.
    LogoutComplete { slot: LocalSlot, success: bool },
}

impl IdentityEvent {
    /// The slot this event is about.
    pub fn slot(&self) -> LocalSlot {
        match self {
            Self::LoginStatusChanged { slot, .. } | Self::LogoutComplete { slot, .. } => *slot,
        }
    }
}

/// Publishing side of the notification channel.
pub(crate) struct Notifier {
    tx: broadcast::Sender<IdentityEvent>,
}

impl Notifier {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<IdentityEvent> {
        self.tx.subscribe()
    }

    /// Sends to every current subscriber. Having none is fine.
    pub(crate) fn publish(&self, event: IdentityEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("identity event dropped, no subscribers");
        }
    }
}
