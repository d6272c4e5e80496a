//! Hooks for the browser side of the login.
//!
//! Waygate doesn't open browsers or listen for redirects itself. That is
//! the host's job (a system browser plus a local redirect listener, an
//! embedded web view, a console's account picker). The host plugs in at
//! two points:
//!
//! ```text
//!            LoginPresenter::present(slot, url)
//!   service ──────────────────────────────────→ browser / web view
//!      ↑                                              │
//!      └──── CompletionSender::complete(slot, ..) ────┘
//!                 (any thread; consumed on tick)
//! ```

use std::fmt;

use tokio::sync::mpsc;
use waygate_protocol::LocalSlot;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Shows the authorization URL to the user.
///
/// Called once per accepted login, on the service's owning thread. It
/// must return promptly: open the browser and come back, don't wait for
/// the user. Report the result later through a [`CompletionSender`].
///
/// Returning `Err` refuses the login (the service stays `Idle`).
///
/// # Example
///
/// ```rust
/// use waygate::{LocalSlot, LoginPresenter};
///
/// /// Prints the URL for the user to open by hand.
/// struct PrintPresenter;
///
/// impl LoginPresenter for PrintPresenter {
///     fn present(&mut self, slot: LocalSlot, url: &str) -> Result<(), String> {
///         println!("{slot}: open {url} to sign in");
///         Ok(())
///     }
/// }
/// ```
pub trait LoginPresenter: Send + 'static {
    /// Surfaces `authorization_url` for the user signing into `slot`.
    fn present(&mut self, slot: LocalSlot, authorization_url: &str) -> Result<(), String>;
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A completion reported by the host.
pub struct Completion {
    /// The slot the login was for.
    pub slot: LocalSlot,
    /// The provider's raw answer (redirect URL, fragment, or JSON).
    pub payload: String,
    /// `false` if the user cancelled or the provider reported an error.
    pub success: bool,
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("slot", &self.slot)
            .field("payload_len", &self.payload.len())
            .field("success", &self.success)
            .finish()
    }
}

/// Hands completions back to the identity service.
///
/// Cheap to clone and `Send`, so a redirect listener on another thread
/// can hold one. Completions are queued and processed on the service's
/// owning thread during `tick`, never concurrently with it.
#[derive(Clone)]
pub struct CompletionSender {
    tx: mpsc::UnboundedSender<Completion>,
}

impl CompletionSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Completion>) -> Self {
        Self { tx }
    }

    /// Queues a completion.
    ///
    /// Returns `false` if the service is gone.
    pub fn complete(&self, slot: LocalSlot, payload: impl Into<String>, success: bool) -> bool {
        self.tx
            .send(Completion {
                slot,
                payload: payload.into(),
                success,
            })
            .is_ok()
    }
}

impl fmt::Debug for CompletionSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}
