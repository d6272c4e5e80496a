//! The pending-login session and the login state machine.
//!
//! A [`LoginSession`] exists only while one login attempt is waiting for
//! the provider to answer. It tracks:
//! - WHICH local slot is signing in
//! - the anti-forgery token the provider must echo back
//! - HOW LONG we've been waiting (total, and since the last poll)

use std::fmt;
use std::time::Duration;

use rand::Rng;
use waygate_protocol::LocalSlot;

// ---------------------------------------------------------------------------
// LoginState
// ---------------------------------------------------------------------------

/// Where the login flow is.
///
/// ```text
///            login()
///   Idle ─────────────→ AwaitingCompletion
///    ↑                    │      │      │
///    │         parse ok   │      │      │ total_elapsed ≥ budget
///    │                    ▼      │      ▼
///    ├──────────── Succeeded     │   TimedOut ───┐
///    │                           ▼               │
///    ├──────────────────────── Failed            │
///    └───────────────────────────────────────────┘
/// ```
///
/// The three terminal states are reported once and immediately collapse
/// back to `Idle`; an identity service is never observed resting in one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    AwaitingCompletion,
    Succeeded,
    Failed,
    TimedOut,
}

impl fmt::Display for LoginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AwaitingCompletion => write!(f, "AwaitingCompletion"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::TimedOut => write!(f, "TimedOut"),
        }
    }
}

// ---------------------------------------------------------------------------
// LoginSession
// ---------------------------------------------------------------------------

/// What one [`LoginSession::advance`] step found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    /// Enough time passed since the last check to look for a completion.
    pub poll_due: bool,
    /// The timeout budget is used up.
    pub timed_out: bool,
}

/// One outstanding login attempt.
///
/// The anti-forgery token has no public getter on purpose: the only
/// thing anyone may do with it is embed it in the authorization URL
/// ([`authorization_state`](Self::authorization_state)) or compare a
/// returned value against it ([`verify_state`](Self::verify_state)).
pub struct LoginSession {
    slot: LocalSlot,
    anti_forgery_token: String,
    elapsed_since_last_check: Duration,
    total_elapsed: Duration,
    timeout_budget: Duration,
    poll_interval: Duration,
}

impl LoginSession {
    /// Starts a new attempt for `slot` with a fresh anti-forgery token and
    /// both timers at zero.
    pub fn start(slot: LocalSlot, timeout_budget: Duration, poll_interval: Duration) -> Self {
        Self {
            slot,
            anti_forgery_token: generate_token(),
            elapsed_since_last_check: Duration::ZERO,
            total_elapsed: Duration::ZERO,
            timeout_budget,
            poll_interval,
        }
    }

    /// The slot waiting for this login.
    pub fn slot(&self) -> LocalSlot {
        self.slot
    }

    /// Value for the `state` query parameter of the authorization URL.
    pub fn authorization_state(&self) -> &str {
        &self.anti_forgery_token
    }

    /// Checks the token the provider echoed back.
    ///
    /// Exact, case-sensitive comparison. A missing token never matches.
    pub fn verify_state(&self, echoed: Option<&str>) -> bool {
        echoed == Some(self.anti_forgery_token.as_str())
    }

    /// Adds `dt` to both timers.
    ///
    /// When the time since the last check reaches the poll interval, that
    /// counter resets and `poll_due` is set.
    pub fn advance(&mut self, dt: Duration) -> SessionProgress {
        self.elapsed_since_last_check = self.elapsed_since_last_check.saturating_add(dt);
        self.total_elapsed = self.total_elapsed.saturating_add(dt);

        let poll_due = self.elapsed_since_last_check >= self.poll_interval;
        if poll_due {
            self.elapsed_since_last_check = Duration::ZERO;
        }

        SessionProgress {
            poll_due,
            timed_out: self.is_expired(),
        }
    }

    /// Returns `true` once the total wait reached the timeout budget.
    pub fn is_expired(&self) -> bool {
        self.total_elapsed >= self.timeout_budget
    }

    /// Total time spent waiting so far.
    pub fn total_elapsed(&self) -> Duration {
        self.total_elapsed
    }

    /// Time since the last completion check.
    pub fn elapsed_since_last_check(&self) -> Duration {
        self.elapsed_since_last_check
    }

    /// The configured maximum wait.
    pub fn timeout_budget(&self) -> Duration {
        self.timeout_budget
    }
}

impl fmt::Debug for LoginSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSession")
            .field("slot", &self.slot)
            .field("anti_forgery_token", &"<redacted>")
            .field("total_elapsed", &self.total_elapsed)
            .field("timeout_budget", &self.timeout_budget)
            .finish()
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Used as the anti-forgery token of a login attempt. 128 bits makes
/// guessing the token of someone else's attempt infeasible.
pub fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

// =========================================================================
// Tests
// =========================================================================
