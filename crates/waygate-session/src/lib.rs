//! Login session tracking for Waygate.
//!
//! This crate holds the two pieces of state an identity service keeps
//! between ticks:
//!
//! 1. **Accounts**: who is signed in on which local slot
//!    ([`AccountStore`])
//! 2. **Pending logins**: the one login attempt waiting for the
//!    provider to answer ([`LoginSession`], [`LoginState`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Identity service (above)  ← drives logins, publishes notifications
//!     ↕
//! Session layer (this crate)  ← accounts per slot, pending-login timers
//!     ↕
//! Protocol layer (below)  ← UniquePlayerId, AccountRecord, payload parsing
//! ```

mod session;
mod store;

pub use session::{generate_token, LoginSession, LoginState, SessionProgress};
pub use store::AccountStore;
