//! Identity data for Waygate.
//!
//! This crate defines what an authenticated user looks like once the
//! identity provider has answered:
//!
//! - **Identity values** ([`UniquePlayerId`], [`LocalSlot`]): who an
//!   account is, and which local user slot it is signed into.
//! - **Accounts** ([`AccountRecord`], [`OnlineUser`], [`OnlineAccount`]):
//!   the record built from a successful login.
//! - **Payload parsing** ([`parse_login_results`]): turns the provider's
//!   raw completion payload into an account.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how account records are
//!   written to and read from their wire form.
//!
//! # Architecture
//!
//! ```text
//! Provider redirect (raw payload) → Protocol (AccountRecord) → Session (AccountStore)
//! ```

mod account;
mod codec;
mod error;
mod identity;
mod payload;

#[cfg(feature = "json")]
pub use account::{deserialize_account, serialize_account};
pub use account::{AccountRecord, OnlineAccount, OnlineUser};
pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use identity::{LocalSlot, UniquePlayerId};
pub use payload::{parse_login_results, LoginResults};
