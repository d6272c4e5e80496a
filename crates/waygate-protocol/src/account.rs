//! The account record built from a successful login.
//!
//! An [`AccountRecord`] is what the identity provider tells us about a
//! user once they finish authenticating: a stable id, a secret for
//! follow-up authentication, the auth ticket used as the bearer token,
//! and whatever additional data the provider chose to send.
//!
//! Callers see it through two capability traits:
//!
//! - [`OnlineUser`]: identity only: id, names, generic attributes
//! - [`OnlineAccount`]: adds the access token and auth attributes
//!
//! Code that only needs to show a name takes `&dyn OnlineUser` and never
//! gets near the credentials.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "json")]
use serde::{Deserialize, Serialize};

use crate::{ProtocolError, UniquePlayerId};

/// Extra attribute keys the provider may use for a user's names.
const DISPLAY_NAME_KEYS: [&str; 2] = ["displayName", "name"];
const REAL_NAME_KEY: &str = "realName";

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Identity-only view of a user.
pub trait OnlineUser {
    /// The user's unique identity.
    fn user_id(&self) -> &UniquePlayerId;

    /// The user's real name, or an empty string if the provider sent none.
    fn real_name(&self) -> String;

    /// The name to show in UI. Never empty: falls back to the user id.
    fn display_name(&self) -> String;

    /// Looks up a provider-supplied attribute.
    fn user_attribute(&self, name: &str) -> Option<&str>;

    /// Sets an attribute. Returns `true` if the stored value changed.
    fn set_user_attribute(&mut self, name: &str, value: &str) -> bool;
}

/// Authenticated view of a user: identity plus credentials.
pub trait OnlineAccount: OnlineUser {
    /// The bearer token for calls made on this user's behalf.
    fn access_token(&self) -> &str;

    /// Looks up additional auth data sent with the login result.
    fn auth_attribute(&self, name: &str) -> Option<&str>;
}

// ---------------------------------------------------------------------------
// AccountRecord
// ---------------------------------------------------------------------------

/// An authenticated account as reported by the identity provider.
///
/// The [`UniquePlayerId`] is derived from the provider id once, in
/// [`new`](Self::new), and there is no way to change it afterwards. The
/// credential fields are only reachable through accessors and are
/// redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AccountRecord {
    player_id: UniquePlayerId,
    secret: String,
    auth_ticket: String,
    extra_attributes: HashMap<String, String>,
}

impl AccountRecord {
    /// Creates a record for the given provider id.
    ///
    /// # Errors
    /// Returns [`ProtocolError::MissingField`] if `id` is empty.
    pub fn new(
        id: impl Into<String>,
        secret: impl Into<String>,
        auth_ticket: impl Into<String>,
    ) -> Result<Self, ProtocolError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ProtocolError::MissingField("id"));
        }
        Ok(Self {
            player_id: UniquePlayerId::new(id)?,
            secret: secret.into(),
            auth_ticket: auth_ticket.into(),
            extra_attributes: HashMap::new(),
        })
    }

    /// Replaces the extra attributes, builder style.
    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.extra_attributes = attributes;
        self
    }

    /// The id the provider assigned to this account.
    pub fn id(&self) -> &str {
        self.player_id.as_str()
    }

    /// The identity derived from [`id`](Self::id).
    pub fn player_id(&self) -> &UniquePlayerId {
        &self.player_id
    }

    /// Credential material for follow-up authentication. Sensitive.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The short-lived ticket granted after authentication. Sensitive.
    pub fn auth_ticket(&self) -> &str {
        &self.auth_ticket
    }

    /// Everything else the provider sent.
    pub fn extra_attributes(&self) -> &HashMap<String, String> {
        &self.extra_attributes
    }

    /// `true` once the provider has granted an auth ticket.
    pub fn has_auth_ticket(&self) -> bool {
        !self.auth_ticket.is_empty()
    }
}

impl fmt::Debug for AccountRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRecord")
            .field("player_id", &self.player_id)
            .field("secret", &"<redacted>")
            .field("auth_ticket", &"<redacted>")
            .field("extra_attributes", &self.extra_attributes.keys())
            .finish()
    }
}

impl OnlineUser for AccountRecord {
    fn user_id(&self) -> &UniquePlayerId {
        &self.player_id
    }

    fn real_name(&self) -> String {
        self.user_attribute(REAL_NAME_KEY)
            .unwrap_or_default()
            .to_string()
    }

    fn display_name(&self) -> String {
        DISPLAY_NAME_KEYS
            .iter()
            .find_map(|key| self.user_attribute(key).filter(|v| !v.is_empty()))
            .unwrap_or(self.id())
            .to_string()
    }

    fn user_attribute(&self, name: &str) -> Option<&str> {
        self.extra_attributes.get(name).map(String::as_str)
    }

    fn set_user_attribute(&mut self, name: &str, value: &str) -> bool {
        if self.user_attribute(name) == Some(value) {
            return false;
        }
        self.extra_attributes
            .insert(name.to_string(), value.to_string());
        true
    }
}

impl OnlineAccount for AccountRecord {
    fn access_token(&self) -> &str {
        &self.auth_ticket
    }

    fn auth_attribute(&self, name: &str) -> Option<&str> {
        self.extra_attributes.get(name).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Wire form
// ---------------------------------------------------------------------------

/// The JSON shape of an account record.
///
/// ```json
/// {
///   "gameAccountId": "amzn1.account.AF3X",
///   "internalToken": "...",
///   "authTicket": "...",
///   "additionalAuthData": { "region": "eu" }
/// }
/// ```
#[cfg(feature = "json")]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountWire {
    game_account_id: String,
    #[serde(default)]
    internal_token: String,
    #[serde(default)]
    auth_ticket: String,
    #[serde(default)]
    additional_auth_data: HashMap<String, String>,
}

/// Writes an account record in its JSON wire form.
///
/// # Errors
/// Returns `ProtocolError::Encode` if serialization fails.
#[cfg(feature = "json")]
pub fn serialize_account(account: &AccountRecord) -> Result<Vec<u8>, ProtocolError> {
    use crate::{Codec, JsonCodec};

    let wire = AccountWire {
        game_account_id: account.id().to_string(),
        internal_token: account.secret.clone(),
        auth_ticket: account.auth_ticket.clone(),
        additional_auth_data: account.extra_attributes.clone(),
    };
    JsonCodec.encode(&wire)
}

/// Reads an account record from its JSON wire form.
///
/// # Errors
/// - `ProtocolError::Decode`: not JSON, or wrong shape
/// - `ProtocolError::MissingField`: `gameAccountId` is empty
#[cfg(feature = "json")]
pub fn deserialize_account(data: &[u8]) -> Result<AccountRecord, ProtocolError> {
    use crate::{Codec, JsonCodec};

    let wire: AccountWire = JsonCodec.decode(data)?;
    Ok(
        AccountRecord::new(wire.game_account_id, wire.internal_token, wire.auth_ticket)?
            .with_attributes(wire.additional_auth_data),
    )
}

// =========================================================================
// Tests
// =========================================================================
