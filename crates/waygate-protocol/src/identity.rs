//! Identity types: who an account is, and where it is signed in locally.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// LocalSlot
// ---------------------------------------------------------------------------

/// Index of a local user on this device.
///
/// Several people can be signed in on one machine at once (split-screen,
/// couch co-op). Each of them occupies a slot. Slots are small, dense
/// integers starting at 0; the upper bound is configuration
/// (`max_local_slots`), so this type does not enforce it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LocalSlot(pub u32);

impl LocalSlot {
    /// Returns `true` if this slot is below the given slot count.
    pub fn is_within(self, max_local_slots: u32) -> bool {
        self.0 < max_local_slots
    }
}

impl fmt::Display for LocalSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// UniquePlayerId
// ---------------------------------------------------------------------------

/// Process-wide unique identity of one authenticated account.
///
/// The identity provider hands out opaque string ids, so this is a
/// string newtype. It has two raw representations that are exact
/// inverses of each other:
///
/// - the canonical string form ([`Display`](fmt::Display) / [`FromStr`])
/// - the byte form ([`as_bytes`](Self::as_bytes) /
///   [`from_bytes`](Self::from_bytes)), which is the UTF-8 encoding of
///   the string form
///
/// ```rust
/// use waygate_protocol::UniquePlayerId;
///
/// let id: UniquePlayerId = "amzn1.account.AF3X".parse().unwrap();
/// let again = UniquePlayerId::from_bytes(id.as_bytes()).unwrap();
/// assert_eq!(id, again);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UniquePlayerId(String);

impl UniquePlayerId {
    /// Builds an identity from its canonical string form.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidIdentity`] if `value` is empty.
    pub fn new(value: impl Into<String>) -> Result<Self, ProtocolError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ProtocolError::InvalidIdentity(
                "identity must not be empty".into(),
            ));
        }
        Ok(Self(value))
    }

    /// Builds an identity from its byte form.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidIdentity`] if the bytes are empty
    /// or not valid UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let value = std::str::from_utf8(bytes).map_err(|e| {
            ProtocolError::InvalidIdentity(format!("not UTF-8: {e}"))
        })?;
        Self::new(value)
    }

    /// The byte form of this identity.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Owned copy of the byte form.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UniquePlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for UniquePlayerId {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UniquePlayerId> for String {
    fn from(id: UniquePlayerId) -> Self {
        id.0
    }
}

impl FromStr for UniquePlayerId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// =========================================================================
// Tests
// =========================================================================
