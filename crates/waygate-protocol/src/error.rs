//! Error types for the protocol layer.
//!
//! Each crate in Waygate defines its own error enum. A `ProtocolError`
//! always means the problem is in the shape of identity data: a bad
//! identity value, a malformed completion payload, or a wire record that
//! failed to encode or decode.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an account record failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserializing an account record failed.
    ///
    /// Common causes: malformed JSON, wrong data types, or a truncated
    /// record.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The raw form of an identity could not be turned into a
    /// [`UniquePlayerId`](crate::UniquePlayerId) (empty or not UTF-8).
    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    /// The completion payload is not well-formed key-value data.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A field the account record cannot exist without is absent or empty.
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}
