//! Parsing the provider's completion payload into an account.
//!
//! When the user finishes the external login step, the provider answers
//! with key-value data. For an implicit grant this is the redirect URL's
//! fragment (`#access_token=...&state=...`); some providers post a JSON
//! object instead. [`parse_login_results`] accepts both:
//!
//! ```text
//! https://game.example/cb#gameAccountId=A1&authTicket=T&state=9f..   (form)
//! ?gameAccountId=A1&authTicket=T                                     (form)
//! {"gameAccountId":"A1","authTicket":"T","state":"9f.."}             (JSON)
//! ```
//!
//! Unknown keys are kept as extra attributes so newer providers don't
//! break older clients. The echoed `state` value (the anti-forgery token)
//! is returned next to the account, never stored inside it.

use std::collections::HashMap;

use url::{form_urlencoded, Url};

use crate::{AccountRecord, ProtocolError};

/// Everything a completion payload carried.
#[derive(Debug, Clone)]
pub struct LoginResults {
    /// The account described by the payload.
    pub account: AccountRecord,
    /// The anti-forgery token echoed back by the provider, if any.
    pub state: Option<String>,
}

/// Parses a raw completion payload.
///
/// # Errors
/// - [`ProtocolError::MalformedPayload`]: empty input, an empty key,
///   bad percent-encoding, or invalid JSON
/// - [`ProtocolError::MissingField`]: no account id, or an empty one
pub fn parse_login_results(raw: &str) -> Result<LoginResults, ProtocolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::MalformedPayload("payload is empty".into()));
    }

    let mut fields = Fields::default();
    if trimmed.starts_with('{') {
        parse_json(trimmed, &mut fields)?;
    } else {
        parse_form(trimmed, &mut fields)?;
    }
    fields.finish()
}

// ---------------------------------------------------------------------------
// Field collection
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Fields {
    id: Option<String>,
    secret: Option<String>,
    auth_ticket: Option<String>,
    state: Option<String>,
    extra: HashMap<String, String>,
}

impl Fields {
    fn assign(&mut self, key: String, value: String) {
        match key.as_str() {
            "gameAccountId" | "user_id" => self.id = Some(value),
            "internalToken" => self.secret = Some(value),
            "authTicket" | "access_token" => self.auth_ticket = Some(value),
            "state" => self.state = Some(value),
            _ => {
                self.extra.insert(key, value);
            }
        }
    }

    fn finish(self) -> Result<LoginResults, ProtocolError> {
        let id = self
            .id
            .filter(|id| !id.is_empty())
            .ok_or(ProtocolError::MissingField("id"))?;

        let account = AccountRecord::new(
            id,
            self.secret.unwrap_or_default(),
            self.auth_ticket.unwrap_or_default(),
        )?
        .with_attributes(self.extra);

        Ok(LoginResults {
            account,
            state: self.state,
        })
    }
}

// ---------------------------------------------------------------------------
// Form-encoded payloads
// ---------------------------------------------------------------------------

/// Picks the form data out of a payload.
///
/// A redirect URL contributes its fragment, where the implicit grant puts
/// its answer, and falls back to its query. A leading `#` or `?` is
/// stripped. Anything else is taken as bare form data.
fn form_data(raw: &str) -> Result<String, ProtocolError> {
    if let Some(rest) = raw.strip_prefix('#').or_else(|| raw.strip_prefix('?')) {
        return Ok(rest.to_string());
    }

    // `a:b=c` parses as an opaque URL; only hierarchical ones are redirects.
    let Some(url) = Url::parse(raw).ok().filter(|url| !url.cannot_be_a_base()) else {
        return Ok(raw.to_string());
    };
    url.fragment()
        .filter(|fragment| !fragment.is_empty())
        .or(url.query())
        .map(str::to_string)
        .ok_or_else(|| {
            ProtocolError::MalformedPayload("redirect URL has no fragment or query".into())
        })
}

fn parse_form(raw: &str, fields: &mut Fields) -> Result<(), ProtocolError> {
    let data = form_data(raw)?;
    let mut seen_any = false;

    for (key, value) in form_urlencoded::parse(data.as_bytes()) {
        if key.is_empty() {
            return Err(ProtocolError::MalformedPayload("empty key".into()));
        }
        // Decoding is lossy: bytes that are not UTF-8 come back as U+FFFD.
        if key.contains(char::REPLACEMENT_CHARACTER) {
            return Err(ProtocolError::MalformedPayload("key is not valid UTF-8".into()));
        }
        // The value may be a credential, so only the key goes in the error.
        if value.contains(char::REPLACEMENT_CHARACTER) {
            return Err(ProtocolError::MalformedPayload(format!(
                "value of `{key}` is not valid UTF-8"
            )));
        }
        fields.assign(key.into_owned(), value.into_owned());
        seen_any = true;
    }

    if !seen_any {
        return Err(ProtocolError::MalformedPayload("no key-value pairs".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON payloads
// ---------------------------------------------------------------------------

#[cfg(feature = "json")]
fn parse_json(raw: &str, fields: &mut Fields) -> Result<(), ProtocolError> {
    use serde_json::Value;

    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid JSON: {e}")))?;
    let Value::Object(map) = value else {
        return Err(ProtocolError::MalformedPayload(
            "JSON payload must be an object".into(),
        ));
    };

    for (key, value) in map {
        match (key.as_str(), value) {
            ("additionalAuthData", Value::Object(extra)) => {
                for (name, v) in extra {
                    if let Some(text) = json_text(v) {
                        fields.extra.insert(name, text);
                    }
                }
            }
            (_, v) => {
                if let Some(text) = json_text(v) {
                    fields.assign(key, text);
                }
            }
        }
    }
    Ok(())
}

#[cfg(not(feature = "json"))]
fn parse_json(_raw: &str, _fields: &mut Fields) -> Result<(), ProtocolError> {
    Err(ProtocolError::MalformedPayload(
        "JSON payloads need the `json` feature".into(),
    ))
}

/// Strings pass through as-is, `null` is dropped, anything else keeps its
/// JSON text so nothing the provider sent is lost.
#[cfg(feature = "json")]
fn json_text(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

// =========================================================================
// Tests
// =========================================================================
