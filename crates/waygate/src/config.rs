//! Provider configuration.
//!
//! The host loads this from wherever it keeps settings (an ini section, a
//! JSON file, environment) and hands it to
//! [`IdentityService::new`](crate::IdentityService::new). Every field has
//! a default so a partial document deserializes; whether the result is
//! usable is decided by [`ProviderConfig::validated`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::IdentityError;

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

/// Raw settings for the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Authorization endpoint of the provider (`https://...`).
    pub endpoint: String,

    /// Where the provider redirects when the user is done. Must also be
    /// registered with the provider.
    pub redirect_url: String,

    /// The client id the provider issued for this application.
    pub client_id: String,

    /// Maximum time to wait for a completion, in seconds.
    pub timeout_secs: f64,

    /// How often a pending login checks for queued completions, in
    /// seconds. 0 checks on every tick.
    pub poll_interval_secs: f64,

    /// Number of local user slots. Valid slots are `0..max_local_slots`.
    pub max_local_slots: u32,

    /// Optional `scope` parameter for the authorization URL.
    pub scope: Option<String>,

    /// Reported by [`IdentityService::auth_type`](crate::IdentityService::auth_type).
    pub auth_type: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            redirect_url: String::new(),
            client_id: String::new(),
            timeout_secs: 30.0,
            poll_interval_secs: 1.0,
            max_local_slots: 4,
            scope: None,
            auth_type: "implicit".to_string(),
        }
    }
}

impl ProviderConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    /// Returns [`IdentityError::MissingConfiguration`] if the text is not
    /// a JSON object of the expected shape.
    pub fn from_json(text: &str) -> Result<Self, IdentityError> {
        serde_json::from_str(text)
            .map_err(|e| IdentityError::MissingConfiguration(format!("unreadable config: {e}")))
    }

    /// Checks that a login can be built from these settings.
    ///
    /// # Errors
    /// Returns [`IdentityError::MissingConfiguration`] naming the first
    /// problem found.
    pub fn validated(&self) -> Result<ValidatedConfig, IdentityError> {
        let missing = IdentityError::MissingConfiguration;

        let endpoint = Url::parse(self.endpoint.trim())
            .map_err(|e| missing(format!("endpoint is not a valid URL: {e}")))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(missing("endpoint must be an http(s) URL".into()));
        }
        if endpoint.host_str().is_none_or(str::is_empty) {
            return Err(missing("endpoint has no host".into()));
        }
        if endpoint.fragment().is_some() {
            return Err(missing("endpoint must not carry a fragment".into()));
        }
        if self.redirect_url.trim().is_empty() {
            return Err(missing("redirect_url is empty".into()));
        }
        Url::parse(self.redirect_url.trim())
            .map_err(|e| missing(format!("redirect_url is not a valid URL: {e}")))?;
        if self.client_id.trim().is_empty() {
            return Err(missing("client_id is empty".into()));
        }

        let timeout = Duration::try_from_secs_f64(self.timeout_secs)
            .ok()
            .filter(|t| !t.is_zero())
            .ok_or_else(|| missing("timeout_secs must be a positive number of seconds".into()))?;
        let poll_interval = Duration::try_from_secs_f64(self.poll_interval_secs)
            .map_err(|_| missing("poll_interval_secs must be a non-negative number of seconds".into()))?;

        Ok(ValidatedConfig {
            endpoint,
            redirect_url: self.redirect_url.trim().to_string(),
            client_id: self.client_id.clone(),
            scope: self.scope.clone().filter(|s| !s.is_empty()),
            timeout,
            poll_interval,
        })
    }
}

// ---------------------------------------------------------------------------
// ValidatedConfig
// ---------------------------------------------------------------------------

/// Settings that passed [`ProviderConfig::validated`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    endpoint: Url,
    redirect_url: String,
    client_id: String,
    scope: Option<String>,
    timeout: Duration,
    poll_interval: Duration,
}

impl ValidatedConfig {
    /// Maximum wait for a completion.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Interval between completion checks.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Builds the implicit-grant authorization URL for one attempt.
    ///
    /// ```text
    /// {endpoint}?response_type=token&client_id=..&redirect_uri=..&state=..[&scope=..]
    /// ```
    ///
    /// Values are form-encoded. Parameters already on the endpoint are
    /// kept and the new ones appended after them.
    pub fn authorization_url(&self, state: &str) -> String {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "token")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", &self.redirect_url)
                .append_pair("state", state);
            if let Some(scope) = &self.scope {
                query.append_pair("scope", scope);
            }
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> ProviderConfig {
        ProviderConfig {
            endpoint: "https://auth.example.com/authorize".into(),
            redirect_url: "https://game.example.com/cb".into(),
            client_id: "client 1".into(),
            ..ProviderConfig::default()
        }
    }

    #[test]
    fn test_default_config_is_not_usable() {
        let result = ProviderConfig::default().validated();
        assert!(matches!(result, Err(IdentityError::MissingConfiguration(_))));
    }

    #[test]
    fn test_default_values() {
        let config = ProviderConfig::default();
        assert_eq!(config.timeout_secs, 30.0);
        assert_eq!(config.poll_interval_secs, 1.0);
        assert_eq!(config.max_local_slots, 4);
        assert_eq!(config.auth_type, "implicit");
    }

    #[test]
    fn test_validated_converts_durations() {
        let v = complete().validated().unwrap();
        assert_eq!(v.timeout(), Duration::from_secs(30));
        assert_eq!(v.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_validated_rejects_each_missing_field() {
        for broken in [
            ProviderConfig { endpoint: String::new(), ..complete() },
            ProviderConfig { endpoint: "ftp://x".into(), ..complete() },
            ProviderConfig { redirect_url: " ".into(), ..complete() },
            ProviderConfig { client_id: String::new(), ..complete() },
            ProviderConfig { timeout_secs: 0.0, ..complete() },
            ProviderConfig { timeout_secs: f64::NAN, ..complete() },
            ProviderConfig { poll_interval_secs: -1.0, ..complete() },
            ProviderConfig { redirect_url: "not a url".into(), ..complete() },
        ] {
            assert!(
                matches!(broken.validated(), Err(IdentityError::MissingConfiguration(_))),
                "should reject {broken:?}"
            );
        }
    }

    #[test]
    fn test_authorization_url_encodes_parameters() {
        let url = complete().validated().unwrap().authorization_url("abc123");
        assert_eq!(
            url,
            "https://auth.example.com/authorize?response_type=token&client_id=client+1\
             &redirect_uri=https%3A%2F%2Fgame.example.com%2Fcb&state=abc123"
        );
    }

    #[test]
    fn test_authorization_url_appends_to_existing_query_and_scope() {
        let config = ProviderConfig {
            endpoint: "https://auth.example.com/authorize?lang=en".into(),
            scope: Some("profile".into()),
            ..complete()
        };
        let url = config.validated().unwrap().authorization_url("s");
        assert!(url.starts_with("https://auth.example.com/authorize?lang=en&response_type=token"));
        assert!(url.ends_with("&state=s&scope=profile"));
    }

    #[test]
    fn test_from_json_partial_document_uses_defaults() {
        let config = ProviderConfig::from_json(
            r#"{ "endpoint": "https://a/auth", "redirect_url": "https://b/cb",
                 "client_id": "c", "timeout_secs": 12.5 }"#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 12.5);
        assert_eq!(config.max_local_slots, 4);
        assert!(config.validated().is_ok());
    }

    #[test]
    fn test_from_json_garbage_is_missing_configuration() {
        let result = ProviderConfig::from_json("not json");
        assert!(matches!(result, Err(IdentityError::MissingConfiguration(_))));
    }

    #[test]
    fn test_validated_rejects_durations_too_large_for_duration() {
        for broken in [
            ProviderConfig { timeout_secs: 1e30, ..complete() },
            ProviderConfig { poll_interval_secs: 1e30, ..complete() },
            ProviderConfig { timeout_secs: f64::INFINITY, ..complete() },
        ] {
            assert!(
                matches!(broken.validated(), Err(IdentityError::MissingConfiguration(_))),
                "should reject {broken:?}"
            );
        }
    }

    #[test]
    fn test_validated_rejects_endpoint_without_host() {
        for endpoint in ["https://", "http://", "mailto:auth@example.com"] {
            let config = ProviderConfig { endpoint: endpoint.into(), ..complete() };
            assert!(
                matches!(config.validated(), Err(IdentityError::MissingConfiguration(_))),
                "should reject {endpoint}"
            );
        }
    }

    #[test]
    fn test_validated_rejects_endpoint_with_fragment() {
        let config = ProviderConfig {
            endpoint: "https://auth.example.com/authorize#frag".into(),
            ..complete()
        };
        assert!(matches!(config.validated(), Err(IdentityError::MissingConfiguration(_))));
    }

    #[test]
    fn test_authorization_url_state_lands_in_query() {
        let url = complete().validated().unwrap().authorization_url("s t");
        let parsed = Url::parse(&url).unwrap();

        assert_eq!(parsed.fragment(), None);
        let state = parsed
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned());
        assert_eq!(state.as_deref(), Some("s t"));
    }
}
