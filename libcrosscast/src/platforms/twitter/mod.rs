//! Twitter (microblog) platform implementation
//!
//! Three credential schemes are supported, highest priority first:
//!
//! | scheme   | keys                                                         | can post |
//! |----------|--------------------------------------------------------------|----------|
//! | `oauth2` | client id/secret + access token/secret                       | yes      |
//! | `oauth1` | API key/secret + access token/secret                         | yes      |
//! | `bearer` | app-only bearer token                                        | no       |
//!
//! The scheme is resolved once at construction. A bearer-only setup passes
//! configuration checks and fails at send time with a capability error.

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{info, warn};

pub mod api;
pub mod oauth;

use self::api::{HttpTwitterApi, TwitterApi, TwitterAuth};
use self::oauth::OAuth1Signer;
use crate::config::Config;
use crate::credentials::{CredentialResolver, CredentialSet, SchemeSpec};
use crate::error::PlatformError;
use crate::platforms::{not_configured, Platform};
use crate::types::{DispatchResult, ErrorKind, MessageId, PlatformId, ValidationResult};

pub const DEFAULT_API_URL: &str = "https://api.twitter.com";

/// Maximum tweet length, counted in UTF-16 code units
pub const CHARACTER_LIMIT: usize = 280;

pub const CLIENT_ID: &str = "TWITTER_CLIENT_ID";
pub const CLIENT_SECRET: &str = "TWITTER_CLIENT_SECRET";
pub const API_KEY: &str = "TWITTER_API_KEY";
pub const API_KEY_SECRET: &str = "TWITTER_API_KEY_SECRET";
pub const ACCESS_TOKEN: &str = "TWITTER_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET: &str = "TWITTER_ACCESS_TOKEN_SECRET";
pub const BEARER_TOKEN: &str = "TWITTER_BEARER_TOKEN";

pub const ENV_KEYS: &[&str] = &[
    CLIENT_ID,
    CLIENT_SECRET,
    API_KEY,
    API_KEY_SECRET,
    ACCESS_TOKEN,
    ACCESS_TOKEN_SECRET,
    BEARER_TOKEN,
];

pub const SCHEMES: &[SchemeSpec] = &[
    SchemeSpec::new(
        "oauth2",
        &[CLIENT_ID, CLIENT_SECRET, ACCESS_TOKEN, ACCESS_TOKEN_SECRET],
    )
    .distinguished_by(&[CLIENT_ID, CLIENT_SECRET]),
    SchemeSpec::new(
        "oauth1",
        &[API_KEY, API_KEY_SECRET, ACCESS_TOKEN, ACCESS_TOKEN_SECRET],
    )
    .distinguished_by(&[API_KEY, API_KEY_SECRET]),
    SchemeSpec::new("bearer", &[BEARER_TOKEN]),
];

/// The credential scheme selected for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwitterScheme {
    OAuth2,
    OAuth1,
    Bearer,
}

impl TwitterScheme {
    pub fn method(&self) -> &'static str {
        match self {
            TwitterScheme::OAuth2 => "oauth2",
            TwitterScheme::OAuth1 => "oauth1",
            TwitterScheme::Bearer => "bearer",
        }
    }

    /// Whether the scheme acts on behalf of a user
    pub fn can_write(&self) -> bool {
        !matches!(self, TwitterScheme::Bearer)
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "oauth2" => Some(TwitterScheme::OAuth2),
            "oauth1" => Some(TwitterScheme::OAuth1),
            "bearer" => Some(TwitterScheme::Bearer),
            _ => None,
        }
    }

    fn auth(&self, creds: &CredentialSet) -> TwitterAuth {
        let secret = |key: &str| SecretString::from(creds.get(key).to_string());
        let signer = |key: &str, secret_key: &str| {
            OAuth1Signer::new(
                creds.get(key).to_string(),
                secret(secret_key),
                creds.get(ACCESS_TOKEN).to_string(),
                secret(ACCESS_TOKEN_SECRET),
            )
        };

        match self {
            TwitterScheme::OAuth2 => TwitterAuth::UserContext(signer(CLIENT_ID, CLIENT_SECRET)),
            TwitterScheme::OAuth1 => TwitterAuth::UserContext(signer(API_KEY, API_KEY_SECRET)),
            TwitterScheme::Bearer => TwitterAuth::Bearer(secret(BEARER_TOKEN)),
        }
    }
}

/// Length of `text` as measured against [`CHARACTER_LIMIT`]
///
/// Characters outside the Basic Multilingual Plane (most emoji) count twice.
pub fn message_length(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Twitter platform client
pub struct TwitterPlatform {
    resolver: CredentialResolver,
    validation: ValidationResult,
    scheme: Option<TwitterScheme>,
    client: Option<Box<dyn TwitterApi>>,
    init_error: Option<String>,
}

impl TwitterPlatform {
    /// Build the adapter with an HTTP client bound to the selected scheme
    pub fn from_config(config: &Config) -> Self {
        let base_url = config.endpoints.twitter.clone();
        Self::build(config.twitter.clone(), |scheme, creds| {
            HttpTwitterApi::new(&base_url, scheme.auth(creds))
                .map(|api| Box::new(api) as Box<dyn TwitterApi>)
        })
    }

    /// Build the adapter around an existing client handle
    pub fn with_client(credentials: CredentialSet, client: Box<dyn TwitterApi>) -> Self {
        Self::build(credentials, move |_, _| Ok(client))
    }

    fn build<F>(credentials: CredentialSet, make_client: F) -> Self
    where
        F: FnOnce(TwitterScheme, &CredentialSet) -> Result<Box<dyn TwitterApi>, String>,
    {
        let resolver = CredentialResolver::new(PlatformId::Twitter, SCHEMES, credentials);
        let validation = resolver.validate();

        let scheme = if validation.is_valid() {
            resolver
                .active_scheme()
                .and_then(|spec| TwitterScheme::from_name(spec.name))
        } else {
            None
        };

        let (client, init_error) = match scheme {
            Some(scheme) => match make_client(scheme, resolver.credentials()) {
                Ok(client) => (Some(client), None),
                Err(e) => (None, Some(e)),
            },
            None => (None, None),
        };

        if let Some(scheme) = scheme {
            tracing::debug!("Twitter using {} credentials", scheme.method());
        }

        Self {
            resolver,
            validation,
            scheme,
            client,
            init_error,
        }
    }

    pub fn scheme(&self) -> Option<TwitterScheme> {
        self.scheme
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    fn ready(&self) -> Result<(TwitterScheme, &dyn TwitterApi), DispatchResult> {
        match (self.scheme, self.client.as_deref()) {
            (Some(scheme), Some(client)) => Ok((scheme, client)),
            _ => Err(not_configured(PlatformId::Twitter, &self.configuration_errors())),
        }
    }
}

/// Public URL of a tweet
pub fn tweet_url(id: &str) -> String {
    format!("https://x.com/i/web/status/{}", id)
}

#[async_trait]
impl Platform for TwitterPlatform {
    fn id(&self) -> PlatformId {
        PlatformId::Twitter
    }

    fn is_configured(&self) -> bool {
        self.validation.is_valid() && self.client.is_some()
    }

    fn configuration_errors(&self) -> Vec<String> {
        let mut errors = self.validation.errors().to_vec();
        if let Some(e) = &self.init_error {
            errors.push(format!("Twitter client failed to initialize: {}", e));
        }
        errors
    }

    fn active_method(&self) -> Option<&'static str> {
        self.scheme.map(|s| s.method())
    }

    fn validate_message(&self, text: &str) -> ValidationResult {
        let count = message_length(text);
        if count > CHARACTER_LIMIT {
            ValidationResult::from_errors(vec![format!(
                "Message exceeds Twitter's {} character limit (current: {} characters)",
                CHARACTER_LIMIT, count
            )])
        } else {
            ValidationResult::valid()
        }
    }

    fn character_limit(&self) -> Option<usize> {
        Some(CHARACTER_LIMIT)
    }

    async fn send(&self, text: &str) -> DispatchResult {
        let (scheme, client) = match self.ready() {
            Ok(ready) => ready,
            Err(result) => return result,
        };

        if !scheme.can_write() {
            let error = PlatformError::Capability(
                "Twitter bearer token is read-only and cannot post; configure oauth2 or oauth1 credentials"
                    .to_string(),
            );
            warn!("{}", error);
            return DispatchResult::from_error(PlatformId::Twitter, &error).with_method(scheme.method());
        }

        let validation = self.validate_message(text);
        if !validation.is_valid() {
            return DispatchResult::failure(
                PlatformId::Twitter,
                ErrorKind::Validation,
                validation.errors().join("; "),
            )
            .with_method(scheme.method());
        }

        match client.create_tweet(text).await {
            Ok(tweet) => {
                info!("Posted to Twitter: {}", tweet.id);
                DispatchResult::success(PlatformId::Twitter, Some(MessageId::Str(tweet.id.clone())))
                    .with_method(scheme.method())
                    .with_extra("url", tweet_url(&tweet.id))
                    .with_extra("text", tweet.text)
            }
            Err(e) => {
                warn!("Failed to post to Twitter: {}", e);
                DispatchResult::from_error(PlatformId::Twitter, &e).with_method(scheme.method())
            }
        }
    }

    async fn delete_message(&self, id: &MessageId, _locator: Option<&str>) -> DispatchResult {
        let (scheme, client) = match self.ready() {
            Ok(ready) => ready,
            Err(result) => return result,
        };

        if !scheme.can_write() {
            let error = PlatformError::Capability(
                "Twitter bearer token is read-only and cannot delete tweets".to_string(),
            );
            return DispatchResult::from_error(PlatformId::Twitter, &error).with_method(scheme.method());
        }

        let id = id.to_string();
        match client.delete_tweet(&id).await {
            Ok(true) => {
                info!("Deleted tweet {}", id);
                DispatchResult::success(PlatformId::Twitter, Some(MessageId::Str(id)))
                    .with_method(scheme.method())
            }
            Ok(false) => DispatchResult::failure(
                PlatformId::Twitter,
                ErrorKind::Transport,
                format!("Twitter did not delete tweet {}", id),
            )
            .with_method(scheme.method()),
            Err(e) => DispatchResult::from_error(PlatformId::Twitter, &e).with_method(scheme.method()),
        }
    }

    fn supports_delete(&self) -> bool {
        self.scheme.is_some_and(|s| s.can_write())
    }
}
