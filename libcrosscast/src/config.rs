//! Configuration management for Crosscast
//!
//! All settings come from environment-like key/value lookups and are read
//! exactly once, here. Adapters receive the resulting [`Config`] pieces in
//! their constructors and never touch the environment themselves.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::credentials::{CredentialResolver, CredentialSet};
use crate::error::{Result, SessionError};
use crate::platforms::{telegram, twitter, vk};
use crate::types::PlatformId;

/// Overrides the Telegram user-session file location
pub const SESSION_FILE_ENV: &str = "CROSSCAST_SESSION_FILE";
pub const TELEGRAM_API_URL_ENV: &str = "TELEGRAM_API_URL";
pub const VK_API_URL_ENV: &str = "VK_API_URL";
pub const TWITTER_API_URL_ENV: &str = "TWITTER_API_URL";

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: CredentialSet,
    pub vk: CredentialSet,
    pub twitter: CredentialSet,
    /// Explicit session file; `None` falls back to the data directory on first use
    pub session_file: Option<PathBuf>,
    pub endpoints: Endpoints,
}

/// API base URLs, overridable for self-hosted gateways
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub telegram: String,
    pub vk: String,
    pub twitter: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            telegram: telegram::DEFAULT_API_URL.to_string(),
            vk: vk::DEFAULT_API_URL.to_string(),
            twitter: twitter::DEFAULT_API_URL.to_string(),
        }
    }
}

/// Which scheme a platform would use, without exposing any value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformSummary {
    pub platform: PlatformId,
    pub scheme: Option<&'static str>,
    pub errors: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Endpoints::default();
        let endpoint = |key: &str, default: String| {
            lookup(key)
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or(default)
        };

        Ok(Self {
            telegram: CredentialSet::resolve(telegram::ENV_KEYS, &lookup),
            vk: CredentialSet::resolve(vk::ENV_KEYS, &lookup),
            twitter: CredentialSet::resolve(twitter::ENV_KEYS, &lookup),
            session_file: explicit_session_path(lookup(SESSION_FILE_ENV)),
            endpoints: Endpoints {
                telegram: endpoint(TELEGRAM_API_URL_ENV, defaults.telegram),
                vk: endpoint(VK_API_URL_ENV, defaults.vk),
                twitter: endpoint(TWITTER_API_URL_ENV, defaults.twitter),
            },
        })
    }

    /// Per-platform scheme selection and validation errors
    pub fn summary(&self) -> Vec<PlatformSummary> {
        let resolvers = [
            CredentialResolver::new(PlatformId::Telegram, telegram::SCHEMES, self.telegram.clone()),
            CredentialResolver::new(PlatformId::Vk, vk::SCHEMES, self.vk.clone()),
            CredentialResolver::new(PlatformId::Twitter, twitter::SCHEMES, self.twitter.clone()),
        ];

        resolvers
            .iter()
            .map(|resolver| {
                let errors = resolver.validate().into_errors();
                let scheme = if errors.is_empty() {
                    resolver.active_scheme().map(|scheme| scheme.name)
                } else {
                    None
                };

                PlatformSummary {
                    platform: resolver.platform(),
                    scheme,
                    errors,
                }
            })
            .collect()
    }
}

/// Tilde-expand an explicit session file override, ignoring blank values
pub fn explicit_session_path(explicit: Option<String>) -> Option<PathBuf> {
    explicit
        .filter(|p| !p.trim().is_empty())
        .map(|p| PathBuf::from(shellexpand::tilde(p.trim()).to_string()))
}

/// Resolve the Telegram session file path
///
/// An explicit path wins; otherwise the file lives in the XDG data directory.
/// Only the user-session store needs this, so a missing data directory is an
/// error there and nowhere else.
pub fn resolve_session_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let data_dir = dirs::data_dir().ok_or_else(|| {
        SessionError::Path(format!("no data directory; set {}", SESSION_FILE_ENV))
    })?;

    Ok(data_dir.join("crosscast").join("telegram.session"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_splits_keys_per_platform() {
        let config = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("VK_OWNER_ID", "-42"),
            ("TWITTER_BEARER_TOKEN", "AAAA"),
            (SESSION_FILE_ENV, "/tmp/crosscast.session"),
        ]))
        .unwrap();

        assert_eq!(config.telegram.get("TELEGRAM_BOT_TOKEN"), "123:abc");
        assert_eq!(config.vk.get("VK_OWNER_ID"), "-42");
        assert_eq!(config.twitter.get("TWITTER_BEARER_TOKEN"), "AAAA");
        assert_eq!(config.telegram.get("VK_OWNER_ID"), "");
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/crosscast.session")));
    }

    #[test]
    fn test_endpoint_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            (TELEGRAM_API_URL_ENV, "http://localhost:8081/"),
            (SESSION_FILE_ENV, "/tmp/s"),
        ]))
        .unwrap();

        assert_eq!(config.endpoints.telegram, "http://localhost:8081");
        assert_eq!(config.endpoints.vk, vk::DEFAULT_API_URL);
        assert_eq!(config.endpoints.twitter, twitter::DEFAULT_API_URL);
    }

    #[test]
    fn test_session_path_tilde_expansion() {
        let path = explicit_session_path(Some("~/sessions/tg.session".to_string())).unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("sessions/tg.session"));
    }

    #[test]
    fn test_session_path_blank_override_uses_default() {
        assert_eq!(explicit_session_path(Some("  ".to_string())), None);
        if let Ok(path) = resolve_session_path(None) {
            assert!(path.ends_with("crosscast/telegram.session"));
        }
    }

    #[test]
    fn test_explicit_session_path_needs_no_data_dir() {
        let explicit = PathBuf::from("/tmp/crosscast.session");
        assert_eq!(resolve_session_path(Some(&explicit)).unwrap(), explicit);
    }

    #[test]
    fn test_from_lookup_without_session_override() {
        let config = Config::from_lookup(lookup_from(&[("TWITTER_BEARER_TOKEN", "AAAA")])).unwrap();

        assert_eq!(config.session_file, None);
        assert_eq!(config.twitter.get("TWITTER_BEARER_TOKEN"), "AAAA");
    }

    #[test]
    fn test_summary_reports_selected_schemes() {
        let config = Config::from_lookup(lookup_from(&[
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("TELEGRAM_CHANNEL_ID", "@news"),
            ("TWITTER_CLIENT_ID", "cid"),
            (SESSION_FILE_ENV, "/tmp/s"),
        ]))
        .unwrap();

        let summary = config.summary();
        assert_eq!(summary.len(), 3);

        assert_eq!(summary[0].platform, PlatformId::Telegram);
        assert_eq!(summary[0].scheme, Some("bot"));
        assert!(summary[0].errors.is_empty());

        assert_eq!(summary[1].platform, PlatformId::Vk);
        assert_eq!(summary[1].scheme, None);
        assert!(!summary[1].errors.is_empty());

        assert_eq!(summary[2].platform, PlatformId::Twitter);
        assert_eq!(summary[2].scheme, None);
        assert!(summary[2]
            .errors
            .iter()
            .any(|e| e.contains("TWITTER_CLIENT_SECRET is not set")));
    }
}
