//! Credential resolution for platform authentication schemes
//!
//! Each platform reads a fixed set of named settings into a [`CredentialSet`]
//! and declares the [`SchemeSpec`]s it supports, highest priority first. A
//! [`CredentialResolver`] classifies which schemes are complete, which are
//! dangling (partially filled), and which one is active.
//!
//! # Examples
//!
//! ```
//! use libcrosscast::credentials::{CredentialResolver, CredentialSet, SchemeSpec};
//! use libcrosscast::types::PlatformId;
//!
//! const SCHEMES: &[SchemeSpec] = &[SchemeSpec::new(
//!     "access_token",
//!     &["VK_ACCESS_TOKEN", "VK_OWNER_ID"],
//! )];
//!
//! let creds = CredentialSet::from_pairs(&[("VK_ACCESS_TOKEN", "vk1.a.token")]);
//! let resolver = CredentialResolver::new(PlatformId::Vk, SCHEMES, creds);
//!
//! assert!(!resolver.has_scheme("access_token"));
//! let validation = resolver.validate();
//! assert!(!validation.is_valid());
//! assert!(validation.errors().iter().any(|e| e.contains("VK_OWNER_ID")));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{PlatformId, ValidationResult};

/// Named credential values for one platform
///
/// Missing keys read back as empty strings. Values are trimmed on the way in,
/// so a key set to whitespace counts as missing.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialSet {
    values: BTreeMap<String, String>,
}

impl CredentialSet {
    /// Read `keys` through `lookup`, recording absent keys as empty
    pub fn resolve<F>(keys: &[&str], lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let values = keys
            .iter()
            .map(|key| {
                let value = lookup(key).map(|v| v.trim().to_string()).unwrap_or_default();
                (key.to_string(), value)
            })
            .collect();

        Self { values }
    }

    /// Build a set from literal pairs
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let values = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.trim().to_string()))
            .collect();

        Self { values }
    }

    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn is_present(&self, key: &str) -> bool {
        !self.get(key).is_empty()
    }

    /// Keys that hold a non-empty value
    pub fn present_keys(&self) -> impl Iterator<Item = &str> {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, _)| k.as_str())
    }
}

// Never print values: these are tokens and secrets.
impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, value) in &self.values {
            map.entry(key, &if value.is_empty() { "<empty>" } else { "<set>" });
        }
        map.finish()
    }
}

/// One named way of authenticating against a platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemeSpec {
    pub name: &'static str,
    /// Every key the scheme needs
    pub required: &'static [&'static str],
    /// Keys whose presence signals intent to use this scheme.
    ///
    /// Defaults to `required`. Schemes that share keys with a sibling (the
    /// Twitter access-token pair) list only their own keys here, so a complete
    /// sibling does not make them look partially filled.
    pub distinguishing: &'static [&'static str],
    /// Keys that must parse as integers when present
    pub numeric: &'static [&'static str],
}

impl SchemeSpec {
    pub const fn new(name: &'static str, required: &'static [&'static str]) -> Self {
        Self {
            name,
            required,
            distinguishing: required,
            numeric: &[],
        }
    }

    pub const fn distinguished_by(self, keys: &'static [&'static str]) -> Self {
        Self {
            distinguishing: keys,
            ..self
        }
    }

    pub const fn with_numeric(self, keys: &'static [&'static str]) -> Self {
        Self {
            numeric: keys,
            ..self
        }
    }

    pub fn is_complete(&self, creds: &CredentialSet) -> bool {
        self.required.iter().all(|key| creds.is_present(key))
    }

    /// Some distinguishing key is set but the scheme is not complete
    pub fn is_partial(&self, creds: &CredentialSet) -> bool {
        !self.is_complete(creds) && self.distinguishing.iter().any(|key| creds.is_present(key))
    }

    pub fn missing(&self, creds: &CredentialSet) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|key| !creds.is_present(key))
            .collect()
    }

    /// Required keys this scheme shares with a sibling (not distinguishing)
    pub fn shared_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.required
            .iter()
            .copied()
            .filter(|key| !self.distinguishing.contains(key))
    }
}

/// Classifies a platform's credentials against its schemes
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    platform: PlatformId,
    schemes: &'static [SchemeSpec],
    credentials: CredentialSet,
}

impl CredentialResolver {
    /// `schemes` must be ordered highest priority first
    pub fn new(
        platform: PlatformId,
        schemes: &'static [SchemeSpec],
        credentials: CredentialSet,
    ) -> Self {
        Self {
            platform,
            schemes,
            credentials,
        }
    }

    pub fn platform(&self) -> PlatformId {
        self.platform
    }

    pub fn credentials(&self) -> &CredentialSet {
        &self.credentials
    }

    pub fn schemes(&self) -> &'static [SchemeSpec] {
        self.schemes
    }

    /// True iff every field the named scheme requires is non-empty
    pub fn has_scheme(&self, name: &str) -> bool {
        self.schemes
            .iter()
            .find(|scheme| scheme.name == name)
            .is_some_and(|scheme| scheme.is_complete(&self.credentials))
    }

    /// Complete schemes, in priority order
    pub fn complete_schemes(&self) -> Vec<&'static SchemeSpec> {
        self.schemes
            .iter()
            .filter(|scheme| scheme.is_complete(&self.credentials))
            .collect()
    }

    /// Highest-priority complete scheme
    pub fn active_scheme(&self) -> Option<&'static SchemeSpec> {
        self.schemes
            .iter()
            .find(|scheme| scheme.is_complete(&self.credentials))
    }

    /// Validate the credential set
    ///
    /// Fails when no scheme is complete, when any scheme is partially filled
    /// (one error per missing key), or when a numeric key does not parse.
    /// Having several complete schemes at once is not an error.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();
        let name = self.platform.display_name();

        if self.active_scheme().is_none() {
            let options = self
                .schemes
                .iter()
                .map(|scheme| format!("{} ({})", scheme.name, scheme.required.join(", ")))
                .collect::<Vec<_>>()
                .join(" or ");
            result.push(format!(
                "{} is not configured: no complete credential scheme. Set {}",
                name, options
            ));
        }

        let mut reported: Vec<&'static str> = Vec::new();
        for scheme in self.schemes {
            if scheme.is_partial(&self.credentials) {
                for key in scheme.missing(&self.credentials) {
                    result.push(format!(
                        "{} {} credentials incomplete: {} is not set",
                        name, scheme.name, key
                    ));
                    reported.push(key);
                }
            }
        }

        // A half-set shared group counts as partial even with no distinguishing key
        for scheme in self.schemes {
            let shared: Vec<&'static str> = scheme.shared_keys().collect();
            let present: Vec<&'static str> = shared
                .iter()
                .copied()
                .filter(|key| self.credentials.is_present(key))
                .collect();
            if present.is_empty() {
                continue;
            }

            for key in shared {
                if !self.credentials.is_present(key) && !reported.contains(&key) {
                    result.push(format!(
                        "{} credentials incomplete: {} is not set (needed with {})",
                        name,
                        key,
                        present.join(", ")
                    ));
                    reported.push(key);
                }
            }
        }

        let mut numeric_keys: Vec<&'static str> = Vec::new();
        for key in self.schemes.iter().flat_map(|scheme| scheme.numeric.iter()) {
            if !numeric_keys.contains(key) {
                numeric_keys.push(*key);
            }
        }
        for key in numeric_keys {
            let value = self.credentials.get(key);
            if !value.is_empty() && value.parse::<i64>().is_err() {
                result.push(format!("{} must be an integer (got '{}')", key, value));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests;
