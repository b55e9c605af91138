//! Multi-platform dispatch orchestration
//!
//! The [`Dispatcher`] owns one adapter per platform in registration order
//! (telegram, vk, twitter) and turns a message plus a platform selection into
//! an ordered list of [`DispatchResult`]s.
//!
//! Dispatch is all-or-nothing: every selected adapter is checked for
//! configuration and message validity first, and if any check fails nothing is
//! sent anywhere. Sends then run one at a time in selection order.

use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DispatchError;
use crate::platforms::telegram::TelegramPlatform;
use crate::platforms::twitter::TwitterPlatform;
use crate::platforms::vk::VkPlatform;
use crate::platforms::Platform;
use crate::session::SessionStore;
use crate::types::{DispatchResult, ErrorKind, MessageId, PlatformId, TestOutcome};

/// Platform name that selects every registered adapter
pub const ALL_PLATFORMS: &str = "all";

/// Outcome of the pre-flight pass
#[derive(Debug, Clone, PartialEq)]
pub struct Preflight {
    /// Platforms that would be sent to, in selection order
    pub selected: Vec<PlatformId>,
    /// One failure per platform that is unconfigured or rejects the message
    pub failures: Vec<DispatchResult>,
}

impl Preflight {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-platform configuration state, for status reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformStatus {
    pub platform: PlatformId,
    pub configured: bool,
    pub method: Option<&'static str>,
    pub errors: Vec<String>,
}

/// Summary helpers over a list of dispatch results
pub trait DispatchReport {
    fn all_succeeded(&self) -> bool;

    fn failed_platforms(&self) -> Vec<PlatformId>;

    /// True if any failure was an authentication failure
    fn has_authentication_failure(&self) -> bool;
}

impl DispatchReport for [DispatchResult] {
    fn all_succeeded(&self) -> bool {
        self.iter().all(|r| r.success)
    }

    fn failed_platforms(&self) -> Vec<PlatformId> {
        self.iter().filter(|r| !r.success).map(|r| r.platform).collect()
    }

    fn has_authentication_failure(&self) -> bool {
        self.iter()
            .any(|r| r.error_kind == Some(ErrorKind::Authentication))
    }
}

/// Sends one message to a selection of platforms
pub struct Dispatcher {
    adapters: Vec<Box<dyn Platform>>,
}

impl Dispatcher {
    /// Create a dispatcher over `adapters`, given in registration order
    pub fn new(adapters: Vec<Box<dyn Platform>>) -> Self {
        Self { adapters }
    }

    /// Build the three production adapters from configuration
    ///
    /// `store` backs the Telegram user session, if that scheme is selected.
    pub async fn from_config(config: &Config, store: Arc<dyn SessionStore>) -> Self {
        let adapters: Vec<Box<dyn Platform>> = vec![
            Box::new(TelegramPlatform::connect(config, store).await),
            Box::new(VkPlatform::from_config(config)),
            Box::new(TwitterPlatform::from_config(config)),
        ];

        Self::new(adapters)
    }

    pub fn adapters(&self) -> &[Box<dyn Platform>] {
        &self.adapters
    }

    pub fn get(&self, platform: PlatformId) -> Option<&dyn Platform> {
        self.adapters
            .iter()
            .find(|adapter| adapter.id() == platform)
            .map(|adapter| adapter.as_ref())
    }

    /// Map requested names to registered adapters
    ///
    /// `all` selects every adapter in registration order. Otherwise names are
    /// taken in request order; duplicates, unknown names and platforms without
    /// a registered adapter are dropped.
    pub fn resolve(&self, requested: &[String]) -> Vec<&dyn Platform> {
        if requested
            .iter()
            .any(|name| name.trim().eq_ignore_ascii_case(ALL_PLATFORMS))
        {
            return self.adapters.iter().map(|adapter| adapter.as_ref()).collect();
        }

        let mut selected: Vec<&dyn Platform> = Vec::new();
        for name in requested {
            let Ok(id) = name.parse::<PlatformId>() else {
                debug!("Dropping unknown platform '{}'", name);
                continue;
            };

            if selected.iter().any(|adapter| adapter.id() == id) {
                continue;
            }

            match self.get(id) {
                Some(adapter) => selected.push(adapter),
                None => debug!("Dropping unregistered platform '{}'", id),
            }
        }

        selected
    }

    /// Run the configuration and validation checks without sending
    pub fn preflight(
        &self,
        message: &str,
        requested: &[String],
    ) -> Result<Preflight, DispatchError> {
        let selected = self.resolve(requested);
        if selected.is_empty() {
            return Err(DispatchError::NoPlatformsSelected {
                requested: requested.to_vec(),
            });
        }

        let failures = selected
            .iter()
            .filter_map(|adapter| check(*adapter, message))
            .collect();

        Ok(Preflight {
            selected: selected.iter().map(|adapter| adapter.id()).collect(),
            failures,
        })
    }

    /// Send `message` to the requested platforms
    ///
    /// Returns the pre-flight failures alone if any platform fails its checks.
    /// Otherwise returns one result per selected platform, in selection order.
    pub async fn dispatch(
        &self,
        message: &str,
        requested: &[String],
    ) -> Result<Vec<DispatchResult>, DispatchError> {
        let preflight = self.preflight(message, requested)?;

        if !preflight.passed() {
            warn!(
                "Pre-flight failed for {} of {} platform(s); nothing sent",
                preflight.failures.len(),
                preflight.selected.len()
            );
            return Ok(preflight.failures);
        }

        info!("Dispatching to {} platform(s)", preflight.selected.len());

        let mut results = Vec::with_capacity(preflight.selected.len());
        for id in preflight.selected {
            let Some(adapter) = self.get(id) else {
                continue;
            };

            let result = match AssertUnwindSafe(adapter.send(message)).catch_unwind().await {
                Ok(result) => result,
                Err(panic) => {
                    let detail = panic_message(panic.as_ref());
                    warn!("{} adapter panicked during send: {}", id.display_name(), detail);
                    DispatchResult::failure(
                        id,
                        ErrorKind::Unexpected,
                        format!("Unexpected {} failure: {}", id.display_name(), detail),
                    )
                }
            };

            if result.success {
                info!("{}: sent", id);
            } else {
                warn!("{}: {}", id, result.error.as_deref().unwrap_or("failed"));
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Run `test()` on every registered adapter, in registration order
    pub async fn test_all(&self) -> Vec<(PlatformId, TestOutcome)> {
        let mut outcomes = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let outcome = if adapter.is_configured() {
                adapter.test().await
            } else {
                TestOutcome::failed(format!(
                    "{} is not configured: {}",
                    adapter.id().display_name(),
                    adapter.configuration_errors().join("; ")
                ))
            };
            outcomes.push((adapter.id(), outcome));
        }
        outcomes
    }

    /// Delete one message on one platform
    pub async fn delete(
        &self,
        platform: PlatformId,
        id: &MessageId,
        locator: Option<&str>,
    ) -> Result<DispatchResult, DispatchError> {
        let adapter = self
            .get(platform)
            .ok_or(DispatchError::NotRegistered(platform))?;

        Ok(adapter.delete_message(id, locator).await)
    }

    /// Configuration state of every registered adapter
    pub fn status(&self) -> Vec<PlatformStatus> {
        self.adapters
            .iter()
            .map(|adapter| PlatformStatus {
                platform: adapter.id(),
                configured: adapter.is_configured(),
                method: adapter.active_method(),
                errors: adapter.configuration_errors(),
            })
            .collect()
    }
}

/// Pre-flight check for one adapter
fn check(adapter: &dyn Platform, message: &str) -> Option<DispatchResult> {
    let platform = adapter.id();

    if !adapter.is_configured() {
        let errors = adapter.configuration_errors();
        let detail = if errors.is_empty() {
            "not configured".to_string()
        } else {
            errors.join("; ")
        };
        return Some(DispatchResult::failure(
            platform,
            ErrorKind::Configuration,
            format!("Configuration error: {}", detail),
        ));
    }

    let validation = adapter.validate_message(message);
    if !validation.is_valid() {
        return Some(DispatchResult::failure(
            platform,
            ErrorKind::Validation,
            format!("Validation failed: {}", validation.errors().join("; ")),
        ));
    }

    None
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "adapter panicked".to_string()
    }
}
