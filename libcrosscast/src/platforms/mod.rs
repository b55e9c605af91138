//! Platform abstraction and implementations
//!
//! This module provides a unified trait for posting to the supported services.
//! Each adapter owns one resolved credential set and one client handle bound to
//! the selected credential scheme, and converts every outcome into a
//! [`DispatchResult`] instead of returning errors.
//!
//! # Examples
//!
//! ```no_run
//! use libcrosscast::config::Config;
//! use libcrosscast::platforms::{vk::VkPlatform, Platform};
//!
//! # async fn example() -> libcrosscast::error::Result<()> {
//! let config = Config::from_env()?;
//! let platform = VkPlatform::from_config(&config);
//!
//! if platform.is_configured() {
//!     let result = platform.send("Hello, wall!").await;
//!     if result.success {
//!         println!("Posted: {:?}", result.message_id);
//!     }
//! } else {
//!     for error in platform.configuration_errors() {
//!         eprintln!("{}", error);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::types::{DispatchResult, ErrorKind, MessageId, PlatformId, TestOutcome, ValidationResult};

pub mod telegram;
pub mod twitter;
pub mod vk;

// Mock platform is available for all builds (not just tests) to support integration tests
pub mod mock;

/// Request timeout applied to every platform HTTP client
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Platform trait for unified social media platform interactions
///
/// Every method that touches the network returns a [`DispatchResult`].
/// Implementations never return errors for send, delete or test.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Which destination this adapter posts to
    fn id(&self) -> PlatformId;

    /// Lowercase identifier (e.g., "telegram", "vk", "twitter")
    fn name(&self) -> &'static str {
        self.id().as_str()
    }

    /// True iff credential validation passes and the client handle was built
    fn is_configured(&self) -> bool;

    /// Credential validation errors, plus a client initialization error if
    /// validation passed but the handle could not be constructed
    fn configuration_errors(&self) -> Vec<String>;

    /// Name of the credential scheme in use, if any
    fn active_method(&self) -> Option<&'static str>;

    /// Check message content against platform constraints
    ///
    /// Platforms without a meaningful limit accept everything.
    fn validate_message(&self, _text: &str) -> ValidationResult {
        ValidationResult::valid()
    }

    /// Maximum message length, or `None` when there is no hard limit
    fn character_limit(&self) -> Option<usize> {
        None
    }

    /// Post the message with exactly one API call
    async fn send(&self, text: &str) -> DispatchResult;

    /// Delete a previously posted message
    ///
    /// `locator` overrides the configured conversation where the platform
    /// addresses messages per conversation (Telegram).
    async fn delete_message(&self, id: &MessageId, locator: Option<&str>) -> DispatchResult;

    /// Whether `test()` should try to clean up its canary
    fn supports_delete(&self) -> bool {
        true
    }

    /// Post a canary message and try to delete it again
    ///
    /// The post decides the outcome. A failed cleanup is logged and noted in
    /// the message but does not fail the test.
    async fn test(&self) -> TestOutcome {
        let name = self.id().display_name();
        let sent = self.send(&canary_message()).await;

        if !sent.success {
            return TestOutcome::failed(format!(
                "{} test post failed: {}",
                name,
                sent.error.as_deref().unwrap_or("unknown error")
            ));
        }

        let mut message = match &sent.message_id {
            Some(id) => format!("{} test post succeeded (id {})", name, id),
            None => format!("{} test post succeeded", name),
        };

        if self.supports_delete() {
            if let Some(id) = &sent.message_id {
                let cleanup = self.delete_message(id, None).await;
                if cleanup.success {
                    message.push_str("; canary deleted");
                } else {
                    let reason = cleanup.error.unwrap_or_default();
                    tracing::warn!("Failed to delete {} canary {}: {}", name, id, reason);
                    message.push_str(&format!("; canary cleanup failed: {}", reason));
                }
            }
        }

        TestOutcome::passed(message)
    }
}

/// Short message posted by `test()`
pub fn canary_message() -> String {
    format!(
        "crosscast connectivity test {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

/// Failure result for an adapter whose credentials or client are unusable
pub(crate) fn not_configured(platform: PlatformId, errors: &[String]) -> DispatchResult {
    let detail = if errors.is_empty() {
        "client is not initialized".to_string()
    } else {
        errors.join("; ")
    };

    DispatchResult::failure(
        platform,
        ErrorKind::Configuration,
        format!("{} is not configured: {}", platform.display_name(), detail),
    )
}

/// Build the shared HTTP client for an adapter
pub(crate) fn http_client() -> std::result::Result<reqwest::Client, String> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .user_agent(concat!("crosscast/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| format!("Failed to build HTTP client: {}", e))
}

/// Classify an HTTP failure status the same way for every platform
pub(crate) fn error_for_status(
    platform: PlatformId,
    status: u16,
    detail: &str,
    context: &str,
) -> crate::error::PlatformError {
    use crate::error::PlatformError;

    let name = platform.display_name();
    match status {
        401 | 403 => PlatformError::Authentication(format!(
            "{} rejected credentials ({}): HTTP {} {}",
            name, context, status, detail
        )),
        429 => PlatformError::RateLimit(format!(
            "{} rate limit exceeded ({}): {}",
            name, context, detail
        )),
        500..=599 => PlatformError::Network(format!(
            "{} server error ({}): HTTP {} {}",
            name, context, status, detail
        )),
        _ => PlatformError::Posting(format!(
            "{} request failed ({}): HTTP {} {}",
            name, context, status, detail
        )),
    }
}

/// Map a transport-level reqwest failure
pub(crate) fn map_transport_error(
    platform: PlatformId,
    error: reqwest::Error,
    context: &str,
) -> crate::error::PlatformError {
    use crate::error::PlatformError;

    let name = platform.display_name();
    if error.is_timeout() {
        PlatformError::Network(format!("{} request timed out ({}): {}", name, context, error))
    } else if error.is_decode() {
        PlatformError::Posting(format!(
            "{} returned an unreadable response ({}): {}",
            name, context, error
        ))
    } else {
        PlatformError::Network(format!("{} request failed ({}): {}", name, context, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;

    #[test]
    fn test_canary_message_is_short() {
        let canary = canary_message();
        assert!(canary.starts_with("crosscast connectivity test"));
        assert!(canary.chars().count() < 280);
    }

    #[test]
    fn test_not_configured_joins_errors() {
        let result = not_configured(
            PlatformId::Vk,
            &["VK_OWNER_ID is not set".to_string(), "other".to_string()],
        );

        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ErrorKind::Configuration));
        assert_eq!(
            result.error.unwrap(),
            "VK is not configured: VK_OWNER_ID is not set; other"
        );
    }

    #[test]
    fn test_error_for_status_classification() {
        assert!(matches!(
            error_for_status(PlatformId::Twitter, 401, "Unauthorized", "post"),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            error_for_status(PlatformId::Twitter, 403, "Forbidden", "post"),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            error_for_status(PlatformId::Telegram, 429, "Too Many Requests", "send"),
            PlatformError::RateLimit(_)
        ));
        assert!(matches!(
            error_for_status(PlatformId::Vk, 502, "Bad Gateway", "wall.post"),
            PlatformError::Network(_)
        ));
        assert!(matches!(
            error_for_status(PlatformId::Vk, 400, "Bad Request", "wall.post"),
            PlatformError::Posting(_)
        ));
    }

    #[test]
    fn test_error_for_status_includes_context() {
        let error = error_for_status(PlatformId::Telegram, 400, "chat not found", "sendMessage");
        let message = error.to_string();
        assert!(message.contains("Telegram"));
        assert!(message.contains("sendMessage"));
        assert!(message.contains("chat not found"));
    }
}
