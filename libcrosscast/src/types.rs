//! Core types for Crosscast

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{DispatchError, PlatformError};

/// One of the supported destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    /// Chat/channel messaging (Telegram)
    Telegram,
    /// Social wall (VK)
    Vk,
    /// Microblogging (Twitter / X)
    Twitter,
}

impl PlatformId {
    /// All platforms, in registration order
    pub const ALL: [PlatformId; 3] = [PlatformId::Telegram, PlatformId::Vk, PlatformId::Twitter];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::Telegram => "telegram",
            PlatformId::Vk => "vk",
            PlatformId::Twitter => "twitter",
        }
    }

    /// Human-readable service name for error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformId::Telegram => "Telegram",
            PlatformId::Vk => "VK",
            PlatformId::Twitter => "Twitter",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "telegram" | "messaging" | "tg" => Ok(PlatformId::Telegram),
            "vk" | "wall" => Ok(PlatformId::Vk),
            "twitter" | "microblog" | "x" => Ok(PlatformId::Twitter),
            _ => Err(DispatchError::UnknownPlatform(s.to_string())),
        }
    }
}

/// Provider-assigned message identifier
///
/// Telegram and VK hand out integers, Twitter hands out strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Int(i64),
    Str(String),
}

impl MessageId {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MessageId::Int(id) => Some(*id),
            MessageId::Str(s) => s.parse().ok(),
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Int(id) => write!(f, "{}", id),
            MessageId::Str(id) => f.write_str(id),
        }
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        MessageId::Int(id)
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        MessageId::Str(id)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        MessageId::Str(id.to_string())
    }
}

/// Outcome of configuration or content validation
///
/// `is_valid` is derived from the error list so the two can never disagree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    errors: Vec<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self { errors }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn push(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn extend(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

/// Classification of a failed dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or partial credentials, or client initialization failure
    Configuration,
    /// Message violates a platform constraint
    Validation,
    /// Credential scheme lacks the capability the operation needs
    Capability,
    /// Platform rejected the credentials
    Authentication,
    /// Network failure or non-success API response
    Transport,
    /// Target conversation could not be resolved
    EntityResolution,
    /// Adapter panicked during the send phase
    Unexpected,
}

/// Normalized outcome for one platform from one `send`/`delete_message` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub platform: PlatformId,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Platform-specific response fields (chat id, post url, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DispatchResult {
    pub fn success(platform: PlatformId, message_id: Option<MessageId>) -> Self {
        Self {
            platform,
            success: true,
            error: None,
            error_kind: None,
            message_id,
            method: None,
            extra: Map::new(),
        }
    }

    pub fn failure(platform: PlatformId, kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            platform,
            success: false,
            error: Some(error.into()),
            error_kind: Some(kind),
            message_id: None,
            method: None,
            extra: Map::new(),
        }
    }

    /// Build a failure result from a platform error, keeping its classification
    pub fn from_error(platform: PlatformId, error: &PlatformError) -> Self {
        Self::failure(platform, error.kind(), error.to_string())
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_extra(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(key.to_string(), value.into());
        self
    }
}

/// Result of the `test()` canary round trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    pub success: bool,
    pub message: String,
}

impl TestOutcome {
    pub fn passed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
