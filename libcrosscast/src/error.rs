//! Error types for Crosscast

use thiserror::Error;

use crate::types::{ErrorKind, PlatformId};

pub type Result<T> = std::result::Result<T, CrosscastError>;

#[derive(Error, Debug)]
pub enum CrosscastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CrosscastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrosscastError::InvalidInput(_) => 3,
            CrosscastError::Platform(PlatformError::Authentication(_)) => 2,
            CrosscastError::Platform(_) => 1,
            CrosscastError::Config(_) => 1,
            CrosscastError::Session(_) => 1,
            CrosscastError::Dispatch(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load environment file: {0}")]
    EnvFile(String),
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to read session file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to write session file: {0}")]
    Write(#[source] std::io::Error),

    #[error("Failed to resolve session path: {0}")]
    Path(String),
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Content validation failed: {0}")]
    Validation(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Unsupported by credential scheme: {0}")]
    Capability(String),

    #[error("Could not resolve conversation: {0}")]
    EntityResolution(String),

    #[error("Platform not configured: {0}")]
    NotConfigured(String),
}

impl PlatformError {
    /// Result-level classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            PlatformError::Authentication(_) => ErrorKind::Authentication,
            PlatformError::Validation(_) => ErrorKind::Validation,
            PlatformError::Posting(_) | PlatformError::Network(_) | PlatformError::RateLimit(_) => {
                ErrorKind::Transport
            }
            PlatformError::Capability(_) => ErrorKind::Capability,
            PlatformError::EntityResolution(_) => ErrorKind::EntityResolution,
            PlatformError::NotConfigured(_) => ErrorKind::Configuration,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("No platforms selected (requested: {})", format_requested(.requested))]
    NoPlatformsSelected { requested: Vec<String> },

    #[error("Unknown platform '{0}'. Valid platforms: telegram, vk, twitter, all")]
    UnknownPlatform(String),

    #[error("Platform {0} is not registered")]
    NotRegistered(PlatformId),
}

fn format_requested(requested: &[String]) -> String {
    if requested.is_empty() {
        "nothing".to_string()
    } else {
        requested.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_invalid_input() {
        let error = CrosscastError::InvalidInput("Empty content".to_string());
        assert_eq!(error.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_authentication_error() {
        let error = CrosscastError::Platform(PlatformError::Authentication(
            "Invalid bot token".to_string(),
        ));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_other_errors() {
        let posting = CrosscastError::Platform(PlatformError::Posting("timeout".to_string()));
        assert_eq!(posting.exit_code(), 1);

        let config = CrosscastError::Config(ConfigError::EnvFile(".env: not found".to_string()));
        assert_eq!(config.exit_code(), 1);

        let session = CrosscastError::Session(SessionError::Path("no data directory".to_string()));
        assert_eq!(session.exit_code(), 1);

        let dispatch = CrosscastError::Dispatch(DispatchError::NoPlatformsSelected {
            requested: vec![],
        });
        assert_eq!(dispatch.exit_code(), 1);
    }

    #[test]
    fn test_error_message_formatting() {
        let error = CrosscastError::Platform(PlatformError::Capability(
            "bearer tokens are read-only".to_string(),
        ));
        assert_eq!(
            error.to_string(),
            "Platform error: Unsupported by credential scheme: bearer tokens are read-only"
        );

        let config = ConfigError::EnvFile("prod.env: not found".to_string());
        assert_eq!(
            config.to_string(),
            "Failed to load environment file: prod.env: not found"
        );
    }

    #[test]
    fn test_no_platforms_selected_message() {
        let error = DispatchError::NoPlatformsSelected {
            requested: vec!["myspace".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "No platforms selected (requested: myspace)"
        );

        let empty = DispatchError::NoPlatformsSelected { requested: vec![] };
        assert!(empty.to_string().contains("nothing"));
    }

    #[test]
    fn test_platform_error_kinds() {
        assert_eq!(
            PlatformError::Network("x".to_string()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            PlatformError::RateLimit("x".to_string()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            PlatformError::Capability("x".to_string()).kind(),
            ErrorKind::Capability
        );
        assert_eq!(
            PlatformError::EntityResolution("x".to_string()).kind(),
            ErrorKind::EntityResolution
        );
        assert_eq!(
            PlatformError::NotConfigured("x".to_string()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_platform_error_clone() {
        let original = PlatformError::Network("Connection failed".to_string());
        let cloned = original.clone();

        assert_eq!(format!("{}", original), format!("{}", cloned));
    }
}
