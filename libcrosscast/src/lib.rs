//! Crosscast - post one message to Telegram, VK and Twitter at once
//!
//! This library holds the posting core: per-platform credential resolution,
//! one adapter per platform behind the [`platforms::Platform`] trait, and the
//! all-or-nothing [`dispatcher::Dispatcher`].

pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::{CredentialResolver, CredentialSet, SchemeSpec};
pub use dispatcher::{DispatchReport, Dispatcher, Preflight};
pub use error::{CrosscastError, Result};
pub use session::{FileSessionStore, SessionStore};
pub use types::{DispatchResult, ErrorKind, MessageId, PlatformId, TestOutcome, ValidationResult};
