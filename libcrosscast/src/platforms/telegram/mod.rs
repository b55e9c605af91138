//! Telegram (messaging) platform implementation
//!
//! Two credential schemes are supported, highest priority first:
//!
//! - `bot`: a Bot API token plus the channel the bot posts to
//! - `user_session`: an MTProto user login (API id/hash, phone) plus the
//!   target chat. The session is kept in a [`SessionStore`] between runs.
//!
//! Telegram imposes no length limit this tool cares about, so every message
//! validates.

use async_trait::async_trait;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};

pub mod bot;
pub mod user_session;

#[cfg(feature = "telegram-user")]
pub mod grammers;

use self::bot::BotClient;
use crate::config::Config;
use crate::credentials::{CredentialResolver, CredentialSet, SchemeSpec};
use crate::error::PlatformError;
use crate::platforms::{not_configured, Platform};
use crate::session::SessionStore;
use crate::types::{DispatchResult, ErrorKind, MessageId, PlatformId, ValidationResult};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

pub const BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const CHANNEL_ID: &str = "TELEGRAM_CHANNEL_ID";
pub const API_ID: &str = "TELEGRAM_API_ID";
pub const API_HASH: &str = "TELEGRAM_API_HASH";
pub const PHONE: &str = "TELEGRAM_PHONE";
pub const CHAT: &str = "TELEGRAM_CHAT";

pub const ENV_KEYS: &[&str] = &[BOT_TOKEN, CHANNEL_ID, API_ID, API_HASH, PHONE, CHAT];

pub const SCHEMES: &[SchemeSpec] = &[
    SchemeSpec::new("bot", &[BOT_TOKEN, CHANNEL_ID]),
    SchemeSpec::new("user_session", &[API_ID, API_HASH, PHONE, CHAT]).with_numeric(&[API_ID]),
];

/// The credential scheme selected for this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelegramScheme {
    Bot,
    UserSession,
}

impl TelegramScheme {
    pub fn method(&self) -> &'static str {
        match self {
            TelegramScheme::Bot => "bot",
            TelegramScheme::UserSession => "user_session",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "bot" => Some(TelegramScheme::Bot),
            "user_session" => Some(TelegramScheme::UserSession),
            _ => None,
        }
    }
}

/// A message Telegram accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: i64,
    pub chat_id: i64,
    /// Unix timestamp assigned by Telegram
    pub date: i64,
}

/// Wire operations the Telegram adapter needs, whichever scheme backs them
#[async_trait]
pub trait TelegramClient: Send + Sync {
    async fn send_message(&self, text: &str) -> Result<SentMessage, PlatformError>;

    /// Delete message `id` in the configured chat, or in `locator` if given
    async fn delete_message(&self, id: i64, locator: Option<&str>) -> Result<(), PlatformError>;
}

/// Where a chat locator points
///
/// Accepts `@username`, bare usernames, `t.me` links and numeric ids
/// (including the `-100` prefixed form).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLocator {
    Id(i64),
    Username(String),
}

impl ChatLocator {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(id) = trimmed.parse::<i64>() {
            return ChatLocator::Id(id);
        }

        let name = trimmed
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_start_matches("t.me/")
            .trim_start_matches('@');

        ChatLocator::Username(name.to_string())
    }
}

/// Offset the Bot API adds to channel and supergroup ids (`-100` prefix)
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// MTProto peer id for a Bot API style chat id
///
/// Channels and supergroups are `-(10^12 + id)`, basic groups are `-id`,
/// users are `id`.
pub fn bare_chat_id(id: i64) -> i64 {
    if id <= -CHANNEL_ID_OFFSET {
        -(id + CHANNEL_ID_OFFSET)
    } else if id < 0 {
        -id
    } else {
        id
    }
}

/// Telegram platform client
pub struct TelegramPlatform {
    validation: ValidationResult,
    scheme: Option<TelegramScheme>,
    client: Option<Box<dyn TelegramClient>>,
    init_error: Option<String>,
}

impl TelegramPlatform {
    /// Build the adapter and open a client for the selected scheme
    ///
    /// The `user_session` scheme loads its session from `store`, logging in
    /// interactively (and saving the new session) when none is stored.
    pub async fn connect(config: &Config, store: Arc<dyn SessionStore>) -> Self {
        let (validation, scheme) = resolve(config.telegram.clone());

        let client = match scheme {
            Some(TelegramScheme::Bot) => Some(
                BotClient::new(
                    &config.endpoints.telegram,
                    SecretString::from(config.telegram.get(BOT_TOKEN).to_string()),
                    config.telegram.get(CHANNEL_ID),
                )
                .map(|client| Box::new(client) as Box<dyn TelegramClient>),
            ),
            Some(TelegramScheme::UserSession) => {
                Some(open_user_session(&config.telegram, store).await)
            }
            None => None,
        };

        Self::assemble(validation, scheme, client)
    }

    /// Build the adapter around an existing client handle
    pub fn with_client(credentials: CredentialSet, client: Box<dyn TelegramClient>) -> Self {
        let (validation, scheme) = resolve(credentials);
        let client = scheme.map(|_| Ok(client));
        Self::assemble(validation, scheme, client)
    }

    fn assemble(
        validation: ValidationResult,
        scheme: Option<TelegramScheme>,
        client: Option<Result<Box<dyn TelegramClient>, String>>,
    ) -> Self {
        let (client, init_error) = match client {
            Some(Ok(client)) => (Some(client), None),
            Some(Err(e)) => (None, Some(e)),
            None => (None, None),
        };

        if let Some(scheme) = scheme {
            tracing::debug!("Telegram using {} credentials", scheme.method());
        }

        Self {
            validation,
            scheme,
            client,
            init_error,
        }
    }

    pub fn scheme(&self) -> Option<TelegramScheme> {
        self.scheme
    }

    fn ready(&self) -> Result<(TelegramScheme, &dyn TelegramClient), DispatchResult> {
        match (self.scheme, self.client.as_deref()) {
            (Some(scheme), Some(client)) => Ok((scheme, client)),
            _ => Err(not_configured(PlatformId::Telegram, &self.configuration_errors())),
        }
    }
}

fn resolve(credentials: CredentialSet) -> (ValidationResult, Option<TelegramScheme>) {
    let resolver = CredentialResolver::new(PlatformId::Telegram, SCHEMES, credentials);
    let validation = resolver.validate();

    let scheme = if validation.is_valid() {
        resolver
            .active_scheme()
            .and_then(|spec| TelegramScheme::from_name(spec.name))
    } else {
        None
    };

    (validation, scheme)
}

#[cfg(feature = "telegram-user")]
async fn open_user_session(
    creds: &CredentialSet,
    store: Arc<dyn SessionStore>,
) -> Result<Box<dyn TelegramClient>, String> {
    use self::grammers::GrammersSession;
    use self::user_session::UserSessionClient;

    let api_id = creds
        .get(API_ID)
        .parse::<i32>()
        .map_err(|e| format!("{} is out of range: {}", API_ID, e))?;

    let session = GrammersSession::connect(
        api_id,
        SecretString::from(creds.get(API_HASH).to_string()),
        creds.get(PHONE),
        store,
    )
    .await?;

    Ok(Box::new(UserSessionClient::new(
        session,
        ChatLocator::parse(creds.get(CHAT)),
    )))
}

#[cfg(not(feature = "telegram-user"))]
async fn open_user_session(
    _creds: &CredentialSet,
    _store: Arc<dyn SessionStore>,
) -> Result<Box<dyn TelegramClient>, String> {
    Err("user_session support is not compiled in (rebuild with the telegram-user feature)"
        .to_string())
}

#[async_trait]
impl Platform for TelegramPlatform {
    fn id(&self) -> PlatformId {
        PlatformId::Telegram
    }

    fn is_configured(&self) -> bool {
        self.validation.is_valid() && self.client.is_some()
    }

    fn configuration_errors(&self) -> Vec<String> {
        let mut errors = self.validation.errors().to_vec();
        if let Some(e) = &self.init_error {
            errors.push(format!("Telegram client failed to initialize: {}", e));
        }
        errors
    }

    fn active_method(&self) -> Option<&'static str> {
        self.scheme.map(|s| s.method())
    }

    async fn send(&self, text: &str) -> DispatchResult {
        let (scheme, client) = match self.ready() {
            Ok(ready) => ready,
            Err(result) => return result,
        };

        match client.send_message(text).await {
            Ok(sent) => {
                info!("Posted to Telegram chat {}: {}", sent.chat_id, sent.id);
                DispatchResult::success(PlatformId::Telegram, Some(MessageId::Int(sent.id)))
                    .with_method(scheme.method())
                    .with_extra("chat_id", sent.chat_id)
                    .with_extra("date", sent.date)
            }
            Err(e) => {
                warn!("Failed to post to Telegram: {}", e);
                DispatchResult::from_error(PlatformId::Telegram, &e).with_method(scheme.method())
            }
        }
    }

    async fn delete_message(&self, id: &MessageId, locator: Option<&str>) -> DispatchResult {
        let (scheme, client) = match self.ready() {
            Ok(ready) => ready,
            Err(result) => return result,
        };

        let Some(message_id) = id.as_i64() else {
            return DispatchResult::failure(
                PlatformId::Telegram,
                ErrorKind::Validation,
                format!("Telegram message ids are integers, got '{}'", id),
            )
            .with_method(scheme.method());
        };

        match client.delete_message(message_id, locator).await {
            Ok(()) => {
                info!("Deleted Telegram message {}", message_id);
                DispatchResult::success(PlatformId::Telegram, Some(MessageId::Int(message_id)))
                    .with_method(scheme.method())
            }
            Err(e) => {
                DispatchResult::from_error(PlatformId::Telegram, &e).with_method(scheme.method())
            }
        }
    }
}
