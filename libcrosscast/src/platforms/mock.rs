//! Mock platforms and wire clients for testing
//!
//! [`MockPlatform`] is a configurable [`Platform`] that can simulate success,
//! configuration problems, content limits, send failures, delays and panics.
//! The `Mock*Api`/`Mock*Client` types stand in for each adapter's wire client
//! so the real adapters can be exercised without credentials or network.
//!
//! All mocks are cheap to clone and share their recorded calls between clones,
//! so a test can hand one copy to the code under test and inspect the other.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::PlatformError;
use crate::platforms::telegram::user_session::{EntityFlags, MtprotoSession};
use crate::platforms::telegram::{ChatLocator, SentMessage, TelegramClient};
use crate::platforms::twitter::api::{Tweet, TwitterApi};
use crate::platforms::vk::WallApi;
use crate::platforms::{not_configured, Platform};
use crate::types::{DispatchResult, ErrorKind, MessageId, PlatformId, ValidationResult};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub platform: PlatformId,

    /// Whether the platform reports itself configured
    pub configured: bool,

    /// Errors reported when not configured
    pub configuration_errors: Vec<String>,

    /// Scheme name reported on results
    pub method: Option<&'static str>,

    /// Whether sending should succeed
    pub send_succeeds: bool,

    /// Error to return on send failure
    pub send_error: Option<String>,

    pub error_kind: ErrorKind,

    /// Panic inside `send` (simulates an adapter bug)
    pub panics: bool,

    /// Delay before completing operations (simulates network latency)
    pub delay: Duration,

    /// Character limit for validation
    pub character_limit: Option<usize>,

    pub send_calls: Arc<Mutex<usize>>,
    pub validate_calls: Arc<Mutex<usize>>,
    pub sent_content: Arc<Mutex<Vec<String>>>,
    pub deleted: Arc<Mutex<Vec<(MessageId, Option<String>)>>>,
}

impl MockConfig {
    pub fn for_platform(platform: PlatformId) -> Self {
        Self {
            platform,
            configured: true,
            configuration_errors: Vec::new(),
            method: None,
            send_succeeds: true,
            send_error: None,
            error_kind: ErrorKind::Transport,
            panics: false,
            delay: Duration::from_millis(0),
            character_limit: None,
            send_calls: Arc::new(Mutex::new(0)),
            validate_calls: Arc::new(Mutex::new(0)),
            sent_content: Arc::new(Mutex::new(Vec::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
#[derive(Debug, Clone)]
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// A configured platform whose sends always succeed
    pub fn success(platform: PlatformId) -> Self {
        Self::new(MockConfig::for_platform(platform))
    }

    /// A platform that fails its configuration check
    pub fn not_configured(platform: PlatformId, error: &str) -> Self {
        Self::new(MockConfig {
            configured: false,
            configuration_errors: vec![error.to_string()],
            ..MockConfig::for_platform(platform)
        })
    }

    /// A configured platform whose sends fail
    pub fn send_failure(platform: PlatformId, kind: ErrorKind, error: &str) -> Self {
        Self::new(MockConfig {
            send_succeeds: false,
            send_error: Some(error.to_string()),
            error_kind: kind,
            ..MockConfig::for_platform(platform)
        })
    }

    pub fn with_limit(platform: PlatformId, limit: usize) -> Self {
        Self::new(MockConfig {
            character_limit: Some(limit),
            ..MockConfig::for_platform(platform)
        })
    }

    pub fn with_delay(platform: PlatformId, delay: Duration) -> Self {
        Self::new(MockConfig {
            delay,
            ..MockConfig::for_platform(platform)
        })
    }

    /// A platform whose `send` panics
    pub fn panicking(platform: PlatformId) -> Self {
        Self::new(MockConfig {
            panics: true,
            ..MockConfig::for_platform(platform)
        })
    }

    /// Report `method` as the active scheme
    pub fn with_method(mut self, method: &'static str) -> Self {
        self.config.method = Some(method);
        self
    }

    pub fn send_call_count(&self) -> usize {
        *lock(&self.config.send_calls)
    }

    pub fn validate_call_count(&self) -> usize {
        *lock(&self.config.validate_calls)
    }

    pub fn sent_content(&self) -> Vec<String> {
        lock(&self.config.sent_content).clone()
    }

    pub fn deleted(&self) -> Vec<(MessageId, Option<String>)> {
        lock(&self.config.deleted).clone()
    }

    fn next_message_id(&self, sequence: usize) -> MessageId {
        match self.config.platform {
            PlatformId::Twitter => MessageId::Str(format!("{}", 1_800_000_000_000 + sequence)),
            _ => MessageId::Int(1000 + sequence as i64),
        }
    }

    fn tag(&self, result: DispatchResult) -> DispatchResult {
        match self.config.method {
            Some(method) => result.with_method(method),
            None => result,
        }
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn id(&self) -> PlatformId {
        self.config.platform
    }

    fn is_configured(&self) -> bool {
        self.config.configured
    }

    fn configuration_errors(&self) -> Vec<String> {
        if self.config.configured {
            Vec::new()
        } else {
            self.config.configuration_errors.clone()
        }
    }

    fn active_method(&self) -> Option<&'static str> {
        self.config.method.filter(|_| self.config.configured)
    }

    fn validate_message(&self, text: &str) -> ValidationResult {
        *lock(&self.config.validate_calls) += 1;

        match self.config.character_limit {
            Some(limit) if text.chars().count() > limit => {
                ValidationResult::from_errors(vec![format!(
                    "Message exceeds {}'s {} character limit (current: {} characters)",
                    self.config.platform.display_name(),
                    limit,
                    text.chars().count()
                )])
            }
            _ => ValidationResult::valid(),
        }
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }

    async fn send(&self, text: &str) -> DispatchResult {
        let sequence = {
            let mut calls = lock(&self.config.send_calls);
            *calls += 1;
            *calls
        };

        if self.config.panics {
            panic!("mock {} adapter panicked", self.config.platform);
        }

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        if !self.config.configured {
            return not_configured(self.config.platform, &self.configuration_errors());
        }

        if !self.config.send_succeeds {
            let error = self
                .config
                .send_error
                .clone()
                .unwrap_or_else(|| "Mock posting failed".to_string());
            return self.tag(DispatchResult::failure(
                self.config.platform,
                self.config.error_kind,
                error,
            ));
        }

        lock(&self.config.sent_content).push(text.to_string());
        let id = self.next_message_id(sequence);
        self.tag(DispatchResult::success(self.config.platform, Some(id)))
    }

    async fn delete_message(&self, id: &MessageId, locator: Option<&str>) -> DispatchResult {
        lock(&self.config.deleted).push((id.clone(), locator.map(str::to_string)));
        self.tag(DispatchResult::success(
            self.config.platform,
            Some(id.clone()),
        ))
    }
}

#[derive(Debug, Default)]
struct WireLog<T> {
    calls: Vec<T>,
    deletes: usize,
}

/// Recording stand-in for the Twitter API client
#[derive(Debug, Clone, Default)]
pub struct MockTwitterApi {
    log: Arc<Mutex<WireLog<String>>>,
    create_error: Option<PlatformError>,
    delete_error: Option<PlatformError>,
}

impl MockTwitterApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every create call fails with `error`
    pub fn failing(error: PlatformError) -> Self {
        Self {
            create_error: Some(error),
            ..Self::default()
        }
    }

    pub fn with_delete_error(mut self, error: PlatformError) -> Self {
        self.delete_error = Some(error);
        self
    }

    /// Text of every tweet created
    pub fn posted(&self) -> Vec<String> {
        lock(&self.log).calls.clone()
    }

    pub fn create_calls(&self) -> usize {
        lock(&self.log).calls.len()
    }

    pub fn delete_calls(&self) -> usize {
        lock(&self.log).deletes
    }
}

#[async_trait]
impl TwitterApi for MockTwitterApi {
    async fn create_tweet(&self, text: &str) -> Result<Tweet, PlatformError> {
        if let Some(error) = &self.create_error {
            return Err(error.clone());
        }

        let mut log = lock(&self.log);
        log.calls.push(text.to_string());
        Ok(Tweet {
            id: format!("{}", 1_800_000_000_000u64 + log.calls.len() as u64),
            text: text.to_string(),
        })
    }

    async fn delete_tweet(&self, _id: &str) -> Result<bool, PlatformError> {
        lock(&self.log).deletes += 1;
        match &self.delete_error {
            Some(error) => Err(error.clone()),
            None => Ok(true),
        }
    }
}

/// Recording stand-in for the VK API client
#[derive(Debug, Clone, Default)]
pub struct MockWallApi {
    log: Arc<Mutex<WireLog<(i64, String)>>>,
    post_error: Option<PlatformError>,
}

impl MockWallApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: PlatformError) -> Self {
        Self {
            post_error: Some(error),
            ..Self::default()
        }
    }

    /// `(owner_id, message)` of every post made
    pub fn posted(&self) -> Vec<(i64, String)> {
        lock(&self.log).calls.clone()
    }

    pub fn delete_calls(&self) -> usize {
        lock(&self.log).deletes
    }
}

#[async_trait]
impl WallApi for MockWallApi {
    async fn post(&self, owner_id: i64, message: &str) -> Result<i64, PlatformError> {
        if let Some(error) = &self.post_error {
            return Err(error.clone());
        }

        let mut log = lock(&self.log);
        log.calls.push((owner_id, message.to_string()));
        Ok(log.calls.len() as i64)
    }

    async fn delete(&self, _owner_id: i64, _post_id: i64) -> Result<(), PlatformError> {
        lock(&self.log).deletes += 1;
        Ok(())
    }
}

/// Recording stand-in for a Telegram client of either scheme
#[derive(Debug, Clone, Default)]
pub struct MockTelegramClient {
    posted: Arc<Mutex<Vec<String>>>,
    deleted: Arc<Mutex<Vec<(i64, Option<String>)>>>,
    send_error: Option<PlatformError>,
}

impl MockTelegramClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(error: PlatformError) -> Self {
        Self {
            send_error: Some(error),
            ..Self::default()
        }
    }

    pub fn posted(&self) -> Vec<String> {
        lock(&self.posted).clone()
    }

    /// `(message_id, locator)` of every delete call
    pub fn deleted(&self) -> Vec<(i64, Option<String>)> {
        lock(&self.deleted).clone()
    }
}

#[async_trait]
impl TelegramClient for MockTelegramClient {
    async fn send_message(&self, text: &str) -> Result<SentMessage, PlatformError> {
        if let Some(error) = &self.send_error {
            return Err(error.clone());
        }

        let mut posted = lock(&self.posted);
        posted.push(text.to_string());
        Ok(SentMessage {
            id: posted.len() as i64,
            chat_id: -1001234567890,
            date: chrono::Utc::now().timestamp(),
        })
    }

    async fn delete_message(&self, id: i64, locator: Option<&str>) -> Result<(), PlatformError> {
        lock(&self.deleted).push((id, locator.map(str::to_string)));
        Ok(())
    }
}

/// One recorded MTProto call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MtprotoCall {
    Send(String),
    DeleteChannel(Vec<i32>),
    DeleteMessages { ids: Vec<i32>, revoke: bool },
}

/// Scripted MTProto session whose every chat resolves to one entity
#[derive(Debug, Clone)]
pub struct MockMtprotoSession {
    entity: EntityFlags,
    resolve_error: Option<String>,
    deletes_nothing: bool,
    calls: Arc<Mutex<Vec<MtprotoCall>>>,
    resolved: Arc<Mutex<Vec<ChatLocator>>>,
}

impl MockMtprotoSession {
    pub fn new(entity: EntityFlags) -> Self {
        Self {
            entity,
            resolve_error: None,
            deletes_nothing: false,
            calls: Arc::new(Mutex::new(Vec::new())),
            resolved: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every resolution fails with `error`
    pub fn unresolvable(mut self, error: &str) -> Self {
        self.resolve_error = Some(error.to_string());
        self
    }

    /// Deletes succeed at the wire level but affect no messages
    pub fn deleting_nothing(mut self) -> Self {
        self.deletes_nothing = true;
        self
    }

    pub fn calls(&self) -> Vec<MtprotoCall> {
        lock(&self.calls).clone()
    }

    pub fn resolved(&self) -> Vec<ChatLocator> {
        lock(&self.resolved).clone()
    }

    fn affected(&self, ids: &[i32]) -> usize {
        if self.deletes_nothing {
            0
        } else {
            ids.len()
        }
    }
}

#[async_trait]
impl MtprotoSession for MockMtprotoSession {
    type Entity = EntityFlags;

    async fn resolve(&self, locator: &ChatLocator) -> Result<EntityFlags, PlatformError> {
        lock(&self.resolved).push(locator.clone());
        match &self.resolve_error {
            Some(error) => Err(PlatformError::EntityResolution(error.clone())),
            None => Ok(self.entity),
        }
    }

    fn flags(&self, entity: &EntityFlags) -> EntityFlags {
        *entity
    }

    async fn send(&self, _entity: &EntityFlags, text: &str) -> Result<SentMessage, PlatformError> {
        let mut calls = lock(&self.calls);
        calls.push(MtprotoCall::Send(text.to_string()));
        Ok(SentMessage {
            id: calls.len() as i64,
            chat_id: 1234567890,
            date: chrono::Utc::now().timestamp(),
        })
    }

    async fn delete_channel_messages(
        &self,
        _entity: &EntityFlags,
        ids: &[i32],
    ) -> Result<usize, PlatformError> {
        lock(&self.calls).push(MtprotoCall::DeleteChannel(ids.to_vec()));
        Ok(self.affected(ids))
    }

    async fn delete_messages(
        &self,
        _entity: &EntityFlags,
        ids: &[i32],
        revoke: bool,
    ) -> Result<usize, PlatformError> {
        lock(&self.calls).push(MtprotoCall::DeleteMessages {
            ids: ids.to_vec(),
            revoke,
        });
        Ok(self.affected(ids))
    }
}
