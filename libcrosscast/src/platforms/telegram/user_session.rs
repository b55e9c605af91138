//! MTProto user-session client (`user_session` scheme)
//!
//! Deleting a message as a user depends on what kind of conversation holds
//! it. Channels and megagroups number messages per channel and need the
//! channel-scoped delete; basic groups and direct chats share the account's
//! message numbering and use the message-scoped delete, revoked for everyone.

use async_trait::async_trait;

use super::{ChatLocator, SentMessage, TelegramClient};
use crate::error::PlatformError;

/// Raw flags of a resolved Telegram entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityFlags {
    /// The entity is a channel object (broadcast channel or megagroup)
    pub channel: bool,
    pub broadcast: bool,
    pub megagroup: bool,
    /// The entity is a basic group
    pub group: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationKind {
    BroadcastChannel,
    Supergroup,
    Group,
    Direct,
}

impl ConversationKind {
    pub fn classify(flags: EntityFlags) -> Self {
        if flags.megagroup {
            ConversationKind::Supergroup
        } else if flags.channel || flags.broadcast {
            ConversationKind::BroadcastChannel
        } else if flags.group {
            ConversationKind::Group
        } else {
            ConversationKind::Direct
        }
    }
}

/// The underlying delete call to issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOperation {
    /// `channels.deleteMessages`
    ChannelScoped,
    /// `messages.deleteMessages`
    MessageScoped { revoke: bool },
}

impl DeleteOperation {
    pub fn for_kind(kind: ConversationKind) -> Self {
        match kind {
            ConversationKind::BroadcastChannel | ConversationKind::Supergroup => {
                DeleteOperation::ChannelScoped
            }
            ConversationKind::Group | ConversationKind::Direct => {
                DeleteOperation::MessageScoped { revoke: true }
            }
        }
    }
}

/// The MTProto calls the user-session client is built on
#[async_trait]
pub trait MtprotoSession: Send + Sync {
    type Entity: Send + Sync;

    async fn resolve(&self, locator: &ChatLocator) -> Result<Self::Entity, PlatformError>;

    fn flags(&self, entity: &Self::Entity) -> EntityFlags;

    async fn send(&self, entity: &Self::Entity, text: &str) -> Result<SentMessage, PlatformError>;

    /// Returns the number of messages deleted
    async fn delete_channel_messages(
        &self,
        entity: &Self::Entity,
        ids: &[i32],
    ) -> Result<usize, PlatformError>;

    /// Returns the number of messages deleted
    async fn delete_messages(
        &self,
        entity: &Self::Entity,
        ids: &[i32],
        revoke: bool,
    ) -> Result<usize, PlatformError>;
}

/// Posts as a logged-in user to one target chat
pub struct UserSessionClient<S> {
    session: S,
    target: ChatLocator,
}

impl<S: MtprotoSession> UserSessionClient<S> {
    pub fn new(session: S, target: ChatLocator) -> Self {
        Self { session, target }
    }

    pub fn session(&self) -> &S {
        &self.session
    }
}

#[async_trait]
impl<S: MtprotoSession> TelegramClient for UserSessionClient<S> {
    async fn send_message(&self, text: &str) -> Result<SentMessage, PlatformError> {
        let entity = self.session.resolve(&self.target).await?;
        self.session.send(&entity, text).await
    }

    async fn delete_message(&self, id: i64, locator: Option<&str>) -> Result<(), PlatformError> {
        let target = locator
            .map(ChatLocator::parse)
            .unwrap_or_else(|| self.target.clone());
        let id = i32::try_from(id).map_err(|_| {
            PlatformError::Validation(format!("Telegram message id {} is out of range", id))
        })?;

        let entity = self.session.resolve(&target).await?;
        let kind = ConversationKind::classify(self.session.flags(&entity));
        let operation = DeleteOperation::for_kind(kind);
        tracing::debug!("Deleting message {} in {:?} chat via {:?}", id, kind, operation);

        let deleted = match operation {
            DeleteOperation::ChannelScoped => {
                self.session.delete_channel_messages(&entity, &[id]).await?
            }
            DeleteOperation::MessageScoped { revoke } => {
                self.session.delete_messages(&entity, &[id], revoke).await?
            }
        };

        if deleted == 0 {
            return Err(PlatformError::Posting(format!(
                "Telegram deleted nothing for message {} (already gone or not yours)",
                id
            )));
        }

        Ok(())
    }
}
