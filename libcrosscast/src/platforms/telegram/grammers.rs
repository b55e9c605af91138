//! MTProto binding for the `user_session` scheme, built on grammers

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use grammers_client::types::Chat;
use grammers_client::{Client, Config as ClientConfig, InitParams, SignInError};
use grammers_session::Session;
use grammers_tl_types as tl;
use secrecy::{ExposeSecret, SecretString};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use super::user_session::{EntityFlags, MtprotoSession};
use super::{bare_chat_id, ChatLocator, SentMessage};
use crate::error::PlatformError;
use crate::session::SessionStore;

/// A connected, authorized grammers client
pub struct GrammersSession {
    client: Client,
}

impl GrammersSession {
    /// Connect with the stored session, logging in interactively if needed
    ///
    /// The session is saved to `store` exactly once, after a fresh login.
    pub async fn connect(
        api_id: i32,
        api_hash: SecretString,
        phone: &str,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, String> {
        let session = match store.load().map_err(|e| e.to_string())? {
            Some(encoded) => {
                let bytes = STANDARD
                    .decode(encoded.as_bytes())
                    .map_err(|e| format!("Stored Telegram session is not valid base64: {}", e))?;
                Session::load(&bytes)
                    .map_err(|e| format!("Stored Telegram session is unreadable: {}", e))?
            }
            None => Session::new(),
        };

        let client = Client::connect(ClientConfig {
            session,
            api_id,
            api_hash: api_hash.expose_secret().to_string(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| format!("Failed to connect to Telegram: {}", e))?;

        let authorized = client
            .is_authorized()
            .await
            .map_err(|e| format!("Failed to check Telegram authorization: {}", e))?;

        if !authorized {
            tracing::info!("No Telegram session stored, starting interactive login");
            login(&client, phone).await?;

            let encoded = STANDARD.encode(client.session().save());
            store.save(&encoded).map_err(|e| e.to_string())?;
            tracing::info!("Telegram session saved");
        }

        Ok(Self { client })
    }
}

async fn login(client: &Client, phone: &str) -> Result<(), String> {
    let token = client
        .request_login_code(phone)
        .await
        .map_err(|e| format!("Failed to request Telegram login code: {}", e))?;

    let code = prompt("Enter the code Telegram sent you: ")?;

    match client.sign_in(&token, &code).await {
        Ok(_) => Ok(()),
        Err(SignInError::PasswordRequired(password_token)) => {
            let password = rpassword::prompt_password("Two-step verification password: ")
                .map_err(|e| format!("Failed to read password: {}", e))?;
            client
                .check_password(password_token, password.trim())
                .await
                .map(|_| ())
                .map_err(|e| format!("Telegram rejected the password: {}", e))
        }
        Err(e) => Err(format!("Telegram sign-in failed: {}", e)),
    }
}

fn prompt(message: &str) -> Result<String, String> {
    let mut stderr = io::stderr();
    write!(stderr, "{}", message).map_err(|e| e.to_string())?;
    stderr.flush().map_err(|e| e.to_string())?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("Failed to read from stdin: {}", e))?;

    Ok(line.trim().to_string())
}

fn invocation_error(context: &str, error: impl std::fmt::Display) -> PlatformError {
    let detail = error.to_string();
    if detail.contains("FLOOD_WAIT") {
        PlatformError::RateLimit(format!("Telegram rate limit ({}): {}", context, detail))
    } else if detail.contains("AUTH_KEY") || detail.contains("SESSION_REVOKED") {
        PlatformError::Authentication(format!(
            "Telegram session is no longer valid ({}): {}",
            context, detail
        ))
    } else {
        PlatformError::Posting(format!("Telegram error ({}): {}", context, detail))
    }
}

#[async_trait]
impl MtprotoSession for GrammersSession {
    type Entity = Chat;

    async fn resolve(&self, locator: &ChatLocator) -> Result<Chat, PlatformError> {
        match locator {
            ChatLocator::Username(name) => self
                .client
                .resolve_username(name)
                .await
                .map_err(|e| {
                    PlatformError::EntityResolution(format!(
                        "Failed to resolve Telegram chat @{}: {}",
                        name, e
                    ))
                })?
                .ok_or_else(|| {
                    PlatformError::EntityResolution(format!("No Telegram chat named @{}", name))
                }),
            ChatLocator::Id(id) => {
                let bare = bare_chat_id(*id);

                let mut dialogs = self.client.iter_dialogs();
                while let Some(dialog) = dialogs.next().await.map_err(|e| {
                    PlatformError::EntityResolution(format!(
                        "Failed to list Telegram dialogs: {}",
                        e
                    ))
                })? {
                    if dialog.chat().id() == bare {
                        return Ok(dialog.chat().clone());
                    }
                }

                Err(PlatformError::EntityResolution(format!(
                    "Telegram chat {} is not among this account's dialogs",
                    id
                )))
            }
        }
    }

    fn flags(&self, entity: &Chat) -> EntityFlags {
        match entity {
            Chat::Channel(_) => EntityFlags {
                channel: true,
                broadcast: true,
                ..EntityFlags::default()
            },
            Chat::Group(group) if group.is_megagroup() => EntityFlags {
                channel: true,
                megagroup: true,
                ..EntityFlags::default()
            },
            Chat::Group(_) => EntityFlags {
                group: true,
                ..EntityFlags::default()
            },
            Chat::User(_) => EntityFlags::default(),
        }
    }

    async fn send(&self, entity: &Chat, text: &str) -> Result<SentMessage, PlatformError> {
        let message = self
            .client
            .send_message(entity.pack(), text)
            .await
            .map_err(|e| invocation_error("send message", e))?;

        Ok(SentMessage {
            id: i64::from(message.id()),
            chat_id: entity.id(),
            date: message.date().timestamp(),
        })
    }

    async fn delete_channel_messages(
        &self,
        entity: &Chat,
        ids: &[i32],
    ) -> Result<usize, PlatformError> {
        let channel = entity.pack().try_to_input_channel().ok_or_else(|| {
            PlatformError::EntityResolution(format!("Telegram chat {} is not a channel", entity.id()))
        })?;

        let affected = self
            .client
            .invoke(&tl::functions::channels::DeleteMessages {
                channel,
                id: ids.to_vec(),
            })
            .await
            .map_err(|e| invocation_error("channels.deleteMessages", e))?;

        let tl::enums::messages::AffectedMessages::Messages(affected) = affected;
        Ok(affected.pts_count as usize)
    }

    async fn delete_messages(
        &self,
        _entity: &Chat,
        ids: &[i32],
        revoke: bool,
    ) -> Result<usize, PlatformError> {
        let affected = self
            .client
            .invoke(&tl::functions::messages::DeleteMessages {
                revoke,
                id: ids.to_vec(),
            })
            .await
            .map_err(|e| invocation_error("messages.deleteMessages", e))?;

        let tl::enums::messages::AffectedMessages::Messages(affected) = affected;
        Ok(affected.pts_count as usize)
    }
}
