//! VK wall platform implementation
//!
//! Posts to a user or community wall through the VK API (`wall.post`). A
//! negative owner id addresses a community, in which case the post is made on
//! behalf of the community.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::credentials::{CredentialResolver, CredentialSet, SchemeSpec};
use crate::error::PlatformError;
use crate::platforms::{error_for_status, http_client, map_transport_error, not_configured, Platform};
use crate::types::{DispatchResult, ErrorKind, MessageId, PlatformId, ValidationResult};

pub const DEFAULT_API_URL: &str = "https://api.vk.com/method";
pub const API_VERSION: &str = "5.199";

pub const ACCESS_TOKEN: &str = "VK_ACCESS_TOKEN";
pub const OWNER_ID: &str = "VK_OWNER_ID";

pub const ENV_KEYS: &[&str] = &[ACCESS_TOKEN, OWNER_ID];

/// The only VK credential scheme
pub const SCHEME: &str = "access_token";

pub const SCHEMES: &[SchemeSpec] =
    &[SchemeSpec::new(SCHEME, &[ACCESS_TOKEN, OWNER_ID]).with_numeric(&[OWNER_ID])];

/// Wire operations the VK adapter needs
#[async_trait]
pub trait WallApi: Send + Sync {
    /// Publish a wall post and return its post id
    async fn post(&self, owner_id: i64, message: &str) -> Result<i64, PlatformError>;

    async fn delete(&self, owner_id: i64, post_id: i64) -> Result<(), PlatformError>;
}

/// reqwest-backed VK API client
pub struct HttpWallApi {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl HttpWallApi {
    pub fn new(base_url: &str, token: SecretString) -> Result<Self, String> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn call<T>(&self, method: &str, params: &[(&str, String)]) -> Result<T, PlatformError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, method);
        tracing::debug!("POST {}", url);

        let mut form: Vec<(&str, String)> = params.to_vec();
        form.push(("access_token", self.token.expose_secret().to_string()));
        form.push(("v", API_VERSION.to_string()));

        let response = self
            .http
            .post(&url)
            .form(&form)
            .send()
            .await
            .map_err(|e| map_transport_error(PlatformId::Vk, e, method))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(PlatformId::Vk, e, method))?;

        parse_response(status, &body, method)
    }
}

#[derive(Debug, Deserialize)]
struct PostResponse {
    post_id: i64,
}

#[async_trait]
impl WallApi for HttpWallApi {
    async fn post(&self, owner_id: i64, message: &str) -> Result<i64, PlatformError> {
        let mut params = vec![
            ("owner_id", owner_id.to_string()),
            ("message", message.to_string()),
        ];
        if owner_id < 0 {
            params.push(("from_group", "1".to_string()));
        }

        let response: PostResponse = self.call("wall.post", &params).await?;
        Ok(response.post_id)
    }

    async fn delete(&self, owner_id: i64, post_id: i64) -> Result<(), PlatformError> {
        let params = vec![
            ("owner_id", owner_id.to_string()),
            ("post_id", post_id.to_string()),
        ];

        let deleted: i64 = self.call("wall.delete", &params).await?;
        if deleted == 1 {
            Ok(())
        } else {
            Err(PlatformError::Posting(format!(
                "VK did not delete post {} (response {})",
                post_id, deleted
            )))
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error_code: i64,
    error_msg: String,
}

/// Parse a VK API response envelope
///
/// VK reports most failures with HTTP 200 and an `error` object.
pub fn parse_response<T>(status: u16, body: &str, method: &str) -> Result<T, PlatformError>
where
    T: for<'de> Deserialize<'de>,
{
    if !(200..300).contains(&status) {
        return Err(error_for_status(PlatformId::Vk, status, body, method));
    }

    let envelope: Envelope<T> = serde_json::from_str(body).map_err(|e| {
        PlatformError::Posting(format!("VK returned an unreadable response ({}): {}", method, e))
    })?;

    if let Some(error) = envelope.error {
        return Err(map_vk_error(error.error_code, &error.error_msg, method));
    }

    envelope.response.ok_or_else(|| {
        PlatformError::Posting(format!("VK response to {} had no result", method))
    })
}

/// Map VK API error codes to PlatformError
fn map_vk_error(code: i64, message: &str, method: &str) -> PlatformError {
    match code {
        5 | 27 | 28 => PlatformError::Authentication(format!(
            "VK authorization failed ({}): [{}] {}. Check VK_ACCESS_TOKEN.",
            method, code, message
        )),
        6 | 9 | 29 => PlatformError::RateLimit(format!(
            "VK rate limit ({}): [{}] {}",
            method, code, message
        )),
        _ => PlatformError::Posting(format!("VK error ({}): [{}] {}", method, code, message)),
    }
}

/// Public URL of a wall post
pub fn post_url(owner_id: i64, post_id: i64) -> String {
    format!("https://vk.com/wall{}_{}", owner_id, post_id)
}

/// VK platform client
pub struct VkPlatform {
    validation: ValidationResult,
    owner_id: Option<i64>,
    client: Option<Box<dyn WallApi>>,
    init_error: Option<String>,
}

impl VkPlatform {
    pub fn from_config(config: &Config) -> Self {
        let base_url = config.endpoints.vk.clone();
        Self::build(config.vk.clone(), |creds| {
            HttpWallApi::new(&base_url, SecretString::from(creds.get(ACCESS_TOKEN).to_string()))
                .map(|api| Box::new(api) as Box<dyn WallApi>)
        })
    }

    pub fn with_client(credentials: CredentialSet, client: Box<dyn WallApi>) -> Self {
        Self::build(credentials, move |_| Ok(client))
    }

    fn build<F>(credentials: CredentialSet, make_client: F) -> Self
    where
        F: FnOnce(&CredentialSet) -> Result<Box<dyn WallApi>, String>,
    {
        let resolver = CredentialResolver::new(PlatformId::Vk, SCHEMES, credentials);
        let validation = resolver.validate();

        let owner_id = if validation.is_valid() {
            resolver.credentials().get(OWNER_ID).parse::<i64>().ok()
        } else {
            None
        };

        let (client, init_error) = match owner_id {
            Some(_) => match make_client(resolver.credentials()) {
                Ok(client) => (Some(client), None),
                Err(e) => (None, Some(e)),
            },
            None => (None, None),
        };

        Self {
            validation,
            owner_id,
            client,
            init_error,
        }
    }

    pub fn owner_id(&self) -> Option<i64> {
        self.owner_id
    }

    fn ready(&self) -> Result<(i64, &dyn WallApi), DispatchResult> {
        match (self.owner_id, self.client.as_deref()) {
            (Some(owner_id), Some(client)) => Ok((owner_id, client)),
            _ => Err(not_configured(PlatformId::Vk, &self.configuration_errors())),
        }
    }
}

#[async_trait]
impl Platform for VkPlatform {
    fn id(&self) -> PlatformId {
        PlatformId::Vk
    }

    fn is_configured(&self) -> bool {
        self.validation.is_valid() && self.client.is_some()
    }

    fn configuration_errors(&self) -> Vec<String> {
        let mut errors = self.validation.errors().to_vec();
        if let Some(e) = &self.init_error {
            errors.push(format!("VK client failed to initialize: {}", e));
        }
        errors
    }

    fn active_method(&self) -> Option<&'static str> {
        self.owner_id.map(|_| SCHEME)
    }

    async fn send(&self, text: &str) -> DispatchResult {
        let (owner_id, client) = match self.ready() {
            Ok(ready) => ready,
            Err(result) => return result,
        };

        match client.post(owner_id, text).await {
            Ok(post_id) => {
                info!("Posted to VK wall {}: {}", owner_id, post_id);
                DispatchResult::success(PlatformId::Vk, Some(MessageId::Int(post_id)))
                    .with_extra("owner_id", owner_id)
                    .with_extra("url", post_url(owner_id, post_id))
            }
            Err(e) => {
                warn!("Failed to post to VK: {}", e);
                DispatchResult::from_error(PlatformId::Vk, &e)
            }
        }
    }

    async fn delete_message(&self, id: &MessageId, _locator: Option<&str>) -> DispatchResult {
        let (owner_id, client) = match self.ready() {
            Ok(ready) => ready,
            Err(result) => return result,
        };

        let Some(post_id) = id.as_i64() else {
            return DispatchResult::failure(
                PlatformId::Vk,
                ErrorKind::Validation,
                format!("VK post ids are integers, got '{}'", id),
            );
        };

        match client.delete(owner_id, post_id).await {
            Ok(()) => {
                info!("Deleted VK post {}_{}", owner_id, post_id);
                DispatchResult::success(PlatformId::Vk, Some(MessageId::Int(post_id)))
                    .with_extra("owner_id", owner_id)
            }
            Err(e) => DispatchResult::from_error(PlatformId::Vk, &e),
        }
    }
}
