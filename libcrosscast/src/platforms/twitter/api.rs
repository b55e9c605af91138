//! Twitter API v2 client

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use super::oauth::OAuth1Signer;
use crate::error::PlatformError;
use crate::platforms::{error_for_status, http_client, map_transport_error};
use crate::types::PlatformId;

/// A created tweet
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
}

/// Wire operations the Twitter adapter needs
#[async_trait]
pub trait TwitterApi: Send + Sync {
    async fn create_tweet(&self, text: &str) -> Result<Tweet, PlatformError>;

    /// Returns whether the API reports the tweet as deleted
    async fn delete_tweet(&self, id: &str) -> Result<bool, PlatformError>;
}

/// How requests are authorized
pub enum TwitterAuth {
    /// OAuth 1.0a user context (can post)
    UserContext(OAuth1Signer),
    /// App-only bearer token (read-only)
    Bearer(SecretString),
}

/// reqwest-backed client for `api.twitter.com`
pub struct HttpTwitterApi {
    http: reqwest::Client,
    base_url: String,
    auth: TwitterAuth,
}

impl HttpTwitterApi {
    pub fn new(base_url: &str, auth: TwitterAuth) -> Result<Self, String> {
        Ok(Self {
            http: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    fn authorize(
        &self,
        request: reqwest::RequestBuilder,
        method: &str,
        url: &str,
    ) -> Result<reqwest::RequestBuilder, PlatformError> {
        match &self.auth {
            TwitterAuth::UserContext(signer) => {
                let header = signer.authorization_header(method, url, &[])?;
                Ok(request.header(reqwest::header::AUTHORIZATION, header))
            }
            TwitterAuth::Bearer(token) => Ok(request.bearer_auth(token.expose_secret())),
        }
    }

    fn require_user_context(&self, operation: &str) -> Result<(), PlatformError> {
        match self.auth {
            TwitterAuth::UserContext(_) => Ok(()),
            TwitterAuth::Bearer(_) => Err(PlatformError::Capability(format!(
                "Twitter app-only bearer tokens are read-only and cannot {}",
                operation
            ))),
        }
    }
}

#[async_trait]
impl TwitterApi for HttpTwitterApi {
    async fn create_tweet(&self, text: &str) -> Result<Tweet, PlatformError> {
        self.require_user_context("post")?;

        let url = format!("{}/2/tweets", self.base_url);
        tracing::debug!("POST {} ({} characters)", url, text.chars().count());

        let request = self.authorize(self.http.post(&url), "POST", &url)?;
        let response = request
            .json(&json!({ "text": text }))
            .send()
            .await
            .map_err(|e| map_transport_error(PlatformId::Twitter, e, "create tweet"))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(PlatformId::Twitter, e, "create tweet"))?;

        parse_create_response(status, &body)
    }

    async fn delete_tweet(&self, id: &str) -> Result<bool, PlatformError> {
        self.require_user_context("delete")?;

        let url = format!("{}/2/tweets/{}", self.base_url, urlencoding::encode(id));
        tracing::debug!("DELETE {}", url);

        let request = self.authorize(self.http.delete(&url), "DELETE", &url)?;
        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(PlatformId::Twitter, e, "delete tweet"))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(PlatformId::Twitter, e, "delete tweet"))?;

        parse_delete_response(status, &body)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<ApiProblem>,
    title: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiProblem {
    message: Option<String>,
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Deleted {
    deleted: bool,
}

/// Parse the `POST /2/tweets` response
pub fn parse_create_response(status: u16, body: &str) -> Result<Tweet, PlatformError> {
    let envelope = parse_envelope::<Tweet>(status, body, "create tweet")?;
    envelope.data.ok_or_else(|| {
        PlatformError::Posting(format!(
            "Twitter response missing tweet data: {}",
            problem_detail(&envelope.errors, &envelope.title, &envelope.detail, body)
        ))
    })
}

/// Parse the `DELETE /2/tweets/:id` response
pub fn parse_delete_response(status: u16, body: &str) -> Result<bool, PlatformError> {
    let envelope = parse_envelope::<Deleted>(status, body, "delete tweet")?;
    Ok(envelope.data.map(|d| d.deleted).unwrap_or(false))
}

fn parse_envelope<T>(status: u16, body: &str, context: &str) -> Result<Envelope<T>, PlatformError>
where
    T: for<'de> Deserialize<'de>,
{
    let parsed = serde_json::from_str::<Envelope<T>>(body);

    if !(200..300).contains(&status) {
        let detail = match &parsed {
            Ok(env) => problem_detail(&env.errors, &env.title, &env.detail, body),
            Err(_) => truncate(body),
        };
        return Err(error_for_status(PlatformId::Twitter, status, &detail, context));
    }

    parsed.map_err(|e| {
        PlatformError::Posting(format!(
            "Twitter returned an unreadable response ({}): {}",
            context, e
        ))
    })
}

fn problem_detail(
    errors: &[ApiProblem],
    title: &Option<String>,
    detail: &Option<String>,
    body: &str,
) -> String {
    if let Some(detail) = detail {
        return detail.clone();
    }
    if let Some(first) = errors.first() {
        if let Some(msg) = first.message.as_ref().or(first.detail.as_ref()) {
            return msg.clone();
        }
    }
    if let Some(title) = title {
        return title.clone();
    }
    truncate(body)
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() <= MAX {
        body.to_string()
    } else {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    }
}
