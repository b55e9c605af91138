//! OAuth 1.0a request signing (HMAC-SHA1)
//!
//! Twitter's user-context endpoints accept OAuth 1.0a signatures. Both the
//! `oauth2` (client id/secret) and `oauth1` (API key/secret) schemes sign with
//! their consumer pair plus the shared access-token pair.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;

use crate::error::PlatformError;

type HmacSha1 = Hmac<Sha1>;

/// Signs requests on behalf of one user
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: SecretString,
    token: String,
    token_secret: SecretString,
}

impl OAuth1Signer {
    pub fn new(
        consumer_key: String,
        consumer_secret: SecretString,
        token: String,
        token_secret: SecretString,
    ) -> Self {
        Self {
            consumer_key,
            consumer_secret,
            token,
            token_secret,
        }
    }

    /// `Authorization` header value with a fresh nonce and timestamp
    ///
    /// `params` are the query/form parameters that take part in the
    /// signature. JSON bodies do not.
    pub fn authorization_header(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String, PlatformError> {
        let nonce: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let timestamp = chrono::Utc::now().timestamp().to_string();

        self.header_with(method, url, params, &nonce, &timestamp)
    }

    /// Header value for a fixed nonce and timestamp
    pub fn header_with(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, PlatformError> {
        let signature = self.signature(method, url, params, nonce, timestamp)?;

        let mut fields = self.oauth_params(nonce, timestamp);
        fields.push(("oauth_signature", signature.as_str()));

        let header = fields
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!("OAuth {}", header))
    }

    /// Base64 HMAC-SHA1 signature of the request
    pub fn signature(
        &self,
        method: &str,
        url: &str,
        params: &[(&str, &str)],
        nonce: &str,
        timestamp: &str,
    ) -> Result<String, PlatformError> {
        let mut pairs: Vec<(String, String)> = self
            .oauth_params(nonce, timestamp)
            .into_iter()
            .chain(params.iter().copied())
            .map(|(k, v)| (encode(k), encode(v)))
            .collect();
        pairs.sort();

        let parameter_string = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        let base = format!(
            "{}&{}&{}",
            method.to_uppercase(),
            encode(url),
            encode(&parameter_string)
        );
        let key = format!(
            "{}&{}",
            encode(self.consumer_secret.expose_secret()),
            encode(self.token_secret.expose_secret())
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| {
            PlatformError::Authentication(format!("Failed to initialize OAuth signer: {}", e))
        })?;
        mac.update(base.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    fn oauth_params<'a>(&'a self, nonce: &'a str, timestamp: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", "1.0"),
        ]
    }
}

/// RFC 3986 percent-encoding (unreserved characters pass through)
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
