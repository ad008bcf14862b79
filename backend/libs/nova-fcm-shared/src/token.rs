use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use push_credentials::{Credential, CredentialSource, RenewalFailure, RenewalOutcome};
use std::fmt;
use tracing::debug;

use crate::errors::FCMError;
use crate::models::{GoogleTokenResponse, JwtClaims, ServiceAccountKey};

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
pub const FIREBASE_MESSAGING_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Longest error-body excerpt kept in [`FCMError::TokenRequestFailed`]
const MAX_ERROR_BODY: usize = 512;

/// OAuth2 bearer token for the FCM HTTP v1 API
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    token_type: String,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            token_type: token_type.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn token_type(&self) -> &str {
        &self.token_type
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Exchanges a signed service-account assertion for a short-lived access token
///
/// Each renewal signs a fresh RS256 JWT and posts it to the key's `token_uri`
/// using the `jwt-bearer` grant. The refresh manager decides when to call it.
pub struct OAuth2TokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http_client: reqwest::Client,
    scope: String,
    assertion_lifetime: Duration,
    name: String,
}

impl OAuth2TokenSource {
    /// Create a token source from a service account key
    ///
    /// Fails if the private key is not a valid RSA PEM.
    pub fn new(key: ServiceAccountKey) -> Result<Self, FCMError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| FCMError::KeyParseError(e.to_string()))?;
        let name = format!("fcm:{}", key.project_id);

        Ok(Self {
            key,
            encoding_key,
            http_client: reqwest::Client::new(),
            scope: CLOUD_PLATFORM_SCOPE.to_string(),
            assertion_lifetime: Duration::hours(1),
            name,
        })
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = client;
        self
    }

    pub fn service_account(&self) -> &ServiceAccountKey {
        &self.key
    }

    fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, FCMError> {
        let claims = JwtClaims {
            iss: self.key.client_email.clone(),
            sub: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + self.assertion_lifetime).timestamp(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key.private_key_id.clone());

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| FCMError::JwtEncodeError(e.to_string()))
    }

    /// Fetch a new access token from the token endpoint
    pub async fn fetch_token(&self) -> Result<Credential<AccessToken>, FCMError> {
        let requested_at = Utc::now();
        let assertion = self.sign_assertion(requested_at)?;

        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())];

        let response = self
            .http_client
            .post(&self.key.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| FCMError::TokenError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FCMError::TokenError(e.to_string()))?;

        if !status.is_success() {
            return Err(FCMError::TokenRequestFailed {
                status: status.as_u16(),
                body: excerpt(&body, MAX_ERROR_BODY),
            });
        }

        let token: GoogleTokenResponse =
            serde_json::from_str(&body).map_err(|e| FCMError::TokenParseError(e.to_string()))?;

        if token.access_token.is_empty() {
            return Err(FCMError::TokenParseError("empty access_token".to_string()));
        }
        if token.expires_in <= 0 {
            return Err(FCMError::TokenParseError(format!(
                "non-positive expires_in: {}",
                token.expires_in
            )));
        }

        // Counted from before the request, never after.
        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| requested_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                FCMError::TokenParseError(format!("expires_in out of range: {}", token.expires_in))
            })?;

        debug!(
            source = %self.name,
            expires_in = token.expires_in,
            "Obtained FCM access token"
        );

        Ok(Credential::with_issued_at(
            AccessToken::new(token.access_token, token.token_type),
            expires_at,
            requested_at,
        ))
    }
}

/// Truncate `body` to at most `max` bytes on a char boundary
fn excerpt(body: &str, max: usize) -> String {
    if body.len() <= max {
        return body.to_string();
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[async_trait]
impl CredentialSource for OAuth2TokenSource {
    type Secret = AccessToken;

    fn name(&self) -> &str {
        &self.name
    }

    async fn renew(&self) -> RenewalOutcome<AccessToken> {
        self.fetch_token().await.map_err(RenewalFailure::from).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("ya29.secret", "Bearer");

        assert_eq!(token.authorization_header(), "Bearer ya29.secret");
        assert!(!format!("{:?}", token).contains("ya29"));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("short", 512), "short");

        let body = "é".repeat(400);
        let cut = excerpt(&body, 511);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.len(), 510 + 3);
    }

    #[test]
    fn test_invalid_private_key_rejected_at_construction() {
        let key = ServiceAccountKey {
            project_id: "nova-test".to_string(),
            private_key_id: "key-id".to_string(),
            private_key: "not a key".to_string(),
            client_email: "push@nova-test.iam.gserviceaccount.com".to_string(),
            client_id: String::new(),
            auth_uri: String::new(),
            token_uri: crate::models::DEFAULT_TOKEN_URI.to_string(),
        };

        assert!(matches!(
            OAuth2TokenSource::new(key),
            Err(FCMError::KeyParseError(_))
        ));
    }
}
