use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::FCMError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Firebase Service Account Key
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    /// Parse a service account key as downloaded from the Firebase console
    pub fn from_json(json: &str) -> Result<Self, FCMError> {
        let key: Self =
            serde_json::from_str(json).map_err(|e| FCMError::KeyFileError(e.to_string()))?;
        if key.client_email.is_empty() {
            return Err(FCMError::KeyFileError("client_email is empty".to_string()));
        }
        if key.private_key.is_empty() {
            return Err(FCMError::KeyFileError("private_key is empty".to_string()));
        }
        Ok(key)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FCMError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| FCMError::KeyFileError(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// JWT Claims for Google OAuth2
#[derive(Debug, Serialize)]
pub struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Google OAuth2 Token Response
#[derive(Debug, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}
