//! Google Drive v3 artifact store.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use super::{ArtifactStore, StoreError, StoredArtifact};

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const DEFAULT_API_BASE: &str = "https://www.googleapis.com/";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, createdTime)";
/// Refresh this long before the reported expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, StoreError>;
}

/// Fixed bearer token, for tests and pre-issued credentials.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, StoreError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// OAuth2 JWT-bearer grant for a service account key file.
pub struct ServiceAccountTokenSource {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(key: ServiceAccountKey, http: reqwest::Client) -> Result<Self, StoreError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| StoreError::Auth(format!("invalid service account private key: {}", e)))?;
        Ok(Self {
            key,
            encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    pub async fn from_file(path: &Path, http: reqwest::Client) -> Result<Self, StoreError> {
        let raw = tokio::fs::read(path).await?;
        let key: ServiceAccountKey = serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Auth(format!("cannot parse {}: {}", path.display(), e)))?;
        Self::new(key, http)
    }

    fn assertion(&self) -> Result<String, StoreError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: DRIVE_SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| StoreError::Auth(format!("failed to sign token request: {}", e)))
    }

    async fn fetch(&self) -> Result<TokenResponse, StoreError> {
        let assertion = self.assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Auth(format!("token endpoint returned {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("token response: {}", e)))
    }
}

#[async_trait]
impl TokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        debug!("Fetched Drive access token valid for {}s", fresh.expires_in);
        *cached = Some(CachedToken {
            value: fresh.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<StoredArtifact>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Serialize)]
struct FileMetadata<'a> {
    name: &'a str,
    parents: [&'a str; 1],
}

pub struct DriveClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    api_base: Url,
}

impl DriveClient {
    /// `http` should carry request timeouts; a stalled call would otherwise
    /// hold a worker and the pod's in-flight claim indefinitely.
    pub fn new(tokens: Arc<dyn TokenSource>, http: reqwest::Client) -> Result<Self, StoreError> {
        Self::with_base_url(tokens, DEFAULT_API_BASE, http)
    }

    /// Points the client at a different API host, used for the upload
    /// endpoint as well.
    pub fn with_base_url(
        tokens: Arc<dyn TokenSource>,
        base: &str,
        http: reqwest::Client,
    ) -> Result<Self, StoreError> {
        let api_base = Url::parse(base)
            .map_err(|e| StoreError::Decode(format!("invalid Drive base URL {}: {}", base, e)))?;
        Ok(Self {
            http,
            tokens,
            api_base,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, StoreError> {
        self.api_base
            .join(path)
            .map_err(|e| StoreError::Decode(format!("invalid Drive endpoint {}: {}", path, e)))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(StoreError::Server {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(StoreError::Client {
                status: status.as_u16(),
                body,
            })
        }
    }

    /// Opens a resumable upload session and returns its URI.
    async fn start_session(&self, token: &str, name: &str, folder_id: &str) -> Result<String, StoreError> {
        let mut url = self.endpoint("upload/drive/v3/files")?;
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("fields", "id");

        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("X-Upload-Content-Type", "application/gzip")
            .json(&FileMetadata {
                name,
                parents: [folder_id],
            })
            .send()
            .await?;
        let response = Self::check(response).await?;

        response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| StoreError::Decode("resumable session has no Location header".to_string()))
    }
}

#[async_trait]
impl ArtifactStore for DriveClient {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<StoredArtifact>, StoreError> {
        let token = self.tokens.access_token().await?;
        let query = format!("'{}' in parents", folder_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.endpoint("drive/v3/files")?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("q", &query).append_pair("fields", LIST_FIELDS);
                if let Some(page) = &page_token {
                    pairs.append_pair("pageToken", page);
                }
            }

            let response = self.http.get(url).bearer_auth(&token).send().await?;
            let page: FileList = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Decode(format!("file list: {}", e)))?;

            files.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        Ok(files)
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), StoreError> {
        let token = self.tokens.access_token().await?;
        let url = self.endpoint(&format!("drive/v3/files/{}", file_id))?;
        let response = self.http.delete(url).bearer_auth(&token).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn create_file(&self, path: &Path, name: &str, folder_id: &str) -> Result<String, StoreError> {
        let token = self.tokens.access_token().await?;
        let session = self.start_session(&token, name, folder_id).await?;

        let body = tokio::fs::read(path).await?;
        let response = self
            .http
            .put(&session)
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/gzip")
            .body(body)
            .send()
            .await?;

        let created: CreatedFile = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("upload response: {}", e)))?;
        Ok(created.id)
    }
}
