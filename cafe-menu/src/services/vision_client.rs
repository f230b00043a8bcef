//! Google Cloud Vision client
//!
//! One `images:annotate` call per image asking for label detection, object
//! localization and text detection. Two credential modes:
//! - API key (`?key=` query parameter)
//! - service account: an RS256-signed JWT is exchanged for an OAuth access
//!   token, which is reused until shortly before it expires

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::services::keyword_extractor::LabelSource;

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com";
pub const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const VISION_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const USER_AGENT: &str = concat!("cafe-menu/", env!("CARGO_PKG_VERSION"));
const MAX_LABELS: u32 = 20;
const MAX_OBJECTS: u32 = 10;
/// Refresh the access token this long before it expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Vision client errors
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

/// Credentials for the Vision API
#[derive(Clone)]
pub enum VisionCredentials {
    ApiKey(String),
    ServiceAccount {
        project_id: String,
        client_email: String,
        /// PEM-encoded RSA private key
        private_key: String,
    },
}

impl std::fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisionCredentials::ApiKey(_) => f.write_str("ApiKey(***)"),
            VisionCredentials::ServiceAccount {
                project_id,
                client_email,
                ..
            } => f
                .debug_struct("ServiceAccount")
                .field("project_id", project_id)
                .field("client_email", client_email)
                .finish_non_exhaustive(),
        }
    }
}

/// Resolved Vision settings
#[derive(Debug, Clone)]
pub struct VisionSettings {
    pub credentials: VisionCredentials,
    pub endpoint: String,
    pub token_url: String,
}

/// One label or object annotation
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub description: String,
    pub score: f32,
}

/// Everything one annotate call returned that the extractor uses
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    pub labels: Vec<Annotation>,
    pub objects: Vec<Annotation>,
    /// Full text detected on the image, if any
    pub text: Option<String>,
}

// ---- wire types ----

#[derive(Debug, Serialize)]
struct AnnotateRequest<'a> {
    requests: Vec<AnnotateImageRequest<'a>>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest<'a> {
    image: ImageContent,
    features: Vec<Feature<'a>>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(rename = "maxResults", skip_serializing_if = "Option::is_none")]
    max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    label_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    localized_object_annotations: Vec<LocalizedObjectAnnotation>,
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    #[serde(default)]
    error: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct LocalizedObjectAnnotation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
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
    token: String,
    expires_at: Instant,
}

/// Google Cloud Vision REST client
pub struct VisionClient {
    http_client: reqwest::Client,
    settings: VisionSettings,
    token: Mutex<Option<CachedToken>>,
}

impl VisionClient {
    pub fn new(settings: VisionSettings) -> Result<Self, VisionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| VisionError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            settings,
            token: Mutex::new(None),
        })
    }

    fn annotate_url(&self) -> String {
        let base = self.settings.endpoint.trim_end_matches('/');
        match &self.settings.credentials {
            VisionCredentials::ApiKey(_) => format!("{}/v1/images:annotate", base),
            VisionCredentials::ServiceAccount { project_id, .. } => {
                format!("{}/v1/projects/{}/images:annotate", base, project_id)
            }
        }
    }

    /// Obtain (or reuse) an OAuth access token for the service account
    async fn access_token(
        &self,
        client_email: &str,
        private_key: &str,
    ) -> Result<String, VisionError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_REFRESH_MARGIN < token.expires_at {
                return Ok(token.token.clone());
            }
        }

        let iat = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: client_email,
            scope: VISION_SCOPE,
            aud: &self.settings.token_url,
            iat,
            exp: iat + 3600,
        };

        let key = EncodingKey::from_rsa_pem(private_key.as_bytes())
            .map_err(|e| VisionError::AuthError(format!("Invalid private key: {}", e)))?;
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| VisionError::AuthError(format!("JWT signing failed: {}", e)))?;

        tracing::debug!("Requesting Vision access token");

        let response = self
            .http_client
            .post(&self.settings.token_url)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| VisionError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::AuthError(format!(
                "Token request failed ({}): {}",
                status.as_u16(),
                body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| VisionError::ParseError(e.to_string()))?;

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });

        Ok(token.access_token)
    }

    /// Annotate an image with labels, objects and text
    pub async fn annotate_image(&self, image: &[u8]) -> Result<Annotations, VisionError> {
        if image.is_empty() {
            return Err(VisionError::InvalidImage("empty image".to_string()));
        }

        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: general_purpose::STANDARD.encode(image),
                },
                features: vec![
                    Feature {
                        kind: "LABEL_DETECTION",
                        max_results: Some(MAX_LABELS),
                    },
                    Feature {
                        kind: "OBJECT_LOCALIZATION",
                        max_results: Some(MAX_OBJECTS),
                    },
                    Feature {
                        kind: "TEXT_DETECTION",
                        max_results: None,
                    },
                ],
            }],
        };

        let request = self.http_client.post(self.annotate_url()).json(&body);
        let request = match &self.settings.credentials {
            VisionCredentials::ApiKey(key) => request.query(&[("key", key.as_str())]),
            VisionCredentials::ServiceAccount {
                client_email,
                private_key,
                ..
            } => {
                let token = self.access_token(client_email, private_key).await?;
                request.bearer_auth(token)
            }
        };

        tracing::debug!(image_bytes = image.len(), "Querying Vision API");

        let response = request
            .send()
            .await
            .map_err(|e| VisionError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::AuthError(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VisionError::ApiError(status.as_u16(), body));
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| VisionError::ParseError(e.to_string()))?;

        let annotations = into_annotations(parsed)?;

        tracing::info!(
            labels = annotations.labels.len(),
            objects = annotations.objects.len(),
            has_text = annotations.text.is_some(),
            "Vision annotation successful"
        );

        Ok(annotations)
    }
}

fn into_annotations(parsed: AnnotateResponse) -> Result<Annotations, VisionError> {
    let first = parsed.responses.into_iter().next().unwrap_or_default();

    if let Some(err) = first.error {
        return Err(VisionError::ApiError(err.code, err.message));
    }

    let labels = first
        .label_annotations
        .into_iter()
        .filter(|l| !l.description.trim().is_empty())
        .map(|l| Annotation {
            description: l.description,
            score: l.score,
        })
        .collect();

    let objects = first
        .localized_object_annotations
        .into_iter()
        .filter(|o| !o.name.trim().is_empty())
        .map(|o| Annotation {
            description: o.name,
            score: o.score,
        })
        .collect();

    // the first text annotation holds the full detected text
    let text = first
        .text_annotations
        .into_iter()
        .next()
        .map(|t| t.description)
        .filter(|t| !t.trim().is_empty());

    Ok(Annotations {
        labels,
        objects,
        text,
    })
}

#[async_trait]
impl LabelSource for VisionClient {
    fn source_id(&self) -> &'static str {
        "google-vision"
    }

    async fn annotate(&self, image: &[u8]) -> Result<Annotations, VisionError> {
        self.annotate_image(image).await
    }
}
