use crate::config::ProviderConfig;
use crate::core::{DeleteFilesResult, TransferUnit, UploadApi, UploadFileResult};
use crate::domain::model::{UploadFailure, UploadedFileData};
use crate::utils::error::{ProviderError, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const API_KEY_HEADER: &str = "x-uploadthing-api-key";
pub const VERSION_HEADER: &str = "x-uploadthing-version";
pub const UPLOADTHING_VERSION: &str = "7.7.4";

const FALLBACK_MIME: &str = "application/octet-stream";

/// Decoded form of the base64 `UPLOADTHING_TOKEN`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadThingToken {
    pub api_key: String,
    pub app_id: String,
    #[serde(default)]
    pub regions: Vec<String>,
}

impl UploadThingToken {
    pub fn decode(raw: &str) -> Result<Self> {
        let raw = raw.trim().trim_matches('\'').trim_matches('"');
        let decoded = STANDARD
            .decode(raw)
            .or_else(|_| URL_SAFE_NO_PAD.decode(raw.trim_end_matches('=')))
            .map_err(|e| ProviderError::InvalidToken {
                message: format!("token is not valid base64: {}", e),
            })?;

        let token: UploadThingToken =
            serde_json::from_slice(&decoded).map_err(|e| ProviderError::InvalidToken {
                message: format!("token payload is not valid JSON: {}", e),
            })?;

        if token.api_key.is_empty() {
            return Err(ProviderError::InvalidToken {
                message: "token has an empty apiKey".to_string(),
            });
        }
        Ok(token)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrepareUploadRequest<'a> {
    file_name: &'a str,
    file_size: usize,
    file_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct PreparedUpload {
    key: String,
    url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    ufs_url: Option<String>,
    url: Option<String>,
    app_url: Option<String>,
    file_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteFilesRequest<'a> {
    file_keys: &'a [String],
}

/// HTTP client for the UploadThing REST API.
///
/// The token is kept as given and decoded per request, so a missing or
/// malformed token is reported by the first call rather than at construction.
#[derive(Clone)]
pub struct UtApi {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for UtApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UtApi")
            .field("api_url", &self.api_url)
            .field("has_token", &self.token.is_some())
            .finish()
    }
}

impl UtApi {
    pub fn new(config: &ProviderConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            api_url: config.api_url().trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn token(&self) -> Result<UploadThingToken> {
        let raw = self
            .token
            .as_deref()
            .ok_or_else(|| ProviderError::InvalidToken {
                message: format!(
                    "no token configured; pass one explicitly or set {}",
                    crate::config::TOKEN_ENV
                ),
            })?;
        UploadThingToken::decode(raw)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, token: &UploadThingToken, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &token.api_key)
            .header(VERSION_HEADER, UPLOADTHING_VERSION)
            .json(body)
            .send()
            .await?;

        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    async fn upload_one(
        &self,
        token: &UploadThingToken,
        unit: TransferUnit,
    ) -> Result<UploadFileResult> {
        let size = unit.size();
        let mime = if unit.mime.trim().is_empty() {
            FALLBACK_MIME.to_string()
        } else {
            unit.mime.clone()
        };

        // the part is built before prepareUpload so a bad MIME never reserves a key
        let part = Part::stream_with_length(Body::from(unit.data), size as u64)
            .file_name(unit.name.clone())
            .mime_str(&mime)
            .map_err(|_| ProviderError::InvalidMime { mime: mime.clone() })?;
        let form = Form::new().part("file", part);

        let prepared: PreparedUpload = self
            .post_json(
                "/v7/prepareUpload",
                token,
                &PrepareUploadRequest {
                    file_name: &unit.name,
                    file_size: size,
                    file_type: &mime,
                },
            )
            .await?;
        tracing::debug!("Prepared upload of {} as key {}", unit.name, prepared.key);

        let response = self
            .client
            .put(&prepared.url)
            .header(API_KEY_HEADER, &token.api_key)
            .header(VERSION_HEADER, UPLOADTHING_VERSION)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;
        let ingest: IngestResponse = response.json().await?;

        let Some(ufs_url) = ingest.ufs_url else {
            tracing::debug!("Ingest response for {} carried no ufsUrl", prepared.key);
            return Ok(UploadFileResult {
                data: None,
                error: Some(UploadFailure {
                    code: "UPLOAD_FAILED".to_string(),
                    message: "ingest response did not include ufsUrl".to_string(),
                }),
            });
        };

        Ok(UploadFileResult {
            data: Some(UploadedFileData {
                key: prepared.key,
                ufs_url,
                name: unit.name,
                size: size as u64,
                file_hash: ingest.file_hash,
                url: ingest.url,
                app_url: ingest.app_url,
            }),
            error: None,
        })
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::RemoteStatus {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl UploadApi for UtApi {
    async fn upload_files(&self, files: Vec<TransferUnit>) -> Result<Vec<UploadFileResult>> {
        let token = self.token()?;
        let mut results = Vec::with_capacity(files.len());
        for unit in files {
            results.push(self.upload_one(&token, unit).await?);
        }
        Ok(results)
    }

    async fn delete_files(&self, keys: &[String]) -> Result<DeleteFilesResult> {
        let token = self.token()?;
        self.post_json("/v6/deleteFiles", &token, &DeleteFilesRequest { file_keys: keys })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(json: serde_json::Value) -> String {
        STANDARD.encode(json.to_string())
    }

    #[test]
    fn test_decode_token() {
        let raw = encode(serde_json::json!({
            "apiKey": "sk_live_abc",
            "appId": "app1",
            "regions": ["sea1"]
        }));
        let token = UploadThingToken::decode(&raw).unwrap();
        assert_eq!(token.api_key, "sk_live_abc");
        assert_eq!(token.app_id, "app1");
        assert_eq!(token.regions, vec!["sea1".to_string()]);

        let quoted = format!("'{}'", raw);
        assert_eq!(UploadThingToken::decode(&quoted).unwrap(), token);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            UploadThingToken::decode("not base64 !!"),
            Err(ProviderError::InvalidToken { .. })
        ));

        let not_json = STANDARD.encode("plain text");
        assert!(matches!(
            UploadThingToken::decode(&not_json),
            Err(ProviderError::InvalidToken { .. })
        ));

        let empty_key = encode(serde_json::json!({ "apiKey": "", "appId": "app1" }));
        assert!(UploadThingToken::decode(&empty_key).is_err());
    }

    #[tokio::test]
    async fn test_missing_token_fails_on_first_call() {
        let api = UtApi::new(&ProviderConfig::default());
        let err = api.delete_files(&["k1".to_string()]).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidToken { .. }));
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let config = ProviderConfig {
            token: None,
            api_url: Some("http://localhost:3000/".to_string()),
        };
        let api = UtApi::new(&config);
        assert_eq!(
            api.endpoint("/v6/deleteFiles"),
            "http://localhost:3000/v6/deleteFiles"
        );
    }
}
