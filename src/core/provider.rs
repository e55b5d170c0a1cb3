use crate::config::ProviderConfig;
use crate::core::client::UtApi;
use crate::core::{FileDescriptor, TransferUnit, UploadApi, UploadProvider};
use crate::domain::model::UploadedFileData;
use crate::utils::error::{MissingInput, ProviderError, Result};
use async_trait::async_trait;

/// Builds the provider a host registers: one `UtApi` bound to `config`.
///
/// The token is used exactly as given. Hosts that want the
/// `UPLOADTHING_TOKEN` fallback should build the config with
/// [`ProviderConfig::from_env`] or [`ProviderConfig::with_env_fallback`].
pub fn init(config: ProviderConfig) -> UploadThingProvider<UtApi> {
    tracing::info!("Initializing UploadThing provider (api: {})", config.api_url());
    if config.token.is_none() {
        tracing::warn!("No UploadThing token configured; remote calls will fail");
    }
    UploadThingProvider::new(UtApi::new(&config))
}

pub fn init_from_env() -> UploadThingProvider<UtApi> {
    init(ProviderConfig::from_env())
}

pub struct UploadThingProvider<A: UploadApi> {
    api: A,
}

impl<A: UploadApi> UploadThingProvider<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Sends a batch of exactly one unit and returns its data.
    async fn send_single(&self, unit: TransferUnit) -> Result<UploadedFileData> {
        tracing::debug!("Uploading {} ({} bytes, {})", unit.name, unit.size(), unit.mime);
        let results = self.api.upload_files(vec![unit]).await?;

        match results.into_iter().next() {
            Some(result) => match result.data {
                Some(data) => Ok(data),
                None => Err(ProviderError::EmptyRemoteResponse {
                    reason: result.error.map(|e| e.message),
                }),
            },
            None => Err(ProviderError::EmptyRemoteResponse {
                reason: Some("upload returned no results".to_string()),
            }),
        }
    }

    async fn upload_buffer(&self, file: &mut FileDescriptor) -> Result<()> {
        let buffer = file
            .buffer
            .clone()
            .ok_or_else(|| ProviderError::missing(MissingInput::Buffer))?;

        let unit = TransferUnit::new(file.name.clone(), file.mime.clone(), buffer);
        let uploaded = self.send_single(unit).await?;
        file.apply_upload(&uploaded);
        Ok(())
    }

    async fn upload_from_stream(&self, file: &mut FileDescriptor) -> Result<()> {
        let stream = file
            .stream
            .take()
            .ok_or_else(|| ProviderError::missing(MissingInput::Stream))?;

        // the service takes one contiguous body, so the stream is drained first
        let buffer = stream.collect_bytes().await?;

        let unit = TransferUnit::new(file.name.clone(), file.mime.clone(), buffer);
        let uploaded = self.send_single(unit).await?;
        file.apply_upload(&uploaded);
        Ok(())
    }

    async fn delete_by_key(&self, file: &FileDescriptor) -> Result<()> {
        let key =
            resolve_delete_key(file).ok_or_else(|| ProviderError::missing(MissingInput::Key))?;

        let result = self.api.delete_files(&[key.to_string()]).await?;
        tracing::debug!(
            "Delete of {} acknowledged (success: {}, deleted: {})",
            key,
            result.success,
            result.deleted_count
        );
        Ok(())
    }
}

/// `hash` first, then `provider_metadata.fileKey`.
pub fn resolve_delete_key(file: &FileDescriptor) -> Option<&str> {
    if !file.hash.is_empty() {
        return Some(file.hash.as_str());
    }
    file.metadata_file_key()
}

#[async_trait]
impl<A: UploadApi> UploadProvider for UploadThingProvider<A> {
    async fn upload(&self, file: &mut FileDescriptor) -> Result<()> {
        let result = self.upload_buffer(file).await;
        match &result {
            Ok(()) => tracing::info!("Uploaded {} to {}", file.name, file.url),
            Err(e) => tracing::error!("upload error: {} ({:?})", e, e.category()),
        }
        result
    }

    async fn upload_stream(&self, file: &mut FileDescriptor) -> Result<()> {
        let result = self.upload_from_stream(file).await;
        match &result {
            Ok(()) => tracing::info!("Uploaded {} to {}", file.name, file.url),
            Err(e) => tracing::error!("uploadStream error: {} ({:?})", e, e.category()),
        }
        result
    }

    async fn delete(&self, file: &FileDescriptor) -> Result<()> {
        let result = self.delete_by_key(file).await;
        if let Err(e) = &result {
            tracing::warn!("Could not delete file from UploadThing: {}", e);
        }
        result
    }
}
