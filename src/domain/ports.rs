use crate::domain::model::{DeleteFilesResult, FileDescriptor, TransferUnit, UploadFileResult};
use crate::utils::error::Result;
use async_trait::async_trait;

/// The contract a host calls to persist and remove media.
///
/// Successful uploads write the remote URL and key back onto the descriptor.
#[async_trait]
pub trait UploadProvider: Send + Sync {
    async fn upload(&self, file: &mut FileDescriptor) -> Result<()>;
    async fn upload_stream(&self, file: &mut FileDescriptor) -> Result<()>;
    async fn delete(&self, file: &FileDescriptor) -> Result<()>;
}

/// The remote upload service.
#[async_trait]
pub trait UploadApi: Send + Sync {
    /// Returns one result per unit, in input order.
    async fn upload_files(&self, files: Vec<TransferUnit>) -> Result<Vec<UploadFileResult>>;
    async fn delete_files(&self, keys: &[String]) -> Result<DeleteFilesResult>;
}
