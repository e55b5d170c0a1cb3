pub mod client;
pub mod provider;

pub use crate::domain::model::{
    DeleteFilesResult, FileDescriptor, FileStream, TransferUnit, UploadFileResult,
};
pub use crate::domain::ports::{UploadApi, UploadProvider};
pub use crate::utils::error::Result;
