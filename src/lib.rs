pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, Command};

pub use config::ProviderConfig;
pub use core::client::{UploadThingToken, UtApi};
pub use core::provider::{init, init_from_env, UploadThingProvider};
pub use core::{FileDescriptor, FileStream, UploadApi, UploadProvider};
pub use utils::error::{ErrorCategory, MissingInput, ProviderError, Result};
