use crate::config::ProviderConfig;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "uploadthing-provider")]
#[command(about = "Upload and delete media on UploadThing")]
pub struct CliConfig {
    /// Access token; falls back to UPLOADTHING_TOKEN
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// API base URL; falls back to UPLOADTHING_API_URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// TOML file with `token` and `api_url`
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Upload a local file
    Upload {
        path: PathBuf,

        #[arg(long, default_value = "application/octet-stream")]
        mime: String,

        /// Read the file as a stream instead of loading it up front
        #[arg(long)]
        stream: bool,
    },
    /// Delete a remote file by key
    Delete { key: String },
}

impl CliConfig {
    /// Flags override the config file; the environment fills whatever is left.
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let mut config = match &self.config {
            Some(path) => ProviderConfig::from_file(path)?,
            None => ProviderConfig::default(),
        };

        if let Some(token) = &self.token {
            config.token = Some(token.clone());
        }
        if let Some(api_url) = &self.api_url {
            config.api_url = Some(api_url.clone());
        }

        let config = config.with_env_fallback();
        config.validate()?;
        Ok(config)
    }
}
