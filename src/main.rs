use clap::Parser;
use uploadthing_provider::utils::logger::{self, LogFormat};
use uploadthing_provider::{
    init, CliConfig, Command, ErrorCategory, FileDescriptor, FileStream, ProviderError,
    UploadProvider,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    logger::init_logger(format, cli.verbose);
    tracing::debug!("CLI config: {:?}", cli.command);

    let config = match cli.provider_config() {
        Ok(config) => config,
        Err(e) => exit_with(e),
    };
    let provider = init(config);

    match cli.command {
        Command::Upload { path, mime, stream } => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("upload")
                .to_string();

            let mut file = FileDescriptor::new(name, mime);
            file.ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{}", e));

            let result = if stream {
                let handle = tokio::fs::File::open(&path).await?;
                file.size_in_bytes = handle.metadata().await?.len();
                file.size = file.size_in_bytes as f64 / 1000.0;
                file = file.with_stream(FileStream::from_reader(handle));
                provider.upload_stream(&mut file).await
            } else {
                let bytes = tokio::fs::read(&path).await?;
                file = file.with_buffer(bytes);
                provider.upload(&mut file).await
            };

            if let Err(e) = result {
                exit_with(e);
            }
            println!("✅ Uploaded {}", file.name);
            println!("🔗 url: {}", file.url);
            println!("🔑 key: {}", file.hash);
        }
        Command::Delete { key } => {
            let file = FileDescriptor::default().with_hash(key.clone());
            if let Err(e) = provider.delete(&file).await {
                exit_with(e);
            }
            println!("🗑️ Deleted {}", key);
        }
    }

    Ok(())
}

fn exit_with(e: ProviderError) -> ! {
    eprintln!("❌ {}", e);
    let exit_code = match e.category() {
        ErrorCategory::MissingInput | ErrorCategory::InvalidInput => 1,
        ErrorCategory::EmptyRemoteResponse | ErrorCategory::TransportFailure => 2,
        ErrorCategory::Configuration => 3,
    };
    std::process::exit(exit_code);
}
