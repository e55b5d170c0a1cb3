use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use sync_wrapper::SyncWrapper;

/// Key under `provider_metadata` that holds the remote object key.
pub const FILE_KEY_METADATA: &str = "fileKey";

/// A readable sequence of byte chunks handed over by the host.
pub struct FileStream {
    // `SyncWrapper` keeps `FileDescriptor: Sync`; the stream is only ever consumed by value
    inner: SyncWrapper<BoxStream<'static, std::io::Result<Bytes>>>,
}

impl FileStream {
    /// Chunks of any byte-like type are converted to `Bytes` as they are read.
    pub fn new<S, B>(stream: S) -> Self
    where
        S: Stream<Item = std::io::Result<B>> + Send + 'static,
        B: Into<Bytes> + 'static,
    {
        Self {
            inner: SyncWrapper::new(stream.map_ok(Into::<Bytes>::into).boxed()),
        }
    }

    pub fn from_chunks<B>(chunks: Vec<B>) -> Self
    where
        B: Into<Bytes> + Send + 'static,
    {
        Self::new(stream::iter(chunks.into_iter().map(Ok::<B, std::io::Error>)))
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: tokio::io::AsyncRead + Send + 'static,
    {
        Self::new(tokio_util::io::ReaderStream::new(reader))
    }

    /// Reads every chunk in order into one contiguous buffer.
    pub async fn collect_bytes(self) -> std::io::Result<Bytes> {
        let mut inner = self.inner.into_inner();
        let mut buffer = BytesMut::new();
        let mut chunks = 0usize;
        while let Some(chunk) = inner.next().await {
            buffer.extend_from_slice(&chunk?);
            chunks += 1;
        }
        tracing::debug!("Drained {} chunks ({} bytes)", chunks, buffer.len());
        Ok(buffer.freeze())
    }
}

impl fmt::Debug for FileStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileStream { .. }")
    }
}

/// The host's record of an uploaded (or to-be-uploaded) file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formats: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub size: f64,
    #[serde(default)]
    pub size_in_bytes: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(
        default,
        rename = "provider_metadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub provider_metadata: Option<HashMap<String, serde_json::Value>>,
    #[serde(skip)]
    pub buffer: Option<Bytes>,
    #[serde(skip)]
    pub stream: Option<FileStream>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            ..Default::default()
        }
    }

    /// Attaches an in-memory payload and fills in the size fields.
    pub fn with_buffer(mut self, buffer: impl Into<Bytes>) -> Self {
        let buffer = buffer.into();
        self.size_in_bytes = buffer.len() as u64;
        // host convention: `size` is in kilobytes
        self.size = buffer.len() as f64 / 1000.0;
        self.buffer = Some(buffer);
        self
    }

    pub fn with_stream(mut self, stream: FileStream) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    /// The remote object key recorded in `provider_metadata`, if it is a non-empty string.
    pub fn metadata_file_key(&self) -> Option<&str> {
        self.provider_metadata
            .as_ref()?
            .get(FILE_KEY_METADATA)?
            .as_str()
            .filter(|key| !key.is_empty())
    }

    /// Records a successful upload on the descriptor.
    pub fn apply_upload(&mut self, uploaded: &UploadedFileData) {
        self.url = uploaded.ufs_url.clone();
        self.hash = uploaded.key.clone();
        self.provider_metadata.get_or_insert_with(HashMap::new).insert(
            FILE_KEY_METADATA.to_string(),
            serde_json::Value::String(uploaded.key.clone()),
        );
    }
}

/// A named, typed byte payload submitted to the upload service.
#[derive(Debug, Clone)]
pub struct TransferUnit {
    pub name: String,
    pub mime: String,
    pub data: Bytes,
}

impl TransferUnit {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFileData {
    pub key: String,
    pub ufs_url: String,
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
    /// Deprecated by the service in favour of `ufs_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub code: String,
    pub message: String,
}

/// Per-file outcome of an upload batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UploadFileResult {
    pub data: Option<UploadedFileData>,
    pub error: Option<UploadFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFilesResult {
    pub success: bool,
    #[serde(default)]
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_collects_chunks_in_order() {
        let stream = FileStream::from_chunks(vec![
            b"ab".to_vec(),
            Vec::new(),
            b"cd".to_vec(),
            b"e".to_vec(),
        ]);
        let bytes = stream.collect_bytes().await.unwrap();
        assert_eq!(&bytes[..], b"abcde");
    }

    #[tokio::test]
    async fn test_stream_propagates_read_error() {
        let chunks: Vec<std::io::Result<Vec<u8>>> = vec![
            Ok(b"ab".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone")),
        ];
        let stream = FileStream::new(stream::iter(chunks));
        let err = stream.collect_bytes().await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_non_sync_stream_keeps_descriptor_sync() {
        fn assert_sync<T: Sync>(_: &T) {}

        // `Cell` is `Send` but not `Sync`
        let counter = std::cell::Cell::new(0u8);
        let chunks = stream::unfold(counter, |counter| async move {
            let n = counter.get();
            if n == 3 {
                return None;
            }
            counter.set(n + 1);
            Some((Ok::<_, std::io::Error>(vec![b'a' + n]), counter))
        });
        let file = FileDescriptor::new("s.txt", "text/plain").with_stream(FileStream::new(chunks));
        assert_sync(&file);

        let bytes = file.stream.unwrap().collect_bytes().await.unwrap();
        assert_eq!(&bytes[..], b"abc");
    }

    #[tokio::test]
    async fn test_stream_from_reader() {
        let stream = FileStream::from_reader(std::io::Cursor::new(b"reader bytes".to_vec()));
        let bytes = stream.collect_bytes().await.unwrap();
        assert_eq!(&bytes[..], b"reader bytes");
    }

    #[test]
    fn test_metadata_file_key() {
        let mut file = FileDescriptor::new("a.png", "image/png");
        assert_eq!(file.metadata_file_key(), None);

        let mut metadata = HashMap::new();
        metadata.insert(FILE_KEY_METADATA.to_string(), serde_json::json!(""));
        file.provider_metadata = Some(metadata.clone());
        assert_eq!(file.metadata_file_key(), None);

        metadata.insert(FILE_KEY_METADATA.to_string(), serde_json::json!(42));
        file.provider_metadata = Some(metadata.clone());
        assert_eq!(file.metadata_file_key(), None);

        metadata.insert(FILE_KEY_METADATA.to_string(), serde_json::json!("k9"));
        file.provider_metadata = Some(metadata);
        assert_eq!(file.metadata_file_key(), Some("k9"));
    }

    #[test]
    fn test_descriptor_host_shape() {
        let host_json = serde_json::json!({
            "name": "a.png",
            "alternativeText": "alt",
            "hash": "a_123",
            "ext": ".png",
            "mime": "image/png",
            "size": 1.5,
            "sizeInBytes": 1500,
            "url": "",
            "provider_metadata": { "fileKey": "k1" }
        });
        let file: FileDescriptor = serde_json::from_value(host_json).unwrap();
        assert_eq!(file.alternative_text.as_deref(), Some("alt"));
        assert_eq!(file.size_in_bytes, 1500);
        assert_eq!(file.metadata_file_key(), Some("k1"));
        assert!(file.buffer.is_none());

        let back = serde_json::to_value(&file).unwrap();
        assert_eq!(back["sizeInBytes"], 1500);
        assert_eq!(back["provider_metadata"]["fileKey"], "k1");
        assert!(back.get("buffer").is_none());
    }

    #[test]
    fn test_apply_upload_sets_url_hash_and_metadata() {
        let mut file = FileDescriptor::new("a.png", "image/png").with_buffer(b"x".to_vec());
        file.apply_upload(&UploadedFileData {
            key: "k1".to_string(),
            ufs_url: "https://x/a".to_string(),
            name: "a.png".to_string(),
            size: 1,
            file_hash: None,
            url: None,
            app_url: None,
        });
        assert_eq!(file.url, "https://x/a");
        assert_eq!(file.hash, "k1");
        assert_eq!(file.metadata_file_key(), Some("k1"));
    }
}
