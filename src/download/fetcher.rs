//! Per-candidate download: fetch, resolve format, decode, re-encode, stage.
//!
//! The format comes from the URL path extension, then the type the feed
//! declared for the result, then the response `Content-Type`.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use super::storage::StagedImage;
use crate::models::{DownloadOutcome, FailureReason, ResultRecord};
use crate::utils::HttpClient;

/// Unit of work executed by download workers.
///
/// Implementations stage the image next to its final name; the coordinator
/// decides whether to commit it.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn stage(&self, record: &ResultRecord, index: usize) -> Result<StagedImage, FailureReason>;
}

/// HTTP image fetcher writing into one storage folder.
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: HttpClient,
    folder: PathBuf,
    file_prefix: String,
}

impl ImageFetcher {
    /// Files are named `<file_prefix>_<index>.<ext>` inside `folder`
    pub fn new(client: HttpClient, folder: impl Into<PathBuf>, file_prefix: impl Into<String>) -> Self {
        Self {
            client,
            folder: folder.into(),
            file_prefix: file_prefix.into(),
        }
    }

    pub fn file_name(&self, index: usize, format: ImageFormat) -> String {
        format!("{}_{}.{}", self.file_prefix, index, extension(format))
    }

    /// Fetch and immediately commit one image
    pub async fn fetch(&self, record: &ResultRecord, index: usize) -> DownloadOutcome {
        let result = match self.stage(record, index).await {
            Ok(staged) => staged.commit().map_err(FailureReason::from),
            Err(reason) => Err(reason),
        };
        result.into()
    }
}

#[async_trait]
impl Fetch for ImageFetcher {
    async fn stage(&self, record: &ResultRecord, index: usize) -> Result<StagedImage, FailureReason> {
        let locator = record.locator();
        let response = self.client.get(locator).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FailureReason::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let format = format_from_url(locator)
            .or_else(|| record.declared_type().and_then(ImageFormat::from_extension))
            .or_else(|| content_type.as_deref().and_then(format_from_content_type))
            .ok_or(FailureReason::UnknownFormat)?;

        let bytes = response.bytes().await?;
        debug!(index, locator, title = record.title(), bytes = bytes.len(), ?format, "Fetched image");

        let folder = self.folder.clone();
        let file_name = self.file_name(index, format);
        tokio::task::spawn_blocking(move || {
            let encoded = transcode(&bytes, format)?;
            StagedImage::write(&folder, &file_name, &encoded).map_err(FailureReason::from)
        })
        .await
        .map_err(|e| FailureReason::Io(format!("worker task failed: {}", e)))?
    }
}

/// Infer the image format from the URL path extension
pub fn format_from_url(locator: &str) -> Option<ImageFormat> {
    let url = Url::parse(locator).ok()?;
    let ext = Path::new(url.path()).extension()?;
    ImageFormat::from_extension(ext)
}

/// Infer the image format from a `Content-Type` header value
pub fn format_from_content_type(content_type: &str) -> Option<ImageFormat> {
    let mime = content_type.split(';').next()?.trim();
    ImageFormat::from_mime_type(mime.to_ascii_lowercase())
}

/// Canonical file extension for a format, without the dot
pub fn extension(format: ImageFormat) -> &'static str {
    format.extensions_str().first().copied().unwrap_or("img")
}

/// Decode `bytes` and re-encode them as `format`
fn transcode(bytes: &[u8], format: ImageFormat) -> Result<Vec<u8>, FailureReason> {
    let image = image::load_from_memory(bytes).map_err(|e| FailureReason::Decode(e.to_string()))?;

    // JPEG has no alpha channel
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };

    let mut encoded = Cursor::new(Vec::new());
    image
        .write_to(&mut encoded, format)
        .map_err(|e| FailureReason::Encode(e.to_string()))?;
    Ok(encoded.into_inner())
}
