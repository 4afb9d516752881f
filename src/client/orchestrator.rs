//! Client-side upload orchestration.
//!
//! Collects selected files and shared parameters, submits them through one
//! of two strategies, and manages the transient handles of the produced
//! results. The sequential strategy posts one single-file request per item
//! and never has more than one request in flight; the remote-batch strategy
//! packs the whole queue into a single multipart submission.

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tokio::task;

use crate::domains::archive;
use crate::domains::optimization::{OutputFormat, DEFAULT_QUALITY, DEFAULT_SCALE};
use crate::errors::{DomainError, ServiceError, ServiceResult};
use super::handles::{Handle, HandleRegistry};

/// Parameters applied uniformly to the whole queue.
#[derive(Debug, Clone, Copy)]
pub struct SharedParams {
    pub format: OutputFormat,
    pub quality: u8,
    pub scale: u8,
}

impl Default for SharedParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::Webp,
            quality: DEFAULT_QUALITY,
            scale: DEFAULT_SCALE,
        }
    }
}

/// A selected file waiting for upload, with its probed pixel dimensions and
/// the preview handle owning its bytes.
pub struct UploadItem {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub data: Arc<Vec<u8>>,
    pub preview: Handle,
}

/// An optimized result owned by the registry.
pub struct OptimizedResult {
    pub handle: Handle,
    pub format: OutputFormat,
}

/// Summary of one completed upload cycle.
#[derive(Debug, Clone)]
pub struct UploadCycleReport {
    pub started_at: DateTime<Utc>,
    pub submitted: usize,
    pub received: usize,
    pub duration_ms: i64,
}

/// How a queue of items is submitted to the optimization endpoint.
#[async_trait]
pub trait UploadStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Submit every item and return the optimized buffers that came back,
    /// in item order. Items that fail individually are logged and omitted,
    /// so the result count may be less than the item count.
    async fn submit(
        &self,
        client: &Client,
        items: &[UploadItem],
        params: &SharedParams,
    ) -> ServiceResult<Vec<Vec<u8>>>;
}

/// One single-file request per item against the same-origin `/compress`
/// endpoint, strictly one at a time.
pub struct SequentialUploader {
    pub base_url: String,
}

#[async_trait]
impl UploadStrategy for SequentialUploader {
    fn name(&self) -> &'static str {
        "sequential"
    }

    async fn submit(
        &self,
        client: &Client,
        items: &[UploadItem],
        params: &SharedParams,
    ) -> ServiceResult<Vec<Vec<u8>>> {
        let url = format!("{}/compress", self.base_url);
        let mut buffers = Vec::new();

        for (i, item) in items.iter().enumerate() {
            let part = Part::bytes(item.data.as_ref().clone())
                .file_name(item.filename.clone())
                .mime_str(mime_for(&item.data).as_ref())
                .map_err(|e| {
                    ServiceError::Domain(DomainError::Internal(format!(
                        "Invalid MIME type for upload: {}",
                        e
                    )))
                })?;
            let form = Form::new()
                .part("file", part)
                .text("filetype", params.format.as_str())
                .text("quality", params.quality.to_string())
                .text("scale", params.scale.to_string())
                .text("width", item.width.to_string())
                .text("height", item.height.to_string());

            match client.post(&url).multipart(form).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.bytes().await {
                        Ok(bytes) => buffers.push(bytes.to_vec()),
                        Err(e) => error!("Image optimization failed for file {}: {}", i, e),
                    }
                }
                Ok(response) => error!(
                    "Image optimization failed for file {}: server returned {}",
                    i,
                    response.status()
                ),
                Err(e) => error!("Image optimization failed for file {}: {}", i, e),
            }
        }

        Ok(buffers)
    }
}

/// One batched multipart submission against a remote optimize service.
pub struct RemoteBatchUploader {
    pub base_url: String,
}

#[derive(Deserialize)]
struct RemoteOptimizeResponse {
    message: String,
    processed_images: Vec<String>,
}

#[async_trait]
impl UploadStrategy for RemoteBatchUploader {
    fn name(&self) -> &'static str {
        "remote-batch"
    }

    async fn submit(
        &self,
        client: &Client,
        items: &[UploadItem],
        params: &SharedParams,
    ) -> ServiceResult<Vec<Vec<u8>>> {
        let mut form = Form::new();
        for item in items {
            let part = Part::bytes(item.data.as_ref().clone())
                .file_name(item.filename.clone())
                .mime_str(mime_for(&item.data).as_ref())
                .map_err(|e| {
                    ServiceError::Domain(DomainError::Internal(format!(
                        "Invalid MIME type for upload: {}",
                        e
                    )))
                })?;
            form = form.part("image", part);
        }
        form = form
            .text("quality", params.quality.to_string())
            .text("scale", params.scale.to_string())
            .text("format", params.format.as_str());

        let url = format!("{}/optimize", self.base_url);
        let response = client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalService(format!("Failed to submit batch: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to get error details".to_string());
            return Err(ServiceError::ExternalService(format!(
                "Server returned error {}: {}",
                status, error_text
            )));
        }

        let parsed = response
            .json::<RemoteOptimizeResponse>()
            .await
            .map_err(|e| {
                ServiceError::ExternalService(format!("Failed to parse optimize response: {}", e))
            })?;
        debug!("Remote optimize service: {}", parsed.message);

        let mut buffers = Vec::new();
        for (i, reference) in parsed.processed_images.iter().enumerate() {
            match resolve_image_reference(client, reference).await {
                Ok(bytes) => buffers.push(bytes),
                Err(e) => warn!("Skipping unusable result {}: {}", i, e),
            }
        }
        Ok(buffers)
    }
}

/// Turn a processed-image reference (data URI or fetchable URL) into bytes.
async fn resolve_image_reference(client: &Client, reference: &str) -> ServiceResult<Vec<u8>> {
    if let Some(rest) = reference.strip_prefix("data:") {
        let payload = rest
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .ok_or_else(|| {
                ServiceError::ExternalService("Unsupported data URI encoding".to_string())
            })?;
        return base64::decode(payload)
            .map_err(|e| ServiceError::ExternalService(format!("Invalid base64 payload: {}", e)));
    }

    let response = client
        .get(reference)
        .send()
        .await
        .map_err(|e| ServiceError::ExternalService(format!("Failed to fetch result: {}", e)))?;
    if !response.status().is_success() {
        return Err(ServiceError::ExternalService(format!(
            "Result fetch returned {}",
            response.status()
        )));
    }
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| ServiceError::ExternalService(format!("Failed to read result body: {}", e)))
}

pub struct UploadOrchestrator {
    client: Client,
    registry: HandleRegistry,
    params: SharedParams,
    queue: Vec<UploadItem>,
    results: Vec<OptimizedResult>,
}

impl UploadOrchestrator {
    pub fn new(request_timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            registry: HandleRegistry::new(),
            params: SharedParams::default(),
            queue: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn set_params(&mut self, params: SharedParams) {
        self.params = params;
    }

    pub fn params(&self) -> SharedParams {
        self.params
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn results_len(&self) -> usize {
        self.results.len()
    }

    /// Number of live registry handles (previews plus results).
    pub fn handle_count(&self) -> usize {
        self.registry.len()
    }

    /// Read a file from disk and add it to the selection.
    pub async fn add_file(&mut self, path: &Path) -> ServiceResult<()> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ServiceError::Domain(DomainError::File(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        })?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        self.add_bytes(filename, bytes).await
    }

    /// Add an in-memory file to the selection, probing its dimensions.
    pub async fn add_bytes(&mut self, filename: String, bytes: Vec<u8>) -> ServiceResult<()> {
        let (bytes, (width, height)) = probe_dimensions(bytes).await?;

        let preview = self.registry.register(bytes);
        let data = self
            .registry
            .get(preview)
            .ok_or_else(|| ServiceError::Domain(DomainError::Internal(
                "Preview handle vanished during registration".to_string(),
            )))?;

        debug!("Queued {} ({}x{})", filename, width, height);
        self.queue.push(UploadItem {
            filename,
            width,
            height,
            data,
            preview,
        });
        Ok(())
    }

    /// Remove one selected file and release its preview handle.
    pub fn remove_file(&mut self, index: usize) -> bool {
        if index >= self.queue.len() {
            return false;
        }
        let item = self.queue.remove(index);
        self.registry.release(item.preview);
        true
    }

    /// Submit the whole selection through the given strategy.
    ///
    /// A completed cycle clears the selection whatever happened to the
    /// individual items; a strategy-level error leaves the queue intact.
    pub async fn upload_all(
        &mut self,
        strategy: &dyn UploadStrategy,
    ) -> ServiceResult<UploadCycleReport> {
        let started_at = Utc::now();
        let started = Instant::now();
        let submitted = self.queue.len();

        if submitted == 0 {
            return Ok(UploadCycleReport {
                started_at,
                submitted: 0,
                received: 0,
                duration_ms: 0,
            });
        }

        info!(
            "Uploading {} files via {} strategy",
            submitted,
            strategy.name()
        );
        let buffers = strategy
            .submit(&self.client, &self.queue, &self.params)
            .await?;
        let received = buffers.len();

        for bytes in buffers {
            let handle = self.registry.register(bytes);
            self.results.push(OptimizedResult {
                handle,
                format: self.params.format,
            });
        }
        self.clear_selection();

        info!("Upload cycle complete: {}/{} results", received, submitted);
        Ok(UploadCycleReport {
            started_at,
            submitted,
            received,
            duration_ms: started.elapsed().as_millis() as i64,
        })
    }

    /// Access one result's bytes.
    pub fn result_bytes(&self, index: usize) -> Option<Arc<Vec<u8>>> {
        self.results
            .get(index)
            .and_then(|result| self.registry.get(result.handle))
    }

    /// Write a single result to disk.
    pub async fn download_one(&self, index: usize, path: &Path) -> ServiceResult<()> {
        let bytes = self.result_bytes(index).ok_or_else(|| {
            ServiceError::Domain(DomainError::File(format!("No result at index {}", index)))
        })?;
        tokio::fs::write(path, bytes.as_ref()).await.map_err(|e| {
            ServiceError::Domain(DomainError::File(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            )))
        })
    }

    /// Bundle every result into a zip archive and write it to disk.
    pub async fn download_all_zip(&self, path: &Path) -> ServiceResult<()> {
        if self.results.is_empty() {
            return Ok(());
        }

        let mut pairs = Vec::with_capacity(self.results.len());
        for result in &self.results {
            let bytes = self.registry.get(result.handle).ok_or_else(|| {
                ServiceError::Domain(DomainError::File(
                    "Result handle was already released".to_string(),
                ))
            })?;
            pairs.push((bytes.as_ref().clone(), result.format.extension()));
        }

        let archive_bytes = archive::bundle_results(&pairs).map_err(ServiceError::Domain)?;
        tokio::fs::write(path, archive_bytes).await.map_err(|e| {
            ServiceError::Domain(DomainError::File(format!(
                "Failed to write {}: {}",
                path.display(),
                e
            )))
        })
    }

    /// Discard the selection and every produced result, releasing all
    /// transient handles.
    pub fn clear_queue(&mut self) {
        self.clear_selection();
        for result in self.results.drain(..) {
            self.registry.release(result.handle);
        }
    }

    fn clear_selection(&mut self) {
        for item in self.queue.drain(..) {
            self.registry.release(item.preview);
        }
    }
}

/// Decode-and-measure: read pixel dimensions from the image header.
async fn probe_dimensions(bytes: Vec<u8>) -> ServiceResult<(Vec<u8>, (u32, u32))> {
    task::spawn_blocking(move || {
        let dimensions = image::io::Reader::new(Cursor::new(&bytes))
            .with_guessed_format()
            .map_err(|e| DomainError::Decode(format!("Failed to sniff image format: {}", e)))?
            .into_dimensions()
            .map_err(|e| DomainError::Decode(format!("Failed to read image dimensions: {}", e)))?;
        Ok::<_, DomainError>((bytes, dimensions))
    })
    .await
    .map_err(|e| ServiceError::Domain(DomainError::Internal(format!("Task join error: {}", e))))?
    .map_err(ServiceError::Domain)
}

fn mime_for(bytes: &[u8]) -> mime::Mime {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => mime::IMAGE_JPEG,
        Ok(image::ImageFormat::Png) => mime::IMAGE_PNG,
        Ok(image::ImageFormat::Gif) => mime::IMAGE_GIF,
        Ok(image::ImageFormat::WebP) => "image/webp"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}
