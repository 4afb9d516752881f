//! Batch optimization service.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use std::time::Instant;
use uuid::Uuid;

use crate::errors::DomainResult;
use super::transcoder::ImageTranscoder;
use super::types::{BatchItem, ItemOutcome, ItemResult, OptimizeParams, OptimizedImage};

#[async_trait]
pub trait OptimizationService: Send + Sync {
    /// Transform a single image: resize to the parameter-derived dimensions
    /// and re-encode to the target format.
    async fn optimize(&self, data: Vec<u8>, params: OptimizeParams) -> DomainResult<OptimizedImage>;

    /// Process a batch of items independently. Every submitted index comes
    /// back exactly once, in submission order, tagged ok/skipped/failed; a
    /// bad item never aborts the rest of the batch.
    async fn optimize_batch(&self, items: Vec<BatchItem>) -> Vec<ItemOutcome>;
}

pub struct OptimizationServiceImpl {
    transcoder: ImageTranscoder,
    max_concurrent_items: usize,
}

impl OptimizationServiceImpl {
    pub fn new(max_concurrent_items: usize) -> Self {
        Self {
            transcoder: ImageTranscoder::new(),
            max_concurrent_items: max_concurrent_items.max(1),
        }
    }
}

#[async_trait]
impl OptimizationService for OptimizationServiceImpl {
    async fn optimize(&self, data: Vec<u8>, params: OptimizeParams) -> DomainResult<OptimizedImage> {
        self.transcoder.transcode(data, params).await
    }

    async fn optimize_batch(&self, items: Vec<BatchItem>) -> Vec<ItemOutcome> {
        let batch_id = Uuid::new_v4();
        let started = Instant::now();
        let total = items.len();
        log::info!(
            "Batch {}: processing {} items (concurrency {})",
            batch_id,
            total,
            self.max_concurrent_items
        );

        // Items are independent, so they run through a bounded pool;
        // `buffered` yields results in submission order.
        let outcomes: Vec<ItemOutcome> = stream::iter(items.into_iter().map(|item| {
            let transcoder = self.transcoder.clone();
            async move {
                let BatchItem {
                    index,
                    file,
                    params,
                } = item;

                let params = match params {
                    Ok(params) => params,
                    Err(e) => {
                        log::warn!("Batch item {}: invalid parameters: {}", index, e);
                        return ItemOutcome::failed(index, e.to_string());
                    }
                };

                let data = match file {
                    Some(data) => data,
                    None => {
                        log::debug!("Batch item {}: no file blob, skipping", index);
                        return ItemOutcome::skipped(index);
                    }
                };

                match transcoder.transcode(data, params).await {
                    Ok(image) => ItemOutcome::ok(index, image),
                    Err(e) => {
                        log::warn!("Batch item {}: transform failed: {}", index, e);
                        ItemOutcome::failed(index, e.to_string())
                    }
                }
            }
        }))
        .buffered(self.max_concurrent_items)
        .collect()
        .await;

        let ok = outcomes
            .iter()
            .filter(|o| matches!(o.result, ItemResult::Ok(_)))
            .count();
        log::info!(
            "Batch {}: {}/{} items optimized in {}ms",
            batch_id,
            ok,
            total,
            started.elapsed().as_millis()
        );

        outcomes
    }
}
