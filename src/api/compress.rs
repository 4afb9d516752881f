//! `POST /compress`: the batch compression handler.
//!
//! One route, two submission modes, dispatched on field names:
//! - batch mode: `file-{i}` blobs plus optional `filetype-{i}`, `quality-{i}`,
//!   `scale-{i}`, `width-{i}`, `height-{i}` fields; responds with base64
//!   payloads and per-item reports.
//! - legacy single-file mode: unindexed `file`/`filetype`/`quality`/`scale`/
//!   `width`/`height` fields; responds with the raw transcoded bytes.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domains::optimization::{BatchItem, ItemResult, OptimizeParams};
use super::error::ApiError;
use super::AppState;

const LEGACY_PARAM_FIELDS: [&str; 5] = ["filetype", "quality", "scale", "width", "height"];
const INDEXED_PARAM_PREFIXES: [&str; 5] =
    ["filetype-", "quality-", "scale-", "width-", "height-"];

/// Batch-mode response. `optimizedFiles` keeps the flat ok-only contract
/// (skipped and failed items are simply absent); `results` tags every
/// submitted index so callers can recover input/output correspondence.
#[derive(Debug, Serialize, Deserialize)]
pub struct CompressBatchResponse {
    #[serde(rename = "optimizedFiles")]
    pub optimized_files: Vec<String>,
    pub results: Vec<ItemReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Ok,
    Skipped,
    Failed,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItemReport {
    pub index: usize,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn compress(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = collect_form(multipart).await?;
    if form.legacy_mode {
        compress_single(state, form).await
    } else {
        compress_batch(state, form).await
    }
}

async fn compress_single(state: AppState, mut form: CollectedForm) -> Result<Response, ApiError> {
    let data = form.legacy_file.take().ok_or(ApiError::MissingInput)?;

    let params = OptimizeParams::from_fields(
        form.text("filetype"),
        form.text("quality"),
        form.text("scale"),
        form.text("width"),
        form.text("height"),
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let format = params.format;

    let image = state
        .service
        .optimize(data, params)
        .await
        .map_err(|e| ApiError::Processing(e.to_string()))?;

    let headers = [
        (
            header::CONTENT_TYPE,
            format!("image/{}", format.as_str()),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename='optimized.{}'", format.extension()),
        ),
    ];
    Ok((headers, image.bytes).into_response())
}

async fn compress_batch(state: AppState, form: CollectedForm) -> Result<Response, ApiError> {
    let CollectedForm {
        mut files, texts, ..
    } = form;
    let text = |name: String| texts.get(&name).map(String::as_str);

    // An item exists if any field names its index, so a parameter set whose
    // file blob never arrived still shows up as a skipped entry.
    let mut indices: BTreeSet<usize> = files.keys().copied().collect();
    for name in texts.keys() {
        for prefix in INDEXED_PARAM_PREFIXES {
            if let Some(index) = parse_indexed_name(name, prefix) {
                indices.insert(index);
            }
        }
    }

    let items: Vec<BatchItem> = indices
        .into_iter()
        .map(|index| BatchItem {
            index,
            file: files.remove(&index),
            params: OptimizeParams::from_fields(
                text(format!("filetype-{}", index)),
                text(format!("quality-{}", index)),
                text(format!("scale-{}", index)),
                text(format!("width-{}", index)),
                text(format!("height-{}", index)),
            ),
        })
        .collect();

    let outcomes = state.service.optimize_batch(items).await;

    let mut optimized_files = Vec::new();
    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome.result {
            ItemResult::Ok(image) => {
                let encoded = base64::encode(&image.bytes);
                optimized_files.push(encoded.clone());
                results.push(ItemReport {
                    index: outcome.index,
                    status: ItemStatus::Ok,
                    data: Some(encoded),
                    error: None,
                });
            }
            ItemResult::Skipped => results.push(ItemReport {
                index: outcome.index,
                status: ItemStatus::Skipped,
                data: None,
                error: None,
            }),
            ItemResult::Failed(error) => results.push(ItemReport {
                index: outcome.index,
                status: ItemStatus::Failed,
                data: None,
                error: Some(error),
            }),
        }
    }

    Ok(Json(CompressBatchResponse {
        optimized_files,
        results,
    })
    .into_response())
}

struct CollectedForm {
    files: BTreeMap<usize, Vec<u8>>,
    texts: HashMap<String, String>,
    legacy_file: Option<Vec<u8>>,
    legacy_mode: bool,
}

impl CollectedForm {
    fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }
}

async fn collect_form(mut multipart: Multipart) -> Result<CollectedForm, ApiError> {
    let mut form = CollectedForm {
        files: BTreeMap::new(),
        texts: HashMap::new(),
        legacy_file: None,
        legacy_mode: false,
    };

    while let Some(field) = multipart.next_field().await? {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        if name == "file" {
            form.legacy_file = Some(field.bytes().await?.to_vec());
            form.legacy_mode = true;
        } else if let Some(index) = parse_indexed_name(&name, "file-") {
            form.files.insert(index, field.bytes().await?.to_vec());
        } else {
            if LEGACY_PARAM_FIELDS.contains(&name.as_str()) {
                form.legacy_mode = true;
            }
            form.texts.insert(name, field.text().await?);
        }
    }

    Ok(form)
}

fn parse_indexed_name(name: &str, prefix: &str) -> Option<usize> {
    name.strip_prefix(prefix)?.parse::<usize>().ok()
}
