//! `POST /optimize`: the remote-service contract.
//!
//! Accepts repeated `image` parts plus shared `quality`, `scale`, and
//! `format` fields. This wire format carries no caller-supplied dimensions,
//! so scale applies to the actual decoded dimensions of each image.

use std::collections::HashMap;
use std::io::Cursor;

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domains::optimization::{BatchItem, ItemResult, OptimizeParams};
use super::error::ApiError;
use super::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct OptimizeResponse {
    pub message: String,
    pub processed_images: Vec<String>,
}

pub async fn optimize(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OptimizeResponse>, ApiError> {
    let mut images: Vec<Vec<u8>> = Vec::new();
    let mut texts: HashMap<String, String> = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if name == "image" {
            images.push(field.bytes().await?.to_vec());
        } else {
            texts.insert(name, field.text().await?);
        }
    }

    // Shared parameters apply to the whole submission, so a bad value here
    // rejects the request rather than a single item.
    let base = OptimizeParams::from_fields(
        texts.get("format").map(String::as_str),
        texts.get("quality").map(String::as_str),
        texts.get("scale").map(String::as_str),
        None,
        None,
    )
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let total = images.len();
    let items: Vec<BatchItem> = images
        .into_iter()
        .enumerate()
        .map(|(index, data)| {
            let params = match probe_dimensions(&data) {
                Some((width, height)) => OptimizeParams {
                    source_width: width,
                    source_height: height,
                    ..base
                },
                // Undecodable input fails in the transcoder and is dropped below
                None => base,
            };
            BatchItem {
                index,
                file: Some(data),
                params: Ok(params),
            }
        })
        .collect();

    let outcomes = state.service.optimize_batch(items).await;

    let mut processed_images = Vec::new();
    for outcome in outcomes {
        match outcome.result {
            ItemResult::Ok(image) => processed_images.push(format!(
                "data:{};base64,{}",
                image.format.mime_type(),
                base64::encode(&image.bytes)
            )),
            ItemResult::Skipped => {}
            ItemResult::Failed(error) => {
                log::warn!("Optimize item {}: {}", outcome.index, error);
            }
        }
    }

    Ok(Json(OptimizeResponse {
        message: format!("Processed {} of {} images", processed_images.len(), total),
        processed_images,
    }))
}

/// Read the pixel dimensions from the image header, without a full decode.
fn probe_dimensions(data: &[u8]) -> Option<(u32, u32)> {
    image::io::Reader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{multipart_request, png_fixture, test_router, MultipartField};
    use axum::http::StatusCode;
    use image::GenericImageView;
    use tower::ServiceExt;

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_scale_applies_to_decoded_dimensions() {
        let app = test_router();
        let request = multipart_request(
            "/optimize",
            vec![
                MultipartField::file("image", "a.png", png_fixture(100, 40)),
                MultipartField::file("image", "b.png", png_fixture(60, 60)),
                MultipartField::text("quality", "80"),
                MultipartField::text("scale", "50"),
                MultipartField::text("format", "png"),
            ],
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;

        let processed = json["processed_images"].as_array().unwrap();
        assert_eq!(processed.len(), 2);
        assert_eq!(json["message"], "Processed 2 of 2 images");

        let expected = [(50u32, 20u32), (30, 30)];
        for (reference, want) in processed.iter().zip(expected) {
            let reference = reference.as_str().unwrap();
            let payload = reference.strip_prefix("data:image/png;base64,").unwrap();
            let bytes = base64::decode(payload).unwrap();
            assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), want);
        }
    }

    #[tokio::test]
    async fn test_undecodable_image_is_dropped_from_results() {
        let app = test_router();
        let request = multipart_request(
            "/optimize",
            vec![
                MultipartField::file("image", "a.png", png_fixture(10, 10)),
                MultipartField::file("image", "junk.bin", b"junk".to_vec()),
                MultipartField::text("format", "png"),
            ],
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["processed_images"].as_array().unwrap().len(), 1);
        assert_eq!(json["message"], "Processed 1 of 2 images");
    }

    #[tokio::test]
    async fn test_invalid_shared_quality_rejects_request() {
        let app = test_router();
        let request = multipart_request(
            "/optimize",
            vec![
                MultipartField::file("image", "a.png", png_fixture(10, 10)),
                MultipartField::text("quality", "very-high"),
            ],
        );

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
