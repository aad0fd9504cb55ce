use axum::{extract::State, Json};
use tracing::{error, info};

use super::AppState;
use crate::types::{ImageRequest, ImageResponse};
use crate::upstream::ImageGenerationConfig;
use crate::Error;

// POST /api/generate-image
pub async fn generate_image(
    State(state): State<AppState>,
    Json(request): Json<ImageRequest>,
) -> Result<Json<ImageResponse>, Error> {
    if request.prompt.trim().is_empty() {
        return Err(Error::upstream("prompt must not be empty"));
    }
    info!(prompt = %request.prompt, "generating image");

    let images = state
        .backend
        .generate_images(&request.prompt, &ImageGenerationConfig::default())
        .await
        .map_err(|e| {
            error!(error = %e, "image generation failed");
            e
        })?;

    let image = images.into_iter().next().ok_or_else(|| {
        error!("image model returned no images");
        Error::upstream("No image generated")
    })?;

    Ok(Json(ImageResponse {
        image_bytes: image.image_bytes,
    }))
}
