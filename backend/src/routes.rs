use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use serde_json::json;
use shared::ErrorResponse;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::inference::model::{Classifier, InferenceError};
use crate::inference::preprocess::UploadedImage;
use crate::inference::verdict::classify;

const IMAGE_FIELD: &str = "image";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/inference").route(web::post().to(handle_inference)))
        .service(web::resource("/api/health").route(web::get().to(health)));
}

fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: message.into(),
    })
}

struct Upload {
    file_name: Option<String>,
    bytes: Vec<u8>,
}

enum UploadError {
    Missing,
    TooLarge(usize),
}

/// Reads the `image` field, stopping once `limit` bytes are exceeded.
async fn read_upload(payload: &mut Multipart, limit: usize) -> Result<Result<Upload, UploadError>, Error> {
    while let Some(mut field) = payload.try_next().await? {
        let is_image = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map(|name| name == IMAGE_FIELD)
            .unwrap_or(false);
        if !is_image {
            while field.next().await.is_some() {}
            continue;
        }

        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            if bytes.len() + data.len() > limit {
                return Ok(Err(UploadError::TooLarge(limit)));
            }
            bytes.extend_from_slice(&data);
        }

        if bytes.is_empty() {
            return Ok(Err(UploadError::Missing));
        }
        return Ok(Ok(Upload { file_name, bytes }));
    }

    Ok(Err(UploadError::Missing))
}

async fn handle_inference(
    classifier: web::Data<dyn Classifier>,
    config: web::Data<AppConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();

    let upload = match read_upload(&mut payload, config.server.max_upload_bytes).await? {
        Ok(upload) => upload,
        Err(UploadError::Missing) => {
            warn!("[{}] Request without an image", request_id);
            return Ok(error_response(
                StatusCode::BAD_REQUEST,
                "No image uploaded. Attach a JPG, JPEG or PNG file in the `image` field.",
            ));
        }
        Err(UploadError::TooLarge(limit)) => {
            warn!("[{}] Upload exceeds {} bytes", request_id, limit);
            return Ok(error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Image exceeds the {} MB upload limit.", limit / (1024 * 1024)),
            ));
        }
    };

    let input_size = config.model.input_size;
    let classifier = classifier.into_inner();

    let outcome = web::block(move || {
        let image = UploadedImage::decode(upload.file_name, upload.bytes)?;
        let summary = image.summary();
        classify(classifier.as_ref(), &image, input_size).map(|result| (summary, result))
    })
    .await?;

    match outcome {
        Ok((summary, result)) => {
            info!(
                "[{}] {}: argmax {} -> {} ({:.2}%)",
                request_id,
                summary,
                result.predicted,
                result.verdict.headline(),
                result.verdict.confidence
            );
            Ok(HttpResponse::Ok().json(result.into_response(request_id)))
        }
        Err(e @ InferenceError::UnsupportedExtension(_)) => {
            warn!("[{}] {}", request_id, e);
            Ok(error_response(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!("{e}. Accepted types: {}.", shared::ACCEPTED_EXTENSIONS.join(", ")),
            ))
        }
        Err(e @ InferenceError::ImageDecode(_)) => {
            warn!("[{}] {}", request_id, e);
            Ok(error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
        Err(e) => {
            error!("[{}] Model inference error: {}", request_id, e);
            Ok(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Model inference error: {e}"),
            ))
        }
    }
}

async fn health(config: web::Data<AppConfig>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "model": config.model.path.display().to_string(),
    }))
}
