use actix_files::Files;
use actix_multipart::Multipart;
use actix_web::http::header::{self, ContentType};
use actix_web::{HttpRequest, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use realcheck_shared::PredictionResponse;
use serde_json::json;
use std::sync::Arc;

use crate::error::ApiError;
use crate::pipeline::PredictionPipeline;
use crate::security::csrf::CsrfTokens;
use crate::security::rate_limit::{ClientRateLimiter, RateLimit};
use crate::upload::{MAX_FILE_SIZE, UploadedFile};

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");
const IMAGE_FIELD: &str = "image";
const MAX_CONTENT_LENGTH: usize = MAX_FILE_SIZE;

/// Static details reported by `/health`.
pub struct ServiceInfo {
    pub model_name: String,
}

#[derive(Clone)]
pub struct RouteLimits {
    pub index: Arc<ClientRateLimiter>,
    pub predict: Arc<ClientRateLimiter>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig, limits: RouteLimits, static_dir: String) {
    cfg.service(
        web::resource("/")
            .name("index")
            .wrap(RateLimit::new(limits.index.clone(), "index"))
            .route(web::get().to(index)),
    )
    .service(
        web::resource("/predict")
            .name("predict")
            .wrap(RateLimit::new(limits.predict.clone(), "predict"))
            .route(web::post().to(predict)),
    )
    .service(web::resource("/health").name("health").route(web::get().to(health)))
    .service(Files::new("/static", static_dir));
}

pub async fn not_found() -> Result<HttpResponse, ApiError> {
    Err(ApiError::NotFound)
}

async fn index(csrf: web::Data<CsrfTokens>) -> HttpResponse {
    let page = INDEX_TEMPLATE.replace("{{ csrf_token }}", &csrf.issue());
    HttpResponse::Ok().content_type(ContentType::html()).body(page)
}

async fn health(pipeline: web::Data<PredictionPipeline>, info: web::Data<ServiceInfo>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "model": info.model_name,
        "model_loaded": pipeline.model().is_loaded(),
    }))
}

async fn predict(
    req: HttpRequest,
    pipeline: web::Data<PredictionPipeline>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    if declared_length(&req).is_some_and(|len| len > MAX_CONTENT_LENGTH) {
        log::warn!("Rejected upload with oversized Content-Length");
        return Err(ApiError::PayloadTooLarge);
    }

    let upload = read_image_field(payload).await?.ok_or(ApiError::MissingImage)?;
    pipeline.validate(Some(&upload))?;

    let pipeline = pipeline.into_inner();
    let verdict = web::block(move || pipeline.process(&upload)).await??;
    log::info!("Prediction: {} ({:.2}%)", verdict.label, verdict.confidence);

    Ok(HttpResponse::Ok().json(PredictionResponse::from(verdict)))
}

fn declared_length(req: &HttpRequest) -> Option<usize> {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

/// Buffers the first `image` part, enforcing the size cap while streaming.
async fn read_image_field(mut payload: Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(mut field) = payload.try_next().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .unwrap_or_default()
            .to_string();
        let content_type = field.content_type().map(|mime| mime.to_string());

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > MAX_CONTENT_LENGTH {
                log::warn!("Upload stream for {:?} exceeded the size limit", filename);
                return Err(ApiError::PayloadTooLarge);
            }
            data.extend_from_slice(&chunk);
        }
        return Ok(Some(UploadedFile::new(filename, content_type, data)));
    }
    Ok(None)
}
