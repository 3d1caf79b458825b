use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use realcheck_shared::ErrorResponse;

use crate::pipeline::PredictError;

pub const TOO_LARGE_MESSAGE: &str = "File too large. Maximum allowed size is 30 MB.";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please slow down.";
pub const PREDICTION_FAILED_MESSAGE: &str = "Prediction failed";
pub const INTERNAL_MESSAGE: &str = "Internal server error during prediction.";
pub const BAD_REQUEST_MESSAGE: &str = "Invalid request or image file.";

/// Everything a handler can fail with. `Display` is the client-facing
/// message; server-side detail is logged where the error is created.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("No image uploaded")]
    MissingImage,
    #[error("{}", BAD_REQUEST_MESSAGE)]
    BadRequest,
    #[error("{}", TOO_LARGE_MESSAGE)]
    PayloadTooLarge,
    #[error("{}", RATE_LIMITED_MESSAGE)]
    RateLimited,
    #[error("{0}")]
    Csrf(&'static str),
    #[error("{}", PREDICTION_FAILED_MESSAGE)]
    PredictionFailed,
    #[error("{}", INTERNAL_MESSAGE)]
    Internal,
    #[error("Not found")]
    NotFound,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_)
            | ApiError::MissingImage
            | ApiError::BadRequest
            | ApiError::Csrf(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::PredictionFailed | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse::new(self.to_string()))
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Invalid(errors) => {
                let message = errors.join("; ");
                log::warn!("Upload rejected: {}", message);
                ApiError::Validation(message)
            }
            other => {
                log::error!("Prediction failed: {}", other);
                ApiError::PredictionFailed
            }
        }
    }
}

impl From<actix_multipart::MultipartError> for ApiError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        log::warn!("Malformed multipart request: {}", err);
        ApiError::BadRequest
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        log::error!("Blocking prediction task failed: {}", err);
        ApiError::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::InferenceError;
    use crate::pipeline::Stage;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn server_errors_do_not_leak_detail() {
        let err: ApiError = PredictError::Inference {
            stage: Stage::Persisted,
            source: InferenceError::Model("CUDA out of memory at 0xdeadbeef".into()),
        }
        .into();
        let response = err.error_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body()).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.error, PREDICTION_FAILED_MESSAGE);
    }

    #[test]
    fn model_unavailable_is_a_generic_500() {
        let err: ApiError = PredictError::ModelUnavailable.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), PREDICTION_FAILED_MESSAGE);
    }

    #[test]
    fn validation_messages_are_joined() {
        let err: ApiError =
            PredictError::Invalid(vec!["File exceeds 30MB limit".into(), "Invalid file extension".into()])
                .into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "File exceeds 30MB limit; Invalid file extension");
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::PayloadTooLarge.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::Internal.to_string(), INTERNAL_MESSAGE);
    }
}
