use actix_web::{
    Error, ResponseError,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::Method,
};
use futures::future::{Ready, ok};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_NAME: &str = "X-CSRF-Token";
const NONCE_LEN: usize = 16;

/// Issues and checks `<nonce>.<hmac>` tokens signed with the app secret.
#[derive(Clone)]
pub struct CsrfTokens {
    mac: HmacSha256,
}

impl CsrfTokens {
    pub fn new(secret_key: &str) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(secret_key.as_bytes())?,
        })
    }

    pub fn issue(&self) -> String {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);
        let nonce = hex::encode(nonce);
        let signature = self.sign(&nonce);
        format!("{}.{}", nonce, hex::encode(signature))
    }

    pub fn verify(&self, token: &str) -> bool {
        let Some((nonce, signature)) = token.split_once('.') else {
            return false;
        };
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        let mut mac = self.mac.clone();
        mac.update(nonce.as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    fn sign(&self, nonce: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(nonce.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CsrfError {
    Missing,
    Invalid,
}

impl CsrfError {
    fn client_message(&self) -> &'static str {
        match self {
            CsrfError::Missing => "The CSRF token is missing.",
            CsrfError::Invalid => "The CSRF token is invalid.",
        }
    }
}

/// Rejects state-changing requests that lack a valid token, except on
/// exempt paths.
#[derive(Clone)]
pub struct CsrfProtect {
    tokens: Arc<CsrfTokens>,
    exempt: Arc<Vec<&'static str>>,
}

impl CsrfProtect {
    pub fn new(tokens: Arc<CsrfTokens>) -> Self {
        Self {
            tokens,
            exempt: Arc::new(Vec::new()),
        }
    }

    pub fn exempt(mut self, path: &'static str) -> Self {
        Arc::make_mut(&mut self.exempt).push(path);
        self
    }

    fn check(&self, req: &ServiceRequest) -> Result<(), CsrfError> {
        let safe = matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE);
        if safe || self.exempt.iter().any(|path| *path == req.path()) {
            return Ok(());
        }
        let token = req
            .headers()
            .get(HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .ok_or(CsrfError::Missing)?;
        if self.tokens.verify(token) {
            Ok(())
        } else {
            Err(CsrfError::Invalid)
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for CsrfProtect
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Transform = CsrfProtectService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(CsrfProtectService {
            service: Arc::new(service),
            protect: self.clone(),
        })
    }
}

pub struct CsrfProtectService<S> {
    service: Arc<S>,
    protect: CsrfProtect,
}

impl<S, B> Service<ServiceRequest> for CsrfProtectService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<actix_web::body::EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let outcome = self.protect.check(&req);

        Box::pin(async move {
            match outcome {
                Ok(()) => {
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    log::warn!("CSRF check failed for {}: {:?}", req.path(), e);
                    let (http_req, _payload) = req.into_parts();
                    let response = ApiError::Csrf(e.client_message())
                        .error_response()
                        .map_into_right_body();
                    Ok(ServiceResponse::new(http_req, response))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::{TestRequest, call_service, init_service, read_body_json};
    use actix_web::{App, HttpResponse, http::StatusCode, web};

    fn tokens() -> Arc<CsrfTokens> {
        Arc::new(CsrfTokens::new("test-secret").unwrap())
    }

    #[test]
    fn issued_tokens_verify() {
        let tokens = tokens();
        let token = tokens.issue();
        assert!(tokens.verify(&token));
        assert_ne!(token, tokens.issue());
    }

    #[test]
    fn tampered_or_foreign_tokens_fail() {
        let tokens = tokens();
        let token = tokens.issue();
        let (nonce, _) = token.split_once('.').unwrap();
        assert!(!tokens.verify(&format!("{}.{}", nonce, "00".repeat(32))));
        assert!(!tokens.verify("not-a-token"));

        let other = CsrfTokens::new("another-secret").unwrap();
        assert!(!other.verify(&token));
    }

    #[actix_web::test]
    async fn unsafe_requests_need_a_token_unless_exempt() {
        let tokens = tokens();
        let app = init_service(
            App::new()
                .wrap(CsrfProtect::new(tokens.clone()).exempt("/open"))
                .route("/form", web::post().to(HttpResponse::Ok))
                .route("/open", web::post().to(HttpResponse::Ok)),
        )
        .await;

        let req = TestRequest::post().uri("/form").to_request();
        let res = call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = read_body_json(res).await;
        assert_eq!(body["error"], "The CSRF token is missing.");

        let req = TestRequest::post()
            .uri("/form")
            .insert_header((HEADER_NAME, "abc.def"))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::post()
            .uri("/form")
            .insert_header((HEADER_NAME, tokens.issue()))
            .to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);

        let req = TestRequest::post().uri("/open").to_request();
        assert_eq!(call_service(&app, req).await.status(), StatusCode::OK);
    }
}
