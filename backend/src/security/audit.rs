use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use chrono::Utc;
use futures::future::{Ready, ok};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::client_address;

/// Append-only security log file.
pub struct AuditSink {
    file: Mutex<File>,
}

impl AuditSink {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    pub async fn record(&self, client: &str, endpoint: &str) {
        let line = format!(
            "{} - INFO - {} → {}\n",
            Utc::now().to_rfc3339(),
            client,
            endpoint
        );
        let mut file = self.file.lock().await;
        if let Err(e) = file.write_all(line.as_bytes()).await {
            log::error!("Failed to write security log entry: {}", e);
            return;
        }
        if let Err(e) = file.flush().await {
            log::error!("Failed to flush security log: {}", e);
        }
    }
}

/// Logs the client address and endpoint of every request.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<AuditSink>,
}

impl AuditLog {
    pub fn new(sink: Arc<AuditSink>) -> Self {
        Self { sink }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuditLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuditLogService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuditLogService {
            service: Arc::new(service),
            sink: self.sink.clone(),
        })
    }
}

pub struct AuditLogService<S> {
    service: Arc<S>,
    sink: Arc<AuditSink>,
}

impl<S, B> Service<ServiceRequest> for AuditLogService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let sink = self.sink.clone();

        Box::pin(async move {
            let client = client_address(&req);
            let endpoint = req
                .match_name()
                .map(str::to_string)
                .unwrap_or_else(|| req.path().to_string());
            log::info!("{} → {}", client, endpoint);
            sink.record(&client, &endpoint).await;

            service.call(req).await
        })
    }
}
