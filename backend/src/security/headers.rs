use actix_web::middleware::DefaultHeaders;

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self' https://cdnjs.cloudflare.com; \
     style-src 'self' 'unsafe-inline' https://cdnjs.cloudflare.com; \
     script-src 'self' 'unsafe-inline'; \
     img-src 'self' data:; \
     font-src 'self' https://cdnjs.cloudflare.com; \
     frame-src https://www.youtube.com https://www.youtube-nocookie.com;";

/// Hardening headers added to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains",
        ))
        .add(("Content-Security-Policy", CONTENT_SECURITY_POLICY))
}
