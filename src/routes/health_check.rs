use actix_web::HttpResponse;

/// Liveness check, always `200` with an empty body.
#[tracing::instrument(name = "Health Check handler")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().finish()
}
