use actix_web::dev::Payload;
use actix_web::http::header::{self, HeaderMap, HeaderValue};
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{web, FromRequest, HttpRequest, HttpResponse, ResponseError};
use secrecy::{ExposeSecret, Secret};
use std::future::{ready, Ready};
use subtle::ConstantTimeEq;

use crate::utils::{error_chain_fmt, json_error};

/// Token expected in `Authorization: Bearer <token>` on the /admin routes.
pub struct AdminToken(pub Secret<String>);

#[derive(thiserror::Error)]
pub enum AdminAuthError {
    #[error("The 'Authorization' header was missing or malformed.")]
    MissingCredentials,
    #[error("Invalid admin token.")]
    InvalidToken,
}

impl std::fmt::Debug for AdminAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for AdminAuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = json_error(self.status_code(), self.to_string());
        response.headers_mut().insert(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(r#"Bearer realm="admin""#),
        );
        response
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AdminAuthError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AdminAuthError::MissingCredentials)
}

fn tokens_match(provided: &[u8], expected: &[u8]) -> bool {
    provided.ct_eq(expected).into()
}

pub fn authorize_admin(headers: &HeaderMap, expected: &AdminToken) -> Result<(), AdminAuthError> {
    let provided = bearer_token(headers)?;

    if !tokens_match(provided.as_bytes(), expected.0.expose_secret().as_bytes()) {
        tracing::warn!("Rejected admin request with an invalid token");
        return Err(AdminAuthError::InvalidToken);
    }

    Ok(())
}

/// Extractor admitting only requests that carry the configured admin token.
#[derive(Debug)]
pub struct AuthenticatedAdmin;

impl FromRequest for AuthenticatedAdmin {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(request: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match request.app_data::<web::Data<AdminToken>>() {
            Some(token) => authorize_admin(request.headers(), token)
                .map(|()| AuthenticatedAdmin)
                .map_err(actix_web::Error::from),
            None => {
                tracing::error!("Admin token is missing from the application data");
                let response = json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Admin routes are not configured.",
                );
                Err(InternalError::from_response("Admin token is not configured", response).into())
            }
        };

        ready(result)
    }
}
