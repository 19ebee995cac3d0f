use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::authentication::AuthenticatedAdmin;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::{EmailClient, EmailClientError};
use crate::notifications::send_welcome_email;
use crate::utils::{error_chain_fmt, json_error};

#[derive(Deserialize, Debug)]
pub struct WelcomeEmailBody {
    #[serde(default)]
    pub email: String,
}

#[derive(Serialize)]
struct WelcomeEmailResponse {
    success: bool,
    message: &'static str,
}

#[derive(thiserror::Error)]
pub enum WelcomeEmailError {
    #[error("Email is required")]
    MissingEmail,
    #[error("{0}")]
    ValidationError(String),
    #[error("Email service not configured - missing API key")]
    MissingApiKey,
    #[error("Failed to send email")]
    SendEmailError(#[source] EmailClientError),
}

impl std::fmt::Debug for WelcomeEmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for WelcomeEmailError {
    fn status_code(&self) -> StatusCode {
        match self {
            WelcomeEmailError::MissingEmail | WelcomeEmailError::ValidationError(_) => {
                StatusCode::BAD_REQUEST
            }
            WelcomeEmailError::MissingApiKey | WelcomeEmailError::SendEmailError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), self.to_string())
    }
}

/// Re-sends the welcome email to one address, without touching the store.
#[tracing::instrument(
    name = "Resending a welcome email",
    skip(_admin, body, email_client),
    fields(subscriber_email = %body.email)
)]
pub async fn resend_welcome_email(
    _admin: AuthenticatedAdmin,
    body: web::Json<WelcomeEmailBody>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, WelcomeEmailError> {
    send_welcome(email_client.get_ref(), body.into_inner().email).await?;

    Ok(HttpResponse::Ok().json(WelcomeEmailResponse {
        success: true,
        message: "Welcome email sent successfully",
    }))
}

pub async fn send_welcome(
    email_client: &EmailClient,
    email: String,
) -> Result<SubscriberEmail, WelcomeEmailError> {
    if email.trim().is_empty() {
        return Err(WelcomeEmailError::MissingEmail);
    }

    let recipient = SubscriberEmail::parse(email).map_err(WelcomeEmailError::ValidationError)?;

    if !email_client.is_configured() {
        return Err(WelcomeEmailError::MissingApiKey);
    }

    send_welcome_email(email_client, &recipient, &Utc::now())
        .await
        .map_err(WelcomeEmailError::SendEmailError)?;

    Ok(recipient)
}
