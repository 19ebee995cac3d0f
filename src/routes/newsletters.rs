use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};

use crate::authentication::AuthenticatedAdmin;
use crate::domain::{subscriber::Subscriber, subscriber_email::SubscriberEmail};
use crate::email_client::{EmailClient, EmailClientError};
use crate::store::{StoreError, SubscriberStore};
use crate::utils::{error_chain_fmt, json_error};

const SIMULATION_NOTE: &str =
    "Currently in simulation mode. Add an email provider API key to send real emails.";

#[derive(Deserialize, Debug)]
pub struct NewNewsletter {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, rename = "testEmail", alias = "test_email")]
    pub test_email: Option<String>,
}

/// A validated broadcast request.
#[derive(Debug)]
pub struct Newsletter {
    pub subject: String,
    pub content: String,
    pub test_email: Option<SubscriberEmail>,
}

impl TryFrom<NewNewsletter> for Newsletter {
    type Error = String;

    fn try_from(body: NewNewsletter) -> Result<Self, Self::Error> {
        if body.subject.trim().is_empty() || body.content.trim().is_empty() {
            return Err(String::from("Subject and content are required"));
        }

        let test_email = match body.test_email {
            Some(email) if !email.trim().is_empty() => Some(SubscriberEmail::parse(email)?),
            _ => None,
        };

        Ok(Newsletter {
            subject: body.subject,
            content: body.content,
            test_email,
        })
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    SimulatedSuccess,
}

#[derive(Serialize, Debug)]
pub struct DeliveryResult {
    pub email: String,
    pub status: DeliveryStatus,
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct BroadcastReport {
    pub message: String,
    pub results: Vec<DeliveryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Serialize)]
struct TestSendResponse {
    success: bool,
    message: String,
    recipient: String,
}

#[derive(thiserror::Error)]
pub enum PublishNewsletterError {
    #[error("{0}")]
    ValidationError(String),
    #[error("No newsletter signups found")]
    NoSubscribers,
    #[error(
        "Email provider API key not configured. Please add APP_EMAIL_CLIENT__API_KEY to your environment variables."
    )]
    MissingApiKey,
    #[error("The most recent subscriber has an invalid email address: {0}")]
    InvalidRecipient(String),
    #[error("Failed to send the newsletter email.")]
    SendEmailError(#[source] EmailClientError),
    #[error("Failed to get subscribers from the database.")]
    GetSubscribersError(#[source] StoreError),
}

impl std::fmt::Debug for PublishNewsletterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PublishNewsletterError {
    fn status_code(&self) -> StatusCode {
        match self {
            PublishNewsletterError::ValidationError(_) => StatusCode::BAD_REQUEST,
            PublishNewsletterError::NoSubscribers => StatusCode::NOT_FOUND,
            PublishNewsletterError::MissingApiKey => StatusCode::INTERNAL_SERVER_ERROR,
            PublishNewsletterError::InvalidRecipient(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PublishNewsletterError::SendEmailError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PublishNewsletterError::GetSubscribersError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), self.to_string())
    }
}

#[tracing::instrument(
    name = "Publishing a newsletter to all subscribers",
    skip(_admin, body, store, email_client),
    fields(
        subject = %body.subject,
        test_email = ?body.test_email
    )
)]
pub async fn publish_newsletter(
    _admin: AuthenticatedAdmin,
    body: web::Json<NewNewsletter>,
    store: web::Data<dyn SubscriberStore>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, PublishNewsletterError> {
    let newsletter: Newsletter = body
        .into_inner()
        .try_into()
        .map_err(PublishNewsletterError::ValidationError)?;

    let report = broadcast(store.get_ref(), email_client.get_ref(), &newsletter).await?;

    Ok(HttpResponse::Ok().json(report))
}

#[tracing::instrument(
    name = "Sending a test newsletter to the most recent subscriber",
    skip(_admin, body, store, email_client),
    fields(subject = %body.subject)
)]
pub async fn publish_test_newsletter(
    _admin: AuthenticatedAdmin,
    body: web::Json<NewNewsletter>,
    store: web::Data<dyn SubscriberStore>,
    email_client: web::Data<EmailClient>,
) -> Result<HttpResponse, PublishNewsletterError> {
    let newsletter: Newsletter = body
        .into_inner()
        .try_into()
        .map_err(PublishNewsletterError::ValidationError)?;

    let recipient = send_test(store.get_ref(), email_client.get_ref(), &newsletter).await?;

    Ok(HttpResponse::Ok().json(TestSendResponse {
        success: true,
        message: format!("Test email sent successfully to {}", recipient),
        recipient: recipient.to_string(),
    }))
}

/// Sends the newsletter to every active subscriber (or only `test_email`).
///
/// Each recipient gets an independent send and its own entry in the report.
pub async fn broadcast(
    store: &dyn SubscriberStore,
    email_client: &EmailClient,
    newsletter: &Newsletter,
) -> Result<BroadcastReport, PublishNewsletterError> {
    let mut recipients = store
        .list_active()
        .await
        .map_err(PublishNewsletterError::GetSubscribersError)?;

    if let Some(test_email) = &newsletter.test_email {
        recipients.retain(|subscriber| {
            subscriber
                .email
                .eq_ignore_ascii_case(test_email.as_ref())
        });
    }

    if recipients.is_empty() {
        let message = match &newsletter.test_email {
            Some(test_email) => format!("No subscriber found with email: {}", test_email),
            None => String::from("No subscribers found"),
        };

        return Ok(BroadcastReport {
            message,
            results: Vec::new(),
            note: None,
        });
    }

    let simulated = !email_client.is_configured();
    let mut results = Vec::with_capacity(recipients.len());

    for subscriber in &recipients {
        results.push(deliver(email_client, subscriber, newsletter, simulated).await);
    }

    Ok(BroadcastReport {
        message: format!("Processed {} email(s)", results.len()),
        results,
        note: simulated.then(|| String::from(SIMULATION_NOTE)),
    })
}

async fn deliver(
    email_client: &EmailClient,
    subscriber: &Subscriber,
    newsletter: &Newsletter,
    simulated: bool,
) -> DeliveryResult {
    let email = subscriber.email.clone();
    let recipient = match SubscriberEmail::parse(subscriber.email.clone()) {
        Ok(recipient) => recipient,
        Err(reason) => {
            tracing::warn!("Skipping stored subscriber {}: {}", email, reason);
            return DeliveryResult {
                email,
                status: DeliveryStatus::Failed,
                message: reason,
            };
        }
    };

    if simulated {
        tracing::info!("Would send '{}' to {}", newsletter.subject, email);
        return DeliveryResult {
            email,
            status: DeliveryStatus::SimulatedSuccess,
            message: String::from("Email would be sent (simulation mode)"),
        };
    }

    match email_client
        .send_email(&recipient, &newsletter.subject, &newsletter.content)
        .await
    {
        Ok(()) => DeliveryResult {
            email,
            status: DeliveryStatus::Sent,
            message: String::from("Email sent"),
        },
        Err(err) => {
            tracing::error!("Failed to send newsletter to {}: {:?}", email, err);
            DeliveryResult {
                email,
                status: DeliveryStatus::Failed,
                message: err.to_string(),
            }
        }
    }
}

/// Sends the newsletter to the single most recently stored active subscriber.
pub async fn send_test(
    store: &dyn SubscriberStore,
    email_client: &EmailClient,
    newsletter: &Newsletter,
) -> Result<SubscriberEmail, PublishNewsletterError> {
    let subscriber = store
        .most_recent_active()
        .await
        .map_err(PublishNewsletterError::GetSubscribersError)?
        .ok_or(PublishNewsletterError::NoSubscribers)?;

    if !email_client.is_configured() {
        return Err(PublishNewsletterError::MissingApiKey);
    }

    let recipient = SubscriberEmail::parse(subscriber.email.clone())
        .map_err(|_| PublishNewsletterError::InvalidRecipient(subscriber.email))?;

    tracing::info!("Sending test email to {}", recipient);

    email_client
        .send_email(&recipient, &newsletter.subject, &newsletter.content)
        .await
        .map_err(PublishNewsletterError::SendEmailError)?;

    Ok(recipient)
}
