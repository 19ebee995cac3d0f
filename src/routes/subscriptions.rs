use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Serialize;

use crate::{
    domain::{
        new_subscriber::{NewSubscriber, NewSubscriberBody},
        subscriber::Subscriber,
        subscriber_email::SubscriberEmail,
    },
    email_client::{EmailClient, EmailClientError},
    notifications::{send_signup_notice, send_welcome_email},
    startup::AdminEmail,
    store::{StoreError, SubscriberStore},
    utils::{error_chain_fmt, json_error},
};

pub const SUBSCRIBED_MESSAGE: &str = "Successfully subscribed!";
pub const ALREADY_SUBSCRIBED_MESSAGE: &str = "You're already subscribed! Thanks for your interest.";

#[derive(Debug)]
pub enum SubscribeOutcome {
    Subscribed(Subscriber),
    AlreadySubscribed,
}

impl SubscribeOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            SubscribeOutcome::Subscribed(_) => SUBSCRIBED_MESSAGE,
            SubscribeOutcome::AlreadySubscribed => ALREADY_SUBSCRIBED_MESSAGE,
        }
    }
}

#[derive(Serialize)]
struct SubscribeResponse {
    success: bool,
    message: &'static str,
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Failed to save email. Please try again.")]
    UnexpectedError(#[source] anyhow::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscribeError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), self.to_string())
    }
}

#[tracing::instrument(
    name = "Creating a new subscriber handler",
    skip(body, store, email_client, admin_email),
    fields(subscriber_email = %body.email)
)]
pub async fn handle_create_subscription(
    body: web::Json<NewSubscriberBody>,
    store: web::Data<dyn SubscriberStore>,
    email_client: web::Data<EmailClient>,
    admin_email: web::Data<AdminEmail>,
) -> Result<HttpResponse, SubscribeError> {
    let new_subscriber: NewSubscriber = body.try_into().map_err(|err: String| {
        tracing::warn!("Validation error: {:?}", err);
        SubscribeError::ValidationError(err)
    })?;

    let outcome = subscribe(
        store.get_ref(),
        email_client.get_ref(),
        &admin_email.0,
        &new_subscriber,
    )
    .await?;

    Ok(HttpResponse::Ok().json(SubscribeResponse {
        success: true,
        message: outcome.message(),
    }))
}

/// Stores the subscriber and sends the two courtesy emails.
///
/// The store is authoritative: a duplicate is reported as `AlreadySubscribed`
/// and any other store failure aborts before an email is attempted. Email
/// failures are logged and never change the outcome.
pub async fn subscribe(
    store: &dyn SubscriberStore,
    email_client: &EmailClient,
    admin_email: &SubscriberEmail,
    new_subscriber: &NewSubscriber,
) -> Result<SubscribeOutcome, SubscribeError> {
    let subscriber = match store.insert(new_subscriber).await {
        Ok(subscriber) => subscriber,
        Err(StoreError::DuplicateEntry(email)) => {
            tracing::info!("{} tried to subscribe again", email);
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }
        Err(StoreError::UnexpectedError(err)) => {
            tracing::error!("Failed to insert new subscriber: {:?}", err);
            return Err(SubscribeError::UnexpectedError(err));
        }
    };

    let subscriber_email = &new_subscriber.email;

    discard_notification_error(
        "welcome email",
        subscriber_email,
        send_welcome_email(email_client, subscriber_email, &subscriber.created_at).await,
    );
    discard_notification_error(
        "signup notice",
        admin_email,
        send_signup_notice(
            email_client,
            admin_email,
            subscriber_email,
            &subscriber.created_at,
        )
        .await,
    );

    Ok(SubscribeOutcome::Subscribed(subscriber))
}

fn discard_notification_error(
    kind: &str,
    recipient: &SubscriberEmail,
    result: Result<(), EmailClientError>,
) {
    if let Err(err) = result {
        tracing::warn!("Failed to send the {} to {}: {:?}", kind, recipient, err);
    }
}
