use chrono::{DateTime, Utc};

use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::{EmailClient, EmailClientError};

pub const WELCOME_SUBJECT: &str = "Welcome to TradixAI - You're on the list!";
pub const SIGNUP_NOTICE_SUBJECT: &str = "New TradixAI Newsletter Signup";

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn welcome_email_html(email: &SubscriberEmail, subscribed_at: &DateTime<Utc>) -> String {
    format!(
        r#"
            <div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
                <h1>TradixAI</h1>
                <h2>Thank you for signing up!</h2>
                <p>We're excited to have you join our community of forward-thinking traders and AI enthusiasts.</p>
                <p>You'll be the first to know about:</p>
                <ul>
                    <li>Exclusive early access to our platform</li>
                    <li>Latest AI trading insights and strategies</li>
                    <li>Product updates and new features</li>
                </ul>
                <p>This address ({}) joined the list on {}.</p>
                <p>If you didn't sign up for this newsletter, you can safely ignore this email.</p>
            </div>
        "#,
        htmlescape::encode_minimal(email.as_ref()),
        format_timestamp(subscribed_at)
    )
}

pub fn signup_notice_html(email: &SubscriberEmail, subscribed_at: &DateTime<Utc>) -> String {
    format!(
        r#"
            <div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
                <h2>New Newsletter Signup</h2>
                <p>A new user has signed up for the TradixAI newsletter:</p>
                <p><strong>Email: {}</strong></p>
                <p>Signed up at: {}</p>
            </div>
        "#,
        htmlescape::encode_minimal(email.as_ref()),
        format_timestamp(subscribed_at)
    )
}

#[tracing::instrument(
    name = "Send a welcome email to a new subscriber",
    skip(email_client, subscriber_email, subscribed_at),
    fields(subscriber_email = %subscriber_email)
)]
pub async fn send_welcome_email(
    email_client: &EmailClient,
    subscriber_email: &SubscriberEmail,
    subscribed_at: &DateTime<Utc>,
) -> Result<(), EmailClientError> {
    let html_body = welcome_email_html(subscriber_email, subscribed_at);

    email_client
        .send_email(subscriber_email, WELCOME_SUBJECT, &html_body)
        .await
}

#[tracing::instrument(
    name = "Notify the operator about a new subscriber",
    skip(email_client, admin_email, subscriber_email, subscribed_at),
    fields(subscriber_email = %subscriber_email)
)]
pub async fn send_signup_notice(
    email_client: &EmailClient,
    admin_email: &SubscriberEmail,
    subscriber_email: &SubscriberEmail,
    subscribed_at: &DateTime<Utc>,
) -> Result<(), EmailClientError> {
    let html_body = signup_notice_html(subscriber_email, subscribed_at);

    email_client
        .send_email(admin_email, SIGNUP_NOTICE_SUBJECT, &html_body)
        .await
}
