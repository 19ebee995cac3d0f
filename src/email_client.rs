use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::utils::error_chain_fmt;

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);

pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    sender_name: Option<String>,
    api_key: Option<Secret<String>>,
}

#[derive(serde::Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    html: &'a str,
}

#[derive(thiserror::Error)]
pub enum EmailClientError {
    #[error("Email provider API key is not configured.")]
    MissingApiKey,
    #[error("Failed to send an email through the email provider.")]
    RequestError(#[from] reqwest::Error),
}

impl std::fmt::Debug for EmailClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        sender_name: Option<String>,
        api_key: Option<Secret<String>>,
        timeout: Option<time::Duration>,
    ) -> Result<EmailClient, reqwest::Error> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()?;

        Ok(EmailClient {
            http_client,
            base_url,
            sender,
            sender_name,
            api_key,
        })
    }

    /// Without an API key every send fails with `MissingApiKey`.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn from_header(&self) -> String {
        match &self.sender_name {
            Some(name) => format!("{} <{}>", name, self.sender.as_ref()),
            None => String::from(self.sender.as_ref()),
        }
    }

    #[tracing::instrument(
        name = "Send an email through the email provider",
        skip(self, recipient, html_content),
        fields(recipient = %recipient)
    )]
    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailClientError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(EmailClientError::MissingApiKey)?;
        let url = format!("{}/emails", self.base_url);
        let from = self.from_header();
        let body = SendEmailBody {
            from: &from,
            to: vec![recipient.as_ref()],
            subject,
            html: html_content,
        };

        self.http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}
