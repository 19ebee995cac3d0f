use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::error::InternalError;
use actix_web::http::{header, StatusCode};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::authentication::AdminToken;
use crate::config::{DatabaseSettings, Settings};
use crate::domain::subscriber_email::SubscriberEmail;
use crate::email_client::EmailClient;
use crate::routes::{
    handle_create_subscription, health_check, list_subscribers, publish_newsletter,
    publish_test_newsletter, resend_welcome_email,
};
use crate::store::{PgSubscriberStore, SubscriberStore};
use crate::utils::json_error;

/// Operator address receiving the new-signup notices.
pub struct AdminEmail(pub SubscriberEmail);

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let db_pool = get_connection_db_pool(&config.database);
        let sender_email = config
            .get_email_client_sender()
            .map_err(anyhow::Error::msg)
            .context("Sender email is not valid")?;
        let admin_email = config
            .get_email_client_admin()
            .map_err(anyhow::Error::msg)
            .context("Admin email is not valid")?;
        let api_key = config.get_email_client_api();

        if api_key.is_none() {
            tracing::warn!("No email provider API key configured, emails will not be delivered");
        }

        let email_client = EmailClient::new(
            config.get_email_client_base_url(),
            sender_email,
            config.email_client.get_sender_name(),
            api_key,
            Some(config.email_client.get_timeout()),
        )
        .context("Failed to build the email HTTP client")?;

        let listener = TcpListener::bind(config.get_address())
            .with_context(|| format!("Failed to bind the address {}", config.get_address()))?;
        let port = listener.local_addr()?.port();
        let store: Arc<dyn SubscriberStore> = Arc::new(PgSubscriberStore::new(db_pool));
        let server = run(
            listener,
            store,
            email_client,
            AdminEmail(admin_email),
            AdminToken(config.get_admin_token()),
            config.get_allowed_origins(),
        )?;

        tracing::info!("Server listening on {}:{}", config.application.get_host(), port);

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

/// Malformed JSON bodies get the same `{"error": ...}` shape as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _request| {
        tracing::warn!("Rejected request body: {:?}", err);
        let response = json_error(StatusCode::BAD_REQUEST, "Invalid request body");
        InternalError::from_response(err, response).into()
    })
}

/// Browser access for the landing page and the admin panel. An empty list or `*` allows any origin.
pub fn cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-client-info"),
            header::HeaderName::from_static("apikey"),
        ])
        .max_age(3600);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }

    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn SubscriberStore>,
    email_client: EmailClient,
    admin_email: AdminEmail,
    admin_token: AdminToken,
    allowed_origins: Vec<String>,
) -> Result<Server, std::io::Error> {
    let store: web::Data<dyn SubscriberStore> = web::Data::from(store);
    let email_client = web::Data::new(email_client);
    let admin_email = web::Data::new(admin_email);
    let admin_token = web::Data::new(admin_token);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(cors(&allowed_origins))
            .wrap(TracingLogger::default())
            .app_data(json_config())
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(handle_create_subscription))
            .service(
                web::scope("/admin")
                    .route("/subscribers", web::get().to(list_subscribers))
                    .route("/newsletters", web::post().to(publish_newsletter))
                    .route("/newsletters/test", web::post().to(publish_test_newsletter))
                    .route("/welcome", web::post().to(resend_welcome_email)),
            )
            .app_data(store.clone())
            .app_data(email_client.clone())
            .app_data(admin_email.clone())
            .app_data(admin_token.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}
