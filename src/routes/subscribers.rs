use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};

use crate::authentication::AuthenticatedAdmin;
use crate::store::{StoreError, SubscriberStore};
use crate::utils::{error_chain_fmt, json_error};

#[derive(thiserror::Error)]
pub enum ListSubscribersError {
    #[error("Failed to fetch subscribers.")]
    GetSubscribersError(#[source] StoreError),
}

impl std::fmt::Debug for ListSubscribersError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for ListSubscribersError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        json_error(self.status_code(), self.to_string())
    }
}

/// Every subscriber, most recent first.
#[tracing::instrument(name = "Listing subscribers for the admin panel", skip(_admin, store))]
pub async fn list_subscribers(
    _admin: AuthenticatedAdmin,
    store: web::Data<dyn SubscriberStore>,
) -> Result<HttpResponse, ListSubscribersError> {
    let subscribers = store
        .list_all()
        .await
        .map_err(ListSubscribersError::GetSubscribersError)?;

    Ok(HttpResponse::Ok().json(subscribers))
}
