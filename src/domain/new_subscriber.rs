use actix_web::web;
use serde::Deserialize;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_source::SubscriberSource;

#[derive(Debug)]
pub struct NewSubscriber {
    pub email: SubscriberEmail,
    pub source: SubscriberSource,
}

#[derive(Deserialize)]
pub struct NewSubscriberBody {
    pub email: String,
    pub source: Option<String>,
}

impl TryFrom<NewSubscriberBody> for NewSubscriber {
    type Error = String;

    fn try_from(body: NewSubscriberBody) -> Result<Self, Self::Error> {
        let email = SubscriberEmail::parse(body.email)?;
        let source = match body.source {
            Some(source) => SubscriberSource::parse(source)?,
            None => SubscriberSource::default(),
        };

        Ok(NewSubscriber { email, source })
    }
}

impl TryFrom<web::Json<NewSubscriberBody>> for NewSubscriber {
    type Error = String;

    fn try_from(body: web::Json<NewSubscriberBody>) -> Result<Self, Self::Error> {
        body.into_inner().try_into()
    }
}
