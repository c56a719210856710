//! Newsletter and contact form endpoints.

use reqwest::Method;
use serde::Serialize;
use tracing::instrument;

use loopstore_core::Email;

use super::client::ApiClient;
use super::types::ContactMessage;
use super::ApiError;

#[derive(Serialize)]
struct Subscription<'a> {
    email: &'a str,
}

impl ApiClient {
    /// Subscribe an address to the newsletter.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` if the API rejects the address (e.g.
    /// already subscribed), or an error if the request fails.
    #[instrument(skip(self, email), fields(email_domain = %email.domain()))]
    pub async fn subscribe_newsletter(&self, email: &Email) -> Result<(), ApiError> {
        self.send_ignoring_body(
            Method::POST,
            self.endpoint("newsletter/subscribe/")?,
            Some(&Subscription {
                email: email.as_str(),
            }),
        )
        .await
    }

    /// Send a contact form message.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects the message or the request fails.
    #[instrument(skip(self, message), fields(email_domain = %message.email.domain()))]
    pub async fn submit_contact(&self, message: &ContactMessage) -> Result<(), ApiError> {
        self.send_ignoring_body(Method::POST, self.endpoint("contact/")?, Some(message))
            .await
    }
}
