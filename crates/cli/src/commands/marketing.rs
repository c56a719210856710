//! Newsletter and contact commands.

use loopstore_storefront::forms::{self, ContactForm};
use loopstore_storefront::{Storefront, StorefrontError};

use crate::output;

pub async fn newsletter(shop: &Storefront, email: &str) -> Result<(), StorefrontError> {
    let email = forms::newsletter_email(email)?;
    shop.api().subscribe_newsletter(&email).await?;
    output::success(&format!("Subscribed {email} to the newsletter"));
    Ok(())
}

pub async fn contact(
    shop: &Storefront,
    name: String,
    email: String,
    message: String,
) -> Result<(), StorefrontError> {
    let message = ContactForm {
        name,
        email,
        message,
    }
    .validate()?;
    shop.api().submit_contact(&message).await?;
    output::success("Message sent, we will get back to you soon");
    Ok(())
}
