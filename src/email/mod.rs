//! Outbound email broadcasts for the event lifecycle.

use anyhow::Context;
use askama::Template;
use mailgun_v3::email::{self, Message, MessageBody};
use mailgun_v3::{Credentials, EmailAddress};

pub mod event;

pub const SENDER_NAME: &str = "Fanfare";
pub const SENDER_EMAIL: &str = "mail@fanfare.band";
pub const MAILGUN_DOMAIN: &str = "mail.fanfare.band";

pub trait Email: Template {
    fn subject(&self) -> String;
}

/// Sends one message with every recipient in BCC, so members never see each
/// other's addresses.
pub async fn send_broadcast(email: &impl Email, recipients: &[String]) -> anyhow::Result<()> {
    if recipients.is_empty() {
        return Ok(());
    }

    let token = std::env::var("MAILGUN_TOKEN").context("`MAILGUN_TOKEN` not set")?;
    let creds = Credentials::new(token, MAILGUN_DOMAIN);

    let sender = EmailAddress::name_address(SENDER_NAME.to_owned(), SENDER_EMAIL.to_owned());
    let message = Message {
        to: vec![EmailAddress::address(SENDER_EMAIL.to_owned())],
        bcc: recipients
            .iter()
            .map(|recipient| EmailAddress::address(recipient.clone()))
            .collect(),
        subject: email.subject(),
        body: MessageBody::Html(email.render().context("Failed to render email")?),
        ..Default::default()
    };

    email::async_impl::send_email(&creds, &sender, message)
        .await
        .map(|_| ())
        .map_err(|err| anyhow::anyhow!("Failed to send email: {err}"))
}

/// Fire-and-forget dispatch: the triggering write is already committed, so a
/// delivery failure only gets logged.
pub fn dispatch(email: impl Email + Send + Sync + 'static, recipients: Vec<String>) {
    tokio::spawn(async move {
        if let Err(error) = send_broadcast(&email, &recipients).await {
            tracing::warn!(%error, "failed to send broadcast email");
        }
    });
}
