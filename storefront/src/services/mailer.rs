// storefront/src/services/mailer.rs

//! Outgoing account and order mail. Delivery is simulated through the log.

use async_trait::async_trait;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::models::Order;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
  pub to: String,
  pub subject: String,
  pub html_body: String,
}

#[derive(Debug)]
pub struct SentMail {
  pub to: String,
  pub from: String,
  pub subject: String,
  pub body_preview: String,
  pub message_id: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
  async fn send(&self, mail: &OutgoingMail) -> Result<SentMail>;
}

/// Writes every mail to the log instead of an SMTP relay.
#[derive(Debug, Clone)]
pub struct LogMailer {
  sender: String,
}

impl LogMailer {
  pub fn new(sender: impl Into<String>) -> Self {
    Self { sender: sender.into() }
  }
}

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, mail: &OutgoingMail) -> Result<SentMail> {
    if !mail.to.contains('@') {
      return Err(AppError::Internal(format!("Cannot deliver mail to '{}'", mail.to)));
    }
    let body_preview = mail.html_body.chars().take(50).collect::<String>() + "...";
    let message_id = format!("log_mail_{}", uuid::Uuid::new_v4());
    info!(
      to = %mail.to,
      from = %self.sender,
      subject = %mail.subject,
      %message_id,
      body = %mail.html_body,
      "Mail dispatched."
    );
    Ok(SentMail {
      to: mail.to.clone(),
      from: self.sender.clone(),
      subject: mail.subject.clone(),
      body_preview,
      message_id,
    })
  }
}

pub fn confirmation_mail(config: &AppConfig, to: &str, token: &str) -> OutgoingMail {
  let link = format!("{}/api/v1/auth/confirm/{}", config.app_base_url, token);
  OutgoingMail {
    to: to.to_string(),
    subject: "Please confirm your email".to_string(),
    html_body: format!(
      "<p>Welcome! Thanks for signing up. Please follow this link to activate your account:</p>\
       <p><a href=\"{link}\">{link}</a></p>"
    ),
  }
}

pub fn reset_password_mail(config: &AppConfig, to: &str, token: &str) -> OutgoingMail {
  let link = format!("{}/api/v1/auth/reset/{}", config.app_base_url, token);
  OutgoingMail {
    to: to.to_string(),
    subject: "Reset password".to_string(),
    html_body: format!(
      "<p>To reset your password, visit the following link:</p><p><a href=\"{link}\">{link}</a></p>\
       <p>If you did not make this request then simply ignore this email.</p>"
    ),
  }
}

pub fn order_placed_mail(to: &str, username: &str, order: &Order) -> OutgoingMail {
  OutgoingMail {
    to: to.to_string(),
    subject: format!("Order {} received", order.id),
    html_body: format!(
      "<p>Hi {}, we received your order of {} item(s) for {}.{:02}.</p>",
      username,
      order.total_items(),
      order.total_sum_cents() / 100,
      order.total_sum_cents() % 100
    ),
  }
}

#[cfg(test)]
pub use recording::RecordingMailer;
