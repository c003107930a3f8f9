use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::SmtpConfig;
use crate::error::AppError;
use crate::models::contact::ContactSubmission;

/// A contact email ready for the transport.
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Seam between the contact route and the delivery mechanism. Production uses
/// SMTP; development without SMTP configuration logs the mail instead.
pub trait ContactMailer: Send + Sync {
    fn send(&self, mail: &OutgoingMail) -> Result<(), AppError>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, AppError> {
        // 465 is implicit TLS, anything else goes through STARTTLS.
        let builder = if config.port == 465 {
            SmtpTransport::relay(&config.host)
        } else {
            SmtpTransport::starttls_relay(&config.host)
        }
        .map_err(|err| AppError::Config(format!("invalid SMTP relay: {err}")))?;

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        let from = config
            .from
            .parse()
            .map_err(|err| AppError::Config(format!("invalid EMAIL_FROM: {err}")))?;
        let to = config
            .to
            .parse()
            .map_err(|err| AppError::Config(format!("invalid EMAIL_TO: {err}")))?;

        Ok(Self {
            transport,
            from,
            to,
        })
    }
}

impl ContactMailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), AppError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(&mail.subject)
            .multipart(MultiPart::alternative_plain_html(
                mail.text.clone(),
                mail.html.clone(),
            ))
            .map_err(|err| AppError::Mail(err.to_string()))?;

        let response = self
            .transport
            .send(&message)
            .map_err(|err| AppError::Mail(err.to_string()))?;
        info!(code = %response.code(), "contact email accepted by relay");
        Ok(())
    }
}

/// Development fallback: no SMTP configured, log the mail and report success.
pub struct LogMailer;

impl ContactMailer for LogMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), AppError> {
        info!(subject = %mail.subject, "email not sent (no SMTP configured)");
        info!("{}", mail.text);
        Ok(())
    }
}

/// Formats a validated submission into subject, plain-text and HTML bodies.
pub fn contact_email(submission: &ContactSubmission) -> OutgoingMail {
    let name = submission.name();
    let subject = match submission.event_category.as_deref().map(str::trim) {
        Some(category) if !category.is_empty() => {
            format!("New inquiry from {name} - {category}")
        }
        _ => format!("New inquiry from {name}"),
    };

    let field = |value: &Option<String>| -> String {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("N/A")
            .to_string()
    };
    let email = field(&submission.email);
    let message = field(&submission.message);

    let text = format!(
        "New contact form submission:\n\n\
         - Name: {name}\n\
         - Email: {email}\n\
         - Phone: {phone}\n\
         - Event Location: {location}\n\
         - Event Category: {category}\n\
         - Event Type: {event_type}\n\
         - Start Date: {start}\n\
         - End Date: {end}\n\n\
         Message:\n{message}\n",
        phone = field(&submission.phone),
        location = field(&submission.location),
        category = field(&submission.event_category),
        event_type = field(&submission.event_type),
        start = field(&submission.event_date_start),
        end = field(&submission.event_date_end),
    );

    let html = format!(
        "<div style=\"font-family: Arial, sans-serif; line-height: 1.6; max-width: 600px;\">\
         <h2>New inquiry from {name}</h2>\
         <h3>Contact</h3>\
         <p><strong>Email:</strong> <a href=\"mailto:{email}\">{email}</a><br>\
         <strong>Phone:</strong> {phone}</p>\
         <h3>Event</h3>\
         <p><strong>Category:</strong> {category}<br>\
         <strong>Type:</strong> {event_type}<br>\
         <strong>Location:</strong> {location}<br>\
         <strong>Dates:</strong> {start} to {end}</p>\
         <h3>Message</h3>\
         <p>{message_html}</p>\
         </div>",
        phone = field(&submission.phone),
        location = field(&submission.location),
        category = field(&submission.event_category),
        event_type = field(&submission.event_type),
        start = field(&submission.event_date_start),
        end = field(&submission.event_date_end),
        message_html = message.replace('\n', "<br>"),
    );

    OutgoingMail {
        subject,
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_contains_name_and_category() {
        let submission = ContactSubmission {
            name: Some("Ada Lovelace".into()),
            email: Some("ada@example.com".into()),
            event_category: Some("Wedding".into()),
            message: Some("Hi".into()),
            ..Default::default()
        };
        let mail = contact_email(&submission);
        assert_eq!(mail.subject, "New inquiry from Ada Lovelace - Wedding");
    }

    #[test]
    fn subject_without_category_still_names_the_sender() {
        let submission = ContactSubmission {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            message: Some("Hi".into()),
            ..Default::default()
        };
        assert_eq!(contact_email(&submission).subject, "New inquiry from Ada");
    }

    #[test]
    fn bodies_carry_the_message_in_both_formats() {
        let submission = ContactSubmission {
            name: Some("Ada".into()),
            email: Some("ada@example.com".into()),
            message: Some("line one\nline two".into()),
            ..Default::default()
        };
        let mail = contact_email(&submission);
        assert!(mail.text.contains("line one\nline two"));
        assert!(mail.html.contains("line one<br>line two"));
        assert!(mail.text.contains("- Phone: N/A"));
    }
}
