use anyhow::Context;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::Config;
use crate::services::metrics::EMAILS_COUNTER;

const SITE_NAME: &str = "Family Portal";

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let transport = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .ok()?
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .port(port)
                .credentials(creds)
                .build()
        };

        let from: Mailbox = from_addr.parse().ok()?;

        Some(Self { transport, from })
    }

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    fn wrap_html(content: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <title>{SITE_NAME}</title>
</head>
<body style="margin:0;padding:0;background-color:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif">
  <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background-color:#f1f5f9;padding:40px 16px">
    <tr>
      <td align="center">
        <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="max-width:520px">
          <tr>
            <td style="background:#ffffff;border-radius:12px;padding:40px">
              {content}
            </td>
          </tr>
          <tr>
            <td align="center" style="padding-top:20px">
              <p style="margin:0;font-size:12px;color:#94a3b8">{SITE_NAME}</p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#
        )
    }

    fn action_html(title: &str, intro: &str, url: &str, button: &str, expiry: &str) -> String {
        let content = format!(
            r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">{title}</h1>
<p style="margin:0 0 28px 0;font-size:15px;color:#64748b;line-height:1.6">{intro}</p>
<table role="presentation" cellpadding="0" cellspacing="0" style="margin-bottom:28px">
  <tr>
    <td style="border-radius:8px;background:#2563eb">
      <a href="{url}" style="display:inline-block;padding:13px 28px;color:#ffffff;text-decoration:none;font-weight:600;font-size:15px;border-radius:8px">{button}</a>
    </td>
  </tr>
</table>
<p style="margin:0;font-size:13px;color:#94a3b8;border-top:1px solid #f1f5f9;padding-top:20px;line-height:1.5">This link expires in <strong style="color:#64748b">{expiry}</strong>. If you did not ask for it, ignore this email.</p>"#
        );
        Self::wrap_html(&content)
    }

    async fn send_email(&self, to_email: &str, subject: &str, text: &str, html: &str) -> anyhow::Result<()> {
        let to: Mailbox = to_email.parse().context("Invalid recipient address")?;
        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )
            .context("Failed to build email message")?;

        self.transport
            .send(email)
            .await
            .context("Failed to send email")?;

        Ok(())
    }

    pub async fn send_verification(&self, to_email: &str, verify_url: &str) -> anyhow::Result<()> {
        let subject = format!("Confirm your email for {SITE_NAME}");
        let text = format!(
            "Welcome to {SITE_NAME}!\n\n\
            Confirm your email address by opening this link (valid 24 hours):\n\
            {verify_url}\n\n\
            If you did not create an account, ignore this email."
        );
        let html = Self::action_html(
            "Confirm your email",
            "Welcome! Click the button below to confirm your email address and finish signing up.",
            verify_url,
            "Confirm my email",
            "24 hours",
        );
        self.send_email(to_email, &subject, &text, &html).await?;
        EMAILS_COUNTER.with_label_values(&["verify_email"]).inc();
        Ok(())
    }

    pub async fn send_password_reset(&self, to_email: &str, reset_url: &str) -> anyhow::Result<()> {
        let subject = format!("Reset your {SITE_NAME} password");
        let text = format!(
            "You asked to reset your {SITE_NAME} password.\n\n\
            Open this link to choose a new one (valid 1 hour):\n\
            {reset_url}\n\n\
            If you did not ask for a reset, ignore this email."
        );
        let html = Self::action_html(
            "Reset your password",
            "Click the button below to choose a new password.",
            reset_url,
            "Reset my password",
            "1 hour",
        );
        self.send_email(to_email, &subject, &text, &html).await?;
        EMAILS_COUNTER.with_label_values(&["reset_password"]).inc();
        Ok(())
    }
}
