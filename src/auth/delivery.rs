use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;

const SENDGRID_URL: &str = "https://api.sendgrid.com/v3/mail/send";
const EMAIL_SUBJECT: &str = "Your Verification Code";
const EMAIL_FROM_NAME: &str = "AIgyr Verification";

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("{0} delivery is not configured")]
    NotConfigured(&'static str),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Something that can hand a verification code to a person.
#[async_trait]
pub trait CodeSender: Send + Sync {
    async fn send_code(
        &self,
        recipient: &str,
        code: &str,
        expiry_minutes: i64,
    ) -> Result<(), DeliveryError>;
}

pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: Option<String>,
    from_email: Option<String>,
}

impl SendGridMailer {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.sendgrid_api_key.clone(),
            from_email: config.sendgrid_from_email.clone(),
        }
    }
}

pub fn verification_email_html(code: &str, expiry_minutes: i64) -> String {
    format!(
        r#"<html>
<body>
    <h2>Email Verification</h2>
    <p>Your verification code is: <strong>{code}</strong></p>
    <p>This code will expire in {expiry_minutes} minutes.</p>
    <p>If you didn't request this code, please ignore this email.</p>
</body>
</html>"#
    )
}

pub fn sendgrid_payload(from_email: &str, to_email: &str, html: &str) -> Value {
    json!({
        "personalizations": [{ "to": [{ "email": to_email }] }],
        "from": { "email": from_email, "name": EMAIL_FROM_NAME },
        "subject": EMAIL_SUBJECT,
        "content": [{ "type": "text/html", "value": html }]
    })
}

#[async_trait]
impl CodeSender for SendGridMailer {
    async fn send_code(
        &self,
        recipient: &str,
        code: &str,
        expiry_minutes: i64,
    ) -> Result<(), DeliveryError> {
        let (Some(api_key), Some(from_email)) = (&self.api_key, &self.from_email) else {
            return Err(DeliveryError::NotConfigured("email"));
        };

        let html = verification_email_html(code, expiry_minutes);
        let res = self
            .client
            .post(SENDGRID_URL)
            .bearer_auth(api_key)
            .json(&sendgrid_payload(from_email, recipient, &html))
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!("SendGrid rejected verification email: {}", status);
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!("Verification email dispatched");
        Ok(())
    }
}

pub struct TwilioSms {
    client: reqwest::Client,
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
}

impl TwilioSms {
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            account_sid: config.twilio_account_sid.clone(),
            auth_token: config.twilio_auth_token.clone(),
            from_number: config.twilio_from_number.clone(),
        }
    }
}

pub fn verification_sms_body(code: &str, expiry_minutes: i64) -> String {
    format!("Your verification code is {code}. It expires in {expiry_minutes} minutes.")
}

#[async_trait]
impl CodeSender for TwilioSms {
    async fn send_code(
        &self,
        recipient: &str,
        code: &str,
        expiry_minutes: i64,
    ) -> Result<(), DeliveryError> {
        let (Some(sid), Some(token), Some(from)) =
            (&self.account_sid, &self.auth_token, &self.from_number)
        else {
            return Err(DeliveryError::NotConfigured("sms"));
        };

        let url = format!("https://api.twilio.com/2010-04-01/Accounts/{sid}/Messages.json");
        let body = verification_sms_body(code, expiry_minutes);
        let params = [("To", recipient), ("From", from.as_str()), ("Body", body.as_str())];

        let res = self
            .client
            .post(&url)
            .basic_auth(sid, Some(token))
            .form(&params)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!("Twilio rejected verification SMS: {}", status);
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!("Verification SMS dispatched");
        Ok(())
    }
}
