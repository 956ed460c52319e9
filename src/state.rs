use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::auth::delivery::{CodeSender, SendGridMailer, TwilioSms};
use crate::auth::verification::VerificationStore;
use crate::config::Config;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub verification: Arc<VerificationStore>,
    pub email_sender: Arc<dyn CodeSender>,
    pub sms_sender: Arc<dyn CodeSender>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            pool,
            verification: Arc::new(VerificationStore::new(
                config.verification_code_length,
                config.verification_code_expiry_minutes,
            )),
            email_sender: Arc::new(SendGridMailer::new(http.clone(), &config)),
            sms_sender: Arc::new(TwilioSms::new(http.clone(), &config)),
            http,
            config: Arc::new(config),
        }
    }
}
