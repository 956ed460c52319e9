use shuttle_runtime::SecretStore;
use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "change-me";

/// Runtime configuration, read once from the Shuttle secret store.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub jwt_secret: String,
    pub access_token_expire_minutes: i64,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openweather_api_key: Option<String>,
    pub google_places_api_key: Option<String>,
    pub google_client_ids: Vec<String>,
    pub apple_client_ids: Vec<String>,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_from_email: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
    pub verification_code_length: usize,
    pub verification_code_expiry_minutes: i64,
}

impl Config {
    pub fn from_secrets(secrets: &SecretStore) -> Self {
        Self::from_lookup(|key| secrets.get(key))
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let list = |key: &str| {
            get(key)
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET is not set, falling back to an insecure default");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            base_url: get("BASE_URL").unwrap_or_else(|| "http://localhost:8000".to_string()),
            jwt_secret,
            access_token_expire_minutes: get("ACCESS_TOKEN_EXPIRE_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(10080),
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| "gpt-4-1106-preview".to_string()),
            openai_base_url: get("OPENAI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            openweather_api_key: get("OPENWEATHER_API_KEY"),
            google_places_api_key: get("GOOGLE_PLACES_API_KEY"),
            google_client_ids: list("GOOGLE_CLIENT_IDS"),
            apple_client_ids: list("APPLE_CLIENT_IDS"),
            sendgrid_api_key: get("SENDGRID_API_KEY"),
            sendgrid_from_email: get("SENDGRID_FROM_EMAIL"),
            twilio_account_sid: get("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: get("TWILIO_AUTH_TOKEN"),
            twilio_from_number: get("TWILIO_FROM_NUMBER"),
            verification_code_length: get("VERIFICATION_CODE_LENGTH")
                .and_then(|v| v.parse().ok())
                .filter(|n| (4..=10).contains(n))
                .unwrap_or(6),
            verification_code_expiry_minutes: get("VERIFICATION_CODE_EXPIRY_MINUTES")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]);
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
        assert_eq!(config.access_token_expire_minutes, 10080);
        assert_eq!(config.openai_model, "gpt-4-1106-preview");
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.verification_code_length, 6);
        assert_eq!(config.verification_code_expiry_minutes, 10);
        assert!(config.openai_api_key.is_none());
        assert!(config.google_client_ids.is_empty());
    }

    #[test]
    fn blank_values_are_treated_as_missing() {
        let config = config_from(&[("OPENAI_API_KEY", "   "), ("JWT_SECRET", "")]);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.jwt_secret, DEFAULT_JWT_SECRET);
    }

    #[test]
    fn client_id_lists_are_split_and_trimmed() {
        let config = config_from(&[
            ("GOOGLE_CLIENT_IDS", "a.apps.googleusercontent.com, b.apps.googleusercontent.com,"),
            ("APPLE_CLIENT_IDS", "tech.aigear.app"),
        ]);
        assert_eq!(
            config.google_client_ids,
            vec!["a.apps.googleusercontent.com", "b.apps.googleusercontent.com"]
        );
        assert_eq!(config.apple_client_ids, vec!["tech.aigear.app"]);
    }

    #[test]
    fn out_of_range_numbers_fall_back() {
        let config = config_from(&[
            ("VERIFICATION_CODE_LENGTH", "2"),
            ("VERIFICATION_CODE_EXPIRY_MINUTES", "-5"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "sixty"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1/"),
        ]);
        assert_eq!(config.verification_code_length, 6);
        assert_eq!(config.verification_code_expiry_minutes, 10);
        assert_eq!(config.access_token_expire_minutes, 10080);
        assert_eq!(config.openai_base_url, "http://localhost:11434/v1");
    }
}
