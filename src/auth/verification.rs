use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

const RATE_LIMIT_PER_MINUTE: usize = 3;
const RATE_LIMIT_PER_HOUR: usize = 10;
const MAX_FAILED_ATTEMPTS: usize = 5;
const ATTEMPT_WINDOW_MINUTES: i64 = 15;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("Too many verification attempts. Please try again later.")]
    TooManyAttempts,
    #[error("Verification code has expired or doesn't exist")]
    Expired,
    #[error("Invalid verification code")]
    Invalid,
}

#[derive(Debug, Default)]
struct Entry {
    code: Option<(String, DateTime<Utc>)>,
    sends: Vec<DateTime<Utc>>,
    failures: Vec<DateTime<Utc>>,
}

impl Entry {
    fn prune(&mut self, now: DateTime<Utc>) {
        if matches!(&self.code, Some((_, expires_at)) if *expires_at <= now) {
            self.code = None;
        }
        self.sends.retain(|t| now - *t < Duration::hours(1));
        self.failures
            .retain(|t| now - *t < Duration::minutes(ATTEMPT_WINDOW_MINUTES));
    }

    fn is_empty(&self) -> bool {
        self.code.is_none() && self.sends.is_empty() && self.failures.is_empty()
    }
}

/// Short-lived email verification codes with per-address send limits and a
/// failed-attempt lockout. State is process-local.
#[derive(Debug)]
pub struct VerificationStore {
    code_length: usize,
    expiry: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl VerificationStore {
    pub fn new(code_length: usize, expiry_minutes: i64) -> Self {
        Self {
            code_length,
            expiry: Duration::minutes(expiry_minutes),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn expiry_minutes(&self) -> i64 {
        self.expiry.num_minutes()
    }

    pub fn issue(&self, email: &str) -> Result<String, VerificationError> {
        self.issue_at(email, Utc::now())
    }

    pub fn issue_at(&self, email: &str, now: DateTime<Utc>) -> Result<String, VerificationError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| {
            entry.prune(now);
            !entry.is_empty()
        });

        let entry = entries.entry(normalize(email)).or_default();

        let last_minute = entry
            .sends
            .iter()
            .filter(|t| now - **t < Duration::minutes(1))
            .count();
        if last_minute >= RATE_LIMIT_PER_MINUTE || entry.sends.len() >= RATE_LIMIT_PER_HOUR {
            return Err(VerificationError::RateLimited);
        }
        if entry.failures.len() >= MAX_FAILED_ATTEMPTS {
            return Err(VerificationError::TooManyAttempts);
        }

        let code = generate_code(self.code_length);
        entry.code = Some((code.clone(), now + self.expiry));
        entry.sends.push(now);
        Ok(code)
    }

    pub fn verify(&self, email: &str, code: &str) -> Result<(), VerificationError> {
        self.verify_at(email, code, Utc::now())
    }

    pub fn verify_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), VerificationError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.entry(normalize(email)).or_default();
        entry.prune(now);

        if entry.failures.len() >= MAX_FAILED_ATTEMPTS {
            return Err(VerificationError::TooManyAttempts);
        }

        let outcome = match &entry.code {
            None => Err(VerificationError::Expired),
            Some((stored, _)) if stored != code.trim() => Err(VerificationError::Invalid),
            Some(_) => Ok(()),
        };

        match outcome {
            Ok(()) => {
                entry.code = None;
                entry.failures.clear();
            }
            Err(_) => entry.failures.push(now),
        }
        outcome
    }

    /// Drop a pending code, e.g. when delivering it failed.
    pub fn discard(&self, email: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(&normalize(email)) {
            entry.code = None;
        }
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn generate_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> VerificationStore {
        VerificationStore::new(6, 10)
    }

    #[test]
    fn generated_codes_are_numeric_with_configured_length() {
        let code = VerificationStore::new(8, 10).issue("a@example.com").unwrap();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn correct_code_verifies_once() {
        let store = store();
        let code = store.issue("Hiker@Example.com").unwrap();
        assert_eq!(store.verify("hiker@example.com", &code), Ok(()));
        assert_eq!(
            store.verify("hiker@example.com", &code),
            Err(VerificationError::Expired)
        );
    }

    #[test]
    fn wrong_code_is_invalid_and_keeps_the_pending_code() {
        let store = store();
        let code = store.issue("a@example.com").unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };
        assert_eq!(
            store.verify("a@example.com", wrong),
            Err(VerificationError::Invalid)
        );
        assert_eq!(store.verify("a@example.com", &code), Ok(()));
    }

    #[test]
    fn code_expires() {
        let store = store();
        let now = Utc::now();
        let code = store.issue_at("a@example.com", now).unwrap();
        let later = now + Duration::minutes(10);
        assert_eq!(
            store.verify_at("a@example.com", &code, later),
            Err(VerificationError::Expired)
        );
    }

    #[test]
    fn sending_is_limited_per_minute_and_per_hour() {
        let store = store();
        let start = Utc::now();
        for i in 0..3 {
            store
                .issue_at("a@example.com", start + Duration::seconds(i))
                .unwrap();
        }
        assert_eq!(
            store.issue_at("a@example.com", start + Duration::seconds(10)),
            Err(VerificationError::RateLimited)
        );

        // A minute later the short window has cleared; the hourly cap still counts.
        let mut t = start + Duration::seconds(61);
        for _ in 0..7 {
            store.issue_at("a@example.com", t).unwrap();
            t += Duration::seconds(61);
        }
        assert_eq!(
            store.issue_at("a@example.com", t),
            Err(VerificationError::RateLimited)
        );
        assert!(store
            .issue_at("a@example.com", start + Duration::minutes(61))
            .is_ok());
    }

    #[test]
    fn repeated_failures_lock_out_verification_and_sending() {
        let store = store();
        let now = Utc::now();
        let code = store.issue_at("a@example.com", now).unwrap();
        let wrong = if code == "999999" { "888888" } else { "999999" };
        for _ in 0..MAX_FAILED_ATTEMPTS {
            assert_eq!(
                store.verify_at("a@example.com", wrong, now),
                Err(VerificationError::Invalid)
            );
        }
        assert_eq!(
            store.verify_at("a@example.com", &code, now),
            Err(VerificationError::TooManyAttempts)
        );
        assert_eq!(
            store.issue_at("a@example.com", now + Duration::minutes(2)),
            Err(VerificationError::TooManyAttempts)
        );

        let after_window = now + Duration::minutes(ATTEMPT_WINDOW_MINUTES);
        assert!(store.issue_at("a@example.com", after_window).is_ok());
    }

    #[test]
    fn discard_removes_pending_code() {
        let store = store();
        let code = store.issue("a@example.com").unwrap();
        store.discard("a@example.com");
        assert_eq!(
            store.verify("a@example.com", &code),
            Err(VerificationError::Expired)
        );
    }
}
