//! Verification of third-party OpenID Connect ID tokens (Google, Apple)
//! against the provider's published JWKS.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const APPLE_JWKS_URL: &str = "https://appleid.apple.com/auth/keys";

#[derive(Debug, Error)]
pub enum IdTokenError {
    #[error("no client ids configured for this provider")]
    NotConfigured,
    #[error("failed to fetch JWKS: {0}")]
    Jwks(#[from] reqwest::Error),
    #[error("malformed token header")]
    Header,
    #[error("no kid in token header")]
    MissingKid,
    #[error("no matching JWK")]
    UnknownKey,
    #[error("invalid JWK components")]
    InvalidKey,
    #[error("token validation failed: {0}")]
    Invalid(String),
    #[error("nonce mismatch")]
    Nonce,
}

/// Which provider issued the token.
#[derive(Debug, Clone)]
pub struct Provider {
    pub jwks_url: &'static str,
    pub issuers: &'static [&'static str],
    pub audiences: Vec<String>,
}

impl Provider {
    pub fn google(client_ids: &[String]) -> Self {
        Self {
            jwks_url: GOOGLE_JWKS_URL,
            issuers: &["accounts.google.com", "https://accounts.google.com"],
            audiences: client_ids.to_vec(),
        }
    }

    pub fn apple(client_ids: &[String]) -> Self {
        Self {
            jwks_url: APPLE_JWKS_URL,
            issuers: &["https://appleid.apple.com"],
            audiences: client_ids.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdTokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub nonce: Option<String>,
    pub exp: usize,
    pub iss: String,
}

async fn fetch_jwks(client: &reqwest::Client, url: &str) -> Result<Value, reqwest::Error> {
    client.get(url).send().await?.error_for_status()?.json().await
}

/// Fetch the provider's keys and validate signature, issuer, audience and expiry.
pub async fn verify(
    client: &reqwest::Client,
    provider: &Provider,
    token: &str,
) -> Result<IdTokenClaims, IdTokenError> {
    if provider.audiences.is_empty() {
        return Err(IdTokenError::NotConfigured);
    }
    let jwks = fetch_jwks(client, provider.jwks_url).await?;
    verify_with_jwks(&jwks, provider, token)
}

pub fn verify_with_jwks(
    jwks: &Value,
    provider: &Provider,
    token: &str,
) -> Result<IdTokenClaims, IdTokenError> {
    let header = decode_header(token).map_err(|_| IdTokenError::Header)?;
    let kid = header.kid.ok_or(IdTokenError::MissingKid)?;

    let empty_keys: Vec<Value> = Vec::new();
    let keys_array = jwks
        .get("keys")
        .and_then(|v| v.as_array())
        .unwrap_or(&empty_keys);
    let jwk = keys_array
        .iter()
        .find(|k| k.get("kid").and_then(|v| v.as_str()) == Some(kid.as_str()))
        .ok_or(IdTokenError::UnknownKey)?;

    let n = jwk.get("n").and_then(|v| v.as_str()).unwrap_or("");
    let e = jwk.get("e").and_then(|v| v.as_str()).unwrap_or("");
    let decoding_key =
        DecodingKey::from_rsa_components(n, e).map_err(|_| IdTokenError::InvalidKey)?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(provider.audiences.as_slice());
    validation.set_issuer(provider.issuers);

    decode::<IdTokenClaims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| IdTokenError::Invalid(e.to_string()))
}

/// Apple embeds the SHA-256 hex digest of the client's raw nonce.
pub fn check_nonce(claims: &IdTokenClaims, raw_nonce: &str) -> Result<(), IdTokenError> {
    let expected = format!("{:x}", Sha256::digest(raw_nonce.as_bytes()));
    match claims.nonce.as_deref() {
        Some(nonce) if nonce == expected => Ok(()),
        _ => Err(IdTokenError::Nonce),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    fn claims_with_nonce(nonce: Option<&str>) -> IdTokenClaims {
        IdTokenClaims {
            sub: "001234.abcd".into(),
            email: None,
            name: None,
            nonce: nonce.map(str::to_string),
            exp: 0,
            iss: "https://appleid.apple.com".into(),
        }
    }

    const TEST_KEY_PEM: &str = include_str!("testdata/rsa_test_key.pem");
    const TEST_KEY_N: &str = concat!(
        "5r636LUDBKpVNF7EbfI_3soLXQwNQqOm4IK-5rqrd_rjZLxCiR6CAE0JsLx4USLROWxacF5N",
        "KBqxJwoh3XafJ_sDaOpKv7imRbLVk9nrO02v85lHWi25wRkI6IC3D0lmN7V-GhhGPQNowBHG",
        "aPNZF783Dg3eydXYrjbeOa5EnYPMEoqYtBqRvq5bmU4M-_zCgahW6V0lleBvG3PR7oh_TujB",
        "gGKtbOydS74SXgtA46WrpO6Npr4vzx8Z_YAjOufh30n7bw9nqnA0_meliOVTHC79v-SQcSoW",
        "xbl2ExuVZkviMGsJSCKSnub3zfXnKSlUz3dq8YPSwYX_MPPgekMgSw",
    );
    const CLIENT_ID: &str = "123.apps.googleusercontent.com";

    fn test_jwks() -> Value {
        json!({
            "keys": [{"kty": "RSA", "kid": "test-key", "alg": "RS256", "n": TEST_KEY_N, "e": "AQAB"}]
        })
    }

    fn signed(aud: &str, iss: &str, exp: i64) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some("test-key".into());
        let claims = json!({
            "sub": "10769150350006150715113082367",
            "email": "hiker@example.com",
            "aud": aud,
            "iss": iss,
            "exp": exp,
        });
        let key = EncodingKey::from_rsa_pem(TEST_KEY_PEM.as_bytes()).unwrap();
        encode(&header, &claims, &key).unwrap()
    }

    fn in_an_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn valid_google_token_is_accepted() {
        let provider = Provider::google(&[CLIENT_ID.to_string()]);
        let token = signed(CLIENT_ID, "https://accounts.google.com", in_an_hour());
        let claims = verify_with_jwks(&test_jwks(), &provider, &token).unwrap();
        assert_eq!(claims.sub, "10769150350006150715113082367");
        assert_eq!(claims.email.as_deref(), Some("hiker@example.com"));
        assert_eq!(claims.iss, "https://accounts.google.com");

        let token = signed(CLIENT_ID, "accounts.google.com", in_an_hour());
        assert!(verify_with_jwks(&test_jwks(), &provider, &token).is_ok());
    }

    #[test]
    fn foreign_audience_is_rejected() {
        let provider = Provider::google(&[CLIENT_ID.to_string()]);
        let token = signed(
            "someone-else.apps.googleusercontent.com",
            "accounts.google.com",
            in_an_hour(),
        );
        let err = verify_with_jwks(&test_jwks(), &provider, &token).unwrap_err();
        assert!(matches!(err, IdTokenError::Invalid(_)));
    }

    #[test]
    fn foreign_issuer_is_rejected() {
        let google = Provider::google(&[CLIENT_ID.to_string()]);
        let token = signed(CLIENT_ID, "https://evil.example.com", in_an_hour());
        assert!(matches!(
            verify_with_jwks(&test_jwks(), &google, &token),
            Err(IdTokenError::Invalid(_))
        ));

        // A Google-issued token is not an Apple token even with the same audience.
        let apple = Provider::apple(&[CLIENT_ID.to_string()]);
        let token = signed(CLIENT_ID, "https://accounts.google.com", in_an_hour());
        assert!(verify_with_jwks(&test_jwks(), &apple, &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let provider = Provider::google(&[CLIENT_ID.to_string()]);
        let an_hour_ago = chrono::Utc::now().timestamp() - 3600;
        let token = signed(CLIENT_ID, "accounts.google.com", an_hour_ago);
        assert!(matches!(
            verify_with_jwks(&test_jwks(), &provider, &token),
            Err(IdTokenError::Invalid(_))
        ));
    }

    #[test]
    fn token_signed_with_another_key_is_rejected() {
        let provider = Provider::google(&[CLIENT_ID.to_string()]);
        let token = signed(CLIENT_ID, "accounts.google.com", in_an_hour());
        let mut jwks = test_jwks();
        // Same kid, different modulus.
        jwks["keys"][0]["n"] = json!(TEST_KEY_N.replacen('5', "6", 1));
        assert!(verify_with_jwks(&jwks, &provider, &token).is_err());
    }

    #[test]
    fn nonce_must_be_sha256_of_raw_value() {
        // sha256("abc")
        let hashed = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert!(check_nonce(&claims_with_nonce(Some(hashed)), "abc").is_ok());
        assert!(matches!(
            check_nonce(&claims_with_nonce(Some(hashed)), "abd"),
            Err(IdTokenError::Nonce)
        ));
        assert!(check_nonce(&claims_with_nonce(None), "abc").is_err());
    }

    #[tokio::test]
    async fn unconfigured_provider_is_rejected_before_any_fetch() {
        let client = reqwest::Client::new();
        let err = verify(&client, &Provider::google(&[]), "whatever")
            .await
            .unwrap_err();
        assert!(matches!(err, IdTokenError::NotConfigured));
    }

    #[test]
    fn garbage_token_fails_on_header() {
        let provider = Provider::apple(&["tech.aigear.app".to_string()]);
        let err = verify_with_jwks(&json!({"keys": []}), &provider, "not-a-jwt").unwrap_err();
        assert!(matches!(err, IdTokenError::Header));
    }

    #[test]
    fn token_without_kid_is_rejected() {
        let token = encode(
            &Header::default(),
            &json!({"sub": "x", "exp": 9_999_999_999u64, "iss": "accounts.google.com"}),
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        let provider = Provider::google(&["client".to_string()]);
        let err = verify_with_jwks(&json!({"keys": []}), &provider, &token).unwrap_err();
        assert!(matches!(err, IdTokenError::MissingKid));
    }

    #[test]
    fn unknown_kid_is_rejected() {
        let mut header = Header::default();
        header.kid = Some("rotated-away".into());
        let token = encode(
            &header,
            &json!({"sub": "x", "exp": 9_999_999_999u64, "iss": "accounts.google.com"}),
            &EncodingKey::from_secret(b"k"),
        )
        .unwrap();
        let provider = Provider::google(&["client".to_string()]);
        let jwks = json!({"keys": [{"kid": "current", "n": "AQAB", "e": "AQAB"}]});
        let err = verify_with_jwks(&jwks, &provider, &token).unwrap_err();
        assert!(matches!(err, IdTokenError::UnknownKey));
    }
}
