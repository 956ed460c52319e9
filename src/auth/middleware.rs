use crate::auth::models::{AccessTokenClaims, User};
use crate::config::Config;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::FromRef;
use axum::http::{request::Parts, HeaderMap};
use chrono::{Duration, Utc};
use cookie::Cookie;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::{debug, warn};

pub const SESSION_COOKIE: &str = "session";

/// The signed-in user behind a request, resolved from a Bearer token or the
/// `session` cookie.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        let token = extract_token(&parts.headers);
        async move {
            let token = token.ok_or_else(|| AppError::unauthorized("Not authenticated"))?;
            let claims = decode_access_token(&token, &app_state.config)?;

            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(&claims.sub)
                .fetch_optional(&app_state.pool)
                .await?
                .ok_or_else(|| {
                    warn!(user_id = %claims.sub, "Token presented for a missing user");
                    AppError::unauthorized("User no longer exists")
                })?;

            Ok(AuthenticatedUser(user))
        }
    }
}

/// Bearer token first (mobile client), then the session cookie (web).
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_str) = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(token) = auth_str
            .strip_prefix("Bearer ")
            .or_else(|| auth_str.strip_prefix("bearer "))
        {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    let cookies = headers
        .get("cookie")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");
    extract_session_token_from_cookies(cookies)
}

fn extract_session_token_from_cookies(cookies: &str) -> Option<String> {
    for cookie_str in cookies.split(';') {
        if let Ok(cookie) = Cookie::parse(cookie_str.trim()) {
            if cookie.name() == SESSION_COOKIE && !cookie.value().is_empty() {
                return Some(cookie.value().to_string());
            }
        }
    }
    None
}

pub fn issue_access_token(user: &User, config: &Config) -> Result<String, AppError> {
    let now = Utc::now();
    let exp = now + Duration::minutes(config.access_token_expire_minutes);

    let claims = AccessTokenClaims {
        sub: user.id.clone(),
        email: user.email.clone(),
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::internal(format!("Failed to sign access token: {e}")))
}

pub fn decode_access_token(token: &str, config: &Config) -> Result<AccessTokenClaims, AppError> {
    decode::<AccessTokenClaims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected access token: {}", e);
        AppError::unauthorized("Invalid or expired token")
    })
}

fn cookie_attributes(config: &Config) -> &'static str {
    if config.base_url.starts_with("https://") {
        "HttpOnly; Secure; SameSite=Lax; Path=/"
    } else {
        "HttpOnly; SameSite=Lax; Path=/"
    }
}

/// `Set-Cookie` value carrying the access token for browser clients.
/// `Secure` only when served over https.
pub fn session_cookie(token: &str, config: &Config) -> String {
    format!(
        "{}={}; {}; Max-Age={}",
        SESSION_COOKIE,
        token,
        cookie_attributes(config),
        config.access_token_expire_minutes * 60
    )
}

pub fn cleared_session_cookie(config: &Config) -> String {
    format!("{}=; {}; Max-Age=0", SESSION_COOKIE, cookie_attributes(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn test_config(secret: &str) -> Config {
        let secret = secret.to_string();
        Config::from_lookup(move |key| (key == "JWT_SECRET").then(|| secret.clone()))
    }

    fn test_user() -> User {
        User {
            id: "3f1c2b9a-0000-4000-8000-000000000001".into(),
            email: "hiker@example.com".into(),
            username: Some("hiker".into()),
            hashed_password: String::new(),
            is_verified: true,
            apple_user_id: None,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn issued_token_decodes_back_to_the_user() {
        let config = test_config("s3cret");
        let token = issue_access_token(&test_user(), &config).unwrap();
        let claims = decode_access_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "3f1c2b9a-0000-4000-8000-000000000001");
        assert_eq!(claims.email, "hiker@example.com");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = issue_access_token(&test_user(), &test_config("one")).unwrap();
        let err = decode_access_token(&token, &test_config("two")).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config("s3cret");
        let claims = AccessTokenClaims {
            sub: "u".into(),
            email: "e@example.com".into(),
            iat: 1_000,
            exp: 2_000,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"s3cret"),
        )
        .unwrap();
        assert!(decode_access_token(&token, &config).is_err());
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        headers.insert("cookie", HeaderValue::from_static("session=zzz"));
        assert_eq!(extract_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; session=tok123; lang=en"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn empty_credentials_yield_nothing() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        headers.insert("cookie", HeaderValue::from_static("session="));
        assert_eq!(extract_token(&headers), None);
    }

    #[test]
    fn secure_flag_follows_base_url() {
        let local = Config::from_lookup(|_| None);
        let cookie = session_cookie("tok", &local);
        assert!(cookie.starts_with("session=tok; HttpOnly;"));
        assert!(!cookie.contains("Secure"));
        assert!(cookie.ends_with("Max-Age=604800"));

        let deployed =
            Config::from_lookup(|key| (key == "BASE_URL").then(|| "https://trailmate.shuttle.app".to_string()));
        assert!(session_cookie("tok", &deployed).contains("; Secure;"));
        assert!(cleared_session_cookie(&deployed).ends_with("Max-Age=0"));
    }
}
