use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::auth::delivery::DeliveryError;
use crate::auth::id_token::{self, Provider};
use crate::auth::middleware::{
    cleared_session_cookie, issue_access_token, session_cookie, AuthenticatedUser,
};
use crate::auth::models::{
    AppleAuthRequest, DeliveryChannel, GoogleAuthRequest, LoginRequest, RegisterRequest,
    SendCodeRequest, SendCodeResponse, TokenResponse, User, UserResponse, VerifyCodeRequest,
    VerifyCodeResponse,
};
use crate::auth::service::{self, NewUser};
use crate::auth::verification::VerificationError;
use crate::error::{AppError, AppResult};
use crate::extract::JsonBody;
use crate::state::AppState;

impl From<VerificationError> for AppError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::RateLimited | VerificationError::TooManyAttempts => {
                AppError::TooManyRequests(err.to_string())
            }
            VerificationError::Expired | VerificationError::Invalid => {
                AppError::BadRequest(err.to_string())
            }
        }
    }
}

fn token_response(user: &User, state: &AppState) -> AppResult<TokenResponse> {
    Ok(TokenResponse {
        access_token: issue_access_token(user, &state.config)?,
        token_type: "bearer".to_string(),
        user: UserResponse::from(user),
    })
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let email = service::normalize_email(&request.email);
    if !service::is_valid_email(&email) {
        return Err(AppError::bad_request("Invalid email format"));
    }
    if !service::is_valid_password(&request.password) {
        return Err(AppError::bad_request(
            "Password must be at least 8 characters long",
        ));
    }
    if service::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already exists".into()));
    }

    let hashed_password = service::hash_password(&request.password).await?;
    let user = service::create_user(
        &state.pool,
        NewUser {
            email: &email,
            username: request.username.as_deref(),
            hashed_password,
            is_verified: false,
            apple_user_id: None,
        },
    )
    .await?;

    info!(user_id = %user.id, "User registered");
    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let invalid = || AppError::unauthorized("Invalid credentials or email not verified");

    let user = service::find_by_email(&state.pool, &request.email)
        .await?
        .ok_or_else(invalid)?;
    if !service::verify_password(&request.password, &user.hashed_password).await? {
        warn!("Login rejected: bad password");
        return Err(invalid());
    }
    if !user.is_verified {
        info!(user_id = %user.id, "Login rejected: email not verified");
        return Err(invalid());
    }

    let response = token_response(&user, &state)?;
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = HeaderValue::from_str(&session_cookie(&response.access_token, &state.config))
    {
        headers.insert(header::SET_COOKIE, cookie);
    }

    info!(user_id = %user.id, "User logged in");
    Ok((StatusCode::OK, headers, Json(response)))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    if let Ok(cookie) = HeaderValue::from_str(&cleared_session_cookie(&state.config)) {
        headers.insert(header::SET_COOKIE, cookie);
    }
    (StatusCode::OK, headers, Json(json!({ "msg": "Logged out" })))
}

pub async fn me(AuthenticatedUser(user): AuthenticatedUser) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

pub async fn delete_account(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    service::delete_user(&state.pool, &user.id).await?;
    info!(user_id = %user.id, "Account deleted");
    Ok(Json(json!({ "msg": "Account deleted" })))
}

pub async fn google_auth(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<GoogleAuthRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = request
        .token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Google token required"))?;

    let provider = Provider::google(&state.config.google_client_ids);
    let claims = id_token::verify(&state.http, &provider, &token)
        .await
        .map_err(|e| {
            warn!("Google token rejected: {}", e);
            AppError::bad_request("Invalid Google token")
        })?;
    let email = claims
        .email
        .as_deref()
        .ok_or_else(|| AppError::bad_request("Invalid Google token"))?;

    let user = match service::find_by_email(&state.pool, email).await? {
        Some(user) => user,
        None => {
            let username = available_username(&state, claims.name.as_deref()).await?;
            let user = service::create_user(
                &state.pool,
                NewUser {
                    email,
                    username: username.as_deref(),
                    hashed_password: String::new(),
                    is_verified: true,
                    apple_user_id: None,
                },
            )
            .await?;
            info!(user_id = %user.id, "User created from Google sign-in");
            user
        }
    };

    Ok(Json(token_response(&user, &state)?))
}

pub async fn apple_auth(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<AppleAuthRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = request
        .identity_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("Apple identity token required"))?;

    let provider = Provider::apple(&state.config.apple_client_ids);
    let claims = id_token::verify(&state.http, &provider, &token)
        .await
        .and_then(|claims| match request.nonce.as_deref() {
            Some(raw) => id_token::check_nonce(&claims, raw).map(|_| claims),
            None => Ok(claims),
        })
        .map_err(|e| {
            warn!("Apple token rejected: {}", e);
            AppError::bad_request("Invalid Apple token")
        })?;

    if let Some(user) = service::find_by_apple_id(&state.pool, &claims.sub).await? {
        return Ok(Json(token_response(&user, &state)?));
    }

    // Apple only includes the email on the first authorization.
    let email = claims
        .email
        .as_deref()
        .ok_or_else(|| AppError::bad_request("Apple account has no email; sign in again"))?;

    let user = match service::find_by_email(&state.pool, email).await? {
        Some(existing) => service::link_apple_id(&state.pool, &existing.id, &claims.sub).await?,
        None => {
            let username = available_username(&state, request.username.as_deref()).await?;
            let user = service::create_user(
                &state.pool,
                NewUser {
                    email,
                    username: username.as_deref(),
                    hashed_password: String::new(),
                    is_verified: true,
                    apple_user_id: Some(&claims.sub),
                },
            )
            .await?;
            info!(user_id = %user.id, "User created from Apple sign-in");
            user
        }
    };

    Ok(Json(token_response(&user, &state)?))
}

/// `None` lets account creation generate one.
async fn available_username(state: &AppState, wanted: Option<&str>) -> AppResult<Option<String>> {
    let Some(name) = wanted.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    if service::username_taken(&state.pool, name).await? {
        return Ok(None);
    }
    Ok(Some(name.to_string()))
}

pub async fn send_code(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SendCodeRequest>,
) -> AppResult<Json<SendCodeResponse>> {
    let email = service::normalize_email(&request.email);
    if !service::is_valid_email(&email) {
        return Err(AppError::bad_request("Invalid email format"));
    }

    let (sender, recipient) = match request.channel {
        DeliveryChannel::Email => (state.email_sender.clone(), email.clone()),
        DeliveryChannel::Sms => {
            let phone = request
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| AppError::bad_request("Phone number required for SMS delivery"))?;
            (state.sms_sender.clone(), phone.to_string())
        }
    };

    let code = state.verification.issue(&email)?;

    if let Err(e) = sender
        .send_code(&recipient, &code, state.verification.expiry_minutes())
        .await
    {
        state.verification.discard(&email);
        match &e {
            DeliveryError::NotConfigured(_) => warn!("Verification code not sent: {}", e),
            _ => error!("Verification code delivery failed: {}", e),
        }
        return Err(AppError::BadGateway(
            "Failed to send verification code. Please try again.".into(),
        ));
    }

    Ok(Json(SendCodeResponse {
        message: "Verification code sent successfully".to_string(),
        email,
    }))
}

pub async fn verify_code(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyCodeRequest>,
) -> AppResult<Json<VerifyCodeResponse>> {
    let email = service::normalize_email(&request.email);
    state.verification.verify(&email, &request.code)?;

    if service::mark_verified(&state.pool, &email).await?.is_some() {
        info!("Email verified");
    }

    Ok(Json(VerifyCodeResponse {
        message: "Code verified successfully".to_string(),
        email,
        verified: true,
    }))
}

/// Verify the code and sign the user straight in.
pub async fn verify_and_login(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<VerifyCodeRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = service::normalize_email(&request.email);
    state.verification.verify(&email, &request.code)?;

    let user = service::mark_verified(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    info!(user_id = %user.id, "Email verified, user signed in");
    Ok(Json(token_response(&user, &state)?))
}
