use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest};
use super::jwt::{AuthUser, JwtKeys};
use super::password::{hash_password, is_valid_email, verify_password, MIN_PASSWORD_LEN};
use super::repo::User;
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn internal(what: &'static str) -> impl Fn(anyhow::Error) -> (StatusCode, String) {
    move |e| {
        error!(error = %e, "{} failed", what);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

fn issue_tokens(state: &AppState, user: User) -> Result<AuthResponse, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    Ok(AuthResponse {
        access_token: keys.sign_access(user.id).map_err(internal("jwt sign access"))?,
        refresh_token: keys.sign_refresh(user.id).map_err(internal("jwt sign refresh"))?,
        user: PublicUser {
            id: user.id,
            email: user.email,
        },
    })
}

fn normalized_email(raw: &str) -> Result<String, (StatusCode, String)> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }
    Ok(email)
}

/// Creates the account and an initial profile document.
#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = normalized_email(&payload.email)?;
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    if User::find_by_email(&state.db, &email)
        .await
        .map_err(internal("find_by_email"))?
        .is_some()
    {
        warn!(email = %email, "email already registered");
        return Err((StatusCode::CONFLICT, "Email already registered".into()));
    }

    let hash = hash_password(&payload.password).map_err(internal("hash_password"))?;
    let user = User::create(&state.db, &email, &hash)
        .await
        .map_err(internal("create user"))?;

    let mut profile = json!({ "email": &user.email });
    if let Some(name) = payload.display_name.filter(|n| !n.trim().is_empty()) {
        profile["displayName"] = json!(name.trim());
    }
    state.profiles.create(user.id, profile).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = normalized_email(&payload.email)?;
    let invalid = || (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string());

    let Some(user) = User::find_by_email(&state.db, &email)
        .await
        .map_err(internal("find_by_email"))?
    else {
        warn!(email = %email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)
        .map_err(internal("verify_password"))?
    {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    // Repairs accounts whose profile write failed during registration.
    state.profiles.ensure(user.id, &user.email).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| {
            warn!(error = %e, "refresh rejected");
            (StatusCode::UNAUTHORIZED, e.to_string())
        })?;
    let user = load_user(&state, claims.sub).await?;
    Ok(Json(issue_tokens(&state, user)?))
}

async fn load_user(state: &AppState, id: Uuid) -> Result<User, (StatusCode, String)> {
    User::find_by_id(&state.db, id)
        .await
        .map_err(internal("find_by_id"))?
        .ok_or_else(|| {
            warn!(user_id = %id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = load_user(&state, user_id).await?;
    Ok(Json(PublicUser {
        id: user.id,
        email: user.email,
    }))
}
