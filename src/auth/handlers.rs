use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest},
        repo::User,
        services::{hash_password, is_valid_login_name, verify_password, AuthUser, JwtKeys},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

fn token_pair(
    state: &AppState,
    user_id: uuid::Uuid,
) -> Result<(String, String), (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    let access = keys.sign_access(user_id).map_err(|e| {
        error!(error = %e, "jwt sign access failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let refresh = keys.sign_refresh(user_id).map_err(|e| {
        error!(error = %e, "jwt sign refresh failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok((access, refresh))
}

/// A taken name is a 409; a failed lookup is a 500, never a pass.
fn ensure_login_name_free(
    login_name: &str,
    lookup: anyhow::Result<Option<User>>,
) -> Result<(), (StatusCode, String)> {
    match lookup {
        Ok(None) => Ok(()),
        Ok(Some(_)) => {
            warn!(%login_name, "login name already taken");
            Err((StatusCode::CONFLICT, "Login name already taken".into()))
        }
        Err(e) => {
            error!(error = %e, %login_name, "find_by_login_name failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

fn is_unique_violation(e: &anyhow::Error) -> bool {
    e.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.login_name = payload.login_name.trim().to_string();

    if !is_valid_login_name(&payload.login_name) {
        warn!(login_name = %payload.login_name, "invalid login name");
        return Err((StatusCode::BAD_REQUEST, "Invalid login name".into()));
    }

    if payload.password.len() < 8 {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    // Ensure login name is not taken
    ensure_login_name_free(
        &payload.login_name,
        User::find_by_login_name(&state.db, &payload.login_name).await,
    )?;

    let hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let user = match User::create(&state.db, &payload.login_name, &hash).await {
        Ok(u) => u,
        // Raced signup with the same name lands on the unique constraint.
        Err(e) if is_unique_violation(&e) => {
            warn!(login_name = %payload.login_name, "login name already taken");
            return Err((StatusCode::CONFLICT, "Login name already taken".into()));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let (access_token, refresh_token) = token_pair(&state, user.id)?;

    info!(user_id = %user.id, login_name = %user.login_name, "user registered");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: user.id,
            login_name: user.login_name,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.login_name = payload.login_name.trim().to_string();

    let user = match User::find_by_login_name(&state.db, &payload.login_name).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(login_name = %payload.login_name, "login unknown name");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_login_name failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    if !ok {
        warn!(login_name = %payload.login_name, user_id = %user.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let (access_token, refresh_token) = token_pair(&state, user.id)?;

    info!(user_id = %user.id, login_name = %user.login_name, "user logged in");
    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: user.id,
            login_name: user.login_name,
        },
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, format!("{}", e)))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await
        .map_err(|e| {
            error!(error = %e, "find_by_id failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let (access_token, refresh_token) = token_pair(&state, user.id)?;

    Ok(Json(AuthResponse {
        access_token,
        refresh_token,
        user: PublicUser {
            id: user.id,
            login_name: user.login_name,
        },
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "find_by_id failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or_else(|| {
            warn!(user_id = %user_id, "user not found");
            (StatusCode::UNAUTHORIZED, "User not found".to_string())
        })?;

    Ok(Json(PublicUser {
        id: user.id,
        login_name: user.login_name,
    }))
}

#[cfg(test)]
mod register_tests {
    use super::*;
    use time::OffsetDateTime;

    fn existing_user() -> User {
        User {
            id: uuid::Uuid::new_v4(),
            login_name: "Melon Taster 1".into(),
            password_hash: "hash".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn free_name_passes() {
        assert!(ensure_login_name_free("brand new name", Ok(None)).is_ok());
    }

    #[test]
    fn taken_name_is_a_conflict() {
        let (status, msg) =
            ensure_login_name_free("Melon Taster 1", Ok(Some(existing_user()))).unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(msg, "Login name already taken");
    }

    #[test]
    fn lookup_failure_is_an_internal_error_not_a_pass() {
        let (status, _) =
            ensure_login_name_free("anyone", Err(anyhow::anyhow!("connection refused")))
                .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}

#[cfg(test)]
mod me_tests {
    use super::*;

    #[test]
    fn test_public_user_serialization() {
        let response = PublicUser {
            id: uuid::Uuid::new_v4(),
            login_name: "Melon Taster 1".to_string(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("Melon Taster 1"));
        assert!(json.contains("id"));
        assert!(!json.contains("password"));
    }
}
