use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use uuid::Uuid;

use vibe_db::Database;
use vibe_gateway::dispatcher::Dispatcher;
use vibe_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest};

use crate::convert;
use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub dispatcher: Dispatcher,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.username.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Unauthorized("Data missing, please check!".into()));
    }

    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Unauthorized(
            "User already exists, try a different email".into(),
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();

    state
        .db
        .create_user(&user_id.to_string(), &req.username, &req.email, &password_hash)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Account created successfully."
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Unauthorized("Data missing, please check!".into()));
    }

    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored password hash is corrupt: {}", e))?;

    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(ApiError::Unauthorized("Invalid email or password".into()));
    }

    let user_id: Uuid = convert::parse_uuid(&user.id, "user id");
    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    let profile = convert::user_profile(&state.db, &user)?;
    let message = format!("Welcome Back {}", profile.username);

    let cookie = Cookie::build(("token", token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            success: true,
            message,
            user: profile,
        }),
    ))
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let mut cookie = Cookie::from("token");
    cookie.set_path("/");

    (
        jar.remove(cookie),
        Json(json!({
            "success": true,
            "message": "Logged out successfully!"
        })),
    )
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use jsonwebtoken::{DecodingKey, Validation, decode};

    fn test_state() -> AppState {
        Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            jwt_secret: "test-secret".into(),
            dispatcher: Dispatcher::new(),
        })
    }

    #[test]
    fn test_token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_token("test-secret", user_id, "khirod").unwrap();

        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.sub, user_id);
        assert_eq!(data.claims.username, "khirod");
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let state = test_state();

        let resp = register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "khirod".into(),
                email: "khirod@example.com".into(),
                password: "secret123".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = login(
            State(state.clone()),
            CookieJar::new(),
            Json(LoginRequest {
                email: "khirod@example.com".into(),
                password: "secret123".into(),
            }),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        // session cookie travels on the response
        let set_cookie = resp.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("HttpOnly"));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let state = test_state();
        let req = || RegisterRequest {
            username: "khirod".into(),
            email: "khirod@example.com".into(),
            password: "secret123".into(),
        };

        register(State(state.clone()), Json(req())).await.unwrap();
        let err = register(State(state.clone()), Json(req())).await.err().unwrap();
        assert_eq!(
            err.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let state = test_state();
        register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "khirod".into(),
                email: "khirod@example.com".into(),
                password: "secret123".into(),
            }),
        )
        .await
        .unwrap();

        let err = login(
            State(state.clone()),
            CookieJar::new(),
            Json(LoginRequest {
                email: "khirod@example.com".into(),
                password: "wrong".into(),
            }),
        )
        .await
        .err().unwrap();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
