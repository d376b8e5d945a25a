use axum::{
    body::Body,
    http::{header::AUTHORIZATION, Request, Response},
    Router,
};
use db::users::{AuthToken, NewUser, User, UserRole};
use serde::de::DeserializeOwned;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{AppConfig, AppState};

/// State over a pool that never connects; fine for requests that are
/// answered before touching the database.
pub fn lazy_state() -> AppState {
    let db = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/unused")
        .unwrap();

    AppState {
        app: AppConfig { port: 0 },
        db,
    }
}

pub fn test_app(pool: PgPool) -> Router {
    crate::http_server::app(AppState {
        app: AppConfig { port: 0 },
        db: pool,
    })
}

/// Creates a user with an API token, returning the `Authorization` value.
pub async fn seed_user(pool: &PgPool, email: &str, role: UserRole) -> (User, String) {
    let username = email.split('@').next().unwrap().to_string();
    let user = User::create(
        pool,
        &NewUser {
            email: email.to_string(),
            username: username.clone(),
            first_name: username.clone(),
            last_name: "Tester".to_string(),
            role,
        },
    )
    .await
    .unwrap();

    let key = format!("token-{username}");
    AuthToken::create(pool, user.user_id, &key).await.unwrap();

    (user, format!("Token {key}"))
}

pub fn request(method: &str, uri: &str, auth: Option<&str>) -> axum::http::request::Builder {
    let builder = Request::builder().method(method).uri(uri);

    match auth {
        Some(auth) => builder.header(AUTHORIZATION, auth),
        None => builder,
    }
}

pub fn json_request(
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    request(method, uri, auth)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn response_body_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

pub async fn response_body_text(response: Response<Body>) -> String {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body_bytes.to_vec()).unwrap()
}
