use axum::Router;

use super::{api, ResponseResult, ServerError};
use crate::AppState;

pub(crate) fn make_router() -> Router<AppState> {
    Router::new()
        .nest("/api", api::routes())
        .fallback(fallback)
}

async fn fallback() -> ResponseResult<()> {
    Err(ServerError::not_found())
}

#[cfg(test)]
mod test {
    use axum::{
        body::Body,
        http::{header::AUTHORIZATION, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt as _;

    use crate::http_server::test_helpers::{lazy_state, response_body_json};

    async fn send(method: Method, uri: &str, auth: Option<&str>) -> (StatusCode, Value) {
        let app = crate::http_server::app(lazy_state());

        let mut request = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            request = request.header(AUTHORIZATION, auth);
        }

        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        (status, response_body_json(response).await)
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let (status, body) = send(Method::GET, "/nope", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Not found." }));
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_404() {
        let (status, body) = send(Method::GET, "/api/tags/abc/", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "detail": "Not found." }));
    }

    #[tokio::test]
    async fn test_anonymous_writes_are_401() {
        let cases = [
            (Method::GET, "/api/users/me/"),
            (Method::GET, "/api/users/subscriptions/"),
            (Method::POST, "/api/users/1/subscribe/"),
            (Method::DELETE, "/api/users/1/subscribe/"),
            (Method::POST, "/api/recipes/"),
            (Method::PATCH, "/api/recipes/1/"),
            (Method::DELETE, "/api/recipes/1/"),
            (Method::POST, "/api/recipes/1/favorite/"),
            (Method::DELETE, "/api/recipes/1/favorite/"),
            (Method::POST, "/api/recipes/1/shopping_cart/"),
            (Method::DELETE, "/api/recipes/1/shopping_cart/"),
            (Method::GET, "/api/recipes/download_shopping_cart/"),
        ];

        for (method, uri) in cases {
            let (status, body) = send(method.clone(), uri, None).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
            assert_eq!(
                body,
                json!({ "detail": "Authentication credentials were not provided." }),
                "{method} {uri}"
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_auth_header_is_401() {
        for header in ["Bearer abc", "Token", "Token a b"] {
            let (status, body) = send(Method::GET, "/api/tags/", Some(header)).await;

            assert_eq!(status, StatusCode::UNAUTHORIZED, "{header}");
            assert_eq!(body, json!({ "detail": "Invalid token." }), "{header}");
        }
    }
}
