use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
};
use db::users::User;

use super::{ServerError, WithStatus as _};
use crate::AppState;

const TOKEN_KEYWORD: &str = "Token";

/// The caller, required. Anonymous requests are rejected with 401.
#[derive(Debug, Clone)]
pub(crate) struct CurrentUser(pub User);

/// The caller if a token was sent. A token that is sent but unknown is still
/// rejected, so a stale client does not silently browse anonymously.
#[derive(Debug, Clone)]
pub(crate) struct MaybeUser(pub Option<User>);

impl MaybeUser {
    pub(crate) fn user_id(&self) -> Option<i64> {
        self.0.as_ref().map(|user| user.user_id)
    }
}

/// Pulls the key out of an `Authorization: Token <key>` header.
fn token_from_headers(headers: &HeaderMap) -> Result<Option<&str>, ServerError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| ServerError::invalid_token())?;
    let (keyword, key) = header.split_once(' ').ok_or_else(ServerError::invalid_token)?;

    if !keyword.eq_ignore_ascii_case(TOKEN_KEYWORD) || key.is_empty() || key.contains(' ') {
        return Err(ServerError::invalid_token());
    }

    Ok(Some(key))
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(key) = token_from_headers(&parts.headers)? else {
            return Ok(MaybeUser(None));
        };

        let user = User::find_by_token(&state.db, key)
            .await
            .with_status(StatusCode::INTERNAL_SERVER_ERROR)?;

        match user {
            Some(user) => Ok(MaybeUser(Some(user))),
            None => Err(ServerError::invalid_token()),
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;

        user.map(CurrentUser).ok_or_else(ServerError::unauthorized)
    }
}

#[cfg(test)]
mod test {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_no_header_is_anonymous() {
        assert_eq!(token_from_headers(&HeaderMap::new()).unwrap(), None);
    }

    #[test]
    fn test_token_header() {
        let headers = headers("Token 9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b");

        assert_eq!(
            token_from_headers(&headers).unwrap(),
            Some("9944b09199c62bcf9418ad846dd0e4bbdfc6ee4b")
        );
    }

    #[test]
    fn test_keyword_is_case_insensitive() {
        assert_eq!(token_from_headers(&headers("token abc")).unwrap(), Some("abc"));
    }

    #[test]
    fn test_malformed_headers_are_rejected() {
        for value in ["Bearer abc", "Token", "Token ", "Token a b", "abc"] {
            let err = token_from_headers(&headers(value)).unwrap_err();
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "{value}");
            assert_eq!(err.to_string(), "Invalid token.", "{value}");
        }
    }
}
