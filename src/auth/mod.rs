//! Gateway authentication and requester identity.
//!
//! Token validation happens upstream. The gateway proves itself with a
//! pre-shared key (compared in constant time) and forwards the authenticated
//! user in trusted identity headers, which are parsed into a [`Requester`].

use axum::{
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the gateway key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Authenticated user id (platform account id).
pub const USER_ID_HEADER: &str = "x-user-id";
/// Display name snapshot of the user.
pub const USER_NAME_HEADER: &str = "x-user-name";
/// `true` or `1` when the user has elevated privilege.
pub const USER_ADMIN_HEADER: &str = "x-user-admin";
/// Comma separated community ids the user belongs to.
pub const USER_COMMUNITIES_HEADER: &str = "x-user-communities";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    let headers = request.headers();
    let provided = header_str(headers, API_KEY_HEADER).or_else(|| {
        header_str(headers, header::AUTHORIZATION.as_str())
            .and_then(|s| s.strip_prefix("Bearer "))
    });

    let rejection = match provided {
        Some(key) if constant_time_compare(key, &expected) => None,
        Some(_) => Some("Invalid API key"),
        None => Some("Missing API key"),
    };

    match rejection {
        None => next.run(request).await,
        Some(message) => AppError::Unauthorized(message.to_string()).into_response(),
    }
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Header value as UTF-8. Display names are not limited to visible ASCII.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// The authenticated user behind a request, passed explicitly to every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    pub user_id: String,
    pub display_name: String,
    pub is_admin: bool,
    pub communities: Vec<String>,
}

impl Requester {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        let user_id = header_str(headers, USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing user identity".to_string()))?
            .to_string();

        let display_name = header_str(headers, USER_NAME_HEADER)
            .map(str::to_string)
            .unwrap_or_else(|| user_id.clone());

        let is_admin = header_str(headers, USER_ADMIN_HEADER)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let communities = header_str(headers, USER_COMMUNITIES_HEADER)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            user_id,
            display_name,
            is_admin,
            communities,
        })
    }
}

impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Requester::from_headers(&parts.headers)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_constant_time_compare_equal() {
        assert!(constant_time_compare("test-key-123", "test-key-123"));
    }

    #[test]
    fn test_constant_time_compare_not_equal() {
        assert!(!constant_time_compare("test-key-123", "test-key-124"));
    }

    #[test]
    fn test_constant_time_compare_different_lengths() {
        assert!(!constant_time_compare("short", "much-longer-key"));
    }

    #[test]
    fn test_requester_from_full_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("76561198000000001"));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_static("Hawk"));
        headers.insert(USER_ADMIN_HEADER, HeaderValue::from_static("TRUE"));
        headers.insert(
            USER_COMMUNITIES_HEADER,
            HeaderValue::from_static("allies, ,axis"),
        );

        let requester = Requester::from_headers(&headers).unwrap();
        assert_eq!(requester.user_id, "76561198000000001");
        assert_eq!(requester.display_name, "Hawk");
        assert!(requester.is_admin);
        assert_eq!(requester.communities, vec!["allies", "axis"]);
    }

    #[test]
    fn test_requester_defaults() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));

        let requester = Requester::from_headers(&headers).unwrap();
        assert_eq!(requester.display_name, "u1");
        assert!(!requester.is_admin);
        assert!(requester.communities.is_empty());
    }

    #[test]
    fn test_requester_keeps_non_ascii_display_name() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));
        headers.insert(
            USER_NAME_HEADER,
            HeaderValue::from_bytes("Jürgen 🎯".as_bytes()).unwrap(),
        );

        let requester = Requester::from_headers(&headers).unwrap();
        assert_eq!(requester.display_name, "Jürgen 🎯");
    }

    #[test]
    fn test_requester_ignores_invalid_utf8_display_name() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("u1"));
        headers.insert(USER_NAME_HEADER, HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());

        let requester = Requester::from_headers(&headers).unwrap();
        assert_eq!(requester.display_name, "u1");
    }

    #[test]
    fn test_requester_requires_user_id() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("   "));
        assert!(matches!(
            Requester::from_headers(&headers),
            Err(AppError::Unauthorized(_))
        ));
    }
}
