//! ============================================================================
//! Portal API - Payment, identity and catalog collaborators over HTTP
//! ============================================================================
//! The gate only talks to the backend through `PortalApi`, so it can run
//! against the real service or a scripted fake.
//! ============================================================================

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{Course, CoursesResponse, PaymentInitResponse, PaymentStatus, UserProfile};
use crate::config::PortalConfig;
use crate::error::ApiError;

pub const PAYMENT_STATUS_PATH: &str = "/api/payment/status";
pub const PAYMENT_INIT_PATH: &str = "/api/payment/init";
pub const MY_COURSES_PATH: &str = "/api/courses/my";
pub const CURRENT_USER_PATH: &str = "/api/auth/me";

/// Backend services consumed by the access gate
#[async_trait]
pub trait PortalApi: Send + Sync {
    /// Payment Service: current payment status
    async fn payment_status(&self) -> Result<PaymentStatus, ApiError>;

    /// Payment Service: start a checkout session
    async fn init_payment(&self) -> Result<PaymentInitResponse, ApiError>;

    /// Course Catalog Service: courses visible to the user
    async fn my_courses(&self) -> Result<Vec<Course>, ApiError>;

    /// Identity Service: the signed-in user
    async fn current_user(&self) -> Result<UserProfile, ApiError>;
}

/// `PortalApi` backed by reqwest
pub struct HttpPortalApi {
    client: reqwest::Client,
    config: PortalConfig,
}

impl HttpPortalApi {
    pub fn new(config: PortalConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &config.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| ApiError::Network(format!("Invalid session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.config.endpoint(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        decode(response).await
    }

    async fn post(&self, path: &str) -> Result<reqwest::Response, ApiError> {
        let url = self.config.endpoint(path);
        debug!("POST {}", url);

        self.client
            .post(&url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }
}

/// Map status codes onto `ApiError` and decode the body
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    let body = read_body(response).await?;
    if !status.is_success() {
        return Err(status_error(status, body));
    }

    parse_body(&body)
}

async fn read_body(response: reqwest::Response) -> Result<String, ApiError> {
    response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))
}

fn status_error(status: StatusCode, body: String) -> ApiError {
    if status == StatusCode::UNAUTHORIZED {
        ApiError::AuthRequired
    } else {
        ApiError::Status {
            status: status.as_u16(),
            body,
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Malformed(e.to_string()))
}

#[async_trait]
impl PortalApi for HttpPortalApi {
    async fn payment_status(&self) -> Result<PaymentStatus, ApiError> {
        self.get_json(PAYMENT_STATUS_PATH).await
    }

    async fn init_payment(&self) -> Result<PaymentInitResponse, ApiError> {
        let response = self.post(PAYMENT_INIT_PATH).await?;
        let status = response.status();
        if status.is_success() {
            return decode(response).await;
        }

        // Rejections carry `{status: false, message}` with a 4xx/5xx code
        let body = read_body(response).await?;
        match serde_json::from_str::<PaymentInitResponse>(&body) {
            Ok(rejection) if rejection.message.is_some() => {
                debug!("Payment init rejected with {}", status);
                Ok(rejection)
            }
            _ => Err(status_error(status, body)),
        }
    }

    async fn my_courses(&self) -> Result<Vec<Course>, ApiError> {
        let response: CoursesResponse = self.get_json(MY_COURSES_PATH).await?;
        Ok(response.into_courses())
    }

    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get_json(CURRENT_USER_PATH).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::testing::serve_once;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_body_malformed() {
        let result: Result<PaymentStatus, ApiError> = parse_body("<html>oops</html>");
        assert_eq!(result.unwrap_err().kind(), ErrorKind::MalformedResponse);

        let result: Result<PaymentStatus, ApiError> = parse_body(r#"{"amount":1}"#);
        assert!(matches!(result, Err(ApiError::Malformed(_))));
    }

    #[test]
    fn test_parse_body_ok() {
        let status: PaymentStatus = parse_body(r#"{"status":"paid","amount":20000}"#).unwrap();
        assert_eq!(status.status, "paid");
    }

    #[test]
    fn test_client_creation_with_cookie() {
        let config = PortalConfig {
            session_cookie: Some("session=abc123".into()),
            ..PortalConfig::default()
        };
        assert!(HttpPortalApi::new(config).is_ok());
    }

    #[test]
    fn test_client_rejects_invalid_cookie() {
        let config = PortalConfig {
            session_cookie: Some("bad\ncookie".into()),
            ..PortalConfig::default()
        };
        assert!(HttpPortalApi::new(config).is_err());
    }

    fn api_for(base_url: String) -> HttpPortalApi {
        HttpPortalApi::new(PortalConfig {
            base_url,
            ..PortalConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_status_401_is_auth_required() {
        let base = serve_once("401 UNAUTHORIZED", r#"{"error":"Not authenticated"}"#);
        let err = api_for(base).payment_status().await.unwrap_err();
        assert!(err.is_auth_required());
    }

    #[tokio::test]
    async fn test_status_500_keeps_body() {
        let base = serve_once("500 INTERNAL SERVER ERROR", "boom");
        match api_for(base).payment_status().await {
            Err(ApiError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_html_200_is_malformed() {
        let base = serve_once("200 OK", "<html><body>Login</body></html>");
        let err = api_for(base).payment_status().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[tokio::test]
    async fn test_status_200_decodes() {
        let base = serve_once("200 OK", r#"{"amount":20000,"status":"unpaid"}"#);
        let status = api_for(base).payment_status().await.unwrap();
        assert_eq!(status.status, "unpaid");
        assert_eq!(status.amount, Some(20000.0));
    }

    #[tokio::test]
    async fn test_payment_init_rejection_with_error_status() {
        let base = serve_once("404 NOT FOUND", r#"{"status":false,"message":"User not found"}"#);
        let response = api_for(base).init_payment().await.unwrap();
        assert!(!response.status);
        assert_eq!(response.message.as_deref(), Some("User not found"));
    }

    #[tokio::test]
    async fn test_payment_init_401_with_message_is_rejection() {
        let base =
            serve_once("401 UNAUTHORIZED", r#"{"status":false,"message":"Not authenticated"}"#);
        let response = api_for(base).init_payment().await.unwrap();
        assert_eq!(response.message.as_deref(), Some("Not authenticated"));
    }

    #[tokio::test]
    async fn test_payment_init_403_without_message_is_error() {
        let base = serve_once("403 FORBIDDEN", "<h1>Forbidden</h1>");
        match api_for(base).init_payment().await {
            Err(ApiError::Status { status, .. }) => assert_eq!(status, 403),
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_courses_without_list_render_empty_placeholder() {
        use crate::access::render::{render_courses, ListItem, NO_COURSES_PLACEHOLDER};
        use crate::access::types::AccessState;

        for body in [r#"{}"#, r#"{"courses":null}"#] {
            let base = serve_once("200 OK", body);
            let courses = api_for(base).my_courses().await.unwrap();
            assert!(courses.is_empty());

            let view = render_courses(&courses, AccessState::Paid);
            assert_eq!(
                view.items,
                vec![ListItem::Placeholder { text: NO_COURSES_PLACEHOLDER.into() }]
            );
        }
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        // Port 9 (discard) on loopback is closed in test environments
        let config = PortalConfig {
            base_url: "http://127.0.0.1:9".into(),
            ..PortalConfig::default()
        };
        let api = HttpPortalApi::new(config).unwrap();
        let err = api.payment_status().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransientNetwork);
    }
}
