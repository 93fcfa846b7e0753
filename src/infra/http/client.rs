use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use backoffice_api_types::{ApiErrorBody, UploadResponse};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, multipart};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::application::error::{ApiError, error_chain};
use crate::application::session::Session;
use crate::application::transport::{Transport, UploadFile, WriteMethod};
use crate::config::ApiSettings;
use crate::infra::error::InfraError;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest plain-text error body surfaced as a message.
const MAX_PLAIN_MESSAGE_LEN: usize = 300;

/// Authenticated JSON client rooted at the configured API base URL.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
    upload_path: String,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings, session: Arc<Session>) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base: settings.base_url.clone(),
            upload_path: settings.upload_path.clone(),
            session,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("backoffice/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ApiError::InvalidRequest(format!("bad path `{path}`: {err}")))
    }

    /// Send one request and decode the JSON body. The bearer token is read
    /// from the session on every call so a reset takes effect immediately.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let mut url = self.url(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let mut req = self.prepare(method.clone(), url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let started = Instant::now();
        let response = req.send().await.map_err(transport_error)?;
        debug!(
            %method,
            path,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "api request completed"
        );
        Self::handle(response).await
    }

    fn prepare(&self, method: Method, url: Url) -> RequestBuilder {
        let req = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());
        match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn handle(response: Response) -> Result<Value, ApiError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_error)?;
        if !status.is_success() {
            let err = classify_failure(status, &bytes);
            warn!(status = status.as_u16(), error = %err, "api request failed");
            return Err(err);
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes)
            .map_err(|err| ApiError::Decode(format!("failed to parse body: {err}")))
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError> {
        self.request(Method::GET, path, query, None).await
    }

    async fn send_json(
        &self,
        method: WriteMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let method = match method {
            WriteMethod::Post => Method::POST,
            WriteMethod::Put => Method::PUT,
            WriteMethod::Delete => Method::DELETE,
        };
        self.request(method, path, &[], body).await
    }

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError> {
        let url = self.url(&self.upload_path)?;
        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name)
            .mime_str(&file.mime)
            .map_err(|err| ApiError::InvalidRequest(format!("bad mime type: {err}")))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .prepare(Method::POST, url)
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;
        let body = Self::handle(response).await?;
        serde_json::from_value(body)
            .map_err(|err| ApiError::Decode(format!("upload response: {err}")))
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_decode() {
        ApiError::Decode(err.to_string())
    } else {
        ApiError::Network(error_chain(&err).join(": "))
    }
}

/// Map a non-success response to the error taxonomy.
///
/// 400 and 422 carry a user-facing validation message; 401 and 403 mean the
/// session is no longer valid. Everything else is a server failure.
pub fn classify_failure(status: StatusCode, body: &[u8]) -> ApiError {
    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized { status: code },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => match failure_message(body) {
            Some(message) => ApiError::Validation {
                status: code,
                message,
            },
            None => ApiError::Server {
                status: code,
                message: None,
            },
        },
        _ => ApiError::Server {
            status: code,
            message: failure_message(body),
        },
    }
}

fn failure_message(body: &[u8]) -> Option<String> {
    if let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(body) {
        return parsed.human_message().map(str::to_string);
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    let looks_like_markup = text.starts_with('<');
    if text.is_empty() || looks_like_markup || text.len() > MAX_PLAIN_MESSAGE_LEN {
        return None;
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use httpmock::MockServer;
    use serde_json::json;

    use super::*;
    use crate::config::Settings;

    fn client(server: &MockServer, token: Option<&str>) -> ApiClient {
        let mut settings = Settings::default().api;
        settings.base_url = Url::parse(&server.url("/api/")).expect("mock url");
        let session = Session::in_memory("/login", token.map(str::to_string));
        ApiClient::new(&settings, Arc::new(session)).expect("client")
    }

    #[tokio::test]
    async fn attaches_bearer_token_and_query() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/api/orders")
                .query_param("pageNumber", "0")
                .query_param("keyword", "áo")
                .header("authorization", "Bearer t0k3n")
                .header_exists(REQUEST_ID_HEADER);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"content":[],"totalElements":0}"#);
        });

        let api = client(&server, Some("t0k3n"));
        let query = vec![
            ("pageNumber".to_string(), "0".to_string()),
            ("keyword".to_string(), "áo".to_string()),
        ];
        let body = api.get_json("orders", &query).await?;

        mock.assert();
        assert_eq!(body["totalElements"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn omits_authorization_without_token() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET")
                .path("/api/pages")
                .header_missing("authorization");
            then.status(200)
                .header("content-type", "application/json")
                .body("[]");
        });

        client(&server, None).get_json("pages", &[]).await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn validation_message_is_kept_verbatim() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/api/categories");
            then.status(400)
                .header("content-type", "application/json")
                .body(r#"{"status":400,"message":"Tên danh mục đã tồn tại"}"#);
        });

        let err = client(&server, Some("t"))
            .send_json(WriteMethod::Post, "categories", Some(&json!({"name": "x"})))
            .await
            .expect_err("validation error");

        assert_eq!(
            err,
            ApiError::Validation {
                status: 400,
                message: "Tên danh mục đã tồn tại".to_string()
            }
        );
    }

    #[tokio::test]
    async fn auth_failures_are_classified() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/api/users");
            then.status(403);
        });

        let err = client(&server, Some("expired"))
            .get_json("users", &[])
            .await
            .expect_err("forbidden");
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/api/news");
            then.status(200).delay(Duration::from_secs(3)).body("{}");
        });

        let mut settings = Settings::default().api;
        settings.base_url = Url::parse(&server.url("/api/")).expect("mock url");
        settings.timeout = Duration::from_millis(200);
        let api = ApiClient::new(&settings, Arc::new(Session::in_memory("/login", None)))
            .expect("client");

        let err = api.get_json("news", &[]).await.expect_err("timeout");
        assert_eq!(err, ApiError::Timeout);
    }

    #[tokio::test]
    async fn empty_success_body_is_null() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("DELETE").path("/api/recipes/7");
            then.status(204);
        });

        let body = client(&server, Some("t"))
            .send_json(WriteMethod::Delete, "recipes/7", None)
            .await?;
        mock.assert();
        assert_eq!(body, Value::Null);
        Ok(())
    }

    #[tokio::test]
    async fn upload_posts_multipart_and_reads_url() -> Result<(), ApiError> {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/api/uploads")
                .header("authorization", "Bearer t")
                .body_includes("filename=\"cake.png\"");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"url":"https://cdn.example.com/cake.png"}"#);
        });

        let uploaded = client(&server, Some("t"))
            .upload(UploadFile {
                file_name: "cake.png".to_string(),
                mime: "image/png".to_string(),
                bytes: bytes::Bytes::from_static(b"\x89PNG"),
            })
            .await?;

        mock.assert();
        assert_eq!(uploaded.url, "https://cdn.example.com/cake.png");
        Ok(())
    }

    #[test]
    fn plain_text_and_markup_bodies() {
        let err = classify_failure(StatusCode::UNPROCESSABLE_ENTITY, b"Price must be positive");
        assert_eq!(err.server_message(), Some("Price must be positive"));

        let err = classify_failure(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>");
        assert_eq!(
            err,
            ApiError::Server {
                status: 502,
                message: None
            }
        );
    }
}
