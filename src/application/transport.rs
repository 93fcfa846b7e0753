//! Port describing the HTTP backend the application layer talks to.

use async_trait::async_trait;
use backoffice_api_types::UploadResponse;
use bytes::Bytes;
use serde_json::Value;

use crate::application::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMethod {
    Post,
    Put,
    Delete,
}

/// An image or other file handed to the upload endpoint.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// `GET {path}?{query}` decoded as JSON. Paths are relative to the API base.
    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ApiError>;

    /// Write call; an empty response body yields `Value::Null`.
    async fn send_json(
        &self,
        method: WriteMethod,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError>;

    async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError>;
}
