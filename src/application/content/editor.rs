use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::error::ContentError;
use crate::application::scope::Scope;
use crate::application::transport::{Transport, UploadFile};
use crate::infra::lock::mutex_lock;
use crate::infra::telemetry::UPLOAD_DISCARDED;

const SOURCE: &str = "application::content::editor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    pub url: String,
    pub mime: String,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Inserted(UploadedImage),
    /// The editor was closed before the upload finished; nothing to insert.
    Discarded,
}

/// One open editor instance.
///
/// Uploads started here only count while the editor is open. Identical
/// bytes are uploaded once per session and reuse the returned URL.
pub struct EditorSession<T> {
    transport: Arc<T>,
    scope: Scope,
    uploaded: Mutex<HashMap<String, UploadedImage>>,
}

impl<T: Transport> EditorSession<T> {
    pub fn open(transport: Arc<T>) -> Self {
        Self {
            transport,
            scope: Scope::new(),
            uploaded: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_open(&self) -> bool {
        !self.scope.is_closed()
    }

    pub fn close(&self) {
        self.scope.close();
    }

    pub async fn upload_image(
        &self,
        file_name: &str,
        bytes: Bytes,
    ) -> Result<UploadOutcome, ContentError> {
        if !self.is_open() {
            return Err(ContentError::EditorClosed);
        }
        if bytes.is_empty() {
            return Err(ContentError::EmptyUpload);
        }

        let size = imagesize::blob_size(&bytes).map_err(|_| ContentError::NotAnImage {
            file_name: file_name.to_string(),
        })?;
        let mime = mime_guess::from_path(file_name)
            .first_raw()
            .unwrap_or("application/octet-stream");
        if !mime.starts_with("image/") {
            return Err(ContentError::UnsupportedType {
                file_name: file_name.to_string(),
                mime: mime.to_string(),
            });
        }

        let digest = hex::encode(Sha256::digest(&bytes));
        let cached = mutex_lock(&self.uploaded, SOURCE, "lookup")
            .get(&digest)
            .cloned();
        if let Some(existing) = cached {
            debug!(file_name, url = %existing.url, "reusing uploaded image");
            return Ok(UploadOutcome::Inserted(existing));
        }

        let response = self
            .transport
            .upload(UploadFile {
                file_name: file_name.to_string(),
                mime: mime.to_string(),
                bytes,
            })
            .await?;

        if !self.is_open() {
            counter!(UPLOAD_DISCARDED).increment(1);
            info!(file_name, "editor closed before upload finished; discarding");
            return Ok(UploadOutcome::Discarded);
        }

        let image = UploadedImage {
            url: response.url,
            mime: mime.to_string(),
            width: size.width,
            height: size.height,
        };
        mutex_lock(&self.uploaded, SOURCE, "store").insert(digest, image.clone());
        Ok(UploadOutcome::Inserted(image))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use backoffice_api_types::UploadResponse;
    use serde_json::Value;
    use tokio::sync::Semaphore;

    use super::*;
    use crate::application::error::ApiError;
    use crate::application::transport::WriteMethod;

    struct UploadOnly {
        gate: Semaphore,
        calls: AtomicUsize,
    }

    impl UploadOnly {
        fn new(permits: usize) -> Self {
            Self {
                gate: Semaphore::new(permits),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for UploadOnly {
        async fn get_json(&self, _: &str, _: &[(String, String)]) -> Result<Value, ApiError> {
            Err(ApiError::InvalidRequest("upload only".to_string()))
        }

        async fn send_json(
            &self,
            _: WriteMethod,
            _: &str,
            _: Option<&Value>,
        ) -> Result<Value, ApiError> {
            Err(ApiError::InvalidRequest("upload only".to_string()))
        }

        async fn upload(&self, file: UploadFile) -> Result<UploadResponse, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.acquire().await.expect("gate").forget();
            Ok(UploadResponse {
                url: format!("https://cdn.example.com/{}", file.file_name),
            })
        }
    }

    fn png(width: u32, height: u32) -> Bytes {
        let mut data = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
        data.extend_from_slice(&width.to_be_bytes());
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[8, 6, 0, 0, 0]);
        Bytes::from(data)
    }

    #[tokio::test]
    async fn uploads_image_and_reports_dimensions() {
        let editor = EditorSession::open(Arc::new(UploadOnly::new(1)));

        let outcome = editor
            .upload_image("banh-mi.png", png(640, 480))
            .await
            .expect("upload");

        assert_eq!(
            outcome,
            UploadOutcome::Inserted(UploadedImage {
                url: "https://cdn.example.com/banh-mi.png".to_string(),
                mime: "image/png".to_string(),
                width: 640,
                height: 480,
            })
        );
    }

    #[tokio::test]
    async fn identical_bytes_upload_once() {
        let transport = Arc::new(UploadOnly::new(1));
        let editor = EditorSession::open(Arc::clone(&transport));

        editor.upload_image("a.png", png(10, 10)).await.expect("first");
        editor.upload_image("a.png", png(10, 10)).await.expect("second");

        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_non_images_without_uploading() {
        let transport = Arc::new(UploadOnly::new(1));
        let editor = EditorSession::open(Arc::clone(&transport));

        let err = editor
            .upload_image("notes.png", Bytes::from_static(b"just text"))
            .await
            .expect_err("not an image");
        assert!(matches!(err, ContentError::NotAnImage { .. }));

        let err = editor
            .upload_image("photo.txt", png(4, 4))
            .await
            .expect_err("wrong extension");
        assert!(matches!(err, ContentError::UnsupportedType { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn result_after_close_is_discarded() {
        let transport = Arc::new(UploadOnly::new(0));
        let editor = EditorSession::open(Arc::clone(&transport));

        let (outcome, ()) = tokio::join!(editor.upload_image("late.png", png(1, 1)), async {
            editor.close();
            transport.gate.add_permits(1);
        });

        assert_eq!(outcome.expect("upload completes"), UploadOutcome::Discarded);
        assert!(matches!(
            editor.upload_image("again.png", png(1, 1)).await,
            Err(ContentError::EditorClosed)
        ));
    }
}
