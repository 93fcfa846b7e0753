use thiserror::Error;

use crate::application::error::ApiError;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("failed to rewrite document: {message}")]
    Rewrite { message: String },
    #[error("`{file_name}` is not a recognizable image")]
    NotAnImage { file_name: String },
    #[error("`{file_name}` has unsupported type `{mime}`")]
    UnsupportedType { file_name: String, mime: String },
    #[error("upload is empty")]
    EmptyUpload,
    #[error("editor is closed")]
    EditorClosed,
    #[error(transparent)]
    Upload(#[from] ApiError),
}
