//! Rich-text helpers used by editor screens.

mod editor;
mod error;
mod sanitize;
mod toc;

pub use editor::{EditorSession, UploadOutcome, UploadedImage};
pub use error::ContentError;
pub use sanitize::sanitize_html;
pub use toc::{TocDocument, TocEntry, extract_toc};
