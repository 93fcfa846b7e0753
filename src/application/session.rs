//! Persisted bearer-token session.
//!
//! The token lives in a small TOML file so separate CLI invocations share one
//! login. A missing or unreadable file simply means there is no token.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::config::SessionSettings;
use crate::infra::lock::mutex_lock;

const SOURCE: &str = "application::session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("token must not be empty")]
    EmptyToken,
    #[error("token contains whitespace or control characters")]
    MalformedToken,
    #[error("failed to write session file {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("failed to remove session file {path}: {source}")]
    Remove { path: String, source: io::Error },
    #[error("failed to encode session: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    token: String,
    #[serde(with = "time::serde::rfc3339")]
    saved_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct Session {
    file: Option<PathBuf>,
    login_path: String,
    token: Mutex<Option<String>>,
}

impl Session {
    /// Read the session file. Failures are logged and yield an empty session.
    pub fn load(settings: &SessionSettings) -> Self {
        let token = read_token(&settings.file);
        Self {
            file: Some(settings.file.clone()),
            login_path: settings.login_path.clone(),
            token: Mutex::new(token),
        }
    }

    /// Session that never touches the filesystem.
    pub fn in_memory(login_path: impl Into<String>, token: Option<String>) -> Self {
        Self {
            file: None,
            login_path: login_path.into(),
            token: Mutex::new(token),
        }
    }

    pub fn token(&self) -> Option<String> {
        mutex_lock(&self.token, SOURCE, "token").clone()
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    pub fn save(&self, token: &str) -> Result<(), SessionError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(SessionError::MalformedToken);
        }

        if let Some(path) = &self.file {
            let stored = StoredSession {
                token: token.to_string(),
                saved_at: OffsetDateTime::now_utc(),
            };
            write_private(path, &toml::to_string(&stored)?).map_err(|source| {
                SessionError::Write {
                    path: path.display().to_string(),
                    source,
                }
            })?;
        }

        *mutex_lock(&self.token, SOURCE, "save") = Some(token.to_string());
        info!("session token stored");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        mutex_lock(&self.token, SOURCE, "clear").take();
        if let Some(path) = &self.file {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SessionError::Remove {
                        path: path.display().to_string(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Drop the session after the server rejected it and return where the
    /// user should sign in again. The in-memory token is always cleared.
    pub fn reset(&self) -> String {
        if let Err(err) = self.clear() {
            warn!(error = %err, "failed to remove rejected session");
        }
        warn!(login_path = %self.login_path, "session rejected by server");
        self.login_path.clone()
    }

    /// Expiry of the current token when it is a JWT carrying `exp`.
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.token().as_deref().and_then(jwt_expiry)
    }
}

/// Decode the `exp` claim of a JWT without verifying it.
pub fn jwt_expiry(token: &str) -> Option<OffsetDateTime> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    OffsetDateTime::from_unix_timestamp(exp).ok()
}

fn read_token(path: &Path) -> Option<String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "session file unreadable");
            return None;
        }
    };
    match toml::from_str::<StoredSession>(&raw) {
        Ok(stored) if !stored.token.trim().is_empty() => Some(stored.token),
        Ok(_) => None,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "session file malformed");
            None
        }
    }
}

fn write_private(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    // `mode` only applies on creation; tighten a file left by an older run
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
