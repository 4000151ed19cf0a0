//! Session token lookup.
//!
//! The token is issued by the backend's auth endpoints and stored by
//! whatever logged the user in. Lookup order: `--token` / `TASKWIRE_TOKEN`,
//! then `<data-dir>/token`, then `token` in `config.toml`.

use std::fmt;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use tracing::warn;

use crate::config::FileConfig;
use crate::paths::DataDir;

/// Opaque bearer credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Trimmed token, or `None` for blank input
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `exp` claim of a JWT-shaped token (signature is not checked).
    pub fn expires_at(&self) -> Option<u64> {
        let mut segments = self.0.split('.');
        let (_header, payload, _sig) = (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;
        let exp = claims.get("exp")?;
        exp.as_u64().or_else(|| exp.as_f64().map(|f| f as u64))
    }

    /// Opaque tokens never expire from the client's point of view.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        let Some(exp) = self.expires_at() else {
            return false;
        };
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        exp <= now_secs
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemTime::now())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Where tokens are found on disk
#[derive(Debug, Clone)]
pub struct TokenStore {
    data_dir: DataDir,
}

impl TokenStore {
    pub fn new(data_dir: DataDir) -> Self {
        Self { data_dir }
    }

    pub fn path(&self) -> std::path::PathBuf {
        self.data_dir.token_path()
    }

    /// First non-blank token from flag/env, token file, config file.
    pub fn resolve(&self, flag: Option<&str>, file: &FileConfig) -> Option<SessionToken> {
        if let Some(token) = flag.and_then(SessionToken::parse) {
            return Some(token);
        }
        if let Some(token) = self.read_token_file() {
            return Some(token);
        }
        file.token.as_deref().and_then(SessionToken::parse)
    }

    /// A missing file is normal; any other read error is logged and skipped.
    fn read_token_file(&self) -> Option<SessionToken> {
        let path = self.data_dir.token_path();
        match std::fs::read_to_string(&path) {
            Ok(raw) => SessionToken::parse(&raw),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(
                    component = "token",
                    event = "token.file.unreadable",
                    path = %path.display(),
                    error = %e,
                    "Ignoring unreadable token file"
                );
                None
            }
        }
    }

    /// Write the token file, readable by the owner only.
    pub fn save(&self, token: &SessionToken) -> io::Result<()> {
        std::fs::create_dir_all(self.data_dir.root())?;
        let path = self.data_dir.token_path();
        std::fs::write(&path, token.expose())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}
