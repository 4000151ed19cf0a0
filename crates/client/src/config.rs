//! Client configuration.
//!
//! Priority: CLI flag > environment (both resolved by clap) > `<data-dir>/config.toml` > defaults.

use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::error::{ChannelError, ConfigError};
use crate::paths::DataDir;
use crate::token::SessionToken;

pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";

/// Path of the task notification socket on the backend
pub const SOCKET_PATH: &str = "/ws/tasks/";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub origin: Option<String>,
    pub token: Option<String>,
}

impl FileConfig {
    /// Load `path`; a missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// The backend the client talks to: `http(s)://host[:port]`.
///
/// REST URLs hang off it directly; the socket URL swaps the scheme for
/// `ws`/`wss`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    base: Url,
}

impl Origin {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::Origin {
            origin: raw.to_string(),
            reason: reason.to_string(),
        };

        let mut base = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
        let http_scheme = match base.scheme() {
            "http" | "ws" => "http",
            "https" | "wss" => "https",
            other => return Err(invalid(&format!("unsupported scheme `{other}`"))),
        };
        if base.host_str().is_none() {
            return Err(invalid("missing host"));
        }
        base.set_scheme(http_scheme)
            .map_err(|()| invalid("cannot normalize scheme"))?;
        base.set_path("/");
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base })
    }

    pub fn as_str(&self) -> &str {
        self.base.as_str()
    }

    pub fn is_secure(&self) -> bool {
        self.base.scheme() == "https"
    }

    /// REST endpoint under this origin, e.g. `api_url("/api/tasks/")`
    pub fn api_url(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base.join(path)
    }

    /// `{ws|wss}://<host>/ws/tasks/?token=<token>`
    pub fn socket_url(&self, token: &SessionToken) -> Result<Url, ChannelError> {
        let mut url = self
            .api_url(SOCKET_PATH)
            .map_err(|e| ChannelError::InvalidOrigin(e.to_string()))?;
        let ws_scheme = if self.is_secure() { "wss" } else { "ws" };
        url.set_scheme(ws_scheme)
            .map_err(|()| ChannelError::InvalidOrigin(self.base.to_string()))?;
        url.query_pairs_mut().append_pair("token", token.expose());
        Ok(url)
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub origin: Origin,
    pub data_dir: DataDir,
    pub file: FileConfig,
}

impl Settings {
    /// `origin_flag` is the clap value (flag or `TASKWIRE_ORIGIN`).
    pub fn resolve(origin_flag: Option<&str>, data_dir: DataDir) -> Result<Self, ConfigError> {
        let file = FileConfig::load(&data_dir.config_path())?;
        let origin_raw = origin_flag
            .map(str::to_string)
            .or_else(|| file.origin.clone())
            .unwrap_or_else(|| DEFAULT_ORIGIN.to_string());
        let origin = Origin::parse(&origin_raw)?;
        Ok(Self {
            origin,
            data_dir,
            file,
        })
    }
}
