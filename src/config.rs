//! Configuration options for the Loja client

use std::path::PathBuf;
use std::time::Duration;

/// API address used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Environment variable holding the API address
pub const API_URL_ENV: &str = "LOJA_API_URL";

/// Older variable name, still honoured
pub const LEGACY_API_URL_ENV: &str = "API_URL";

/// Configuration options for the Loja client
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Base URL of the API, always ending in `/api`
    pub api_url: String,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// Directory for locally persisted state. `None` keeps state in memory.
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: Some(Duration::from_secs(10)),
            storage_dir: None,
        }
    }
}

impl ClientOptions {
    /// Defaults, with the API address taken from `LOJA_API_URL` (or
    /// `API_URL`) when set
    pub fn from_env() -> Self {
        let from_env = std::env::var(API_URL_ENV)
            .or_else(|_| std::env::var(LEGACY_API_URL_ENV))
            .ok()
            .filter(|value| !value.trim().is_empty());

        match from_env {
            Some(url) => Self::default().with_api_url(&url),
            None => Self::default(),
        }
    }

    /// Set the API base URL. `/api` is appended when missing.
    pub fn with_api_url(mut self, value: &str) -> Self {
        self.api_url = normalize_api_url(value);
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Persist local state under `dir`
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }
}

/// `https://host` and `https://host/api/` both become `https://host/api`
pub fn normalize_api_url(url: &str) -> String {
    format!("{}/api", strip_api_suffix(url))
}

/// Drop trailing slashes and a trailing `/api` segment
pub fn strip_api_suffix(url: &str) -> &str {
    let trimmed = url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/api").unwrap_or(trimmed)
}

/// Replace the `name=...` line of a dotenv-style file, appending it when
/// absent. Other lines are left untouched.
pub fn rewrite_env_var(contents: &str, name: &str, value: &str) -> String {
    let assignment = format!("{}={}", name, value);
    let mut replaced = false;

    let mut lines: Vec<String> = contents
        .lines()
        .map(|line| {
            let key = line
                .trim_start()
                .trim_start_matches("export ")
                .split('=')
                .next()
                .unwrap_or("")
                .trim();
            if key == name && !replaced {
                replaced = true;
                assignment.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if !replaced {
        lines.push(assignment);
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
