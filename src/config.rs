//! Client configuration, read from the environment with defaults.
//!
//! - `INSECTID_BASE_URL` (falls back to `BASE_URL`): backend address; `http://` is assumed without a scheme.
//! - `INSECTID_AUTH_HEADER`: header carrying the token (default `auth-token`).
//! - `INSECTID_SESSION_FILE`: persist the session to this JSON file; unset keeps it in memory.
//! - `INSECTID_REMOTE_SIGN_OUT`: also tell the backend on sign-out (default false).
//! - `INSECTID_TIMEOUT_MS`: per-request timeout; unset uses the transport default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Url;

use crate::identity::{CredentialStore, JsonFileStorage, MemoryStorage, DEFAULT_AUTH_HEADER};

pub const DEFAULT_BASE_URL: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub auth_header: String,
    pub session_file: Option<PathBuf>,
    pub remote_sign_out: bool,
    pub timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; lets tests avoid mutating the process environment.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let raw_base = read("INSECTID_BASE_URL").or_else(|| read("BASE_URL")).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = normalize_base_url(&raw_base)?;
        let auth_header = read("INSECTID_AUTH_HEADER").unwrap_or_else(|| DEFAULT_AUTH_HEADER.to_string());
        let session_file = read("INSECTID_SESSION_FILE").map(PathBuf::from);
        let remote_sign_out = match read("INSECTID_REMOTE_SIGN_OUT") {
            Some(v) => parse_bool(&v).ok_or_else(|| anyhow!("INSECTID_REMOTE_SIGN_OUT: expected a boolean, got '{}'", v))?,
            None => false,
        };
        let timeout = match read("INSECTID_TIMEOUT_MS") {
            Some(v) => Some(Duration::from_millis(
                v.parse::<u64>().with_context(|| format!("INSECTID_TIMEOUT_MS: '{}' is not a number of milliseconds", v))?,
            )),
            None => None,
        };
        Ok(Self { base_url, auth_header, session_file, remote_sign_out, timeout })
    }

    pub fn with_base_url(mut self, raw: &str) -> Result<Self> {
        self.base_url = normalize_base_url(raw)?;
        Ok(self)
    }

    pub fn with_session_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_file = Some(path.into());
        self
    }

    /// Open the credential store this configuration asks for.
    pub fn open_credentials(&self) -> Result<CredentialStore> {
        match &self.session_file {
            Some(p) => Ok(CredentialStore::new(JsonFileStorage::open(p)?)),
            None => Ok(CredentialStore::new(MemoryStorage::new())),
        }
    }
}

/// Accept `host:port`, `http://host:port` or `https://host/prefix`; always end
/// with `/` so relative joins stay under the prefix.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    let with_scheme = if raw.contains("://") { raw.to_string() } else { format!("http://{raw}") };
    let mut url = Url::parse(&with_scheme).with_context(|| format!("invalid base URL '{}'", raw))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(anyhow!("unsupported base URL scheme '{}'", other)),
    }
    if !url.path().ends_with('/') {
        let p = format!("{}/", url.path());
        url.set_path(&p);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
