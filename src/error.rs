//! Unified client error model.
//! Every failure the application context can meet (bad form input, rejected
//! credentials, expired tokens, transport trouble, guard violations) is one of
//! these variants. None of them is fatal; each maps to a transient notification.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientError {
    /// Malformed sign-up/sign-in input, or a response the backend flagged as invalid input.
    #[error("{code}: {message}")]
    Validation { code: String, message: String },
    /// Bad credentials on sign-in.
    #[error("{code}: {message}")]
    Authentication { code: String, message: String },
    /// The backend rejected the token attached to an authenticated call.
    #[error("{code}: {message}")]
    Authorization { code: String, message: String },
    /// Transport failure or an unexpected status unrelated to auth.
    #[error("{code}: {message}")]
    Network { code: String, message: String },
    /// A synchronous precondition failed before any request was issued.
    #[error("{code}: {message}")]
    Guard { code: String, message: String },
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl ClientError {
    pub fn code_str(&self) -> &str {
        match self {
            ClientError::Validation { code, .. }
            | ClientError::Authentication { code, .. }
            | ClientError::Authorization { code, .. }
            | ClientError::Network { code, .. }
            | ClientError::Guard { code, .. }
            | ClientError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            ClientError::Validation { message, .. }
            | ClientError::Authentication { message, .. }
            | ClientError::Authorization { message, .. }
            | ClientError::Network { message, .. }
            | ClientError::Guard { message, .. }
            | ClientError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { ClientError::Validation { code: code.into(), message: msg.into() } }
    pub fn authentication<S: Into<String>>(code: S, msg: S) -> Self { ClientError::Authentication { code: code.into(), message: msg.into() } }
    pub fn authorization<S: Into<String>>(code: S, msg: S) -> Self { ClientError::Authorization { code: code.into(), message: msg.into() } }
    pub fn network<S: Into<String>>(code: S, msg: S) -> Self { ClientError::Network { code: code.into(), message: msg.into() } }
    pub fn guard<S: Into<String>>(code: S, msg: S) -> Self { ClientError::Guard { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { ClientError::Internal { code: code.into(), message: msg.into() } }

    /// Map a non-success HTTP status from an authenticated call.
    /// 401 means the token was rejected; 400/422 are input problems; everything
    /// else is treated as a transport-level failure the user may retry.
    pub fn from_status(status: u16, context: &str) -> Self {
        match status {
            401 => ClientError::authorization("token_rejected".to_string(), format!("{context}: HTTP 401")),
            400 | 422 => ClientError::validation("rejected_input".to_string(), format!("{context}: HTTP {status}")),
            _ => ClientError::network("http_status".to_string(), format!("{context}: HTTP {status}")),
        }
    }

    pub fn is_authorization(&self) -> bool { matches!(self, ClientError::Authorization { .. }) }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return ClientError::internal("decode".to_string(), err.to_string());
        }
        if let Some(status) = err.status() {
            return ClientError::from_status(status.as_u16(), "request failed");
        }
        ClientError::network("transport".to_string(), err.to_string())
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
