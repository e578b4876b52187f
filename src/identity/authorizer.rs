use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::{ClientError, ClientResult};

use super::credential::CredentialStore;

/// Header the backend reads the session token from.
pub const DEFAULT_AUTH_HEADER: &str = "auth-token";

/// Process-wide request policy: every request built through it carries the
/// stored token, read at construction time. There is no per-call state, so
/// a sign-out is visible to the very next request.
#[derive(Clone, Debug)]
pub struct RequestAuthorizer {
    header: HeaderName,
    credentials: CredentialStore,
}

impl RequestAuthorizer {
    pub fn new(credentials: CredentialStore, header: &str) -> ClientResult<Self> {
        let header = HeaderName::from_bytes(header.trim().as_bytes())
            .map_err(|e| ClientError::validation("auth_header".to_string(), format!("invalid auth header name '{header}': {e}")))?;
        Ok(Self { header, credentials })
    }

    pub fn header_name(&self) -> &HeaderName { &self.header }

    /// Headers to attach right now; empty when signed out.
    pub fn headers(&self) -> ClientResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.credentials.get_token() {
            headers.insert(self.header.clone(), token_value(&token)?);
        }
        Ok(headers)
    }

    pub fn authorize(&self, req: reqwest::RequestBuilder) -> ClientResult<reqwest::RequestBuilder> {
        Ok(req.headers(self.headers()?))
    }

    /// Attach an explicit token, bypassing the store. Used for the sign-out
    /// notification, which is sent after the store has been cleared.
    pub fn authorize_with(&self, req: reqwest::RequestBuilder, token: &str) -> ClientResult<reqwest::RequestBuilder> {
        Ok(req.header(self.header.clone(), token_value(token)?))
    }
}

fn token_value(token: &str) -> ClientResult<HeaderValue> {
    let mut value = HeaderValue::from_str(token)
        .map_err(|_| ClientError::validation("auth_token", "stored token is not a valid header value"))?;
    value.set_sensitive(true);
    Ok(value)
}
