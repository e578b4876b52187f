use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::{Response, Url};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::identity::RequestAuthorizer;
use crate::validation::{AdminForm, SignInForm, SignUpForm};

use super::{Backend, FeedbackDecision, FeedbackEntry, LabelTask, LabeledFile, ManagedUser, SignInGrant, UserProfile};

/// reqwest-backed client. Every authenticated call goes through the shared
/// [`RequestAuthorizer`], so the token is whatever the store holds when the
/// request is built.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    base: Url,
    client: reqwest::Client,
    authorizer: RequestAuthorizer,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig, authorizer: RequestAuthorizer) -> ClientResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = config.timeout {
            builder = builder.timeout(t);
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::internal("http_client".to_string(), e.to_string()))?;
        Ok(Self { base: config.base_url.clone(), client, authorizer })
    }

    pub fn base(&self) -> &Url { &self.base }
    pub fn authorizer(&self) -> &RequestAuthorizer { &self.authorizer }

    /// Build `<base>/<segments...>`, percent-encoding each segment (emails carry `@`).
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::internal("base_url", "base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn endpoint_with_query(&self, segments: &[&str], key: &str, value: &str) -> ClientResult<Url> {
        let mut url = self.endpoint(segments)?;
        url.query_pairs_mut().append_pair(key, value);
        Ok(url)
    }

    async fn send_raw(&self, req: reqwest::RequestBuilder, what: &str) -> ClientResult<Response> {
        let resp = req.send().await.map_err(|e| {
            warn!(target: "backend", "{} transport error: {}", what, e);
            ClientError::network("transport".to_string(), format!("{what}: {e}"))
        })?;
        debug!(target: "backend", "{} -> HTTP {}", what, resp.status().as_u16());
        Ok(resp)
    }

    async fn send(&self, req: reqwest::RequestBuilder, what: &str) -> ClientResult<Response> {
        let resp = self.send_raw(req, what).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::from_status(status.as_u16(), what));
        }
        Ok(resp)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn sign_in(&self, form: &SignInForm) -> ClientResult<SignInGrant> {
        let url = self.endpoint(&["sign_in"])?;
        let req = self.client.post(url).json(&serde_json::json!({
            "useremail": form.useremail,
            "password": form.password,
        }));
        let resp = self.send_raw(req, "sign_in").await?;
        let status = resp.status();
        if status.is_server_error() {
            return Err(ClientError::from_status(status.as_u16(), "sign_in"));
        }
        // Any other rejection means the credentials themselves were refused.
        if !status.is_success() {
            return Err(ClientError::authentication("invalid_credentials".to_string(), format!("sign_in: HTTP {}", status.as_u16())));
        }
        let grant: SignInGrant = resp
            .json()
            .await
            .map_err(|e| ClientError::internal("sign_in_body".to_string(), format!("sign_in response has no token: {e}")))?;
        if grant.token.is_empty() {
            return Err(ClientError::internal("sign_in_body", "sign_in response carried an empty token"));
        }
        // Stored tokens must be sendable; otherwise every later call would fail locally.
        if HeaderValue::from_str(&grant.token).is_err() {
            return Err(ClientError::internal("sign_in_body", "sign_in response carried a token that is not a valid header value"));
        }
        Ok(grant)
    }

    async fn sign_up(&self, form: &SignUpForm) -> ClientResult<()> {
        let url = self.endpoint(&["sign_up"])?;
        let req = self.client.post(url).json(&serde_json::json!({
            "username": form.username,
            "password": form.password,
            "repassword": form.repassword,
            "email": form.email,
        }));
        self.send(req, "sign_up").await?;
        Ok(())
    }

    async fn check_role(&self, useremail: &str) -> ClientResult<String> {
        let url = self.endpoint(&["user", "check_role", useremail])?;
        let req = self.authorizer.authorize(self.client.get(url))?;
        let resp = self.send(req, "check_role").await?;
        Ok(resp.text().await?)
    }

    async fn user_info(&self, useremail: &str) -> ClientResult<UserProfile> {
        let url = self.endpoint(&["user", "info", useremail])?;
        let req = self.authorizer.authorize(self.client.post(url).json(&serde_json::json!({})))?;
        let resp = self.send(req, "user_info").await?;
        Ok(resp.json::<UserProfile>().await?)
    }

    async fn sign_out(&self, useremail: &str, token: &str) -> ClientResult<()> {
        let url = self.endpoint(&["sign_out", useremail])?;
        let req = self.authorizer.authorize_with(self.client.get(url), token)?;
        self.send(req, "sign_out").await?;
        Ok(())
    }

    async fn list_users(&self, admin_email: &str) -> ClientResult<Vec<ManagedUser>> {
        let url = self.endpoint_with_query(&["admin", "user_manage"], "useremail", admin_email)?;
        let req = self.authorizer.authorize(self.client.get(url))?;
        let resp = self.send(req, "list_users").await?;
        Ok(resp.json::<Vec<ManagedUser>>().await?)
    }

    async fn toggle_users(&self, admin_email: &str, user_emails: &[String]) -> ClientResult<()> {
        let url = self.endpoint(&["admin", "user_manage"])?;
        let req = self.client.post(url).json(&serde_json::json!({
            "admin_email": admin_email,
            "user_emails": embedded_json("user_emails", &user_emails)?,
        }));
        self.send(self.authorizer.authorize(req)?, "toggle_users").await?;
        Ok(())
    }

    async fn add_admin(&self, admin_email: &str, form: &AdminForm) -> ClientResult<()> {
        let url = self.endpoint(&["admin", "user_manage", "add_admin"])?;
        let req = self.client.post(url).json(&serde_json::json!({
            "admin_email": admin_email,
            "username": form.username,
            "useremail": form.email,
            "password": form.password,
            "repassword": form.repassword,
            "role": form.role.as_wire(),
        }));
        self.send(self.authorizer.authorize(req)?, "add_admin").await?;
        Ok(())
    }

    async fn list_feedback(&self, admin_email: &str) -> ClientResult<Vec<FeedbackEntry>> {
        let url = self.endpoint_with_query(&["admin", "feedback_manage"], "email", admin_email)?;
        let req = self.authorizer.authorize(self.client.get(url))?;
        let resp = self.send(req, "list_feedback").await?;
        Ok(resp.json::<Vec<FeedbackEntry>>().await?)
    }

    async fn review_feedback(&self, admin_email: &str, decisions: &[FeedbackDecision]) -> ClientResult<()> {
        let url = self.endpoint(&["admin", "feedback_manage"])?;
        let req = self.client.post(url).json(&serde_json::json!({
            "useremail": admin_email,
            "files_to_operate": embedded_json("files_to_operate", &decisions)?,
        }));
        self.send(self.authorizer.authorize(req)?, "review_feedback").await?;
        Ok(())
    }

    async fn submit_feedback(&self, useremail: &str, files: &[LabeledFile]) -> ClientResult<()> {
        let url = self.endpoint(&["user", "subm_fb"])?;
        let req = self.client.post(url).json(&serde_json::json!({
            "useremail": useremail,
            "file_with_label_list": embedded_json("file_with_label_list", &files)?,
        }));
        self.send(self.authorizer.authorize(req)?, "submit_feedback").await?;
        Ok(())
    }

    async fn label_tasks(&self, useremail: &str) -> ClientResult<Vec<LabelTask>> {
        let url = self.endpoint_with_query(&["user", "label_pic"], "email", useremail)?;
        let req = self.authorizer.authorize(self.client.get(url))?;
        let resp = self.send(req, "label_tasks").await?;
        Ok(resp.json::<Vec<LabelTask>>().await?)
    }

    async fn submit_label(&self, useremail: &str, image_name: &str, image_label: &str) -> ClientResult<()> {
        let url = self.endpoint(&["user", "label_pic"])?;
        let req = self.client.post(url).json(&serde_json::json!({
            "useremail": useremail,
            "image_name": image_name,
            "image_label": image_label,
        }));
        self.send(self.authorizer.authorize(req)?, "submit_label").await?;
        Ok(())
    }

    async fn authenticate_ssh(&self, useremail: &str) -> ClientResult<String> {
        let url = self.endpoint(&["admin", "authenticate_ssh", useremail])?;
        let req = self.authorizer.authorize(self.client.post(url).json(&serde_json::json!({})))?;
        let resp = self.send(req, "authenticate_ssh").await?;
        let raw = resp.text().await?;
        let trimmed = raw.trim();
        Ok(serde_json::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_string()))
    }
}

/// The backend expects list payloads as a JSON document inside a string field.
fn embedded_json<T: serde::Serialize + ?Sized>(field: &str, value: &T) -> ClientResult<String> {
    serde_json::to_string(value).map_err(|e| ClientError::internal(format!("{field}_encode"), e.to_string()))
}
