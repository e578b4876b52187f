//! The REST backend as seen from the client. `HttpBackend` talks to the real
//! service; tests substitute their own implementation of [`Backend`].

mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientResult;
use crate::validation::{AdminForm, SignInForm, SignUpForm};

pub use http::HttpBackend;

/// Successful `/sign_in` body. Extra fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInGrant {
    pub token: String,
}

/// `/user/info/{useremail}` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub nick_name: String,
    #[serde(default)]
    pub email: String,
    /// Number of feedback entries the user has sent.
    #[serde(default)]
    pub contribution: u64,
    #[serde(default)]
    pub role: String,
}

/// Row of `GET /admin/user_manage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedUser {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub useremail: String,
    /// Role wire string.
    #[serde(default)]
    pub user_identity: String,
    #[serde(default)]
    pub user_contribution: u64,
    /// False while the account is suspended.
    #[serde(default = "available_by_default")]
    pub available: bool,
}

fn available_by_default() -> bool { true }

/// Row of `GET /admin/feedback_manage`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackEntry {
    pub datetime: String,
    pub from_user_email: String,
    pub pic_link: String,
    pub real_label: String,
    pub submit_count: u64,
    pub time_out: String,
    pub acceptable: bool,
}

/// Accept or reject one feedback picture (`POST /admin/feedback_manage`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDecision {
    pub pic_path: String,
    pub real_label: String,
    pub acceptable: bool,
}

impl FeedbackDecision {
    pub fn for_entry(entry: &FeedbackEntry, acceptable: bool) -> Self {
        Self { pic_path: entry.pic_link.clone(), real_label: entry.real_label.clone(), acceptable }
    }
}

/// One already-uploaded picture and the label the user believes is right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledFile {
    pub filename: String,
    pub label: Option<String>,
}

/// Row of `GET /user/label_pic`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTask {
    #[serde(default)]
    pub pic_link: String,
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// `POST /sign_in`. Bad credentials are an authentication error, not an authorization one.
    async fn sign_in(&self, form: &SignInForm) -> ClientResult<SignInGrant>;
    /// `POST /sign_up`.
    async fn sign_up(&self, form: &SignUpForm) -> ClientResult<()>;
    /// `GET /user/check_role/{useremail}`; returns the raw role body.
    async fn check_role(&self, useremail: &str) -> ClientResult<String>;
    /// `POST /user/info/{useremail}`.
    async fn user_info(&self, useremail: &str) -> ClientResult<UserProfile>;
    /// `GET /sign_out/{useremail}` with the token of the session being ended.
    async fn sign_out(&self, useremail: &str, token: &str) -> ClientResult<()>;

    /// `GET /admin/user_manage?useremail=`.
    async fn list_users(&self, admin_email: &str) -> ClientResult<Vec<ManagedUser>>;
    /// `POST /admin/user_manage`: flips the suspended flag of each listed account.
    async fn toggle_users(&self, admin_email: &str, user_emails: &[String]) -> ClientResult<()>;
    /// `POST /admin/user_manage/add_admin`.
    async fn add_admin(&self, admin_email: &str, form: &AdminForm) -> ClientResult<()>;
    /// `GET /admin/feedback_manage?email=`.
    async fn list_feedback(&self, admin_email: &str) -> ClientResult<Vec<FeedbackEntry>>;
    /// `POST /admin/feedback_manage`.
    async fn review_feedback(&self, admin_email: &str, decisions: &[FeedbackDecision]) -> ClientResult<()>;
    /// `POST /user/subm_fb`.
    async fn submit_feedback(&self, useremail: &str, files: &[LabeledFile]) -> ClientResult<()>;
    /// `GET /user/label_pic?email=`.
    async fn label_tasks(&self, useremail: &str) -> ClientResult<Vec<LabelTask>>;
    /// `POST /user/label_pic`.
    async fn submit_label(&self, useremail: &str, image_name: &str, image_label: &str) -> ClientResult<()>;
    /// `POST /admin/authenticate_ssh/{useremail}`; returns the terminal address.
    async fn authenticate_ssh(&self, useremail: &str) -> ClientResult<String>;
}
