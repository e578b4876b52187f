//! Application context: one explicitly constructed object that owns the
//! credential store, the session and navigation controllers, the backend and
//! the notification sink. Screens receive a reference to it instead of
//! reading ambient globals.
//!
//! All operations take `&self`. Session and navigation state sit behind
//! mutexes that are never held across an `.await`, so a sign-out issued while
//! a role lookup is pending takes effect immediately and the late response is
//! dropped by its ticket.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::backend::{
    Backend, FeedbackDecision, FeedbackEntry, HttpBackend, LabelTask, LabeledFile, ManagedUser, UserProfile,
};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::identity::{
    Credential, CredentialStore, NavigationController, RequestAuthorizer, Role, SectionId, SessionController,
    SessionState,
};
use crate::notify::{Notification, Notifier};
use crate::validation::{AdminForm, SignInForm, SignUpForm};

pub struct AppContext<B: Backend> {
    backend: B,
    session: Mutex<SessionController>,
    navigation: Mutex<NavigationController>,
    notifier: Arc<dyn Notifier>,
    remote_sign_out: bool,
}

impl AppContext<HttpBackend> {
    /// Wire the HTTP client against the configured storage.
    pub fn from_config(config: &ClientConfig, notifier: Arc<dyn Notifier>) -> anyhow::Result<Self> {
        let credentials = config.open_credentials()?;
        let authorizer = RequestAuthorizer::new(credentials.clone(), &config.auth_header)
            .context("While configuring the request authorizer")?;
        let backend = HttpBackend::new(config, authorizer).context("While building the HTTP client")?;
        Ok(Self::new(credentials, backend, notifier).with_remote_sign_out(config.remote_sign_out))
    }
}

impl<B: Backend> AppContext<B> {
    pub fn new(credentials: CredentialStore, backend: B, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            backend,
            session: Mutex::new(SessionController::new(credentials)),
            navigation: Mutex::new(NavigationController::new()),
            notifier,
            remote_sign_out: false,
        }
    }

    pub fn with_remote_sign_out(mut self, enabled: bool) -> Self {
        self.remote_sign_out = enabled;
        self
    }

    pub fn backend(&self) -> &B { &self.backend }
    pub fn state(&self) -> SessionState { self.session.lock().state() }
    pub fn credential(&self) -> Credential { self.session.lock().credentials().credential() }

    pub fn visible_sections(&self) -> BTreeSet<SectionId> {
        let state = self.state();
        self.navigation.lock().visible_sections(&state)
    }

    /// Startup hook: a session restored from storage still needs its role.
    pub async fn start(&self) {
        self.settle().await;
    }

    pub async fn sign_in(&self, form: &SignInForm) -> ClientResult<SessionState> {
        if let Err(err) = form.validate() {
            self.notifier.notify(Notification::from_error(&err));
            return Err(err);
        }
        if let Err(err) = self.session.lock().guard_sign_in() {
            self.notifier.notify(Notification::from_error(&err));
            return Err(err);
        }
        let grant = match self.backend.sign_in(form).await {
            Ok(g) => g,
            Err(err) => {
                info!(target: "session", "sign in failed for {}: {}", form.useremail, err);
                let note = match &err {
                    ClientError::Network { .. } => Notification::network_error(),
                    ClientError::Internal { .. } => Notification::from_error(&err),
                    _ => Notification::sign_in_failed(),
                };
                self.notifier.notify(note);
                return Err(err);
            }
        };
        // Another sign-in may have completed while this one was in flight.
        let applied = self.session.lock().sign_in_success(&grant.token, &form.useremail);
        if let Err(err) = applied {
            self.notifier.notify(Notification::from_error(&err));
            return Err(err);
        }
        self.notifier.notify(Notification::signed_in());
        self.settle().await;
        Ok(self.state())
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> ClientResult<()> {
        if let Err(err) = form.validate() {
            self.notifier.notify(Notification::from_error(&err));
            return Err(err);
        }
        match self.backend.sign_up(form).await {
            Ok(()) => {
                self.session.lock().sign_up_success();
                info!(target: "session", "account created for {}", form.email);
                self.notifier.notify(Notification::signed_up());
                Ok(())
            }
            Err(err) => {
                let note = match &err {
                    ClientError::Network { .. } => Notification::network_error(),
                    _ => Notification::sign_up_failed(),
                };
                self.notifier.notify(note);
                Err(err)
            }
        }
    }

    /// Clears the credential before anything else, so no request built after
    /// this call carries the old token. The backend is told afterwards, if
    /// configured, using the token captured here. Refused when signed out.
    pub async fn sign_out(&self) -> ClientResult<SessionState> {
        let (previous, state) = {
            let mut session = self.session.lock();
            if !session.state().signed_in {
                (None, session.state())
            } else {
                let previous = session.credentials().credential();
                (Some(previous), session.sign_out_confirmed())
            }
        };
        let Some(previous) = previous else {
            let err = ClientError::guard("not_signed_in", "You have not signed in!");
            self.notifier.notify(Notification::from_error(&err));
            return Err(err);
        };
        self.navigation.lock().observe(&state);
        self.notifier.notify(Notification::signed_out());
        if self.remote_sign_out {
            if let (Some(user), Some(token)) = (previous.user_identifier, previous.token) {
                if let Err(err) = self.backend.sign_out(&user, &token).await {
                    warn!(target: "session", "backend sign out for {} failed: {}", user, err);
                }
            }
        }
        Ok(state)
    }

    /// Run the role lookup if one is due. `Ok(None)` means nothing was applied:
    /// no lookup was due, or the response arrived for a session that is gone.
    pub async fn refresh_role(&self) -> ClientResult<Option<Role>> {
        let Some(ticket) = self.session.lock().begin_role_lookup() else {
            return Ok(None);
        };
        match self.backend.check_role(ticket.user()).await {
            Ok(body) => {
                let role = Role::decode(&body);
                let applied = self.session.lock().role_lookup_success(&ticket, role);
                if applied {
                    let state = self.state();
                    self.navigation.lock().observe(&state);
                }
                Ok(applied.then_some(role))
            }
            Err(err) => {
                let current = self.session.lock().role_lookup_failure(&ticket);
                if current {
                    self.report(ticket.epoch(), &err);
                } else {
                    debug!(target: "session", "ignoring failure of stale role lookup: {}", err);
                }
                Err(err)
            }
        }
    }

    pub async fn user_info(&self) -> ClientResult<UserProfile> {
        self.gated(SectionId::UserInfo, |user| async move { self.backend.user_info(&user).await }).await
    }

    pub async fn list_users(&self) -> ClientResult<Vec<ManagedUser>> {
        self.gated(SectionId::UserManage, |me| async move { self.backend.list_users(&me).await }).await
    }

    /// Suspend active accounts and reinstate suspended ones.
    pub async fn toggle_users(&self, user_emails: &[String]) -> ClientResult<()> {
        self.gated(SectionId::UserManage, |me| async move {
            if user_emails.is_empty() {
                return Err(ClientError::validation("user_emails", "Please choose at least one user!"));
            }
            self.backend.toggle_users(&me, user_emails).await
        })
        .await
    }

    pub async fn add_admin(&self, form: &AdminForm) -> ClientResult<()> {
        self.gated(SectionId::UserManage, |me| async move {
            form.validate()?;
            self.backend.add_admin(&me, form).await
        })
        .await?;
        info!(target: "session", "administrator {} created", form.email);
        self.notifier.notify(Notification::admin_added());
        Ok(())
    }

    pub async fn list_feedback(&self) -> ClientResult<Vec<FeedbackEntry>> {
        self.gated(SectionId::FeedbackManage, |me| async move { self.backend.list_feedback(&me).await }).await
    }

    pub async fn review_feedback(&self, decisions: &[FeedbackDecision]) -> ClientResult<()> {
        self.gated(SectionId::FeedbackManage, |me| async move {
            if decisions.is_empty() {
                return Err(ClientError::validation("files_to_operate", "Please choose at least one feedback!"));
            }
            self.backend.review_feedback(&me, decisions).await
        })
        .await
    }

    /// Tell the service which label each uploaded picture should have had.
    pub async fn submit_feedback(&self, files: &[LabeledFile]) -> ClientResult<()> {
        self.gated(SectionId::MainPage, |user| async move {
            if files.is_empty() {
                return Err(ClientError::validation("file_with_label_list", "Please choose the pictures to give feedback on!"));
            }
            self.backend.submit_feedback(&user, files).await
        })
        .await?;
        self.notifier.notify(Notification::feedback_submitted());
        Ok(())
    }

    pub async fn label_tasks(&self) -> ClientResult<Vec<LabelTask>> {
        self.gated(SectionId::LabelImage, |user| async move { self.backend.label_tasks(&user).await }).await
    }

    pub async fn submit_label(&self, image_name: &str, image_label: &str) -> ClientResult<()> {
        self.gated(SectionId::LabelImage, |user| async move {
            if image_name.trim().is_empty() || image_label.trim().is_empty() {
                return Err(ClientError::validation("image_label", "Please input the label of this picture!"));
            }
            self.backend.submit_label(&user, image_name, image_label.trim()).await
        })
        .await
    }

    /// Ask the backend to start a web terminal; returns its address.
    pub async fn authenticate_ssh(&self) -> ClientResult<String> {
        let dest = self.gated(SectionId::WebSsh, |me| async move { self.backend.authenticate_ssh(&me).await }).await?;
        self.notifier.notify(Notification::ssh_started());
        Ok(dest)
    }

    /// Run an authenticated call on behalf of `section`. Refused without a
    /// request when the section is not visible to the current session; any
    /// failure of the call goes through [`Self::report`].
    async fn gated<T, F, Fut>(&self, section: SectionId, call: F) -> ClientResult<T>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        let (epoch, user) = match self.admit(section) {
            Ok(admitted) => admitted,
            Err(err) => {
                self.notifier.notify(Notification::from_error(&err));
                return Err(err);
            }
        };
        match call(user).await {
            Ok(v) => Ok(v),
            Err(err) => {
                self.report(epoch, &err);
                Err(err)
            }
        }
    }

    fn admit(&self, section: SectionId) -> ClientResult<(u64, String)> {
        let (state, epoch, user) = {
            let session = self.session.lock();
            (session.state(), session.epoch(), session.credentials().get_user_identifier())
        };
        let Some(user) = user.filter(|_| state.signed_in) else {
            return Err(ClientError::guard("not_signed_in", "You should sign in first!"));
        };
        if !self.navigation.lock().visible_sections(&state).contains(&section) {
            debug!(target: "navigation", "{} refused for {} ({})", section.label(), user, state);
            return Err(ClientError::guard("section_forbidden".to_string(), format!("{} is not available to your account!", section.label())));
        }
        Ok((epoch, user))
    }

    /// Single path for failures of authenticated calls. A rejected token ends
    /// the session only if it belongs to the session that is still live.
    fn report(&self, epoch: u64, err: &ClientError) {
        if err.is_authorization() {
            let state = {
                let mut session = self.session.lock();
                if session.epoch() != epoch || !session.state().signed_in {
                    debug!(target: "session", "token rejection for an ended session ignored");
                    return;
                }
                session.credential_rejected()
            };
            self.navigation.lock().observe(&state);
        }
        self.notifier.notify(Notification::from_error(err));
    }

    /// Let navigation see the current state and trigger the role lookup when due.
    async fn settle(&self) {
        let state = self.state();
        let update = self.navigation.lock().observe(&state);
        if update.role_lookup_wanted {
            if let Err(err) = self.refresh_role().await {
                debug!(target: "navigation", "role lookup failed: {}", err);
            }
        }
    }
}
