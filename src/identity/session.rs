use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

use super::credential::CredentialStore;
use super::role::Role;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SessionState {
    pub signed_in: bool,
    /// Meaningful only while `signed_in`.
    pub role: Role,
}

impl SessionState {
    pub const SIGNED_OUT: SessionState = SessionState { signed_in: false, role: Role::Unknown };
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.signed_in {
            write!(f, "SignedIn({})", self.role)
        } else {
            f.write_str("SignedOut")
        }
    }
}

/// Issued for one role lookup. Only a ticket matching the current session
/// epoch and user may complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLookupTicket {
    epoch: u64,
    user: String,
}

impl RoleLookupTicket {
    pub fn epoch(&self) -> u64 { self.epoch }
    pub fn user(&self) -> &str { &self.user }
}

/// Session state machine: `SignedOut`, `SignedIn(Unknown)`, `SignedIn(role)`.
///
/// Sole writer of the credential store. `epoch` advances on every transition
/// into or out of `SignedIn`, which is how late role responses from an older
/// session are recognised and dropped.
#[derive(Debug)]
pub struct SessionController {
    credentials: CredentialStore,
    state: SessionState,
    epoch: u64,
    lookup_in_flight: bool,
}

impl SessionController {
    /// Start from whatever the store holds: a stored credential means signed in
    /// with an unresolved role.
    pub fn new(credentials: CredentialStore) -> Self {
        let signed_in = credentials.is_present();
        if signed_in {
            info!(target: "session", "restored session for {}", credentials.get_user_identifier().unwrap_or_default());
        }
        Self {
            credentials,
            state: SessionState { signed_in, role: Role::Unknown },
            epoch: 0,
            lookup_in_flight: false,
        }
    }

    pub fn state(&self) -> SessionState { self.state }
    pub fn epoch(&self) -> u64 { self.epoch }
    pub fn credentials(&self) -> &CredentialStore { &self.credentials }

    /// One tab, one session: refuse to sign in again before any request is made.
    pub fn guard_sign_in(&self) -> ClientResult<()> {
        if self.state.signed_in {
            return Err(ClientError::guard("already_signed_in", "You have signed in!"));
        }
        Ok(())
    }

    pub fn sign_in_success(&mut self, token: &str, user_identifier: &str) -> ClientResult<SessionState> {
        self.guard_sign_in()?;
        if token.is_empty() || user_identifier.is_empty() {
            return Err(ClientError::internal("empty_credential", "sign-in produced an empty token or user identifier"));
        }
        self.credentials.establish(token, user_identifier);
        self.enter(SessionState { signed_in: true, role: Role::Unknown });
        info!(target: "session", "signed in as {}", user_identifier);
        Ok(self.state)
    }

    /// Account created; the user still has to sign in separately.
    pub fn sign_up_success(&mut self) -> SessionState { self.state }

    /// Clears the credential unconditionally, even when already signed out.
    pub fn sign_out_confirmed(&mut self) -> SessionState {
        self.drop_session("sign out")
    }

    /// The backend rejected our token on some call.
    pub fn credential_rejected(&mut self) -> SessionState {
        self.drop_session("credential rejected")
    }

    /// At most one lookup per sign-in transition: none while one is pending,
    /// none once the role is known. After a failure a new ticket may be taken.
    pub fn begin_role_lookup(&mut self) -> Option<RoleLookupTicket> {
        if !self.state.signed_in || self.state.role.is_resolved() || self.lookup_in_flight {
            return None;
        }
        let user = self.credentials.get_user_identifier()?;
        self.lookup_in_flight = true;
        debug!(target: "session", "role lookup issued epoch={} user={}", self.epoch, user);
        Some(RoleLookupTicket { epoch: self.epoch, user })
    }

    /// True when the ticket still belongs to the live session.
    pub fn is_current(&self, ticket: &RoleLookupTicket) -> bool {
        self.state.signed_in
            && ticket.epoch == self.epoch
            && self.credentials.get_user_identifier().as_deref() == Some(ticket.user.as_str())
    }

    /// Apply a resolved role. Returns false when the ticket is stale or the
    /// response changes nothing.
    pub fn role_lookup_success(&mut self, ticket: &RoleLookupTicket, role: Role) -> bool {
        if !self.is_current(ticket) {
            debug!(target: "session", "discarding stale role response epoch={} current={}", ticket.epoch, self.epoch);
            return false;
        }
        self.lookup_in_flight = false;
        if !role.is_resolved() || self.state.role.is_resolved() {
            return false;
        }
        self.state.role = role;
        info!(target: "session", "role resolved: {}", role);
        true
    }

    /// Failed lookup keeps the session as is. Returns whether the ticket was current.
    pub fn role_lookup_failure(&mut self, ticket: &RoleLookupTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.lookup_in_flight = false;
        true
    }

    fn enter(&mut self, next: SessionState) {
        if next.signed_in != self.state.signed_in {
            self.epoch += 1;
        }
        self.state = next;
        self.lookup_in_flight = false;
    }

    fn drop_session(&mut self, why: &str) -> SessionState {
        self.credentials.set_token(None);
        if self.state.signed_in {
            info!(target: "session", "{}: session ended", why);
        }
        self.enter(SessionState::SIGNED_OUT);
        self.state
    }
}
