//! Role-gated navigation: which application sections a session may see.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::role::Role;
use super::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SectionId {
    MainPage,
    UserInfo,
    LabelImage,
    UserManage,
    FeedbackManage,
    ModelManage,
    WebSsh,
    FrequentCommands,
}

impl SectionId {
    pub const ALL: [SectionId; 8] = [
        SectionId::MainPage,
        SectionId::UserInfo,
        SectionId::LabelImage,
        SectionId::UserManage,
        SectionId::FeedbackManage,
        SectionId::ModelManage,
        SectionId::WebSsh,
        SectionId::FrequentCommands,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SectionId::MainPage => "Main Page",
            SectionId::UserInfo => "User Info",
            SectionId::LabelImage => "Label Image",
            SectionId::UserManage => "User Manage",
            SectionId::FeedbackManage => "Feedback Manage",
            SectionId::ModelManage => "Model Manage",
            SectionId::WebSsh => "WebSSH",
            SectionId::FrequentCommands => "Frequent Commands",
        }
    }
}

pub const BASELINE_SECTIONS: [SectionId; 3] = [SectionId::MainPage, SectionId::UserInfo, SectionId::LabelImage];
const USER_ADMIN_SECTIONS: [SectionId; 2] = [SectionId::UserManage, SectionId::FeedbackManage];
const MODEL_ADMIN_SECTIONS: [SectionId; 3] = [SectionId::ModelManage, SectionId::WebSsh, SectionId::FrequentCommands];

/// Pure visibility rule. Signed out shows nothing; a signed-in session whose
/// role is still being looked up shows the baseline only.
pub fn compute_visible_sections(state: &SessionState) -> BTreeSet<SectionId> {
    let mut out = BTreeSet::new();
    if !state.signed_in {
        return out;
    }
    out.extend(BASELINE_SECTIONS);
    match state.role {
        Role::Unknown | Role::CommonUser => {}
        Role::UserAdmin => out.extend(USER_ADMIN_SECTIONS),
        Role::ModelAdmin => out.extend(MODEL_ADMIN_SECTIONS),
        Role::SuperRoot => {
            out.extend(USER_ADMIN_SECTIONS);
            out.extend(MODEL_ADMIN_SECTIONS);
        }
    }
    out
}

/// What changed after the controller looked at a new session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationUpdate {
    pub sections_changed: bool,
    /// Signed in with an unresolved role: the role lookup should run.
    pub role_lookup_wanted: bool,
}

/// Memoizes the visible set against the session state it was derived from.
#[derive(Debug, Default)]
pub struct NavigationController {
    last: Option<(SessionState, BTreeSet<SectionId>)>,
}

impl NavigationController {
    pub fn new() -> Self { Self::default() }

    pub fn observe(&mut self, state: &SessionState) -> NavigationUpdate {
        let role_lookup_wanted = state.signed_in && !state.role.is_resolved();
        if let Some((prev, _)) = &self.last {
            if prev == state {
                return NavigationUpdate { sections_changed: false, role_lookup_wanted };
            }
        }
        let sections = compute_visible_sections(state);
        let sections_changed = self.last.as_ref().map(|(_, s)| s != &sections).unwrap_or(true);
        debug!(target: "navigation", "state={} sections={} changed={}", state, sections.len(), sections_changed);
        self.last = Some((*state, sections));
        NavigationUpdate { sections_changed, role_lookup_wanted }
    }

    pub fn visible_sections(&mut self, state: &SessionState) -> BTreeSet<SectionId> {
        self.observe(state);
        self.last.as_ref().map(|(_, s)| s.clone()).unwrap_or_default()
    }
}
