//! Terminal rendering surface for the console: sections, profiles, section
//! listings and notifications as plain text.

use std::collections::BTreeSet;

use crate::backend::{FeedbackEntry, LabelTask, ManagedUser, UserProfile};
use crate::identity::{SectionId, SessionState};
use crate::notify::{Notification, NotificationLevel, Notifier};

pub const SIGN_IN_PLACEHOLDER: &str = "Please sign in to use the insect identifier system.";

const MAX_VALUE_WIDTH: usize = 60;

/// One line per visible section, numbered in navigation order.
pub fn render_sections(sections: &BTreeSet<SectionId>) -> String {
    if sections.is_empty() {
        return SIGN_IN_PLACEHOLDER.to_string();
    }
    sections
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{}] {}", i, s.label()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_status(state: &SessionState, user: Option<&str>) -> String {
    match (state.signed_in, user) {
        (true, Some(u)) => format!("signed in as {} (role: {})", u, state.role),
        (true, None) => format!("signed in (role: {})", state.role),
        (false, _) => "signed out".to_string(),
    }
}

pub fn render_notification(n: &Notification) -> String {
    let tag = match n.level {
        NotificationLevel::Success => "ok",
        NotificationLevel::Info => "info",
        NotificationLevel::Error => "error",
    };
    format!("[{}] {} {}", tag, n.title, n.description)
}

/// Profile as `label : value` lines with the labels padded to one width.
pub fn render_profile(p: &UserProfile) -> String {
    let fields = [
        ("Nick Name", p.nick_name.clone()),
        ("User Email", p.email.clone()),
        ("Contributions", p.contribution.to_string()),
        ("Role", p.role.clone()),
    ];
    let width = fields.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    fields
        .iter()
        .map(|(k, v)| format!("{:<width$} : {}", k, clip(v)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_users(users: &[ManagedUser]) -> String {
    if users.is_empty() {
        return "no users".to_string();
    }
    users
        .iter()
        .enumerate()
        .map(|(i, u)| {
            let flag = if u.available { "" } else { " [suspended]" };
            format!("[{}] {} <{}> {}, {} contributions{}", i, clip(&u.username), u.useremail, u.user_identity, u.user_contribution, flag)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_feedback(entries: &[FeedbackEntry]) -> String {
    if entries.is_empty() {
        return "no feedback waiting".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, f)| format!("[{}] {} from {} labelled '{}' ({} submissions)", i, f.pic_link, f.from_user_email, f.real_label, f.submit_count))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_label_tasks(tasks: &[LabelTask]) -> String {
    if tasks.is_empty() {
        return "nothing to label".to_string();
    }
    tasks.iter().enumerate().map(|(i, t)| format!("[{}] {}", i, t.pic_link)).collect::<Vec<_>>().join("\n")
}

fn clip(s: &str) -> String {
    if s.chars().count() <= MAX_VALUE_WIDTH {
        return s.to_string();
    }
    s.chars().take(MAX_VALUE_WIDTH - 1).chain(std::iter::once('…')).collect()
}

/// Prints notifications as they arrive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, n: Notification) {
        match n.level {
            NotificationLevel::Error => eprintln!("{}", render_notification(&n)),
            _ => println!("{}", render_notification(&n)),
        }
    }
}
