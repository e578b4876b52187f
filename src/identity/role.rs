use serde::{Deserialize, Serialize};

/// Administrative role of the signed-in user, decoded once from the role
/// lookup response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Not yet resolved (or signed out).
    #[default]
    Unknown,
    CommonUser,
    UserAdmin,
    ModelAdmin,
    SuperRoot,
}

impl Role {
    /// Decode a role lookup body. Accepts a JSON string (`"User Administrator"`)
    /// or bare text. Anything unrecognized is a common user, never an admin.
    pub fn decode(body: &str) -> Role {
        let trimmed = body.trim();
        let text = serde_json::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_string());
        match text.trim() {
            "Common User" => Role::CommonUser,
            "User Administrator" => Role::UserAdmin,
            "Model Administrator" => Role::ModelAdmin,
            "Super Root" => Role::SuperRoot,
            _ => Role::CommonUser,
        }
    }

    pub fn as_wire(&self) -> Option<&'static str> {
        match self {
            Role::Unknown => None,
            Role::CommonUser => Some("Common User"),
            Role::UserAdmin => Some("User Administrator"),
            Role::ModelAdmin => Some("Model Administrator"),
            Role::SuperRoot => Some("Super Root"),
        }
    }

    pub fn is_resolved(&self) -> bool { !matches!(self, Role::Unknown) }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire().unwrap_or("Unresolved"))
    }
}
