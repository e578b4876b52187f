//! Client-side identity: credential storage, request authorization, the
//! session state machine and role-gated navigation.
//! Keep the public surface thin and split implementation across sub-modules.

mod storage;
mod credential;
mod authorizer;
mod role;
mod session;
mod navigation;

pub use storage::{SessionStorage, MemoryStorage, JsonFileStorage, TOKEN_KEY, USER_KEY};
pub use credential::{Credential, CredentialStore};
pub use authorizer::{RequestAuthorizer, DEFAULT_AUTH_HEADER};
pub use role::Role;
pub use session::{SessionState, SessionController, RoleLookupTicket};
pub use navigation::{SectionId, NavigationController, NavigationUpdate, compute_visible_sections, BASELINE_SECTIONS};
