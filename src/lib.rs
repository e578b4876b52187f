//! Client core of the insect identifier: credential storage, request
//! authorization, the session state machine, role-gated navigation and the
//! REST backend client, wired together by [`app::AppContext`].

pub mod error;
pub mod config;
pub mod identity;
pub mod validation;
pub mod notify;
pub mod backend;
pub mod app;
pub mod cli;

pub use app::AppContext;
pub use error::{ClientError, ClientResult};
