//! Sign-in and sign-up form models and their local validation rules.
//! Failures here never reach the backend and never touch the session.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};
use crate::identity::Role;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInForm {
    pub useremail: String,
    pub password: String,
}

impl SignInForm {
    pub fn new(useremail: impl Into<String>, password: impl Into<String>) -> Self {
        Self { useremail: useremail.into().trim().to_string(), password: password.into() }
    }

    pub fn validate(&self) -> ClientResult<()> {
        required("useremail", &self.useremail, "Please input your user email!")?;
        required("password", &self.password, "Please input your password!")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignUpForm {
    pub username: String,
    pub password: String,
    pub repassword: String,
    pub email: String,
}

impl SignUpForm {
    pub fn validate(&self) -> ClientResult<()> {
        check_account(&self.username, &self.email, &self.password, &self.repassword)
    }
}

/// New administrator account, created by a user administrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub repassword: String,
    pub role: Role,
}

impl AdminForm {
    pub fn validate(&self) -> ClientResult<()> {
        check_account(&self.username, &self.email, &self.password, &self.repassword)?;
        if !matches!(self.role, Role::UserAdmin | Role::ModelAdmin) {
            return Err(ClientError::validation("role", "Please choose User Admin or Model Admin!"));
        }
        Ok(())
    }
}

fn check_account(username: &str, email: &str, password: &str, repassword: &str) -> ClientResult<()> {
    required("username", username, "Please input your username!")?;
    required("email", email, "Please input your Email!")?;
    check_password(password)?;
    required("repassword", repassword, "Please confirm your password!")?;
    if repassword != password {
        return Err(ClientError::validation("repassword", "Please keep the same to your password above!"));
    }
    Ok(())
}

fn required(field: &str, value: &str, msg: &str) -> ClientResult<()> {
    if value.trim().is_empty() {
        return Err(ClientError::validation(field, msg));
    }
    Ok(())
}

/// 8-16 characters, at least one ASCII letter and one digit.
pub fn check_password(password: &str) -> ClientResult<()> {
    let len = password.chars().count();
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) || !has_letter || !has_digit {
        return Err(ClientError::validation("password", "Need 8-16 characters containing letters and numbers"));
    }
    Ok(())
}
