//! User accounts.
//!
//! Field rules:
//! - `name` is required.
//! - `email` is required, well-formed, and stored lowercase (uniqueness is
//!   enforced by the store, case-insensitively).
//! - `password` is at least 6 characters and only ever stored hashed.
//! - Self-registration may pick `standard` or `owner`, never `admin`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use craftmart_core::{DomainError, DomainResult, Entity, UserId};

use crate::{Identity, Role};

pub const MIN_PASSWORD_LEN: usize = 6;

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.role)
    }
}

impl Entity for User {
    type Id = UserId;
    const KIND: &'static str = "user";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a user (registration or admin creation).
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();
        if self.name.trim().is_empty() {
            problems.push("Please add a name".to_string());
        }
        check_email(&self.email, &mut problems);
        check_password(&self.password, &mut problems);
        DomainError::check(problems)
    }

    /// Validation for the public registration endpoint.
    pub fn validate_registration(&self) -> DomainResult<()> {
        self.validate()?;
        if self.role == Some(Role::Admin) {
            return Err(DomainError::validation("Cannot self-register as admin"));
        }
        Ok(())
    }

    pub fn into_user(self, id: UserId, password_hash: String, created_at: DateTime<Utc>) -> User {
        User {
            id,
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            role: self.role.unwrap_or_default(),
            password_hash,
            created_at,
        }
    }
}

/// Partial update applied by administrators.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password: Option<String>,
}

impl UserPatch {
    pub fn validate(&self) -> DomainResult<()> {
        let mut problems = Vec::new();
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            problems.push("Please add a name".to_string());
        }
        if let Some(email) = &self.email {
            check_email(email, &mut problems);
        }
        if let Some(password) = &self.password {
            check_password(password, &mut problems);
        }
        DomainError::check(problems)
    }

    /// Apply profile fields. The password is hashed and set by the caller.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.trim().to_string();
        }
        if let Some(email) = &self.email {
            user.email = normalize_email(email);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn validate(&self) -> DomainResult<()> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(DomainError::validation("Please provide an email and password"));
        }
        Ok(())
    }

    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_email(email: &str, problems: &mut Vec<String>) {
    let email = email.trim();
    if email.is_empty() {
        problems.push("Please add an email".to_string());
    } else if !is_valid_email(email) {
        problems.push("Please add a valid email".to_string());
    }
}

fn check_password(password: &str, problems: &mut Vec<String>) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push(format!("Password must be at least {MIN_PASSWORD_LEN} characters"));
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
