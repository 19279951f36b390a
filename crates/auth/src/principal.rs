use serde::Serialize;

use craftmart_core::UserId;

use crate::Role;

/// An authenticated caller, resolved from a session token and the user store.
///
/// Anonymous callers are represented as `Option<&Identity>::None` at the
/// policy boundary rather than as a special identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
