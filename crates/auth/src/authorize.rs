//! Resource authorization policy.
//!
//! One decision function covers every resource mutation in the system:
//!
//! 1. `Read` is public.
//! 2. `Write`/`Delete` require a caller.
//! 3. Admins may do anything.
//! 4. Otherwise the caller must own the resource *and* hold one of the roles
//!    the resource permits for that action.
//! 5. Everything else is forbidden.
//!
//! - No IO
//! - No panics
//! - No lookups (the caller resolves the resource first; a missing resource
//!   is a not-found failure, never a policy decision)

use serde::Serialize;
use thiserror::Error;

use craftmart_core::UserId;

use crate::{Identity, Role};

/// Action requested on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Delete,
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Action::Read => "read",
            Action::Write => "update",
            Action::Delete => "delete",
        })
    }
}

/// A resource with exactly one owning user.
pub trait OwnedResource {
    /// Short lowercase resource kind used in denial messages (e.g. "product").
    fn resource_kind(&self) -> &'static str;

    fn resource_id(&self) -> String;

    fn owner_id(&self) -> UserId;

    /// Roles that may perform `action` on a resource they own.
    fn permitted_roles(&self, action: Action) -> &'static [Role];
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authorized to access this route")]
    Unauthenticated,

    #[error("user {caller} is not authorized to {action} {kind} {resource_id}")]
    Forbidden {
        caller: UserId,
        action: Action,
        kind: &'static str,
        resource_id: String,
    },

    #[error("user role {role} is not authorized to access this route")]
    RoleNotPermitted { role: Role },
}

/// Outcome of a policy evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(AuthzError),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), AuthzError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(e) => Err(e),
        }
    }
}

/// Decide whether `caller` may perform `action` on `resource`.
pub fn authorize<R>(caller: Option<&Identity>, resource: &R, action: Action) -> Decision
where
    R: OwnedResource + ?Sized,
{
    if action == Action::Read {
        return Decision::Allow;
    }

    let Some(caller) = caller else {
        return Decision::Deny(AuthzError::Unauthenticated);
    };

    if caller.is_admin() {
        return Decision::Allow;
    }

    let owns = caller.user_id == resource.owner_id();
    if owns && resource.permitted_roles(action).contains(&caller.role) {
        return Decision::Allow;
    }

    Decision::Deny(AuthzError::Forbidden {
        caller: caller.user_id,
        action,
        kind: resource.resource_kind(),
        resource_id: resource.resource_id(),
    })
}

/// Route-level role gate for actions with no existing resource to own
/// (creating a product, or anything under user administration).
pub fn require_role<'a>(
    caller: Option<&'a Identity>,
    allowed: &[Role],
) -> Result<&'a Identity, AuthzError> {
    let caller = caller.ok_or(AuthzError::Unauthenticated)?;
    if allowed.contains(&caller.role) {
        Ok(caller)
    } else {
        Err(AuthzError::RoleNotPermitted { role: caller.role })
    }
}
