use craftmart_auth::Identity;

/// Caller of the current request, inserted by the auth middleware.
///
/// Present on every API request; `identity` is `None` for anonymous callers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    identity: Option<Identity>,
}

impl CallerContext {
    pub fn anonymous() -> Self {
        Self { identity: None }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}
