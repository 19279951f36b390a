//! `craftmart-auth` — authentication and authorization boundary.
//!
//! Knows nothing about HTTP or storage. It turns tokens and passwords into
//! an [`Identity`] and answers whether that identity may act on a resource.

pub mod authorize;
pub mod claims;
pub mod password;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{Action, AuthzError, Decision, OwnedResource, authorize, require_role};
pub use claims::{Hs256Jwt, JwtClaims, JwtIssuer, JwtValidator, TokenError, validate_claims};
pub use password::{PasswordError, hash_password, verify_password};
pub use principal::Identity;
pub use roles::Role;
pub use user::{Credentials, NewUser, User, UserPatch};
