use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Role of a user account.
///
/// `Standard` accounts write reviews, `Owner` accounts list products for sale
/// and `Admin` accounts may act on anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "user")]
    Standard,
    #[serde(alias = "publisher")]
    Owner,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Standard => "standard",
            Role::Owner => "owner",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        *self == Role::Admin
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "standard" | "user" => Ok(Role::Standard),
            "owner" | "publisher" => Ok(Role::Owner),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}
