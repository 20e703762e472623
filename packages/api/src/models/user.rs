//! # Authenticated user identity
//!
//! [`AuthUser`] is the identity the auth backend reports for a signed-in account:
//! the stable user id that keys every owned record, and the email the account was
//! registered with. The profile row for the same user carries everything else.

use serde::{Deserialize, Serialize};

/// Identity of a signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: String,
}

impl AuthUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }

    /// Name to show for the account: the part of the email before `@`.
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(AuthUser::new("u1", "ann@example.com").display_name(), "ann");
        assert_eq!(AuthUser::new("u1", "").display_name(), "");
    }
}
