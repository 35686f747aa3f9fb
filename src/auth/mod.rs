//! Authentication
//!
//! A single configured account plus the signed tokens handed out to it.

mod token;

pub use token::{GrantClaims, SessionClaims, TokenIssuer, GRANT_TTL_MINUTES, SESSION_TTL_MINUTES};

use crate::error::{ServiceError, ServiceResult};
use tracing::{info, warn};

/// The one account allowed to log in.
#[derive(Debug, Clone)]
pub struct Account {
    username: String,
    password: String,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn authenticate(&self, username: &str, password: &str) -> ServiceResult<()> {
        if username != self.username || password != self.password {
            warn!("Failed login attempt for user '{}'", username);
            return Err(ServiceError::AuthenticationFailure);
        }
        info!("User '{}' logged in", username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate() {
        let account = Account::new("admin", "admin123");
        assert!(account.authenticate("admin", "admin123").is_ok());
        assert!(matches!(
            account.authenticate("admin", "wrong"),
            Err(ServiceError::AuthenticationFailure)
        ));
        assert!(account.authenticate("root", "admin123").is_err());
    }
}
