//! Session data for a logged-in user

use super::User;

/// Session data
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// The logged-in user's profile
    pub user: User,

    /// The bearer token sent on protected routes
    pub token: String,
}

impl Session {
    /// Create a new session
    pub fn new(user: User, token: impl Into<String>) -> Self {
        Self {
            user,
            token: token.into(),
        }
    }

    /// Whether the user may use the admin endpoints
    pub fn is_admin(&self) -> bool {
        self.user.is_admin
    }
}
