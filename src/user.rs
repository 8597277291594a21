use secrecy::Secret;
use std::collections::HashMap;

/// What the identity store knows about a user
#[derive(Clone, Debug)]
pub struct UserRecord {
    pub username: String,
    /// Plaintext shared secret the client digests with
    pub secret: Secret<String>,
    pub roles: Vec<String>,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, secret: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            username: username.into(),
            secret: Secret::new(secret.into()),
            roles,
        }
    }
}

/// Identity lookup the authenticator consults for each credential
///
/// Implementations must be `Send + Sync` for concurrent verification.
pub trait UserProvider: Send + Sync {
    /// Return the user's secret and roles, or `None` if the user is unknown
    fn load_user_by_username(&self, username: &str) -> Option<UserRecord>;
}

impl UserProvider for HashMap<String, UserRecord> {
    fn load_user_by_username(&self, username: &str) -> Option<UserRecord> {
        self.get(username).cloned()
    }
}
