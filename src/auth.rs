//! Registration and session handling on top of the user collection.
//!
//! Credentials are compared as stored: this is a single-session, local tool
//! and passwords are kept in plaintext. They never leave the store through
//! exports or the mirror.

use crate::model::User;
use crate::store::EntityStore;
use tracing::{Level, event};

/// Key holding the signed-in user.
pub const CURRENT_USER_KEY: &str = "crm_current_v1";

pub struct AuthService<'a> {
    store: &'a EntityStore,
}

impl<'a> AuthService<'a> {
    pub fn new(store: &'a EntityStore) -> Self {
        Self { store }
    }

    /// Create an account. Returns `false` when the email is already registered.
    pub fn register(&self, name: Option<&str>, email: &str, password: &str) -> bool {
        let mut user = User::new(email).with_password(password);
        user.name = name.map(str::to_string);
        let created = self.store.users().add(user);
        if created {
            event!(Level::INFO, email, "user registered");
        }
        created
    }

    /// Check credentials (exact, case-sensitive) and remember the user as signed in.
    pub fn login(&self, email: &str, password: &str) -> bool {
        if email.is_empty() || password.is_empty() {
            return false;
        }
        let Some(user) = self
            .store
            .users()
            .get(email)
            .filter(|user| user.password.as_deref() == Some(password))
        else {
            return false;
        };

        let encoded = match serde_json::to_string(&user) {
            Ok(encoded) => encoded,
            Err(err) => {
                event!(Level::ERROR, error = %err, "failed to encode session");
                return false;
            }
        };
        match self.store.storage().set(CURRENT_USER_KEY, &encoded) {
            Ok(()) => true,
            Err(err) => {
                event!(Level::ERROR, error = %err, "failed to store session");
                false
            }
        }
    }

    pub fn logout(&self) {
        if let Err(err) = self.store.storage().remove(CURRENT_USER_KEY) {
            event!(Level::ERROR, error = %err, "failed to clear session");
        }
    }

    pub fn current_user(&self) -> Option<User> {
        let raw = self.store.storage().get(CURRENT_USER_KEY).ok().flatten()?;
        serde_json::from_str::<Option<User>>(&raw).ok().flatten()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Name of the signed-in user, falling back to the email.
    pub fn current_user_name(&self) -> Option<String> {
        self.current_user().map(|user| user.display_name().to_string())
    }
}
