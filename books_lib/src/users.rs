use chrono::{DateTime, Local};
use serde::Serialize;
use sha2::{Digest, Sha256};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Eq, PartialEq, Hash, Clone, Copy, Default, Serialize)]
pub struct UserId(pub i64);

/// Someone keeping books.  All accounts, entries, notifications and activity
/// records belong to exactly one user.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: Option<String>,
    pub created_at: DateTime<Local>,
}

/// The logged-in user.
/// All operations on the books go through a session, so that they are
/// always scoped to a single user.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub logged_in_at: DateTime<Local>,
}

impl Session {
    pub fn new(user: User) -> Self {
        Session {
            user,
            logged_in_at: Local::now(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user.id
    }
}

/// A random salt, as 32 hex characters
pub(crate) fn new_salt() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Passwords are never stored, only the SHA-256 of salt + password.
pub(crate) fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod test {
    use crate::users::{hash_password, new_salt};

    #[test]
    fn test_hash() {
        let salt = new_salt();
        assert_eq!(salt.len(), 32);
        assert_ne!(salt, new_salt());

        let h = hash_password(&salt, "secret");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_password(&salt, "secret"));
        assert_ne!(h, hash_password(&salt, "Secret"));
        assert_ne!(h, hash_password(&new_salt(), "secret"));
    }
}
