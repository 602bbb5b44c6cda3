//! Demo account seeding.

use chrono::Utc;
use yarnflow_core::UserId;
use yarnflow_store::{Role, Store, User};

use crate::error::Result;

/// Demo accounts as `(username, password, role)`.
pub const DEMO_ACCOUNTS: [(&str, &str, Role); 11] = [
    ("admin", "admin123", Role::Admin),
    ("agent1", "agent123", Role::Agent),
    ("agent2", "agent123", Role::Agent),
    ("agent3", "agent123", Role::Agent),
    ("agent4", "agent123", Role::Agent),
    ("agent5", "agent123", Role::Agent),
    ("user1", "user123", Role::User),
    ("user2", "user123", Role::User),
    ("user3", "user123", Role::User),
    ("user4", "user123", Role::User),
    ("user5", "user123", Role::User),
];

/// Email domain used for demo accounts.
pub const DEMO_EMAIL_DOMAIN: &str = "yarnflow.local";

/// Create the demo accounts unless an admin already exists.
///
/// Accounts whose username or email is already taken are skipped. Returns the
/// number of accounts created.
///
/// # Errors
///
/// Returns an error if hashing or a store operation fails.
pub fn seed_default_users<S: Store>(store: &S) -> Result<usize> {
    if store.count_users_by_role(Role::Admin)? > 0 {
        tracing::debug!("Admin account exists, skipping demo seed");
        return Ok(0);
    }

    let mut created = 0;
    for (username, password, role) in DEMO_ACCOUNTS {
        let email = format!("{username}@{DEMO_EMAIL_DOMAIN}");
        if store.get_user_by_username(username)?.is_some()
            || store.get_user_by_email(&email)?.is_some()
        {
            continue;
        }

        let user = User {
            user_id: UserId::generate(),
            username: username.to_string(),
            email,
            password_hash: yarnflow_auth::hash_password(password)?,
            role,
            is_active: true,
            created_at: Utc::now(),
        };
        store.put_user(&user)?;
        created += 1;
    }

    tracing::info!(created, "Seeded demo accounts");
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use yarnflow_store::RocksStore;

    #[test]
    fn seeds_once() {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();

        assert_eq!(seed_default_users(&store).unwrap(), 11);
        assert_eq!(store.count_users_by_role(Role::Agent).unwrap(), 5);
        assert_eq!(store.count_users_by_role(Role::User).unwrap(), 5);

        let admin = store.get_user_by_username("admin").unwrap().unwrap();
        assert_eq!(admin.email, "admin@yarnflow.local");
        assert!(yarnflow_auth::verify_password("admin123", &admin.password_hash).is_ok());

        assert_eq!(seed_default_users(&store).unwrap(), 0);
        assert_eq!(store.list_users().unwrap().len(), 11);
    }
}
