//! In-memory account store
//!
//! Backs the demo server and the tests. Passwords are stored as salted SHA-256
//! hashes; that hash doubles as the credential hash mixed into remember-me
//! secrets, so changing a password invalidates outstanding tokens.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use super::{IdentityRecord, IdentityResolver, ResolveError, Seed, SeedError, SeedStore};
use crate::token::codec::FIELD_SEPARATOR;
use crate::utils::crypto::{constant_time_eq, generate_nonce, sha256_hex};

/// Account management failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    #[error("username {0:?} is not allowed")]
    InvalidUsername(String),
    #[error("account '{0}' already exists")]
    AlreadyExists(String),
    #[error("account '{0}' not found")]
    NotFound(String),
}

#[derive(Debug, Clone)]
struct Account {
    identity_id: String,
    display_name: String,
    salt: String,
    credential_hash: String,
    seed: Seed,
}

impl Account {
    fn record(&self) -> IdentityRecord {
        IdentityRecord {
            identity_id: self.identity_id.clone(),
            display_name: self.display_name.clone(),
            credential_hash: self.credential_hash.clone(),
            seed: self.seed.clone(),
        }
    }
}

/// Thread-safe account store keyed by canonical identity id
#[derive(Debug, Default)]
pub struct InMemoryIdentityStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical identity id for a username: trimmed and lower-cased
    #[must_use]
    pub fn canonical_id(username: &str) -> String {
        username.trim().to_lowercase()
    }

    /// Create an account with a fresh seed
    ///
    /// # Errors
    ///
    /// Returns an error if the username is empty, contains the token field
    /// separator, or is already taken.
    pub fn create_account(
        &self,
        username: &str,
        password: &str,
    ) -> Result<IdentityRecord, AccountError> {
        let identity_id = Self::canonical_id(username);
        if identity_id.is_empty() || identity_id.contains(FIELD_SEPARATOR) {
            return Err(AccountError::InvalidUsername(username.to_string()));
        }

        let mut accounts = self.write();
        if accounts.contains_key(&identity_id) {
            return Err(AccountError::AlreadyExists(identity_id));
        }

        let salt = generate_nonce(16);
        let account = Account {
            identity_id: identity_id.clone(),
            display_name: username.trim().to_string(),
            credential_hash: hash_password(password, &salt),
            salt,
            seed: Seed::generate(),
        };
        let record = account.record();
        accounts.insert(identity_id, account);

        log::info!("Created account '{}'", record.identity_id);
        Ok(record)
    }

    /// Primary login: check a username/password pair
    ///
    /// Returns the account on success, `None` otherwise.
    #[must_use]
    pub fn authenticate(&self, username: &str, password: &str) -> Option<IdentityRecord> {
        let identity_id = Self::canonical_id(username);
        let accounts = self.read();

        match accounts.get(&identity_id) {
            Some(account) => {
                let attempt = hash_password(password, &account.salt);
                constant_time_eq(attempt.as_bytes(), account.credential_hash.as_bytes())
                    .then(|| account.record())
            }
            None => {
                // Keep the timing of unknown users close to known ones
                let _ = hash_password(password, "0000000000000000");
                None
            }
        }
    }

    /// Change an account's password; outstanding remember-me tokens stop verifying
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the account does not exist.
    pub fn update_password(&self, identity_id: &str, password: &str) -> Result<(), AccountError> {
        let mut accounts = self.write();
        let account = accounts
            .get_mut(identity_id)
            .ok_or_else(|| AccountError::NotFound(identity_id.to_string()))?;

        account.salt = generate_nonce(16);
        account.credential_hash = hash_password(password, &account.salt);
        log::info!("Password changed for account '{identity_id}'");
        Ok(())
    }

    /// Remove an account, returning whether it existed
    pub fn remove_account(&self, identity_id: &str) -> bool {
        self.write().remove(identity_id).is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Account>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Account>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdentityResolver for InMemoryIdentityStore {
    fn resolve(&self, identity_id: &str) -> Result<IdentityRecord, ResolveError> {
        self.read()
            .get(identity_id)
            .map(Account::record)
            .ok_or_else(|| ResolveError::NotFound(identity_id.to_string()))
    }
}

impl SeedStore for InMemoryIdentityStore {
    fn current_seed(&self, identity_id: &str) -> Result<Seed, SeedError> {
        self.read()
            .get(identity_id)
            .map(|account| account.seed.clone())
            .ok_or_else(|| SeedError::NotFound(identity_id.to_string()))
    }

    fn rotate_seed(&self, identity_id: &str) -> Result<Seed, SeedError> {
        let mut accounts = self.write();
        let account = accounts
            .get_mut(identity_id)
            .ok_or_else(|| SeedError::NotFound(identity_id.to_string()))?;

        account.seed = Seed::generate();
        log::info!("Rotated seed for '{identity_id}'");
        Ok(account.seed.clone())
    }
}

fn hash_password(password: &str, salt: &str) -> String {
    sha256_hex(&[salt.as_bytes(), b":", password.as_bytes()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve_account() {
        let store = InMemoryIdentityStore::new();
        let created = store.create_account("  Alice ", "secret").unwrap();

        assert_eq!(created.identity_id, "alice");
        assert_eq!(created.display_name, "Alice");
        assert_eq!(store.resolve("alice").unwrap(), created);
    }

    #[test]
    fn test_create_account_rejects_duplicates_and_bad_names() {
        let store = InMemoryIdentityStore::new();
        store.create_account("alice", "secret").unwrap();

        assert_eq!(
            store.create_account("ALICE", "other"),
            Err(AccountError::AlreadyExists("alice".to_string()))
        );
        assert!(matches!(
            store.create_account("bad:name", "x"),
            Err(AccountError::InvalidUsername(_))
        ));
        assert!(matches!(
            store.create_account("   ", "x"),
            Err(AccountError::InvalidUsername(_))
        ));
    }

    #[test]
    fn test_authenticate() {
        let store = InMemoryIdentityStore::new();
        store.create_account("alice", "secret").unwrap();

        assert_eq!(
            store.authenticate("Alice", "secret").map(|r| r.identity_id),
            Some("alice".to_string())
        );
        assert!(store.authenticate("alice", "wrong").is_none());
        assert!(store.authenticate("bob", "secret").is_none());
    }

    #[test]
    fn test_same_password_yields_different_hashes() {
        let store = InMemoryIdentityStore::new();
        let alice = store.create_account("alice", "same").unwrap();
        let bob = store.create_account("bob", "same").unwrap();

        assert_ne!(alice.credential_hash, bob.credential_hash);
    }

    #[test]
    fn test_update_password_changes_credential_hash() {
        let store = InMemoryIdentityStore::new();
        let before = store.create_account("alice", "old").unwrap();

        store.update_password("alice", "new").unwrap();
        let after = store.resolve("alice").unwrap();

        assert_ne!(before.credential_hash, after.credential_hash);
        assert!(store.authenticate("alice", "new").is_some());
        assert!(store.authenticate("alice", "old").is_none());
        assert_eq!(
            store.update_password("bob", "x"),
            Err(AccountError::NotFound("bob".to_string()))
        );
    }

    #[test]
    fn test_rotate_seed() {
        let store = InMemoryIdentityStore::new();
        let created = store.create_account("alice", "secret").unwrap();

        assert_eq!(store.current_seed("alice").unwrap(), created.seed);

        let rotated = store.rotate_seed("alice").unwrap();
        assert_ne!(rotated, created.seed);
        assert_eq!(store.resolve("alice").unwrap().seed, rotated);
        assert_eq!(
            store.rotate_seed("bob"),
            Err(SeedError::NotFound("bob".to_string()))
        );
    }

    #[test]
    fn test_remove_account() {
        let store = InMemoryIdentityStore::new();
        store.create_account("alice", "secret").unwrap();

        assert!(store.remove_account("alice"));
        assert!(!store.remove_account("alice"));
        assert_eq!(
            store.resolve("alice"),
            Err(ResolveError::NotFound("alice".to_string()))
        );
    }
}
