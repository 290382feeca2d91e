//! In-process user store.
//!
//! Behaves like the `PostgreSQL` store (exact-match usernames, insertion order,
//! unique constraint) without a database. Used by the test suites; admins and
//! availability can be changed at runtime to exercise the session gate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::ExposeSecret;

use espf_core::UserId;

use super::{AdminGateway, RepositoryError, UserStore};
use crate::models::{AdminCredentials, FieldChange, NewUser, User};

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<User>,
    next_id: i32,
}

/// Shared, clonable in-memory user table.
#[derive(Debug, Clone, Default)]
pub struct MemoryUserStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .state()
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        Ok(self.state().users.clone())
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut state = self.state();
        if state.users.iter().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }

        state.next_id += 1;
        let stored = User {
            id: UserId::new(state.next_id),
            username: user.username,
            password_hash: user.password_hash,
            activated: user.activated,
            expiration_date: user.expiration_date,
            created_at: Utc::now(),
        };
        state.users.push(stored.clone());
        Ok(stored)
    }

    async fn update_field(
        &self,
        username: &str,
        change: FieldChange,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state();

        if let FieldChange::Username(new_username) = &change
            && state
                .users
                .iter()
                .any(|u| u.username == *new_username && u.username != username)
        {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }

        let Some(user) = state.users.iter_mut().find(|u| u.username == username) else {
            return Ok(false);
        };

        match change {
            FieldChange::Username(new_username) => user.username = new_username,
            FieldChange::PasswordHash(hash) => user.password_hash = hash,
            FieldChange::Activated(activated) => user.activated = activated,
            FieldChange::ExpirationDate(date) => user.expiration_date = Some(date),
        }
        Ok(true)
    }

    async fn delete(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let mut state = self.state();
        let position = state.users.iter().position(|u| u.username == username);
        Ok(position.map(|index| state.users.remove(index)))
    }
}

/// Gateway to a [`MemoryUserStore`] guarded by an in-memory admin table.
#[derive(Debug, Clone)]
pub struct MemoryGateway {
    admins: Arc<Mutex<HashMap<String, String>>>,
    available: Arc<AtomicBool>,
    releases: Arc<AtomicUsize>,
    store: MemoryUserStore,
}

impl MemoryGateway {
    /// Create a reachable gateway with no admins and an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            admins: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
            releases: Arc::default(),
            store: MemoryUserStore::new(),
        }
    }

    /// Register an admin account.
    #[must_use]
    pub fn with_admin(self, username: &str, password: &str) -> Self {
        self.set_admin_password(username, password);
        self
    }

    /// Create or rotate an admin password.
    pub fn set_admin_password(&self, username: &str, password: &str) {
        self.admins().insert(username.to_owned(), password.to_owned());
    }

    /// Drop an admin account.
    pub fn remove_admin(&self, username: &str) {
        self.admins().remove(username);
    }

    /// Simulate the store going down or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// How many times session connections were released.
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// The shared user table behind this gateway.
    #[must_use]
    pub fn store(&self) -> MemoryUserStore {
        self.store.clone()
    }

    fn admins(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.admins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable("connection refused".to_owned()))
        }
    }
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminGateway for MemoryGateway {
    type Store = MemoryUserStore;

    async fn test_admin_credentials(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<bool, RepositoryError> {
        self.ensure_available()?;
        Ok(self
            .admins()
            .get(&credentials.username)
            .is_some_and(|password| password == credentials.password.expose_secret()))
    }

    async fn open_store(
        &self,
        _credentials: &AdminCredentials,
    ) -> Result<Self::Store, RepositoryError> {
        self.ensure_available()?;
        Ok(self.store.clone())
    }

    async fn migrate(&self, _credentials: &AdminCredentials) -> Result<(), RepositoryError> {
        self.ensure_available()
    }

    async fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use espf_core::{PasswordHash, Username};

    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: Username::parse(name).unwrap(),
            password_hash: PasswordHash::new(format!("hash-of-{name}")).unwrap(),
            activated: false,
            expiration_date: None,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids_in_order() {
        let store = MemoryUserStore::new();
        let first = store.insert(new_user("alice")).await.unwrap();
        let second = store.insert(new_user("bob")).await.unwrap();
        assert!(first.id.as_i32() < second.id.as_i32());

        let names: Vec<_> = store
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username.into_inner())
            .collect();
        assert_eq!(names, ["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_insert_duplicate_is_conflict() {
        let store = MemoryUserStore::new();
        store.insert(new_user("alice")).await.unwrap();
        assert!(matches!(
            store.insert(new_user("alice")).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_usernames_are_case_sensitive() {
        let store = MemoryUserStore::new();
        store.insert(new_user("alice")).await.unwrap();
        store.insert(new_user("Alice")).await.unwrap();
        assert!(store.find_by_username("ALICE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename_onto_existing_user_is_conflict() {
        let store = MemoryUserStore::new();
        store.insert(new_user("alice")).await.unwrap();
        store.insert(new_user("bob")).await.unwrap();
        let change = FieldChange::Username(Username::parse("bob").unwrap());
        assert!(matches!(
            store.update_field("alice", change).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_update_missing_user_returns_false() {
        let store = MemoryUserStore::new();
        assert!(
            !store
                .update_field("ghost", FieldChange::Activated(true))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_delete_returns_removed_user() {
        let store = MemoryUserStore::new();
        store.insert(new_user("alice")).await.unwrap();
        let removed = store.delete("alice").await.unwrap().unwrap();
        assert_eq!(removed.username, "alice");
        assert!(store.delete("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gateway_checks_admin_password() {
        let gateway = MemoryGateway::new().with_admin("root", "s3cret");
        assert!(
            gateway
                .test_admin_credentials(&AdminCredentials::new("root", "s3cret"))
                .await
                .unwrap()
        );
        assert!(
            !gateway
                .test_admin_credentials(&AdminCredentials::new("root", "wrong"))
                .await
                .unwrap()
        );
        assert!(
            !gateway
                .test_admin_credentials(&AdminCredentials::new("nobody", "s3cret"))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_unavailable_gateway_errors() {
        let gateway = MemoryGateway::new().with_admin("root", "s3cret");
        gateway.set_available(false);
        assert!(matches!(
            gateway
                .test_admin_credentials(&AdminCredentials::new("root", "s3cret"))
                .await,
            Err(RepositoryError::Unavailable(_))
        ));
    }
}
