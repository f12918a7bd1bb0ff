use crate::models::role::Role;
use crate::models::user::{User, UserId};
use dashmap::DashMap;
use std::convert::Infallible;
use std::sync::Mutex;

/// Which unique field a registration collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Username,
    Email,
}

#[derive(Debug, PartialEq, Eq)]
pub enum InsertError<E> {
    Taken(UniqueField),
    /// The persist step failed; nothing was inserted
    Persist(E),
}

/// In-memory user records, rebuilt from the WAL at startup.
///
/// Mutations of a single record go through [`UserStore::update`], which holds
/// the map entry's lock for the whole read-check-write so that concurrent
/// changes to the same user serialize while other users stay independent.
pub struct UserStore {
    users: DashMap<UserId, User>,
    by_email: DashMap<String, UserId>,
    by_username: DashMap<String, UserId>,
    /// Guards the check-then-insert across the three maps
    registration: Mutex<()>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            by_email: DashMap::new(),
            by_username: DashMap::new(),
            registration: Mutex::new(()),
        }
    }

    /// Insert a new user unless the username or email is already taken.
    ///
    /// `persist` runs after the uniqueness check and before the record becomes
    /// visible, under the registration lock.
    pub fn insert_unique_with<E>(
        &self,
        user: User,
        persist: impl FnOnce(&User) -> Result<(), E>,
    ) -> Result<(), InsertError<E>> {
        let _guard = self
            .registration
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if self.by_username.contains_key(&user.username) {
            return Err(InsertError::Taken(UniqueField::Username));
        }
        if self.by_email.contains_key(&user.email) {
            return Err(InsertError::Taken(UniqueField::Email));
        }

        persist(&user).map_err(InsertError::Persist)?;

        self.index_and_insert(user);
        Ok(())
    }

    /// `insert_unique_with` for records that need no persisting
    pub fn insert_unique(&self, user: User) -> Result<(), UniqueField> {
        self.insert_unique_with(user, |_| Ok::<(), Infallible>(()))
            .map_err(|e| match e {
                InsertError::Taken(field) => field,
                InsertError::Persist(never) => match never {},
            })
    }

    /// Insert or replace without uniqueness checks, used by WAL replay
    pub fn restore(&self, user: User) {
        let _guard = self
            .registration
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some((_, previous)) = self.users.remove(&user.id) {
            self.by_email.remove(&previous.email);
            self.by_username.remove(&previous.username);
        }
        self.index_and_insert(user);
    }

    fn index_and_insert(&self, user: User) {
        self.by_email.insert(user.email.clone(), user.id);
        self.by_username.insert(user.username.clone(), user.id);
        self.users.insert(user.id, user);
    }

    pub fn get(&self, id: &UserId) -> Option<User> {
        self.users.get(id).map(|entry| entry.value().clone())
    }

    /// Lookup by already-normalized email
    pub fn find_by_email(&self, email: &str) -> Option<User> {
        let id = *self.by_email.get(email)?.value();
        self.get(&id)
    }

    /// Run `f` against the record while holding its entry lock.
    /// Returns None if the user does not exist.
    pub fn update<R>(&self, id: &UserId, f: impl FnOnce(&mut User) -> R) -> Option<R> {
        let mut entry = self.users.get_mut(id)?;
        Some(f(entry.value_mut()))
    }

    pub fn remove(&self, id: &UserId) -> Option<User> {
        let _guard = self
            .registration
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let (_, user) = self.users.remove(id)?;
        self.by_email.remove(&user.email);
        self.by_username.remove(&user.username);
        Some(user)
    }

    /// All users, oldest first
    pub fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.username.cmp(&b.username)));
        users
    }

    pub fn any_with_role(&self, role: Role) -> bool {
        self.users.iter().any(|entry| entry.value().role == role)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}
