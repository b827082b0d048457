//! The authenticated session.
//!
//! One [`Session`] exists per app. It is created in [`crate::app`] and handed
//! to the fetch gateway and the auth store by `Rc`. The token and the user
//! record are mirrored to durable storage so a reload keeps the user logged
//! in.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{info, warn};

use crate::config::{HOME_ROUTE, LOGIN_ROUTE, TOKEN_STORAGE_KEY, USER_STORAGE_KEY};
use crate::core::error::StorageError;
use crate::models::User;
use crate::utils::dom;

// ============================================================================
// Storage
// ============================================================================

/// Durable string key/value storage.
pub trait KeyValueStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// `window.localStorage`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserStorage;

impl KeyValueStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        dom::local_storage()?.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let storage = dom::local_storage().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(key, value)
            .map_err(|_| StorageError::SaveFailed(key.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let storage = dom::local_storage().ok_or(StorageError::Unavailable)?;
        storage
            .remove_item(key)
            .map_err(|_| StorageError::RemoveFailed(key.to_string()))
    }
}

/// In-memory storage, for tests and for environments without localStorage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.borrow().contains_key(key)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

// ============================================================================
// Navigation
// ============================================================================

/// Where the session sends the user when it starts or ends.
pub trait Navigator {
    /// In-app route such as `/login`.
    fn push(&self, route: &str);
    /// Full-page navigation to an external URL (OAuth providers).
    fn redirect(&self, url: &str);
}

/// Hash-based navigation: `/login` becomes `#/login`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashNavigator;

impl Navigator for HashNavigator {
    fn push(&self, route: &str) {
        dom::set_hash(&format!("#{}", route));
    }

    fn redirect(&self, url: &str) {
        dom::redirect(url);
    }
}

/// Records navigations instead of performing them.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: RefCell<Vec<String>>,
    redirects: RefCell<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.borrow().clone()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn push(&self, route: &str) {
        self.routes.borrow_mut().push(route.to_string());
    }

    fn redirect(&self, url: &str) {
        self.redirects.borrow_mut().push(url.to_string());
    }
}

// ============================================================================
// Session
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
struct Credentials {
    token: String,
    user: User,
}

/// Token and user for the logged-in account, if any.
///
/// A session is active only when both the token and the user are known.
pub struct Session {
    storage: Rc<dyn KeyValueStorage>,
    navigator: Rc<dyn Navigator>,
    credentials: RefCell<Option<Credentials>>,
    return_url: RefCell<Option<String>>,
}

impl Session {
    /// Restore the session persisted by a previous page load.
    pub fn restore(storage: Rc<dyn KeyValueStorage>, navigator: Rc<dyn Navigator>) -> Self {
        let token = storage.get(TOKEN_STORAGE_KEY).filter(|t| !t.is_empty());
        let user = storage
            .get(USER_STORAGE_KEY)
            .and_then(|json| match serde_json::from_str::<User>(&json) {
                Ok(user) => Some(user),
                Err(err) => {
                    warn!(error = %err, "ignoring unreadable stored user");
                    None
                }
            });

        let credentials = match (token, user) {
            (Some(token), Some(user)) => Some(Credentials { token, user }),
            _ => None,
        };

        Self {
            storage,
            navigator,
            credentials: RefCell::new(credentials),
            return_url: RefCell::new(None),
        }
    }

    pub fn is_active(&self) -> bool {
        self.credentials.borrow().is_some()
    }

    /// Bearer token of the active session.
    pub fn token(&self) -> Option<String> {
        self.credentials.borrow().as_ref().map(|c| c.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.credentials.borrow().as_ref().map(|c| c.user.clone())
    }

    /// Start a session and persist it.
    ///
    /// The in-memory session is active even if persisting fails; the error is
    /// returned so the caller can decide whether to warn the user.
    pub fn begin(&self, token: String, user: User) -> Result<(), StorageError> {
        let user_json = serde_json::to_string(&user)
            .map_err(|_| StorageError::SerializationFailed(USER_STORAGE_KEY.to_string()));
        info!(user_id = user.id, "session started");
        *self.credentials.borrow_mut() = Some(Credentials {
            token: token.clone(),
            user,
        });
        self.storage.set(USER_STORAGE_KEY, &user_json?)?;
        self.storage.set(TOKEN_STORAGE_KEY, &token)
    }

    /// Clear the session everywhere and go to the login route.
    pub fn end(&self) {
        let previous = self.credentials.borrow_mut().take();
        if let Some(credentials) = previous {
            info!(user_id = credentials.user.id, "session ended");
        }
        for key in [USER_STORAGE_KEY, TOKEN_STORAGE_KEY] {
            if let Err(err) = self.storage.remove(key) {
                warn!(error = %err, "failed to clear stored session");
            }
        }
        self.navigator.push(LOGIN_ROUTE);
    }

    /// Remember where to go after the next login.
    pub fn set_return_url(&self, url: impl Into<String>) {
        *self.return_url.borrow_mut() = Some(url.into());
    }

    /// Navigate to the remembered return URL (or home), consuming it.
    pub fn navigate_after_login(&self) {
        let target = self
            .return_url
            .borrow_mut()
            .take()
            .unwrap_or_else(|| HOME_ROUTE.to_string());
        self.navigator.push(&target);
    }

    /// Leave the app for an external URL.
    pub fn redirect(&self, url: &str) {
        self.navigator.redirect(url);
    }
}
