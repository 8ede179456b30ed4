//! Token and user snapshot persistence with a fixed absolute expiry.

use std::sync::Arc;

use jiff::Timestamp;
use klararety_core::types::{Session, SessionToken, User};
use klararety_core::{Error, Result};

use crate::config::SessionConfig;
use crate::storage::{AUTH_TOKEN_KEY, MemoryStorage, SameSite, SessionStorage, StoredEntry, USER_KEY};
use crate::TRACING_TARGET_STORE;

struct SessionStoreInner {
    storage: Arc<dyn SessionStorage>,
    config: SessionConfig,
}

/// Persists the session token and the user snapshot as a pair.
///
/// [`set`](Self::set) is the only write path and writes both entries in a
/// single storage batch. Readers treat a half-present, expired or undecodable
/// pair as no session and remove whatever is left of it.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("storage", &self.inner.storage)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl SessionStore {
    /// Creates a store over the given backend.
    pub fn new(storage: Arc<dyn SessionStorage>, config: SessionConfig) -> Self {
        let inner = SessionStoreInner { storage, config };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Creates a store backed by process memory.
    pub fn in_memory(config: SessionConfig) -> Self {
        Self::new(Arc::new(MemoryStorage::new()), config)
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Persists `token` and `user` with an expiry of now plus the session lifetime.
    ///
    /// # Errors
    ///
    /// Fails if the token is empty, the expiry is out of range, the user
    /// cannot be encoded or the backend rejects the write. Nothing is written on failure.
    pub fn set(&self, token: &SessionToken, user: &User) -> Result<Session> {
        if token.is_empty() {
            return Err(Error::invalid_input().with_message("session token must not be empty"));
        }

        let expires_at = Timestamp::now()
            .checked_add(self.inner.config.session_span())
            .map_err(|err| {
                Error::configuration()
                    .with_message("session lifetime exceeds the supported timestamp range")
                    .with_source(err)
            })?;
        let user_json = serde_json::to_string(user)?;

        let entry = |value: String| StoredEntry {
            value,
            expires_at,
            same_site: SameSite::Strict,
            secure: self.inner.config.secure_cookies,
        };

        self.inner.storage.write(&[
            (AUTH_TOKEN_KEY, entry(token.expose().to_owned())),
            (USER_KEY, entry(user_json)),
        ])?;

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            user_id = %user.id,
            expires_at = %expires_at,
            "Session persisted"
        );

        Ok(Session {
            token: token.clone(),
            user: user.clone(),
            expires_at,
        })
    }

    /// Returns the persisted session, or `None` if there is no usable one.
    pub fn session(&self) -> Option<Session> {
        let now = Timestamp::now();
        let token = self.read_live(AUTH_TOKEN_KEY, now);
        let user = self.read_live(USER_KEY, now);

        let (token, user) = match (token, user) {
            (Some(token), Some(user)) => (token, user),
            (None, None) => return None,
            _ => {
                tracing::debug!(
                    target: TRACING_TARGET_STORE,
                    "Removing incomplete session"
                );
                self.clear();
                return None;
            }
        };

        let snapshot = match serde_json::from_str::<User>(&user.value) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_STORE,
                    error = %err,
                    "Stored user is malformed, treating session as absent"
                );
                self.clear();
                return None;
            }
        };

        Some(Session {
            token: SessionToken::new(token.value),
            user: snapshot,
            expires_at: token.expires_at.min(user.expires_at),
        })
    }

    /// Returns the cached user snapshot.
    pub fn get(&self) -> Option<User> {
        self.session().map(|session| session.user)
    }

    /// Returns the session token.
    pub fn token(&self) -> Option<SessionToken> {
        self.session().map(|session| session.token)
    }

    /// Returns `true` if a complete, unexpired session is persisted.
    pub fn is_authenticated(&self) -> bool {
        self.session().is_some()
    }

    /// Re-persists the current session with a fresh expiry.
    ///
    /// Returns `Ok(None)` when there is nothing to extend.
    pub fn touch(&self) -> Result<Option<Session>> {
        match self.session() {
            Some(session) => self.set(&session.token, &session.user).map(Some),
            None => Ok(None),
        }
    }

    /// Removes both entries. Backend failures are logged, never returned.
    pub fn clear(&self) {
        match self.inner.storage.remove(&[AUTH_TOKEN_KEY, USER_KEY]) {
            Ok(()) => tracing::debug!(target: TRACING_TARGET_STORE, "Session cleared"),
            Err(err) => tracing::error!(
                target: TRACING_TARGET_STORE,
                error = %err,
                "Failed to clear session"
            ),
        }
    }

    fn read_live(&self, key: &str, now: Timestamp) -> Option<StoredEntry> {
        match self.inner.storage.read(key) {
            Ok(Some(entry)) if !entry.is_expired_at(now) => Some(entry),
            Ok(_) => None,
            Err(err) => {
                tracing::warn!(
                    target: TRACING_TARGET_STORE,
                    key,
                    error = %err,
                    "Failed to read session entry"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use jiff::SignedDuration;
    use klararety_core::mock::MockAuthProvider;

    use super::*;
    use crate::config::MAX_SESSION_MAX_AGE_SECS;

    fn store() -> (SessionStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone(), SessionConfig::default());
        (store, storage)
    }

    fn token() -> SessionToken {
        SessionToken::new("abc123")
    }

    #[test]
    fn test_set_then_get_round_trips_user() {
        let (store, _) = store();
        let user = MockAuthProvider::patient(7);

        let session = store.set(&token(), &user).unwrap();
        assert_eq!(store.get(), Some(user));
        assert_eq!(store.token(), Some(token()));

        let lifetime = session.expires_at.duration_since(Timestamp::now());
        assert!(lifetime <= SignedDuration::from_secs(900));
        assert!(lifetime > SignedDuration::from_secs(890));
    }

    #[test]
    fn test_oversized_lifetime_is_clamped_on_set() {
        let config = SessionConfig::default().with_session_max_age(u64::MAX);
        let store = SessionStore::in_memory(config);

        let session = store.set(&token(), &MockAuthProvider::patient(1)).unwrap();
        let lifetime = session.expires_at.duration_since(Timestamp::now());
        assert!(lifetime <= SignedDuration::from_secs(MAX_SESSION_MAX_AGE_SECS as i64));
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_entries_carry_cookie_attributes() {
        let storage = Arc::new(MemoryStorage::new());
        let config = SessionConfig::default().with_secure_cookies(true);
        let store = SessionStore::new(storage.clone(), config);
        store.set(&token(), &MockAuthProvider::patient(1)).unwrap();

        let token = storage.read(AUTH_TOKEN_KEY).unwrap().unwrap();
        let user = storage.read(USER_KEY).unwrap().unwrap();
        assert_eq!(token.value, "abc123");
        assert_eq!(token.same_site, SameSite::Strict);
        assert!(token.secure);
        assert_eq!(token.expires_at, user.expires_at);
    }

    #[test]
    fn test_empty_token_is_rejected() {
        let (store, storage) = store();
        let error = store
            .set(&SessionToken::new(""), &MockAuthProvider::patient(1))
            .unwrap_err();
        assert_eq!(error.kind(), klararety_core::ErrorKind::InvalidInput);
        assert!(storage.read(USER_KEY).unwrap().is_none());
    }

    #[test]
    fn test_malformed_user_is_absent_and_removed() {
        let (store, storage) = store();
        store.set(&token(), &MockAuthProvider::patient(1)).unwrap();

        let mut user = storage.read(USER_KEY).unwrap().unwrap();
        user.value = "{\"id\": \"not-a-user\"".to_owned();
        storage.write(&[(USER_KEY, user)]).unwrap();

        assert_eq!(store.get(), None);
        assert!(storage.read(AUTH_TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_token_without_user_is_absent_and_removed() {
        let (store, storage) = store();
        store.set(&token(), &MockAuthProvider::patient(1)).unwrap();
        storage.remove(&[USER_KEY]).unwrap();

        assert!(!store.is_authenticated());
        assert!(storage.read(AUTH_TOKEN_KEY).unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_absent() {
        let (store, storage) = store();
        store.set(&token(), &MockAuthProvider::patient(1)).unwrap();

        let past = Timestamp::now() - SignedDuration::from_secs(1);
        let mut entries = Vec::new();
        for key in [AUTH_TOKEN_KEY, USER_KEY] {
            let mut entry = storage.read(key).unwrap().unwrap();
            entry.expires_at = past;
            entries.push((key, entry));
        }
        storage.write(&entries).unwrap();

        assert_eq!(store.session(), None);
    }

    #[test]
    fn test_touch_extends_expiry() {
        let (store, storage) = store();
        store.set(&token(), &MockAuthProvider::patient(1)).unwrap();

        let mut entry = storage.read(AUTH_TOKEN_KEY).unwrap().unwrap();
        let shortened = Timestamp::now() + SignedDuration::from_secs(5);
        entry.expires_at = shortened;
        storage.write(&[(AUTH_TOKEN_KEY, entry)]).unwrap();

        let touched = store.touch().unwrap().unwrap();
        assert!(touched.expires_at > shortened);
        assert_eq!(store.session().unwrap().expires_at, touched.expires_at);
    }

    #[test]
    fn test_touch_without_session_is_noop() {
        let (store, _) = store();
        assert!(store.touch().unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_both_entries() {
        let (store, storage) = store();
        store.set(&token(), &MockAuthProvider::patient(1)).unwrap();
        store.clear();
        store.clear();

        assert!(storage.read(AUTH_TOKEN_KEY).unwrap().is_none());
        assert!(storage.read(USER_KEY).unwrap().is_none());
    }
}
