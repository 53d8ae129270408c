use std::sync::{PoisonError, RwLock};

/// Source of the bearer token attached to every request.
///
/// `invalidate` is called when the backend answers 401; the owner decides how
/// the user signs in again.
pub trait TokenStore: Send + Sync {
    fn token(&self) -> Option<String>;
    fn invalidate(&self);
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn invalidate(&self) {
        tracing::info!("Invalidating stored access token");
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalidate_clears_token() {
        let store = MemoryTokenStore::new(Some("abc".into()));
        assert_eq!(store.token().as_deref(), Some("abc"));
        store.invalidate();
        assert!(store.token().is_none());
    }
}
