use std::sync::{PoisonError, RwLock};

/// Long-lived application credentials issued once for the process lifetime.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl AppCredentials {
    pub fn new<K, S, T, TS>(
        consumer_key: K,
        consumer_secret: S,
        access_token: T,
        access_token_secret: TS,
    ) -> Self
    where
        K: Into<String>,
        S: Into<String>,
        T: Into<String>,
        TS: Into<String>,
    {
        AppCredentials {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
            access_token: access_token.into(),
            access_token_secret: access_token_secret.into(),
        }
    }
}

/// A user access token/secret pair granted by the verifier exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserToken {
    pub token: String,
    pub secret: String,
}

/// Mutable runtime token slots.
///
/// The existence predicates gate which `Authorization` header the client
/// produces. Implementations may persist tokens wherever they like; the
/// client only reads and writes through this interface.
pub trait TokenStore: Send + Sync {
    fn app_token(&self) -> Option<String>;

    fn set_app_token(&self, token: &str);

    fn user_token(&self) -> Option<UserToken>;

    fn set_user_token(&self, token: &str, secret: &str);

    fn has_app_token(&self) -> bool {
        self.app_token().is_some()
    }

    fn has_user_token(&self) -> bool {
        self.user_token().is_some()
    }
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: RwLock<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
    app_token: Option<String>,
    user_token: Option<UserToken>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        MemoryTokenStore::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn app_token(&self) -> Option<String> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .app_token
            .clone()
    }

    fn set_app_token(&self, token: &str) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .app_token = Some(token.to_owned());
    }

    fn user_token(&self) -> Option<UserToken> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_token
            .clone()
    }

    fn set_user_token(&self, token: &str, secret: &str) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .user_token = Some(UserToken {
            token: token.to_owned(),
            secret: secret.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_tokens() {
        let store = MemoryTokenStore::new();
        assert!(!store.has_app_token());
        assert!(!store.has_user_token());
    }

    #[test]
    fn stored_tokens_are_readable() {
        let store = MemoryTokenStore::new();
        store.set_app_token("bearer-xyz");
        store.set_user_token("tok", "sec");

        assert!(store.has_app_token());
        assert_eq!(store.app_token().as_deref(), Some("bearer-xyz"));
        assert_eq!(
            store.user_token(),
            Some(UserToken {
                token: "tok".into(),
                secret: "sec".into(),
            })
        );
    }

    #[test]
    fn slots_overwrite() {
        let store = MemoryTokenStore::new();
        store.set_user_token("a", "b");
        store.set_user_token("c", "d");
        assert_eq!(store.user_token().map(|t| t.token), Some("c".to_owned()));
    }
}
