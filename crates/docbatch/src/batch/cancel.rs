//! Cooperative cancellation for running batches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Flag shared between the controller and one executor run.
///
/// The executor checks it before dispatching each window; calls already in
/// flight are allowed to finish.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Tokens of the batches currently owned by an executor, keyed by batch id.
#[derive(Debug, Clone, Default)]
pub struct CancelRegistry {
    tokens: Arc<Mutex<HashMap<String, CancelToken>>>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates and stores a fresh token for `batch_id`.
    pub fn register(&self, batch_id: &str) -> CancelToken {
        let token = CancelToken::new();
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.insert(batch_id.to_string(), token.clone());
        }
        token
    }

    /// Flips the token for `batch_id`. Returns `false` when no run is tracked.
    pub fn cancel(&self, batch_id: &str) -> bool {
        match self.tokens.lock() {
            Ok(tokens) => match tokens.get(batch_id) {
                Some(token) => {
                    token.cancel();
                    true
                }
                None => false,
            },
            Err(_) => false,
        }
    }

    pub fn remove(&self, batch_id: &str) {
        if let Ok(mut tokens) = self.tokens.lock() {
            tokens.remove(batch_id);
        }
    }

    pub fn is_tracked(&self, batch_id: &str) -> bool {
        self.tokens
            .lock()
            .map(|tokens| tokens.contains_key(batch_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clones_share_state() {
        let token = CancelToken::new();
        let observer = token.clone();
        assert!(!observer.is_cancelled());
        token.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_registry_lifecycle() {
        let registry = CancelRegistry::new();
        let token = registry.register("b-1");
        assert!(registry.is_tracked("b-1"));

        assert!(registry.cancel("b-1"));
        assert!(token.is_cancelled());

        registry.remove("b-1");
        assert!(!registry.is_tracked("b-1"));
        assert!(!registry.cancel("b-1"));
    }
}
