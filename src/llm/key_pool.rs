//! API Key Pool
//!
//! Immutable pool of provider API keys with an atomic round-robin cursor.
//! Each `Agent` construction draws one key; concurrent agents sharing the
//! same configuration never race on key selection. This spreads load across
//! keys but is not a retry or backoff mechanism.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use secrecy::SecretString;

use crate::types::{LensError, Result};

/// Round-robin pool of API keys
#[derive(Clone)]
pub struct KeyPool {
    keys: Arc<[SecretString]>,
    cursor: Arc<AtomicUsize>,
}

impl std::fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPool")
            .field("keys", &format!("[{} REDACTED]", self.keys.len()))
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

impl KeyPool {
    pub fn new(keys: Vec<String>) -> Result<Self> {
        if keys.is_empty() {
            return Err(LensError::Config(
                "at least one API key is required".to_string(),
            ));
        }

        Ok(Self {
            keys: keys.into_iter().map(SecretString::from).collect(),
            cursor: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Draw the next key, advancing the shared cursor
    pub fn next_key(&self) -> SecretString {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        self.keys[idx].clone()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_empty_pool_rejected() {
        assert!(KeyPool::new(vec![]).is_err());
    }

    #[test]
    fn test_round_robin_order() {
        let pool = KeyPool::new(vec!["a".into(), "b".into(), "c".into()]).unwrap();

        let drawn: Vec<String> = (0..6)
            .map(|_| pool.next_key().expose_secret().to_string())
            .collect();
        assert_eq!(drawn, vec!["a", "b", "c", "a", "b", "c"]);
    }

    #[test]
    fn test_clones_share_cursor() {
        let pool = KeyPool::new(vec!["a".into(), "b".into()]).unwrap();
        let clone = pool.clone();

        assert_eq!(pool.next_key().expose_secret(), "a");
        assert_eq!(clone.next_key().expose_secret(), "b");
        assert_eq!(pool.next_key().expose_secret(), "a");
    }

    #[test]
    fn test_concurrent_draws_cover_all_keys() {
        let pool = KeyPool::new((0..4).map(|i| format!("k{}", i)).collect()).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let pool = pool.clone();
                std::thread::spawn(move || pool.next_key().expose_secret().to_string())
            })
            .collect();

        let mut drawn: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        drawn.sort();
        assert_eq!(drawn, vec!["k0", "k1", "k2", "k3"]);
    }
}
