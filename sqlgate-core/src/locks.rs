//! Per-user lock registry.
//!
//! At most one in-flight database operation per user at a time; requests
//! for different users never contend. Locks are created lazily on first
//! use and kept for the process lifetime, an accepted bounded leak,
//! user cardinality being small and stable.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::ExecuteError;

/// Dynamic arena of per-user mutexes.
#[derive(Debug)]
pub struct UserLockRegistry {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
    /// `None` means wait without bound
    acquire_timeout: Option<Duration>,
}

/// Held for the duration of one user's database operation.
/// Releases unconditionally on drop, on success and failure alike.
#[derive(Debug)]
pub struct UserLockGuard {
    _guard: OwnedMutexGuard<()>,
}

impl UserLockRegistry {
    pub fn new(acquire_timeout: Option<Duration>) -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
            acquire_timeout,
        }
    }

    /// Acquire the lock for `user_id`, waiting up to the configured bound.
    ///
    /// Blocks only behind requests from the same user; other users' locks
    /// are untouched.
    pub async fn acquire(&self, user_id: &str) -> Result<UserLockGuard, ExecuteError> {
        let lock = self.lock_for(user_id);
        let guard = match self.acquire_timeout {
            Some(wait) => tokio::time::timeout(wait, lock.lock_owned())
                .await
                .map_err(|_| ExecuteError::LockTimeout {
                    user_id: user_id.to_string(),
                    waited: wait,
                })?,
            None => lock.lock_owned().await,
        };
        Ok(UserLockGuard { _guard: guard })
    }

    /// Number of distinct users with a lock allocated.
    pub fn len(&self) -> usize {
        self.locks.lock().expect("lock registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Atomic check-and-insert: a racing first request from the same user
    // gets the same Arc, never a duplicate lock.
    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().expect("lock registry poisoned");
        locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
