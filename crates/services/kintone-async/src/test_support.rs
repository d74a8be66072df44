//! Test-only utilities for safely mutating process-global state in tests.

use crate::config::{ENV_API_TOKEN, ENV_BASE_URL, ENV_PASSWORD, ENV_USERNAME};

/// RAII guard for temporarily setting an environment variable.
///
/// The variable is restored to its previous value (or removed if it was not
/// set) when the guard is dropped.
pub struct EnvGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvGuard {
    /// Set an environment variable temporarily.
    ///
    /// # Safety
    ///
    /// `std::env::set_var` races with concurrent environment access. Only call
    /// this from tests marked `#[serial(env)]`.
    #[must_use]
    pub fn set(key: &'static str, val: &str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: callers hold the `serial(env)` lock.
        unsafe { std::env::set_var(key, val) };
        Self { key, prev }
    }

    /// Remove an environment variable temporarily.
    ///
    /// # Safety
    ///
    /// Same constraint as [`EnvGuard::set`].
    #[must_use]
    pub fn remove(key: &'static str) -> Self {
        let prev = std::env::var(key).ok();
        // SAFETY: callers hold the `serial(env)` lock.
        unsafe { std::env::remove_var(key) };
        Self { key, prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: dropped inside the same `serial(env)` test that created it.
        match &self.prev {
            Some(v) => unsafe { std::env::set_var(self.key, v) },
            None => unsafe { std::env::remove_var(self.key) },
        }
    }
}

/// Removes every `KINTONE_*` variable the config reads, restoring them on drop.
#[must_use]
pub fn clear_kintone_env() -> Vec<EnvGuard> {
    [ENV_BASE_URL, ENV_API_TOKEN, ENV_USERNAME, ENV_PASSWORD]
        .into_iter()
        .map(EnvGuard::remove)
        .collect()
}
