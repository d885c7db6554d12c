use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, OnceLock},
};

use tempfile::TempDir;

pub fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Serializes tests that touch process environment variables and restores
/// the previous values on drop.
pub struct TestEnvGuard {
    _lock: MutexGuard<'static, ()>,
    previous: Vec<(String, Option<String>)>,
}

impl TestEnvGuard {
    /// `None` removes the variable for the lifetime of the guard.
    pub fn new(vars: &[(&str, Option<&str>)]) -> Self {
        let lock = test_lock().lock().unwrap_or_else(|err| err.into_inner());
        let mut previous = Vec::with_capacity(vars.len());

        for (key, value) in vars {
            previous.push((key.to_string(), std::env::var(key).ok()));
            // SAFETY: tests using TestEnvGuard are serialized by test_lock.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }

        Self {
            _lock: lock,
            previous,
        }
    }
}

impl Drop for TestEnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.previous.iter().rev() {
            // SAFETY: tests using TestEnvGuard are serialized by test_lock.
            unsafe {
                match value {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}

/// A throwaway asset directory, removed when dropped.
pub struct TempAssetDir {
    dir: TempDir,
}

impl TempAssetDir {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("taskboard-test-")
            .tempdir()
            .unwrap_or_else(|err| panic!("failed to create temp asset dir: {err}"));
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn sqlite_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.join("db.sqlite").to_string_lossy())
    }
}

impl Default for TempAssetDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_previous_values() {
        let key = "TASKBOARD_TEST_SUPPORT_PROBE";
        {
            let _outer = TestEnvGuard::new(&[(key, Some("outer"))]);
        }
        assert!(std::env::var(key).is_err());
    }

    #[test]
    fn temp_asset_dir_builds_sqlite_url_inside_dir() {
        let dir = TempAssetDir::new();
        assert!(dir.path().exists());
        assert!(dir.sqlite_url().starts_with("sqlite://"));
        assert!(dir.sqlite_url().ends_with("db.sqlite?mode=rwc"));
    }
}
