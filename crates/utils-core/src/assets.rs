use std::{io, path::PathBuf};

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
pub const ASSET_DIR_ENV: &str = "TASKBOARD_ASSET_DIR";

/// Directory holding the SQLite database and `config.json`, created on
/// first use.
pub fn asset_dir() -> io::Result<PathBuf> {
    let path = match std::env::var(ASSET_DIR_ENV) {
        Ok(override_dir) if !override_dir.trim().is_empty() => {
            PathBuf::from(override_dir.trim())
        }
        _ if cfg!(debug_assertions) => PathBuf::from(PROJECT_ROOT).join("../../dev_assets"),
        _ => ProjectDirs::from("dev", "taskboard", "taskboard")
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, "no home directory for asset storage")
            })?
            .data_dir()
            .to_path_buf(),
    };

    if !path.exists() {
        std::fs::create_dir_all(&path)?;
        tracing::debug!(path = %path.display(), "Created asset directory");
    }

    Ok(path)
    // macOS → ~/Library/Application Support/dev.taskboard.taskboard
    // Linux → ~/.local/share/taskboard (respects XDG_DATA_HOME)
}

pub fn config_path() -> io::Result<PathBuf> {
    Ok(asset_dir()?.join("config.json"))
}

#[cfg(test)]
mod tests {
    use test_support::{TempAssetDir, TestEnvGuard};

    use super::*;

    #[test]
    fn override_directory_is_created_and_used() {
        let root = TempAssetDir::new();
        let nested = root.join("nested/assets");
        let nested_str = nested.to_string_lossy().into_owned();
        let _env = TestEnvGuard::new(&[(ASSET_DIR_ENV, Some(&nested_str))]);

        assert_eq!(asset_dir().unwrap(), nested);
        assert!(nested.is_dir());
        assert_eq!(config_path().unwrap(), nested.join("config.json"));
    }

    #[test]
    fn blank_override_falls_back_to_default_location() {
        let _env = TestEnvGuard::new(&[(ASSET_DIR_ENV, Some("   "))]);
        let dir = asset_dir().unwrap();
        assert!(dir.ends_with("dev_assets"));
    }
}
