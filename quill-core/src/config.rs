//! YAML settings persistence.
//!
//! # Storage layout
//!
//! ```text
//! ~/.quill/
//!   config.yaml   (mode 0600, created by `quill init`)
//! ```
//!
//! # API pattern
//!
//! Every function that touches the filesystem has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default minimum interval between automatic syncs, in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 300;

/// User settings for one synchronized working tree.
///
/// The repository itself (remote, credentials, upstream branch) is assumed
/// pre-configured; quill only records where it lives and how aggressively to
/// sync it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Absolute path to the git working tree holding the document set.
    pub repo: PathBuf,
    /// Run automatic sync sequences (blur loop, periodic resync).
    #[serde(default = "default_true")]
    pub auto_sync: bool,
    /// Refresh the passive indicator on host data-change events.
    #[serde(default)]
    pub check_on_data_change: bool,
    /// Commit and push local changes when the host window is hidden.
    #[serde(default)]
    pub push_on_hide: bool,
    /// Minimum seconds between automatic syncs (manual triggers bypass this).
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

fn default_sync_interval() -> u64 {
    DEFAULT_SYNC_INTERVAL_SECS
}

impl Settings {
    /// Fresh settings for a working tree with defaults everywhere else.
    pub fn for_repo(repo: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            repo,
            auto_sync: true,
            check_on_data_change: false,
            push_on_hide: false,
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            created_at: now,
            updated_at: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.quill/` — pure, no I/O.
pub fn quill_root_at(home: &Path) -> PathBuf {
    home.join(".quill")
}

/// `<home>/.quill/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    quill_root_at(home).join("config.yaml")
}

/// `config_path_at` convenience wrapper.
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_path_at(&home()?))
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load settings from `<home>/.quill/config.yaml`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_at(home: &Path) -> Result<Settings, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, ConfigError> {
    load_at(&home()?)
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save settings to `<home>/.quill/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
/// The `.tmp` is always in the same directory as the target (same
/// filesystem — no EXDEV).
pub fn save_at(home: &Path, settings: &Settings) -> Result<(), ConfigError> {
    let root = quill_root_at(home);
    if !root.exists() {
        std::fs::create_dir_all(&root)?;
        set_dir_permissions(&root)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(settings)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(settings: &Settings) -> Result<(), ConfigError> {
    save_at(&home()?, settings)
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

/// Register a working tree at `repo`.
///
/// Idempotent: if settings already exist, loads and returns them unchanged
/// rather than clobbering tuned values.
pub fn init_at(home: &Path, repo: PathBuf) -> Result<Settings, ConfigError> {
    if config_path_at(home).exists() {
        return load_at(home);
    }
    let settings = Settings::for_repo(repo);
    save_at(home, &settings)?;
    Ok(settings)
}

/// `init_at` convenience wrapper.
pub fn init(repo: PathBuf) -> Result<Settings, ConfigError> {
    init_at(&home()?, repo)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_home() -> TempDir {
        TempDir::new().expect("tempdir")
    }

    #[test]
    fn config_path_is_correct() {
        let home = make_home();
        let path = config_path_at(home.path());
        assert!(path.ends_with(".quill/config.yaml"));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let home = make_home();
        let mut settings = Settings::for_repo(PathBuf::from("/notes/garden"));
        settings.check_on_data_change = true;
        settings.sync_interval_secs = 120;

        save_at(home.path(), &settings).expect("save");
        let loaded = load_at(home.path()).expect("load");
        assert_eq!(loaded, settings);
    }

    #[test]
    fn atomic_write_cleans_up_tmp() {
        let home = make_home();
        let settings = Settings::for_repo(PathBuf::from("/notes/garden"));
        save_at(home.path(), &settings).expect("save");
        let tmp = config_path_at(home.path()).with_file_name("config.yaml.tmp");
        assert!(!tmp.exists(), ".tmp must be gone after successful save");
    }

    #[test]
    fn load_missing_settings_returns_not_found() {
        let home = make_home();
        let err = load_at(home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigNotFound { .. }));
    }

    #[test]
    fn init_is_idempotent() {
        let home = make_home();
        let first = init_at(home.path(), PathBuf::from("/notes/garden")).expect("init");

        let mut tuned = first.clone();
        tuned.sync_interval_secs = 60;
        save_at(home.path(), &tuned).expect("save tuned");

        let again = init_at(home.path(), PathBuf::from("/elsewhere")).expect("re-init");
        assert_eq!(
            again.sync_interval_secs, 60,
            "re-init must not clobber existing settings"
        );
        assert_eq!(again.repo, PathBuf::from("/notes/garden"));
    }

    #[test]
    fn defaults_fill_missing_optional_fields() {
        let home = make_home();
        let root = quill_root_at(home.path());
        std::fs::create_dir_all(&root).expect("mkdir");
        std::fs::write(
            config_path_at(home.path()),
            "repo: /notes/garden\ncreated_at: 2026-01-01T00:00:00Z\nupdated_at: 2026-01-01T00:00:00Z\n",
        )
        .expect("write minimal config");

        let settings = load_at(home.path()).expect("load");
        assert!(settings.auto_sync, "auto_sync defaults on");
        assert!(!settings.check_on_data_change);
        assert!(!settings.push_on_hide);
        assert_eq!(settings.sync_interval_secs, DEFAULT_SYNC_INTERVAL_SECS);
    }

    #[test]
    fn file_permissions_are_0600() {
        let home = make_home();
        let settings = Settings::for_repo(PathBuf::from("/notes/garden"));
        save_at(home.path(), &settings).expect("save");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(config_path_at(home.path()))
                .unwrap()
                .permissions()
                .mode()
                & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}
