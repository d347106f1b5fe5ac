//! Durable client-side storage.
//!
//! A [`Mirror`] is a tiny key/value store which survives restarts. The
//! [`SessionStore`](crate::SessionStore) projects its state into it after
//! every mutation and reads it back exactly once, at startup.

use std::{
    collections::HashMap,
    fmt::Debug,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

/// The key holding the serialized [`Session`](crate::Session).
pub const SESSION_KEY: &str = "user";
/// The key holding the preferred [`ThemeMode`](crate::ThemeMode).
pub const THEME_KEY: &str = "theme-mode";
/// The key holding the API origin's cookies.
pub const COOKIES_KEY: &str = "cookies";

/// Persistent key/value storage.
///
/// Implementations must finish (or fail) before returning so callers never
/// see a window where memory and disk disagree.
pub trait Mirror: Debug + Send + Sync {
    /// Read a value, returning `None` if it was never written or can't be
    /// read.
    fn load(&self, key: &str) -> Option<String>;
    fn store(&self, key: &str, value: &str) -> Result<(), MirrorError>;
    /// Delete a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), MirrorError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Unable to write \"{}\"", path.display())]
    Write {
        path: PathBuf,
        #[source]
        inner: io::Error,
    },
    #[error("Unable to remove \"{}\"", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        inner: io::Error,
    },
    #[error("\"{}\" isn't a valid storage key", key)]
    BadKey { key: String },
    #[error("Unable to serialize the value")]
    Serialize(#[from] serde_json::Error),
}

/// A [`Mirror`] which keeps one file per key inside a directory.
#[derive(Debug, Clone, PartialEq)]
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self { FileMirror { dir: dir.into() } }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path_for(&self, key: &str) -> Result<PathBuf, MirrorError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(self.dir.join(key))
        } else {
            Err(MirrorError::BadKey {
                key: key.to_string(),
            })
        }
    }
}

impl Mirror for FileMirror {
    fn load(&self, key: &str) -> Option<String> {
        let path = self.path_for(key).ok()?;

        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                log::warn!("Unable to read \"{}\": {}", path.display(), e);
                None
            },
        }
    }

    fn store(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        let path = self.path_for(key)?;
        let err = |inner| MirrorError::Write {
            path: path.clone(),
            inner,
        };

        fs::create_dir_all(&self.dir).map_err(err)?;

        // write to a scratch file and rename it into place so a crash can
        // never leave a half-written value behind
        let tmp = path.with_extension("tmp");
        let mut f = File::create(&tmp).map_err(err)?;
        f.write_all(value.as_bytes()).map_err(err)?;
        f.sync_all().map_err(err)?;
        drop(f);
        fs::rename(&tmp, &path).map_err(err)?;

        log::trace!("Wrote {} bytes to \"{}\"", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MirrorError> {
        let path = self.path_for(key)?;

        match fs::remove_file(&path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(inner) => Err(MirrorError::Remove { path, inner }),
        }
    }
}

/// A [`Mirror`] that lives and dies with the process.
#[derive(Debug, Default)]
pub struct MemoryMirror {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryMirror {
    pub fn new() -> Self { MemoryMirror::default() }

    /// Seed the mirror with a value, as if a previous run had written it.
    pub fn with(self, key: &str, value: &str) -> Self {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        self
    }
}

impl Mirror for MemoryMirror {
    fn load(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> Result<(), MirrorError> {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), MirrorError> {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
        Ok(())
    }
}
