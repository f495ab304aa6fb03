//! Durable storage for the bearer token.
//!
//! The token is the only client state that survives a restart. It is kept
//! under the key [`TOKEN_KEY`] of a small JSON object, so other keys written
//! by other tools into the same file are preserved.

use estate_core::error::{EstateError, EstateResult};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const TOKEN_KEY: &str = "token";

pub trait TokenStore: Send + Sync {
    fn load(&self) -> EstateResult<Option<String>>;
    fn save(&self, token: &str) -> EstateResult<()>;
    fn clear(&self) -> EstateResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> EstateResult<Option<String>> {
        Ok(self.token.lock().clone())
    }

    fn save(&self, token: &str) -> EstateResult<()> {
        *self.token.lock() = Some(token.to_owned());
        Ok(())
    }

    fn clear(&self) -> EstateResult<()> {
        *self.token.lock() = None;
        Ok(())
    }
}

/// JSON-file token store. A missing file reads as "no token".
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> EstateResult<Map<String, Value>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(storage_error(&self.path, "read", e)),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                tracing::warn!(
                    path = %self.path.display(),
                    "token file is not a JSON object; ignoring it"
                );
                Ok(Map::new())
            }
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> EstateResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| storage_error(parent, "create", e))?;
        }
        let body = serde_json::to_vec_pretty(map)
            .map_err(|e| EstateError::Storage(format!("encode token file: {e}")))?;

        // Write-then-rename so a crash never leaves a truncated file.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, body).map_err(|e| storage_error(&tmp, "write", e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| storage_error(&self.path, "replace", e))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> EstateResult<Option<String>> {
        let _guard = self.lock.lock();
        let map = self.read_map()?;
        Ok(map
            .get(TOKEN_KEY)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned))
    }

    fn save(&self, token: &str) -> EstateResult<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        map.insert(TOKEN_KEY.to_owned(), Value::String(token.to_owned()));
        self.write_map(&map)
    }

    fn clear(&self) -> EstateResult<()> {
        let _guard = self.lock.lock();
        let mut map = self.read_map()?;
        if map.remove(TOKEN_KEY).is_none() {
            return Ok(());
        }
        self.write_map(&map)
    }
}

fn storage_error(path: &Path, action: &str, e: std::io::Error) -> EstateError {
    EstateError::Storage(format!("{action} {}: {e}", path.display()))
}
