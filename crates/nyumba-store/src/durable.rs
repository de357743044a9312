use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StoreError;

/// The durable-storage collaborator: get/set of named string blobs.
///
/// Backs the subset of application state that survives process restarts.
pub trait DurableStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Process-lifetime durable store. Suitable for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryDurable {
    inner: Mutex<HashMap<String, String>>,
}

impl MemoryDurable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DurableStore for MemoryDurable {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Durable store persisted as one JSON object file of key/value blobs.
#[derive(Debug)]
pub struct FileDurable {
    path: PathBuf,
    /// Serializes read-modify-write cycles against our own process.
    write_lock: Mutex<()>,
}

impl FileDurable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| StoreError::Durable {
                    message: format!("corrupt blob file {}: {e}", self.path.display()),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(StoreError::Durable {
                message: format!("reading {}: {e}", self.path.display()),
            }),
        }
    }
}

impl DurableStore for FileDurable {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut blobs = self.load()?;
        blobs.insert(key.to_string(), value.to_string());
        let content = serde_json::to_string_pretty(&blobs)?;
        std::fs::write(&self.path, content).map_err(|e| StoreError::Durable {
            message: format!("writing {}: {e}", self.path.display()),
        })
    }
}
