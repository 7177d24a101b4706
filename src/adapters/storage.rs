use crate::core::CartStorage;
use crate::utils::error::Result;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

/// Directory-backed slots: one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Keys are form-urlencoded, so distinct keys never share a file:
    /// `@RocketShoes:cart` is stored as `%40RocketShoes%3Acart.json`.
    pub fn slot_path(&self, key: &str) -> PathBuf {
        let file_name: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
        self.base_path.join(format!("{}.json", file_name))
    }
}

impl CartStorage for LocalStorage {
    async fn read_slot(&self, key: &str) -> Result<Option<String>> {
        let full_path = self.slot_path(key);
        match fs::read_to_string(&full_path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No saved cart at {}", full_path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        let full_path = self.slot_path(key);

        let parent = full_path.parent().unwrap_or(self.base_path.as_path());
        fs::create_dir_all(parent)?;

        // 先寫入同目錄的暫存檔再 rename，中途失敗時舊內容仍完整
        let mut temp_file = NamedTempFile::new_in(parent)?;
        temp_file.write_all(value.as_bytes())?;
        temp_file.as_file().sync_all()?;
        temp_file.persist(&full_path).map_err(|e| e.error)?;

        tracing::debug!("Wrote {} bytes to {}", value.len(), full_path.display());
        Ok(())
    }
}

/// In-process slots shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut slots = self.slots.lock().await;
        slots.insert(key.into(), value.into());
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let slots = self.slots.lock().await;
        slots.get(key).cloned()
    }

    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }
}

impl CartStorage for MemoryStorage {
    async fn read_slot(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key).await)
    }

    async fn write_slot(&self, key: &str, value: &str) -> Result<()> {
        self.insert(key, value).await;
        Ok(())
    }
}
