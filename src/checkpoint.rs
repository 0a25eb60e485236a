//! Conversation persistence keyed by thread id.
//!
//! The agent loads a thread's transcript before a run and saves the extended
//! transcript afterwards. Stores must be safe to share across requests.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::message::Message;

#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("Checkpoint I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt checkpoint for thread '{thread_id}': {source}")]
    Corrupt {
        thread_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[async_trait::async_trait]
pub trait Checkpointer: Send + Sync {
    /// Prepare the backing store. Safe to call more than once.
    async fn setup(&self) -> Result<(), CheckpointError>;

    /// Transcript of `thread_id`, empty if the thread is new.
    async fn load(&self, thread_id: &str) -> Result<Vec<Message>, CheckpointError>;

    /// Replace the stored transcript of `thread_id`.
    async fn save(&self, thread_id: &str, messages: &[Message]) -> Result<(), CheckpointError>;
}

/// Process-local store. Threads are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryCheckpointer {
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn setup(&self) -> Result<(), CheckpointError> {
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Vec<Message>, CheckpointError> {
        Ok(self
            .threads
            .read()
            .await
            .get(thread_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, thread_id: &str, messages: &[Message]) -> Result<(), CheckpointError> {
        self.threads
            .write()
            .await
            .insert(thread_id.to_string(), messages.to_vec());
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ThreadFile {
    thread_id: String,
    messages: Vec<Message>,
}

/// One JSON file per thread under a directory.
#[derive(Debug, Clone)]
pub struct FileCheckpointer {
    dir: PathBuf,
}

impl FileCheckpointer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, thread_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", urlencoding::encode(thread_id)))
    }
}

#[async_trait::async_trait]
impl Checkpointer for FileCheckpointer {
    async fn setup(&self) -> Result<(), CheckpointError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CheckpointError::Io {
                path: self.dir.clone(),
                source,
            })
    }

    async fn load(&self, thread_id: &str) -> Result<Vec<Message>, CheckpointError> {
        let path = self.path_for(thread_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(CheckpointError::Io { path, source }),
        };
        let file: ThreadFile =
            serde_json::from_slice(&raw).map_err(|source| CheckpointError::Corrupt {
                thread_id: thread_id.to_string(),
                source,
            })?;
        Ok(file.messages)
    }

    async fn save(&self, thread_id: &str, messages: &[Message]) -> Result<(), CheckpointError> {
        let path = self.path_for(thread_id);
        let file = ThreadFile {
            thread_id: thread_id.to_string(),
            messages: messages.to_vec(),
        };
        let raw = serde_json::to_vec_pretty(&file).map_err(|source| CheckpointError::Corrupt {
            thread_id: thread_id.to_string(),
            source,
        })?;

        // Write then rename so a crash never leaves a half-written thread.
        // Each write gets its own tmp file; concurrent saves must not share one.
        static WRITES: AtomicU64 = AtomicU64::new(0);
        let tmp = path.with_extension(format!(
            "json.{}-{}.tmp",
            std::process::id(),
            WRITES.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|source| CheckpointError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| CheckpointError::Io { path, source })
    }
}
