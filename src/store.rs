// Session persistence
//
// Each session is two sibling files in one directory:
//   <id>.wav          audio container
//   <id>_events.json  event document

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};

pub const AUDIO_EXTENSION: &str = "wav";
pub const EVENTS_SUFFIX: &str = "_events.json";

/// Raw artifacts of one stored session
#[derive(Debug, Clone)]
pub struct StoredSession {
    pub audio: Vec<u8>,
    pub events: Vec<u8>,
}

/// Storage medium for session artifacts
pub trait SessionStore: Send {
    /// Write both artifacts, replacing any existing ones
    fn write(&self, id: &str, audio: &[u8], events: &[u8]) -> SessionResult<()>;

    /// Read both artifacts; fails with `SessionNotFound` if either is missing
    fn read(&self, id: &str) -> SessionResult<StoredSession>;

    /// Ids of every session with an audio artifact
    fn list(&self) -> SessionResult<Vec<String>>;

    /// Remove both artifacts (succeeds if already absent)
    fn delete(&self, id: &str) -> SessionResult<()>;
}

/// Session store backed by a directory on disk
#[derive(Debug, Clone)]
pub struct FsSessionStore {
    root: PathBuf,
}

impl FsSessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn audio_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}.{}", id, AUDIO_EXTENSION))
    }

    pub fn events_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}{}", id, EVENTS_SUFFIX))
    }
}

impl SessionStore for FsSessionStore {
    fn write(&self, id: &str, audio: &[u8], events: &[u8]) -> SessionResult<()> {
        validate_id(id)?;
        let write_failure = |source| SessionError::StorageWriteFailure {
            id: id.to_string(),
            source,
        };

        fs::create_dir_all(&self.root).map_err(write_failure)?;
        fs::write(self.audio_path(id), audio).map_err(write_failure)?;
        fs::write(self.events_path(id), events).map_err(write_failure)?;

        info!(
            "Saved session {} to {} ({} audio bytes, {} event bytes)",
            id,
            self.root.display(),
            audio.len(),
            events.len()
        );
        Ok(())
    }

    fn read(&self, id: &str) -> SessionResult<StoredSession> {
        validate_id(id)?;
        let audio = read_artifact(id, &self.audio_path(id))?;
        let events = read_artifact(id, &self.events_path(id))?;

        debug!("Read session {} from {}", id, self.root.display());
        Ok(StoredSession { audio, events })
    }

    fn list(&self) -> SessionResult<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SessionError::StorageReadFailure {
                    id: self.root.display().to_string(),
                    source,
                })
            }
        };

        let mut ids = BTreeSet::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(AUDIO_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                ids.insert(stem.to_string());
            }
        }

        Ok(ids.into_iter().collect())
    }

    fn delete(&self, id: &str) -> SessionResult<()> {
        validate_id(id)?;
        for path in [self.audio_path(id), self.events_path(id)] {
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(SessionError::StorageWriteFailure {
                        id: id.to_string(),
                        source,
                    })
                }
            }
        }

        info!("Deleted session {}", id);
        Ok(())
    }
}

fn read_artifact(id: &str, path: &Path) -> SessionResult<Vec<u8>> {
    fs::read(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            SessionError::SessionNotFound(id.to_string())
        } else {
            SessionError::StorageReadFailure {
                id: id.to_string(),
                source,
            }
        }
    })
}

/// Ids name files in one directory, so they may not contain path syntax
fn validate_id(id: &str) -> SessionResult<()> {
    if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
        return Err(SessionError::SessionNotFound(id.to_string()));
    }
    Ok(())
}
