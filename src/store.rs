use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;

use crate::error::Result;

/// On-disk shapes of `done.json`. Older files are a bare list of ids.
#[derive(Deserialize)]
#[serde(untagged)]
enum DoneFile {
    Stamped(HashMap<String, DateTime<Utc>>),
    Legacy(Vec<String>),
}

/// Notifications marked done, with the `updated_at` they had at the time.
///
/// A notification counts as done until it sees newer activity, at which
/// point it resurfaces on the next fetch.
#[derive(Debug)]
pub struct DoneStore {
    entries: Mutex<HashMap<String, DateTime<Utc>>>,
    path: Option<PathBuf>,
}

/// XDG data directory: ~/.local/share/sift/done.json (Linux)
fn default_path() -> Option<PathBuf> {
    Some(dirs::data_dir()?.join("sift").join("done.json"))
}

impl DoneStore {
    /// Opens the store at the default location. Problems reading it are
    /// logged and leave the store empty.
    pub fn open_default() -> Self {
        match default_path() {
            Some(path) => Self::open(path),
            None => Self::in_memory(),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match load(&path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load done notifications");
                HashMap::new()
            }
        };
        tracing::debug!(count = entries.len(), "loaded done notifications");
        Self {
            entries: Mutex::new(entries),
            path: Some(path),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            path: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records `id` and writes the whole set back. The lock is held across
    /// the write so concurrent calls persist in order.
    pub fn mark_done(&self, id: &str, updated_at: DateTime<Utc>) -> Result<()> {
        let mut entries = self.lock();
        entries.insert(id.to_string(), updated_at);
        self.save(&entries)
    }

    /// Done unless `updated_at` is newer than when it was marked.
    pub fn is_done(&self, id: &str, updated_at: DateTime<Utc>) -> bool {
        self.lock().get(id).is_some_and(|done_at| updated_at <= *done_at)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn save(&self, entries: &HashMap<String, DateTime<Utc>>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        // Sorted so the file diffs cleanly
        let snapshot: BTreeMap<&String, &DateTime<Utc>> = entries.iter().collect();

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, &snapshot)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        tracing::debug!(count = snapshot.len(), "saved done notifications");
        Ok(())
    }
}

fn load(path: &Path) -> Result<HashMap<String, DateTime<Utc>>> {
    let data = match std::fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };
    Ok(match serde_json::from_str::<DoneFile>(&data)? {
        DoneFile::Stamped(entries) => entries,
        // No timestamp means every legacy entry resurfaces once
        DoneFile::Legacy(ids) => ids
            .into_iter()
            .map(|id| (id, DateTime::<Utc>::default()))
            .collect(),
    })
}
