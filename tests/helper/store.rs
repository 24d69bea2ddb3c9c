//! In-memory file store

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use catalog_bump::upgrade::FileStore;

#[derive(Default)]
struct State {
    files: HashMap<PathBuf, String>,
    reads: HashMap<PathBuf, usize>,
    writes: HashMap<PathBuf, usize>,
}

/// File store over a shared map; clones see the same files and counters
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            for (path, content) in files {
                state.files.insert(PathBuf::from(path), content.to_string());
            }
        }
        store
    }

    pub fn contains(&self, path: &str) -> bool {
        self.state.lock().unwrap().files.contains_key(Path::new(path))
    }

    pub fn content(&self, path: &str) -> String {
        self.state.lock().unwrap().files[Path::new(path)].clone()
    }

    pub fn reads(&self, path: &str) -> usize {
        self.count(|state| &state.reads, path)
    }

    pub fn writes(&self, path: &str) -> usize {
        self.count(|state| &state.writes, path)
    }

    pub fn total_reads(&self) -> usize {
        self.state.lock().unwrap().reads.values().sum()
    }

    pub fn total_writes(&self) -> usize {
        self.state.lock().unwrap().writes.values().sum()
    }

    fn count(&self, counters: impl Fn(&State) -> &HashMap<PathBuf, usize>, path: &str) -> usize {
        let state = self.state.lock().unwrap();
        counters(&state).get(Path::new(path)).copied().unwrap_or(0)
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn read(&self, path: &Path) -> io::Result<String> {
        let mut state = self.state.lock().unwrap();
        *state.reads.entry(path.to_path_buf()).or_default() += 1;
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        *state.writes.entry(path.to_path_buf()).or_default() += 1;
        state.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }
}
