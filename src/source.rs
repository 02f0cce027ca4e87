// Resource resolution: turns a configured dataset location into a readable stream

use std::{
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
};

use bytes::{Buf, Bytes};
use dashmap::DashMap;
use tracing::debug;

use crate::error::LoadError;

// Given a location name, hand back something to read the dataset from.
// Missing resources must be reported as LoadError::ResourceNotFound.
pub trait ResourceResolver: Send + Sync + 'static {
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>, LoadError>;
}

// Resolves locations as paths relative to a base directory.
// Absolute locations are used as-is.
#[derive(Debug, Clone)]
pub struct FileSystemResolver {
    base_dir: PathBuf,
}

impl FileSystemResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, location: &str) -> PathBuf {
        self.base_dir.join(location)
    }
}

impl ResourceResolver for FileSystemResolver {
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>, LoadError> {
        let path = self.path_for(location);
        debug!(path = %path.display(), "opening dataset file");

        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(LoadError::ResourceNotFound(path.display().to_string()))
            }
            Err(e) => Err(LoadError::Io(e)),
        }
    }
}

// Datasets held in memory, keyed by location. Useful for embedded data and tests.
#[derive(Debug, Default)]
pub struct InMemoryResolver {
    resources: DashMap<String, Bytes>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(self, location: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(location, data);
        self
    }

    // Returns true if a resource was replaced
    pub fn insert(&self, location: impl Into<String>, data: impl Into<Bytes>) -> bool {
        self.resources.insert(location.into(), data.into()).is_some()
    }

    pub fn remove(&self, location: &str) -> bool {
        self.resources.remove(location).is_some()
    }
}

impl ResourceResolver for InMemoryResolver {
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>, LoadError> {
        // Bytes clones share the buffer, so the guard is released straight away
        let data = self
            .resources
            .get(location)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| LoadError::ResourceNotFound(location.to_string()))?;

        Ok(Box::new(data.reader()))
    }
}
