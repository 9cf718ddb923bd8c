use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::store::repo::ObjectStore;

/// Object store backed by a directory tree: `<root>/<bucket>/<key>`.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(anyhow!("object store root {} is not a directory", root.display()));
        }
        Ok(Self { root })
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let mut path = self.root.clone();
        for segment in [bucket, key] {
            let rel = Path::new(segment);
            let clean = !segment.is_empty()
                && rel
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !clean {
                return Err(anyhow!("refusing object path segment {segment:?}"));
            }
            path.push(rel);
        }
        Ok(path)
    }
}

impl ObjectStore for FsObjectStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        fs::read(&path).with_context(|| format!("reading {}", path.display()))
    }
}
