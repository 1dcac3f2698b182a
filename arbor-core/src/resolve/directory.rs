use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use crate::fs::{FileSystem, FsEntry};

/// Per-scan memo of directory listings.
///
/// One instance lives for exactly one scan; dropping it releases every
/// listing gathered along the way.
#[derive(Debug)]
pub struct DirectoryService {
    fs: Arc<dyn FileSystem>,
    listings: DashMap<PathBuf, Arc<Vec<FsEntry>>>,
}

impl DirectoryService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            listings: DashMap::new(),
        }
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Immediate children of `path`, listed at most once per service.
    pub async fn list(&self, path: &Path) -> io::Result<Arc<Vec<FsEntry>>> {
        if let Some(cached) = self.listings.get(path) {
            return Ok(cached.value().clone());
        }
        let entries = Arc::new(self.fs.read_dir(path).await?);
        self.listings.insert(path.to_path_buf(), entries.clone());
        Ok(entries)
    }

    pub fn invalidate(&self, path: &Path) {
        self.listings.remove(path);
    }

    pub fn cached_listings(&self) -> usize {
        self.listings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;

    #[tokio::test]
    async fn listings_are_memoized_until_invalidated() {
        let fs = Arc::new(InMemoryFs::new());
        fs.add_file("/media/a.mkv", 1);
        let dirs = DirectoryService::new(fs.clone());

        dirs.list(Path::new("/media")).await.unwrap();
        dirs.list(Path::new("/media")).await.unwrap();
        assert_eq!(fs.read_dir_count(), 1);
        assert_eq!(dirs.cached_listings(), 1);

        dirs.invalidate(Path::new("/media"));
        dirs.list(Path::new("/media")).await.unwrap();
        assert_eq!(fs.read_dir_count(), 2);
    }
}
