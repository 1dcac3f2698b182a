//! File-system capability consumed by the resolver pipeline and the library
//! manager, with a `tokio::fs` implementation and an in-memory double.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Extension of shortcut files: a plain-text file holding the target path.
pub const SHORTCUT_EXTENSION: &str = "mblink";

/// Lightweight description of one file-system entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    /// The entry itself is a symbolic link; `is_dir` and `len` describe
    /// its target
    pub is_symlink: bool,
    pub len: u64,
    /// `false` for shortcut targets that could not be inspected
    pub exists: bool,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl FsEntry {
    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
            is_symlink: false,
            len: 0,
            exists: true,
            created: None,
            modified: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>, len: u64) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
            is_symlink: false,
            len,
            exists: true,
            created: None,
            modified: None,
        }
    }

    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
    }

    pub fn extension_lower(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
    }
}

/// Minimal, async-capable filesystem abstraction used by resolvers and the
/// library manager.
#[async_trait]
pub trait FileSystem: Send + Sync + fmt::Debug {
    /// Check whether a path exists.
    async fn path_exists(&self, path: &Path) -> bool;

    /// Fetch lightweight metadata, following links.
    async fn metadata(&self, path: &Path) -> io::Result<FsEntry>;

    /// List the immediate children of a directory.
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>>;

    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()>;

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Target of a shortcut file or symbolic link, `None` when the
    /// shortcut is empty. Link targets may be relative to the link.
    async fn resolve_shortcut(
        &self,
        path: &Path,
    ) -> io::Result<Option<PathBuf>>;

    fn is_shortcut(&self, path: &Path) -> bool {
        path.extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(SHORTCUT_EXTENSION))
    }

    fn normalize_path(&self, path: &Path) -> PathBuf {
        normalize_path(path)
    }

    fn valid_filename(&self, name: &str) -> String {
        valid_filename(name)
    }
}

/// Lexically normalize a path: drop `.` components and resolve `..` where
/// possible. Trailing separators disappear as a side effect.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Replace characters that are invalid in file names on any mainstream
/// platform and trim the result.
pub fn valid_filename(name: &str) -> String {
    const INVALID: &[char] =
        &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
    name.chars()
        .map(|c| {
            if INVALID.contains(&c) || c.is_control() {
                ' '
            } else {
                c
            }
        })
        .collect::<String>()
        .trim()
        .trim_end_matches('.')
        .trim()
        .to_string()
}

fn lowered_components(path: &Path) -> Vec<String> {
    normalize_path(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_lowercase())
        .collect()
}

/// Case-insensitive, component-wise "`path` is `parent` or lies below it".
pub fn is_same_or_sub_path(parent: &Path, path: &Path) -> bool {
    let parent = lowered_components(parent);
    let path = lowered_components(path);
    !parent.is_empty()
        && path.len() >= parent.len()
        && path[..parent.len()] == parent[..]
}

/// Case-insensitive, component-wise "`path` lies strictly below `parent`".
pub fn contains_sub_path(parent: &Path, path: &Path) -> bool {
    let parent = lowered_components(parent);
    let path = lowered_components(path);
    !parent.is_empty()
        && path.len() > parent.len()
        && path[..parent.len()] == parent[..]
}

/// Case-insensitive path equality after normalization.
pub fn paths_equal(a: &Path, b: &Path) -> bool {
    lowered_components(a) == lowered_components(b)
}

fn to_utc(time: io::Result<std::time::SystemTime>) -> Option<DateTime<Utc>> {
    time.ok().map(DateTime::<Utc>::from)
}

/// Real filesystem implementation backed by tokio::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }

    fn entry_from(path: PathBuf, md: &std::fs::Metadata) -> FsEntry {
        FsEntry {
            path,
            is_dir: md.is_dir(),
            is_symlink: false,
            len: md.len(),
            exists: true,
            created: to_utc(md.created()),
            modified: to_utc(md.modified()),
        }
    }
}

#[async_trait]
impl FileSystem for RealFs {
    async fn path_exists(&self, path: &Path) -> bool {
        // try_exists avoids errors for permission issues by returning false
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn metadata(&self, path: &Path) -> io::Result<FsEntry> {
        let md = tokio::fs::metadata(path).await?;
        Ok(Self::entry_from(path.to_path_buf(), &md))
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        let mut rd = tokio::fs::read_dir(path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            let entry_path = entry.path();
            let is_symlink = entry
                .file_type()
                .await
                .is_ok_and(|file_type| file_type.is_symlink());
            // Follow links; broken links are skipped rather than failing
            // the whole listing.
            match tokio::fs::metadata(&entry_path).await {
                Ok(md) => {
                    let mut fs_entry = Self::entry_from(entry_path, &md);
                    fs_entry.is_symlink = is_symlink;
                    entries.push(fs_entry);
                }
                Err(err) => tracing::debug!(
                    path = %entry_path.display(),
                    "skipping unreadable entry: {err}"
                ),
            }
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(path).await
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        tokio::fs::write(path, contents).await
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_dir_all(path).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    async fn resolve_shortcut(
        &self,
        path: &Path,
    ) -> io::Result<Option<PathBuf>> {
        if self.is_shortcut(path) {
            let raw = tokio::fs::read_to_string(path).await?;
            let target = raw.trim();
            return Ok((!target.is_empty()).then(|| PathBuf::from(target)));
        }
        match tokio::fs::read_link(path).await {
            Ok(target) => Ok(Some(target)),
            Err(err) if err.kind() == io::ErrorKind::InvalidInput => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// In-memory filesystem for tests.
/// Paths are treated literally; callers should use consistent absolute
/// paths.
#[derive(Debug, Default)]
pub struct InMemoryFs {
    nodes: RwLock<HashMap<PathBuf, Node>>,
    denied_removals: RwLock<HashSet<PathBuf>>,
    read_dir_calls: AtomicUsize,
    listed: Mutex<Vec<PathBuf>>,
}

#[derive(Debug, Clone)]
enum Node {
    Dir {
        children: Vec<PathBuf>,
        modified: DateTime<Utc>,
    },
    File {
        len: u64,
        contents: String,
        modified: DateTime<Utc>,
    },
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dir<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        let mut nodes = self.nodes.write();
        Self::insert_dir(&mut nodes, &path);
    }

    pub fn add_file<P: Into<PathBuf>>(&self, path: P, len: u64) {
        self.put_file(path.into(), len, String::new());
    }

    /// Add a `.mblink` shortcut whose content points at `target`.
    pub fn add_shortcut<P: Into<PathBuf>, T: AsRef<Path>>(
        &self,
        path: P,
        target: T,
    ) {
        let contents = target.as_ref().to_string_lossy().to_string();
        self.put_file(path.into(), contents.len() as u64, contents);
    }

    /// Update a node's modification time.
    pub fn touch<P: AsRef<Path>>(&self, path: P, at: DateTime<Utc>) {
        if let Some(node) = self.nodes.write().get_mut(path.as_ref()) {
            match node {
                Node::Dir { modified, .. } | Node::File { modified, .. } => {
                    *modified = at
                }
            }
        }
    }

    /// Remove a node and everything below it.
    pub fn remove<P: AsRef<Path>>(&self, path: P) {
        let mut nodes = self.nodes.write();
        Self::remove_tree(&mut nodes, path.as_ref());
    }

    /// Make every later removal of `path` fail with `PermissionDenied`.
    pub fn deny_removal<P: Into<PathBuf>>(&self, path: P) {
        self.denied_removals.write().insert(path.into());
    }

    /// Number of directory listings served so far.
    pub fn read_dir_count(&self) -> usize {
        self.read_dir_calls.load(Ordering::SeqCst)
    }

    /// Paths listed so far, in call order.
    pub fn listed_paths(&self) -> Vec<PathBuf> {
        self.listed.lock().clone()
    }

    fn put_file(&self, path: PathBuf, len: u64, contents: String) {
        let mut nodes = self.nodes.write();
        Self::ensure_parent_link(&mut nodes, &path);
        nodes.insert(
            path,
            Node::File {
                len,
                contents,
                modified: Utc::now(),
            },
        );
    }

    fn insert_dir(nodes: &mut HashMap<PathBuf, Node>, path: &Path) {
        if nodes.contains_key(path) {
            return;
        }
        Self::ensure_parent_link(nodes, path);
        nodes.insert(
            path.to_path_buf(),
            Node::Dir {
                children: Vec::new(),
                modified: Utc::now(),
            },
        );
    }

    fn ensure_parent_link(nodes: &mut HashMap<PathBuf, Node>, path: &Path) {
        if let Some(parent) = path.parent() {
            if parent.as_os_str().is_empty() {
                return;
            }
            // Ensure parent directory exists
            if !nodes.contains_key(parent) {
                Self::insert_dir(nodes, parent);
            }
            // Link child into parent
            if let Some(Node::Dir { children, .. }) = nodes.get_mut(parent)
                && !children.iter().any(|p| p.as_path() == path)
            {
                children.push(path.to_path_buf());
            }
        }
    }

    fn remove_tree(nodes: &mut HashMap<PathBuf, Node>, path: &Path) {
        if let Some(Node::Dir { children, .. }) = nodes.remove(path) {
            for child in children {
                Self::remove_tree(nodes, &child);
            }
        }
        if let Some(parent) = path.parent()
            && let Some(Node::Dir { children, .. }) = nodes.get_mut(parent)
        {
            children.retain(|p| p.as_path() != path);
        }
    }

    fn entry(path: &Path, node: &Node) -> FsEntry {
        match node {
            Node::Dir { modified, .. } => FsEntry {
                path: path.to_path_buf(),
                is_dir: true,
                is_symlink: false,
                len: 0,
                exists: true,
                created: Some(*modified),
                modified: Some(*modified),
            },
            Node::File { len, modified, .. } => FsEntry {
                path: path.to_path_buf(),
                is_dir: false,
                is_symlink: false,
                len: *len,
                exists: true,
                created: Some(*modified),
                modified: Some(*modified),
            },
        }
    }

    fn check_removal(&self, path: &Path) -> io::Result<()> {
        if self.denied_removals.read().contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("removal denied: {}", path.display()),
            ));
        }
        Ok(())
    }

    fn missing(path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("missing path: {}", path.display()),
        )
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn path_exists(&self, path: &Path) -> bool {
        self.nodes.read().contains_key(path)
    }

    async fn metadata(&self, path: &Path) -> io::Result<FsEntry> {
        self.nodes
            .read()
            .get(path)
            .map(|node| Self::entry(path, node))
            .ok_or_else(|| Self::missing(path))
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<FsEntry>> {
        self.read_dir_calls.fetch_add(1, Ordering::SeqCst);
        self.listed.lock().push(path.to_path_buf());
        let nodes = self.nodes.read();
        match nodes.get(path) {
            Some(Node::Dir { children, .. }) => Ok(children
                .iter()
                .filter_map(|child| {
                    nodes.get(child).map(|node| Self::entry(child, node))
                })
                .collect()),
            Some(Node::File { .. }) => Err(io::Error::other(format!(
                "read_dir on file: {}",
                path.display()
            ))),
            None => Err(Self::missing(path)),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.add_dir(path);
        Ok(())
    }

    async fn write_file(&self, path: &Path, contents: &str) -> io::Result<()> {
        self.put_file(
            path.to_path_buf(),
            contents.len() as u64,
            contents.to_string(),
        );
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check_removal(path)?;
        match self.nodes.read().get(path) {
            Some(Node::Dir { .. }) => {}
            Some(Node::File { .. }) => {
                return Err(io::Error::other(format!(
                    "not a directory: {}",
                    path.display()
                )));
            }
            None => return Err(Self::missing(path)),
        }
        self.remove(path);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.check_removal(path)?;
        if !matches!(self.nodes.read().get(path), Some(Node::File { .. })) {
            return Err(Self::missing(path));
        }
        self.remove(path);
        Ok(())
    }

    async fn resolve_shortcut(
        &self,
        path: &Path,
    ) -> io::Result<Option<PathBuf>> {
        match self.nodes.read().get(path) {
            Some(Node::File { contents, .. }) => {
                let target = contents.trim();
                Ok((!target.is_empty()).then(|| PathBuf::from(target)))
            }
            Some(Node::Dir { .. }) => Ok(None),
            None => Err(Self::missing(path)),
        }
    }
}
