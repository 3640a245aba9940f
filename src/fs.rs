//! Filesystem capability used by the cache, downloader and launcher.
//!
//! Everything that touches the tool cache goes through [`Filesystem`] so the
//! pipeline can run against [`MemoryFs`] in tests. Production wiring uses
//! [`OsFs`], a thin pass-through to `std::fs`.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// The subset of file metadata the cache needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub is_dir: bool,
    pub mode: u32,
}

/// One child of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub is_dir: bool,
}

pub trait Filesystem: Send + Sync {
    fn metadata(&self, path: &Path) -> io::Result<FileStat>;
    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    /// Create or truncate a file for writing.
    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>>;
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>>;
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()>;

    /// True if `path` exists and is not a directory.
    fn is_file(&self, path: &Path) -> bool {
        self.metadata(path).map(|m| !m.is_dir).unwrap_or(false)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.metadata(path).map(|m| m.is_dir).unwrap_or(false)
    }
}

/// The real operating system filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl Filesystem for OsFs {
    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        let meta = std::fs::metadata(path)?;
        #[cfg(unix)]
        let mode = {
            use std::os::unix::fs::PermissionsExt;
            meta.permissions().mode()
        };
        #[cfg(not(unix))]
        let mode = if meta.permissions().readonly() { 0o444 } else { 0o644 };

        Ok(FileStat {
            len: meta.len(),
            is_dir: meta.is_dir(),
            mode,
        })
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                // Follow symlinks so a linked version dir still counts
                is_dir: entry.path().is_dir(),
            });
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        Ok(Box::new(std::fs::File::create(path)?))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(std::fs::File::open(path)?))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }

    #[cfg(unix)]
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
    }

    #[cfg(not(unix))]
    fn set_mode(&self, path: &Path, _mode: u32) -> io::Result<()> {
        // No executable bit to set; just confirm the file is there
        std::fs::metadata(path).map(|_| ())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { data: Arc<Mutex<Vec<u8>>>, mode: u32 },
}

/// In-memory filesystem for tests.
///
/// Paths are normalised lexically and treated as absolute; the root always
/// exists. Writers share their buffer with the stored node, so bytes are
/// visible as soon as they are written.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    nodes: Arc<Mutex<BTreeMap<PathBuf, Node>>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a whole file, creating parent directories as needed.
    pub fn write_file(&self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>, mode: u32) {
        let path = normalize(path.as_ref());
        let mut nodes = self.lock();
        insert_parents(&mut nodes, &path);
        nodes.insert(
            path,
            Node::File {
                data: Arc::new(Mutex::new(contents.as_ref().to_vec())),
                mode,
            },
        );
    }

    /// Read a whole file, if it exists.
    pub fn read_file(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        match self.lock().get(&normalize(path.as_ref())) {
            Some(Node::File { data, .. }) => Some(lock_data(data).clone()),
            _ => None,
        }
    }

    /// Every file path currently stored, in sorted order.
    pub fn files(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .filter(|(_, node)| matches!(node, Node::File { .. }))
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Node>> {
        self.nodes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn lock_data(data: &Arc<Mutex<Vec<u8>>>) -> MutexGuard<'_, Vec<u8>> {
    data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::from("/");
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    out
}

fn insert_parents(nodes: &mut BTreeMap<PathBuf, Node>, path: &Path) {
    for ancestor in path.ancestors().skip(1) {
        if ancestor.parent().is_none() {
            break;
        }
        nodes.entry(ancestor.to_path_buf()).or_insert(Node::Dir);
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{}: no such file or directory", path.display()),
    )
}

fn parent_is_dir(nodes: &BTreeMap<PathBuf, Node>, path: &Path) -> bool {
    match path.parent() {
        None => true,
        Some(parent) if parent.parent().is_none() => true,
        Some(parent) => matches!(nodes.get(parent), Some(Node::Dir)),
    }
}

struct MemoryWriter {
    data: Arc<Mutex<Vec<u8>>>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock_data(&self.data).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Filesystem for MemoryFs {
    fn metadata(&self, path: &Path) -> io::Result<FileStat> {
        let path = normalize(path);
        if path.parent().is_none() {
            return Ok(FileStat {
                len: 0,
                is_dir: true,
                mode: 0o755,
            });
        }
        match self.lock().get(&path) {
            Some(Node::Dir) => Ok(FileStat {
                len: 0,
                is_dir: true,
                mode: 0o755,
            }),
            Some(Node::File { data, mode }) => Ok(FileStat {
                len: lock_data(data).len() as u64,
                is_dir: false,
                mode: *mode,
            }),
            None => Err(not_found(&path)),
        }
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let path = normalize(path);
        let nodes = self.lock();
        if path.parent().is_some() && !matches!(nodes.get(&path), Some(Node::Dir)) {
            return Err(not_found(&path));
        }
        Ok(nodes
            .iter()
            .filter(|(child, _)| child.parent() == Some(path.as_path()))
            .filter_map(|(child, node)| {
                Some(DirEntry {
                    name: child.file_name()?.to_string_lossy().to_string(),
                    is_dir: matches!(node, Node::Dir),
                })
            })
            .collect())
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.lock();
        for ancestor in path.ancestors() {
            if let Some(Node::File { .. }) = nodes.get(ancestor) {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("{} is a file", ancestor.display()),
                ));
            }
        }
        if path.parent().is_some() {
            insert_parents(&mut nodes, &path);
            nodes.insert(path, Node::Dir);
        }
        Ok(())
    }

    fn create(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let path = normalize(path);
        let mut nodes = self.lock();
        if !parent_is_dir(&nodes, &path) {
            return Err(not_found(&path));
        }
        if let Some(Node::Dir) = nodes.get(&path) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            ));
        }
        let data = Arc::new(Mutex::new(Vec::new()));
        let mode = match nodes.get(&path) {
            Some(Node::File { mode, .. }) => *mode,
            _ => 0o644,
        };
        nodes.insert(
            path,
            Node::File {
                data: Arc::clone(&data),
                mode,
            },
        );
        Ok(Box::new(MemoryWriter { data }))
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        let path = normalize(path);
        match self.lock().get(&path) {
            Some(Node::File { data, .. }) => {
                Ok(Box::new(io::Cursor::new(lock_data(data).clone())))
            }
            _ => Err(not_found(&path)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let from = normalize(from);
        let to = normalize(to);
        let mut nodes = self.lock();
        if !nodes.contains_key(&from) {
            return Err(not_found(&from));
        }
        if !parent_is_dir(&nodes, &to) {
            return Err(not_found(&to));
        }
        let moved: Vec<PathBuf> = nodes
            .keys()
            .filter(|key| key.starts_with(&from))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = nodes.remove(&key) {
                let suffix = key.strip_prefix(&from).unwrap_or(Path::new(""));
                nodes.insert(to.join(suffix), node);
            }
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.lock();
        match nodes.get(&path) {
            Some(Node::File { .. }) => {
                nodes.remove(&path);
                Ok(())
            }
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} is a directory", path.display()),
            )),
            None => Err(not_found(&path)),
        }
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        let path = normalize(path);
        let mut nodes = self.lock();
        if !nodes.contains_key(&path) {
            return Err(not_found(&path));
        }
        nodes.retain(|key, _| !key.starts_with(&path));
        Ok(())
    }

    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        let path = normalize(path);
        match self.lock().get_mut(&path) {
            Some(Node::File { mode: current, .. }) => {
                *current = mode;
                Ok(())
            }
            Some(Node::Dir) => Ok(()),
            None => Err(not_found(&path)),
        }
    }
}
