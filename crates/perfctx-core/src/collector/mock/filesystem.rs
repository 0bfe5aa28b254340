//! In-memory `/proc` and `/sys` for counter-reader tests.
//!
//! A test can rewrite a counter file between two reads to simulate counters
//! advancing, wrapping or devices disappearing.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::collector::traits::FileSystem;

/// Counter files keyed by absolute path, plus the directories that hold them.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
}

fn not_found(kind: &str, path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no such {kind}: {}", path.display()),
    )
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `content` at `path`, replacing any previous content. Missing
    /// ancestors are registered as directories.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref();
        self.register_ancestors(path);
        self.files.insert(path.to_path_buf(), content.into());
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.register_ancestors(path);
        self.dirs.insert(path.to_path_buf());
    }

    /// Removes a file, as if a device or sensor vanished.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    fn register_ancestors(&mut self, path: &Path) {
        self.dirs.extend(
            path.ancestors()
                .skip(1)
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf),
        );
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| not_found("file", path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.dirs.contains(path)
    }

    /// Direct children, files and directories alike, sorted by path.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.dirs.contains(path) {
            return Err(not_found("directory", path));
        }
        let children: BTreeSet<&PathBuf> = self
            .files
            .keys()
            .chain(self.dirs.iter())
            .filter(|p| p.parent() == Some(path))
            .collect();
        Ok(children.into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_file_registers_ancestors() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/thermal/thermal_zone0/temp", "45000\n");

        assert!(fs.exists(Path::new("/sys/class/thermal")));
        assert!(fs.exists(Path::new("/sys")));
        assert_eq!(
            fs.read_to_string(Path::new("/sys/class/thermal/thermal_zone0/temp"))
                .unwrap(),
            "45000\n"
        );
    }

    #[test]
    fn test_replace_and_remove() {
        let mut fs = MockFs::new();
        fs.add_file("/proc/loadavg", "0.10 0.05 0.01 1/100 10\n");
        fs.add_file("/proc/loadavg", "2.00 1.00 0.50 3/120 20\n");
        assert!(
            fs.read_to_string(Path::new("/proc/loadavg"))
                .unwrap()
                .starts_with("2.00")
        );

        fs.remove_file("/proc/loadavg");
        assert!(!fs.exists(Path::new("/proc/loadavg")));
        assert_eq!(
            fs.read_to_string(Path::new("/proc/loadavg")).unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }

    #[test]
    fn test_read_dir_lists_block_devices() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/block/sda/queue/rotational", "1\n");
        fs.add_file("/sys/block/nvme0n1/queue/rotational", "0\n");
        fs.add_dir("/sys/block/loop0");

        let entries = fs.read_dir(Path::new("/sys/block")).unwrap();
        assert_eq!(
            entries,
            vec![
                PathBuf::from("/sys/block/loop0"),
                PathBuf::from("/sys/block/nvme0n1"),
                PathBuf::from("/sys/block/sda"),
            ]
        );
        assert!(fs.read_dir(Path::new("/sys/bus")).is_err());
    }
}
