//! Filesystem seam for the counter readers.
//!
//! Everything under `/proc` and `/sys` is read through [`FileSystem`], so the
//! same readers run against the live kernel or a `MockFs` tree.

use std::io;
use std::path::{Path, PathBuf};

/// Read-only view of the pseudo-filesystems the counter readers consume.
///
/// No caching: every call observes the current counter values.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;

    /// Full paths of the direct children of `path`, sorted.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// File names of the direct children of `path`, sorted. Names that are
    /// not valid UTF-8 are skipped; no kernel device name needs them.
    fn child_names(&self, path: &Path) -> io::Result<Vec<String>> {
        Ok(self
            .read_dir(path)?
            .iter()
            .filter_map(|p| p.file_name()?.to_str().map(str::to_string))
            .collect())
    }
}

/// The live filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sys_block_fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for dev in ["sda", "nvme0n1", "loop0"] {
            fs::create_dir_all(dir.path().join(dev).join("queue")).unwrap();
        }
        fs::write(dir.path().join("sda/queue/rotational"), "1\n").unwrap();
        dir
    }

    #[test]
    fn test_real_fs_reads_counter_file() {
        let dir = sys_block_fixture();
        let fs = RealFs::new();
        let path = dir.path().join("sda/queue/rotational");
        assert!(fs.exists(&path));
        assert_eq!(fs.read_to_string(&path).unwrap(), "1\n");
        assert!(!fs.exists(&dir.path().join("sdb")));
        assert!(fs.read_to_string(&dir.path().join("sdb/queue/rotational")).is_err());
    }

    #[test]
    fn test_real_fs_read_dir_is_sorted() {
        let dir = sys_block_fixture();
        let fs = RealFs::new();
        let entries = fs.read_dir(dir.path()).unwrap();
        assert_eq!(
            entries,
            vec![
                dir.path().join("loop0"),
                dir.path().join("nvme0n1"),
                dir.path().join("sda"),
            ]
        );
    }

    #[test]
    fn test_child_names() {
        let dir = sys_block_fixture();
        let names = RealFs::new().child_names(dir.path()).unwrap();
        assert_eq!(names, vec!["loop0", "nvme0n1", "sda"]);
        assert!(RealFs::new().child_names(&dir.path().join("missing")).is_err());
    }
}
