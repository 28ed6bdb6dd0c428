use crate::error::{Error, Result};
use crate::syntax;
use std::path::{Component, Path, PathBuf};

/// A collected file paired with its display path and fence tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Absolute path to the file
    pub absolute_path: PathBuf,

    /// Path relative to the invocation root, if the file lives under it
    pub relative_path: Option<PathBuf>,

    /// Fence language tag for the file's content
    pub tag: &'static str,
}

impl FileEntry {
    /// Builds an entry for `absolute_path` as seen from `root`.
    #[must_use]
    pub fn new(absolute_path: PathBuf, root: &Path) -> Self {
        let relative_path = absolute_path
            .strip_prefix(root)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(Path::to_path_buf);
        let tag = syntax::tag_for(&absolute_path);

        Self {
            absolute_path,
            relative_path,
            tag,
        }
    }

    /// Returns the path used for the tree, relative when possible.
    #[must_use]
    pub fn tree_path(&self) -> &Path {
        self.relative_path
            .as_deref()
            .unwrap_or(self.absolute_path.as_path())
    }

    /// Returns the header line text introducing this file's block.
    ///
    /// Files under the root render as `./relative/path` with forward
    /// slashes; anything else renders as its absolute path. Those get no
    /// `./` prefix, since `./` before an absolute path would read as a
    /// location inside the root.
    #[must_use]
    pub fn header(&self) -> String {
        match &self.relative_path {
            Some(rel) => format!("./{}", path_segments(rel).join("/")),
            None => self.absolute_path.display().to_string(),
        }
    }

    /// Reads the file's content as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the file cannot be read, or
    /// [`Error::InvalidUtf8`] when the content is not valid UTF-8.
    pub fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.absolute_path).map_err(|e| Error::read(&self.absolute_path, e))
    }
}

/// Splits a path into display segments.
///
/// The root of an absolute path becomes its own `/` segment, so a tree of
/// absolute paths hangs off a single root line.
#[must_use]
pub(crate) fn path_segments(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|component| match component {
            Component::CurDir => None,
            Component::RootDir => Some("/".to_string()),
            Component::Prefix(prefix) => Some(prefix.as_os_str().to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_entry_under_root() {
        let root = Path::new("/work/project");
        let entry = FileEntry::new(PathBuf::from("/work/project/src/main.rs"), root);

        assert_eq!(entry.relative_path, Some(PathBuf::from("src/main.rs")));
        assert_eq!(entry.header(), "./src/main.rs");
        assert_eq!(entry.tag, "rust");
        assert_eq!(entry.tree_path(), Path::new("src/main.rs"));
    }

    #[test]
    fn test_entry_outside_root() {
        let root = Path::new("/work/project");
        let entry = FileEntry::new(PathBuf::from("/etc/hosts"), root);

        assert_eq!(entry.relative_path, None);
        assert_eq!(entry.header(), "/etc/hosts");
        assert!(!entry.header().starts_with("./"));
        assert_eq!(entry.tree_path(), Path::new("/etc/hosts"));
    }

    #[test]
    fn test_path_segments_absolute() {
        assert_eq!(
            path_segments(Path::new("/a/b.txt")),
            vec!["/".to_string(), "a".to_string(), "b.txt".to_string()]
        );
        assert_eq!(
            path_segments(Path::new("./a/b.txt")),
            vec!["a".to_string(), "b.txt".to_string()]
        );
    }

    #[test]
    fn test_read_text_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("notes.md");
        file.write_str("# Notes\n").unwrap();

        let entry = FileEntry::new(file.path().to_path_buf(), temp.path());
        assert_eq!(entry.read().unwrap(), "# Notes\n");
    }

    #[test]
    fn test_read_invalid_utf8() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("blob.txt");
        file.write_binary(&[0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let entry = FileEntry::new(file.path().to_path_buf(), temp.path());
        assert!(matches!(entry.read(), Err(Error::InvalidUtf8 { .. })));
    }

    #[test]
    fn test_read_missing_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let entry = FileEntry::new(temp.path().join("gone.rs"), temp.path());

        assert!(entry.read().unwrap_err().is_io());
    }
}
