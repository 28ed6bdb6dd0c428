//! Directory tree rendering for the bundle header.

use crate::file::{path_segments, FileEntry};
use indexmap::IndexSet;

/// Indentation repeated once per depth level below the first.
pub const INDENT: &str = "│   ";

/// Marker placed in front of every segment.
pub const BRANCH: &str = "├── ";

/// Tree line that stands for the invocation root.
pub const ROOT_LINE: &str = "├── ./";

/// Renders one line per unique ancestor segment of `files`.
///
/// Files are walked in the given order, shallow-to-deep within each file.
/// A line is emitted only the first time its exact text appears, so shared
/// directories show up once, at the position of the first file under them.
#[must_use]
pub fn render(files: &[FileEntry]) -> Vec<String> {
    let mut lines = IndexSet::new();

    for file in files {
        let segments = path_segments(file.tree_path());
        for (depth, segment) in segments.iter().enumerate() {
            lines.insert(format!("{}{BRANCH}{segment}", INDENT.repeat(depth)));
        }
    }

    lines.into_iter().collect()
}
