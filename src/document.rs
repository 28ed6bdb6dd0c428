//! Bundle document model and assembly.
//!
//! A [`Document`] is an ordered list of lines, each keeping its trailing
//! newline, so rendering the lines back to back reproduces the bundle
//! byte for byte. Lines that introduce a file block are marked as file
//! headers; the splitter uses them for its continuation notices.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::file::FileEntry;
use crate::tree;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error};

/// Markdown code fence delimiter.
pub const FENCE: &str = "```";

/// Prefix of file header lines written by the assembler.
pub const HEADER_PREFIX: &str = "./";

/// Instructional preamble emitted unless skipped or replaced.
pub const BUILTIN_PREAMBLE: &str = include_str!("../templates/preamble.md");

const TREE_HEADING: &str = "\nHere is the directory structure:\n";
const FILES_HEADING: &str = "\nHere are the files:\n\n";

/// Role of a document line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Ordinary text, fence delimiters and file content
    Text,
    /// Path line introducing a file block
    FileHeader,
}

/// A single document line including its line terminator, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    text: String,
    kind: LineKind,
}

impl Line {
    fn new(text: impl Into<String>, kind: LineKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    /// Returns the raw line text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the line's role.
    #[must_use]
    pub const fn kind(&self) -> LineKind {
        self.kind
    }

    /// Returns true for a file header line.
    #[must_use]
    pub fn is_header(&self) -> bool {
        self.kind == LineKind::FileHeader
    }

    /// Length in characters, terminator included.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns true if the line toggles code fence state.
    #[must_use]
    pub fn is_fence(&self) -> bool {
        self.text.trim_start().starts_with(FENCE)
    }

    /// Info string following the fence marker, e.g. `rust` in "```rust".
    #[must_use]
    pub fn fence_tag(&self) -> &str {
        self.text
            .trim_start()
            .strip_prefix(FENCE)
            .map_or("", str::trim_end)
    }
}

/// The assembled bundle as an ordered sequence of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    lines: Vec<Line>,
}

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses existing bundle text.
    ///
    /// Lines starting with `./` outside a code fence are taken as file
    /// headers.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut in_fence = false;
        let lines = split_lines(text)
            .into_iter()
            .map(|piece| {
                let kind = if !in_fence && piece.starts_with(HEADER_PREFIX) {
                    LineKind::FileHeader
                } else {
                    LineKind::Text
                };
                let line = Line::new(piece, kind);
                if line.is_fence() {
                    in_fence = !in_fence;
                }
                line
            })
            .collect();

        Self { lines }
    }

    /// Appends raw text, continuing an unterminated last line first.
    pub fn push_str(&mut self, text: &str) {
        for piece in split_lines(text) {
            match self.lines.last_mut() {
                Some(last) if !last.text.ends_with('\n') => last.text.push_str(piece),
                _ => self.lines.push(Line::new(piece, LineKind::Text)),
            }
        }
    }

    /// Appends a file header line on a line of its own.
    pub fn push_header(&mut self, header: &str) {
        if let Some(last) = self.lines.last_mut() {
            if !last.text.ends_with('\n') {
                last.text.push('\n');
            }
        }
        self.lines.push(Line::new(format!("{header}\n"), LineKind::FileHeader));
    }

    /// Returns the document's lines.
    #[must_use]
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Returns true if the document has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.lines.iter().map(Line::char_len).sum()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.lines.iter().try_for_each(|line| f.write_str(&line.text))
    }
}

/// Splits text into lines that keep their `\n` terminator.
fn split_lines(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;

    for end in memchr::memchr_iter(b'\n', text.as_bytes()) {
        pieces.push(&text[start..=end]);
        start = end + 1;
    }

    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// Where the bundle's introductory text comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Preamble {
    /// The built-in instructional preamble
    #[default]
    BuiltIn,
    /// Raw content of a user-supplied file
    File(PathBuf),
    /// No preamble at all
    None,
}

impl Preamble {
    /// Picks the preamble: an explicit file always wins, `skip_builtin`
    /// only suppresses the built-in text.
    #[must_use]
    pub fn resolve(file: Option<PathBuf>, skip_builtin: bool) -> Self {
        match file {
            Some(path) => Self::File(path),
            None if skip_builtin => Self::None,
            None => Self::BuiltIn,
        }
    }
}

/// Output of [`Assembler::assemble`].
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The assembled document
    pub document: Document,

    /// Files whose content could not be read
    pub unreadable: Vec<PathBuf>,
}

/// Builds the annotated bundle document.
#[derive(Debug, Clone, Default)]
pub struct Assembler {
    preamble: Preamble,
}

impl Assembler {
    /// Creates an assembler with the given preamble source.
    #[must_use]
    pub const fn new(preamble: Preamble) -> Self {
        Self { preamble }
    }

    /// Creates an assembler from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(Preamble::resolve(
            config.preamble_path.clone(),
            config.skip_preamble,
        ))
    }

    /// Assembles preamble, directory tree and file blocks.
    ///
    /// A file that cannot be read is logged and recorded in
    /// [`Assembly::unreadable`]; its header and an empty fenced block are
    /// still emitted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFiles`] if `files` is empty.
    pub fn assemble(&self, files: &[FileEntry]) -> Result<Assembly> {
        if files.is_empty() {
            return Err(Error::no_files(&[]));
        }

        let mut document = Document::new();
        self.write_preamble(&mut document);

        document.push_str(TREE_HEADING);
        document.push_str(&format!("\n{}\n", tree::ROOT_LINE));
        for line in tree::render(files) {
            document.push_str(&line);
            document.push_str("\n");
        }
        document.push_str("\n");

        document.push_str(FILES_HEADING);
        let mut unreadable = Vec::new();
        for file in files {
            document.push_header(&file.header());
            document.push_str("\n");
            document.push_str(&format!("{FENCE}{}\n", file.tag));

            match file.read() {
                Ok(content) => {
                    debug!("Added {} ({} bytes)", file.header(), content.len());
                    document.push_str(&content);
                }
                Err(e) => {
                    error!("Error reading file {}: {}", file.absolute_path.display(), e);
                    unreadable.push(file.absolute_path.clone());
                }
            }

            document.push_str(&format!("\n{FENCE}\n\n"));
        }

        Ok(Assembly {
            document,
            unreadable,
        })
    }

    fn write_preamble(&self, document: &mut Document) {
        match &self.preamble {
            Preamble::BuiltIn => document.push_str(BUILTIN_PREAMBLE),
            Preamble::File(path) => match fs::read_to_string(path) {
                Ok(content) => {
                    document.push_str(&content);
                    document.push_str("\n\n");
                }
                Err(e) => error!("Error reading prompt file {}: {}", path.display(), e),
            },
            Preamble::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::path::Path;

    fn entry(root: &Path, name: &str) -> FileEntry {
        FileEntry::new(root.join(name), root)
    }

    #[test]
    fn test_exact_layout_without_preamble() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.py").write_str("print(1)\n").unwrap();
        let root = temp.path().canonicalize().unwrap();

        let assembly = Assembler::new(Preamble::None)
            .assemble(&[entry(&root, "a.py")])
            .unwrap();

        assert_eq!(
            assembly.document.to_string(),
            "\nHere is the directory structure:\n\n├── ./\n├── a.py\n\n\
             \nHere are the files:\n\n./a.py\n\n```python\nprint(1)\n\n```\n\n"
        );
        assert!(assembly.unreadable.is_empty());
    }

    #[test]
    fn test_builtin_preamble_by_default() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("main.rs").write_str("fn main() {}").unwrap();
        let root = temp.path().canonicalize().unwrap();

        let text = Assembler::default()
            .assemble(&[entry(&root, "main.rs")])
            .unwrap()
            .document
            .to_string();

        assert!(text.starts_with(BUILTIN_PREAMBLE));
        assert!(text.contains("```rust\nfn main() {}\n```\n"));
    }

    #[test]
    fn test_custom_preamble_wins_over_skip() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("prompt.txt").write_str("Review this.").unwrap();
        temp.child("lib.rs").write_str("").unwrap();
        let root = temp.path().canonicalize().unwrap();

        let preamble = Preamble::resolve(Some(root.join("prompt.txt")), true);
        let text = Assembler::new(preamble)
            .assemble(&[entry(&root, "lib.rs")])
            .unwrap()
            .document
            .to_string();

        assert!(text.starts_with("Review this.\n\n\nHere is the directory structure:"));
    }

    #[test]
    fn test_skip_removes_builtin() {
        assert_eq!(Preamble::resolve(None, true), Preamble::None);
        assert_eq!(Preamble::resolve(None, false), Preamble::BuiltIn);
    }

    #[test]
    fn test_unreadable_file_keeps_empty_block() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("gone.rs").write_str("fn gone() {}").unwrap();
        temp.child("kept.rs").write_str("fn kept() {}").unwrap();
        let root = temp.path().canonicalize().unwrap();
        let files = [entry(&root, "gone.rs"), entry(&root, "kept.rs")];

        fs::remove_file(root.join("gone.rs")).unwrap();
        let assembly = Assembler::new(Preamble::None).assemble(&files).unwrap();
        let text = assembly.document.to_string();

        assert!(text.contains("./gone.rs\n\n```rust\n\n```\n\n"));
        assert!(text.contains("./kept.rs\n\n```rust\nfn kept() {}\n```\n\n"));
        assert_eq!(assembly.unreadable, vec![root.join("gone.rs")]);
    }

    #[test]
    fn test_no_files_is_fatal() {
        let result = Assembler::default().assemble(&[]);
        assert!(matches!(result, Err(Error::NoFiles { .. })));
    }

    #[test]
    fn test_headers_are_marked() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/a.rs").write_str("// ./not/a/header\n").unwrap();
        let root = temp.path().canonicalize().unwrap();

        let document = Assembler::new(Preamble::None)
            .assemble(&[entry(&root, "src/a.rs")])
            .unwrap()
            .document;

        let headers: Vec<&str> = document
            .lines()
            .iter()
            .filter(|l| l.is_header())
            .map(Line::text)
            .collect();
        assert_eq!(headers, vec!["./src/a.rs\n"]);
    }

    #[test]
    fn test_parse_detects_headers_outside_fences() {
        let text = "intro\n./a.rs\n\n```rust\n./inside\n```\n./b.rs\n";
        let document = Document::parse(text);

        let headers: Vec<&str> = document
            .lines()
            .iter()
            .filter(|l| l.is_header())
            .map(Line::text)
            .collect();
        assert_eq!(headers, vec!["./a.rs\n", "./b.rs\n"]);
        assert_eq!(document.to_string(), text);
    }

    #[test]
    fn test_push_str_continues_partial_line() {
        let mut document = Document::new();
        document.push_str("no newline");
        document.push_str(" yet\nnext\n");

        assert_eq!(document.lines().len(), 2);
        assert_eq!(document.lines()[0].text(), "no newline yet\n");
    }

    #[test]
    fn test_fence_detection() {
        let document = Document::parse("  ```python\ncode\n```\n");
        let lines = document.lines();

        assert!(lines[0].is_fence());
        assert_eq!(lines[0].fence_tag(), "python");
        assert!(!lines[1].is_fence());
        assert_eq!(lines[2].fence_tag(), "");
    }
}
