//! Glob pattern expansion into an ordered, deduplicated file list.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::file::path_segments;
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use indexmap::IndexSet;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// A pattern split into the directory to walk and the glob to match below it.
#[derive(Debug)]
pub(crate) struct CompiledPattern {
    source: String,
    absolute: bool,
    prefix: Vec<String>,
    rest: Option<GlobMatcher>,
    max_depth: Option<usize>,
}

impl CompiledPattern {
    /// Parses `pattern`, applying recursive expansion when requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] if the glob part does not compile.
    pub(crate) fn compile(pattern: &str, recursive: bool) -> Result<Self> {
        let expanded = shellexpand::tilde(pattern);
        let absolute = Path::new(expanded.as_ref()).is_absolute();

        let components = split_components(&expanded);

        if components.is_empty() && !absolute {
            return Err(Error::invalid_pattern(pattern, "pattern selects no path"));
        }

        let literal_len = components
            .iter()
            .take_while(|part| !part.contains(GLOB_META))
            .count();

        let (prefix, mut rest) = if recursive && !absolute {
            (Vec::new(), components)
        } else {
            let rest = components[literal_len..].to_vec();
            (components[..literal_len].to_vec(), rest)
        };

        if recursive {
            rest.insert(0, "**".to_string());
        }

        let max_depth = if rest.iter().any(|part| part == "**") {
            None
        } else {
            Some(rest.len())
        };

        let rest = if rest.is_empty() {
            None
        } else {
            let glob = rest.join("/");
            let matcher = GlobBuilder::new(&glob)
                .literal_separator(true)
                .build()
                .map_err(|e| Error::invalid_pattern(pattern, e.to_string()))?
                .compile_matcher();
            Some(matcher)
        };

        Ok(Self {
            source: pattern.to_string(),
            absolute,
            prefix,
            rest,
            max_depth,
        })
    }

    /// Directory (or literal path) the pattern is anchored at.
    fn base(&self, root: &Path) -> PathBuf {
        if !self.absolute {
            let mut base = root.to_path_buf();
            base.extend(&self.prefix);
            return base;
        }

        let mut parts = self.prefix.iter();
        let mut base = match parts.next() {
            // A drive such as `C:` needs its separator to stay absolute.
            Some(drive) if cfg!(windows) => PathBuf::from(format!("{drive}\\")),
            Some(first) => Path::new("/").join(first),
            None => PathBuf::from("/"),
        };
        base.extend(parts);
        base
    }
}

/// Splits a pattern into path components, dropping empty and `.` parts.
///
/// Patterns use `/` as separator; on Windows `\` is accepted as well.
fn split_components(pattern: &str) -> Vec<String> {
    pattern
        .split(|c: char| c == '/' || (cfg!(windows) && c == '\\'))
        .filter(|part| !part.is_empty() && *part != ".")
        .map(str::to_string)
        .collect()
}

/// Resolves file patterns against the filesystem.
#[derive(Debug, Clone)]
pub struct Collector {
    root: PathBuf,
    recursive: bool,
    respect_gitignore: bool,
    follow_links: bool,
    include_hidden: bool,
}

impl Collector {
    /// Creates a collector anchored at `root` with default options.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            respect_gitignore: false,
            follow_links: false,
            include_hidden: false,
        }
    }

    /// Creates a collector using the walk options from `config`.
    #[must_use]
    pub fn from_config(config: &Config, root: impl Into<PathBuf>) -> Self {
        Self::new(root)
            .recursive(config.recursive)
            .respect_gitignore(config.respect_gitignore)
            .follow_links(config.follow_links)
            .include_hidden(config.include_hidden)
    }

    /// Matches patterns in every subdirectory as well.
    #[must_use]
    pub const fn recursive(mut self, enabled: bool) -> Self {
        self.recursive = enabled;
        self
    }

    /// Skips paths ignored by `.gitignore` and friends.
    #[must_use]
    pub const fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.respect_gitignore = enabled;
        self
    }

    /// Follows symbolic links while walking.
    #[must_use]
    pub const fn follow_links(mut self, enabled: bool) -> Self {
        self.follow_links = enabled;
        self
    }

    /// Matches names starting with `.` and descends into hidden directories.
    ///
    /// Off by default, so `*` and `**` pass over dotfiles like shell globs.
    #[must_use]
    pub const fn include_hidden(mut self, enabled: bool) -> Self {
        self.include_hidden = enabled;
        self
    }

    /// Expands `patterns`, removes everything matched by `exclude_patterns`
    /// and returns resolved absolute paths in first-seen order.
    ///
    /// A path is excluded when it equals a resolved exclude match or lies
    /// under an excluded directory. Patterns matching nothing are fine; an
    /// empty result is the caller's decision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for a pattern that does not compile.
    pub fn collect(&self, patterns: &[String], exclude_patterns: &[String]) -> Result<Vec<PathBuf>> {
        let mut collected = IndexSet::new();

        for pattern in patterns {
            let compiled = CompiledPattern::compile(pattern, self.recursive)?;
            let matches = self.expand(&compiled, false);
            debug!("Pattern '{}' matched {} files", pattern, matches.len());
            collected.extend(matches);
        }

        let mut excluded = HashSet::new();
        for pattern in exclude_patterns {
            let compiled = CompiledPattern::compile(pattern, self.recursive)?;
            excluded.extend(self.expand(&compiled, true));
        }

        if !excluded.is_empty() {
            let excluded_dirs: Vec<&PathBuf> = excluded.iter().filter(|p| p.is_dir()).collect();
            collected.retain(|path: &PathBuf| {
                let keep = !excluded.contains(path)
                    && !excluded_dirs.iter().any(|dir| path.starts_with(dir));
                if !keep {
                    trace!("Excluded: {}", path.display());
                }
                keep
            });
        }

        debug!("Collected {} files", collected.len());
        Ok(collected.into_iter().collect())
    }

    /// Returns resolved matches of a single compiled pattern in walk order.
    fn expand(&self, pattern: &CompiledPattern, include_dirs: bool) -> Vec<PathBuf> {
        let base = pattern.base(&self.root);

        let Some(matcher) = &pattern.rest else {
            let selected = base.is_file() || (include_dirs && base.is_dir());
            return if selected { vec![resolve(&base)] } else { Vec::new() };
        };

        if !base.is_dir() {
            trace!("Pattern '{}' base {} is not a directory", pattern.source, base.display());
            return Vec::new();
        }

        let mut builder = WalkBuilder::new(&base);
        builder
            .standard_filters(false)
            .hidden(!self.include_hidden)
            .follow_links(self.follow_links)
            .max_depth(pattern.max_depth)
            .sort_by_file_name(|a, b| a.cmp(b));

        if self.respect_gitignore {
            builder
                .git_ignore(true)
                .git_global(true)
                .git_exclude(true)
                .ignore(true)
                .parents(true)
                .require_git(false);
        }

        let mut matches = Vec::new();
        for result in builder.build() {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    continue;
                }
            };

            if entry.depth() == 0 {
                continue;
            }

            let path = entry.path();
            let selected = path.is_file() || (include_dirs && path.is_dir());
            if !selected {
                continue;
            }

            let Ok(relative) = path.strip_prefix(&base) else {
                continue;
            };

            if matcher.is_match(path_segments(relative).join("/")) {
                trace!("Matched: {}", path.display());
                matches.push(resolve(path));
            }
        }

        matches
    }
}

fn resolve(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn fixture() -> (assert_fs::TempDir, PathBuf) {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.py").write_str("print('a')").unwrap();
        temp.child("b.py").write_str("print('b')").unwrap();
        temp.child("notes.txt").write_str("notes").unwrap();
        temp.child("pkg/c.py").write_str("print('c')").unwrap();
        temp.child("pkg/deep/d.py").write_str("print('d')").unwrap();
        temp.child("migrations/0001.py").write_str("pass").unwrap();
        let root = temp.path().canonicalize().unwrap();
        (temp, root)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_non_recursive_glob() {
        let (_temp, root) = fixture();
        let files = Collector::new(&root).collect(&strings(&["*.py"]), &[]).unwrap();

        assert_eq!(files, vec![root.join("a.py"), root.join("b.py")]);
    }

    #[test]
    fn test_exclusion_precedence() {
        let (_temp, root) = fixture();
        let files = Collector::new(&root)
            .collect(&strings(&["*.py"]), &strings(&["a.py"]))
            .unwrap();

        assert_eq!(files, vec![root.join("b.py")]);
    }

    #[test]
    fn test_recursive_glob() {
        let (_temp, root) = fixture();
        let files = Collector::new(&root)
            .recursive(true)
            .collect(&strings(&["*.py"]), &[])
            .unwrap();

        assert_eq!(files.len(), 5);
        assert!(files.contains(&root.join("pkg/deep/d.py")));
        assert!(files.contains(&root.join("migrations/0001.py")));
    }

    #[test]
    fn test_excluded_directory_prunes_contents() {
        let (_temp, root) = fixture();
        let files = Collector::new(&root)
            .recursive(true)
            .collect(&strings(&["*.py"]), &strings(&["./migrations/"]))
            .unwrap();

        assert_eq!(files.len(), 4);
        assert!(files.iter().all(|f| !f.starts_with(root.join("migrations"))));
    }

    #[test]
    fn test_first_seen_order_and_dedup() {
        let (_temp, root) = fixture();
        let files = Collector::new(&root)
            .collect(&strings(&["b.py", "*.py", "./b.py"]), &[])
            .unwrap();

        assert_eq!(files, vec![root.join("b.py"), root.join("a.py")]);
    }

    #[test]
    fn test_subdirectory_pattern() {
        let (_temp, root) = fixture();
        let files = Collector::new(&root)
            .collect(&strings(&["./pkg/*.py"]), &[])
            .unwrap();

        assert_eq!(files, vec![root.join("pkg/c.py")]);
    }

    #[test]
    fn test_double_star_without_recursive_flag() {
        let (_temp, root) = fixture();
        let files = Collector::new(&root)
            .collect(&strings(&["pkg/**/*.py"]), &[])
            .unwrap();

        assert_eq!(files, vec![root.join("pkg/c.py"), root.join("pkg/deep/d.py")]);
    }

    #[test]
    fn test_absolute_pattern() {
        let (_temp, root) = fixture();
        let pattern = format!("{}/*.txt", root.display());
        let files = Collector::new("/nonexistent-root")
            .collect(&[pattern], &[])
            .unwrap();

        assert_eq!(files, vec![root.join("notes.txt")]);
    }

    #[test]
    fn test_no_matches_is_not_an_error() {
        let (_temp, root) = fixture();
        let files = Collector::new(&root).collect(&strings(&["*.java"]), &[]).unwrap();

        assert!(files.is_empty());
    }

    #[test]
    fn test_hidden_entries_skipped_by_default() {
        let (temp, root) = fixture();
        temp.child(".hidden.py").write_str("secret").unwrap();
        temp.child(".venv/lib/site.py").write_str("vendored").unwrap();

        let flat = Collector::new(&root).collect(&strings(&["*.py"]), &[]).unwrap();
        assert_eq!(flat, vec![root.join("a.py"), root.join("b.py")]);

        let recursive = Collector::new(&root)
            .recursive(true)
            .collect(&strings(&["*.py"]), &[])
            .unwrap();
        assert_eq!(recursive.len(), 5);
        assert!(!recursive.contains(&root.join(".hidden.py")));
        assert!(recursive.iter().all(|f| !f.starts_with(root.join(".venv"))));
    }

    #[test]
    fn test_hidden_entries_included_on_request() {
        let (temp, root) = fixture();
        temp.child(".hidden.py").write_str("secret").unwrap();
        temp.child(".venv/lib/site.py").write_str("vendored").unwrap();

        let files = Collector::new(&root)
            .recursive(true)
            .include_hidden(true)
            .collect(&strings(&["*.py"]), &[])
            .unwrap();

        assert!(files.contains(&root.join(".hidden.py")));
        assert!(files.contains(&root.join(".venv/lib/site.py")));
    }

    #[test]
    fn test_pattern_inside_hidden_directory() {
        let (temp, root) = fixture();
        temp.child(".github/ci.yml").write_str("on: push").unwrap();

        let files = Collector::new(&root)
            .collect(&strings(&[".github/*.yml"]), &[])
            .unwrap();

        assert_eq!(files, vec![root.join(".github/ci.yml")]);
    }

    #[test]
    fn test_split_components() {
        assert_eq!(split_components("./src//*.rs"), strings(&["src", "*.rs"]));
    }

    #[cfg(windows)]
    #[test]
    fn test_split_components_backslash() {
        assert_eq!(split_components("src\\*.rs"), strings(&["src", "*.rs"]));
    }

    #[test]
    fn test_invalid_pattern() {
        let (_temp, root) = fixture();
        let result = Collector::new(&root).collect(&strings(&["src/[.py"]), &[]);

        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }

    #[test]
    fn test_gitignore_respected_when_enabled() {
        let (temp, root) = fixture();
        temp.child(".gitignore").write_str("b.py\n").unwrap();

        let plain = Collector::new(&root).collect(&strings(&["*.py"]), &[]).unwrap();
        assert_eq!(plain.len(), 2);

        let filtered = Collector::new(&root)
            .respect_gitignore(true)
            .collect(&strings(&["*.py"]), &[])
            .unwrap();
        assert_eq!(filtered, vec![root.join("a.py")]);
    }
}
