use crate::collector::CompiledPattern;
use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default character budget per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

const DEFAULT_OUTPUT: &str = "output.md";

/// Configuration for a quickcat run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Glob patterns selecting the files to bundle
    pub patterns: Vec<String>,

    /// Glob patterns whose matches (files or whole directories) are removed
    pub exclude_patterns: Vec<String>,

    /// Match every pattern in all subdirectories as well
    pub recursive: bool,

    /// Invocation root that relative patterns and headers are resolved against
    pub root_dir: PathBuf,

    /// Leave out the built-in preamble
    pub skip_preamble: bool,

    /// Preamble file used instead of the built-in one
    pub preamble_path: Option<PathBuf>,

    /// Character budget per chunk
    pub chunk_size: usize,

    /// Base output path; chunk file names are derived from it
    pub output: PathBuf,

    /// Skip paths ignored by `.gitignore`
    pub respect_gitignore: bool,

    /// Follow symbolic links while walking
    pub follow_links: bool,

    /// Match dotfiles and walk into hidden directories
    pub include_hidden: bool,

    /// Plan chunks without writing anything
    pub dry_run: bool,

    /// Create backups of overwritten chunk files
    pub backup_existing: bool,

    /// Write a JSON manifest next to the chunk files
    pub write_manifest: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use quickcat::Config;
    ///
    /// let config = Config::builder()
    ///     .pattern("*.rs")
    ///     .chunk_size(50_000)
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No pattern was given
    /// - Root directory doesn't exist
    /// - Chunk size is zero
    /// - Output path has no file name
    /// - Preamble file is missing
    /// - A pattern does not compile
    pub fn validate(&self) -> Result<()> {
        if self.patterns.is_empty() {
            return Err(Error::config("at least one file pattern is required"));
        }

        if !self.root_dir.exists() {
            return Err(Error::config(format!(
                "Root directory does not exist: {}",
                self.root_dir.display()
            )));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::config(format!(
                "Root path is not a directory: {}",
                self.root_dir.display()
            )));
        }

        if self.chunk_size == 0 {
            return Err(Error::config("chunk_size must be greater than 0"));
        }

        if self.output.file_name().is_none() {
            return Err(Error::config(format!(
                "Output path has no file name: {}",
                self.output.display()
            )));
        }

        if let Some(ref preamble) = self.preamble_path {
            if !preamble.exists() {
                return Err(Error::config(format!(
                    "Preamble file does not exist: {}",
                    preamble.display()
                )));
            }

            if !preamble.is_file() {
                return Err(Error::config(format!(
                    "Preamble path is not a file: {}",
                    preamble.display()
                )));
            }
        }

        for pattern in self.patterns.iter().chain(&self.exclude_patterns) {
            CompiledPattern::compile(pattern, self.recursive)?;
        }

        Ok(())
    }

    /// Returns the canonical invocation root.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be resolved.
    pub fn resolved_root(&self) -> Result<PathBuf> {
        fs::canonicalize(&self.root_dir).map_err(|e| Error::io(&self.root_dir, e))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            recursive: false,
            root_dir: PathBuf::from("."),
            skip_preamble: false,
            preamble_path: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            output: PathBuf::from(DEFAULT_OUTPUT),
            respect_gitignore: false,
            follow_links: false,
            include_hidden: false,
            dry_run: false,
            backup_existing: false,
            write_manifest: false,
        }
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    patterns: Vec<String>,
    exclude_patterns: Vec<String>,
    recursive: bool,
    root_dir: Option<PathBuf>,
    skip_preamble: bool,
    preamble_path: Option<PathBuf>,
    chunk_size: Option<usize>,
    output: Option<PathBuf>,
    respect_gitignore: bool,
    follow_links: bool,
    include_hidden: bool,
    dry_run: bool,
    backup_existing: bool,
    write_manifest: bool,
}

impl ConfigBuilder {
    /// Adds a file pattern.
    #[must_use]
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    /// Adds several file patterns.
    #[must_use]
    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.patterns.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Adds exclusion patterns.
    #[must_use]
    pub fn exclude_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Enables recursive matching.
    #[must_use]
    pub const fn recursive(mut self, enabled: bool) -> Self {
        self.recursive = enabled;
        self
    }

    /// Sets the invocation root.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Leaves out the built-in preamble.
    #[must_use]
    pub const fn skip_preamble(mut self, enabled: bool) -> Self {
        self.skip_preamble = enabled;
        self
    }

    /// Uses the contents of `path` as preamble.
    ///
    /// Takes precedence over [`skip_preamble`](Self::skip_preamble).
    #[must_use]
    pub fn preamble_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preamble_path = Some(path.into());
        self
    }

    /// Sets the character budget per chunk.
    #[must_use]
    pub const fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Sets the base output path.
    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Honours `.gitignore` while walking.
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

    /// Matches dotfiles and walks into hidden directories.
    #[must_use]
    pub const fn include_hidden(mut self, enabled: bool) -> Self {
        self.include_hidden = enabled;
        self
    }

    /// Enables dry run mode (no file writes).
    #[must_use]
    pub const fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Enables or disables backup creation.
    #[must_use]
    pub const fn backup_existing(mut self, enabled: bool) -> Self {
        self.backup_existing = enabled;
        self
    }

    /// Enables or disables the JSON manifest.
    #[must_use]
    pub const fn write_manifest(mut self, enabled: bool) -> Self {
        self.write_manifest = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// `~` at the start of the root, output and preamble paths is expanded
    /// to the home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let config = Config {
            patterns: self.patterns,
            exclude_patterns: self.exclude_patterns,
            recursive: self.recursive,
            root_dir: self
                .root_dir
                .map_or_else(|| PathBuf::from("."), |p| expand_home(&p)),
            skip_preamble: self.skip_preamble,
            preamble_path: self.preamble_path.as_deref().map(expand_home),
            chunk_size: self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
            output: self
                .output
                .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT), |p| expand_home(&p)),
            respect_gitignore: self.respect_gitignore,
            follow_links: self.follow_links,
            include_hidden: self.include_hidden,
            dry_run: self.dry_run,
            backup_existing: self.backup_existing,
            write_manifest: self.write_manifest,
        };

        config.validate()?;
        Ok(config)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    path.to_str().map_or_else(
        || path.to_path_buf(),
        |s| PathBuf::from(shellexpand::tilde(s).as_ref()),
    )
}
