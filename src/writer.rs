use crate::{
    config::Config,
    error::{Error, Result},
    file::FileEntry,
    splitter::Chunk,
};
use serde::Serialize;
use std::{
    ffi::OsStr,
    fs,
    io::Write,
    path::{Path, PathBuf},
    time::SystemTime,
};
use tracing::{debug, info, warn};

/// A chunk persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkFile {
    /// 1-based part number
    pub number: usize,

    /// Where the chunk was written
    pub path: PathBuf,

    /// Rendered size in characters
    pub characters: usize,
}

/// Manifest describing one run's chunk files.
#[derive(Debug, Serialize)]
struct Manifest<'a> {
    generated_at: String,
    total_chunks: usize,
    chunks: Vec<ManifestChunk<'a>>,
    files: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ManifestChunk<'a> {
    number: usize,
    filename: String,
    characters: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    continues: Option<&'a str>,
}

/// Writes chunks to `<dir>/<stem>_chunk_<n><ext>` files with atomic operations.
#[derive(Debug, Clone)]
pub(crate) struct Writer {
    directory: PathBuf,
    stem: String,
    extension: String,
    backup_existing: bool,
}

impl Writer {
    /// Creates a new writer from configuration.
    pub(crate) fn new(config: &Config) -> Self {
        let directory = config
            .output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let stem = config
            .output
            .file_stem()
            .map_or_else(|| "output".to_string(), |s| s.to_string_lossy().into_owned());

        let extension = config
            .output
            .extension()
            .map_or_else(String::new, |e| format!(".{}", e.to_string_lossy()));

        Self {
            directory,
            stem,
            extension,
            backup_existing: config.backup_existing,
        }
    }

    /// Path chunk `number` is written to.
    pub(crate) fn chunk_path(&self, number: usize) -> PathBuf {
        self.directory
            .join(format!("{}_chunk_{}{}", self.stem, number, self.extension))
    }

    /// Path of the JSON manifest.
    pub(crate) fn manifest_path(&self) -> PathBuf {
        self.directory.join(format!("{}_manifest.json", self.stem))
    }

    /// Writes all chunks to output files.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Output directory cannot be created
    /// - File write operations fail
    pub(crate) fn write_chunks(&self, chunks: &[Chunk]) -> Result<Vec<ChunkFile>> {
        fs::create_dir_all(&self.directory).map_err(|e| Error::io(&self.directory, e))?;

        info!(
            "Writing {} chunks to {}",
            chunks.len(),
            self.directory.display()
        );

        let mut written = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            written.push(self.write_chunk(chunk)?);
        }

        info!("Successfully wrote {} chunk files", written.len());
        Ok(written)
    }

    fn write_chunk(&self, chunk: &Chunk) -> Result<ChunkFile> {
        let content = chunk.render();
        let path = self.chunk_path(chunk.number);

        self.write_file_atomic(&path, &content)?;

        let characters = content.chars().count();
        debug!(
            "Wrote chunk {}/{} ({} characters) to {}",
            chunk.number,
            chunk.total,
            characters,
            path.display()
        );

        Ok(ChunkFile {
            number: chunk.number,
            path,
            characters,
        })
    }

    /// Writes a file atomically with optional backup.
    ///
    /// # Process
    ///
    /// 1. Creates backup if file exists and backup is enabled
    /// 2. Writes content to temporary file
    /// 3. Syncs temporary file to disk
    /// 4. Atomically renames temporary file to target path
    fn write_file_atomic(&self, path: &Path, content: &str) -> Result<()> {
        if path.exists() && self.backup_existing {
            backup_file(path)?;
        }

        let temp_path = temp_path(path);
        let mut temp_file = fs::File::create(&temp_path).map_err(|e| Error::io(&temp_path, e))?;

        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| Error::io(&temp_path, e))?;

        temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;

        drop(temp_file);

        fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))?;

        Ok(())
    }

    /// Writes a manifest JSON file listing chunk files and bundled sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest file cannot be written.
    pub(crate) fn write_manifest(
        &self,
        chunks: &[Chunk],
        written: &[ChunkFile],
        sources: &[FileEntry],
    ) -> Result<PathBuf> {
        let manifest = Manifest {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total_chunks: written.len(),
            chunks: written
                .iter()
                .zip(chunks)
                .map(|(file, chunk)| ManifestChunk {
                    number: file.number,
                    filename: file
                        .path
                        .file_name()
                        .map_or_else(String::new, |n| n.to_string_lossy().into_owned()),
                    characters: file.characters,
                    continues: chunk.continued_file(),
                })
                .collect(),
            files: sources.iter().map(FileEntry::header).collect(),
        };

        let path = self.manifest_path();
        let json = serde_json::to_string_pretty(&manifest)?;
        self.write_file_atomic(&path, &json)?;

        info!("Wrote manifest to {}", path.display());
        Ok(path)
    }
}

/// Sibling of `path` with `.tmp` appended to the whole file name.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsStr::to_os_string).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Creates a timestamped backup of an existing file.
fn backup_file(path: &Path) -> Result<()> {
    let timestamp = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)?
        .as_nanos();

    let filename = path
        .file_name()
        .ok_or_else(|| Error::config("Invalid file path"))?
        .to_string_lossy();

    let backup_name = format!("{filename}.backup.{timestamp}");
    let backup_path = path
        .parent()
        .ok_or_else(|| Error::config("Invalid file path"))?
        .join(backup_name);

    fs::copy(path, &backup_path).map_err(|e| Error::io(&backup_path, e))?;

    debug!("Created backup: {}", backup_path.display());
    Ok(())
}

/// Removes chunk files, logging failures, and returns how many were removed.
pub fn delete_chunk_files(files: &[ChunkFile]) -> usize {
    let mut removed = 0;

    for file in files {
        match fs::remove_file(&file.path) {
            Ok(()) => {
                debug!("Deleted {}", file.path.display());
                removed += 1;
            }
            Err(e) => warn!("Failed to delete {}: {}", file.path.display(), e),
        }
    }

    if removed > 0 {
        info!("Deleted {} chunk files", removed);
    }

    removed
}
