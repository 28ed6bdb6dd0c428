use crate::{
    collector::Collector,
    config::Config,
    delivery::DeliverySink,
    document::Assembler,
    error::{Error, Result},
    file::FileEntry,
    splitter::{Chunk, Splitter},
    writer::{self, ChunkFile, Writer},
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument, warn};

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Number of files selected by the patterns
    pub files_collected: usize,

    /// Files that could not be read and were bundled empty
    pub unreadable_files: Vec<PathBuf>,

    /// Total number of chunks created
    pub total_chunks: usize,

    /// Size of the assembled document in characters
    pub document_chars: usize,

    /// Largest rendered chunk in characters
    pub max_chunk_chars: usize,

    /// Chunk files on disk (empty in dry run mode)
    pub chunk_files: Vec<PathBuf>,

    /// Manifest path, when one was written
    pub manifest: Option<PathBuf>,

    /// Total execution time
    pub duration: Duration,

    /// Time spent collecting paths
    pub collect_duration: Duration,

    /// Time spent reading files and assembling the document
    pub assemble_duration: Duration,

    /// Time spent splitting
    pub split_duration: Duration,

    /// Time spent writing
    pub write_duration: Duration,
}

impl PipelineStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║                    Run Summary                        ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Files Collected:      {:>8}                        ║",
            self.files_collected
        );
        println!(
            "║   - Unreadable:       {:>8}                        ║",
            self.unreadable_files.len()
        );
        println!("║                                                       ║");
        println!(
            "║ Document Size:        {:>8} chars                  ║",
            self.document_chars
        );
        println!(
            "║ Chunks Created:       {:>8}                        ║",
            self.total_chunks
        );
        println!(
            "║ Largest Chunk:        {:>8} chars                  ║",
            self.max_chunk_chars
        );
        println!("║                                                       ║");
        println!(
            "║ Files Written:        {:>8}                        ║",
            self.chunk_files.len()
        );
        for path in &self.chunk_files {
            println!("║   {}", path.display());
        }
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!(
            "║   - Collecting:       {:>8.2}s                     ║",
            self.collect_duration.as_secs_f64()
        );
        println!(
            "║   - Assembling:       {:>8.2}s                     ║",
            self.assemble_duration.as_secs_f64()
        );
        println!(
            "║   - Splitting:        {:>8.2}s                     ║",
            self.split_duration.as_secs_f64()
        );
        println!(
            "║   - Writing:          {:>8.2}s                     ║",
            self.write_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Outcome of delivering a run's chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Chunks handed over successfully
    pub delivered: usize,

    /// Chunks whose delivery failed
    pub failed: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Run statistics
    pub stats: PipelineStats,

    /// Chunks in part order
    pub chunks: Vec<Chunk>,

    /// Chunk files on disk, in part order
    pub files: Vec<ChunkFile>,
}

impl RunReport {
    /// Delivers every chunk in order.
    ///
    /// A failed chunk is logged and counted; later chunks are still
    /// delivered and the written chunk files are left alone.
    pub fn deliver(&self, sink: &mut dyn DeliverySink) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for chunk in &self.chunks {
            match sink.deliver(chunk) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    error!("Failed to deliver chunk {} of {}: {}", chunk.number, chunk.total, e);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Removes the written chunk files and returns how many were removed.
    #[must_use]
    pub fn delete_chunk_files(&self) -> usize {
        writer::delete_chunk_files(&self.files)
    }
}

/// Orchestrates collect, assemble, split and write.
pub struct Pipeline {
    config: Config,
    root: PathBuf,
    collector: Collector,
    assembler: Assembler,
    splitter: Splitter,
    writer: Writer,
}

impl Pipeline {
    /// Creates a new pipeline with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The root directory cannot be resolved
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let root = config.resolved_root()?;
        let collector = Collector::from_config(&config, &root);
        let assembler = Assembler::from_config(&config);
        let splitter = Splitter::from_config(&config);
        let writer = Writer::new(&config);

        Ok(Self {
            config,
            root,
            collector,
            assembler,
            splitter,
            writer,
        })
    }

    /// Executes the complete pipeline.
    ///
    /// # Process
    ///
    /// 1. **Collect**: Expands the patterns into an ordered file list
    /// 2. **Assemble**: Builds the annotated document
    /// 3. **Split**: Divides the document into bounded chunks
    /// 4. **Write**: Persists chunks to `<stem>_chunk_<n><ext>` files
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoFiles`] if nothing matched, before anything is
    /// written, and an error if writing a chunk fails.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use quickcat::{Config, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder()
    ///     .pattern("src/*.rs")
    ///     .build()?;
    ///
    /// let report = Pipeline::new(config)?.run()?;
    /// report.stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(root_dir = %self.root.display()))]
    pub fn run(self) -> Result<RunReport> {
        let start_time = Instant::now();

        info!("Starting pipeline execution");

        info!("Stage 1/4: Collecting files...");
        let collect_start = Instant::now();
        let paths = self
            .collector
            .collect(&self.config.patterns, &self.config.exclude_patterns)?;
        let collect_duration = collect_start.elapsed();

        if paths.is_empty() {
            return Err(Error::no_files(&self.config.patterns));
        }

        let entries: Vec<FileEntry> = paths
            .into_iter()
            .map(|path| FileEntry::new(path, &self.root))
            .collect();

        info!(
            "✓ Collected {} files in {:.2}s",
            entries.len(),
            collect_duration.as_secs_f64()
        );

        info!("Stage 2/4: Assembling document...");
        let assemble_start = Instant::now();
        let assembly = self.assembler.assemble(&entries)?;
        let assemble_duration = assemble_start.elapsed();

        if !assembly.unreadable.is_empty() {
            warn!(
                "{} file(s) could not be read and were bundled empty",
                assembly.unreadable.len()
            );
        }

        info!("Stage 3/4: Splitting into chunks...");
        let split_start = Instant::now();
        let chunks = self.splitter.split(&assembly.document);
        let split_duration = split_start.elapsed();

        info!(
            "✓ Created {} chunks in {:.2}s",
            chunks.len(),
            split_duration.as_secs_f64()
        );

        let write_start = Instant::now();
        let (files, manifest) = if self.config.dry_run {
            warn!("Dry run mode enabled - skipping file writes");
            self.print_dry_run_summary(&chunks);
            (Vec::new(), None)
        } else {
            info!("Stage 4/4: Writing chunk files...");
            let files = self.writer.write_chunks(&chunks)?;
            let manifest = if self.config.write_manifest {
                Some(self.writer.write_manifest(&chunks, &files, &entries)?)
            } else {
                None
            };
            (files, manifest)
        };
        let write_duration = write_start.elapsed();

        let stats = PipelineStats {
            files_collected: entries.len(),
            unreadable_files: assembly.unreadable,
            total_chunks: chunks.len(),
            document_chars: assembly.document.char_len(),
            max_chunk_chars: chunks
                .iter()
                .map(|c| c.render().chars().count())
                .max()
                .unwrap_or(0),
            chunk_files: files.iter().map(|f| f.path.clone()).collect(),
            manifest,
            duration: start_time.elapsed(),
            collect_duration,
            assemble_duration,
            split_duration,
            write_duration,
        };

        info!(
            "✓ Pipeline completed successfully in {:.2}s",
            stats.duration.as_secs_f64()
        );

        Ok(RunReport {
            stats,
            chunks,
            files,
        })
    }

    /// Prints a summary for dry run mode.
    fn print_dry_run_summary(&self, chunks: &[Chunk]) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║                 Dry Run Summary                       ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!(
            "║ Total chunks:         {:>8}                        ║",
            chunks.len()
        );
        println!("║ Would write:                                          ║");
        for chunk in chunks {
            println!("║   {}", self.writer.chunk_path(chunk.number).display());
        }
        println!("║                                                       ║");
        println!("║ ⚠ No files were written (dry run mode)               ║");
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::fs;

    fn create_test_config(root: &std::path::Path, pattern: &str) -> Config {
        Config::builder()
            .root_dir(root)
            .pattern(pattern)
            .output(root.join("out/output.md"))
            .build()
            .unwrap()
    }

    struct RecordingSink {
        delivered: Vec<usize>,
        fail_on: Option<usize>,
    }

    impl DeliverySink for RecordingSink {
        fn deliver(&mut self, chunk: &Chunk) -> Result<()> {
            if self.fail_on == Some(chunk.number) {
                return Err(Error::delivery("clipboard unavailable"));
            }
            self.delivered.push(chunk.number);
            Ok(())
        }
    }

    #[test]
    fn test_pipeline_basic_execution() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("file1.rs").write_str("fn main() {}").unwrap();
        temp.child("file2.rs").write_str("pub fn test() {}").unwrap();

        let config = create_test_config(temp.path(), "*.rs");
        let report = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(report.stats.files_collected, 2);
        assert_eq!(report.stats.total_chunks, 1);
        assert_eq!(report.stats.chunk_files.len(), 1);

        let written = fs::read_to_string(temp.child("out/output_chunk_1.md").path()).unwrap();
        assert!(written.contains("./file1.rs\n\n```rust\nfn main() {}\n```\n"));
        assert!(written.contains("End of part 1 of 1. This is the final part."));
    }

    #[test]
    fn test_pipeline_splits_large_input() {
        let temp = assert_fs::TempDir::new().unwrap();
        let body = "let x = 1;\n".repeat(500);
        temp.child("big.rs").write_str(&body).unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .pattern("big.rs")
            .skip_preamble(true)
            .chunk_size(1_000)
            .output(temp.path().join("output.md"))
            .write_manifest(true)
            .build()
            .unwrap();
        let report = Pipeline::new(config).unwrap().run().unwrap();

        assert!(report.stats.total_chunks > 1);
        assert_eq!(report.files.len(), report.stats.total_chunks);
        assert!(temp.child("output_manifest.json").exists());

        let last = report.chunks.last().unwrap();
        assert!(last.render().contains(&format!(
            "End of part {0} of {0}. This is the final part.",
            report.stats.total_chunks
        )));
    }

    #[test]
    fn test_pipeline_no_files_writes_nothing() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("notes.txt").write_str("notes").unwrap();

        let config = create_test_config(temp.path(), "*.java");
        let result = Pipeline::new(config).unwrap().run();

        assert!(matches!(result, Err(Error::NoFiles { .. })));
        assert!(!temp.child("out").exists());
    }

    #[test]
    fn test_pipeline_dry_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("file.rs").write_str("fn main() {}").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .pattern("*.rs")
            .output(temp.path().join("out/output.md"))
            .dry_run(true)
            .build()
            .unwrap();

        let report = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(report.stats.total_chunks, 1);
        assert!(report.stats.chunk_files.is_empty());
        assert!(!temp.child("out").exists());
    }

    #[test]
    fn test_pipeline_unreadable_file_continues() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("good.rs").write_str("fn good() {}").unwrap();
        temp.child("bad.rs").write_binary(&[0xff, 0xfe, 0x00, 0x80]).unwrap();

        let config = create_test_config(temp.path(), "*.rs");
        let report = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(report.stats.files_collected, 2);
        assert_eq!(report.stats.unreadable_files.len(), 1);
        let rendered = report.chunks[0].render();
        assert!(rendered.contains("./bad.rs\n\n```rust\n\n```\n"));
        assert!(rendered.contains("fn good() {}"));
    }

    #[test]
    fn test_delivery_failure_does_not_stop_later_chunks() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("big.rs").write_str(&"let y = 2;\n".repeat(300)).unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .pattern("big.rs")
            .skip_preamble(true)
            .chunk_size(1_000)
            .output(temp.path().join("output.md"))
            .build()
            .unwrap();
        let report = Pipeline::new(config).unwrap().run().unwrap();
        let total = report.chunks.len();
        assert!(total >= 3);

        let mut sink = RecordingSink {
            delivered: Vec::new(),
            fail_on: Some(2),
        };
        let delivery = report.deliver(&mut sink);

        assert_eq!(delivery.failed, 1);
        assert_eq!(delivery.delivered, total - 1);
        assert!(!sink.delivered.contains(&2));
        assert!(report.files.iter().all(|f| f.path.exists()));
    }

    #[test]
    fn test_delete_chunk_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.rs").write_str("fn a() {}").unwrap();

        let config = create_test_config(temp.path(), "*.rs");
        let report = Pipeline::new(config).unwrap().run().unwrap();

        assert_eq!(report.delete_chunk_files(), 1);
        assert!(!temp.child("out/output_chunk_1.md").exists());
    }
}
