//! # quickcat
//!
//! Concatenates source files selected by glob patterns into one annotated
//! markdown bundle and splits it into numbered, self-contained parts that
//! can be pasted into an LLM conversation one at a time.
//!
//! ## Features
//!
//! - Glob patterns with optional recursive matching and exclusions
//! - Directory tree of every bundled file
//! - Fence-aware chunking with part and continuation markers
//! - Atomic chunk writes with optional backups and a JSON manifest
//! - Clipboard delivery paced by the operator
//!
//! ## Quick Start
//!
//! ```no_run
//! use quickcat::{Config, Pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .pattern("*.rs")
//!     .recursive(true)
//!     .exclude_patterns(["target/"])
//!     .chunk_size(100_000)
//!     .build()?;
//!
//! Pipeline::new(config)?.run()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Collector**: Expands patterns into an ordered file list
//! 2. **Assembler**: Builds preamble, tree and fenced file blocks
//! 3. **Splitter**: Divides the document into bounded, balanced chunks
//! 4. **Writer**: Persists chunk files
//! 5. **Delivery**: Optionally hands each chunk to a [`DeliverySink`]

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod collector;
mod config;
mod error;
mod file;
mod pipeline;
mod splitter;
mod writer;

pub mod delivery;
pub mod document;
pub mod syntax;
pub mod tree;

pub use collector::Collector;
pub use config::{Config, ConfigBuilder, DEFAULT_CHUNK_SIZE};
pub use delivery::{ClipboardSink, CommandClipboard, DeliverySink, NoPause, StdinPacer};
pub use document::{Assembler, Document, Preamble};
pub use error::{Error, Result};
pub use file::FileEntry;
pub use pipeline::{DeliveryReport, Pipeline, PipelineStats, RunReport};
pub use splitter::{Chunk, Splitter};
pub use writer::{delete_chunk_files, ChunkFile};

#[cfg(feature = "native-clipboard")]
pub use delivery::NativeClipboard;

/// Runs the complete bundling pipeline with the given configuration.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - No file matches the patterns
/// - A chunk file cannot be written
///
/// # Examples
///
/// ```no_run
/// use quickcat::{Config, run};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder()
///     .pattern("src/*.rs")
///     .build()?;
///
/// let report = run(config)?;
/// println!("{} chunks", report.chunks.len());
/// # Ok(())
/// # }
/// ```
pub fn run(config: Config) -> Result<RunReport> {
    Pipeline::new(config)?.run()
}
