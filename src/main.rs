use anyhow::Context;
use clap::Parser;
use quickcat::{
    ClipboardSink, Config, DeliverySink, NoPause, Pipeline, RunReport, StdinPacer,
    DEFAULT_CHUNK_SIZE,
};
use std::fs::File;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "quickcat",
    version,
    author,
    about = "Bundle source files into chunked markdown for LLM conversations",
    long_about = "Concatenate files matching glob patterns into one markdown bundle with a \
    preamble, a directory tree and fenced code blocks, then split it into numbered parts \
    that fit a size budget.\n\n\
    USAGE EXAMPLES:\n  \
      # Bundle every Python file below the current directory\n  \
      quickcat -r '*.py'\n\n  \
      # Skip migrations and copy the parts to the clipboard\n  \
      quickcat -r '*.py' -x './migrations/' --copy\n\n  \
      # Use your own prompt and smaller parts\n  \
      quickcat 'src/**/*.rs' -p prompt.txt --chunk-size 50000"
)]
struct Cli {
    /// File patterns to bundle (e.g. '*.py', 'src/**/*.rs')
    #[arg(required = true, value_name = "PATTERNS")]
    patterns: Vec<String>,

    /// Base output file; parts are written as <stem>_chunk_<n><ext>
    #[arg(short, long, default_value = "output.md", value_name = "FILE")]
    output: PathBuf,

    /// Leave out the built-in preamble
    #[arg(short, long)]
    skip_prompt: bool,

    /// Use the contents of this file as preamble
    #[arg(short, long, value_name = "FILE")]
    prompt_file: Option<PathBuf>,

    /// Copy the parts to the clipboard without asking
    #[arg(short, long)]
    copy: bool,

    /// Match patterns in all subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Patterns to exclude; a matched directory excludes everything below it
    #[arg(short = 'x', long, num_args = 1.., value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Maximum characters per part
    #[arg(long, env = "QUICKCAT_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Delete the part files after copying without asking
    #[arg(short, long)]
    delete_chunks: bool,

    /// Directory relative patterns and headers are resolved against
    #[arg(long, default_value = ".", value_name = "DIR")]
    root: PathBuf,

    /// Skip files ignored by .gitignore
    #[arg(long)]
    gitignore: bool,

    /// Follow symbolic links while walking
    #[arg(long)]
    follow_links: bool,

    /// Match dotfiles and walk into hidden directories
    #[arg(long)]
    hidden: bool,

    /// Plan the parts without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Write <stem>_manifest.json next to the parts
    #[arg(long)]
    manifest: bool,

    /// Back up part files that would be overwritten
    #[arg(long)]
    backup: bool,

    /// Print run statistics as JSON instead of the summary box
    #[arg(long)]
    stats_json: bool,

    /// Never ask questions
    #[arg(short, long)]
    non_interactive: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write log output to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut builder = Config::builder()
        .patterns(cli.patterns)
        .exclude_patterns(cli.exclude)
        .recursive(cli.recursive)
        .root_dir(cli.root)
        .skip_preamble(cli.skip_prompt)
        .chunk_size(cli.chunk_size)
        .output(cli.output)
        .respect_gitignore(cli.gitignore)
        .follow_links(cli.follow_links)
        .include_hidden(cli.hidden)
        .dry_run(cli.dry_run)
        .backup_existing(cli.backup)
        .write_manifest(cli.manifest);

    if let Some(prompt_file) = cli.prompt_file {
        builder = builder.preamble_path(prompt_file);
    }

    let config = builder.build().context("Failed to build configuration")?;

    let report = Pipeline::new(config)
        .context("Failed to create pipeline")?
        .run()
        .context("Pipeline execution failed")?;

    if cli.stats_json {
        let json = serde_json::to_string_pretty(&report.stats)
            .context("Failed to serialize statistics")?;
        println!("{json}");
    } else {
        report.stats.print_summary();
    }

    if cli.dry_run {
        return Ok(());
    }

    let interactive = !cli.non_interactive && io::stdin().is_terminal();

    let copy = cli.copy
        || (interactive && ask("Do you want to copy the contents to the clipboard? ([y]es/no)")?);
    if !copy {
        return Ok(());
    }

    if !deliver(&report, interactive) {
        return Ok(());
    }

    let delete = cli.delete_chunks
        || (interactive && ask("Do you want to delete the chunk files? ([y]es/no)")?);
    if delete {
        let removed = report.delete_chunk_files();
        info!("Removed {} of {} chunk files", removed, report.files.len());
    }

    Ok(())
}

/// Copies every chunk; returns true when all of them made it.
fn deliver(report: &RunReport, paced: bool) -> bool {
    let mut sink = match clipboard_sink(paced) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Clipboard unavailable: {e}");
            return false;
        }
    };

    let delivery = report.deliver(sink.as_mut());
    if delivery.failed > 0 {
        warn!(
            "{} chunk(s) could not be copied; keeping chunk files",
            delivery.failed
        );
        return false;
    }

    info!("Copied {} chunks to the clipboard", delivery.delivered);
    true
}

fn clipboard_sink(paced: bool) -> quickcat::Result<Box<dyn DeliverySink>> {
    let clipboard = new_clipboard()?;
    Ok(if paced {
        Box::new(ClipboardSink::new(clipboard, StdinPacer))
    } else {
        Box::new(ClipboardSink::new(clipboard, NoPause))
    })
}

#[cfg(not(feature = "native-clipboard"))]
fn new_clipboard() -> quickcat::Result<quickcat::CommandClipboard> {
    quickcat::CommandClipboard::detect()
}

#[cfg(feature = "native-clipboard")]
fn new_clipboard() -> quickcat::Result<quickcat::NativeClipboard> {
    quickcat::NativeClipboard::new()
}

/// Asks a yes/no question on the terminal; an empty answer means yes.
fn ask(question: &str) -> anyhow::Result<bool> {
    print!("{question} ");
    io::stdout().flush().context("Failed to write prompt")?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;

    let answer = answer.trim().to_lowercase();
    Ok(answer.is_empty() || answer == "y" || answer == "yes")
}

fn setup_tracing(verbosity: u8, log_file: Option<&Path>) -> anyhow::Result<()> {
    let default_filter = match verbosity {
        0 => "quickcat=info",
        1 => "quickcat=debug",
        _ => "quickcat=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let file_layer = log_file
        .map(|path| {
            File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))
                .map(|file| {
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(Mutex::new(file))
                })
        })
        .transpose()?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}
