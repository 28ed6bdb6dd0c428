use crate::{
    config::Config,
    document::{Document, Line, FENCE},
};
use std::fmt::Write as _;
use std::ops::Range;
use tracing::{debug, trace};

/// Context carried into a chunk that continues the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Resume {
    /// Header of the file being continued, if any was seen
    file: Option<String>,
    /// Tag of the fence to re-open, when the boundary fell inside one
    fence_tag: Option<String>,
}

/// One bounded, self-contained part of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 1-based part number
    pub number: usize,

    /// Total number of parts
    pub total: usize,

    resume: Option<Resume>,
    body: String,
    close_fence: bool,
    current_file: Option<String>,
}

impl Chunk {
    /// Returns true for the final part.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.number == self.total
    }

    /// Verbatim document content carried by this chunk, without markers.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Header of the file this chunk resumes, if it starts mid-file.
    #[must_use]
    pub fn continued_file(&self) -> Option<&str> {
        self.resume.as_ref().and_then(|r| r.file.as_deref())
    }

    /// Renders the chunk with its lead-in, closing fence and footer.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 256);

        if let Some(resume) = &self.resume {
            out.push_str(&lead_in(self.number, resume));
        }

        out.push_str(&self.body);

        if self.close_fence {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(FENCE);
            out.push('\n');
        }

        if self.is_last() {
            let _ = write!(
                out,
                "\nEnd of part {} of {}. This is the final part. Please confirm receipt of all \
                 parts and proceed with the analysis only after receiving this message.\n",
                self.number, self.total
            );
        } else {
            if let Some(file) = &self.current_file {
                let _ = write!(out, "\n{file} continued in next file\n");
            }
            let _ = write!(
                out,
                "\nEnd of part {} of {}. Please confirm receipt and let me know when you are \
                 ready for the next part.\n",
                self.number, self.total
            );
        }

        out
    }
}

/// Lines opening a continuation chunk.
fn lead_in(number: usize, resume: &Resume) -> String {
    let mut out = format!("\nBeginning of part {number}\n\n");
    if let Some(file) = &resume.file {
        let _ = write!(out, "{file} (continued)\n\n");
    }
    if let Some(tag) = &resume.fence_tag {
        let _ = writeln!(out, "{FENCE}{tag}");
    }
    out
}

/// Fence and file context observed so far while walking a document.
#[derive(Debug, Default)]
struct Cursor {
    in_fence: bool,
    fence_tag: String,
    current_file: Option<String>,
}

impl Cursor {
    fn observe(&mut self, line: &Line) {
        if line.is_fence() {
            if self.in_fence {
                self.in_fence = false;
            } else {
                self.in_fence = true;
                self.fence_tag = line.fence_tag().to_string();
            }
        } else if line.is_header() && !self.in_fence {
            self.current_file = Some(line.text().trim().to_string());
        }
    }

    fn resume(&self) -> Resume {
        Resume {
            file: self.current_file.clone(),
            fence_tag: self.in_fence.then(|| self.fence_tag.clone()),
        }
    }
}

/// Chunk boundaries decided by the planning pass.
#[derive(Debug)]
struct PlannedChunk {
    lines: Range<usize>,
    resume: Option<Resume>,
    close_fence: bool,
    current_file: Option<String>,
}

/// Splits a document into chunks of at most `chunk_size` characters.
///
/// The budget covers each chunk's lead-in and body; the footer and a forced
/// closing fence come on top. A line is never split, so a single line
/// longer than the budget gets a chunk of its own.
#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    chunk_size: usize,
}

impl Splitter {
    /// Creates a splitter with the given character budget.
    #[must_use]
    pub const fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Creates a splitter from configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self::new(config.chunk_size)
    }

    /// Number of chunks `split` will produce for `document`.
    #[must_use]
    pub fn count(&self, document: &Document) -> usize {
        self.plan(document).len()
    }

    /// Splits `document` into ordered chunks.
    ///
    /// # Algorithm
    ///
    /// 1. A planning pass walks the lines, tracking fence state and the last
    ///    file header, and closes a chunk whenever the next line would push
    ///    it past the budget
    /// 2. The plan's length is the total every footer reports
    /// 3. Each planned range becomes a chunk; boundaries inside a fence get
    ///    a closing fence and a re-opened fence in the next chunk
    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Chunk> {
        let plans = self.plan(document);
        let total = plans.len();
        let lines = document.lines();

        let chunks: Vec<Chunk> = plans
            .into_iter()
            .enumerate()
            .map(|(i, plan)| Chunk {
                number: i + 1,
                total,
                body: lines[plan.lines].iter().map(Line::text).collect(),
                resume: plan.resume,
                close_fence: plan.close_fence,
                current_file: plan.current_file,
            })
            .collect();

        debug!(
            "Split {} characters into {} chunks (budget {})",
            document.char_len(),
            chunks.len(),
            self.chunk_size
        );

        chunks
    }

    fn plan(&self, document: &Document) -> Vec<PlannedChunk> {
        let lines = document.lines();
        let mut plans = Vec::new();
        let mut cursor = Cursor::default();
        let mut resume = None;
        let mut start = 0;
        let mut size = 0;

        for (i, line) in lines.iter().enumerate() {
            let len = line.char_len();

            if i > start && size + len > self.chunk_size {
                plans.push(PlannedChunk {
                    lines: start..i,
                    resume: resume.take(),
                    close_fence: cursor.in_fence,
                    current_file: cursor.current_file.clone(),
                });

                let next = cursor.resume();
                size = lead_in(plans.len() + 1, &next).chars().count();
                trace!(
                    "Chunk {} ends at line {} (inside fence: {})",
                    plans.len(),
                    i,
                    cursor.in_fence
                );
                resume = Some(next);
                start = i;
            }

            size += len;
            cursor.observe(line);
        }

        plans.push(PlannedChunk {
            lines: start..lines.len(),
            resume,
            close_fence: cursor.in_fence,
            current_file: None,
        });

        plans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fence_lines(text: &str) -> usize {
        text.lines()
            .filter(|l| l.trim_start().starts_with(FENCE))
            .count()
    }

    fn bundle(lines_in_big_file: usize) -> Document {
        let mut text = String::from("Intro\n\n```python\nexample\n```\n\nHere are the files:\n\n");
        text.push_str("./src/big.rs\n\n```rust\n");
        for i in 0..lines_in_big_file {
            text.push_str(&format!("let value_{i} = {i};\n"));
        }
        text.push_str("\n```\n\n./small.py\n\n```python\nprint('small')\n\n```\n\n");
        Document::parse(&text)
    }

    #[test]
    fn test_single_chunk_has_only_final_footer() {
        let document = bundle(3);
        let chunks = Splitter::new(100_000).split(&document);

        assert_eq!(chunks.len(), 1);
        let rendered = chunks[0].render();
        assert!(rendered.starts_with(&document.to_string()));
        assert!(rendered.ends_with(
            "\nEnd of part 1 of 1. This is the final part. Please confirm receipt of all parts \
             and proceed with the analysis only after receiving this message.\n"
        ));
        assert!(!rendered.contains("Beginning of part"));
        assert!(!rendered.contains("continued in next file"));
    }

    #[test]
    fn test_total_matches_chunk_count() {
        let line = format!("{}\n", "x".repeat(99));
        let document = Document::parse(&line.repeat(2_500));
        assert_eq!(document.char_len(), 250_000);

        let splitter = Splitter::new(100_000);
        let chunks = splitter.split(&document);

        assert_eq!(chunks.len(), 3);
        assert_eq!(splitter.count(&document), 3);
        for chunk in &chunks {
            assert_eq!(chunk.total, 3);
            assert!(
                chunk
                    .render()
                    .contains(&format!("End of part {} of 3.", chunk.number))
            );
        }
    }

    #[test]
    fn test_chunks_reassemble_to_document() {
        let document = bundle(200);
        let chunks = Splitter::new(500).split(&document);

        assert!(chunks.len() > 1);
        let reassembled: String = chunks.iter().map(Chunk::body).collect();
        assert_eq!(reassembled, document.to_string());
    }

    #[test]
    fn test_every_chunk_has_balanced_fences() {
        let document = bundle(200);

        for budget in [120, 333, 500, 1_000] {
            for chunk in Splitter::new(budget).split(&document) {
                let rendered = chunk.render();
                assert_eq!(
                    fence_lines(&rendered) % 2,
                    0,
                    "chunk {} with budget {budget} is unbalanced:\n{rendered}",
                    chunk.number
                );
            }
        }
    }

    #[test]
    fn test_continuation_reopens_fence() {
        let document = bundle(200);
        let chunks = Splitter::new(500).split(&document);

        let first = chunks[0].render();
        assert!(first.contains("\n./src/big.rs continued in next file\n"));
        assert!(first.contains("End of part 1 of"));

        let second = chunks[1].render();
        assert!(second.starts_with("\nBeginning of part 2\n\n./src/big.rs (continued)\n\n```rust\n"));
        assert_eq!(chunks[1].continued_file(), Some("./src/big.rs"));
    }

    #[test]
    fn test_budget_respected_except_footer() {
        let document = bundle(200);
        let budget = 400;

        for chunk in Splitter::new(budget).split(&document) {
            let lead_in_len = chunk
                .resume
                .as_ref()
                .map_or(0, |r| lead_in(chunk.number, r).chars().count());
            assert!(lead_in_len + chunk.body().chars().count() <= budget);
        }
    }

    #[test]
    fn test_oversized_line_gets_own_chunk() {
        let long = "y".repeat(500);
        let document = Document::parse(&format!("a\n{long}\nb\n"));
        let chunks = Splitter::new(100).split(&document);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].body(), "a\n");
        assert_eq!(chunks[1].body(), format!("{long}\n"));
        assert_eq!(chunks[2].body(), "b\n");
    }

    #[test]
    fn test_split_is_deterministic() {
        let document = bundle(150);
        let first: Vec<String> = Splitter::new(700).split(&document).iter().map(Chunk::render).collect();
        let second: Vec<String> = Splitter::new(700).split(&document).iter().map(Chunk::render).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_document() {
        let chunks = Splitter::new(100).split(&Document::new());

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].body().is_empty());
        assert!(chunks[0].render().starts_with("\nEnd of part 1 of 1. This is the final part."));
    }
}
